//! Crate root: wires together the compilation pipeline.
//!
//! The stages run strictly one after another over fully materialised data:
//! - `tokenizer` performs lexical analysis and produces a flat token stream.
//! - `parser` owns all syntactic knowledge and returns the statement list
//!   together with the locals it discovered.
//! - `codegen` lowers the program into x86-64 Intel-syntax assembly.
//! - `error` centralises the positional diagnostics shared by the stages.
//! - `debug` renders tokens and trees for inspection.

pub mod codegen;
pub mod debug;
pub mod error;
pub mod parser;
pub mod tokenizer;

pub use codegen::CodegenConfig;
pub use error::{CompileError, CompileResult};

/// Compile a source string into assembly using the given emitter settings.
pub fn compile(source: &str, config: &CodegenConfig) -> CompileResult<String> {
  let tokens = tokenizer::tokenize(source)?;
  let program = parser::parse(tokens, source)?;
  codegen::generate(&program, source, config)
}

/// Compile a source string into assembly with the default stack frame.
pub fn generate_assembly(source: &str) -> CompileResult<String> {
  compile(source, &CodegenConfig::default())
}
