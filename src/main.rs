use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use snafu::{ResultExt, Snafu, ensure};
use stackcc::codegen::{self, CodegenConfig, DEFAULT_FRAME_SIZE};
use stackcc::debug as dump;
use stackcc::parser::WORD_SIZE;
use stackcc::{CompileError, parser, tokenizer};
use tracing::{Level, debug};

/// Compile a source file into x86-64 assembly.
#[derive(Debug, Parser)]
#[command(name = "stackcc", version)]
struct Args {
  /// Source file to compile.
  #[arg(short, long)]
  input: PathBuf,

  /// Where to write the generated assembly.
  #[arg(short, long, default_value = "out.s")]
  output: PathBuf,

  /// Print the token stream and syntax tree, and log each stage.
  #[arg(short, long)]
  debug: bool,

  /// Bytes reserved for locals in the stack frame (a multiple of 8).
  #[arg(long, default_value_t = DEFAULT_FRAME_SIZE, value_parser = parse_frame_size)]
  frame_size: usize,
}

fn parse_frame_size(raw: &str) -> Result<usize, String> {
  let size: usize = raw
    .parse()
    .map_err(|err| format!("`{raw}` is not a byte count: {err}"))?;
  if size % WORD_SIZE as usize != 0 {
    return Err(format!("{size} is not a multiple of {WORD_SIZE}"));
  }
  Ok(size)
}

#[derive(Debug, Snafu)]
enum DriverError {
  #[snafu(display("failed to read {}: {source}", path.display()))]
  Read { path: PathBuf, source: io::Error },

  #[snafu(display("failed to write {}: {source}", path.display()))]
  Write { path: PathBuf, source: io::Error },

  #[snafu(display("{source}"))]
  Compile { source: CompileError },

  #[snafu(display(
    "program needs {locals} locals but a {frame_size}-byte frame holds {capacity}"
  ))]
  FrameOverflow {
    locals: usize,
    capacity: usize,
    frame_size: usize,
  },
}

fn main() -> ExitCode {
  let args = Args::parse();

  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_target(false)
    .with_max_level(if args.debug { Level::DEBUG } else { Level::WARN })
    .init();

  match run(&args) {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      eprintln!("{err}");
      ExitCode::FAILURE
    }
  }
}

fn run(args: &Args) -> Result<(), DriverError> {
  let source = fs::read_to_string(&args.input).context(ReadSnafu {
    path: args.input.clone(),
  })?;
  debug!(input = %args.input.display(), bytes = source.len(), "read source");

  let config = CodegenConfig::with_frame_size(args.frame_size);
  let asm = build(&source, &config, args.debug)?;

  fs::write(&args.output, asm).context(WriteSnafu {
    path: args.output.clone(),
  })?;
  debug!(output = %args.output.display(), "wrote assembly");
  Ok(())
}

/// Run the pipeline, refusing programs whose locals do not fit the frame.
fn build(source: &str, config: &CodegenConfig, show_dumps: bool) -> Result<String, DriverError> {
  let tokens = tokenizer::tokenize(source).context(CompileSnafu)?;
  if show_dumps {
    println!("=== Tokens ===");
    print!("{}", dump::dump_tokens(&tokens, source));
  }

  let program = parser::parse(tokens, source).context(CompileSnafu)?;
  if show_dumps {
    println!("=== AST ===");
    print!("{}", dump::dump_ast(&program));
  }

  ensure!(
    config.holds(program.locals.len()),
    FrameOverflowSnafu {
      locals: program.locals.len(),
      capacity: config.capacity(),
      frame_size: config.frame_size,
    }
  );

  codegen::generate(&program, source, config).context(CompileSnafu)
}
