//! Code generation: lower the parsed program into Intel-syntax x86-64 assembly.
//!
//! The emitter uses a simple stack machine: every expression leaves a single
//! value on the stack and every statement returns the stack to the depth it
//! started at. Locals live in one fixed-size frame reserved on entry and are
//! addressed relative to `rbp`.

use crate::error::{CompileError, CompileResult};
use crate::parser::{AstNode, BinaryOp, Program, WORD_SIZE};

/// Frame size used when nothing else is configured: room for 26 words.
pub const DEFAULT_FRAME_SIZE: usize = 208;

/// Knobs for the emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodegenConfig {
  /// Bytes reserved below `rbp` for locals. The frame never grows past this.
  pub frame_size: usize,
}

impl Default for CodegenConfig {
  fn default() -> Self {
    Self {
      frame_size: DEFAULT_FRAME_SIZE,
    }
  }
}

impl CodegenConfig {
  pub fn with_frame_size(frame_size: usize) -> Self {
    Self { frame_size }
  }

  /// Number of word-sized locals that fit in the frame.
  pub fn capacity(&self) -> usize {
    self.frame_size / WORD_SIZE as usize
  }

  /// Whether `locals` word-sized variables fit in the frame.
  pub fn holds(&self, locals: usize) -> bool {
    locals <= self.capacity()
  }
}

/// Emit assembly for a whole program.
///
/// `source` is only used to render diagnostics.
pub fn generate(program: &Program, source: &str, config: &CodegenConfig) -> CompileResult<String> {
  if !config.holds(program.locals.len()) {
    tracing::warn!(
      locals = program.locals.len(),
      capacity = config.capacity(),
      frame_size = config.frame_size,
      "locals exceed the reserved stack frame"
    );
  }

  let mut codegen = Codegen::new(source);
  codegen.directive(".intel_syntax noprefix");
  codegen.directive(".globl main");
  codegen.label("main");
  codegen.emit("push rbp");
  codegen.emit("mov rbp, rsp");
  if config.frame_size > 0 {
    codegen.emit(&format!("sub rsp, {}", config.frame_size));
  }

  for stmt in &program.body {
    codegen.emit_stmt(stmt)?;
  }

  // Falling off the end returns whatever the last statement left in rax.
  codegen.emit_epilogue();
  codegen.directive(".section .note.GNU-stack,\"\",@progbits");

  tracing::debug!(
    bytes = codegen.asm.len(),
    labels = codegen.label_count,
    "generated assembly"
  );
  Ok(codegen.asm)
}

struct Codegen<'a> {
  asm: String,
  source: &'a str,
  label_count: usize,
}

impl<'a> Codegen<'a> {
  fn new(source: &'a str) -> Self {
    Self {
      asm: String::new(),
      source,
      label_count: 0,
    }
  }

  fn emit(&mut self, instr: &str) {
    self.asm.push_str("    ");
    self.asm.push_str(instr);
    self.asm.push('\n');
  }

  fn directive(&mut self, line: &str) {
    self.asm.push_str(line);
    self.asm.push('\n');
  }

  fn label(&mut self, name: &str) {
    self.asm.push_str(name);
    self.asm.push_str(":\n");
  }

  fn next_label_id(&mut self) -> usize {
    let id = self.label_count;
    self.label_count += 1;
    id
  }

  fn emit_epilogue(&mut self) {
    self.emit("mov rsp, rbp");
    self.emit("pop rbp");
    self.emit("ret");
  }

  /// Emit one statement. The stack depth after it equals the depth before it.
  fn emit_stmt(&mut self, node: &AstNode) -> CompileResult<()> {
    match node {
      AstNode::Return { expr } => {
        self.emit_expr(expr)?;
        self.emit("pop rax");
        self.emit_epilogue();
      }
      AstNode::If { cond, then, els } => {
        let id = self.next_label_id();
        self.emit_expr(cond)?;
        self.emit("pop rax");
        self.emit("cmp rax, 0");
        self.emit(&format!("je .Lelse{id}"));
        self.emit_stmt(then)?;
        self.emit(&format!("jmp .Lend{id}"));
        self.label(&format!(".Lelse{id}"));
        if let Some(els) = els {
          self.emit_stmt(els)?;
        }
        self.label(&format!(".Lend{id}"));
      }
      expr => {
        self.emit_expr(expr)?;
        // Discard the value so statements stay balanced.
        self.emit("pop rax");
      }
    }
    Ok(())
  }

  /// Emit stack-based code for a single expression node.
  fn emit_expr(&mut self, node: &AstNode) -> CompileResult<()> {
    match node {
      AstNode::Num { value } => {
        self.emit(&format!("mov rax, {value}"));
        self.emit("push rax");
      }
      AstNode::Var { .. } => {
        self.emit_addr(node, 0)?;
        self.emit("pop rax");
        self.emit("mov rax, [rax]");
        self.emit("push rax");
      }
      AstNode::Assign { lhs, rhs, loc } => {
        self.emit_addr(lhs, *loc)?;
        self.emit_expr(rhs)?;
        self.emit("pop rdi");
        self.emit("pop rax");
        self.emit("mov [rax], rdi");
        self.emit("push rdi");
      }
      AstNode::Binary { op, lhs, rhs } => {
        self.emit_expr(lhs)?;
        self.emit_expr(rhs)?;
        self.emit("pop rdi");
        self.emit("pop rax");
        match op {
          BinaryOp::Add => self.emit("add rax, rdi"),
          BinaryOp::Sub => self.emit("sub rax, rdi"),
          BinaryOp::Mul => self.emit("imul rax, rdi"),
          BinaryOp::Div => {
            self.emit("cqo");
            self.emit("idiv rdi");
          }
          BinaryOp::Eq => self.emit_compare("sete"),
          BinaryOp::Ne => self.emit_compare("setne"),
          BinaryOp::Lt => self.emit_compare("setl"),
          BinaryOp::Le => self.emit_compare("setle"),
        }
        self.emit("push rax");
      }
      AstNode::Return { .. } | AstNode::If { .. } => {
        // Only reachable from hand-built trees; yield whatever the
        // statement left in rax so the expression still pushes one value.
        self.emit_stmt(node)?;
        self.emit("push rax");
      }
    }
    Ok(())
  }

  fn emit_compare(&mut self, set: &str) {
    self.emit("cmp rax, rdi");
    self.emit(&format!("{set} al"));
    self.emit("movzb rax, al");
  }

  /// Push the address of an lvalue. `loc` anchors the error if `node` is not one.
  fn emit_addr(&mut self, node: &AstNode, loc: usize) -> CompileResult<()> {
    match node {
      AstNode::Var { offset, .. } => {
        self.emit(&format!("lea rax, [rbp-{offset}]"));
        self.emit("push rax");
        Ok(())
      }
      _ => Err(CompileError::not_lvalue(self.source, loc)),
    }
  }
}
