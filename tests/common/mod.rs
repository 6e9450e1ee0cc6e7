//! A tiny interpreter for the instruction subset the code generator emits.
//!
//! It lets end-to-end tests check what compiled programs compute without an
//! assembler or linker. Only the forms the emitter produces are understood;
//! anything else panics so a change in the output shows up loudly.

use std::collections::HashMap;

const STACK_TOP: i64 = 0x10_0000;
const RETURN_SENTINEL: i64 = -1;
const STEP_LIMIT: usize = 100_000;

/// Result of running `main` to its final `ret`.
#[derive(Debug)]
pub struct Outcome {
  /// Value of `rax` when `main` returned.
  pub value: i64,
  /// `rbp - rsp` at every frame teardown that executed, in order.
  pub teardown_depths: Vec<i64>,
}

struct Machine {
  regs: HashMap<String, i64>,
  memory: HashMap<i64, i64>,
  flags: (i64, i64),
}

impl Machine {
  fn reg(&self, name: &str) -> i64 {
    self.regs.get(name).copied().unwrap_or(0)
  }

  fn set(&mut self, name: &str, value: i64) {
    self.regs.insert(name.to_string(), value);
  }

  fn push(&mut self, value: i64) {
    let rsp = self.reg("rsp") - 8;
    self.set("rsp", rsp);
    self.memory.insert(rsp, value);
  }

  fn pop(&mut self) -> i64 {
    let rsp = self.reg("rsp");
    let value = *self
      .memory
      .get(&rsp)
      .unwrap_or_else(|| panic!("pop from uninitialised stack slot {rsp:#x}"));
    self.set("rsp", rsp + 8);
    value
  }

  /// Address named by `[reg]`, `[reg-N]` or `[reg+N]`.
  fn address(&self, operand: &str) -> i64 {
    let inner = operand
      .strip_prefix('[')
      .and_then(|rest| rest.strip_suffix(']'))
      .unwrap_or_else(|| panic!("not a memory operand: {operand}"));
    if let Some((reg, disp)) = inner.split_once('-') {
      self.reg(reg) - disp.parse::<i64>().unwrap()
    } else if let Some((reg, disp)) = inner.split_once('+') {
      self.reg(reg) + disp.parse::<i64>().unwrap()
    } else {
      self.reg(inner)
    }
  }

  fn value(&self, operand: &str) -> i64 {
    if operand.starts_with('[') {
      let addr = self.address(operand);
      *self
        .memory
        .get(&addr)
        .unwrap_or_else(|| panic!("load from uninitialised address {addr:#x}"))
    } else if let Ok(imm) = operand.parse::<i64>() {
      imm
    } else {
      self.reg(operand)
    }
  }
}

/// Execute the assembly text starting at `main` and return its outcome.
pub fn run(asm: &str) -> Outcome {
  let mut program: Vec<(String, Vec<String>)> = Vec::new();
  let mut labels: HashMap<String, usize> = HashMap::new();

  for line in asm.lines().map(str::trim).filter(|line| !line.is_empty()) {
    if let Some(label) = line.strip_suffix(':') {
      labels.insert(label.to_string(), program.len());
      continue;
    }
    if line.starts_with('.') {
      continue;
    }
    let (op, rest) = line.split_once(' ').unwrap_or((line, ""));
    let operands = rest
      .split(", ")
      .map(str::trim)
      .filter(|operand| !operand.is_empty())
      .map(str::to_string)
      .collect();
    program.push((op.to_string(), operands));
  }

  let mut machine = Machine {
    regs: HashMap::new(),
    memory: HashMap::new(),
    flags: (0, 0),
  };
  machine.set("rsp", STACK_TOP);
  machine.set("rbp", 0x7777);
  machine.push(RETURN_SENTINEL);

  let mut teardown_depths = Vec::new();
  let mut pc = *labels.get("main").expect("no main label");

  for _ in 0..STEP_LIMIT {
    let (op, operands) = &program[pc];
    pc += 1;
    let arg = move |i: usize| operands[i].as_str();

    match op.as_str() {
      "push" => {
        let value = machine.value(arg(0));
        machine.push(value);
      }
      "pop" => {
        let value = machine.pop();
        machine.set(arg(0), value);
      }
      "mov" => {
        if arg(0) == "rsp" && arg(1) == "rbp" {
          teardown_depths.push(machine.reg("rbp") - machine.reg("rsp"));
        }
        let value = machine.value(arg(1));
        if arg(0).starts_with('[') {
          let addr = machine.address(arg(0));
          machine.memory.insert(addr, value);
        } else {
          machine.set(arg(0), value);
        }
      }
      "lea" => {
        let addr = machine.address(arg(1));
        machine.set(arg(0), addr);
      }
      "add" | "sub" | "imul" => {
        let lhs = machine.reg(arg(0));
        let rhs = machine.value(arg(1));
        let result = match op.as_str() {
          "add" => lhs.wrapping_add(rhs),
          "sub" => lhs.wrapping_sub(rhs),
          _ => lhs.wrapping_mul(rhs),
        };
        machine.set(arg(0), result);
      }
      "cqo" => {
        let rdx = if machine.reg("rax") < 0 { -1 } else { 0 };
        machine.set("rdx", rdx);
      }
      "idiv" => {
        let dividend = machine.reg("rax");
        let divisor = machine.value(arg(0));
        assert_ne!(divisor, 0, "division by zero");
        machine.set("rax", dividend.wrapping_div(divisor));
        machine.set("rdx", dividend.wrapping_rem(divisor));
      }
      "cmp" => {
        machine.flags = (machine.value(arg(0)), machine.value(arg(1)));
      }
      "sete" | "setne" | "setl" | "setle" => {
        let (lhs, rhs) = machine.flags;
        let hit = match op.as_str() {
          "sete" => lhs == rhs,
          "setne" => lhs != rhs,
          "setl" => lhs < rhs,
          _ => lhs <= rhs,
        };
        machine.set(arg(0), i64::from(hit));
      }
      "movzb" => {
        let value = machine.reg(arg(1)) & 0xff;
        machine.set(arg(0), value);
      }
      "je" => {
        if machine.flags.0 == machine.flags.1 {
          pc = labels[arg(0)];
        }
      }
      "jmp" => pc = labels[arg(0)],
      "ret" => {
        let target = machine.pop();
        assert_eq!(target, RETURN_SENTINEL, "ret to an unknown address");
        return Outcome {
          value: machine.reg("rax"),
          teardown_depths,
        };
      }
      other => panic!("unsupported instruction `{other}`"),
    }
  }

  panic!("program did not return within {STEP_LIMIT} steps");
}
