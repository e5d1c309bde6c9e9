//! Fetch-decode-execute loop

use std::io::Write;

use tracing::{debug, info, trace};

use super::error::{VmError, VmResult};
use super::options::VmOptions;
use crate::compiler::bytecode::{Bytecode, Opcode};

/// Line printed when `print` finds nothing on the stack
const EMPTY_STACK: &str = "EMPTY STACK";

/// Summary of a completed run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionStats {
    /// Instructions executed
    pub steps: u64,
    /// Heap cells allocated (final heap pointer)
    pub heap_cells: usize,
}

/// Result of executing one instruction
enum Step {
    Continue,
    Halt,
}

/// Stack virtual machine
///
/// Memory is one array of `memory_size` cells. `sp` and `fp` start at
/// `memory_size`, `hp` at 0.
#[derive(Debug)]
pub struct Vm {
    options: VmOptions,
    memory: Vec<i32>,
    ip: usize,
    sp: i32,
    fp: i32,
    hp: i32,
    ra: i32,
    tm: i32,
    steps: u64,
}

impl Vm {
    /// Create a VM with the given configuration
    pub fn new(options: VmOptions) -> VmResult<Self> {
        let top = i32::try_from(options.memory_size)
            .ok()
            .filter(|top| *top >= 2)
            .ok_or(VmError::InvalidMemorySize {
                size: options.memory_size,
            })?;
        Ok(Self {
            options,
            memory: vec![0; options.memory_size],
            ip: 0,
            sp: top,
            fp: top,
            hp: 0,
            ra: 0,
            tm: 0,
            steps: 0,
        })
    }

    /// Configuration of this VM
    pub fn options(&self) -> &VmOptions {
        &self.options
    }

    fn top(&self) -> i32 {
        self.memory.len() as i32
    }

    fn reset(&mut self) {
        self.memory.fill(0);
        self.ip = 0;
        self.sp = self.top();
        self.fp = self.top();
        self.hp = 0;
        self.ra = 0;
        self.tm = 0;
        self.steps = 0;
    }

    /// Run a program from address 0, writing one line per `print` to `out`
    ///
    /// Execution ends at `halt` or when the instruction pointer runs past the
    /// end of the code. Faults stop execution immediately.
    pub fn execute<W: Write>(&mut self, program: &Bytecode, out: &mut W) -> VmResult<ExecutionStats> {
        self.reset();
        let code = program.code.as_slice();

        while self.ip < code.len() {
            if let Some(limit) = self.options.max_steps {
                if self.steps >= limit {
                    return Err(self.fault(VmError::StepLimitExceeded { limit }));
                }
            }
            self.steps += 1;

            match self.step(code, out) {
                Ok(Step::Continue) => {}
                Ok(Step::Halt) => break,
                Err(error) => return Err(self.fault(error)),
            }
            if self.sp <= self.hp {
                let error = VmError::Collision {
                    sp: self.sp,
                    hp: self.hp,
                };
                return Err(self.fault(error));
            }
        }

        let stats = ExecutionStats {
            steps: self.steps,
            heap_cells: self.hp.max(0) as usize,
        };
        info!(steps = stats.steps, heap = stats.heap_cells, "execution completed");
        Ok(stats)
    }

    fn fault(&self, error: VmError) -> VmError {
        debug!(%error, kind = ?error.kind(), ip = self.ip, steps = self.steps, "vm fault");
        error
    }

    fn step<W: Write>(&mut self, code: &[i32], out: &mut W) -> VmResult<Step> {
        let at = self.ip;
        let word = code[at];
        let opcode = Opcode::from_i32(word).ok_or(VmError::InvalidOpcode { opcode: word, ip: at })?;
        self.ip += 1;
        trace!(ip = at, op = opcode.mnemonic(), sp = self.sp, fp = self.fp, hp = self.hp);

        match opcode {
            Opcode::Push => {
                let value = self.operand(code, at)?;
                self.push(value)?;
            }
            Opcode::Pop => {
                self.pop(at)?;
            }
            Opcode::Add => self.binary(at, |v2, v1| Ok(v2.wrapping_add(v1)))?,
            Opcode::Sub => self.binary(at, |v2, v1| Ok(v2.wrapping_sub(v1)))?,
            Opcode::Mult => self.binary(at, |v2, v1| Ok(v2.wrapping_mul(v1)))?,
            Opcode::Div => self.binary(at, |v2, v1| {
                if v1 == 0 {
                    Err(VmError::DivisionByZero { ip: at })
                } else {
                    Ok(v2.wrapping_div(v1))
                }
            })?,
            Opcode::StoreWord => {
                let address = self.pop(at)?;
                let value = self.pop(at)?;
                let cell = self.cell(address, at)?;
                self.memory[cell] = value;
            }
            Opcode::LoadWord => {
                let address = self.pop(at)?;
                let cell = self.cell(address, at)?;
                self.push(self.memory[cell])?;
            }
            Opcode::Branch => {
                let target = self.operand(code, at)?;
                self.jump(target, code.len(), at)?;
            }
            Opcode::BranchEq | Opcode::BranchLessEq => {
                let target = self.operand(code, at)?;
                let v1 = self.pop(at)?;
                let v2 = self.pop(at)?;
                let taken = match opcode {
                    Opcode::BranchEq => v2 == v1,
                    _ => v2 <= v1,
                };
                if taken {
                    self.jump(target, code.len(), at)?;
                }
            }
            Opcode::JumpSubroutine => {
                let target = self.pop(at)?;
                self.ra = self.ip as i32;
                self.jump(target, code.len(), at)?;
            }
            Opcode::LoadRa => self.push(self.ra)?,
            Opcode::StoreRa => self.ra = self.pop(at)?,
            Opcode::LoadTm => self.push(self.tm)?,
            Opcode::StoreTm => self.tm = self.pop(at)?,
            Opcode::LoadFp => self.push(self.fp)?,
            Opcode::StoreFp => self.fp = self.pop(at)?,
            Opcode::CopyFp => self.fp = self.sp,
            Opcode::LoadHp => self.push(self.hp)?,
            Opcode::StoreHp => self.hp = self.pop(at)?,
            Opcode::Print => {
                if self.sp >= self.top() {
                    writeln!(out, "{}", EMPTY_STACK)?;
                } else {
                    let value = self.pop(at)?;
                    writeln!(out, "{}", value)?;
                }
            }
            Opcode::Halt => return Ok(Step::Halt),
        }
        Ok(Step::Continue)
    }

    // ===== Helpers =====

    fn operand(&mut self, code: &[i32], at: usize) -> VmResult<i32> {
        let value = *code
            .get(self.ip)
            .ok_or(VmError::TruncatedInstruction { ip: at })?;
        self.ip += 1;
        Ok(value)
    }

    fn jump(&mut self, target: i32, code_len: usize, at: usize) -> VmResult<()> {
        match usize::try_from(target) {
            Ok(address) if address <= code_len => {
                self.ip = address;
                Ok(())
            }
            _ => Err(VmError::InvalidJump { target, ip: at }),
        }
    }

    fn cell(&self, address: i32, at: usize) -> VmResult<usize> {
        usize::try_from(address)
            .ok()
            .filter(|cell| *cell < self.memory.len())
            .ok_or(VmError::InvalidAddress { address, ip: at })
    }

    fn push(&mut self, value: i32) -> VmResult<()> {
        let sp = self.sp - 1;
        if sp <= self.hp || sp < 0 {
            return Err(VmError::Collision { sp, hp: self.hp });
        }
        self.sp = sp;
        self.memory[sp as usize] = value;
        Ok(())
    }

    fn pop(&mut self, at: usize) -> VmResult<i32> {
        if self.sp >= self.top() {
            return Err(VmError::StackUnderflow { ip: at });
        }
        let value = self.memory[self.sp as usize];
        self.sp += 1;
        Ok(value)
    }

    fn binary(&mut self, at: usize, op: impl FnOnce(i32, i32) -> VmResult<i32>) -> VmResult<()> {
        let v1 = self.pop(at)?;
        let v2 = self.pop(at)?;
        let result = op(v2, v1)?;
        self.push(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::FaultKind;

    fn program(code: &[i32]) -> Bytecode {
        Bytecode { code: code.to_vec() }
    }

    fn op(opcode: Opcode) -> i32 {
        opcode.to_i32()
    }

    fn run(code: &[i32]) -> (VmResult<ExecutionStats>, String) {
        let mut vm = Vm::new(VmOptions::default()).expect("valid options");
        let mut out = Vec::new();
        let result = vm.execute(&program(code), &mut out);
        (result, String::from_utf8(out).expect("utf-8 output"))
    }

    #[test]
    fn test_arithmetic_and_print() {
        let push = op(Opcode::Push);
        let (result, out) = run(&[
            push, 7, push, 3, op(Opcode::Sub), op(Opcode::Print),
            push, -6, push, 3, op(Opcode::Div), op(Opcode::Print),
            op(Opcode::Halt),
        ]);
        let stats = result.expect("runs");
        assert_eq!(out, "4\n-2\n");
        assert_eq!(stats.steps, 9);
        assert_eq!(stats.heap_cells, 0);
    }

    #[test]
    fn test_division_by_zero() {
        let push = op(Opcode::Push);
        let (result, out) = run(&[push, 1, push, 0, op(Opcode::Div), op(Opcode::Print)]);
        let error = result.expect_err("must fault");
        assert!(matches!(error, VmError::DivisionByZero { ip: 4 }));
        assert_eq!(error.kind(), FaultKind::Arithmetic);
        assert_eq!(out, "");
    }

    #[test]
    fn test_overflow_wraps() {
        let push = op(Opcode::Push);
        let (result, out) = run(&[
            push, i32::MIN, push, -1, op(Opcode::Div), op(Opcode::Print),
            push, i32::MAX, push, 1, op(Opcode::Add), op(Opcode::Print),
        ]);
        result.expect("runs");
        assert_eq!(out, format!("{}\n{}\n", i32::MIN, i32::MIN));
    }

    #[test]
    fn test_print_on_empty_stack() {
        let (result, out) = run(&[op(Opcode::Print), op(Opcode::Halt)]);
        result.expect("runs");
        assert_eq!(out, "EMPTY STACK\n");
    }

    #[test]
    fn test_branches() {
        let push = op(Opcode::Push);
        // 2 <= 3 jumps over `push 0; print` to `push 1; print`
        let (result, out) = run(&[
            push, 2, push, 3, op(Opcode::BranchLessEq), 11,
            push, 0, op(Opcode::Print), op(Opcode::Halt), op(Opcode::Halt),
            push, 1, op(Opcode::Print),
        ]);
        result.expect("runs past the end");
        assert_eq!(out, "1\n");
    }

    #[test]
    fn test_subroutine_jump_saves_return_address() {
        let push = op(Opcode::Push);
        let (result, out) = run(&[
            push, 5, op(Opcode::JumpSubroutine), op(Opcode::Halt), op(Opcode::Halt),
            op(Opcode::LoadRa), op(Opcode::Print),
        ]);
        result.expect("runs");
        assert_eq!(out, "3\n");
    }

    #[test]
    fn test_heap_store_and_load() {
        let push = op(Opcode::Push);
        let (result, out) = run(&[
            push, 42, op(Opcode::LoadHp), op(Opcode::StoreWord),
            op(Opcode::LoadHp), push, 1, op(Opcode::Add), op(Opcode::StoreHp),
            push, 0, op(Opcode::LoadWord), op(Opcode::Print),
        ]);
        let stats = result.expect("runs");
        assert_eq!(out, "42\n");
        assert_eq!(stats.heap_cells, 1);
    }

    #[test]
    fn test_collision() {
        let mut vm = Vm::new(VmOptions::with_memory_size(4)).expect("valid options");
        let push = op(Opcode::Push);
        let code = program(&[push, 1, push, 2, push, 3, push, 4]);
        let error = vm.execute(&code, &mut Vec::new()).expect_err("must collide");
        assert_eq!(error.kind(), FaultKind::MemoryCollision);

        // Moving the heap pointer past the stack also collides
        let code = program(&[push, 9, op(Opcode::StoreHp)]);
        let error = vm.execute(&code, &mut Vec::new()).expect_err("must collide");
        assert!(matches!(error, VmError::Collision { sp: 4, hp: 9 }));
    }

    #[test]
    fn test_decode_faults() {
        let (result, _) = run(&[99]);
        assert!(matches!(result, Err(VmError::InvalidOpcode { opcode: 99, ip: 0 })));

        let (result, _) = run(&[op(Opcode::Push)]);
        assert!(matches!(result, Err(VmError::TruncatedInstruction { ip: 0 })));

        let (result, _) = run(&[op(Opcode::Branch), 100]);
        let error = result.expect_err("bad jump");
        assert_eq!(error.kind(), FaultKind::Decode);
    }

    #[test]
    fn test_memory_faults() {
        let (result, _) = run(&[op(Opcode::Pop)]);
        assert!(matches!(result, Err(VmError::StackUnderflow { ip: 0 })));

        let push = op(Opcode::Push);
        let (result, _) = run(&[push, -1, op(Opcode::LoadWord)]);
        assert!(matches!(result, Err(VmError::InvalidAddress { address: -1, .. })));
    }

    #[test]
    fn test_step_limit() {
        let mut vm = Vm::new(VmOptions::default().max_steps(10)).expect("valid options");
        let code = program(&[op(Opcode::Branch), 0]);
        let error = vm.execute(&code, &mut Vec::new()).expect_err("loops forever");
        assert!(matches!(error, VmError::StepLimitExceeded { limit: 10 }));
        assert_eq!(error.kind(), FaultKind::ResourceLimit);
    }

    #[test]
    fn test_invalid_memory_size() {
        let error = Vm::new(VmOptions::with_memory_size(1)).expect_err("too small");
        assert!(matches!(error, VmError::InvalidMemorySize { size: 1 }));
    }

    #[test]
    fn test_vm_is_reusable() {
        let mut vm = Vm::new(VmOptions::default()).expect("valid options");
        let code = program(&[op(Opcode::Push), 3, op(Opcode::Print)]);
        let mut out = Vec::new();
        vm.execute(&code, &mut out).expect("first run");
        vm.execute(&code, &mut out).expect("second run");
        assert_eq!(out, b"3\n3\n");
    }
}
