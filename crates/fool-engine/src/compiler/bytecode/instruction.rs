//! Symbolic instructions emitted by the code generator
//!
//! Instructions reference code addresses through [`Label`]s; the assembler
//! replaces them by absolute addresses. `Display` renders one mnemonic line per
//! instruction.

use std::fmt;

use super::opcode::Opcode;

/// Symbolic code address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    /// Branch target inside an expression
    Branch(u32),
    /// Entry point of a function
    Function(u32),
    /// Entry point of a method
    Method(u32),
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Branch(n) => write!(f, "label{}", n),
            Label::Function(n) => write!(f, "function{}", n),
            Label::Method(n) => write!(f, "method{}", n),
        }
    }
}

/// Hands out fresh labels
#[derive(Debug, Default)]
pub struct LabelAllocator {
    next: u32,
}

impl LabelAllocator {
    /// Create an allocator
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&mut self) -> u32 {
        let n = self.next;
        self.next += 1;
        n
    }

    /// Fresh branch label
    pub fn branch(&mut self) -> Label {
        Label::Branch(self.bump())
    }

    /// Fresh function entry label
    pub fn function(&mut self) -> Label {
        Label::Function(self.bump())
    }

    /// Fresh method entry label
    pub fn method(&mut self) -> Label {
        Label::Method(self.bump())
    }
}

/// One stack-machine instruction
///
/// Variants mirror [`Opcode`]; see there for the stack effects.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Push(i32),
    /// Push the code address of a label
    PushLabel(Label),
    Pop,
    Add,
    Sub,
    Mult,
    Div,
    StoreWord,
    LoadWord,
    Branch(Label),
    BranchEq(Label),
    BranchLessEq(Label),
    JumpSubroutine,
    LoadRa,
    StoreRa,
    LoadTm,
    StoreTm,
    LoadFp,
    StoreFp,
    CopyFp,
    LoadHp,
    StoreHp,
    Print,
    Halt,
    /// Pseudo-instruction marking a label's position; assembles to nothing
    Label(Label),
}

impl Instruction {
    /// Opcode of the instruction (`None` for label markers)
    pub fn opcode(&self) -> Option<Opcode> {
        let opcode = match self {
            Instruction::Push(_) | Instruction::PushLabel(_) => Opcode::Push,
            Instruction::Pop => Opcode::Pop,
            Instruction::Add => Opcode::Add,
            Instruction::Sub => Opcode::Sub,
            Instruction::Mult => Opcode::Mult,
            Instruction::Div => Opcode::Div,
            Instruction::StoreWord => Opcode::StoreWord,
            Instruction::LoadWord => Opcode::LoadWord,
            Instruction::Branch(_) => Opcode::Branch,
            Instruction::BranchEq(_) => Opcode::BranchEq,
            Instruction::BranchLessEq(_) => Opcode::BranchLessEq,
            Instruction::JumpSubroutine => Opcode::JumpSubroutine,
            Instruction::LoadRa => Opcode::LoadRa,
            Instruction::StoreRa => Opcode::StoreRa,
            Instruction::LoadTm => Opcode::LoadTm,
            Instruction::StoreTm => Opcode::StoreTm,
            Instruction::LoadFp => Opcode::LoadFp,
            Instruction::StoreFp => Opcode::StoreFp,
            Instruction::CopyFp => Opcode::CopyFp,
            Instruction::LoadHp => Opcode::LoadHp,
            Instruction::StoreHp => Opcode::StoreHp,
            Instruction::Print => Opcode::Print,
            Instruction::Halt => Opcode::Halt,
            Instruction::Label(_) => return None,
        };
        Some(opcode)
    }

    /// Number of code words the instruction occupies
    pub fn size(&self) -> usize {
        match self.opcode() {
            Some(opcode) if opcode.has_operand() => 2,
            Some(_) => 1,
            None => 0,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Label(label) => write!(f, "{}:", label),
            Instruction::Push(value) => write!(f, "push {}", value),
            Instruction::PushLabel(label)
            | Instruction::Branch(label)
            | Instruction::BranchEq(label)
            | Instruction::BranchLessEq(label) => {
                let mnemonic = self.opcode().map(Opcode::mnemonic).unwrap_or_default();
                write!(f, "{} {}", mnemonic, label)
            }
            other => match other.opcode() {
                Some(opcode) => f.write_str(opcode.mnemonic()),
                None => Ok(()),
            },
        }
    }
}

/// Render an instruction sequence as assembly text, one instruction per line
pub fn listing(instructions: &[Instruction]) -> String {
    let mut text = String::new();
    for instruction in instructions {
        text.push_str(&instruction.to_string());
        text.push('\n');
    }
    text
}
