//! Bytecode opcodes for the FOOL stack VM
//!
//! A program is a flat sequence of `i32` words. Every instruction is one opcode
//! word, optionally followed by one immediate operand word (a value for `push`,
//! an absolute code address for the branches).

/// Bytecode opcode enumeration
///
/// Stack effects are written with `v1` the top of stack and `v2` the value
/// below it.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // ===== Stack =====
    /// Push the immediate operand
    Push = 1,
    /// Discard the top of stack
    Pop = 2,

    // ===== Arithmetic =====
    /// pop v1, pop v2, push v2 + v1
    Add = 3,
    /// pop v1, pop v2, push v2 - v1
    Sub = 4,
    /// pop v1, pop v2, push v2 * v1
    Mult = 5,
    /// pop v1, pop v2, push v2 / v1 (truncating; v1 == 0 faults)
    Div = 6,

    // ===== Memory =====
    /// pop address, pop value, memory[address] = value
    StoreWord = 7,
    /// pop address, push memory[address]
    LoadWord = 8,

    // ===== Control flow =====
    /// Jump to the operand address
    Branch = 9,
    /// pop v1, pop v2, jump to the operand address if v2 == v1
    BranchEq = 10,
    /// pop v1, pop v2, jump to the operand address if v2 <= v1
    BranchLessEq = 11,
    /// pop address, ra = address of next instruction, jump to address
    JumpSubroutine = 12,

    // ===== Registers =====
    /// push ra
    LoadRa = 13,
    /// ra = pop
    StoreRa = 14,
    /// push tm
    LoadTm = 15,
    /// tm = pop
    StoreTm = 16,
    /// push fp
    LoadFp = 17,
    /// fp = pop
    StoreFp = 18,
    /// fp = sp
    CopyFp = 19,
    /// push hp
    LoadHp = 20,
    /// hp = pop
    StoreHp = 21,

    // ===== Misc =====
    /// pop and emit one output line
    Print = 22,
    /// Stop execution
    Halt = 23,
}

impl Opcode {
    /// Decode an opcode word
    pub fn from_i32(word: i32) -> Option<Self> {
        match word {
            1 => Some(Self::Push),
            2 => Some(Self::Pop),
            3 => Some(Self::Add),
            4 => Some(Self::Sub),
            5 => Some(Self::Mult),
            6 => Some(Self::Div),
            7 => Some(Self::StoreWord),
            8 => Some(Self::LoadWord),
            9 => Some(Self::Branch),
            10 => Some(Self::BranchEq),
            11 => Some(Self::BranchLessEq),
            12 => Some(Self::JumpSubroutine),
            13 => Some(Self::LoadRa),
            14 => Some(Self::StoreRa),
            15 => Some(Self::LoadTm),
            16 => Some(Self::StoreTm),
            17 => Some(Self::LoadFp),
            18 => Some(Self::StoreFp),
            19 => Some(Self::CopyFp),
            20 => Some(Self::LoadHp),
            21 => Some(Self::StoreHp),
            22 => Some(Self::Print),
            23 => Some(Self::Halt),
            _ => None,
        }
    }

    /// Encoded opcode word
    pub fn to_i32(self) -> i32 {
        self as i32
    }

    /// Assembly mnemonic
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Pop => "pop",
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mult => "mult",
            Self::Div => "div",
            Self::StoreWord => "sw",
            Self::LoadWord => "lw",
            Self::Branch => "b",
            Self::BranchEq => "beq",
            Self::BranchLessEq => "bleq",
            Self::JumpSubroutine => "js",
            Self::LoadRa => "lra",
            Self::StoreRa => "sra",
            Self::LoadTm => "ltm",
            Self::StoreTm => "stm",
            Self::LoadFp => "lfp",
            Self::StoreFp => "sfp",
            Self::CopyFp => "cfp",
            Self::LoadHp => "lhp",
            Self::StoreHp => "shp",
            Self::Print => "print",
            Self::Halt => "halt",
        }
    }

    /// Whether an immediate operand word follows the opcode
    pub fn has_operand(self) -> bool {
        matches!(
            self,
            Self::Push | Self::Branch | Self::BranchEq | Self::BranchLessEq
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_matches_encode() {
        for word in 1..=23 {
            let opcode = Opcode::from_i32(word).expect("valid opcode word");
            assert_eq!(opcode.to_i32(), word);
        }
        assert_eq!(Opcode::from_i32(0), None);
        assert_eq!(Opcode::from_i32(24), None);
    }

    #[test]
    fn test_operands() {
        assert!(Opcode::Push.has_operand());
        assert!(Opcode::BranchLessEq.has_operand());
        assert!(!Opcode::JumpSubroutine.has_operand());
        assert_eq!(Opcode::StoreWord.mnemonic(), "sw");
    }
}
