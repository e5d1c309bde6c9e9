//! Stack-machine bytecode: opcodes, symbolic instructions, and the assembler

pub mod assembler;
pub mod instruction;
pub mod opcode;

pub use assembler::{assemble, Bytecode};
pub use instruction::{listing, Instruction, Label, LabelAllocator};
pub use opcode::Opcode;
