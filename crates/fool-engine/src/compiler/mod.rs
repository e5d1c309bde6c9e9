//! FOOL Compiler
//!
//! Translates a resolved, type-checked AST into stack-machine instructions and
//! assembles them into executable [`Bytecode`].
//!
//! Pipeline: AST + CompilationContext → Vec<Instruction> → Bytecode

pub mod bytecode;
pub mod codegen;
pub mod error;

pub use bytecode::{assemble, listing, Bytecode, Instruction, Label, Opcode};
pub use codegen::{CodeGenerator, CodegenOptions};
pub use error::{AssembleError, AssembleResult, CompileError, CompileResult};
