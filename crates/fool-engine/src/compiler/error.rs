//! Compilation errors

use thiserror::Error;

use super::bytecode::Label;
use crate::checker::ErrorCounts;

/// Compilation result type
pub type CompileResult<T> = Result<T, CompileError>;

/// Assembler result type
pub type AssembleResult<T> = Result<T, AssembleError>;

/// Errors raised while generating or assembling code
#[derive(Debug, Error)]
pub enum CompileError {
    /// Code generation refused because earlier phases reported errors
    #[error("Compilation aborted: {0}")]
    FrontEnd(ErrorCounts),

    /// A reference without a recorded resolution
    #[error("Internal compiler error: unresolved reference at line {line}")]
    Unresolved {
        /// Source line of the reference
        line: u32,
    },

    /// A declaration or member without a recorded layout
    #[error("Internal compiler error: missing layout for `{name}` at line {line}")]
    MissingLayout {
        /// Declared name
        name: String,
        /// Source line of the declaration
        line: u32,
    },

    /// Assembler failure
    #[error(transparent)]
    Assemble(#[from] AssembleError),
}

/// Label resolution failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssembleError {
    /// A referenced label is never placed
    #[error("Undefined label: {0}")]
    UndefinedLabel(Label),

    /// A label is placed twice
    #[error("Duplicate label: {0}")]
    DuplicateLabel(Label),
}
