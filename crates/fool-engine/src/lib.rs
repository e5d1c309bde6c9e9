//! FOOL Language Engine
//!
//! Back end of the FOOL compiler, a small functional/object-oriented language
//! with nested functions, single-inheritance classes, and dynamic dispatch:
//! - **AST**: Immutable syntax tree with node ids (`ast` module)
//! - **Types**: Type representation and subtyping (`types` module)
//! - **Checker**: Scope and layout resolution, type checking (`checker` module)
//! - **Compiler**: Stack-machine code generation and assembly (`compiler` module)
//! - **VM**: Stack virtual machine (`vm` module)
//!
//! Parsing is done by an external front end that builds trees through
//! [`AstBuilder`].
//!
//! # Example
//!
//! ```rust,ignore
//! use fool_engine::{AstBuilder, Pipeline};
//!
//! // print(1 + 2 * 3);
//! let mut b = AstBuilder::new();
//! let (one, two, three) = (b.int(1), b.int(2), b.int(3));
//! let product = b.mul(two, three);
//! let sum = b.add(one, product);
//! let print = b.print(sum);
//! let program = b.program(print);
//!
//! let mut out = Vec::new();
//! Pipeline::default().run(&program, &mut out)?;
//! assert_eq!(out, b"7\n");
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// ============================================================================
// Core Modules
// ============================================================================

/// AST module: syntax tree and builder
#[allow(missing_docs)]
pub mod ast;

/// Types module: type representation and subtyping
pub mod types;

/// Checker module: resolver, type checker, and compilation context
pub mod checker;

/// Compiler module: code generation and bytecode
pub mod compiler;

/// VM module: stack virtual machine
pub mod vm;

/// Pipeline module: end-to-end driver API
pub mod pipeline;

// ============================================================================
// Re-exports
// ============================================================================

pub use ast::{AstBuilder, NodeId, Program};
pub use checker::{
    CheckError, CompilationContext, ErrorCounts, Resolver, ScopeError, TypeChecker, TypeError,
    TypeErrorKind,
};
pub use compiler::{assemble, listing, Bytecode, CodeGenerator, CodegenOptions, CompileError, Instruction};
pub use pipeline::{Analysis, Compiled, Pipeline, PipelineError};
pub use types::Type;
pub use vm::{ExecutionStats, FaultKind, Vm, VmError, VmOptions};
