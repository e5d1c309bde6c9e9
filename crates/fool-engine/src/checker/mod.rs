//! Semantic analysis for FOOL programs
//!
//! Two passes over the immutable AST, both recording into one
//! [`CompilationContext`]:
//!
//! 1. [`Resolver`]: scope and layout resolution (nesting levels, offsets,
//!    virtual tables, use-site resolution)
//! 2. [`TypeChecker`]: expression types, operand/argument rules, and override
//!    validation

pub mod checker;
pub mod context;
pub mod error;
pub mod resolver;
pub mod symbols;

pub use checker::TypeChecker;
pub use context::{CompilationContext, ErrorCounts, Resolution};
pub use error::{CheckError, CheckResult, ScopeError, TypeError, TypeErrorKind};
pub use resolver::Resolver;
pub use symbols::{ClassRegistry, ScopeFrame, ScopeStack, SymbolEntry, VirtualTable};
