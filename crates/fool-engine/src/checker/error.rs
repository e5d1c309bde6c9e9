//! Error types for scope resolution and type checking
//!
//! Scope errors and type errors both carry the source line they were raised
//! at. They are accumulated in the
//! [`CompilationContext`](super::CompilationContext) rather than aborting the
//! phase that found them.

use thiserror::Error;

use crate::ast::{BinaryOperator, LogicalOperator};

/// Errors that can occur during scope and layout resolution
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScopeError {
    /// Name declared twice in the same scope (or class member declared twice)
    #[error("line {line}: '{name}' already declared")]
    Redeclared {
        /// Declared name
        name: String,
        /// Line of the second declaration
        line: u32,
    },

    /// Reference to a name with no visible declaration
    #[error("line {line}: '{name}' is not declared")]
    Undeclared {
        /// Referenced name
        name: String,
        /// Line of the reference
        line: u32,
    },

    /// Member access naming a member the class does not have
    #[error("line {line}: class '{class}' has no member '{member}'")]
    UndeclaredMember {
        /// Static class of the receiver
        class: String,
        /// Requested member
        member: String,
        /// Line of the access
        line: u32,
    },

    /// `new` of a class that was never declared
    #[error("line {line}: class '{name}' is not declared")]
    UndeclaredClass {
        /// Class name
        name: String,
        /// Line of the construction
        line: u32,
    },

    /// `extends` naming a class that is not (yet) declared
    #[error("line {line}: superclass '{name}' is not declared")]
    UndeclaredSuperclass {
        /// Superclass name
        name: String,
        /// Line of the class declaration
        line: u32,
    },

    /// Class reference type in an annotation naming an unknown class
    #[error("line {line}: type '{name}' is not declared")]
    UndeclaredType {
        /// Class name used as type
        name: String,
        /// Line of the annotation
        line: u32,
    },

    /// Class declared inside a function body
    #[error("line {line}: class '{name}' declared outside the global scope")]
    ClassNotGlobal {
        /// Class name
        name: String,
        /// Line of the class declaration
        line: u32,
    },
}

impl ScopeError {
    /// Source line the error refers to
    pub fn line(&self) -> u32 {
        match self {
            ScopeError::Redeclared { line, .. }
            | ScopeError::Undeclared { line, .. }
            | ScopeError::UndeclaredMember { line, .. }
            | ScopeError::UndeclaredClass { line, .. }
            | ScopeError::UndeclaredSuperclass { line, .. }
            | ScopeError::UndeclaredType { line, .. }
            | ScopeError::ClassNotGlobal { line, .. } => *line,
        }
    }
}

/// A type error with its source line
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("line {line}: {kind}")]
pub struct TypeError {
    /// What went wrong
    pub kind: TypeErrorKind,
    /// Line of the offending node
    pub line: u32,
}

/// Kinds of type errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeErrorKind {
    /// Initializer not a subtype of the declared variable type
    #[error("incompatible value for variable '{name}'")]
    IncompatibleValue {
        /// Variable name
        name: String,
    },

    /// Function body not a subtype of the declared return type
    #[error("wrong return type for function '{name}'")]
    WrongReturnType {
        /// Function name
        name: String,
    },

    /// Arithmetic operand that is not an integer
    #[error("non-integer operand in '{operator}'")]
    NonIntegerOperand {
        /// Offending operator
        operator: BinaryOperator,
    },

    /// Comparison between unrelated types
    #[error("incompatible operand types in '{operator}'")]
    IncomparableOperands {
        /// Offending operator
        operator: BinaryOperator,
    },

    /// Logical operand that is not strictly boolean
    #[error("non-boolean operand in '{operator}'")]
    NonBooleanOperand {
        /// Offending operator
        operator: LogicalOperator,
    },

    /// Operand of `!` that is not strictly boolean
    #[error("non-boolean operand in '!'")]
    NonBooleanNegation,

    /// Condition of an `if` that is not boolean
    #[error("non-boolean condition in if")]
    NonBooleanCondition,

    /// Branches of an `if` with no common supertype
    #[error("incompatible types in then-else branches")]
    IncompatibleBranches,

    /// Call of something that is not a function or method
    #[error("invocation of a non-function '{name}'")]
    NotCallable {
        /// Callee name
        name: String,
    },

    /// Wrong number of arguments
    #[error("wrong number of arguments for '{name}': expected {expected}, got {actual}")]
    ArgumentCount {
        /// Callee or class name
        name: String,
        /// Number of declared parameters or fields
        expected: usize,
        /// Number of supplied arguments
        actual: usize,
    },

    /// Argument not a subtype of the parameter type
    #[error("wrong type for argument {position} of '{name}'")]
    ArgumentType {
        /// Callee or class name
        name: String,
        /// 1-based argument position
        position: usize,
    },

    /// Function or method identifier used as a value
    #[error("wrong usage of function identifier '{name}'")]
    FunctionAsValue {
        /// Identifier
        name: String,
    },

    /// Class identifier used as a value
    #[error("wrong usage of class identifier '{name}'")]
    ClassAsValue {
        /// Identifier
        name: String,
    },

    /// Member access through a variable that is not an object reference
    #[error("'{name}' is not an object")]
    NotAnObject {
        /// Receiver name
        name: String,
    },

    /// Field access naming a method
    #[error("'{name}' is a method, not a field")]
    MethodAsField {
        /// Member name
        name: String,
    },

    /// Override that does not respect the inherited member's type or kind
    #[error("wrong overriding of '{member}' in class '{class}'")]
    InvalidOverride {
        /// Overriding class
        class: String,
        /// Overridden member
        member: String,
    },
}

/// Failure while type checking a node
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CheckError {
    /// Ordinary type error (already recorded in the context)
    #[error(transparent)]
    Type(#[from] TypeError),

    /// The node references a declaration that scope resolution failed to find
    #[error("line {line}: reference left unresolved by scope resolution")]
    Unresolved {
        /// Line of the unresolved reference
        line: u32,
    },
}

/// Type checking result
pub type CheckResult<T> = Result<T, CheckError>;
