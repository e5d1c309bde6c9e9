//! Core type representation

use std::fmt;

/// A FOOL type
///
/// The same representation serves as source type annotation and as the type
/// computed for expressions and declarations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// Machine integer
    Int,

    /// Boolean, represented at runtime as 0/1
    Bool,

    /// Plain function type
    Arrow(ArrowType),

    /// Reference to an instance of the named class
    Ref(String),

    /// Method type; wraps an arrow so methods are distinguishable from functions
    Method(ArrowType),

    /// Class definition type, including inherited members
    Class(ClassType),

    /// Type of `null`
    Empty,
}

impl Type {
    /// Create a plain function type
    pub fn arrow(params: Vec<Type>, ret: Type) -> Self {
        Type::Arrow(ArrowType::new(params, ret))
    }

    /// Create a class reference type
    pub fn class_ref(name: impl Into<String>) -> Self {
        Type::Ref(name.into())
    }

    /// Whether this is a method type
    pub fn is_method(&self) -> bool {
        matches!(self, Type::Method(_))
    }

    /// Arrow signature of a function or method type
    pub fn as_callable(&self) -> Option<&ArrowType> {
        match self {
            Type::Arrow(arrow) | Type::Method(arrow) => Some(arrow),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Bool => write!(f, "bool"),
            Type::Arrow(arrow) => write!(f, "{}", arrow),
            Type::Ref(name) => write!(f, "{}", name),
            Type::Method(arrow) => write!(f, "method {}", arrow),
            Type::Class(class) => write!(f, "{}", class),
            Type::Empty => write!(f, "null"),
        }
    }
}

/// Function signature: ordered parameter types and a return type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArrowType {
    pub params: Vec<Type>,
    pub ret: Box<Type>,
}

impl ArrowType {
    /// Create an arrow type
    pub fn new(params: Vec<Type>, ret: Type) -> Self {
        Self {
            params,
            ret: Box::new(ret),
        }
    }

    /// Number of parameters
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

impl fmt::Display for ArrowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param)?;
        }
        write!(f, ") -> {}", self.ret)
    }
}

/// Shape of a class: all fields and all methods, inherited ones first
///
/// `fields[i]` is the field stored at offset `-i - 1` from the object pointer;
/// `methods[i]` is the method at dispatch-table index `i`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ClassType {
    pub fields: Vec<Type>,
    pub methods: Vec<ArrowType>,
}

impl fmt::Display for ClassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class {{ fields: [")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", field)?;
        }
        write!(f, "], methods: [")?;
        for (i, method) in self.methods.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", method)?;
        }
        write!(f, "] }}")
    }
}
