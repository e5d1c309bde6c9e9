//! Abstract Syntax Tree (AST) for the FOOL language.
//!
//! The tree is produced by an external front end and never mutated afterwards.
//! Every node carries a [`NodeId`] and a source line; later phases attach their
//! results (resolved declarations, layouts, expression types) through side
//! tables keyed by `NodeId` in the
//! [`CompilationContext`](crate::checker::CompilationContext).
//!
//! Use [`AstBuilder`] to construct trees with unique node ids.

pub mod builder;

pub use builder::AstBuilder;

use std::fmt;

use crate::types::{ArrowType, Type};

/// Identity of an AST node, unique within one tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Get the raw index
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Root node of a FOOL program
#[derive(Debug, Clone, PartialEq)]
pub enum Program {
    /// `let <declarations> in <body>;`
    LetIn(LetInProgram),

    /// A bare `<expression>;`
    Expr(Expression),
}

/// Program with a global declaration list
#[derive(Debug, Clone, PartialEq)]
pub struct LetInProgram {
    pub declarations: Vec<Declaration>,
    pub body: Expression,
    pub line: u32,
}

impl Program {
    /// Main expression of the program
    pub fn body(&self) -> &Expression {
        match self {
            Program::LetIn(program) => &program.body,
            Program::Expr(body) => body,
        }
    }

    /// Global declarations (empty for a bare expression program)
    pub fn declarations(&self) -> &[Declaration] {
        match self {
            Program::LetIn(program) => &program.declarations,
            Program::Expr(_) => &[],
        }
    }
}

// ============================================================================
// Declarations
// ============================================================================

/// Declaration appearing in a `let` list
#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    /// `var x: T = e;`
    Var(VarDecl),

    /// `fun f: T (params) let ... in body;`
    Fun(FunDecl),

    /// `class C(fields) extends S { methods }`
    Class(ClassDecl),
}

impl Declaration {
    /// Node id of the declaration
    pub fn id(&self) -> NodeId {
        match self {
            Declaration::Var(decl) => decl.id,
            Declaration::Fun(decl) => decl.id,
            Declaration::Class(decl) => decl.id,
        }
    }

    /// Declared name
    pub fn name(&self) -> &str {
        match self {
            Declaration::Var(decl) => &decl.name,
            Declaration::Fun(decl) => &decl.name,
            Declaration::Class(decl) => &decl.name,
        }
    }

    /// Source line
    pub fn line(&self) -> u32 {
        match self {
            Declaration::Var(decl) => decl.line,
            Declaration::Fun(decl) => decl.line,
            Declaration::Class(decl) => decl.line,
        }
    }
}

/// Variable declaration
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub id: NodeId,
    pub name: String,
    pub ty: Type,
    pub init: Expression,
    pub line: u32,
}

/// Function declaration; also the shape of a class method
#[derive(Debug, Clone, PartialEq)]
pub struct FunDecl {
    pub id: NodeId,
    pub name: String,
    pub return_type: Type,
    pub params: Vec<ParamDecl>,
    /// Local declarations evaluated before the body
    pub declarations: Vec<Declaration>,
    pub body: Expression,
    pub line: u32,
}

impl FunDecl {
    /// Signature of the function as an arrow type
    pub fn arrow_type(&self) -> ArrowType {
        ArrowType::new(
            self.params.iter().map(|param| param.ty.clone()).collect(),
            self.return_type.clone(),
        )
    }
}

/// Formal parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    pub id: NodeId,
    pub name: String,
    pub ty: Type,
    pub line: u32,
}

/// Class field, declared as a constructor parameter
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub id: NodeId,
    pub name: String,
    pub ty: Type,
    pub line: u32,
}

/// Class declaration
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub id: NodeId,
    pub name: String,
    pub superclass: Option<String>,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<FunDecl>,
    pub line: u32,
}

// ============================================================================
// Expressions
// ============================================================================

/// Expression (produces a value)
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Integer literal: 42
    IntLiteral(IntLiteral),

    /// Boolean literal: true, false
    BoolLiteral(BoolLiteral),

    /// Null literal
    Null(NullLiteral),

    /// Arithmetic or comparison: x + y, a >= b
    Binary(BinaryExpression),

    /// Short-circuit logical expression: x && y, a || b
    Logical(LogicalExpression),

    /// Negation: !x
    Not(NotExpression),

    /// if c then { a } else { b }
    Conditional(ConditionalExpression),

    /// print(e)
    Print(PrintExpression),

    /// Identifier use
    Identifier(Identifier),

    /// Function call: f(1, 2)
    Call(CallExpression),

    /// Field access: obj.x
    Field(FieldExpression),

    /// Method call: obj.m(1, 2)
    MethodCall(MethodCallExpression),

    /// Object construction: new C(1, 2)
    New(NewExpression),
}

impl Expression {
    /// Node id of the expression
    pub fn id(&self) -> NodeId {
        match self {
            Expression::IntLiteral(e) => e.id,
            Expression::BoolLiteral(e) => e.id,
            Expression::Null(e) => e.id,
            Expression::Binary(e) => e.id,
            Expression::Logical(e) => e.id,
            Expression::Not(e) => e.id,
            Expression::Conditional(e) => e.id,
            Expression::Print(e) => e.id,
            Expression::Identifier(e) => e.id,
            Expression::Call(e) => e.id,
            Expression::Field(e) => e.id,
            Expression::MethodCall(e) => e.id,
            Expression::New(e) => e.id,
        }
    }

    /// Source line
    pub fn line(&self) -> u32 {
        match self {
            Expression::IntLiteral(e) => e.line,
            Expression::BoolLiteral(e) => e.line,
            Expression::Null(e) => e.line,
            Expression::Binary(e) => e.line,
            Expression::Logical(e) => e.line,
            Expression::Not(e) => e.line,
            Expression::Conditional(e) => e.line,
            Expression::Print(e) => e.line,
            Expression::Identifier(e) => e.line,
            Expression::Call(e) => e.line,
            Expression::Field(e) => e.line,
            Expression::MethodCall(e) => e.line,
            Expression::New(e) => e.line,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntLiteral {
    pub id: NodeId,
    pub value: i32,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoolLiteral {
    pub id: NodeId,
    pub value: bool,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NullLiteral {
    pub id: NodeId,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpression {
    pub id: NodeId,
    pub operator: BinaryOperator,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub line: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Arithmetic
    Add,      // +
    Subtract, // -
    Multiply, // *
    Divide,   // /

    // Comparison
    Equal,        // ==
    GreaterEqual, // >=
    LessEqual,    // <=
}

impl BinaryOperator {
    /// Whether the operator is arithmetic (int operands, int result)
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            Self::Add | Self::Subtract | Self::Multiply | Self::Divide
        )
    }

    /// Source spelling of the operator
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Equal => "==",
            Self::GreaterEqual => ">=",
            Self::LessEqual => "<=",
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogicalExpression {
    pub id: NodeId,
    pub operator: LogicalOperator,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub line: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And, // &&
    Or,  // ||
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogicalOperator::And => "&&",
            LogicalOperator::Or => "||",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotExpression {
    pub id: NodeId,
    pub operand: Box<Expression>,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalExpression {
    pub id: NodeId,
    pub condition: Box<Expression>,
    pub then_branch: Box<Expression>,
    pub else_branch: Box<Expression>,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrintExpression {
    pub id: NodeId,
    pub argument: Box<Expression>,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub id: NodeId,
    pub name: String,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpression {
    pub id: NodeId,
    pub callee: String,
    pub arguments: Vec<Expression>,
    pub line: u32,
}

/// Field read through an object reference held in a named variable
#[derive(Debug, Clone, PartialEq)]
pub struct FieldExpression {
    pub id: NodeId,
    pub object: String,
    pub field: String,
    pub line: u32,
}

/// Dynamically dispatched call through an object reference
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCallExpression {
    pub id: NodeId,
    pub object: String,
    pub method: String,
    pub arguments: Vec<Expression>,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewExpression {
    pub id: NodeId,
    pub class: String,
    pub arguments: Vec<Expression>,
    pub line: u32,
}
