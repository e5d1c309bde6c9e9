//! Node-id allocating constructors for AST nodes
//!
//! The external front end (and the test-suite) builds trees through
//! [`AstBuilder`], which guarantees that every node gets a distinct [`NodeId`].
//! The line attached to new nodes is whatever was last set with
//! [`AstBuilder::at`].

use super::*;

/// Builder handing out fresh node ids
#[derive(Debug)]
pub struct AstBuilder {
    next_id: u32,
    line: u32,
}

impl Default for AstBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AstBuilder {
    /// Create a builder starting at line 1
    pub fn new() -> Self {
        Self { next_id: 0, line: 1 }
    }

    /// Set the source line attached to subsequently built nodes
    pub fn at(&mut self, line: u32) -> &mut Self {
        self.line = line;
        self
    }

    /// Number of node ids handed out so far
    pub fn node_count(&self) -> usize {
        self.next_id as usize
    }

    fn fresh(&mut self) -> (NodeId, u32) {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        (id, self.line)
    }

    // ===== Programs =====

    /// `let <declarations> in <body>;`
    pub fn let_in(&mut self, declarations: Vec<Declaration>, body: Expression) -> Program {
        Program::LetIn(LetInProgram {
            declarations,
            body,
            line: self.line,
        })
    }

    /// A bare `<body>;` program
    pub fn program(&mut self, body: Expression) -> Program {
        Program::Expr(body)
    }

    // ===== Declarations =====

    /// `var name: ty = init;`
    pub fn var(&mut self, name: &str, ty: Type, init: Expression) -> Declaration {
        let (id, line) = self.fresh();
        Declaration::Var(VarDecl {
            id,
            name: name.to_string(),
            ty,
            init,
            line,
        })
    }

    /// `fun name: return_type (params) let declarations in body;`
    pub fn fun(
        &mut self,
        name: &str,
        return_type: Type,
        params: Vec<ParamDecl>,
        declarations: Vec<Declaration>,
        body: Expression,
    ) -> Declaration {
        Declaration::Fun(self.method(name, return_type, params, declarations, body))
    }

    /// Method declaration (same shape as a function, not wrapped in a `Declaration`)
    pub fn method(
        &mut self,
        name: &str,
        return_type: Type,
        params: Vec<ParamDecl>,
        declarations: Vec<Declaration>,
        body: Expression,
    ) -> FunDecl {
        let (id, line) = self.fresh();
        FunDecl {
            id,
            name: name.to_string(),
            return_type,
            params,
            declarations,
            body,
            line,
        }
    }

    /// Formal parameter `name: ty`
    pub fn param(&mut self, name: &str, ty: Type) -> ParamDecl {
        let (id, line) = self.fresh();
        ParamDecl {
            id,
            name: name.to_string(),
            ty,
            line,
        }
    }

    /// Class field `name: ty`
    pub fn field(&mut self, name: &str, ty: Type) -> FieldDecl {
        let (id, line) = self.fresh();
        FieldDecl {
            id,
            name: name.to_string(),
            ty,
            line,
        }
    }

    /// `class name(fields) extends superclass { methods }`
    pub fn class(
        &mut self,
        name: &str,
        superclass: Option<&str>,
        fields: Vec<FieldDecl>,
        methods: Vec<FunDecl>,
    ) -> Declaration {
        let (id, line) = self.fresh();
        Declaration::Class(ClassDecl {
            id,
            name: name.to_string(),
            superclass: superclass.map(str::to_string),
            fields,
            methods,
            line,
        })
    }

    // ===== Literals =====

    pub fn int(&mut self, value: i32) -> Expression {
        let (id, line) = self.fresh();
        Expression::IntLiteral(IntLiteral { id, value, line })
    }

    pub fn bool(&mut self, value: bool) -> Expression {
        let (id, line) = self.fresh();
        Expression::BoolLiteral(BoolLiteral { id, value, line })
    }

    pub fn null(&mut self) -> Expression {
        let (id, line) = self.fresh();
        Expression::Null(NullLiteral { id, line })
    }

    // ===== Operators =====

    /// Arithmetic or comparison expression
    pub fn binary(&mut self, operator: BinaryOperator, left: Expression, right: Expression) -> Expression {
        let (id, line) = self.fresh();
        Expression::Binary(BinaryExpression {
            id,
            operator,
            left: Box::new(left),
            right: Box::new(right),
            line,
        })
    }

    pub fn add(&mut self, left: Expression, right: Expression) -> Expression {
        self.binary(BinaryOperator::Add, left, right)
    }

    pub fn sub(&mut self, left: Expression, right: Expression) -> Expression {
        self.binary(BinaryOperator::Subtract, left, right)
    }

    pub fn mul(&mut self, left: Expression, right: Expression) -> Expression {
        self.binary(BinaryOperator::Multiply, left, right)
    }

    pub fn div(&mut self, left: Expression, right: Expression) -> Expression {
        self.binary(BinaryOperator::Divide, left, right)
    }

    pub fn eq(&mut self, left: Expression, right: Expression) -> Expression {
        self.binary(BinaryOperator::Equal, left, right)
    }

    pub fn ge(&mut self, left: Expression, right: Expression) -> Expression {
        self.binary(BinaryOperator::GreaterEqual, left, right)
    }

    pub fn le(&mut self, left: Expression, right: Expression) -> Expression {
        self.binary(BinaryOperator::LessEqual, left, right)
    }

    /// Short-circuit logical expression
    pub fn logical(&mut self, operator: LogicalOperator, left: Expression, right: Expression) -> Expression {
        let (id, line) = self.fresh();
        Expression::Logical(LogicalExpression {
            id,
            operator,
            left: Box::new(left),
            right: Box::new(right),
            line,
        })
    }

    pub fn and(&mut self, left: Expression, right: Expression) -> Expression {
        self.logical(LogicalOperator::And, left, right)
    }

    pub fn or(&mut self, left: Expression, right: Expression) -> Expression {
        self.logical(LogicalOperator::Or, left, right)
    }

    pub fn not(&mut self, operand: Expression) -> Expression {
        let (id, line) = self.fresh();
        Expression::Not(NotExpression {
            id,
            operand: Box::new(operand),
            line,
        })
    }

    /// `if condition then { then_branch } else { else_branch }`
    pub fn if_then_else(
        &mut self,
        condition: Expression,
        then_branch: Expression,
        else_branch: Expression,
    ) -> Expression {
        let (id, line) = self.fresh();
        Expression::Conditional(ConditionalExpression {
            id,
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
            line,
        })
    }

    pub fn print(&mut self, argument: Expression) -> Expression {
        let (id, line) = self.fresh();
        Expression::Print(PrintExpression {
            id,
            argument: Box::new(argument),
            line,
        })
    }

    // ===== References =====

    pub fn id(&mut self, name: &str) -> Expression {
        let (id, line) = self.fresh();
        Expression::Identifier(Identifier {
            id,
            name: name.to_string(),
            line,
        })
    }

    pub fn call(&mut self, callee: &str, arguments: Vec<Expression>) -> Expression {
        let (id, line) = self.fresh();
        Expression::Call(CallExpression {
            id,
            callee: callee.to_string(),
            arguments,
            line,
        })
    }

    /// `object.field`
    pub fn field_access(&mut self, object: &str, field: &str) -> Expression {
        let (id, line) = self.fresh();
        Expression::Field(FieldExpression {
            id,
            object: object.to_string(),
            field: field.to_string(),
            line,
        })
    }

    /// `object.method(arguments)`
    pub fn method_call(&mut self, object: &str, method: &str, arguments: Vec<Expression>) -> Expression {
        let (id, line) = self.fresh();
        Expression::MethodCall(MethodCallExpression {
            id,
            object: object.to_string(),
            method: method.to_string(),
            arguments,
            line,
        })
    }

    /// `new class(arguments)`
    pub fn new_object(&mut self, class: &str, arguments: Vec<Expression>) -> Expression {
        let (id, line) = self.fresh();
        Expression::New(NewExpression {
            id,
            class: class.to_string(),
            arguments,
            line,
        })
    }
}
