//! Type checker
//!
//! Computes a type for every expression of a resolved program and enforces
//! operand, argument, and override rules. Type errors inside a declaration are
//! recorded and checking moves on to the next declaration; an error in the
//! program's main expression is also returned to the caller.

use tracing::{debug, info};

use super::context::{CompilationContext, Resolution};
use super::error::{CheckError, CheckResult, TypeError, TypeErrorKind};
use super::symbols::SymbolEntry;
use crate::ast::*;
use crate::types::{ArrowType, Type};

/// Type checker over a resolved program
pub struct TypeChecker<'ctx> {
    ctx: &'ctx mut CompilationContext,
}

impl<'ctx> TypeChecker<'ctx> {
    /// Create a type checker recording into `ctx`
    pub fn new(ctx: &'ctx mut CompilationContext) -> Self {
        TypeChecker { ctx }
    }

    /// Check a whole program, returning the type of its main expression
    pub fn check_program(&mut self, program: &Program) -> CheckResult<Type> {
        for declaration in program.declarations() {
            self.check_declaration_recovering(declaration);
        }
        let result = self.check_expression(program.body());

        info!(
            errors = self.ctx.type_errors().len(),
            main_type = ?result.as_ref().ok(),
            "type checking finished"
        );
        result
    }

    fn is_subtype(&self, sub: &Type, sup: &Type) -> bool {
        self.ctx.subtyping().is_subtype(sub, sup)
    }

    /// Record a type error without aborting the current node
    fn report(&mut self, kind: TypeErrorKind, line: u32) -> TypeError {
        let error = TypeError { kind, line };
        self.ctx.report_type_error(error.clone());
        error
    }

    /// Record a type error and abort the current node
    fn fail<T>(&mut self, kind: TypeErrorKind, line: u32) -> CheckResult<T> {
        Err(self.report(kind, line).into())
    }

    fn resolution(&self, node: NodeId, line: u32) -> CheckResult<Resolution> {
        self.ctx
            .resolution(node)
            .cloned()
            .ok_or(CheckError::Unresolved { line })
    }

    fn member(&self, node: NodeId, line: u32) -> CheckResult<SymbolEntry> {
        self.ctx.member(node).cloned().ok_or(CheckError::Unresolved { line })
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    fn check_declaration_recovering(&mut self, declaration: &Declaration) {
        match self.check_declaration(declaration) {
            Ok(()) => {}
            Err(CheckError::Type(error)) => {
                debug!(%error, declaration = declaration.name(), "skipping rest of declaration");
            }
            Err(CheckError::Unresolved { line }) => {
                debug!(line, declaration = declaration.name(), "declaration has unresolved references");
            }
        }
    }

    fn check_declaration(&mut self, declaration: &Declaration) -> CheckResult<()> {
        match declaration {
            Declaration::Var(var) => {
                let init = self.check_expression(&var.init)?;
                if !self.is_subtype(&init, &var.ty) {
                    return self.fail(
                        TypeErrorKind::IncompatibleValue {
                            name: var.name.clone(),
                        },
                        var.line,
                    );
                }
                Ok(())
            }
            Declaration::Fun(fun) => self.check_function(fun),
            Declaration::Class(class) => {
                self.check_class(class);
                Ok(())
            }
        }
    }

    fn check_function(&mut self, fun: &FunDecl) -> CheckResult<()> {
        for declaration in &fun.declarations {
            self.check_declaration_recovering(declaration);
        }
        let body = self.check_expression(&fun.body)?;
        if !self.is_subtype(&body, &fun.return_type) {
            return self.fail(
                TypeErrorKind::WrongReturnType {
                    name: fun.name.clone(),
                },
                fun.line,
            );
        }
        Ok(())
    }

    fn check_class(&mut self, class: &ClassDecl) {
        for method in &class.methods {
            if let Err(error) = self.check_function(method) {
                debug!(%error, class = %class.name, method = %method.name, "skipping rest of method");
            }
        }

        // Override validation against the superclass's members
        let Some(inherited) = class
            .superclass
            .as_deref()
            .and_then(|name| self.ctx.classes.virtual_table(name))
            .cloned()
        else {
            return;
        };
        let invalid_override = |member: &str| TypeErrorKind::InvalidOverride {
            class: class.name.clone(),
            member: member.to_string(),
        };

        for field in &class.fields {
            let Some(overridden) = inherited.get(&field.name) else {
                continue;
            };
            if overridden.ty.is_method() || !self.is_subtype(&field.ty, &overridden.ty) {
                self.report(invalid_override(&field.name), field.line);
            }
        }
        for method in &class.methods {
            let Some(overridden) = inherited.get(&method.name) else {
                continue;
            };
            let sound = match &overridden.ty {
                Type::Method(overridden) => self
                    .ctx
                    .subtyping()
                    .is_arrow_subtype(&method.arrow_type(), overridden),
                _ => false,
            };
            if !sound {
                self.report(invalid_override(&method.name), method.line);
            }
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// Check an expression and fill its type slot
    pub fn check_expression(&mut self, expr: &Expression) -> CheckResult<Type> {
        let ty = self.infer(expr)?;
        self.ctx.record_type(expr.id(), ty.clone());
        Ok(ty)
    }

    fn infer(&mut self, expr: &Expression) -> CheckResult<Type> {
        match expr {
            Expression::IntLiteral(_) => Ok(Type::Int),
            Expression::BoolLiteral(_) => Ok(Type::Bool),
            Expression::Null(_) => Ok(Type::Empty),

            Expression::Binary(binary) => {
                let left = self.check_expression(&binary.left)?;
                let right = self.check_expression(&binary.right)?;
                if binary.operator.is_arithmetic() {
                    if !(self.is_subtype(&left, &Type::Int) && self.is_subtype(&right, &Type::Int)) {
                        return self.fail(
                            TypeErrorKind::NonIntegerOperand {
                                operator: binary.operator,
                            },
                            binary.line,
                        );
                    }
                    Ok(Type::Int)
                } else {
                    if !(self.is_subtype(&left, &right) || self.is_subtype(&right, &left)) {
                        return self.fail(
                            TypeErrorKind::IncomparableOperands {
                                operator: binary.operator,
                            },
                            binary.line,
                        );
                    }
                    Ok(Type::Bool)
                }
            }

            Expression::Logical(logical) => {
                let left = self.check_expression(&logical.left)?;
                let right = self.check_expression(&logical.right)?;
                if !(self.is_subtype(&left, &Type::Bool) && self.is_subtype(&right, &Type::Bool)) {
                    return self.fail(
                        TypeErrorKind::NonBooleanOperand {
                            operator: logical.operator,
                        },
                        logical.line,
                    );
                }
                Ok(Type::Bool)
            }

            Expression::Not(not) => {
                let operand = self.check_expression(&not.operand)?;
                if !self.is_subtype(&operand, &Type::Bool) {
                    return self.fail(TypeErrorKind::NonBooleanNegation, not.line);
                }
                Ok(Type::Bool)
            }

            Expression::Conditional(cond) => {
                let condition = self.check_expression(&cond.condition)?;
                if !self.is_subtype(&condition, &Type::Bool) {
                    return self.fail(TypeErrorKind::NonBooleanCondition, cond.line);
                }
                let then_ty = self.check_expression(&cond.then_branch)?;
                let else_ty = self.check_expression(&cond.else_branch)?;
                if self.is_subtype(&then_ty, &else_ty) {
                    return Ok(else_ty);
                }
                if self.is_subtype(&else_ty, &then_ty) {
                    return Ok(then_ty);
                }
                match self.ctx.subtyping().lowest_common_ancestor(&then_ty, &else_ty) {
                    Some(ty) => Ok(ty),
                    None => self.fail(TypeErrorKind::IncompatibleBranches, cond.line),
                }
            }

            Expression::Print(print) => self.check_expression(&print.argument),

            Expression::Identifier(ident) => {
                let resolution = self.resolution(ident.id, ident.line)?;
                match resolution.entry.ty {
                    Type::Arrow(_) | Type::Method(_) => self.fail(
                        TypeErrorKind::FunctionAsValue {
                            name: ident.name.clone(),
                        },
                        ident.line,
                    ),
                    Type::Class(_) => self.fail(
                        TypeErrorKind::ClassAsValue {
                            name: ident.name.clone(),
                        },
                        ident.line,
                    ),
                    ty => Ok(ty),
                }
            }

            Expression::Call(call) => {
                let resolution = self.resolution(call.id, call.line)?;
                let Some(arrow) = resolution.entry.ty.as_callable().cloned() else {
                    return self.fail(
                        TypeErrorKind::NotCallable {
                            name: call.callee.clone(),
                        },
                        call.line,
                    );
                };
                self.check_arguments(&call.callee, &arrow, &call.arguments, call.line)?;
                Ok(*arrow.ret)
            }

            Expression::Field(access) => {
                self.check_receiver(access.id, &access.object, access.line)?;
                let member = self.member(access.id, access.line)?;
                if member.ty.is_method() {
                    return self.fail(
                        TypeErrorKind::MethodAsField {
                            name: access.field.clone(),
                        },
                        access.line,
                    );
                }
                Ok(member.ty)
            }

            Expression::MethodCall(call) => {
                self.check_receiver(call.id, &call.object, call.line)?;
                let member = self.member(call.id, call.line)?;
                let Type::Method(arrow) = member.ty else {
                    return self.fail(
                        TypeErrorKind::NotCallable {
                            name: call.method.clone(),
                        },
                        call.line,
                    );
                };
                self.check_arguments(&call.method, &arrow, &call.arguments, call.line)?;
                Ok(*arrow.ret)
            }

            Expression::New(new) => {
                self.resolution(new.id, new.line)?;
                let Some(fields) = self
                    .ctx
                    .classes
                    .class_type(&new.class)
                    .map(|class| class.fields.clone())
                else {
                    return Err(CheckError::Unresolved { line: new.line });
                };
                let constructor = ArrowType::new(fields, Type::class_ref(new.class.as_str()));
                self.check_arguments(&new.class, &constructor, &new.arguments, new.line)?;
                Ok(*constructor.ret)
            }
        }
    }

    /// The receiver of a member access must hold an object reference
    fn check_receiver(&mut self, node: NodeId, object: &str, line: u32) -> CheckResult<()> {
        let resolution = self.resolution(node, line)?;
        if !matches!(resolution.entry.ty, Type::Ref(_)) {
            return self.fail(
                TypeErrorKind::NotAnObject {
                    name: object.to_string(),
                },
                line,
            );
        }
        Ok(())
    }

    fn check_arguments(
        &mut self,
        name: &str,
        signature: &ArrowType,
        arguments: &[Expression],
        line: u32,
    ) -> CheckResult<()> {
        if signature.arity() != arguments.len() {
            return self.fail(
                TypeErrorKind::ArgumentCount {
                    name: name.to_string(),
                    expected: signature.arity(),
                    actual: arguments.len(),
                },
                line,
            );
        }
        for (position, (argument, param)) in arguments.iter().zip(&signature.params).enumerate() {
            let ty = self.check_expression(argument)?;
            if !self.is_subtype(&ty, param) {
                return self.fail(
                    TypeErrorKind::ArgumentType {
                        name: name.to_string(),
                        position: position + 1,
                    },
                    line,
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::Resolver;

    fn check(program: &Program) -> (CompilationContext, CheckResult<Type>) {
        let mut ctx = CompilationContext::new();
        Resolver::new(&mut ctx).resolve_program(program);
        let result = TypeChecker::new(&mut ctx).check_program(program);
        (ctx, result)
    }

    fn kinds(ctx: &CompilationContext) -> Vec<TypeErrorKind> {
        ctx.type_errors().iter().map(|e| e.kind.clone()).collect()
    }

    #[test]
    fn test_main_expression_type() {
        let mut b = AstBuilder::new();
        let one = b.int(1);
        let two = b.int(2);
        let sum = b.add(one, two);
        let program = b.program(sum);

        let (ctx, result) = check(&program);
        assert_eq!(result, Ok(Type::Int));
        assert!(ctx.type_errors().is_empty());
        assert_eq!(ctx.type_of(program.body().id()), Some(&Type::Int));
    }

    #[test]
    fn test_bare_expression_error_propagates() {
        // if (5) then {true} else {false};
        let mut b = AstBuilder::new();
        let five = b.int(5);
        let t = b.bool(true);
        let f = b.bool(false);
        let cond = b.if_then_else(five, t, f);
        let program = b.program(cond);

        let (ctx, result) = check(&program);
        assert!(matches!(
            result,
            Err(CheckError::Type(TypeError {
                kind: TypeErrorKind::NonBooleanCondition,
                ..
            }))
        ));
        assert_eq!(ctx.type_errors().len(), 1);
    }

    #[test]
    fn test_declaration_errors_recover() {
        // let var x:bool = 5; fun f:bool() let var y:int = 5; in y; in 3;
        let mut b = AstBuilder::new();
        let five = b.int(5);
        let x = b.var("x", Type::Bool, five);
        let five = b.int(5);
        let y = b.var("y", Type::Int, five);
        let body = b.id("y");
        let f = b.fun("f", Type::Bool, vec![], vec![y], body);
        let three = b.int(3);
        let program = b.let_in(vec![x, f], three);

        let (ctx, result) = check(&program);
        assert_eq!(result, Ok(Type::Int));
        assert_eq!(
            kinds(&ctx),
            vec![
                TypeErrorKind::IncompatibleValue { name: "x".to_string() },
                TypeErrorKind::WrongReturnType { name: "f".to_string() },
            ]
        );
    }

    #[test]
    fn test_branch_unification() {
        // let var x:int = 1; var b:bool = true; in if true then {x} else {b}
        let mut b = AstBuilder::new();
        let one = b.int(1);
        let x = b.var("x", Type::Int, one);
        let t = b.bool(true);
        let flag = b.var("b", Type::Bool, t);
        let cond = b.bool(true);
        let then_branch = b.id("x");
        let else_branch = b.id("b");
        let body = b.if_then_else(cond, then_branch, else_branch);
        let program = b.let_in(vec![x, flag], body);

        let (_, result) = check(&program);
        assert_eq!(result, Ok(Type::Int));
    }

    #[test]
    fn test_branch_unification_through_common_ancestor() {
        // class A() {} class B() extends A {} class C() extends A {} class D() {}
        let mut b = AstBuilder::new();
        let a = b.class("A", None, vec![], vec![]);
        let bb = b.class("B", Some("A"), vec![], vec![]);
        let c = b.class("C", Some("A"), vec![], vec![]);
        let d = b.class("D", None, vec![], vec![]);
        let nb = b.new_object("B", vec![]);
        let vb = b.var("b", Type::class_ref("B"), nb);
        let nc = b.new_object("C", vec![]);
        let vc = b.var("c", Type::class_ref("C"), nc);
        let nd = b.new_object("D", vec![]);
        let vd = b.var("d", Type::class_ref("D"), nd);

        let cond = b.bool(true);
        let then_branch = b.id("b");
        let else_branch = b.id("c");
        let unified = b.if_then_else(cond, then_branch, else_branch);
        let unified_id = unified.id();
        let ok = b.var("ok", Type::class_ref("A"), unified);

        let cond = b.bool(true);
        let then_branch = b.id("b");
        let else_branch = b.id("d");
        let body = b.if_then_else(cond, then_branch, else_branch);
        let program = b.let_in(vec![a, bb, c, d, vb, vc, vd, ok], body);

        let (ctx, result) = check(&program);
        assert_eq!(ctx.type_of(unified_id), Some(&Type::class_ref("A")));
        assert!(matches!(
            result,
            Err(CheckError::Type(TypeError {
                kind: TypeErrorKind::IncompatibleBranches,
                ..
            }))
        ));
    }

    #[test]
    fn test_function_identifier_as_value() {
        // let fun f:int() 5; in 5 * f;
        let mut b = AstBuilder::new();
        let five = b.int(5);
        let f = b.fun("f", Type::Int, vec![], vec![], five);
        let five = b.int(5);
        let id = b.id("f");
        let body = b.mul(five, id);
        let program = b.let_in(vec![f], body);

        let (ctx, result) = check(&program);
        assert!(result.is_err());
        assert_eq!(
            kinds(&ctx),
            vec![TypeErrorKind::FunctionAsValue { name: "f".to_string() }]
        );
    }

    #[test]
    fn test_unresolved_reference_is_not_a_type_error() {
        let mut b = AstBuilder::new();
        let missing = b.id("missing");
        let one = b.int(1);
        let sum = b.add(missing, one);
        let v = b.var("v", Type::Int, sum);
        let ghost = b.id("ghost");
        let program = b.let_in(vec![v], ghost);

        let (ctx, result) = check(&program);
        assert!(matches!(result, Err(CheckError::Unresolved { .. })));
        assert!(ctx.type_errors().is_empty());
        assert_eq!(ctx.scope_errors().len(), 2);
    }

    #[test]
    fn test_call_rules() {
        // let var x:int = 5; fun f:int(a:bool) 5; in x() + f(1, 2) + f(5)
        let mut b = AstBuilder::new();
        let five = b.int(5);
        let x = b.var("x", Type::Int, five);
        let a = b.param("a", Type::Bool);
        let five = b.int(5);
        let f = b.fun("f", Type::Int, vec![a], vec![], five);

        let not_callable = b.call("x", vec![]);
        let v1 = b.var("v1", Type::Int, not_callable);
        let one = b.int(1);
        let two = b.int(2);
        let arity = b.call("f", vec![one, two]);
        let v2 = b.var("v2", Type::Int, arity);
        let five = b.int(5);
        let wrong_type = b.call("f", vec![five]);
        let v3 = b.var("v3", Type::Int, wrong_type);
        let t = b.bool(true);
        let good = b.call("f", vec![t]);
        let program = b.let_in(vec![x, f, v1, v2, v3], good);

        let (ctx, result) = check(&program);
        assert_eq!(result, Ok(Type::Int));
        assert_eq!(
            kinds(&ctx),
            vec![
                TypeErrorKind::NotCallable { name: "x".to_string() },
                TypeErrorKind::ArgumentCount {
                    name: "f".to_string(),
                    expected: 1,
                    actual: 2
                },
                TypeErrorKind::ArgumentType {
                    name: "f".to_string(),
                    position: 1
                },
            ]
        );
    }

    #[test]
    fn test_override_validation() {
        // class A(x:int) { fun m:int(a:int) a; fun n:A() null; }
        // class B(x:bool, m:int) extends A { fun n:B() null; }          -- ok fields/methods
        // class C() extends A { fun x:int() 1; fun m:int(a:bool) 1; }   -- two bad overrides
        let mut b = AstBuilder::new();
        let x = b.field("x", Type::Int);
        let a = b.param("a", Type::Int);
        let body = b.id("a");
        let m = b.method("m", Type::Int, vec![a], vec![], body);
        let null = b.null();
        let n = b.method("n", Type::class_ref("A"), vec![], vec![], null);
        let class_a = b.class("A", None, vec![x], vec![m, n]);

        let bx = b.field("x", Type::Bool);
        let bm = b.field("m", Type::Int);
        let null = b.null();
        let bn = b.method("n", Type::class_ref("B"), vec![], vec![], null);
        let class_b = b.class("B", Some("A"), vec![bx, bm], vec![bn]);

        let one = b.int(1);
        let cx = b.method("x", Type::Int, vec![], vec![], one);
        let ca = b.param("a", Type::Bool);
        let one = b.int(1);
        let cm = b.method("m", Type::Int, vec![ca], vec![], one);
        let class_c = b.class("C", Some("A"), vec![], vec![cx, cm]);

        let body = b.int(0);
        let program = b.let_in(vec![class_a, class_b, class_c], body);

        let (ctx, result) = check(&program);
        assert!(ctx.scope_errors().is_empty(), "{:?}", ctx.scope_errors());
        assert_eq!(result, Ok(Type::Int));
        let invalid = |class: &str, member: &str| TypeErrorKind::InvalidOverride {
            class: class.to_string(),
            member: member.to_string(),
        };
        assert_eq!(
            kinds(&ctx),
            vec![invalid("B", "m"), invalid("C", "x"), invalid("C", "m")]
        );
    }

    #[test]
    fn test_member_rules() {
        // class P(v:int) { fun get:int() v; } var p:P = new P(true); var i:int = 3;
        // in p.get() + p.v + i.v + p.get
        let mut b = AstBuilder::new();
        let v = b.field("v", Type::Int);
        let body = b.id("v");
        let get = b.method("get", Type::Int, vec![], vec![], body);
        let class = b.class("P", None, vec![v], vec![get]);
        let t = b.bool(true);
        let new = b.new_object("P", vec![t]);
        let p = b.var("p", Type::class_ref("P"), new);
        let three = b.int(3);
        let i = b.var("i", Type::Int, three);

        let call = b.method_call("p", "get", vec![]);
        let field = b.field_access("p", "v");
        let good = b.add(call, field);
        let vg = b.var("good", Type::Int, good);
        let not_object = b.field_access("i", "v");
        let vn = b.var("bad", Type::Int, not_object);
        let method_as_field = b.field_access("p", "get");
        let program = b.let_in(vec![class, p, i, vg, vn], method_as_field);

        let (ctx, result) = check(&program);
        assert!(result.is_err());
        // new P(true): bool is a subtype of int
        assert_eq!(
            kinds(&ctx),
            vec![
                TypeErrorKind::NotAnObject { name: "i".to_string() },
                TypeErrorKind::MethodAsField { name: "get".to_string() },
            ]
        );
    }

    #[test]
    fn test_null_is_not_int() {
        let mut b = AstBuilder::new();
        let null = b.null();
        let minus_one = b.int(-1);
        let cond = b.eq(null, minus_one);
        let t = b.bool(true);
        let f = b.bool(false);
        let body = b.if_then_else(cond, t, f);
        let program = b.program(body);

        let (_, result) = check(&program);
        assert!(matches!(
            result,
            Err(CheckError::Type(TypeError {
                kind: TypeErrorKind::IncomparableOperands { .. },
                ..
            }))
        ));
    }
}
