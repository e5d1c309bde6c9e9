//! Scope and layout resolution
//!
//! Walks the AST once, assigning every declaration a nesting level and a frame
//! offset, building class virtual tables, and resolving every use-site to its
//! declaration. Errors are recorded in the context and resolution continues, so
//! one pass reports every scope problem in the program.
//!
//! Layout rules:
//! - within one scope, declarations get offsets -2, -3, ... and parameters
//!   get 1, 2, ...; the enclosing scope's counter is restored on exit
//! - fields get negative offsets from the object pointer, deepest ancestor
//!   first; an overriding field keeps the inherited offset
//! - methods get dispatch-table indices starting after the superclass's
//!   methods; an overriding method keeps the inherited index

use rustc_hash::FxHashSet;
use tracing::info;

use super::context::{CompilationContext, Resolution};
use super::error::ScopeError;
use super::symbols::{ScopeFrame, ScopeStack, SymbolEntry, VirtualTable};
use crate::ast::*;
use crate::types::{ClassType, Type};

/// Offset of the first local declaration of a frame
const FIRST_DECL_OFFSET: i32 = -2;

/// Offset of the first parameter of a frame
const FIRST_PARAM_OFFSET: i32 = 1;

/// Nesting level of class members (the class body scope)
const MEMBER_NESTING_LEVEL: u32 = 1;

/// Scope and layout resolver
pub struct Resolver<'ctx> {
    ctx: &'ctx mut CompilationContext,
    scopes: ScopeStack,
    decl_offset: i32,
}

impl<'ctx> Resolver<'ctx> {
    /// Create a resolver recording into `ctx`
    pub fn new(ctx: &'ctx mut CompilationContext) -> Self {
        Resolver {
            ctx,
            scopes: ScopeStack::new(),
            decl_offset: FIRST_DECL_OFFSET,
        }
    }

    /// Resolve a whole program
    pub fn resolve_program(&mut self, program: &Program) {
        match program {
            Program::LetIn(program) => {
                self.scopes.push(ScopeFrame::default());
                self.decl_offset = FIRST_DECL_OFFSET;
                for declaration in &program.declarations {
                    self.resolve_declaration(declaration);
                }
                self.resolve_expression(&program.body);
                self.scopes.pop();
            }
            Program::Expr(body) => self.resolve_expression(body),
        }

        info!(
            errors = self.ctx.scope_errors().len(),
            classes = self.ctx.classes.len(),
            "scope resolution finished"
        );
    }

    fn nesting_level(&self) -> u32 {
        self.scopes.nesting_level()
    }

    fn next_decl_offset(&mut self) -> i32 {
        let offset = self.decl_offset;
        self.decl_offset -= 1;
        offset
    }

    fn error(&mut self, error: ScopeError) {
        self.ctx.report_scope_error(error);
    }

    /// Declare `name` in the innermost scope and record its layout
    fn declare(&mut self, node: NodeId, name: &str, entry: SymbolEntry, line: u32) {
        self.ctx.record_layout(node, entry.clone());
        if !self.scopes.declare(name, entry) {
            self.error(ScopeError::Redeclared {
                name: name.to_string(),
                line,
            });
        }
    }

    /// Every class named by a type annotation must be declared
    fn check_annotation(&mut self, ty: &Type, line: u32) {
        match ty {
            Type::Ref(name) if !self.ctx.classes.contains(name) => {
                self.error(ScopeError::UndeclaredType {
                    name: name.clone(),
                    line,
                });
            }
            Type::Arrow(arrow) | Type::Method(arrow) => {
                for param in &arrow.params {
                    self.check_annotation(param, line);
                }
                self.check_annotation(&arrow.ret, line);
            }
            _ => {}
        }
    }

    /// Like [`Self::check_annotation`], but accepts a reference to the
    /// enclosing class even when that class could not be registered
    fn check_member_annotation(&mut self, class: &str, ty: &Type, line: u32) {
        if !matches!(ty, Type::Ref(name) if name == class) {
            self.check_annotation(ty, line);
        }
    }

    fn check_signature(&mut self, fun: &FunDecl) {
        for param in &fun.params {
            self.check_annotation(&param.ty, param.line);
        }
        self.check_annotation(&fun.return_type, fun.line);
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    fn resolve_declaration(&mut self, declaration: &Declaration) {
        match declaration {
            Declaration::Var(var) => {
                // The initializer cannot see the variable itself
                self.resolve_expression(&var.init);
                self.check_annotation(&var.ty, var.line);
                let entry = SymbolEntry::new(self.nesting_level(), var.ty.clone(), self.next_decl_offset());
                self.declare(var.id, &var.name, entry, var.line);
            }
            Declaration::Fun(fun) => {
                self.check_signature(fun);
                let entry = SymbolEntry::new(
                    self.nesting_level(),
                    Type::Arrow(fun.arrow_type()),
                    self.next_decl_offset(),
                );
                // Declared before the body so the function can recurse
                self.declare(fun.id, &fun.name, entry, fun.line);
                self.resolve_body(fun);
            }
            Declaration::Class(class) => self.resolve_class(class),
        }
    }

    /// Resolve parameters, local declarations, and body in a fresh scope
    fn resolve_body(&mut self, fun: &FunDecl) {
        self.scopes.push(ScopeFrame::default());
        let saved_offset = std::mem::replace(&mut self.decl_offset, FIRST_DECL_OFFSET);
        let level = self.nesting_level();

        for (param_offset, param) in (FIRST_PARAM_OFFSET..).zip(&fun.params) {
            let entry = SymbolEntry::new(level, param.ty.clone(), param_offset);
            self.declare(param.id, &param.name, entry, param.line);
        }
        for declaration in &fun.declarations {
            self.resolve_declaration(declaration);
        }
        self.resolve_expression(&fun.body);

        self.scopes.pop();
        self.decl_offset = saved_offset;
    }

    fn resolve_class(&mut self, class: &ClassDecl) {
        // A class outside the global scope is still laid out and its bodies
        // resolved, but it is neither registered nor declared
        let global = self.nesting_level() == 0;
        if !global {
            self.error(ScopeError::ClassNotGlobal {
                name: class.name.clone(),
                line: class.line,
            });
        }

        // Start from a copy of the superclass; an unknown superclass is
        // reported and replaced by an empty one
        let mut superclass = None;
        let (mut class_type, mut table) = match &class.superclass {
            Some(name) => match (self.ctx.classes.class_type(name), self.ctx.classes.virtual_table(name)) {
                (Some(ty), Some(table)) => {
                    superclass = Some(name.as_str());
                    (ty.clone(), table.clone())
                }
                _ => {
                    self.error(ScopeError::UndeclaredSuperclass {
                        name: name.clone(),
                        line: class.line,
                    });
                    (ClassType::default(), VirtualTable::default())
                }
            },
            None => (ClassType::default(), VirtualTable::default()),
        };

        // Phase 1: lay out member signatures
        let mut members: FxHashSet<&str> = FxHashSet::default();
        let mut field_offset = -(class_type.fields.len() as i32) - 1;
        for field in &class.fields {
            if !members.insert(&field.name) {
                self.error(ScopeError::Redeclared {
                    name: field.name.clone(),
                    line: field.line,
                });
                continue;
            }
            let inherited = table.get(&field.name).filter(|entry| !entry.ty.is_method());
            let offset = match inherited.map(|entry| entry.offset) {
                Some(offset) => {
                    if let Some(slot) = class_type.fields.get_mut(field_index(offset)) {
                        *slot = field.ty.clone();
                    }
                    offset
                }
                None => {
                    let offset = field_offset;
                    field_offset -= 1;
                    class_type.fields.push(field.ty.clone());
                    offset
                }
            };
            let entry = SymbolEntry::new(MEMBER_NESTING_LEVEL, field.ty.clone(), offset);
            self.ctx.record_layout(field.id, entry.clone());
            table.insert(field.name.clone(), entry);
        }

        let mut method_offset = class_type.methods.len() as i32;
        for method in &class.methods {
            if !members.insert(&method.name) {
                self.error(ScopeError::Redeclared {
                    name: method.name.clone(),
                    line: method.line,
                });
                continue;
            }
            let arrow = method.arrow_type();
            let inherited = table.get(&method.name).filter(|entry| entry.ty.is_method());
            let offset = match inherited.map(|entry| entry.offset) {
                Some(offset) => {
                    if let Some(slot) = class_type.methods.get_mut(offset as usize) {
                        *slot = arrow.clone();
                    }
                    offset
                }
                None => {
                    let offset = method_offset;
                    method_offset += 1;
                    class_type.methods.push(arrow.clone());
                    offset
                }
            };
            let entry = SymbolEntry::new(MEMBER_NESTING_LEVEL, Type::Method(arrow), offset);
            self.ctx.record_layout(method.id, entry.clone());
            table.insert(method.name.clone(), entry);
        }

        // The virtual table is final from here on
        if global {
            let class_offset = self.next_decl_offset();
            if self.ctx.classes.register(&class.name, table.clone(), class_type.clone()) {
                if let Some(superclass) = superclass {
                    self.ctx.classes.set_superclass(&class.name, superclass);
                }
            }
            let entry = SymbolEntry::new(0, Type::Class(class_type), class_offset);
            self.declare(class.id, &class.name, entry, class.line);
        }

        // Annotations may mention the class itself
        for field in &class.fields {
            self.check_member_annotation(&class.name, &field.ty, field.line);
        }
        for method in &class.methods {
            for param in &method.params {
                self.check_member_annotation(&class.name, &param.ty, param.line);
            }
            self.check_member_annotation(&class.name, &method.return_type, method.line);
        }

        // Phase 2: method bodies, with the members visible as enclosing names
        self.scopes.push(table);
        for method in &class.methods {
            self.resolve_body(method);
        }
        self.scopes.pop();
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn resolve_expression(&mut self, expr: &Expression) {
        match expr {
            Expression::IntLiteral(_) | Expression::BoolLiteral(_) | Expression::Null(_) => {}
            Expression::Binary(binary) => {
                self.resolve_expression(&binary.left);
                self.resolve_expression(&binary.right);
            }
            Expression::Logical(logical) => {
                self.resolve_expression(&logical.left);
                self.resolve_expression(&logical.right);
            }
            Expression::Not(not) => self.resolve_expression(&not.operand),
            Expression::Conditional(cond) => {
                self.resolve_expression(&cond.condition);
                self.resolve_expression(&cond.then_branch);
                self.resolve_expression(&cond.else_branch);
            }
            Expression::Print(print) => self.resolve_expression(&print.argument),
            Expression::Identifier(ident) => {
                self.resolve_name(ident.id, &ident.name, ident.line);
            }
            Expression::Call(call) => {
                self.resolve_name(call.id, &call.callee, call.line);
                self.resolve_arguments(&call.arguments);
            }
            Expression::Field(access) => {
                self.resolve_member(access.id, &access.object, &access.field, access.line);
            }
            Expression::MethodCall(call) => {
                self.resolve_member(call.id, &call.object, &call.method, call.line);
                self.resolve_arguments(&call.arguments);
            }
            Expression::New(new) => {
                self.resolve_new(new);
                self.resolve_arguments(&new.arguments);
            }
        }
    }

    fn resolve_arguments(&mut self, arguments: &[Expression]) {
        for argument in arguments {
            self.resolve_expression(argument);
        }
    }

    /// Resolve a plain name; returns the declaration's type when found
    fn resolve_name(&mut self, node: NodeId, name: &str, line: u32) -> Option<Type> {
        match self.scopes.lookup(name) {
            Some(entry) => {
                let resolution = Resolution {
                    entry: entry.clone(),
                    use_level: self.nesting_level(),
                };
                let ty = entry.ty.clone();
                self.ctx.record_resolution(node, resolution);
                Some(ty)
            }
            None => {
                self.error(ScopeError::Undeclared {
                    name: name.to_string(),
                    line,
                });
                None
            }
        }
    }

    fn resolve_member(&mut self, node: NodeId, object: &str, member: &str, line: u32) {
        // A receiver that is not an object is a type error, reported later
        let Some(Type::Ref(class)) = self.resolve_name(node, object, line) else {
            return;
        };
        match self.ctx.classes.member(&class, member) {
            Some(entry) => {
                let entry = entry.clone();
                self.ctx.record_member(node, entry);
            }
            None => self.error(ScopeError::UndeclaredMember {
                class,
                member: member.to_string(),
                line,
            }),
        }
    }

    fn resolve_new(&mut self, new: &NewExpression) {
        let entry = self
            .scopes
            .lookup_global(&new.class)
            .filter(|entry| matches!(entry.ty, Type::Class(_)) && self.ctx.classes.contains(&new.class));
        match entry {
            Some(entry) => {
                let resolution = Resolution {
                    entry: entry.clone(),
                    use_level: self.nesting_level(),
                };
                self.ctx.record_resolution(new.id, resolution);
            }
            None => self.error(ScopeError::UndeclaredClass {
                name: new.class.clone(),
                line: new.line,
            }),
        }
    }
}

/// Index into `ClassType::fields` of the field stored at `offset`
fn field_index(offset: i32) -> usize {
    (-offset - 1).max(0) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClassHierarchy;

    fn resolve(program: &Program) -> CompilationContext {
        let mut ctx = CompilationContext::new();
        Resolver::new(&mut ctx).resolve_program(program);
        ctx
    }

    fn layout_of(ctx: &CompilationContext, decl: &Declaration) -> (u32, i32) {
        let entry = ctx.layout(decl.id()).expect("declaration has a layout");
        (entry.nesting_level, entry.offset)
    }

    #[test]
    fn test_global_offsets_descend_from_minus_two() {
        let mut b = AstBuilder::new();
        let one = b.int(1);
        let x = b.var("x", Type::Int, one);
        let two = b.bool(true);
        let y = b.var("y", Type::Bool, two);
        let body = b.id("y");
        let decls = vec![x, y];
        let program = b.let_in(decls.clone(), body);

        let ctx = resolve(&program);
        assert!(ctx.scope_errors().is_empty());
        assert_eq!(layout_of(&ctx, &decls[0]), (0, -2));
        assert_eq!(layout_of(&ctx, &decls[1]), (0, -3));
    }

    #[test]
    fn test_function_frame_layout_and_restore() {
        let mut b = AstBuilder::new();
        let a = b.param("a", Type::Int);
        let c = b.param("c", Type::Int);
        let five = b.int(5);
        let local = b.var("local", Type::Int, five);
        let body = b.id("a");
        let f = b.fun("f", Type::Int, vec![a, c], vec![local], body);
        let seven = b.int(7);
        let after = b.var("after", Type::Int, seven);
        let main = b.call("f", vec![]);
        let program = b.let_in(vec![f.clone(), after.clone()], main);

        let ctx = resolve(&program);
        assert!(ctx.scope_errors().is_empty());
        assert_eq!(layout_of(&ctx, &f), (0, -2));
        // The global counter resumes after the function's own frame
        assert_eq!(layout_of(&ctx, &after), (0, -3));

        let Declaration::Fun(fun) = &f else { unreachable!() };
        assert_eq!(ctx.layout(fun.params[0].id).map(|e| e.offset), Some(1));
        assert_eq!(ctx.layout(fun.params[1].id).map(|e| e.offset), Some(2));
        assert_eq!(layout_of(&ctx, &fun.declarations[0]), (1, -2));

        let body_ref = ctx.resolution(fun.body.id()).expect("body resolved");
        assert_eq!(body_ref.use_level, 1);
        assert_eq!(body_ref.entry.offset, 1);
    }

    #[test]
    fn test_shadowing() {
        // let var x:int = 1; fun f:bool() let var x:bool = true; in x; in x;
        let mut b = AstBuilder::new();
        let one = b.int(1);
        let outer = b.var("x", Type::Int, one);
        let t = b.bool(true);
        let inner = b.var("x", Type::Bool, t);
        let inner_use = b.id("x");
        let inner_use_id = inner_use.id();
        let f = b.fun("f", Type::Bool, vec![], vec![inner], inner_use);
        let outer_use = b.id("x");
        let outer_use_id = outer_use.id();
        let program = b.let_in(vec![outer, f], outer_use);

        let ctx = resolve(&program);
        assert!(ctx.scope_errors().is_empty());
        assert_eq!(ctx.resolution(inner_use_id).map(|r| &r.entry.ty), Some(&Type::Bool));
        assert_eq!(ctx.resolution(outer_use_id).map(|r| &r.entry.ty), Some(&Type::Int));
    }

    #[test]
    fn test_errors_are_cumulative() {
        let mut b = AstBuilder::new();
        let t = b.bool(true);
        let first = b.var("x", Type::Bool, t);
        let five = b.int(5);
        let second = b.var("x", Type::Int, five);
        let missing = b.id("missing");
        let also_missing = b.call("nothing", vec![missing]);
        let program = b.let_in(vec![first, second], also_missing);

        let ctx = resolve(&program);
        let errors = ctx.scope_errors();
        assert_eq!(errors.len(), 3);
        assert!(matches!(&errors[0], ScopeError::Redeclared { name, .. } if name == "x"));
        assert!(matches!(&errors[1], ScopeError::Undeclared { name, .. } if name == "nothing"));
        assert!(matches!(&errors[2], ScopeError::Undeclared { name, .. } if name == "missing"));
    }

    #[test]
    fn test_class_layout_with_inheritance() {
        // class A(x:int, y:int) { fun m:int() x; fun n:int() y; }
        // class B(z:bool, y:int) extends A { fun n:int() z; fun o:bool() z; }
        let mut b = AstBuilder::new();
        let x = b.field("x", Type::Int);
        let y = b.field("y", Type::Int);
        let m_body = b.id("x");
        let m = b.method("m", Type::Int, vec![], vec![], m_body);
        let n_body = b.id("y");
        let n = b.method("n", Type::Int, vec![], vec![], n_body);
        let class_a = b.class("A", None, vec![x, y], vec![m, n]);

        let z = b.field("z", Type::Bool);
        let y2 = b.field("y", Type::Int);
        let n2_body = b.id("z");
        let n2 = b.method("n", Type::Int, vec![], vec![], n2_body);
        let o_body = b.id("z");
        let o = b.method("o", Type::Bool, vec![], vec![], o_body);
        let class_b = b.class("B", Some("A"), vec![z, y2], vec![n2, o]);
        let body = b.int(0);
        let program = b.let_in(vec![class_a.clone(), class_b.clone()], body);

        let ctx = resolve(&program);
        assert!(ctx.scope_errors().is_empty(), "{:?}", ctx.scope_errors());
        assert_eq!(layout_of(&ctx, &class_a), (0, -2));
        assert_eq!(layout_of(&ctx, &class_b), (0, -3));

        let member = |class: &str, name: &str| ctx.classes.member(class, name).map(|e| e.offset);
        assert_eq!(member("A", "x"), Some(-1));
        assert_eq!(member("A", "y"), Some(-2));
        assert_eq!(member("A", "m"), Some(0));
        assert_eq!(member("A", "n"), Some(1));

        // New field after inherited ones, overridden field keeps its offset
        assert_eq!(member("B", "x"), Some(-1));
        assert_eq!(member("B", "y"), Some(-2));
        assert_eq!(member("B", "z"), Some(-3));
        // Overridden method keeps its index, new method is appended
        assert_eq!(member("B", "m"), Some(0));
        assert_eq!(member("B", "n"), Some(1));
        assert_eq!(member("B", "o"), Some(2));

        let shape = ctx.classes.class_type("B").expect("B registered");
        assert_eq!(shape.fields, vec![Type::Int, Type::Int, Type::Bool]);
        assert_eq!(shape.methods.len(), 3);
        assert_eq!(ctx.classes.superclass("B"), Some("A"));
    }

    #[test]
    fn test_methods_see_each_other_and_fields() {
        // class C(v:int) { fun a:int() b(); fun b:int() v; }
        let mut b = AstBuilder::new();
        let v = b.field("v", Type::Int);
        let a_body = b.call("b", vec![]);
        let a_body_id = a_body.id();
        let a = b.method("a", Type::Int, vec![], vec![], a_body);
        let b_body = b.id("v");
        let b_body_id = b_body.id();
        let b_method = b.method("b", Type::Int, vec![], vec![], b_body);
        let class = b.class("C", None, vec![v], vec![a, b_method]);
        let body = b.int(0);
        let program = b.let_in(vec![class], body);

        let ctx = resolve(&program);
        assert!(ctx.scope_errors().is_empty(), "{:?}", ctx.scope_errors());

        let call = ctx.resolution(a_body_id).expect("sibling method resolved");
        assert!(call.entry.ty.is_method());
        assert_eq!((call.entry.nesting_level, call.use_level), (1, 2));

        let field = ctx.resolution(b_body_id).expect("field resolved");
        assert_eq!(field.entry.offset, -1);
        assert_eq!(field.hops(), 1);
    }

    #[test]
    fn test_class_errors() {
        let mut b = AstBuilder::new();
        let missing_super = b.class("A", Some("Nope"), vec![], vec![]);
        let first = b.class("B", None, vec![], vec![]);
        let again = b.class("B", None, vec![], vec![]);
        let x1 = b.field("x", Type::Int);
        let x2 = b.field("x", Type::Bool);
        let dup_members = b.class("D", None, vec![x1, x2], vec![]);
        let one = b.int(1);
        let nested = b.class("E", None, vec![], vec![]);
        let f = b.fun("f", Type::Int, vec![], vec![nested], one);
        let body = b.new_object("Ghost", vec![]);
        let program = b.let_in(vec![missing_super, first, again, dup_members, f], body);

        let ctx = resolve(&program);
        let errors = ctx.scope_errors();
        assert!(matches!(&errors[0], ScopeError::UndeclaredSuperclass { name, .. } if name == "Nope"));
        assert!(matches!(&errors[1], ScopeError::Redeclared { name, .. } if name == "B"));
        assert!(matches!(&errors[2], ScopeError::Redeclared { name, .. } if name == "x"));
        assert!(matches!(&errors[3], ScopeError::ClassNotGlobal { name, .. } if name == "E"));
        assert!(matches!(&errors[4], ScopeError::UndeclaredClass { name, .. } if name == "Ghost"));
        assert_eq!(errors.len(), 5);

        // The class with a missing superclass is still registered, as a root
        assert!(ctx.classes.contains("A"));
        assert_eq!(ctx.classes.superclass("A"), None);
        assert!(!ctx.classes.contains("E"));
    }

    #[test]
    fn test_member_access_resolution() {
        // class P(x:int) {} var p:P = new P(1); in p.y
        let mut b = AstBuilder::new();
        let x = b.field("x", Type::Int);
        let class = b.class("P", None, vec![x], vec![]);
        let one = b.int(1);
        let new = b.new_object("P", vec![one]);
        let p = b.var("p", Type::class_ref("P"), new);
        let good = b.field_access("p", "x");
        let good_id = good.id();
        let bad = b.field_access("p", "y");
        let body = b.add(good, bad);
        let program = b.let_in(vec![class, p], body);

        let ctx = resolve(&program);
        assert_eq!(ctx.member(good_id).map(|e| e.offset), Some(-1));
        assert_eq!(
            ctx.scope_errors(),
            &[ScopeError::UndeclaredMember {
                class: "P".to_string(),
                member: "y".to_string(),
                line: 1
            }]
        );
    }

    #[test]
    fn test_undeclared_type_annotation() {
        let mut b = AstBuilder::new();
        let null = b.null();
        let v = b.var("v", Type::class_ref("Missing"), null);
        let body = b.int(0);
        let program = b.let_in(vec![v], body);

        let ctx = resolve(&program);
        assert!(matches!(
            ctx.scope_errors(),
            [ScopeError::UndeclaredType { name, .. }] if name == "Missing"
        ));
    }
}
