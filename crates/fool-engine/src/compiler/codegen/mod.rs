//! Code generation
//!
//! Walks a resolved and type-checked AST and emits symbolic stack-machine
//! instructions. Frame layout is the one computed by the resolver:
//!
//! ```text
//! fp + n  .. fp + 1   parameters (first parameter at +1)
//! fp                  access link
//! fp - 1              return address
//! fp - 2  ..          local declarations
//! ```
//!
//! The caller's frame pointer (control link) sits just above the parameters.
//! Objects live on the heap with the dispatch-table pointer at the object
//! address and field `k` at `address - k`. Dispatch tables hold method entry
//! addresses indexed by method offset.
//!
//! Function and method bodies are collected separately and appended after the
//! main program's `halt`.

mod expr;

use std::iter;

use rustc_hash::FxHashMap;
use tracing::{debug, info};

use super::bytecode::{Instruction, Label, LabelAllocator};
use super::error::{CompileError, CompileResult};
use crate::ast::{ClassDecl, Declaration, FunDecl, NodeId, Program};
use crate::checker::{CompilationContext, SymbolEntry};
use crate::types::ClassHierarchy;
use crate::vm::DEFAULT_MEMORY_SIZE;

/// Code generator configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodegenOptions {
    /// Address the global frame's `fp` points at; globals live at
    /// `global_frame_base + offset`
    pub global_frame_base: i32,
}

impl CodegenOptions {
    /// Options for a VM with `memory_size` cells, whose initial frame pointer
    /// is the top of memory
    ///
    /// Sizes beyond `i32::MAX` are clamped here; [`Vm::new`](crate::vm::Vm::new)
    /// refuses them with `InvalidMemorySize`, so such code never runs.
    pub fn for_memory_size(memory_size: usize) -> Self {
        Self {
            global_frame_base: i32::try_from(memory_size).unwrap_or(i32::MAX),
        }
    }
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self::for_memory_size(DEFAULT_MEMORY_SIZE)
    }
}

/// Stack-machine code generator
pub struct CodeGenerator<'ctx> {
    ctx: &'ctx CompilationContext,
    options: CodegenOptions,
    labels: LabelAllocator,
    /// Dispatch table (method entry labels by offset) of each generated class
    dispatch_tables: FxHashMap<String, Vec<Label>>,
    /// Function and method bodies, emitted after the main program
    functions: Vec<Instruction>,
}

impl<'ctx> CodeGenerator<'ctx> {
    /// Create a generator over a context filled by the resolver and checker
    pub fn new(ctx: &'ctx CompilationContext, options: CodegenOptions) -> Self {
        Self {
            ctx,
            options,
            labels: LabelAllocator::new(),
            dispatch_tables: FxHashMap::default(),
            functions: Vec::new(),
        }
    }

    /// Generate the instruction sequence of a whole program
    ///
    /// Refuses to run when the context holds scope or type errors.
    pub fn generate(mut self, program: &Program) -> CompileResult<Vec<Instruction>> {
        let counts = self.ctx.error_counts();
        if !counts.is_clean() {
            return Err(CompileError::FrontEnd(counts));
        }

        let mut code = Vec::new();
        match program {
            Program::LetIn(program) => {
                // Placeholder in the return-address slot of the global frame
                code.push(Instruction::Push(0));
                for declaration in &program.declarations {
                    self.emit_declaration(declaration, &mut code)?;
                }
                self.emit_expression(&program.body, &mut code)?;
            }
            Program::Expr(body) => self.emit_expression(body, &mut code)?,
        }
        code.push(Instruction::Halt);

        let main_len = code.len();
        code.append(&mut self.functions);
        info!(
            main = main_len,
            total = code.len(),
            classes = self.dispatch_tables.len(),
            "code generation finished"
        );
        Ok(code)
    }

    // ===== Declarations =====

    /// Emit code leaving the declaration's value in its frame slot
    fn emit_declaration(
        &mut self,
        declaration: &Declaration,
        out: &mut Vec<Instruction>,
    ) -> CompileResult<()> {
        match declaration {
            Declaration::Var(var) => self.emit_expression(&var.init, out),
            Declaration::Fun(fun) => {
                let entry = self.labels.function();
                self.emit_function(fun, entry)?;
                out.push(Instruction::PushLabel(entry));
                Ok(())
            }
            Declaration::Class(class) => self.emit_class(class, out),
        }
    }

    /// Emit the body of a function or method at `entry`
    fn emit_function(&mut self, fun: &FunDecl, entry: Label) -> CompileResult<()> {
        debug!(name = %fun.name, %entry, "emitting function");

        let mut body = vec![
            Instruction::Label(entry),
            Instruction::CopyFp,
            Instruction::LoadRa,
        ];
        for declaration in &fun.declarations {
            self.emit_declaration(declaration, &mut body)?;
        }
        self.emit_expression(&fun.body, &mut body)?;

        // Stash the result, tear the frame down, return
        body.push(Instruction::StoreTm);
        body.extend(iter::repeat(Instruction::Pop).take(fun.declarations.len()));
        body.extend([Instruction::StoreRa, Instruction::Pop]);
        body.extend(iter::repeat(Instruction::Pop).take(fun.params.len()));
        body.extend([
            Instruction::StoreFp,
            Instruction::LoadTm,
            Instruction::LoadRa,
            Instruction::JumpSubroutine,
        ]);

        self.functions.append(&mut body);
        Ok(())
    }

    /// Emit the class's dispatch table onto the heap, leaving its address as
    /// the declaration's value
    fn emit_class(&mut self, class: &ClassDecl, out: &mut Vec<Instruction>) -> CompileResult<()> {
        let mut table = self
            .ctx
            .classes
            .superclass(&class.name)
            .and_then(|superclass| self.dispatch_tables.get(superclass))
            .cloned()
            .unwrap_or_default();

        for method in &class.methods {
            let layout = self.layout(method.id, &method.name, method.line)?;
            let offset = usize::try_from(layout.offset).map_err(|_| CompileError::MissingLayout {
                name: method.name.clone(),
                line: method.line,
            })?;

            let entry = self.labels.method();
            self.emit_function(method, entry)?;

            match offset.cmp(&table.len()) {
                std::cmp::Ordering::Less => table[offset] = entry,
                std::cmp::Ordering::Equal => table.push(entry),
                std::cmp::Ordering::Greater => {
                    return Err(CompileError::MissingLayout {
                        name: method.name.clone(),
                        line: method.line,
                    })
                }
            }
        }

        out.push(Instruction::LoadHp);
        for entry in &table {
            out.extend([
                Instruction::PushLabel(*entry),
                Instruction::LoadHp,
                Instruction::StoreWord,
            ]);
            emit_bump_heap(out);
        }

        debug!(class = %class.name, methods = table.len(), "dispatch table");
        self.dispatch_tables.insert(class.name.clone(), table);
        Ok(())
    }

    fn layout(&self, node: NodeId, name: &str, line: u32) -> CompileResult<&'ctx SymbolEntry> {
        self.ctx
            .layout(node)
            .ok_or_else(|| CompileError::MissingLayout {
                name: name.to_string(),
                line,
            })
    }
}

/// `hp = hp + 1`
fn emit_bump_heap(out: &mut Vec<Instruction>) {
    out.extend([
        Instruction::LoadHp,
        Instruction::Push(1),
        Instruction::Add,
        Instruction::StoreHp,
    ]);
}
