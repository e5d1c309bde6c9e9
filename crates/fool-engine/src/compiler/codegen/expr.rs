//! Expression code generation
//!
//! Every expression leaves exactly one value on the stack. Booleans are 1/0,
//! `null` is -1.

use super::{emit_bump_heap, CodeGenerator};
use crate::ast::*;
use crate::checker::Resolution;
use crate::compiler::bytecode::{Instruction, Label};
use crate::compiler::error::{CompileError, CompileResult};

impl<'ctx> CodeGenerator<'ctx> {
    pub(super) fn emit_expression(
        &mut self,
        expr: &Expression,
        out: &mut Vec<Instruction>,
    ) -> CompileResult<()> {
        match expr {
            Expression::IntLiteral(lit) => out.push(Instruction::Push(lit.value)),
            Expression::BoolLiteral(lit) => out.push(Instruction::Push(i32::from(lit.value))),
            Expression::Null(_) => out.push(Instruction::Push(-1)),

            Expression::Binary(binary) => self.emit_binary(binary, out)?,
            Expression::Logical(logical) => self.emit_logical(logical, out)?,
            Expression::Not(not) => {
                out.push(Instruction::Push(1));
                self.emit_expression(&not.operand, out)?;
                out.push(Instruction::Sub);
            }

            Expression::Conditional(cond) => {
                let then_label = self.labels.branch();
                let end_label = self.labels.branch();
                self.emit_expression(&cond.condition, out)?;
                out.extend([Instruction::Push(1), Instruction::BranchEq(then_label)]);
                self.emit_expression(&cond.else_branch, out)?;
                out.extend([Instruction::Branch(end_label), Instruction::Label(then_label)]);
                self.emit_expression(&cond.then_branch, out)?;
                out.push(Instruction::Label(end_label));
            }

            Expression::Print(print) => {
                self.emit_expression(&print.argument, out)?;
                // print pops; keep a copy as the expression's value
                out.extend([
                    Instruction::StoreTm,
                    Instruction::LoadTm,
                    Instruction::LoadTm,
                    Instruction::Print,
                ]);
            }

            Expression::Identifier(ident) => {
                let resolution = self.resolution(ident.id, ident.line)?;
                self.emit_address(resolution, out);
                out.push(Instruction::LoadWord);
            }

            Expression::Call(call) => {
                let resolution = self.resolution(call.id, call.line)?;
                out.push(Instruction::LoadFp);
                self.emit_arguments(&call.arguments, out)?;
                self.emit_frame_base(resolution, out);
                emit_duplicate(out);
                if resolution.entry.ty.is_method() {
                    // Sibling method: the access link is an object pointer
                    out.push(Instruction::LoadWord);
                }
                out.extend([
                    Instruction::Push(resolution.entry.offset),
                    Instruction::Add,
                    Instruction::LoadWord,
                    Instruction::JumpSubroutine,
                ]);
            }

            Expression::Field(access) => {
                let resolution = self.resolution(access.id, access.line)?;
                let member = self.member_offset(access.id, access.line)?;
                self.emit_address(resolution, out);
                out.extend([
                    Instruction::LoadWord,
                    Instruction::Push(member),
                    Instruction::Add,
                    Instruction::LoadWord,
                ]);
            }

            Expression::MethodCall(call) => {
                let resolution = self.resolution(call.id, call.line)?;
                let member = self.member_offset(call.id, call.line)?;
                out.push(Instruction::LoadFp);
                self.emit_arguments(&call.arguments, out)?;
                self.emit_address(resolution, out);
                out.push(Instruction::LoadWord);
                emit_duplicate(out);
                out.extend([
                    Instruction::LoadWord,
                    Instruction::Push(member),
                    Instruction::Add,
                    Instruction::LoadWord,
                    Instruction::JumpSubroutine,
                ]);
            }

            Expression::New(new) => {
                let resolution = self.resolution(new.id, new.line)?;
                // Field k ends up at object - k: the last argument is stored first
                for argument in &new.arguments {
                    self.emit_expression(argument, out)?;
                }
                for _ in &new.arguments {
                    out.extend([Instruction::LoadHp, Instruction::StoreWord]);
                    emit_bump_heap(out);
                }
                self.emit_address(resolution, out);
                out.extend([
                    Instruction::LoadWord,
                    Instruction::LoadHp,
                    Instruction::StoreWord,
                    Instruction::LoadHp,
                ]);
                emit_bump_heap(out);
            }
        }
        Ok(())
    }

    fn emit_binary(&mut self, binary: &BinaryExpression, out: &mut Vec<Instruction>) -> CompileResult<()> {
        let arithmetic = match binary.operator {
            BinaryOperator::Add => Some(Instruction::Add),
            BinaryOperator::Subtract => Some(Instruction::Sub),
            BinaryOperator::Multiply => Some(Instruction::Mult),
            BinaryOperator::Divide => Some(Instruction::Div),
            _ => None,
        };
        if let Some(instruction) = arithmetic {
            self.emit_expression(&binary.left, out)?;
            self.emit_expression(&binary.right, out)?;
            out.push(instruction);
            return Ok(());
        }

        let true_label = self.labels.branch();
        let end_label = self.labels.branch();
        match binary.operator {
            BinaryOperator::GreaterEqual => {
                self.emit_expression(&binary.right, out)?;
                self.emit_expression(&binary.left, out)?;
                out.push(Instruction::BranchLessEq(true_label));
            }
            BinaryOperator::LessEqual => {
                self.emit_expression(&binary.left, out)?;
                self.emit_expression(&binary.right, out)?;
                out.push(Instruction::BranchLessEq(true_label));
            }
            _ => {
                self.emit_expression(&binary.left, out)?;
                self.emit_expression(&binary.right, out)?;
                out.push(Instruction::BranchEq(true_label));
            }
        }
        emit_select(out, true_label, end_label, 0, 1);
        Ok(())
    }

    fn emit_logical(&mut self, logical: &LogicalExpression, out: &mut Vec<Instruction>) -> CompileResult<()> {
        // The value that decides the result without looking at the right operand
        let decisive = match logical.operator {
            LogicalOperator::Or => 1,
            LogicalOperator::And => 0,
        };
        let short_label = self.labels.branch();
        let end_label = self.labels.branch();

        self.emit_expression(&logical.left, out)?;
        out.extend([Instruction::Push(decisive), Instruction::BranchEq(short_label)]);
        self.emit_expression(&logical.right, out)?;
        out.extend([Instruction::Push(decisive), Instruction::BranchEq(short_label)]);
        emit_select(out, short_label, end_label, 1 - decisive, decisive);
        Ok(())
    }

    fn emit_arguments(&mut self, arguments: &[Expression], out: &mut Vec<Instruction>) -> CompileResult<()> {
        // Reversed, so the first argument ends up next to the access link
        for argument in arguments.iter().rev() {
            self.emit_expression(argument, out)?;
        }
        Ok(())
    }

    // ===== Addressing =====

    /// Push the frame holding the resolved declaration
    fn emit_frame_base(&self, resolution: &Resolution, out: &mut Vec<Instruction>) {
        if resolution.entry.nesting_level == 0 {
            out.push(Instruction::Push(self.options.global_frame_base));
            return;
        }
        out.push(Instruction::LoadFp);
        for _ in 0..resolution.hops() {
            out.push(Instruction::LoadWord);
        }
    }

    /// Push the memory address of the resolved declaration's slot
    fn emit_address(&self, resolution: &Resolution, out: &mut Vec<Instruction>) {
        if resolution.entry.nesting_level == 0 {
            out.push(Instruction::Push(
                self.options.global_frame_base.wrapping_add(resolution.entry.offset),
            ));
            return;
        }
        self.emit_frame_base(resolution, out);
        out.extend([Instruction::Push(resolution.entry.offset), Instruction::Add]);
    }

    fn resolution(&self, node: NodeId, line: u32) -> CompileResult<&'ctx Resolution> {
        self.ctx.resolution(node).ok_or(CompileError::Unresolved { line })
    }

    fn member_offset(&self, node: NodeId, line: u32) -> CompileResult<i32> {
        self.ctx
            .member(node)
            .map(|entry| entry.offset)
            .ok_or(CompileError::Unresolved { line })
    }
}

/// Duplicate the top of stack through the scratch register
fn emit_duplicate(out: &mut Vec<Instruction>) {
    out.extend([Instruction::StoreTm, Instruction::LoadTm, Instruction::LoadTm]);
}

/// Tail of a branch-based test: `if_fallthrough` when the branch was not
/// taken, `if_taken` at `taken`
fn emit_select(
    out: &mut Vec<Instruction>,
    taken: Label,
    end: Label,
    if_fallthrough: i32,
    if_taken: i32,
) {
    out.extend([
        Instruction::Push(if_fallthrough),
        Instruction::Branch(end),
        Instruction::Label(taken),
        Instruction::Push(if_taken),
        Instruction::Label(end),
    ]);
}
