// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Statement lowering.

use weft_ast::{Stmt, StmtKind};
use weft_types::Type;

use super::{JumpTarget, MirLowerer};
use crate::operand::MirConst;
use crate::{LoweringError, MirOperand, MirRValue, MirTerminator, MirType, SuspendLowering};

impl<S: SuspendLowering> MirLowerer<'_, S> {
    pub(super) fn lower_stmt(&mut self, stmt: &Stmt) -> Result<(), LoweringError> {
        match &stmt.kind {
            StmtKind::Expr(e) => {
                self.lower_expr(e)?;
            }

            StmtKind::Let { name, ty: _, init } => {
                let cx = self.cx();
                let init = init.as_ref().map(|e| self.lower_expr(e)).transpose()?;
                let ty = match (self.model.local_type(stmt.id), &init) {
                    (Some(ty), _) if !ty.is_error() => ty.clone(),
                    (_, Some((_, init_ty))) => init_ty.clone(),
                    _ => Type::Object,
                };
                let mir_ty = MirType::from_type(cx, &ty);
                let id = self.builder.alloc_local(name.clone(), mir_ty.clone());
                let value = match init {
                    Some((value, _)) => value,
                    None => MirOperand::Constant(MirConst::Default(mir_ty)),
                };
                self.assign(id, MirRValue::Use(value));
                self.declare(name, id, ty);
            }

            StmtKind::Assign { target, value } => {
                let (id, _) = self.lookup(target, stmt.span)?;
                let (value, _) = self.lower_expr(value)?;
                self.assign(id, MirRValue::Use(value));
            }

            StmtKind::If { cond, then_branch, else_branch } => {
                let (cond, _) = self.lower_expr(cond)?;
                let then_block = self.builder.create_block();
                let else_block = self.builder.create_block();
                let merge = self.builder.create_block();
                self.builder.terminate(MirTerminator::Branch { cond, then_block, else_block });

                self.builder.switch_to_block(then_block);
                self.lower_block(then_branch)?;
                if self.builder.current_block_unterminated() {
                    self.builder.terminate(MirTerminator::Goto { target: merge });
                }

                self.builder.switch_to_block(else_block);
                if let Some(else_branch) = else_branch {
                    self.lower_block(else_branch)?;
                }
                if self.builder.current_block_unterminated() {
                    self.builder.terminate(MirTerminator::Goto { target: merge });
                }
                self.builder.switch_to_block(merge);
            }

            StmtKind::Return(value) => {
                if let Some(e) = value {
                    let (value, _) = self.lower_expr(e)?;
                    if let Some(ret) = self.ret_local {
                        self.assign(ret, MirRValue::Use(value));
                    }
                }
                self.emit_jump(JumpTarget::Return);
            }

            StmtKind::Break(label) => {
                let target = self.find_loop(label.as_deref(), "break", stmt.span)?.break_target;
                self.emit_jump(target);
            }

            StmtKind::Continue(label) => {
                let target =
                    self.find_loop(label.as_deref(), "continue", stmt.span)?.continue_target;
                self.emit_jump(target);
            }

            StmtKind::Goto(label) => {
                let target = self.find_label(label, stmt.span)?;
                self.emit_jump(target);
            }

            StmtKind::Label(label) => {
                if let JumpTarget::Block { block, .. } = self.find_label(label, stmt.span)? {
                    if self.builder.current_block_unterminated() {
                        self.builder.terminate(MirTerminator::Goto { target: block });
                    }
                    self.builder.switch_to_block(block);
                }
            }

            StmtKind::Throw(e) => {
                let (value, _) = self.lower_expr(e)?;
                self.builder.terminate(MirTerminator::Throw { value });
                let dead = self.builder.create_block();
                self.builder.switch_to_block(dead);
            }

            StmtKind::ForEach(each) => {
                if !each.is_async {
                    return Err(LoweringError::SynchronousIteration { span: each.keyword_span });
                }
                self.lower_foreach(stmt, each)?;
            }
        }
        Ok(())
    }
}
