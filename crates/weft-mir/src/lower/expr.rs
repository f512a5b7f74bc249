// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Expression lowering.

use weft_ast::{Expr, ExprKind};
use weft_types::{conversions, Type};

use super::MirLowerer;
use crate::operand::MirConst;
use crate::{
    FunctionRef, LoweringError, MirOperand, MirRValue, MirStmt, MirType, SuspendLowering,
};

impl<S: SuspendLowering> MirLowerer<'_, S> {
    /// Lower an expression to an operand and its source type.
    pub(super) fn lower_expr(&mut self, expr: &Expr) -> Result<(MirOperand, Type), LoweringError> {
        let cx = self.cx();
        match &expr.kind {
            ExprKind::Int(v) => Ok((MirOperand::Constant(MirConst::Int(*v)), Type::I32)),
            ExprKind::Bool(b) => Ok((MirOperand::Constant(MirConst::Bool(*b)), Type::Bool)),
            ExprKind::String(s) => Ok((MirOperand::Constant(MirConst::String(s.clone())), Type::String)),
            ExprKind::Null | ExprKind::Default(None) => {
                Ok((MirOperand::Constant(MirConst::Null), Type::Null))
            }
            ExprKind::Default(Some(ty)) => {
                let ty = self.parse_type(ty, expr.span)?;
                let value = MirConst::Default(MirType::from_type(cx, &ty));
                Ok((MirOperand::Constant(value), ty))
            }

            ExprKind::Ident(name) => {
                let (id, ty) = self.lookup(name, expr.span)?;
                Ok((MirOperand::Local(id), ty))
            }

            ExprKind::New(ty) => {
                let ty = self.parse_type(ty, expr.span)?;
                let mir_ty = MirType::from_type(cx, &ty);
                let dst = self.builder.alloc_temp(mir_ty.clone());
                self.builder.push_stmt(MirStmt::Call {
                    dst: Some(dst),
                    func: FunctionRef::constructor(mir_ty),
                    receiver: None,
                    args: Vec::new(),
                });
                Ok((MirOperand::Local(dst), ty))
            }

            ExprKind::Cast { ty, expr: inner } => {
                let target = self.parse_type(ty, expr.span)?;
                let (value, from) = self.lower_expr(inner)?;
                let conversion = conversions::classify(cx, &from, &target);
                if conversion.is_identity() {
                    return Ok((value, target));
                }
                let mir_ty = MirType::from_type(cx, &target);
                let dst = self.builder.alloc_temp(mir_ty.clone());
                self.assign(dst, MirRValue::Convert { value, conversion, target: mir_ty });
                Ok((MirOperand::Local(dst), target))
            }

            ExprKind::Call { func, args } => {
                let args = args
                    .iter()
                    .map(|a| self.lower_expr(a).map(|(op, _)| op))
                    .collect::<Result<Vec<_>, _>>()?;
                let dst = self.builder.alloc_temp(MirType::Ref("object".to_string()));
                self.builder.push_stmt(MirStmt::Call {
                    dst: Some(dst),
                    func: FunctionRef::free(func.clone()),
                    receiver: None,
                    args,
                });
                Ok((MirOperand::Local(dst), Type::Object))
            }

            ExprKind::Binary { op, left, right } => {
                let (left, left_ty) = self.lower_expr(left)?;
                let (right, _) = self.lower_expr(right)?;
                let ty = if op.is_comparison() { Type::Bool } else { left_ty };
                let dst = self.builder.alloc_temp(MirType::from_type(cx, &ty));
                self.assign(dst, MirRValue::BinaryOp { op: (*op).into(), left, right });
                Ok((MirOperand::Local(dst), ty))
            }
        }
    }
}
