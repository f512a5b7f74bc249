// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Lowering of one `await foreach` construct.
//!
//! ```text
//!   source ; [nullable guard] ; [source conversion]
//!   e = acquire(..)                      outside the region
//!   [pending = 0 ; ensure_push handler]
//! advance:
//!   t = e.advance(..) ; suspend t -> ok
//!   branch ok -> body, done
//! body:
//!   v = convert(e.current) ; <body> ; goto advance
//! done:
//!   [ensure_pop ; pending = 0] ; goto dispose
//! handler:
//!   exc = catch ; pending = -1 ; goto dispose
//! dispose:
//!   [guard] ; [suspend] e.dispose(..) ; switch pending
//! ```

use tracing::debug;
use weft_ast::{ForEach, Span, Stmt};
use weft_resolve::{
    Acquisition, ArgumentPlan, Dispatch, DisposalPlan, MemberSig, NullSourcePolicy,
    ResolvedPattern, SourceConversion,
};
use weft_types::Type;

use super::{JumpTarget, LoopContext, MirLowerer, Region};
use crate::operand::{CallDispatch, CallRole, MirConst};
use crate::{
    BlockId, CaptureRole, CapturedVar, DisposalScope, DisposeGuard, FunctionRef, LocalId,
    LoopLoweringPlan, LoweringError, MirOperand, MirRValue, MirStmt, MirTerminator, MirType,
    PlannedSuspend, Receiver, SuspendKind, SuspendLowering,
};

/// Fault raised when a nullable source has no value under the fault policy.
pub const NULLABLE_NO_VALUE: &str = "Nullable object must have a value.";

impl<S: SuspendLowering> MirLowerer<'_, S> {
    pub(super) fn lower_foreach(&mut self, stmt: &Stmt, each: &ForEach) -> Result<(), LoweringError> {
        let model = self.model;
        let pattern = model
            .foreach_info(stmt.id)
            .ok_or(LoweringError::Unresolved { span: each.keyword_span })?;
        let cx = self.cx();
        let span = each.keyword_span;
        let depth = self.regions.len();
        let exit_block = self.builder.create_block();
        let mut plan = LoopLoweringPlan {
            construct: stmt.id,
            suspend_points: Vec::new(),
            captures: Vec::new(),
            disposal: None,
            null_source: None,
            exit_block,
        };

        // ── Source ──────────────────────────────────────────────────
        let (source, source_ty) = self.lower_expr(&each.source)?;
        let source_mir = MirType::from_type(cx, &source_ty);
        let source = self.into_local(source, source_mir.clone());
        plan.captures.push(CapturedVar { role: CaptureRole::Source, local: source, ty: source_mir });

        let mut conversion = &pattern.conversions.source;
        let mut receiver = source;
        if let SourceConversion::NullableUnwrap { inner, policy } = conversion {
            receiver = self.unwrap_nullable(source, &source_ty, *policy, exit_block);
            plan.null_source = Some(*policy);
            conversion = inner.as_ref();
        }
        let receiver = self.convert_source(receiver, conversion, pattern);

        // ── Acquire ─────────────────────────────────────────────────
        let value_enumerator = pattern.enumerator_is_value_type;
        let enumerator_ty = MirType::from_type(cx, &pattern.enumerator_type);
        let enumerator = self.builder.alloc_temp(enumerator_ty.clone());
        let call = pattern.acquisition.call();
        let receiver_by_ref = match &pattern.acquisition {
            Acquisition::Extension { extension, .. } => self
                .table
                .extension(*extension)
                .is_some_and(|ext| ext.receiver.mode.needs_location()),
            Acquisition::Instance { .. } => cx.is_value_type(source_ty.strip_nullable()),
            Acquisition::Contract { .. } => false,
        };
        let args = self.lower_arguments(&call.arguments, span)?;
        let func = self.protocol_ref(&call.member, CallRole::Acquire);
        self.builder.push_stmt(MirStmt::Call {
            dst: Some(enumerator),
            func,
            receiver: Some(Receiver { value: MirOperand::Local(receiver), by_ref: receiver_by_ref }),
            args,
        });
        plan.captures.push(CapturedVar {
            role: CaptureRole::Enumerator,
            local: enumerator,
            ty: enumerator_ty,
        });

        // ── Protected region ────────────────────────────────────────
        let region = if pattern.needs_disposal {
            let pending = self.builder.alloc_temp(MirType::I32);
            let exception = self.builder.alloc_temp(MirType::Exception);
            let handler = self.builder.create_block();
            let dispose = self.builder.create_block();
            self.assign(pending, MirRValue::Use(MirOperand::int(0)));
            self.builder.push_stmt(MirStmt::EnsurePush { cleanup_block: handler });
            self.regions.push(Region { pending, dispose, exits: Vec::new() });
            plan.captures.push(CapturedVar {
                role: CaptureRole::PendingExit,
                local: pending,
                ty: MirType::I32,
            });
            plan.captures.push(CapturedVar {
                role: CaptureRole::PendingException,
                local: exception,
                ty: MirType::Exception,
            });
            Some((pending, exception, handler, dispose))
        } else {
            None
        };

        // ── Advance ─────────────────────────────────────────────────
        let advance = self.builder.create_block();
        self.builder.terminate(MirTerminator::Goto { target: advance });
        self.builder.switch_to_block(advance);

        let task = self.builder.alloc_temp(MirType::awaitable(cx, &pattern.advance.member.ret));
        let args = self.lower_arguments(&pattern.advance.arguments, span)?;
        let func = self.protocol_ref(&pattern.advance.member, CallRole::Advance);
        self.builder.push_stmt(MirStmt::Call {
            dst: Some(task),
            func,
            receiver: Some(Receiver {
                value: MirOperand::Local(enumerator),
                by_ref: value_enumerator,
            }),
            args,
        });
        let site = self.suspend.lower_await(
            &mut self.builder,
            MirOperand::Local(task),
            &pattern.advance.awaited,
            Some(MirType::Bool),
            SuspendKind::Advance,
        );
        plan.suspend_points.push(PlannedSuspend { point: site.point, kind: SuspendKind::Advance });
        let has_next = site
            .result
            .map(MirOperand::Local)
            .unwrap_or(MirOperand::Constant(MirConst::Bool(false)));

        let body_block = self.builder.create_block();
        let done = self.builder.create_block();
        self.builder.terminate(MirTerminator::Branch {
            cond: has_next,
            then_block: body_block,
            else_block: done,
        });

        // ── Body ────────────────────────────────────────────────────
        self.builder.switch_to_block(body_block);
        let current_ty = MirType::from_type(cx, &pattern.element_type);
        let current = self.builder.alloc_temp(current_ty);
        let func = self.protocol_ref(&pattern.current.member, CallRole::Current);
        self.builder.push_stmt(MirStmt::Call {
            dst: Some(current),
            func,
            receiver: Some(Receiver {
                value: MirOperand::Local(enumerator),
                by_ref: value_enumerator,
            }),
            args: Vec::new(),
        });

        let variable_ty = MirType::from_type(cx, &pattern.loop_variable_type);
        let variable = self.builder.alloc_local(each.binding.name.clone(), variable_ty.clone());
        let rvalue = match pattern.conversions.element.conversion() {
            Some(c) if !c.is_identity() => MirRValue::Convert {
                value: MirOperand::Local(current),
                conversion: c.clone(),
                target: variable_ty.clone(),
            },
            _ => MirRValue::Use(MirOperand::Local(current)),
        };
        self.assign(variable, rvalue);
        plan.captures.push(CapturedVar {
            role: CaptureRole::LoopVariable,
            local: variable,
            ty: variable_ty,
        });

        self.scopes.push(Default::default());
        self.declare(&each.binding.name, variable, pattern.loop_variable_type.clone());
        self.loop_stack.push(LoopContext {
            label: each.label.clone(),
            break_target: JumpTarget::Block { block: exit_block, depth },
            continue_target: JumpTarget::Block { block: advance, depth: self.regions.len() },
        });
        let body = self.lower_block(&each.body);
        self.loop_stack.pop();
        self.scopes.pop();
        body?;
        if self.builder.current_block_unterminated() {
            self.builder.terminate(MirTerminator::Goto { target: advance });
        }

        // ── Exit ────────────────────────────────────────────────────
        self.builder.switch_to_block(done);
        match region {
            None => self.builder.terminate(MirTerminator::Goto { target: exit_block }),
            Some((pending, exception, handler, dispose)) => {
                self.builder.push_stmt(MirStmt::EnsurePop);
                self.assign(pending, MirRValue::Use(MirOperand::int(0)));
                self.builder.terminate(MirTerminator::Goto { target: dispose });

                self.builder.switch_to_block(handler);
                self.builder.push_stmt(MirStmt::CatchException { dst: exception });
                self.assign(pending, MirRValue::Use(MirOperand::int(-1)));
                self.builder.terminate(MirTerminator::Goto { target: dispose });

                let exits = self.regions.pop().map(|r| r.exits).unwrap_or_default();
                self.builder.switch_to_block(dispose);
                let scope = self.lower_disposal(pattern, enumerator, handler, dispose, &mut plan, span)?;
                plan.disposal = Some(scope);
                self.dispatch_exits(pending, exception, exit_block, exits);
            }
        }

        self.builder.switch_to_block(exit_block);
        debug!(
            target: "lower",
            construct = %stmt.id,
            tier = pattern.acquisition.tier_name(),
            disposal = plan.disposal.is_some(),
            suspend_points = plan.suspend_points.len(),
            "lowered await foreach"
        );
        self.plans.push(plan);
        Ok(())
    }

    /// Branch on the nullable source. Leaves the builder where the value is
    /// present and returns the unwrapped local.
    fn unwrap_nullable(
        &mut self,
        source: LocalId,
        source_ty: &Type,
        policy: NullSourcePolicy,
        exit_block: BlockId,
    ) -> LocalId {
        let cx = self.cx();
        let has_value = self.builder.alloc_temp(MirType::Bool);
        self.assign(has_value, MirRValue::NullableHasValue(MirOperand::Local(source)));

        let present = self.builder.create_block();
        let absent = match policy {
            NullSourcePolicy::Skip => exit_block,
            NullSourcePolicy::Fault => self.builder.create_block(),
        };
        self.builder.terminate(MirTerminator::Branch {
            cond: MirOperand::Local(has_value),
            then_block: present,
            else_block: absent,
        });
        if policy == NullSourcePolicy::Fault {
            self.builder.switch_to_block(absent);
            self.builder.terminate(MirTerminator::Throw {
                value: MirOperand::Constant(MirConst::String(NULLABLE_NO_VALUE.to_string())),
            });
        }

        self.builder.switch_to_block(present);
        let inner = MirType::from_type(cx, source_ty.strip_nullable());
        let value = self.builder.alloc_temp(inner);
        self.assign(value, MirRValue::NullableValue(MirOperand::Local(source)));
        value
    }

    fn convert_source(
        &mut self,
        value: LocalId,
        conversion: &SourceConversion,
        pattern: &ResolvedPattern,
    ) -> LocalId {
        let conversion = match conversion {
            SourceConversion::Reference(c) | SourceConversion::ExtensionReceiver(c) => c,
            SourceConversion::Identity | SourceConversion::NullableUnwrap { .. } => return value,
        };
        if conversion.is_identity() {
            return value;
        }
        let target = MirType::from_type(self.cx(), &pattern.acquisition.member().owner);
        let dst = self.builder.alloc_temp(target.clone());
        self.assign(dst, MirRValue::Convert {
            value: MirOperand::Local(value),
            conversion: conversion.clone(),
            target,
        });
        dst
    }

    /// Emit the dispose block body and leave the builder at the join after
    /// disposal.
    fn lower_disposal(
        &mut self,
        pattern: &ResolvedPattern,
        enumerator: LocalId,
        handler: BlockId,
        dispose: BlockId,
        plan: &mut LoopLoweringPlan,
        span: Span,
    ) -> Result<DisposalScope, LoweringError> {
        let cx = self.cx();
        let guard = match &pattern.disposal {
            DisposalPlan::RuntimeCheck { .. } => DisposeGuard::RuntimeCheck,
            _ if pattern.enumerator_is_value_type => DisposeGuard::Always,
            _ => DisposeGuard::NotNull,
        };
        let call_block = self.builder.create_block();
        let after = self.builder.create_block();

        match (&pattern.disposal, guard) {
            (DisposalPlan::RuntimeCheck { contract, .. }, _) => {
                let implements = self.builder.alloc_temp(MirType::Bool);
                self.assign(implements, MirRValue::IsInstance {
                    value: MirOperand::Local(enumerator),
                    contract: cx.display(contract),
                });
                self.builder.terminate(MirTerminator::Branch {
                    cond: MirOperand::Local(implements),
                    then_block: call_block,
                    else_block: after,
                });
            }
            (_, DisposeGuard::NotNull) => {
                let is_null = self.builder.alloc_temp(MirType::Bool);
                self.assign(is_null, MirRValue::IsNull(MirOperand::Local(enumerator)));
                self.builder.terminate(MirTerminator::Branch {
                    cond: MirOperand::Local(is_null),
                    then_block: after,
                    else_block: call_block,
                });
            }
            _ => self.builder.terminate(MirTerminator::Goto { target: call_block }),
        }

        self.builder.switch_to_block(call_block);
        let awaited = pattern.disposal.awaited();
        if let Some(member) = pattern.disposal.member() {
            let args = match &pattern.disposal {
                DisposalPlan::Structural { arguments, .. } => self.lower_arguments(arguments, span)?,
                _ => Vec::new(),
            };
            let receiver = Some(Receiver {
                value: MirOperand::Local(enumerator),
                by_ref: pattern.enumerator_is_value_type,
            });
            let func = self.protocol_ref(member, CallRole::Dispose);
            match awaited {
                Some(info) => {
                    let task = self.builder.alloc_temp(MirType::awaitable(cx, &member.ret));
                    self.builder.push_stmt(MirStmt::Call { dst: Some(task), func, receiver, args });
                    let site = self.suspend.lower_await(
                        &mut self.builder,
                        MirOperand::Local(task),
                        info,
                        None,
                        SuspendKind::Dispose,
                    );
                    plan.suspend_points
                        .push(PlannedSuspend { point: site.point, kind: SuspendKind::Dispose });
                }
                None => {
                    self.builder.push_stmt(MirStmt::Call { dst: None, func, receiver, args });
                }
            }
        }
        self.builder.terminate(MirTerminator::Goto { target: after });
        self.builder.switch_to_block(after);

        Ok(DisposalScope { handler, dispose, guard, awaited: awaited.is_some() })
    }

    /// Switch on the pending exit after disposal and continue each
    /// registered jump from outside the region.
    fn dispatch_exits(
        &mut self,
        pending: LocalId,
        exception: LocalId,
        exit_block: BlockId,
        exits: Vec<JumpTarget>,
    ) {
        let rethrow = self.builder.create_block();
        let invalid = self.builder.create_block();
        let mut cases = vec![(0, exit_block), (-1, rethrow)];
        let mut continuations = Vec::new();
        for (i, target) in exits.into_iter().enumerate() {
            let block = self.builder.create_block();
            cases.push((i as i64 + 1, block));
            continuations.push((block, target));
        }
        self.builder.terminate(MirTerminator::Switch {
            value: MirOperand::Local(pending),
            cases,
            default: invalid,
        });

        self.builder.switch_to_block(rethrow);
        self.builder.terminate(MirTerminator::Throw { value: MirOperand::Local(exception) });

        for (block, target) in continuations {
            self.builder.switch_to_block(block);
            self.emit_jump(target);
        }
    }

    fn lower_arguments(
        &mut self,
        arguments: &[ArgumentPlan],
        span: Span,
    ) -> Result<Vec<MirOperand>, LoweringError> {
        let cx = self.cx();
        arguments
            .iter()
            .map(|arg| match arg {
                ArgumentPlan::DefaultValue { ty, .. } => {
                    Ok(MirOperand::Constant(MirConst::Default(MirType::from_type(cx, ty))))
                }
                ArgumentPlan::EmptyVariadic { .. } => Ok(MirOperand::Constant(MirConst::EmptyArray)),
                ArgumentPlan::Cancellation { local, .. } => {
                    self.lookup(local, span).map(|(id, _)| MirOperand::Local(id))
                }
            })
            .collect()
    }

    fn protocol_ref(&self, member: &MemberSig, role: CallRole) -> FunctionRef {
        let cx = self.cx();
        let (owner, dispatch) = match &member.dispatch {
            Dispatch::Interface => (cx.display(&member.owner), CallDispatch::Interface),
            Dispatch::Instance => (cx.display(&member.owner), CallDispatch::Instance),
            Dispatch::Static { container } => (container.clone(), CallDispatch::Static),
        };
        FunctionRef {
            owner,
            name: member.name.clone(),
            dispatch,
            role,
            ret: MirType::from_type(cx, &member.ret),
        }
    }
}
