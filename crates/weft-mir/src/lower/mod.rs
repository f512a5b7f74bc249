// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! MIR lowering - transform a function with iteration constructs to MIR CFG.
//!
//! Each `await foreach` becomes acquire / advance / current / dispose calls
//! around the body. Constructs that need disposal run their body inside a
//! protected region, and every way out of the region (normal completion,
//! `break`, `continue` or `goto` to an outer target, `return`, a fault)
//! goes through the construct's single dispose block. The exit taken is
//! recorded in a pending-exit local and dispatched after disposal:
//!
//! ```text
//!   0   fall through to the block after the loop
//!  -1   rethrow the captured exception
//!   k   continue jump k registered by the region (may leave outer regions)
//! ```

mod expr;
mod foreach;
mod stmt;

pub use foreach::NULLABLE_NO_VALUE;

use std::collections::HashMap;

use tracing::debug;
use weft_ast::{FnDecl, Span, Stmt, StmtKind};
use weft_resolve::SemanticModel;
use weft_types::{parse_type_string, Type, TypeContext, TypeTable};

use crate::operand::MirConst;
use crate::{
    AwaitPrimitive, BlockBuilder, BlockId, LocalId, LoopLoweringPlan, LoweredFunction,
    LoweringError, MirOperand, MirRValue, MirStmt, MirTerminator, MirType, SuspendLowering,
};

/// Lower `func` with the default await primitive.
pub fn lower_function(
    table: &TypeTable,
    model: &SemanticModel,
    func: &FnDecl,
) -> Result<LoweredFunction, LoweringError> {
    MirLowerer::new(table, model, func, AwaitPrimitive::default()).lower(func)
}

/// Where a jump lands, and how many protected regions enclose the landing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JumpTarget {
    Block { block: BlockId, depth: usize },
    Return,
}

impl JumpTarget {
    fn depth(self) -> usize {
        match self {
            JumpTarget::Block { depth, .. } => depth,
            JumpTarget::Return => 0,
        }
    }
}

struct LoopContext {
    label: Option<String>,
    break_target: JumpTarget,
    continue_target: JumpTarget,
}

/// An active protected region.
struct Region {
    pending: LocalId,
    dispose: BlockId,
    /// Exits registered so far; exit `i` has code `i + 1`.
    exits: Vec<JumpTarget>,
}

impl Region {
    fn exit_code(&mut self, target: JumpTarget) -> i64 {
        let index = match self.exits.iter().position(|t| *t == target) {
            Some(i) => i,
            None => {
                self.exits.push(target);
                self.exits.len() - 1
            }
        };
        index as i64 + 1
    }
}

pub struct MirLowerer<'a, S: SuspendLowering = AwaitPrimitive> {
    table: &'a TypeTable,
    model: &'a SemanticModel,
    builder: BlockBuilder,
    suspend: S,
    scopes: Vec<HashMap<String, (LocalId, Type)>>,
    labels: Vec<HashMap<String, JumpTarget>>,
    loop_stack: Vec<LoopContext>,
    regions: Vec<Region>,
    ret_local: Option<LocalId>,
    plans: Vec<LoopLoweringPlan>,
}

impl<'a, S: SuspendLowering> MirLowerer<'a, S> {
    pub fn new(table: &'a TypeTable, model: &'a SemanticModel, func: &FnDecl, suspend: S) -> Self {
        MirLowerer {
            table,
            model,
            builder: BlockBuilder::new(func.name.clone(), MirType::Void),
            suspend,
            scopes: vec![HashMap::new()],
            labels: Vec::new(),
            loop_stack: Vec::new(),
            regions: Vec::new(),
            ret_local: None,
            plans: Vec::new(),
        }
    }

    pub fn lower(mut self, func: &FnDecl) -> Result<LoweredFunction, LoweringError> {
        let cx = self.cx();
        for (param, ty) in func.params.iter().zip(self.model.param_types()) {
            let id = self.builder.add_param(param.name.clone(), MirType::from_type(cx, ty));
            self.declare(&param.name, id, ty.clone());
        }

        let ret_ty = match func.ret_ty.as_deref() {
            None | Some("void") => Type::Void,
            Some(s) => self.parse_type(s, func.span)?,
        };
        self.builder.set_ret_ty(MirType::from_type(cx, &ret_ty));

        if ret_ty != Type::Void {
            let ret_mir = MirType::from_type(cx, &ret_ty);
            let ret = self.builder.alloc_local("<ret>".to_string(), ret_mir.clone());
            self.assign(ret, MirRValue::Use(MirOperand::Constant(MirConst::Default(ret_mir))));
            self.ret_local = Some(ret);
        }

        self.lower_block(&func.body)?;

        if self.builder.current_block_unterminated() {
            let value = self.ret_local.map(MirOperand::Local);
            self.builder.terminate(MirTerminator::Return { value });
        }

        let mut loops = std::mem::take(&mut self.plans);
        loops.sort_by_key(|p| p.construct);
        let function = self.builder.finish();
        debug!(
            target: "lower",
            function = %function.name,
            blocks = function.blocks.len(),
            locals = function.locals.len(),
            constructs = loops.len(),
            "lowered"
        );
        Ok(LoweredFunction { function, loops })
    }

    fn cx(&self) -> TypeContext<'a> {
        TypeContext::new(self.table, &self.model.site().type_params)
    }

    fn parse_type(&self, s: &str, span: Span) -> Result<Type, LoweringError> {
        parse_type_string(s, self.cx()).map_err(|e| LoweringError::Type {
            ty: s.to_string(),
            message: e.to_string(),
            span,
        })
    }

    // ── Scopes ──────────────────────────────────────────────────────

    fn declare(&mut self, name: &str, id: LocalId, ty: Type) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), (id, ty));
        }
    }

    fn lookup(&self, name: &str, span: Span) -> Result<(LocalId, Type), LoweringError> {
        self.scopes
            .iter()
            .rev()
            .find_map(|s| s.get(name).cloned())
            .ok_or_else(|| LoweringError::UnknownLocal { name: name.to_string(), span })
    }

    /// Lower a statement list in its own scope. Labels are visible to the
    /// whole list, so forward `goto`s resolve.
    fn lower_block(&mut self, stmts: &[Stmt]) -> Result<(), LoweringError> {
        let mut labels = HashMap::new();
        for stmt in stmts {
            if let StmtKind::Label(name) = &stmt.kind {
                let block = self.builder.create_block();
                labels.insert(name.clone(), JumpTarget::Block { block, depth: self.regions.len() });
            }
        }
        self.scopes.push(HashMap::new());
        self.labels.push(labels);

        let result = stmts.iter().try_for_each(|stmt| self.lower_stmt(stmt));

        self.labels.pop();
        self.scopes.pop();
        result
    }

    // ── Jumps ───────────────────────────────────────────────────────

    /// Transfer control to `target`, leaving protected regions on the way.
    ///
    /// Inside a region the jump records its exit code and goes to the
    /// region's dispose block; the rest of the jump is emitted when the
    /// region closes.
    fn emit_jump(&mut self, target: JumpTarget) {
        let inside = self.regions.len();
        let leave = if inside > target.depth() {
            self.regions.last_mut().map(|region| {
                let code = region.exit_code(target);
                (region.pending, region.dispose, code)
            })
        } else {
            None
        };

        match (leave, target) {
            (Some((pending, dispose, code)), _) => {
                self.builder.push_stmt(MirStmt::EnsurePop);
                self.assign(pending, MirRValue::Use(MirOperand::int(code)));
                self.builder.terminate(MirTerminator::Goto { target: dispose });
            }
            (None, JumpTarget::Block { block, .. }) => {
                self.builder.terminate(MirTerminator::Goto { target: block });
            }
            (None, JumpTarget::Return) => {
                let value = self.ret_local.map(MirOperand::Local);
                self.builder.terminate(MirTerminator::Return { value });
            }
        }

        // Code after a jump is unreachable.
        let dead = self.builder.create_block();
        self.builder.switch_to_block(dead);
    }

    fn find_loop(
        &self,
        label: Option<&str>,
        keyword: &'static str,
        span: Span,
    ) -> Result<&LoopContext, LoweringError> {
        let found = match label {
            None => self.loop_stack.last(),
            Some(l) => self.loop_stack.iter().rev().find(|ctx| ctx.label.as_deref() == Some(l)),
        };
        found.ok_or_else(|| LoweringError::JumpOutsideLoop {
            keyword,
            label: label.map(str::to_string),
            span,
        })
    }

    fn find_label(&self, label: &str, span: Span) -> Result<JumpTarget, LoweringError> {
        self.labels
            .iter()
            .rev()
            .find_map(|scope| scope.get(label).copied())
            .ok_or_else(|| LoweringError::UndefinedLabel { label: label.to_string(), span })
    }

    // ── Emission helpers ────────────────────────────────────────────

    fn assign(&mut self, dst: LocalId, rvalue: MirRValue) {
        self.builder.push_stmt(MirStmt::Assign { dst, rvalue });
    }

    /// Copy an operand into a fresh local unless it already is one.
    fn into_local(&mut self, operand: MirOperand, ty: MirType) -> LocalId {
        match operand {
            MirOperand::Local(id) => id,
            constant => {
                let tmp = self.builder.alloc_temp(ty);
                self.assign(tmp, MirRValue::Use(constant));
                tmp
            }
        }
    }
}
