// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! State machine transform for resumable functions.
//!
//! Converts a lowered function whose blocks end in `Suspend` into a
//! resumable one. Locals that must survive a suspension move to an explicit
//! frame: every read of such a local is preceded by a `FrameLoad`, every
//! write is followed by a `FrameStore`. Value-type locals mutated in place
//! by a call are stored back the same way, so the frame never holds a stale
//! copy.
//!
//! The transformed function is re-entered at a dispatch block after every
//! suspension. The dispatch block reads the state tag from slot 0 and jumps
//! to the matching resume block.

use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::operand::MirConst;
use crate::{
    BlockId, CaptureRole, LocalId, LoopLoweringPlan, LowerOptions, LoweredFunction, MirBlock,
    MirFunction, MirLocal, MirOperand, MirRValue, MirStmt, MirTerminator, MirType, SuspendPointId,
};

/// Frame slot holding the state tag.
pub const STATE_SLOT: u32 = 0;

// ── Public API ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct FrameSlot {
    pub slot: u32,
    /// `None` for the state tag.
    pub local: Option<LocalId>,
    pub name: String,
    pub ty: MirType,
    pub role: Option<CaptureRole>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameLayout {
    pub slots: Vec<FrameSlot>,
}

impl FrameLayout {
    pub fn slot_of(&self, local: LocalId) -> Option<u32> {
        self.slots.iter().find(|s| s.local == Some(local)).map(|s| s.slot)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Result of the state machine transform.
#[derive(Debug, Clone)]
pub struct StateMachine {
    pub function: MirFunction,
    pub frame: FrameLayout,
    /// State tag value and resume block of every suspension point.
    pub resume_points: Vec<(SuspendPointId, i64, BlockId)>,
    /// Block of the original entry, reached with state tag 0.
    pub start_block: BlockId,
    pub loops: Vec<LoopLoweringPlan>,
}

/// State tag stored before suspending at `point`.
pub fn state_tag(point: SuspendPointId) -> i64 {
    point.0 as i64 + 1
}

pub fn transform(lowered: &LoweredFunction, options: &LowerOptions) -> StateMachine {
    let func = &lowered.function;
    let usage: Vec<BlockUsage> = func.blocks.iter().map(block_usage).collect();
    let live_in = compute_liveness(func, &usage);

    let mut hoisted: BTreeSet<LocalId> = BTreeSet::new();
    let mut resume_defs: HashMap<BlockId, LocalId> = HashMap::new();
    for block in &func.blocks {
        if let MirTerminator::Suspend { dst, resume, .. } = &block.terminator {
            let mut live = live_in[resume.0 as usize].clone();
            if let Some(dst) = dst {
                live.remove(dst);
                resume_defs.insert(*resume, *dst);
            }
            hoisted.extend(live);
        }
    }
    for handler in func.handler_blocks() {
        hoisted.extend(live_in[handler.0 as usize].iter().copied());
    }
    let roles: HashMap<LocalId, CaptureRole> = lowered
        .loops
        .iter()
        .flat_map(|plan| plan.captures.iter().map(|c| (c.local, c.role)))
        .collect();
    if options.hoist_all_captures {
        hoisted.extend(roles.keys().copied());
    }

    let frame = build_frame_layout(func, &hoisted, &roles);
    let slots: IndexMap<LocalId, u32> =
        frame.slots.iter().filter_map(|s| s.local.map(|l| (l, s.slot))).collect();
    for (local, slot) in &slots {
        trace!(target: "state_machine", local = local.0, slot, "hoisted to frame");
    }

    let mut out = func.clone();
    for block in &mut out.blocks {
        rewrite_block(block, &slots, func.entry_block, func, resume_defs.get(&block.id).copied());
    }

    // Dispatch block: re-entry point after every suspension.
    let tag = LocalId(out.locals.len() as u32);
    out.locals.push(MirLocal { id: tag, name: None, ty: MirType::I32, is_param: false });
    let invalid = BlockId(out.blocks.len() as u32);
    out.blocks.push(MirBlock { id: invalid, statements: Vec::new(), terminator: MirTerminator::Unreachable });

    let mut resume_points = Vec::new();
    let mut cases = vec![(0, func.entry_block)];
    for block in &func.blocks {
        if let MirTerminator::Suspend { point, resume, .. } = &block.terminator {
            resume_points.push((*point, state_tag(*point), *resume));
            cases.push((state_tag(*point), *resume));
        }
    }
    let dispatch = BlockId(out.blocks.len() as u32);
    out.blocks.push(MirBlock {
        id: dispatch,
        statements: vec![MirStmt::FrameLoad { dst: tag, slot: STATE_SLOT }],
        terminator: MirTerminator::Switch { value: MirOperand::Local(tag), cases, default: invalid },
    });
    out.entry_block = dispatch;

    debug!(
        target: "state_machine",
        function = %func.name,
        frame_slots = frame.len(),
        suspend_points = resume_points.len(),
        "state machine built"
    );

    StateMachine {
        function: out,
        frame,
        resume_points,
        start_block: func.entry_block,
        loops: lowered.loops.clone(),
    }
}

// ── Liveness ────────────────────────────────────────────────────────

/// Locals read before any write in the block, and locals written.
struct BlockUsage {
    uses: BTreeSet<LocalId>,
    defs: BTreeSet<LocalId>,
}

fn block_usage(block: &MirBlock) -> BlockUsage {
    let mut usage = BlockUsage { uses: BTreeSet::new(), defs: BTreeSet::new() };
    for stmt in &block.statements {
        for used in stmt_uses(stmt) {
            if !usage.defs.contains(&used) {
                usage.uses.insert(used);
            }
        }
        usage.defs.extend(stmt_defs(stmt));
    }
    for used in terminator_uses(&block.terminator) {
        if !usage.defs.contains(&used) {
            usage.uses.insert(used);
        }
    }
    usage
}

/// Backward dataflow to a fixed point. Returns live-in per block.
fn compute_liveness(func: &MirFunction, usage: &[BlockUsage]) -> Vec<BTreeSet<LocalId>> {
    let n = func.blocks.len();
    let mut live_in: Vec<BTreeSet<LocalId>> = vec![BTreeSet::new(); n];
    let successors: Vec<Vec<BlockId>> =
        func.blocks.iter().map(|b| b.terminator.successors()).collect();

    let mut changed = true;
    while changed {
        changed = false;
        for i in (0..n).rev() {
            let mut live: BTreeSet<LocalId> = successors[i]
                .iter()
                .flat_map(|s| live_in[s.0 as usize].iter().copied())
                .collect();
            for d in &usage[i].defs {
                live.remove(d);
            }
            live.extend(usage[i].uses.iter().copied());
            if live != live_in[i] {
                live_in[i] = live;
                changed = true;
            }
        }
    }
    live_in
}

fn operand_local(op: &MirOperand) -> Option<LocalId> {
    op.local()
}

fn rvalue_uses(rv: &MirRValue) -> Vec<LocalId> {
    match rv {
        MirRValue::Use(op)
        | MirRValue::NullableHasValue(op)
        | MirRValue::NullableValue(op)
        | MirRValue::IsNull(op) => operand_local(op).into_iter().collect(),
        MirRValue::BinaryOp { left, right, .. } => {
            operand_local(left).into_iter().chain(operand_local(right)).collect()
        }
        MirRValue::Convert { value, .. } | MirRValue::IsInstance { value, .. } => {
            operand_local(value).into_iter().collect()
        }
    }
}

fn stmt_uses(stmt: &MirStmt) -> Vec<LocalId> {
    match stmt {
        MirStmt::Assign { rvalue, .. } => rvalue_uses(rvalue),
        MirStmt::Call { receiver, args, .. } => receiver
            .iter()
            .filter_map(|r| operand_local(&r.value))
            .chain(args.iter().filter_map(operand_local))
            .collect(),
        MirStmt::FrameStore { value, .. } => operand_local(value).into_iter().collect(),
        MirStmt::EnsurePush { .. }
        | MirStmt::EnsurePop
        | MirStmt::CatchException { .. }
        | MirStmt::FrameLoad { .. } => Vec::new(),
    }
}

fn stmt_defs(stmt: &MirStmt) -> Vec<LocalId> {
    match stmt {
        MirStmt::Assign { dst, .. }
        | MirStmt::CatchException { dst }
        | MirStmt::FrameLoad { dst, .. } => vec![*dst],
        MirStmt::Call { dst, receiver, .. } => {
            let written_back = receiver.as_ref().filter(|r| r.by_ref).and_then(|r| r.value.local());
            dst.iter().copied().chain(written_back).collect()
        }
        MirStmt::EnsurePush { .. } | MirStmt::EnsurePop | MirStmt::FrameStore { .. } => Vec::new(),
    }
}

fn terminator_uses(term: &MirTerminator) -> Vec<LocalId> {
    match term {
        MirTerminator::Return { value: Some(op) }
        | MirTerminator::Branch { cond: op, .. }
        | MirTerminator::Switch { value: op, .. }
        | MirTerminator::Throw { value: op }
        | MirTerminator::Suspend { awaitable: op, .. } => operand_local(op).into_iter().collect(),
        MirTerminator::Return { value: None } | MirTerminator::Goto { .. } | MirTerminator::Unreachable => {
            Vec::new()
        }
    }
}

// ── Layout & rewrite ────────────────────────────────────────────────

fn build_frame_layout(
    func: &MirFunction,
    hoisted: &BTreeSet<LocalId>,
    roles: &HashMap<LocalId, CaptureRole>,
) -> FrameLayout {
    let mut slots = vec![FrameSlot {
        slot: STATE_SLOT,
        local: None,
        name: "<state>".to_string(),
        ty: MirType::I32,
        role: None,
    }];
    for local in hoisted {
        let Some(decl) = func.local(*local) else { continue };
        slots.push(FrameSlot {
            slot: slots.len() as u32,
            local: Some(*local),
            name: decl.name.clone().unwrap_or_else(|| format!("_{}", local.0)),
            ty: decl.ty.clone(),
            role: roles.get(local).copied(),
        });
    }
    FrameLayout { slots }
}

fn rewrite_block(
    block: &mut MirBlock,
    slots: &IndexMap<LocalId, u32>,
    entry: BlockId,
    func: &MirFunction,
    resume_def: Option<LocalId>,
) {
    let mut statements = Vec::new();
    let store = |local: LocalId, out: &mut Vec<MirStmt>| {
        if let Some(&slot) = slots.get(&local) {
            out.push(MirStmt::FrameStore { slot, value: MirOperand::Local(local) });
        }
    };
    let load = |locals: Vec<LocalId>, out: &mut Vec<MirStmt>| {
        let mut seen = BTreeSet::new();
        for local in locals {
            if let Some(&slot) = slots.get(&local) {
                if seen.insert(local) {
                    out.push(MirStmt::FrameLoad { dst: local, slot });
                }
            }
        }
    };

    if block.id == entry {
        for param in &func.params {
            store(param.id, &mut statements);
        }
    }
    if let Some(dst) = resume_def {
        store(dst, &mut statements);
    }

    for stmt in block.statements.drain(..) {
        load(stmt_uses(&stmt), &mut statements);
        let defs = stmt_defs(&stmt);
        statements.push(stmt);
        for def in defs {
            store(def, &mut statements);
        }
    }

    load(terminator_uses(&block.terminator), &mut statements);
    if let MirTerminator::Suspend { point, .. } = &block.terminator {
        statements.push(MirStmt::FrameStore {
            slot: STATE_SLOT,
            value: MirOperand::Constant(MirConst::Int(state_tag(*point))),
        });
    }
    block.statements = statements;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BlockBuilder, FunctionRef, Receiver};

    /// `x` is written before a suspension and read after it; `t` is not.
    fn suspending_function() -> LoweredFunction {
        let mut b = BlockBuilder::new("f".into(), MirType::Void);
        let x = b.alloc_local("x".into(), MirType::I32);
        let t = b.alloc_temp(MirType::I32);
        let ok = b.alloc_temp(MirType::Bool);
        let resume = b.create_block();
        b.push_stmt(MirStmt::Assign { dst: x, rvalue: MirRValue::Use(MirOperand::int(1)) });
        b.push_stmt(MirStmt::Assign { dst: t, rvalue: MirRValue::Use(MirOperand::int(2)) });
        b.terminate(MirTerminator::Suspend {
            point: SuspendPointId(0),
            awaitable: MirOperand::Local(t),
            dst: Some(ok),
            resume,
        });
        b.switch_to_block(resume);
        b.push_stmt(MirStmt::Call {
            dst: None,
            func: FunctionRef::free("log"),
            receiver: None,
            args: vec![MirOperand::Local(x), MirOperand::Local(ok)],
        });
        b.terminate(MirTerminator::Return { value: None });
        LoweredFunction { function: b.finish(), loops: Vec::new() }
    }

    #[test]
    fn only_locals_live_across_suspension_get_slots() {
        let sm = transform(&suspending_function(), &LowerOptions::default());
        assert_eq!(sm.frame.len(), 2);
        assert_eq!(sm.frame.slots[0].name, "<state>");
        assert_eq!(sm.frame.slot_of(LocalId(0)), Some(1));
        assert_eq!(sm.frame.slot_of(LocalId(1)), None);
        assert_eq!(sm.frame.slot_of(LocalId(2)), None);
    }

    #[test]
    fn writes_store_and_reads_load() {
        let sm = transform(&suspending_function(), &LowerOptions::default());
        let entry = &sm.function.blocks[0].statements;
        assert!(matches!(entry[1], MirStmt::FrameStore { slot: 1, .. }));
        assert!(matches!(
            entry.last(),
            Some(MirStmt::FrameStore { slot: STATE_SLOT, value: MirOperand::Constant(MirConst::Int(1)) })
        ));
        let resume = &sm.function.blocks[1].statements;
        assert!(matches!(resume[0], MirStmt::FrameLoad { dst: LocalId(0), slot: 1 }));
    }

    #[test]
    fn dispatch_switches_on_the_state_tag() {
        let sm = transform(&suspending_function(), &LowerOptions::default());
        let dispatch = sm.function.block(sm.function.entry_block).unwrap();
        assert!(matches!(dispatch.statements[0], MirStmt::FrameLoad { slot: STATE_SLOT, .. }));
        let MirTerminator::Switch { cases, .. } = &dispatch.terminator else {
            panic!("dispatch must switch");
        };
        assert_eq!(cases, &vec![(0, BlockId(0)), (1, BlockId(1))]);
        assert_eq!(sm.resume_points, vec![(SuspendPointId(0), 1, BlockId(1))]);
        assert_eq!(sm.start_block, BlockId(0));
    }

    #[test]
    fn by_ref_receivers_are_stored_back() {
        let mut b = BlockBuilder::new("f".into(), MirType::Void);
        let e = b.alloc_temp(MirType::Struct("E".into()));
        let task = b.alloc_temp(MirType::Awaitable("ValueTask<bool>".into()));
        let resume = b.create_block();
        b.push_stmt(MirStmt::Assign {
            dst: e,
            rvalue: MirRValue::Use(MirOperand::Constant(MirConst::Default(MirType::Struct("E".into())))),
        });
        b.push_stmt(MirStmt::Call {
            dst: Some(task),
            func: FunctionRef::free("MoveNextAsync"),
            receiver: Some(Receiver { value: MirOperand::Local(e), by_ref: true }),
            args: Vec::new(),
        });
        b.terminate(MirTerminator::Suspend {
            point: SuspendPointId(0),
            awaitable: MirOperand::Local(task),
            dst: None,
            resume,
        });
        b.switch_to_block(resume);
        b.push_stmt(MirStmt::Call {
            dst: None,
            func: FunctionRef::free("use"),
            receiver: Some(Receiver { value: MirOperand::Local(e), by_ref: false }),
            args: Vec::new(),
        });
        b.terminate(MirTerminator::Return { value: None });
        let sm = transform(&LoweredFunction { function: b.finish(), loops: Vec::new() }, &LowerOptions::default());

        let entry = &sm.function.blocks[0].statements;
        let call = entry.iter().position(|s| matches!(s, MirStmt::Call { .. })).unwrap();
        assert!(matches!(entry[call - 1], MirStmt::FrameLoad { dst, .. } if dst == e));
        assert!(matches!(entry[call + 1], MirStmt::FrameStore { value: MirOperand::Local(l), .. } if l == e));
    }
}
