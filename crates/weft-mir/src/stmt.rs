// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! MIR statements and terminators.

use serde::Serialize;

use crate::{BlockId, FunctionRef, LocalId, MirOperand, MirRValue, Receiver};

#[derive(Debug, Clone, PartialEq)]
pub enum MirStmt {
    Assign {
        dst: LocalId,
        rvalue: MirRValue,
    },
    Call {
        dst: Option<LocalId>,
        func: FunctionRef,
        receiver: Option<Receiver>,
        args: Vec<MirOperand>,
    },
    /// Enter a protected region. A fault raised while the region is active
    /// transfers control to `cleanup_block`.
    EnsurePush {
        cleanup_block: BlockId,
    },
    /// Leave the innermost protected region normally.
    EnsurePop,
    /// Take the in-flight exception at the head of a cleanup block.
    CatchException {
        dst: LocalId,
    },
    /// Read a slot of the resumable frame into a local.
    FrameLoad {
        dst: LocalId,
        slot: u32,
    },
    FrameStore {
        slot: u32,
        value: MirOperand,
    },
}

/// Identity of one suspension point within a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SuspendPointId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub enum MirTerminator {
    Return {
        value: Option<MirOperand>,
    },
    Goto {
        target: BlockId,
    },
    Branch {
        cond: MirOperand,
        then_block: BlockId,
        else_block: BlockId,
    },
    Switch {
        value: MirOperand,
        cases: Vec<(i64, BlockId)>,
        default: BlockId,
    },
    /// Await `awaitable`, then continue at `resume` with the result in `dst`.
    Suspend {
        point: SuspendPointId,
        awaitable: MirOperand,
        dst: Option<LocalId>,
        resume: BlockId,
    },
    Throw {
        value: MirOperand,
    },
    Unreachable,
}

impl MirTerminator {
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            MirTerminator::Goto { target } => vec![*target],
            MirTerminator::Branch { then_block, else_block, .. } => vec![*then_block, *else_block],
            MirTerminator::Switch { cases, default, .. } => {
                let mut out: Vec<BlockId> = cases.iter().map(|(_, b)| *b).collect();
                out.push(*default);
                out
            }
            MirTerminator::Suspend { resume, .. } => vec![*resume],
            MirTerminator::Return { .. } | MirTerminator::Throw { .. } | MirTerminator::Unreachable => {
                Vec::new()
            }
        }
    }
}
