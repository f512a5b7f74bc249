// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Per-construct lowering plan.
//!
//! Records what lowering produced for one iteration construct: its
//! suspension points, the locals the resumable frame must keep, and the
//! protected region that guarantees disposal.

use weft_ast::NodeId;
use weft_resolve::NullSourcePolicy;

use crate::{BlockId, LocalId, MirFunction, MirType, SuspendKind, SuspendPointId};

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedSuspend {
    pub point: SuspendPointId,
    pub kind: SuspendKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureRole {
    Source,
    Enumerator,
    LoopVariable,
    /// Exit code consulted after disposal.
    PendingExit,
    /// Exception rethrown after disposal.
    PendingException,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CapturedVar {
    pub role: CaptureRole,
    pub local: LocalId,
    pub ty: MirType,
}

/// How the dispose block decides whether to call the disposal member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisposeGuard {
    /// Value-type enumerator: always dispose.
    Always,
    /// Reference enumerator: skip when null.
    NotNull,
    /// Dispose only if the runtime type implements the contract.
    RuntimeCheck,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisposalScope {
    /// Entered by faults raised inside the region.
    pub handler: BlockId,
    /// The single block every exit path reaches before leaving the region.
    pub dispose: BlockId,
    pub guard: DisposeGuard,
    pub awaited: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopLoweringPlan {
    pub construct: NodeId,
    pub suspend_points: Vec<PlannedSuspend>,
    pub captures: Vec<CapturedVar>,
    pub disposal: Option<DisposalScope>,
    /// Set when the source is nullable and gets unwrapped first.
    pub null_source: Option<NullSourcePolicy>,
    /// Where control continues after the construct.
    pub exit_block: BlockId,
}

impl LoopLoweringPlan {
    pub fn suspend_points_of(&self, kind: SuspendKind) -> impl Iterator<Item = SuspendPointId> + '_ {
        self.suspend_points.iter().filter(move |s| s.kind == kind).map(|s| s.point)
    }

    pub fn capture(&self, role: CaptureRole) -> Option<&CapturedVar> {
        self.captures.iter().find(|c| c.role == role)
    }
}

/// A lowered function with the plan of every construct it contains.
#[derive(Debug, Clone)]
pub struct LoweredFunction {
    pub function: MirFunction,
    /// In construct order.
    pub loops: Vec<LoopLoweringPlan>,
}

impl LoweredFunction {
    pub fn plan(&self, construct: NodeId) -> Option<&LoopLoweringPlan> {
        self.loops.iter().find(|p| p.construct == construct)
    }
}
