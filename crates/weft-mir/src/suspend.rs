// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The suspend/resume primitive.
//!
//! Iteration lowering never builds awaits by hand. It hands the awaitable to
//! a [`SuspendLowering`], which ends the current block and leaves the
//! builder at the block where execution resumes.

use tracing::trace;
use weft_types::AwaitInfo;

use crate::{BlockBuilder, LocalId, MirOperand, MirTerminator, MirType, SuspendPointId};

/// Which protocol step a suspension belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspendKind {
    Advance,
    Dispose,
    /// An `await` written in user code.
    User,
}

/// One emitted suspension.
#[derive(Debug, Clone, PartialEq)]
pub struct SuspendSite {
    pub point: SuspendPointId,
    pub kind: SuspendKind,
    /// Local receiving the await result, if the result is used.
    pub result: Option<LocalId>,
}

pub trait SuspendLowering {
    /// Await `awaitable` at the builder's current block.
    ///
    /// On return the builder is positioned at the resume block.
    fn lower_await(
        &mut self,
        builder: &mut BlockBuilder,
        awaitable: MirOperand,
        info: &AwaitInfo,
        result_ty: Option<MirType>,
        kind: SuspendKind,
    ) -> SuspendSite;
}

/// Lowers every await to a single `Suspend` terminator.
#[derive(Debug, Default)]
pub struct AwaitPrimitive {
    next_point: u32,
}

impl SuspendLowering for AwaitPrimitive {
    fn lower_await(
        &mut self,
        builder: &mut BlockBuilder,
        awaitable: MirOperand,
        info: &AwaitInfo,
        result_ty: Option<MirType>,
        kind: SuspendKind,
    ) -> SuspendSite {
        let point = SuspendPointId(self.next_point);
        self.next_point += 1;

        let result = result_ty.map(|ty| builder.alloc_temp(ty));
        let resume = builder.create_block();
        builder.terminate(MirTerminator::Suspend { point, awaitable, dst: result, resume });
        builder.switch_to_block(resume);
        trace!(target: "lower", point = point.0, ?kind, pattern = ?info.kind, "suspend point");

        SuspendSite { point, kind, result }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_types::{AwaitKind, Type, WellKnown};

    #[test]
    fn points_are_numbered_and_resume_in_a_new_block() {
        let mut b = BlockBuilder::new("f".into(), MirType::Void);
        let mut prim = AwaitPrimitive::default();
        let info = AwaitInfo { kind: AwaitKind::TaskLike(WellKnown::ValueTask), result: Type::Bool };

        let a = prim.lower_await(&mut b, MirOperand::int(0), &info, Some(MirType::Bool), SuspendKind::Advance);
        let d = prim.lower_await(&mut b, MirOperand::int(1), &info, None, SuspendKind::Dispose);
        assert_eq!((a.point, d.point), (SuspendPointId(0), SuspendPointId(1)));
        assert!(a.result.is_some() && d.result.is_none());

        let f = b.finish();
        assert!(matches!(
            f.blocks[0].terminator,
            MirTerminator::Suspend { resume, .. } if resume.0 == 1
        ));
        assert_eq!(f.suspend_terminators().count(), 2);
    }
}
