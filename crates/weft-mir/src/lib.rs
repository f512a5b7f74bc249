// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! MIR (Mid-level Intermediate Representation) for resumable functions.
//!
//! Lowering turns each resolved `await foreach` into a control-flow graph of
//! protocol calls, suspension points and a protected region that disposes
//! the enumerator on every exit. The state machine transform then moves
//! everything that lives across a suspension into an explicit frame, and
//! the replay executor runs the result against a scripted host.

mod builder;
mod display;
mod error;
mod function;
mod options;
mod plan;
mod stmt;
mod suspend;
mod types;

pub mod lower;
pub mod operand;
pub mod replay;
pub mod transform;

pub use builder::BlockBuilder;
pub use error::LoweringError;
pub use function::{BlockId, LocalId, MirBlock, MirFunction, MirLocal};
pub use lower::{lower_function, MirLowerer};
pub use operand::{BinOp, CallDispatch, CallRole, FunctionRef, MirConst, MirOperand, MirRValue, Receiver};
pub use options::LowerOptions;
pub use plan::{
    CaptureRole, CapturedVar, DisposalScope, DisposeGuard, LoopLoweringPlan, LoweredFunction,
    PlannedSuspend,
};
pub use stmt::{MirStmt, MirTerminator, SuspendPointId};
pub use suspend::{AwaitPrimitive, SuspendKind, SuspendLowering, SuspendSite};
pub use types::MirType;
pub use transform::{transform, StateMachine};
