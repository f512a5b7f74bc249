// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Transforms over lowered MIR.

pub mod state_machine;

pub use state_machine::{transform, FrameLayout, FrameSlot, StateMachine, STATE_SLOT};
