// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Lowering options.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LowerOptions {
    /// Keep the enumerator, source, loop variable and exit bookkeeping of
    /// every construct in the frame even when liveness says otherwise.
    pub hoist_all_captures: bool,
    /// Step budget for the replay executor.
    pub max_replay_steps: usize,
}

impl Default for LowerOptions {
    fn default() -> Self {
        LowerOptions { hoist_all_captures: true, max_replay_steps: 100_000 }
    }
}
