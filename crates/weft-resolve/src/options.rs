// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Resolution options and protocol member names.

use serde::{Deserialize, Serialize};
use weft_types::WellKnown;

/// What a nullable-valued source with no value does at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullSourcePolicy {
    /// Zero iterations: no acquisition, no advance, no disposal, no error.
    #[default]
    Skip,
    /// Fault with a "nullable object has no value" error before acquisition.
    Fault,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveOptions {
    /// Language-version gate for asynchronous iteration.
    pub async_streams: bool,
    pub null_source: NullSourcePolicy,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        ResolveOptions { async_streams: true, null_source: NullSourcePolicy::Skip }
    }
}

/// Member and contract names for one synchronicity of the protocol.
#[derive(Debug)]
pub struct PatternNames {
    pub acquire: &'static str,
    pub advance: &'static str,
    pub current: &'static str,
    pub dispose: &'static str,
    pub enumerable: WellKnown,
    pub enumerator: WellKnown,
    pub disposable: WellKnown,
    pub is_async: bool,
}

pub static ASYNC_PATTERN: PatternNames = PatternNames {
    acquire: "GetAsyncEnumerator",
    advance: "MoveNextAsync",
    current: "Current",
    dispose: "DisposeAsync",
    enumerable: WellKnown::AsyncEnumerable,
    enumerator: WellKnown::AsyncEnumerator,
    disposable: WellKnown::AsyncDisposable,
    is_async: true,
};

pub static SYNC_PATTERN: PatternNames = PatternNames {
    acquire: "GetEnumerator",
    advance: "MoveNext",
    current: "Current",
    dispose: "Dispose",
    enumerable: WellKnown::Enumerable,
    enumerator: WellKnown::Enumerator,
    disposable: WellKnown::Disposable,
    is_async: false,
};

impl PatternNames {
    pub fn other(&self) -> &'static PatternNames {
        if self.is_async {
            &SYNC_PATTERN
        } else {
            &ASYNC_PATTERN
        }
    }
}
