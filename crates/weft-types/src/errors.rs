// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Type table error types.

/// An error building or querying the type table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    #[error("undefined type: {0}")]
    Undefined(String),
    #[error("invalid type string: {0}")]
    InvalidTypeString(String),
    #[error("`{name}` expects {expected} type argument(s), found {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("type `{0}` is already defined")]
    Duplicate(String),
}
