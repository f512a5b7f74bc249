// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Enumeration-pattern resolution for asynchronous iteration.
//!
//! For each `await foreach` construct this crate decides which members
//! implement the enumeration protocol, how the loop variable and the source
//! are converted, and whether and how the enumerator is disposed. The
//! outcome is a [`ResolvedPattern`] per construct, collected into a
//! [`SemanticModel`], or a set of [`ForEachError`]s.
//!
//! Resolution runs in stages: candidate location, shape validation,
//! conversion binding, disposal planning. Any error leaves the construct
//! without a pattern; warnings never do.

mod errors;
mod options;
mod site;
mod source;
mod pattern;
mod locate;
mod shape;
mod convert;
mod dispose;
mod resolver;
mod model;

pub use errors::{FailureKind, ForEachError, ForEachWarning, ShapeDefect};
pub use options::{NullSourcePolicy, PatternNames, ResolveOptions, ASYNC_PATTERN, SYNC_PATTERN};
pub use site::{ScopedExtension, UseSite};
pub use source::{bind_source, type_of_expr, BindError, IterationSource, LocalScope, SourceConstant};
pub use pattern::{
    Acquisition, AcquisitionCall, AdvanceOp, ArgumentPlan, ConversionPlan, CurrentOp, Dispatch,
    DisposalPlan, ElementConversion, MemberSig, ResolvedPattern, SourceConversion,
};
pub use resolver::{cross_check_synchronous, resolve_foreach, Resolution};
pub use model::SemanticModel;
