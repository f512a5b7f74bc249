// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Resolution diagnostics.
//!
//! Every error and warning carries the span of the construct's introducing
//! keyword. Accessibility and obsolescence diagnostics also carry the span
//! of the member reference.

use std::fmt;

use weft_ast::Span;

/// Diagnostic kind, stable across message wording changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    MissingAcquisitionMember,
    AmbiguousAcquisitionMember,
    MultipleContractInstantiations,
    MalformedEnumeratorShape,
    InaccessibleMember,
    ObsoleteMemberWarning,
    WrongSynchronicityHint,
    DynamicSourceUnsupported,
    NullConstantSource,
    UnassignedSource,
    ElementConversion,
    ByRefIterationVariable,
    NullableTypeParameter,
    FeatureUnavailable,
    MissingWellKnownType,
    NotInAsyncContext,
    AssignToIterationVariable,
    PatternStaticOrInaccessible,
    AmbiguousCandidates,
    Binding,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::MissingAcquisitionMember => "MissingAcquisitionMember",
            FailureKind::AmbiguousAcquisitionMember => "AmbiguousAcquisitionMember",
            FailureKind::MultipleContractInstantiations => "MultipleContractInstantiations",
            FailureKind::MalformedEnumeratorShape => "MalformedEnumeratorShape",
            FailureKind::InaccessibleMember => "InaccessibleMember",
            FailureKind::ObsoleteMemberWarning => "ObsoleteMemberWarning",
            FailureKind::WrongSynchronicityHint => "WrongSynchronicityHint",
            FailureKind::DynamicSourceUnsupported => "DynamicSourceUnsupported",
            FailureKind::NullConstantSource => "NullConstantSource",
            FailureKind::UnassignedSource => "UnassignedSource",
            FailureKind::ElementConversion => "ElementConversion",
            FailureKind::ByRefIterationVariable => "ByRefIterationVariable",
            FailureKind::NullableTypeParameter => "NullableTypeParameter",
            FailureKind::FeatureUnavailable => "FeatureUnavailable",
            FailureKind::MissingWellKnownType => "MissingWellKnownType",
            FailureKind::NotInAsyncContext => "NotInAsyncContext",
            FailureKind::AssignToIterationVariable => "AssignToIterationVariable",
            FailureKind::PatternStaticOrInaccessible => "PatternStaticOrInaccessible",
            FailureKind::AmbiguousCandidates => "AmbiguousCandidates",
            FailureKind::Binding => "Binding",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What is wrong with an enumerator type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeDefect {
    MissingAdvance { member: String },
    MissingCurrent { member: String },
    AdvanceRequiresArguments { member: String },
    AdvanceNotAwaitableBool { member: String, found: String },
    CurrentNotReadable { member: String },
    NotPublicInstance { member: String },
}

impl fmt::Display for ShapeDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeDefect::MissingAdvance { member } => write!(f, "no `{}` method", member),
            ShapeDefect::MissingCurrent { member } => write!(f, "no `{}` property", member),
            ShapeDefect::AdvanceRequiresArguments { member } => {
                write!(f, "`{}` requires arguments", member)
            }
            ShapeDefect::AdvanceNotAwaitableBool { member, found } => {
                write!(f, "`{}` returns `{}`, which does not await to `bool`", member, found)
            }
            ShapeDefect::CurrentNotReadable { member } => write!(f, "`{}` has no getter", member),
            ShapeDefect::NotPublicInstance { member } => {
                write!(f, "`{}` is not a public instance member", member)
            }
        }
    }
}

fn other_synchronicity(construct_is_async: &bool) -> &'static str {
    if *construct_is_async {
        "synchronous"
    } else {
        "asynchronous"
    }
}

fn obsolete_suffix(message: &Option<String>) -> String {
    message.as_deref().map(|m| format!(": {}", m)).unwrap_or_default()
}

/// A resolution failure. Any error blocks lowering of its construct.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ForEachError {
    #[error("asynchronous iteration is not available in this language version")]
    FeatureUnavailable { span: Span },

    #[error("predefined type `{name}` is not defined or imported")]
    MissingWellKnownType { name: String, span: Span },

    #[error("`await foreach` can only be used inside an async function")]
    NotInAsyncContext { span: Span },

    #[error("use of unassigned local variable `{name}`")]
    UnassignedSource { name: String, span: Span, source_span: Span },

    #[error("cannot iterate over `null`")]
    NullConstantSource { span: Span },

    #[error("cannot iterate asynchronously over an expression of type `dynamic`")]
    DynamicSourceUnsupported { span: Span },

    #[error("`{ty}` implements `{contract}` for more than one element type: {}", .instantiations.join(", "))]
    MultipleContractInstantiations {
        ty: String,
        contract: String,
        instantiations: Vec<String>,
        span: Span,
    },

    #[error("`{ty}` does not contain a public instance or extension definition for `{member}`")]
    MissingAcquisitionMember {
        ty: String,
        member: String,
        /// Member names available on the type, for suggestions.
        available: Vec<String>,
        span: Span,
    },

    #[error("`{member}` on `{ty}` is ambiguous between {}", .candidates.join(" and "))]
    AmbiguousAcquisitionMember {
        ty: String,
        member: String,
        candidates: Vec<String>,
        span: Span,
    },

    #[error("`{member}` is inaccessible due to its protection level")]
    InaccessibleMember { member: String, span: Span, member_span: Span },

    #[error("`{enumerator}` returned by `{acquisition}` is not a valid enumerator: {defect}")]
    MalformedEnumeratorShape {
        enumerator: String,
        acquisition: String,
        defect: ShapeDefect,
        span: Span,
    },

    #[error("`{ty}` has no `{member}`; it supports {} iteration", other_synchronicity(.construct_is_async))]
    WrongSynchronicityHint {
        ty: String,
        member: String,
        construct_is_async: bool,
        span: Span,
    },

    #[error("cannot convert element type `{from}` to `{to}`")]
    NoElementConversion { from: String, to: String, span: Span },

    #[error("iteration variable `{name}` cannot be a reference in an async iteration")]
    ByRefIterationVariable { name: String, span: Span },

    #[error("`{param}?` requires `{param}` to be constrained to a value type")]
    NullableOfUnconstrainedParam { param: String, span: Span },

    #[error("cannot assign to `{name}` because it is an iteration variable")]
    AssignToIterationVariable { name: String, span: Span, construct_span: Span },

    #[error("{message}")]
    Binding { message: String, span: Span },
}

impl ForEachError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ForEachError::FeatureUnavailable { .. } => FailureKind::FeatureUnavailable,
            ForEachError::MissingWellKnownType { .. } => FailureKind::MissingWellKnownType,
            ForEachError::NotInAsyncContext { .. } => FailureKind::NotInAsyncContext,
            ForEachError::UnassignedSource { .. } => FailureKind::UnassignedSource,
            ForEachError::NullConstantSource { .. } => FailureKind::NullConstantSource,
            ForEachError::DynamicSourceUnsupported { .. } => FailureKind::DynamicSourceUnsupported,
            ForEachError::MultipleContractInstantiations { .. } => {
                FailureKind::MultipleContractInstantiations
            }
            ForEachError::MissingAcquisitionMember { .. } => FailureKind::MissingAcquisitionMember,
            ForEachError::AmbiguousAcquisitionMember { .. } => {
                FailureKind::AmbiguousAcquisitionMember
            }
            ForEachError::InaccessibleMember { .. } => FailureKind::InaccessibleMember,
            ForEachError::MalformedEnumeratorShape { .. } => FailureKind::MalformedEnumeratorShape,
            ForEachError::WrongSynchronicityHint { .. } => FailureKind::WrongSynchronicityHint,
            ForEachError::NoElementConversion { .. } => FailureKind::ElementConversion,
            ForEachError::ByRefIterationVariable { .. } => FailureKind::ByRefIterationVariable,
            ForEachError::NullableOfUnconstrainedParam { .. } => FailureKind::NullableTypeParameter,
            ForEachError::AssignToIterationVariable { .. } => {
                FailureKind::AssignToIterationVariable
            }
            ForEachError::Binding { .. } => FailureKind::Binding,
        }
    }

    /// Primary span: the construct keyword, except for errors raised
    /// inside the loop body.
    pub fn span(&self) -> Span {
        match self {
            ForEachError::FeatureUnavailable { span }
            | ForEachError::MissingWellKnownType { span, .. }
            | ForEachError::NotInAsyncContext { span }
            | ForEachError::UnassignedSource { span, .. }
            | ForEachError::NullConstantSource { span }
            | ForEachError::DynamicSourceUnsupported { span }
            | ForEachError::MultipleContractInstantiations { span, .. }
            | ForEachError::MissingAcquisitionMember { span, .. }
            | ForEachError::AmbiguousAcquisitionMember { span, .. }
            | ForEachError::InaccessibleMember { span, .. }
            | ForEachError::MalformedEnumeratorShape { span, .. }
            | ForEachError::WrongSynchronicityHint { span, .. }
            | ForEachError::NoElementConversion { span, .. }
            | ForEachError::ByRefIterationVariable { span, .. }
            | ForEachError::NullableOfUnconstrainedParam { span, .. }
            | ForEachError::AssignToIterationVariable { span, .. }
            | ForEachError::Binding { span, .. } => *span,
        }
    }
}

/// A non-fatal finding. Warnings never block lowering.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ForEachWarning {
    #[error("`{member}` is obsolete{}", obsolete_suffix(.message))]
    ObsoleteMember {
        member: String,
        message: Option<String>,
        span: Span,
        member_span: Span,
    },

    #[error("`{ty}` has a `{member}` that is static or not public; it is not used for iteration")]
    PatternStaticOrInaccessible {
        ty: String,
        member: String,
        span: Span,
        member_span: Span,
    },

    #[error("`{member}` on `{ty}` is ambiguous between {}", .candidates.join(" and "))]
    AmbiguousCandidates {
        ty: String,
        member: String,
        candidates: Vec<String>,
        span: Span,
    },
}

impl ForEachWarning {
    pub fn kind(&self) -> FailureKind {
        match self {
            ForEachWarning::ObsoleteMember { .. } => FailureKind::ObsoleteMemberWarning,
            ForEachWarning::PatternStaticOrInaccessible { .. } => {
                FailureKind::PatternStaticOrInaccessible
            }
            ForEachWarning::AmbiguousCandidates { .. } => FailureKind::AmbiguousCandidates,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            ForEachWarning::ObsoleteMember { span, .. }
            | ForEachWarning::PatternStaticOrInaccessible { span, .. }
            | ForEachWarning::AmbiguousCandidates { span, .. } => *span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_render() {
        let err = ForEachError::MultipleContractInstantiations {
            ty: "C".into(),
            contract: "IAsyncEnumerable<T>".into(),
            instantiations: vec!["IAsyncEnumerable<int>".into(), "IAsyncEnumerable<string>".into()],
            span: Span::new(0, 13),
        };
        assert_eq!(
            err.to_string(),
            "`C` implements `IAsyncEnumerable<T>` for more than one element type: \
             IAsyncEnumerable<int>, IAsyncEnumerable<string>"
        );
        assert_eq!(err.kind(), FailureKind::MultipleContractInstantiations);

        let warn = ForEachWarning::ObsoleteMember {
            member: "E.MoveNextAsync()".into(),
            message: Some("use Next".into()),
            span: Span::new(0, 13),
            member_span: Span::new(20, 21),
        };
        assert_eq!(warn.to_string(), "`E.MoveNextAsync()` is obsolete: use Next");
    }

    #[test]
    fn hint_names_the_other_construct() {
        let err = ForEachError::WrongSynchronicityHint {
            ty: "C".into(),
            member: "GetAsyncEnumerator".into(),
            construct_is_async: true,
            span: Span::default(),
        };
        assert!(err.to_string().ends_with("it supports synchronous iteration"));
    }
}
