// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Conversions from engine error types to `Diagnostic`.
//!
//! Both `check` and `lower` use these conversions. Every diagnostic keeps
//! the failure kind of its source error so tools can match on it.

use crate::suggestions::did_you_mean;
use crate::{Diagnostic, ToDiagnostic};

// ============================================================================
// Resolution Errors
// ============================================================================

impl ToDiagnostic for weft_resolve::ForEachError {
    fn to_diagnostic(&self) -> Diagnostic {
        use weft_resolve::ForEachError::*;

        let diag = Diagnostic::error(self.to_string()).with_kind(self.kind().as_str());
        match self {
            FeatureUnavailable { span } => diag
                .with_code("W0400")
                .with_primary(*span, "requires a newer language version"),

            MissingWellKnownType { span, .. } => diag
                .with_code("W0401")
                .with_primary(*span, "needed by this construct"),

            NotInAsyncContext { span } => diag
                .with_code("W0402")
                .with_primary(*span, "not in an async function")
                .with_help("mark the enclosing function `async`"),

            UnassignedSource { span, source_span, .. } => diag
                .with_code("W0106")
                .with_primary(*span, "iterated here")
                .with_secondary(*source_span, "not assigned on every path"),

            NullConstantSource { span } => diag
                .with_code("W0105")
                .with_primary(*span, "source is the `null` constant"),

            DynamicSourceUnsupported { span } => diag
                .with_code("W0104")
                .with_primary(*span, "source has type `dynamic`")
                .with_help("cast the source to a type that supports asynchronous iteration"),

            MultipleContractInstantiations { instantiations, span, .. } => {
                let mut diag = diag
                    .with_code("W0102")
                    .with_primary(*span, "element type is ambiguous")
                    .with_help("cast the source to one instantiation");
                for inst in instantiations {
                    diag = diag.with_note(format!("implements `{}`", inst));
                }
                diag
            }

            MissingAcquisitionMember { member, available, span, .. } => {
                let diag = diag.with_code("W0100").with_primary(*span, "cannot be iterated");
                match did_you_mean(member, available.iter().map(String::as_str)) {
                    Some(hint) => diag.with_help(hint),
                    None => diag,
                }
            }

            AmbiguousAcquisitionMember { candidates, span, .. } => {
                let mut diag = diag
                    .with_code("W0101")
                    .with_primary(*span, "no single best candidate");
                for candidate in candidates {
                    diag = diag.with_note(format!("candidate: `{}`", candidate));
                }
                diag
            }

            InaccessibleMember { span, member_span, .. } => diag
                .with_code("W0201")
                .with_primary(*span, "required by this construct")
                .with_secondary(*member_span, "declared here"),

            MalformedEnumeratorShape { defect, span, .. } => diag
                .with_code("W0200")
                .with_primary(*span, defect.to_string()),

            WrongSynchronicityHint { construct_is_async, span, .. } => {
                let help = if *construct_is_async {
                    "use `foreach` instead of `await foreach`"
                } else {
                    "use `await foreach` instead of `foreach`"
                };
                diag.with_code("W0103").with_primary(*span, "wrong kind of iteration").with_help(help)
            }

            NoElementConversion { from, to, span } => diag
                .with_code("W0300")
                .with_primary(*span, format!("elements are `{}`", from))
                .with_help(format!("declare the variable as `{}` or `var`", from))
                .with_note(format!("no conversion from `{}` to `{}` exists", from, to)),

            ByRefIterationVariable { span, .. } => diag
                .with_code("W0301")
                .with_primary(*span, "declared by reference"),

            NullableOfUnconstrainedParam { param, span } => diag
                .with_code("W0302")
                .with_primary(*span, "nullable type parameter")
                .with_help(format!("constrain `{}` to a value type", param)),

            AssignToIterationVariable { span, construct_span, .. } => diag
                .with_code("W0303")
                .with_primary(*span, "assigned here")
                .with_secondary(*construct_span, "declared by this loop"),

            Binding { span, .. } => diag
                .with_code("W0107")
                .with_primary(*span, "source cannot be bound"),
        }
    }
}

// ============================================================================
// Resolution Warnings
// ============================================================================

impl ToDiagnostic for weft_resolve::ForEachWarning {
    fn to_diagnostic(&self) -> Diagnostic {
        use weft_resolve::ForEachWarning::*;

        let diag = Diagnostic::warning(self.to_string()).with_kind(self.kind().as_str());
        match self {
            ObsoleteMember { span, member_span, .. } => diag
                .with_code("W0500")
                .with_primary(*span, "used by this construct")
                .with_secondary(*member_span, "marked obsolete here"),

            PatternStaticOrInaccessible { span, member_span, .. } => diag
                .with_code("W0501")
                .with_primary(*span, "candidate ignored")
                .with_secondary(*member_span, "declared here"),

            AmbiguousCandidates { candidates, span, .. } => {
                let mut diag = diag
                    .with_code("W0502")
                    .with_primary(*span, "candidates are equally specific");
                for candidate in candidates {
                    diag = diag.with_note(format!("candidate: `{}`", candidate));
                }
                diag
            }
        }
    }
}

// ============================================================================
// Binding Errors
// ============================================================================

impl ToDiagnostic for weft_resolve::BindError {
    fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.to_string())
            .with_code("W0107")
            .with_kind("Binding")
            .with_primary(self.span(), "here")
    }
}

// ============================================================================
// Lowering Errors
// ============================================================================

impl ToDiagnostic for weft_mir::LoweringError {
    fn to_diagnostic(&self) -> Diagnostic {
        use weft_mir::LoweringError::*;

        let diag = Diagnostic::error(self.to_string());
        match self {
            Unresolved { span } => diag
                .with_code("W0600")
                .with_kind("Unresolved")
                .with_primary(*span, "resolution failed for this construct"),

            UndefinedLabel { span, .. } => diag
                .with_code("W0601")
                .with_kind("UndefinedLabel")
                .with_primary(*span, "jump target not found"),

            JumpOutsideLoop { keyword, span, .. } => diag
                .with_code("W0602")
                .with_kind("JumpOutsideLoop")
                .with_primary(*span, format!("cannot `{}` here", keyword)),

            UnknownLocal { span, .. } => diag
                .with_code("W0603")
                .with_kind("UnknownLocal")
                .with_primary(*span, "not found in this scope"),

            SynchronousIteration { span } => diag
                .with_code("W0604")
                .with_kind("SynchronousIteration")
                .with_primary(*span, "synchronous `foreach`")
                .with_note("only `await foreach` is lowered to a state machine"),

            Type { span, .. } => diag
                .with_code("W0605")
                .with_kind("Type")
                .with_primary(*span, "here"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LabelStyle;
    use weft_ast::Span;
    use weft_resolve::{ForEachError, ForEachWarning};

    const KEYWORD: Span = Span { start: 0, end: 13 };

    #[test]
    fn missing_member_suggests_a_near_miss() {
        let err = ForEachError::MissingAcquisitionMember {
            ty: "Bag".into(),
            member: "GetAsyncEnumerator".into(),
            available: vec!["GetAsyncEnumeratr".into(), "Count".into()],
            span: KEYWORD,
        };
        let diag = err.to_diagnostic();
        assert_eq!(diag.code.as_ref().unwrap().0, "W0100");
        assert_eq!(diag.kind, Some("MissingAcquisitionMember"));
        assert_eq!(diag.primary_span(), Some(KEYWORD));
        assert_eq!(diag.help.unwrap().message, "did you mean `GetAsyncEnumeratr`?");
    }

    #[test]
    fn member_spans_become_secondary_labels() {
        let warn = ForEachWarning::ObsoleteMember {
            member: "E.MoveNextAsync()".into(),
            message: None,
            span: KEYWORD,
            member_span: Span::new(40, 51),
        };
        let diag = warn.to_diagnostic();
        assert!(!diag.is_error());
        assert_eq!(diag.labels.len(), 2);
        assert_eq!(diag.labels[1].style, LabelStyle::Secondary);
        assert_eq!(diag.labels[1].span, Span::new(40, 51));
    }

    #[test]
    fn ambiguity_lists_candidates() {
        let err = ForEachError::AmbiguousAcquisitionMember {
            ty: "Bag".into(),
            member: "GetAsyncEnumerator".into(),
            candidates: vec!["A.GetAsyncEnumerator(Bag)".into(), "B.GetAsyncEnumerator(Bag)".into()],
            span: KEYWORD,
        };
        let diag = err.to_diagnostic();
        assert_eq!(diag.notes.len(), 2);
        assert!(diag.notes[0].contains("A.GetAsyncEnumerator"));
    }

    #[test]
    fn synchronicity_hint_points_at_the_other_construct() {
        let err = ForEachError::WrongSynchronicityHint {
            ty: "List".into(),
            member: "GetAsyncEnumerator".into(),
            construct_is_async: true,
            span: KEYWORD,
        };
        assert_eq!(err.to_diagnostic().help.unwrap().message, "use `foreach` instead of `await foreach`");
    }

    #[test]
    fn lowering_errors_have_codes() {
        let err = weft_mir::LoweringError::JumpOutsideLoop { keyword: "break", label: None, span: KEYWORD };
        let diag = err.to_diagnostic();
        assert_eq!(diag.code.as_ref().unwrap().0, "W0602");
        assert_eq!(diag.labels[0].message.as_deref(), Some("cannot `break` here"));

        let registry = crate::codes::ErrorCodeRegistry::default();
        for err in [
            weft_mir::LoweringError::Unresolved { span: KEYWORD },
            weft_mir::LoweringError::SynchronousIteration { span: KEYWORD },
        ] {
            let code = err.to_diagnostic().code.unwrap().0;
            assert!(registry.get(&code).is_some(), "{} not registered", code);
        }
    }

    #[test]
    fn bind_errors_point_at_the_expression() {
        let err = weft_resolve::BindError::UnknownLocal { name: "xs".into(), span: Span::new(20, 22) };
        let diag = err.to_diagnostic();
        assert_eq!(diag.primary_span(), Some(Span::new(20, 22)));
        assert!(diag.message.contains("`xs`"));
    }
}
