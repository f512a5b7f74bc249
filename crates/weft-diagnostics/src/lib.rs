// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Diagnostics for the weft iteration engine.
//!
//! Resolution, binding and lowering failures are converted to a single
//! `Diagnostic` type through the `ToDiagnostic` trait. The CLI renders them
//! with the terminal formatter or as a JSON report.

pub mod codes;
pub mod convert;
pub mod formatter;
pub mod json;
pub mod suggestions;

use weft_ast::Span;
use serde::Serialize;

// ============================================================================
// Core Types
// ============================================================================

/// A diagnostic with enough context for display.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: Option<ErrorCode>,
    /// Stable failure kind, independent of message wording.
    pub kind: Option<&'static str>,
    pub message: String,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
    pub help: Option<Help>,
}

/// A labeled source span within a diagnostic.
#[derive(Debug, Clone, Serialize)]
pub struct Label {
    pub span: Span,
    pub style: LabelStyle,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelStyle {
    /// The construct keyword.
    Primary,
    /// Member reference or related site.
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Note,
}

/// A code like W0100.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ErrorCode(pub String);

#[derive(Debug, Clone, Serialize)]
pub struct Help {
    pub message: String,
    pub suggestion: Option<CodeSuggestion>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CodeSuggestion {
    pub span: Span,
    pub replacement: String,
}

// ============================================================================
// Builder API
// ============================================================================

impl Diagnostic {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: None,
            kind: None,
            message: message.into(),
            labels: Vec::new(),
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(ErrorCode(code.into()));
        self
    }

    pub fn with_kind(mut self, kind: &'static str) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_label(mut self, span: Span, style: LabelStyle, msg: impl Into<String>) -> Self {
        self.labels.push(Label { span, style, message: Some(msg.into()) });
        self
    }

    pub fn with_primary(self, span: Span, msg: impl Into<String>) -> Self {
        self.with_label(span, LabelStyle::Primary, msg)
    }

    pub fn with_secondary(self, span: Span, msg: impl Into<String>) -> Self {
        self.with_label(span, LabelStyle::Secondary, msg)
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(Help { message: help.into(), suggestion: None });
        self
    }

    /// Attach a replacement to the current help. No-op without help.
    pub fn with_suggestion(mut self, span: Span, replacement: impl Into<String>) -> Self {
        if let Some(ref mut help) = self.help {
            help.suggestion = Some(CodeSuggestion { span, replacement: replacement.into() });
        }
        self
    }

    /// First primary label, or first label.
    pub fn primary_span(&self) -> Option<Span> {
        self.labels
            .iter()
            .find(|l| l.style == LabelStyle::Primary)
            .or(self.labels.first())
            .map(|l| l.span)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

// ============================================================================
// Conversion Trait
// ============================================================================

pub trait ToDiagnostic {
    fn to_diagnostic(&self) -> Diagnostic;
}

// ============================================================================
// Sink
// ============================================================================

/// Collects diagnostics for one unit, in report order.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn report(&mut self, error: &impl ToDiagnostic) {
        self.push(error.to_diagnostic());
    }

    /// Report every error and warning of every construct, construct by
    /// construct in declaration order.
    pub fn report_model(&mut self, model: &weft_resolve::SemanticModel) {
        for (_, resolution) in model.iter() {
            for err in &resolution.errors {
                self.report(err);
            }
            for warn in &resolution.warnings {
                self.report(warn);
            }
        }
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Warning).count()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_span_prefers_primary_label() {
        let diag = Diagnostic::error("x")
            .with_secondary(Span::new(5, 6), "member")
            .with_primary(Span::new(0, 4), "here");
        assert_eq!(diag.primary_span(), Some(Span::new(0, 4)));
    }

    #[test]
    fn suggestion_requires_help() {
        let diag = Diagnostic::error("x").with_suggestion(Span::new(0, 1), "y");
        assert!(diag.help.is_none());
        let diag = Diagnostic::error("x").with_help("try").with_suggestion(Span::new(0, 1), "y");
        assert_eq!(diag.help.unwrap().suggestion.unwrap().replacement, "y");
    }

    #[test]
    fn sink_counts_by_severity() {
        let mut sink = DiagnosticSink::new();
        sink.push(Diagnostic::warning("w"));
        assert!(!sink.has_errors());
        sink.push(Diagnostic::error("e"));
        assert_eq!((sink.error_count(), sink.warning_count()), (1, 1));
        assert_eq!(sink.into_vec().len(), 2);
    }
}
