// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! JSON diagnostic output for tools.
//!
//! Each diagnostic carries its code, category, failure kind, and 1-based
//! line/column locations resolved against the scenario source text.
//! Selected with `--format json`.

use serde::Serialize;
use weft_ast::{LineMap, Span};

use crate::codes::ErrorCodeRegistry;
use crate::{Diagnostic, LabelStyle, Severity};

#[derive(Debug, Serialize)]
pub struct DiagnosticReport {
    /// Schema version.
    pub version: u32,
    pub file: String,
    /// True when no errors were reported.
    pub success: bool,
    /// Command that produced the report.
    pub phase: String,
    pub diagnostics: Vec<JsonDiagnostic>,
    pub error_count: usize,
    pub warning_count: usize,
}

#[derive(Debug, Serialize)]
pub struct JsonDiagnostic {
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<LineCol>,
    pub labels: Vec<JsonLabel>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<JsonSuggestion>,
}

#[derive(Debug, Serialize)]
pub struct JsonLabel {
    pub role: LabelStyle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub start: LineCol,
    pub end: LineCol,
}

/// Line/column pair (1-based).
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct LineCol {
    pub line: usize,
    pub column: usize,
    pub byte_offset: usize,
}

#[derive(Debug, Serialize)]
pub struct JsonSuggestion {
    pub span: Span,
    pub replacement: String,
}

pub fn to_json_report(
    diagnostics: &[Diagnostic],
    source: &str,
    file: &str,
    phase: &str,
) -> DiagnosticReport {
    let registry = ErrorCodeRegistry::default();
    let line_map = LineMap::new(source);
    let error_count = diagnostics.iter().filter(|d| d.severity == Severity::Error).count();
    let warning_count = diagnostics.iter().filter(|d| d.severity == Severity::Warning).count();

    DiagnosticReport {
        version: 1,
        file: file.to_string(),
        success: error_count == 0,
        phase: phase.to_string(),
        diagnostics: diagnostics.iter().map(|d| to_json_diagnostic(d, &line_map, &registry)).collect(),
        error_count,
        warning_count,
    }
}

fn line_col(line_map: &LineMap, offset: usize) -> LineCol {
    let at = line_map.locate(offset);
    LineCol { line: at.line, column: at.column, byte_offset: offset }
}

fn to_json_diagnostic(
    diag: &Diagnostic,
    line_map: &LineMap,
    registry: &ErrorCodeRegistry,
) -> JsonDiagnostic {
    let code = diag.code.as_ref().map(|c| c.0.clone());
    let category = code
        .as_deref()
        .and_then(|c| registry.get(c))
        .map(|info| info.category.to_string());

    JsonDiagnostic {
        severity: diag.severity,
        code,
        category,
        kind: diag.kind,
        message: diag.message.clone(),
        location: diag.primary_span().map(|s| line_col(line_map, s.start)),
        labels: diag
            .labels
            .iter()
            .map(|l| JsonLabel {
                role: l.style,
                message: l.message.clone(),
                start: line_col(line_map, l.span.start),
                end: line_col(line_map, l.span.end),
            })
            .collect(),
        notes: diag.notes.clone(),
        help: diag.help.as_ref().map(|h| h.message.clone()),
        suggestion: diag.help.as_ref().and_then(|h| h.suggestion.as_ref()).map(|s| JsonSuggestion {
            span: s.span,
            replacement: s.replacement.clone(),
        }),
    }
}

pub fn to_json_string(report: &DiagnosticReport) -> String {
    serde_json::to_string_pretty(report).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
}
