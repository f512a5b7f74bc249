// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Terminal formatter for diagnostics.
//!
//! ```text
//! error[W0300]: cannot convert element type `int` to `string`
//!   --> scenario.json:3:5
//!    |
//!  3 |     await foreach (string s in xs) {}
//!    |     ^^^^^^^^^^^^^ no conversion for the loop variable
//!    |
//!    = note: the loop variable is assigned in an explicit-conversion context
//! ```

use std::collections::BTreeMap;

use colored::Colorize;
use weft_ast::LineMap;

use crate::{Diagnostic, Help, LabelStyle, Severity};

pub struct DiagnosticFormatter<'a> {
    source: &'a str,
    file_name: Option<&'a str>,
    line_map: LineMap<'a>,
}

struct AnnotatedLine<'d> {
    line_num: usize,
    text: String,
    annotations: Vec<Annotation<'d>>,
}

struct Annotation<'d> {
    col_start: usize,
    col_end: usize,
    style: LabelStyle,
    message: Option<&'d str>,
}

impl<'a> DiagnosticFormatter<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source, file_name: None, line_map: LineMap::new(source) }
    }

    pub fn with_file_name(mut self, name: &'a str) -> Self {
        self.file_name = Some(name);
        self
    }

    pub fn format(&self, diagnostic: &Diagnostic) -> String {
        let mut out = String::new();
        self.format_header(&mut out, diagnostic);

        let annotated = self.collect_annotated_lines(diagnostic);
        let Some(first) = annotated.first() else {
            self.format_footer(&mut out, diagnostic);
            return out;
        };

        let file = self.file_name.unwrap_or("<source>");
        let col = first.annotations.first().map_or(1, |a| a.col_start);
        out.push_str(&format!("  {} {}:{}:{}\n", "-->".blue(), file, first.line_num, col));

        let max_line = annotated.last().map_or(1, |a| a.line_num);
        let gutter = max_line.to_string().len().max(2);

        out.push_str(&format!("{} {}\n", " ".repeat(gutter + 1), "|".blue()));
        let mut prev: Option<usize> = None;
        for line in &annotated {
            if prev.is_some_and(|p| line.line_num > p + 1) {
                out.push_str(&format!("{} {}\n", " ".repeat(gutter), "...".blue()));
            }
            out.push_str(&format!(
                "{:>width$} {} {}\n",
                line.line_num.to_string().blue().bold(),
                "|".blue(),
                line.text,
                width = gutter + 1,
            ));
            self.format_annotations(&mut out, line, gutter);
            prev = Some(line.line_num);
        }

        if !diagnostic.notes.is_empty() || diagnostic.help.is_some() {
            out.push_str(&format!("{} {}\n", " ".repeat(gutter + 1), "|".blue()));
        }
        self.format_footer(&mut out, diagnostic);
        out
    }

    /// Format every diagnostic, separated by blank lines.
    pub fn format_all(&self, diagnostics: &[Diagnostic]) -> String {
        diagnostics.iter().map(|d| self.format(d)).collect::<Vec<_>>().join("\n")
    }

    fn format_header(&self, out: &mut String, diagnostic: &Diagnostic) {
        let severity = match diagnostic.severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
            Severity::Note => "note".blue().bold(),
        };
        match &diagnostic.code {
            Some(code) => out.push_str(&format!(
                "{}[{}]: {}\n",
                severity,
                code.0.as_str().bold(),
                diagnostic.message.bold()
            )),
            None => out.push_str(&format!("{}: {}\n", severity, diagnostic.message.bold())),
        }
    }

    fn format_footer(&self, out: &mut String, diagnostic: &Diagnostic) {
        let pad = " ".repeat(3);
        for note in &diagnostic.notes {
            out.push_str(&format!("{} {} {}: {}\n", pad, "=".cyan(), "note".cyan().bold(), note));
        }
        if let Some(help) = &diagnostic.help {
            self.format_help(out, help);
        }
    }

    fn format_help(&self, out: &mut String, help: &Help) {
        let pad = " ".repeat(3);
        out.push_str(&format!("{} {} {}: {}\n", pad, "=".cyan(), "help".cyan().bold(), help.message));

        let Some(suggestion) = &help.suggestion else {
            return;
        };
        let (line, col) = self.line_col(suggestion.span.start);
        let Some(text) = self.line_text(line) else {
            return;
        };
        let start = (col - 1).min(text.len());
        let end = (start + suggestion.span.end.saturating_sub(suggestion.span.start)).min(text.len());
        out.push_str(&format!(
            "{:>3} {} {}{}{}\n",
            line.to_string().blue().bold(),
            "|".blue(),
            &text[..start],
            suggestion.replacement.green(),
            &text[end..],
        ));
        out.push_str(&format!(
            "{} {} {}{}\n",
            pad,
            "|".blue(),
            " ".repeat(start),
            "~".repeat(suggestion.replacement.len()).green(),
        ));
    }

    fn collect_annotated_lines<'d>(&self, diagnostic: &'d Diagnostic) -> Vec<AnnotatedLine<'d>> {
        let mut lines: BTreeMap<usize, AnnotatedLine<'d>> = BTreeMap::new();

        for label in &diagnostic.labels {
            if label.span.start > self.source.len() {
                continue;
            }
            let (line_num, col_start) = self.line_col(label.span.start);
            let (end_line, col_end) = self.line_col(label.span.end.min(self.source.len()));
            let text = self.line_text(line_num).unwrap_or("");
            // Multi-line spans underline to the end of the first line.
            let col_end = if end_line == line_num { col_end } else { text.len() + 1 };

            let entry = lines.entry(line_num).or_insert_with(|| AnnotatedLine {
                line_num,
                text: text.to_string(),
                annotations: Vec::new(),
            });
            entry.annotations.push(Annotation {
                col_start,
                col_end: col_end.max(col_start + 1),
                style: label.style,
                message: label.message.as_deref(),
            });
        }

        lines.into_values().collect()
    }

    fn format_annotations(&self, out: &mut String, line: &AnnotatedLine<'_>, gutter: usize) {
        let mut sorted: Vec<&Annotation<'_>> = line.annotations.iter().collect();
        sorted.sort_by_key(|a| (a.style != LabelStyle::Primary, a.col_start));

        let width = sorted.iter().map(|a| a.col_end).max().unwrap_or(1);
        let mut underline = vec![' '; width];
        let mut messages: Vec<(usize, LabelStyle, &str)> = Vec::new();
        for ann in &sorted {
            let ch = match ann.style {
                LabelStyle::Primary => '^',
                LabelStyle::Secondary => '-',
            };
            for slot in underline.iter_mut().take(ann.col_end - 1).skip(ann.col_start - 1) {
                *slot = ch;
            }
            if let Some(msg) = ann.message {
                messages.push((ann.col_start, ann.style, msg));
            }
        }

        let underline: String = underline.into_iter().collect::<String>().trim_end().to_string();
        let prefix = format!("{} {}", " ".repeat(gutter + 1), "|".blue());
        match messages.as_slice() {
            [] => out.push_str(&format!("{} {}\n", prefix, color_underline(&underline))),
            [(_, style, msg)] => out.push_str(&format!(
                "{} {} {}\n",
                prefix,
                color_underline(&underline),
                styled(msg, *style)
            )),
            _ => {
                out.push_str(&format!("{} {}\n", prefix, color_underline(&underline)));
                for (col, style, msg) in messages.iter().rev() {
                    out.push_str(&format!(
                        "{} {}{} {}\n",
                        prefix,
                        " ".repeat(col - 1),
                        styled("|", *style),
                        styled(msg, *style)
                    ));
                }
            }
        }
    }

    fn line_col(&self, offset: usize) -> (usize, usize) {
        let at = self.line_map.locate(offset);
        (at.line, at.column)
    }

    fn line_text(&self, line: usize) -> Option<&'a str> {
        self.line_map.line(line)
    }
}

fn styled(msg: &str, style: LabelStyle) -> String {
    match style {
        LabelStyle::Primary => msg.red().bold().to_string(),
        LabelStyle::Secondary => msg.blue().to_string(),
    }
}

/// Color runs of `^` red and runs of `-` blue.
fn color_underline(s: &str) -> String {
    let mut result = String::new();
    let mut run = String::new();
    let mut current = None;
    for ch in s.chars() {
        let kind = matches!(ch, '^' | '-').then_some(ch);
        if kind != current && !run.is_empty() {
            result.push_str(&flush_run(&run, current));
            run.clear();
        }
        run.push(ch);
        current = kind;
    }
    if !run.is_empty() {
        result.push_str(&flush_run(&run, current));
    }
    result
}

fn flush_run(run: &str, kind: Option<char>) -> String {
    match kind {
        Some('^') => run.red().bold().to_string(),
        Some('-') => run.blue().to_string(),
        _ => run.to_string(),
    }
}
