// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! `weft explain`: describe a diagnostic code, or the resolved pattern of
//! every construct in a scenario.

use std::process;

use serde_json::json;
use weft_diagnostics::codes::ErrorCodeRegistry;
use weft_diagnostics::DiagnosticSink;

use super::{build_model, describe_construct, load_scenario};
use crate::{output, show_diagnostics, Format};

pub fn cmd_explain(target: &str, format: Format) {
    if is_code(target) {
        explain_code(target, format);
    } else {
        explain_scenario(target, format);
    }
}

fn is_code(s: &str) -> bool {
    s.len() == 5 && s.starts_with(['W', 'w']) && s[1..].bytes().all(|b| b.is_ascii_digit())
}

fn explain_code(code: &str, format: Format) {
    let code = code.to_ascii_uppercase();
    let registry = ErrorCodeRegistry::default();
    let Some(info) = registry.get(&code) else {
        eprintln!("{}: unknown diagnostic code `{}`", output::error_label(), code);
        eprintln!("{}: codes range from W0100 to W0605", output::hint_label());
        process::exit(1);
    };
    match format {
        Format::Human => {
            println!("{} {}", output::command(info.code), info.title);
            println!("  category: {}", info.category);
        }
        Format::Json => {
            let value = json!({
                "code": info.code,
                "title": info.title,
                "category": info.category.to_string(),
            });
            println!("{}", value);
        }
    }
}

fn explain_scenario(path: &str, format: Format) {
    let loaded = load_scenario(path);
    let model = build_model(&loaded);
    let mut sink = DiagnosticSink::new();
    sink.report_model(&model);

    match format {
        Format::Human => {
            for stmt in loaded.function.foreach_statements() {
                println!("{}", output::section_header(&describe_construct(stmt)));
                println!("{}", output::separator(40));
                match model.resolution(stmt.id) {
                    Some(r) => match &r.pattern {
                        Some(pattern) => print!("{}", pattern.explain(&loaded.table)),
                        None => {
                            for err in &r.errors {
                                println!("{} {}: {}", output::construct_status(false), err.kind().as_str(), err);
                            }
                        }
                    },
                    None => println!("{} not resolved", output::construct_status(false)),
                }
                println!();
            }
            show_diagnostics(sink.diagnostics(), &loaded.source, path, "explain", format);
        }
        Format::Json => {
            let constructs: Vec<_> = loaded
                .function
                .foreach_statements()
                .into_iter()
                .map(|stmt| {
                    let resolution = model.resolution(stmt.id);
                    json!({
                        "id": stmt.id.0,
                        "construct": describe_construct(stmt),
                        "pattern": resolution
                            .and_then(|r| r.pattern.as_ref())
                            .map(|p| p.explain(&loaded.table).lines().map(str::to_string).collect::<Vec<_>>()),
                        "errors": resolution
                            .map(|r| r.errors.iter().map(|e| e.kind().as_str()).collect::<Vec<_>>())
                            .unwrap_or_default(),
                    })
                })
                .collect();
            println!("{}", json!({ "file": path, "constructs": constructs }));
        }
    }

    if sink.has_errors() {
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_told_apart_from_paths() {
        assert!(is_code("W0300"));
        assert!(is_code("w0100"));
        assert!(!is_code("W03"));
        assert!(!is_code("scenario.json"));
        assert!(!is_code("W0a00"));
    }
}
