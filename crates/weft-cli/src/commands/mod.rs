// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! CLI command implementations.

pub mod check;
pub mod explain;
pub mod lower;
pub mod run;

use std::path::Path;
use std::process;

use weft_ast::{ExprKind, Stmt};
use weft_diagnostics::DiagnosticSink;
use weft_mir::{lower_function, transform, StateMachine};
use weft_resolve::SemanticModel;

use crate::output;
use crate::scenario::{Loaded, Scenario};
use crate::{show_diagnostics, Format};

/// Read and register a scenario, exiting on failure.
fn load_scenario(path: &str) -> Loaded {
    match Scenario::read(Path::new(path)).and_then(Scenario::load) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("{}: {}", output::error_label(), e);
            process::exit(1);
        }
    }
}

fn build_model(loaded: &Loaded) -> SemanticModel {
    SemanticModel::build(&loaded.table, &loaded.site, &loaded.resolve, &loaded.function)
}

/// Resolve, lower and transform. Diagnostics of every phase that ran end
/// up in `sink`; `None` means one of them reported an error.
fn build_machine(loaded: &Loaded, sink: &mut DiagnosticSink) -> Option<StateMachine> {
    let model = build_model(loaded);
    sink.report_model(&model);
    if model.has_errors() {
        return None;
    }
    match lower_function(&loaded.table, &model, &loaded.function) {
        Ok(lowered) => Some(transform(&lowered, &loaded.lower)),
        Err(e) => {
            sink.report(&e);
            None
        }
    }
}

/// Show the failure and exit. Human output gets a closing banner.
fn fail(sink: &DiagnosticSink, loaded: &Loaded, path: &str, phase: &str, format: Format) -> ! {
    show_diagnostics(sink.diagnostics(), &loaded.source, path, phase, format);
    if format == Format::Human {
        let mut title = phase.to_string();
        title[..1].make_ascii_uppercase();
        eprintln!("\n{}", output::banner_fail(&title, sink.error_count()));
    }
    process::exit(1);
}

/// One-line rendering of a construct header, e.g. `await foreach (var x in xs)`.
fn describe_construct(stmt: &Stmt) -> String {
    let Some(each) = stmt.as_foreach() else {
        return "<statement>".to_string();
    };
    let keyword = if each.is_async { "await foreach" } else { "foreach" };
    let ty = each.binding.ty.as_deref().unwrap_or("var");
    let source = match &each.source.kind {
        ExprKind::Ident(name) => name.clone(),
        ExprKind::Null => "null".to_string(),
        ExprKind::New(ty) => format!("new {}()", ty),
        ExprKind::Cast { ty, .. } => format!("({})…", ty),
        _ => "…".to_string(),
    };
    format!("{} ({} {} in {})", keyword, ty, each.binding.name, source)
}
