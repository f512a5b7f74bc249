// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! `weft check`: resolve every construct and report diagnostics.

use weft_diagnostics::DiagnosticSink;
use weft_resolve::SemanticModel;

use super::{build_model, describe_construct, fail, load_scenario};
use crate::scenario::Loaded;
use crate::{output, show_diagnostics, Format};

pub fn cmd_check(path: &str, format: Format) {
    let loaded = load_scenario(path);
    let model = build_model(&loaded);
    let mut sink = DiagnosticSink::new();
    sink.report_model(&model);

    if sink.has_errors() {
        if format == Format::Human {
            print_constructs(&loaded, &model);
        }
        fail(&sink, &loaded, path, "check", format);
    }

    show_diagnostics(sink.diagnostics(), &loaded.source, path, "check", format);
    if format == Format::Human {
        print_constructs(&loaded, &model);
        println!("{}", output::banner_ok("Check"));
    }
    if model.iter().next().is_none() {
        tracing::info!(target: "weft", file = path, "no iteration constructs");
    }
}

fn print_constructs(loaded: &Loaded, model: &SemanticModel) {
    for stmt in loaded.function.foreach_statements() {
        let resolved = model.resolution(stmt.id).is_some_and(|r| r.is_ok());
        println!("  {} {}", output::construct_status(resolved), describe_construct(stmt));
    }
}
