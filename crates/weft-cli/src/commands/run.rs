// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! `weft run`: replay the state machine against the scenario script.

use std::process;

use serde_json::json;
use weft_diagnostics::DiagnosticSink;
use weft_mir::replay::{self, ScriptHost};

use super::{build_machine, fail, load_scenario};
use crate::{output, show_diagnostics, Format};

pub fn cmd_run(path: &str, format: Format) {
    let loaded = load_scenario(path);
    let mut sink = DiagnosticSink::new();
    let Some(machine) = build_machine(&loaded, &mut sink) else {
        fail(&sink, &loaded, path, "run", format);
    };
    if format == Format::Human {
        show_diagnostics(sink.diagnostics(), &loaded.source, path, "run", format);
    }

    let mut host = ScriptHost::new(loaded.script.clone());
    let outcome = match replay::run(&machine, &mut host, loaded.args.clone(), loaded.lower.max_replay_steps) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("{}: replay of {} failed: {}", output::error_label(), output::file_path(path), e);
            process::exit(1);
        }
    };

    match format {
        Format::Human => {
            for event in host.events() {
                println!("  {}", output::host_event(event));
            }
            println!("{}", output::separator(40));
            println!("{}", output::completion(&outcome.completion));
            println!("{} suspension(s), {} step(s)", outcome.suspensions.len(), outcome.steps);
        }
        Format::Json => {
            let value = json!({
                "file": path,
                "completion": outcome.completion,
                "suspensions": outcome.suspensions.len(),
                "steps": outcome.steps,
                "events": host.events(),
            });
            println!("{}", serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()));
        }
    }
}
