// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! `weft lower`: print the state machine MIR and its frame layout.

use serde_json::json;
use weft_diagnostics::json::to_json_report;
use weft_diagnostics::DiagnosticSink;
use weft_mir::StateMachine;

use super::{build_machine, fail, load_scenario};
use crate::{output, show_diagnostics, Format};

pub fn cmd_lower(path: &str, format: Format) {
    let loaded = load_scenario(path);
    let mut sink = DiagnosticSink::new();
    let Some(machine) = build_machine(&loaded, &mut sink) else {
        fail(&sink, &loaded, path, "lower", format);
    };

    match format {
        Format::Human => {
            show_diagnostics(sink.diagnostics(), &loaded.source, path, "lower", format);
            println!("{}", machine.function);
            println!();
            print_frame(&machine);
            println!();
            println!("{}", output::banner_ok("Lower"));
        }
        Format::Json => {
            let report = to_json_report(sink.diagnostics(), &loaded.source, path, "lower");
            let frame: Vec<_> = machine
                .frame
                .slots
                .iter()
                .map(|s| {
                    json!({
                        "slot": s.slot,
                        "name": s.name,
                        "ty": s.ty.to_string(),
                        "role": s.role.map(|r| format!("{:?}", r)),
                    })
                })
                .collect();
            let resume: Vec<_> = machine
                .resume_points
                .iter()
                .map(|(point, tag, block)| json!({ "point": point.0, "tag": tag, "block": block.0 }))
                .collect();
            let value = json!({
                "report": report,
                "mir": machine.function.to_string(),
                "frame": frame,
                "resume_points": resume,
            });
            println!("{}", serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()));
        }
    }
}

fn print_frame(machine: &StateMachine) {
    println!("{}", output::section_header("frame:"));
    for slot in &machine.frame.slots {
        let role = slot.role.map(|r| format!("  [{:?}]", r)).unwrap_or_default();
        println!("  [{}] {}: {}{}", slot.slot, slot.name, slot.ty, role);
    }
    println!("{}", output::section_header("resume points:"));
    for (point, tag, block) in &machine.resume_points {
        println!("  suspend#{} state {} -> bb{}", point.0, tag, block.0);
    }
}
