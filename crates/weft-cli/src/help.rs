// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Help text for CLI commands.

use crate::output;

pub fn print_usage() {
    println!(
        "{} - await foreach resolution and state machine lowering",
        output::heading("Weft", env!("CARGO_PKG_VERSION"))
    );
    println!();
    println!(
        "{}: {} {} {} {}",
        output::section_header("Usage"),
        output::command("weft"),
        output::arg("<command>"),
        output::arg("<scenario.json>"),
        output::arg("[options]")
    );
    println!();
    println!("{}", output::section_header("Commands:"));
    println!("  {} {}    Resolve every construct and report diagnostics", output::command("check"), output::arg("<file>"));
    println!("  {} {}  Show the resolved pattern of every construct", output::command("explain"), output::arg("<file>"));
    println!("  {} {}  Explain a diagnostic code", output::command("explain"), output::arg("<code>"));
    println!("  {} {}    Lower to a state machine and print its MIR", output::command("lower"), output::arg("<file>"));
    println!("  {} {}      Replay the state machine against the scenario script", output::command("run"), output::arg("<file>"));
    println!("  {}             Show this help", output::command("help"));
    println!("  {}          Show version", output::command("version"));

    println!();
    println!("{}", output::section_header("Options:"));
    println!("  {} {}    Diagnostic output (default: human)", output::arg("--format"), output::arg("human|json"));
    println!("  {} {}  Log output on stderr (default: auto)", output::arg("--log-format"), output::arg("auto|text|json"));
    println!("  {} {}        Log verbosity (default: warn)", output::arg("--log-level"), output::arg("<level>"));

    println!();
    println!("{}", output::section_header("Environment:"));
    println!("  {}  Default for --log-format", output::arg("WEFT_LOG_FORMAT"));
    println!("  {}   Default for --log-level", output::arg("WEFT_LOG_LEVEL"));
    println!("  {}         Filter directives; override --log-level", output::arg("RUST_LOG"));
}
