// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Weft CLI: resolve, lower and replay `await foreach` scenarios.

mod commands;
mod help;
mod logging;
mod output;
mod scenario;

use std::env;
use std::process;

use weft_diagnostics::formatter::DiagnosticFormatter;
use weft_diagnostics::{json, Diagnostic};

use logging::{LogFormat, LogLevel, LogSettings};

/// Diagnostic output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Human,
    Json,
}

/// Print diagnostics in the requested format.
///
/// Human output goes to stderr and is skipped when there is nothing to
/// report. JSON output always prints one report on stdout.
pub fn show_diagnostics(diags: &[Diagnostic], source: &str, path: &str, phase: &str, format: Format) {
    match format {
        Format::Human => {
            if diags.is_empty() {
                return;
            }
            let formatter = DiagnosticFormatter::new(source).with_file_name(path);
            eprintln!("{}", formatter.format_all(diags));
        }
        Format::Json => {
            let report = json::to_json_report(diags, source, path, phase);
            println!("{}", json::to_json_string(&report));
        }
    }
}

struct Args {
    positional: Vec<String>,
    format: Format,
    log: LogSettings,
}

fn parse_args(raw: &[String]) -> Result<Args, String> {
    let mut args = Args { positional: Vec::new(), format: Format::Human, log: LogSettings::default() };
    let mut iter = raw.iter();
    while let Some(arg) = iter.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if arg.starts_with("--") => (flag, Some(value.to_string())),
            _ => (arg.as_str(), None),
        };
        let mut value = |name: &str| {
            inline
                .clone()
                .or_else(|| iter.next().cloned())
                .ok_or_else(|| format!("`{}` needs a value", name))
        };
        match flag {
            "--format" => {
                args.format = match value(flag)?.as_str() {
                    "human" => Format::Human,
                    "json" => Format::Json,
                    other => return Err(format!("unknown format `{}` (expected human or json)", other)),
                }
            }
            "--json" => args.format = Format::Json,
            "--log-format" => {
                let raw = value(flag)?;
                let parsed = LogFormat::parse(&raw).ok_or_else(|| format!("unknown log format `{}`", raw))?;
                args.log.format = Some(parsed);
            }
            "--log-level" => {
                let raw = value(flag)?;
                let parsed = LogLevel::parse(&raw).ok_or_else(|| format!("unknown log level `{}`", raw))?;
                args.log.level = Some(parsed);
            }
            "--help" | "-h" => args.positional.push("help".to_string()),
            "--version" | "-V" => args.positional.push("version".to_string()),
            other if other.starts_with("--") => return Err(format!("unknown option `{}`", other)),
            _ => args.positional.push(arg.clone()),
        }
    }
    Ok(args)
}

fn require<'a>(target: Option<&'a str>, command: &str) -> &'a str {
    match target {
        Some(t) => t,
        None => {
            eprintln!("Usage: weft {} <scenario.json>", command);
            process::exit(1);
        }
    }
}

fn main() {
    output::init();

    let raw: Vec<String> = env::args().skip(1).collect();
    let args = match parse_args(&raw) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{}: {}", output::error_label(), msg);
            process::exit(1);
        }
    };
    logging::init(args.log.merged_with_env());

    let Some(command) = args.positional.first() else {
        help::print_usage();
        return;
    };
    let target = args.positional.get(1).map(String::as_str);
    tracing::debug!(target: "weft", command = %command, "start");

    match command.as_str() {
        "check" => commands::check::cmd_check(require(target, "check"), args.format),
        "lower" => commands::lower::cmd_lower(require(target, "lower"), args.format),
        "run" => commands::run::cmd_run(require(target, "run"), args.format),
        "explain" => commands::explain::cmd_explain(require(target, "explain"), args.format),
        "help" => help::print_usage(),
        "version" => println!("weft {}", env!("CARGO_PKG_VERSION")),
        other => {
            eprintln!("{}: unknown command `{}`", output::error_label(), other);
            help::print_usage();
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, String> {
        parse_args(&args.iter().map(|s| s.to_string()).collect::<Vec<_>>())
    }

    #[test]
    fn flags_take_separate_or_inline_values() {
        let args = parse(&["lower", "s.json", "--format", "json", "--log-level=debug"]).unwrap();
        assert_eq!(args.positional, vec!["lower", "s.json"]);
        assert_eq!(args.format, Format::Json);
        assert_eq!(args.log.level, Some(LogLevel::Debug));
        assert_eq!(args.log.format, None);
    }

    #[test]
    fn bad_flags_are_reported() {
        assert!(parse(&["check", "--format"]).is_err());
        assert!(parse(&["check", "--format", "xml"]).is_err());
        assert!(parse(&["check", "--verbose"]).is_err());
        assert_eq!(parse(&["--help"]).unwrap().positional, vec!["help"]);
    }
}
