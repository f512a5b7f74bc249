// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Colored terminal output for the weft commands.
//!
//! `NO_COLOR` disables color, `FORCE_COLOR` keeps it when piped.

use colored::{ColoredString, Colorize};
use weft_mir::replay::{Completion, HostEvent};

pub fn init() {
    if std::env::var_os("NO_COLOR").is_some() {
        colored::control::set_override(false);
    } else if std::env::var_os("FORCE_COLOR").is_some() {
        colored::control::set_override(true);
    }
}

// ── Labels ─────────────────────────────────────────────────────────────

pub fn error_label() -> ColoredString {
    "error".red().bold()
}

pub fn hint_label() -> ColoredString {
    "hint".cyan()
}

/// `=== Check OK ===`
pub fn banner_ok(phase: &str) -> String {
    banner(format!("{} OK", phase).green().bold())
}

/// `=== Lower FAILED: 2 errors ===`
pub fn banner_fail(phase: &str, errors: usize) -> String {
    let plural = if errors == 1 { "" } else { "s" };
    banner(format!("{} FAILED: {} error{}", phase, errors, plural).red().bold())
}

fn banner(text: ColoredString) -> String {
    format!("{} {} {}", "===".dimmed(), text, "===".dimmed())
}

/// Check mark for a construct that resolved, cross otherwise.
pub fn construct_status(resolved: bool) -> ColoredString {
    if resolved {
        "✓".green()
    } else {
        "✗".red()
    }
}

// ── Help ───────────────────────────────────────────────────────────────

pub fn heading(name: &str, version: &str) -> String {
    format!("{} {}", name.bold(), version.dimmed())
}

pub fn section_header(header: &str) -> ColoredString {
    header.yellow().bold()
}

pub fn command(name: &str) -> ColoredString {
    name.green()
}

pub fn arg(name: &str) -> ColoredString {
    name.cyan()
}

// ── Replay ─────────────────────────────────────────────────────────────

/// Transcript line for one host event. Disposal stands out since that is
/// what most replays are run to see.
pub fn host_event(event: &HostEvent) -> ColoredString {
    let text = event.to_string();
    match event {
        HostEvent::Dispose { .. } => text.yellow().bold(),
        HostEvent::Acquire { .. } | HostEvent::Construct { .. } => text.cyan(),
        HostEvent::Advance | HostEvent::Current { .. } => text.dimmed(),
        HostEvent::Call { .. } => text.normal(),
    }
}

pub fn completion(completion: &Completion) -> String {
    match completion {
        Completion::Returned(Some(value)) => format!("{} {}", "returned".green(), value),
        Completion::Returned(None) => "returned".green().to_string(),
        Completion::Threw(message) => format!("{} {}", "threw:".red().bold(), message),
    }
}

// ── Decorations ────────────────────────────────────────────────────────

pub fn separator(width: usize) -> ColoredString {
    "─".repeat(width).dimmed()
}

pub fn file_path(path: &str) -> ColoredString {
    path.underline()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_banner_counts_errors() {
        colored::control::set_override(false);
        assert_eq!(banner_fail("Check", 1), "=== Check FAILED: 1 error ===");
        assert_eq!(banner_fail("Lower", 3), "=== Lower FAILED: 3 errors ===");
        assert_eq!(completion(&Completion::Threw("boom".into())), "threw: boom");
    }
}
