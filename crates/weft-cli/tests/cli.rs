// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! End-to-end tests for the `weft` binary.
//! Each test runs a command on a JSON fixture and checks exit status and
//! output.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;

fn weft_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    if path.ends_with("deps") {
        path.pop();
    }
    path.push("weft");
    path
}

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join(name)
}

fn weft(args: &[&str]) -> Output {
    Command::new(weft_binary())
        .args(args)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("WEFT_LOG_LEVEL")
        .output()
        .expect("failed to run weft")
}

fn on_fixture(command: &str, name: &str, extra: &[&str]) -> Output {
    let path = fixture(name);
    let mut args = vec![command, path.to_str().unwrap()];
    args.extend_from_slice(extra);
    weft(&args)
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

fn json_stdout(out: &Output) -> Value {
    serde_json::from_slice(&out.stdout)
        .unwrap_or_else(|e| panic!("stdout is not JSON ({}):\n{}", e, stdout(out)))
}

fn codes(report: &Value) -> Vec<String> {
    report["diagnostics"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["code"].as_str().unwrap().to_string())
        .collect()
}

// ── check ──────────────────────────────────────────────────────────────

#[test]
fn conversion_failure_fails_the_check() {
    let out = on_fixture("check", "element_conversion.json", &[]);
    assert_eq!(out.status.code(), Some(1));
    let err = stderr(&out);
    assert!(err.contains("error[W0300]"), "{}", err);
    assert!(err.contains("await foreach (string s in xs)"), "snippet missing:\n{}", err);
    assert!(err.contains("Check FAILED: 1 error"), "{}", err);
}

#[test]
fn json_report_locates_the_construct() {
    let out = on_fixture("check", "element_conversion.json", &["--format", "json"]);
    assert_eq!(out.status.code(), Some(1));
    let report = json_stdout(&out);
    assert_eq!(report["success"], false);
    assert_eq!(report["phase"], "check");
    assert_eq!(codes(&report), vec!["W0300"]);
    let diag = &report["diagnostics"][0];
    assert_eq!(diag["kind"], "ElementConversion");
    assert_eq!(diag["category"], "Conversion");
    assert_eq!(diag["location"]["line"], 2);
    assert_eq!(diag["location"]["column"], 5);
}

#[test]
fn tied_extensions_warn_and_fail() {
    let out = on_fixture("check", "ambiguous_extensions.json", &["--format=json"]);
    assert_eq!(out.status.code(), Some(1));
    let report = json_stdout(&out);
    let found = codes(&report);
    assert!(found.contains(&"W0101".to_string()), "{:?}", found);
    assert!(found.contains(&"W0502".to_string()), "{:?}", found);
    assert_eq!(report["error_count"], 1);
}

#[test]
fn resolvable_scenario_passes() {
    let out = on_fixture("check", "contract_disposal.json", &[]);
    assert!(out.status.success(), "{}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("await foreach (var x in xs)"), "{}", text);
    assert!(text.contains("Check OK"), "{}", text);
}

// ── explain ────────────────────────────────────────────────────────────

#[test]
fn explain_describes_codes() {
    let out = weft(&["explain", "W0300"]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("no element conversion"), "{}", text);
    assert!(text.contains("Conversion"), "{}", text);

    let out = weft(&["explain", "W9999"]);
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn explain_shows_the_chosen_members() {
    let out = on_fixture("explain", "contract_disposal.json", &[]);
    assert!(out.status.success(), "{}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("[contract]"), "{}", text);
    assert!(text.contains("element:    int"), "{}", text);
}

// ── lower ──────────────────────────────────────────────────────────────

#[test]
fn lower_prints_the_state_machine() {
    let out = on_fixture("lower", "contract_disposal.json", &[]);
    assert!(out.status.success(), "{}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("func consume("), "{}", text);
    assert!(text.contains("ensure_push"), "{}", text);
    assert!(text.contains("frame:"), "{}", text);
    assert!(text.contains("Lower OK"), "{}", text);
}

#[test]
fn lower_json_lists_frame_slots() {
    let out = on_fixture("lower", "break_early.json", &["--format", "json"]);
    assert!(out.status.success(), "{}", stderr(&out));
    let value = json_stdout(&out);
    assert_eq!(value["report"]["success"], true);
    let frame = value["frame"].as_array().unwrap();
    assert_eq!(frame[0]["slot"], 0);
    assert!(frame.len() > 1);
    assert!(!value["resume_points"].as_array().unwrap().is_empty());
}

#[test]
fn lower_refuses_unresolved_constructs() {
    let out = on_fixture("lower", "element_conversion.json", &[]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("W0300"));
}

// ── run ────────────────────────────────────────────────────────────────

#[test]
fn only_the_contract_disposal_runs() {
    let out = on_fixture("run", "contract_disposal.json", &[]);
    assert!(out.status.success(), "{}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("log(1)") && text.contains("log(2)"), "{}", text);
    assert_eq!(text.matches("dispose ").count(), 1, "{}", text);
    assert!(text.contains("dispose IAsyncDisposable.DisposeAsync"), "{}", text);
    assert!(text.contains("returned"), "{}", text);
}

#[test]
fn break_disposes_before_leaving() {
    let out = on_fixture("run", "break_early.json", &["--format", "json"]);
    assert!(out.status.success(), "{}", stderr(&out));
    let value = json_stdout(&out);
    let events: Vec<&str> = value["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["event"].as_str().unwrap())
        .collect();
    assert_eq!(events.iter().filter(|e| **e == "advance").count(), 1);
    assert_eq!(events.iter().filter(|e| **e == "dispose").count(), 1);
    assert_eq!(events.last(), Some(&"dispose"));
    assert!(value["completion"].get("returned").is_some(), "{}", value);
}

// ── misc ───────────────────────────────────────────────────────────────

#[test]
fn version_and_usage_errors() {
    let out = weft(&["version"]);
    assert!(out.status.success());
    assert_eq!(stdout(&out).trim(), format!("weft {}", env!("CARGO_PKG_VERSION")));

    let out = weft(&["frobnicate"]);
    assert_eq!(out.status.code(), Some(1));

    let out = weft(&["check"]);
    assert_eq!(out.status.code(), Some(1));

    let out = weft(&["check", "/nonexistent/scenario.json"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("cannot read"));

    let out = weft(&["check", "x.json", "--log-level", "loud"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("unknown log level"));
}
