/*!
 * Command Line Integration Tests
 */

use cs_bench::cli::{parse_args, run};
use cs_bench::exit_code;
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::ffi::OsString;

fn invoke(list: &[&str]) -> (i32, String, String) {
    let args = std::iter::once("cs-bench")
        .chain(list.iter().copied())
        .map(OsString::from);
    let mut out = Vec::new();
    let mut err = Vec::new();
    let code = run(args, &mut out, &mut err);
    (
        code,
        String::from_utf8(out).unwrap(),
        String::from_utf8(err).unwrap(),
    )
}

#[test]
fn test_out_of_range_method_is_a_configuration_error() {
    let (code, out, err) = invoke(&["-m", "42"]);
    assert_eq!(code, exit_code::CONFIGURATION);
    assert!(out.is_empty());
    assert!(err.contains("42"), "stderr: {err}");
}

#[test]
fn test_missing_method_is_a_configuration_error() {
    let (code, _, err) = invoke(&["-c", "2"]);
    assert_eq!(code, exit_code::CONFIGURATION);
    assert!(!err.is_empty());
}

#[test]
fn test_too_many_threads_rejected() {
    let (code, _, _) = invoke(&["-m4", "-c", "2000"]);
    assert_eq!(code, exit_code::CONFIGURATION);
}

#[test]
fn test_unknown_option_prints_usage() {
    let (code, _, err) = invoke(&["-z"]);
    assert_eq!(code, exit_code::CONFIGURATION);
    assert!(err.contains("Usage:"));
}

#[test]
fn test_help_lists_methods() {
    let (code, out, _) = invoke(&["-h"]);
    assert_eq!(code, exit_code::SUCCESS);
    assert!(out.contains("Methods available:"));
    assert!(out.contains(" 9\t"));
}

#[test]
#[serial]
fn test_verbose_run_prints_balances() {
    let (code, out, _) = invoke(&["-m", "4", "-c", "3", "-t", "1000"]);
    assert_eq!(code, exit_code::SUCCESS);

    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines[0], "The initial balance:      3000");
    assert_eq!(lines[1], "All threads have started transactions.");
    assert_eq!(lines[2], "Threads started: 3");
    assert!(lines[3].starts_with("The time spent on the CPU(s) in milliseconds (real user system): "));
    assert_eq!(lines[4], " 0 thread withdrawn:      1000");
    assert_eq!(lines[6], " 2 thread withdrawn:      1000");
    assert_eq!(lines[7], "The new balance:             0");
    assert_eq!(lines[8], "Total withdrawn:          3000");
    assert_eq!(lines.len(), 9);
}

#[test]
#[serial]
fn test_unsynchronized_run_skips_start_line() {
    let (code, out, _) = invoke(&["--no-sync", "-m", "3", "-c", "2", "-t", "100"]);
    assert_eq!(code, exit_code::SUCCESS);
    assert!(!out.contains("All threads have started transactions."));
    assert!(out.contains("Threads started: 2\n"));
}

#[test]
#[serial]
fn test_quiet_run_prints_only_timing() {
    let (code, out, _) = invoke(&["-q", "-m", "2", "-c", "2", "-t", "500"]);
    assert_eq!(code, exit_code::SUCCESS);
    assert_eq!(out.lines().count(), 1);
}

#[test]
#[serial]
fn test_json_run() {
    let (code, out, _) = invoke(&["--json", "-m", "0", "-c", "2", "-t", "100"]);
    assert_eq!(code, exit_code::SUCCESS);
    let report: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(report["method"], "atomic");
    assert_eq!(report["total_withdrawn"], 200);
}

#[test]
fn test_parse_defaults() {
    let options = parse_args([OsString::from("cs-bench")]).unwrap();
    assert_eq!(options.verbosity, 1);
    assert!(!options.json);
    assert!(!options.show_help);
}
