//! Integration tests: CLI argument handling, one-shot scan, and the detached
//! daemon reacting to signals and directory changes.

mod common;

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde_json::Value;

const WAIT: Duration = Duration::from_secs(10);

fn count_events(log: &Path, event: &str) -> usize {
    common::log_events(log)
        .iter()
        .filter(|e| e["event"] == event)
        .count()
}

fn wait_for_events(log: &Path, event: &str, at_least: usize) -> bool {
    common::wait_for(WAIT, || (count_events(log, event) >= at_least).then_some(())).is_some()
}

fn statuses(report: &[Value]) -> Vec<(String, String)> {
    report
        .iter()
        .map(|r| {
            (
                r["path"].as_str().unwrap_or_default().to_string(),
                r["status"].as_str().unwrap_or_default().to_string(),
            )
        })
        .collect()
}

#[test]
fn help_command_prints_usage() {
    let result = common::run_cli_case("help_command_prints_usage", &["--help"]);
    assert!(
        result.status.success(),
        "expected success; log: {}",
        result.log_path.display()
    );
    assert!(
        result.stdout.contains("Usage: integrityspy"),
        "missing help banner; log: {}",
        result.log_path.display()
    );
}

#[test]
fn version_command_prints_version() {
    let result = common::run_cli_case("version_command_prints_version", &["--version"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(result.stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn missing_dir_is_reported() {
    let tmp = tempfile::tempdir().unwrap();
    let result =
        common::run_cli_case_in("missing_dir_is_reported", tmp.path(), &["-n", "5"], &[]);
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("dir argument is required"));
}

#[test]
fn missing_interval_is_reported() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().to_str().unwrap();
    let result =
        common::run_cli_case_in("missing_interval_is_reported", tmp.path(), &["-d", dir], &[]);
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("interval argument is required"));
}

#[test]
fn invalid_interval_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().to_str().unwrap();

    let from_flag = common::run_cli_case_in(
        "invalid_interval_flag",
        tmp.path(),
        &["-d", dir, "-n", "0"],
        &[],
    );
    assert!(!from_flag.status.success());
    assert!(from_flag.stderr.contains("invalid interval argument"));

    let from_env = common::run_cli_case_in(
        "invalid_interval_env",
        tmp.path(),
        &["-d", dir],
        &[("interval", "soon")],
    );
    assert_eq!(from_env.status.code(), Some(1), "log: {}", from_env.log_path.display());
    assert!(from_env.stderr.contains("invalid interval argument"));
}

#[test]
fn command_line_values_shadow_malformed_env() {
    let tmp = tempfile::tempdir().unwrap();
    let missing = tmp.path().join("absent");
    let result = common::run_cli_case_in(
        "command_line_values_shadow_malformed_env",
        tmp.path(),
        &["-d", missing.to_str().unwrap(), "-n", "10", "--no-watch"],
        &[("interval", "abc"), ("INTEGRITYSPY_WATCH", "maybe")],
    );
    // Configuration is accepted; startup then fails on the directory itself.
    assert_eq!(result.status.code(), Some(2), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("failed to open directory"));
    assert!(!result.stderr.contains("invalid interval argument"));
}

#[test]
fn unreadable_directory_fails_startup() {
    let tmp = tempfile::tempdir().unwrap();
    let missing = tmp.path().join("absent");
    let result = common::run_cli_case_in(
        "unreadable_directory_fails_startup",
        tmp.path(),
        &["-d", missing.to_str().unwrap(), "-n", "5"],
        &[],
    );
    assert_eq!(result.status.code(), Some(2), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("failed to open directory"));
    assert!(!result.stdout.contains("Integrity spy is started"));
    assert!(!tmp.path().join(".integrityspy-report.json").exists());
}

#[test]
fn scan_subcommand_lists_checksums_as_json() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("b.txt"), "world").unwrap();
    fs::write(tmp.path().join("a.txt"), "hello").unwrap();
    fs::write(tmp.path().join(".hidden"), "secret").unwrap();
    fs::create_dir(tmp.path().join("sub")).unwrap();

    let result = common::run_cli_case(
        "scan_subcommand_lists_checksums_as_json",
        &["scan", "--dir", tmp.path().to_str().unwrap(), "--json"],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());

    let rows: Value = serde_json::from_str(&result.stdout).unwrap();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["path"], "a.txt");
    assert_eq!(rows[0]["crc32"], "3610A686");
    assert_eq!(rows[1]["path"], "b.txt");
}

#[test]
fn scan_subcommand_human_output() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("a.txt"), "hello").unwrap();
    let result = common::run_cli_case(
        "scan_subcommand_human_output",
        &["scan", "-d", tmp.path().to_str().unwrap()],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(result.stdout.contains("3610A686  a.txt"));
}

#[cfg(unix)]
#[test]
fn detached_daemon_checks_on_request_and_stops_on_sigterm() {
    use nix::sys::signal::Signal;

    let tmp = tempfile::tempdir().unwrap();
    let watched = tmp.path().join("watched");
    fs::create_dir(&watched).unwrap();
    fs::write(watched.join("a.txt"), "hello").unwrap();
    let log = tmp.path().join("activity.jsonl");
    let report = tmp.path().join(".integrityspy-report.json");

    // Legacy environment variables carry dir and interval.
    let result = common::run_cli_case_in(
        "detached_daemon_checks_on_request",
        tmp.path(),
        &["--no-watch", "--log", log.to_str().unwrap()],
        &[("dir", watched.to_str().unwrap()), ("interval", "3600")],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let pid = common::started_pid(&result.stdout).expect("pid in startup message");
    let daemon = common::DaemonGuard { pid };
    assert!(wait_for_events(&log, "daemon_start", 1), "daemon never started");

    // Ignored while detached.
    daemon.signal(Signal::SIGHUP);
    daemon.signal(Signal::SIGINT);

    daemon.signal(Signal::SIGUSR1);
    assert!(wait_for_events(&log, "check_complete", 1));
    let first = common::read_report(&report).expect("report written to working directory");
    assert_eq!(statuses(&first), [("a.txt".to_string(), "OK".to_string())]);

    fs::write(watched.join("a.txt"), "world").unwrap();
    fs::write(watched.join("b.txt"), "new").unwrap();
    daemon.signal(Signal::SIGUSR1);
    assert!(wait_for_events(&log, "check_complete", 2));
    let second = common::read_report(&report).unwrap();
    assert_eq!(
        statuses(&second),
        [
            ("a.txt".to_string(), "FAIL".to_string()),
            ("b.txt".to_string(), "NEW".to_string()),
        ]
    );
    assert_eq!(second[0]["etalon_crc32"], "3610A686");
    assert_ne!(second[0]["result_crc32"], second[0]["etalon_crc32"]);

    let checks: Vec<Value> = common::log_events(&log)
        .into_iter()
        .filter(|e| e["event"] == "check_complete")
        .collect();
    assert_eq!(checks[0]["message"], "Integrity check: OK");
    assert_eq!(checks[1]["message"], "Integrity check: FAIL");
    assert_eq!(checks[1]["severity"], "warning");

    daemon.signal(Signal::SIGTERM);
    assert!(wait_for_events(&log, "daemon_stop", 1), "daemon did not stop");
    assert_eq!(count_events(&log, "check_complete"), 2);
}

#[cfg(unix)]
#[test]
fn directory_change_wakes_daemon_and_stop_subcommand_ends_it() {
    let tmp = tempfile::tempdir().unwrap();
    let watched = tmp.path().join("watched");
    fs::create_dir(&watched).unwrap();
    fs::write(watched.join("a.txt"), "hello").unwrap();
    let log = tmp.path().join("activity.jsonl");
    let report = tmp.path().join("report.json");

    let result = common::run_cli_case_in(
        "directory_change_wakes_daemon",
        tmp.path(),
        &[
            "--dir",
            watched.to_str().unwrap(),
            "--interval",
            "3600",
            "--report",
            report.to_str().unwrap(),
            "--log",
            log.to_str().unwrap(),
        ],
        &[],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let pid = common::started_pid(&result.stdout).expect("pid in startup message");
    let _daemon = common::DaemonGuard { pid };
    assert!(wait_for_events(&log, "daemon_start", 1), "daemon never started");

    fs::remove_file(watched.join("a.txt")).unwrap();
    let absent = common::wait_for(WAIT, || {
        common::read_report(&report)
            .filter(|r| statuses(r).contains(&("a.txt".to_string(), "ABSENT".to_string())))
    });
    assert!(absent.is_some(), "removal did not trigger a check");

    let stop = common::run_cli_case("stop_subcommand", &["stop", "--pid", &pid.to_string()]);
    assert!(stop.status.success(), "log: {}", stop.log_path.display());
    assert!(wait_for_events(&log, "daemon_stop", 1), "daemon did not stop");
}
