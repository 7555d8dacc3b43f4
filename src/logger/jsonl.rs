//! JSONL operational log: append-only line-delimited JSON, one object per event.
//!
//! Each line is a self-contained JSON object, assembled in memory and written
//! with a single `write_all` so a tailing reader never sees half a line.
//!
//! Degradation chain:
//! 1. Log file path
//! 2. stderr with `[ISPY-JSONL]` prefix
//! 3. Silent discard (the daemon must never stop because logging failed)

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions, rename};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SpyError};

/// Severity level for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Log event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    DaemonStart,
    DaemonStop,
    BaselineCaptured,
    CheckComplete,
    CheckFailed,
    Error,
}

/// A single JSONL log entry. Only `ts`, `event` and `severity` are always present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// ISO 8601 UTC timestamp.
    pub ts: String,
    pub event: EventType,
    pub severity: Severity,
    /// Human-readable summary, e.g. `Integrity check: OK`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Monitored directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,
    /// Cycle sequence number since daemon start.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle: Option<u64>,
    /// What woke the daemon for this cycle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
    /// Files checksummed by the scan.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<usize>,
    /// Regular, non-hidden entries listed by the scan.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eligible: Option<usize>,
    /// Entries that disappeared before they could be opened.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vanished: Option<usize>,
    /// Entries skipped because a read failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unreadable: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unchanged: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub absent: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Time spent in the scan alone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
}

impl LogEntry {
    /// Create a new entry stamped with the current UTC time.
    pub fn new(event: EventType, severity: Severity) -> Self {
        Self {
            ts: format_utc_now(),
            event,
            severity,
            message: None,
            dir: None,
            report: None,
            cycle: None,
            trigger: None,
            files: None,
            eligible: None,
            vanished: None,
            unreadable: None,
            unchanged: None,
            failed: None,
            absent: None,
            new: None,
            duration_ms: None,
            scan_ms: None,
            error_code: None,
            error_message: None,
            pid: None,
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attach an error's code and display text.
    #[must_use]
    pub fn with_error(mut self, err: &SpyError) -> Self {
        self.error_code = Some(err.code().to_string());
        self.error_message = Some(err.to_string());
        self
    }
}

/// Degradation state of the JSONL writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Normal,
    Stderr,
    Discard,
}

/// Configuration for the JSONL writer.
#[derive(Debug, Clone)]
pub struct JsonlConfig {
    pub path: PathBuf,
    /// Maximum file size before rotation (bytes). Default: 10 MiB.
    pub max_size_bytes: u64,
    /// Number of rotated files to keep. Default: 3.
    pub max_rotated_files: u32,
}

impl JsonlConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_size_bytes: 10 * 1024 * 1024,
            max_rotated_files: 3,
        }
    }
}

/// Append-only JSONL log writer with rotation and stderr fallback.
pub struct JsonlWriter {
    config: JsonlConfig,
    writer: Option<BufWriter<File>>,
    state: WriterState,
    bytes_written: u64,
}

impl JsonlWriter {
    /// Open the JSONL log file, falling back to stderr when it cannot be opened.
    pub fn open(config: JsonlConfig) -> Self {
        let mut w = Self {
            config,
            writer: None,
            state: WriterState::Discard,
            bytes_written: 0,
        };
        match open_append(&w.config.path) {
            Ok((file, size)) => {
                w.writer = Some(BufWriter::new(file));
                w.state = WriterState::Normal;
                w.bytes_written = size;
            }
            Err(e) => {
                let _ = writeln!(io::stderr(), "[ISPY-JSONL] {e}; logging to stderr");
                w.state = WriterState::Stderr;
            }
        }
        w
    }

    /// Write a single log entry as one JSONL line and flush it.
    pub fn write_entry(&mut self, entry: &LogEntry) {
        let line = match serde_json::to_string(entry) {
            Ok(json) => format!("{json}\n"),
            Err(e) => {
                let _ = writeln!(io::stderr(), "[ISPY-JSONL] serialize error: {e}");
                return;
            }
        };
        self.write_line(&line);
    }

    /// Current degradation state.
    pub fn state(&self) -> &str {
        match self.state {
            WriterState::Normal => "normal",
            WriterState::Stderr => "stderr",
            WriterState::Discard => "discard",
        }
    }

    // ──────────────────────── internals ────────────────────────

    fn write_line(&mut self, line: &str) {
        if self.state == WriterState::Normal
            && self.bytes_written + line.len() as u64 > self.config.max_size_bytes
        {
            self.rotate();
        }

        match self.state {
            WriterState::Normal => {
                let written = self
                    .writer
                    .as_mut()
                    .is_some_and(|w| w.write_all(line.as_bytes()).and_then(|()| w.flush()).is_ok());
                if written {
                    self.bytes_written += line.len() as u64;
                } else {
                    self.degrade();
                    self.write_line(line);
                }
            }
            WriterState::Stderr => {
                if write!(io::stderr(), "[ISPY-JSONL] {line}").is_err() {
                    self.degrade();
                }
            }
            WriterState::Discard => {}
        }
    }

    fn degrade(&mut self) {
        self.writer = None;
        self.state = match self.state {
            WriterState::Normal => {
                let _ = writeln!(io::stderr(), "[ISPY-JSONL] log write failed, using stderr");
                WriterState::Stderr
            }
            WriterState::Stderr | WriterState::Discard => WriterState::Discard,
        };
    }

    fn rotate(&mut self) {
        if let Some(w) = self.writer.as_mut() {
            let _ = w.flush();
        }
        self.writer = None;

        let base = self.config.path.clone();
        // Shift existing rotations: .2→.3, .1→.2, current→.1
        for i in (1..self.config.max_rotated_files).rev() {
            let _ = rename(rotated_name(&base, i), rotated_name(&base, i + 1));
        }
        let _ = rename(&base, rotated_name(&base, 1));

        match open_append(&base) {
            Ok((file, _)) => {
                self.writer = Some(BufWriter::new(file));
                self.bytes_written = 0;
            }
            Err(_) => self.degrade(),
        }
    }
}

// ──────────────────────── helpers ────────────────────────

/// Open or create a file for appending. Returns `(File, current_size)`.
fn open_append(path: &Path) -> Result<(File, u64)> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| SpyError::io(parent, source))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| SpyError::io(path, source))?;
    let size = file.metadata().map(|m| m.len()).unwrap_or(0);
    Ok((file, size))
}

/// Build a rotated filename: `foo.jsonl` → `foo.jsonl.3`.
fn rotated_name(base: &Path, index: u32) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

/// Format current UTC time as ISO 8601.
fn format_utc_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

// ──────────────────────── tests ────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config(path: PathBuf, max_size_bytes: u64) -> JsonlConfig {
        JsonlConfig {
            path,
            max_size_bytes,
            max_rotated_files: 2,
        }
    }

    #[test]
    fn write_entry_produces_valid_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activity.jsonl");
        let mut writer = JsonlWriter::open(JsonlConfig::new(&path));

        writer.write_entry(
            &LogEntry::new(EventType::CheckComplete, Severity::Warning)
                .with_message("Integrity check: FAIL"),
        );

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 1);
        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["event"], "check_complete");
        assert_eq!(parsed["severity"], "warning");
        assert_eq!(parsed["message"], "Integrity check: FAIL");
    }

    #[test]
    fn entries_are_visible_without_explicit_flush() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jsonl");
        let mut writer = JsonlWriter::open(JsonlConfig::new(&path));
        for _ in 0..3 {
            writer.write_entry(&LogEntry::new(EventType::CheckComplete, Severity::Info));
        }
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 3);
    }

    #[test]
    fn missing_parent_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("log").join("a.jsonl");
        let writer = JsonlWriter::open(JsonlConfig::new(&path));
        assert_eq!(writer.state(), "normal");
        assert!(path.exists());
    }

    #[test]
    fn rotation_shifts_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rot.jsonl");
        let mut writer = JsonlWriter::open(small_config(path.clone(), 100));
        for _ in 0..10 {
            writer.write_entry(&LogEntry::new(EventType::CheckComplete, Severity::Info));
        }
        assert!(path.exists());
        assert!(rotated_name(&path, 1).exists());
        assert!(!rotated_name(&path, 3).exists());
    }

    #[test]
    fn unopenable_path_falls_back_to_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        // A regular file cannot be used as a parent directory.
        let writer = JsonlWriter::open(JsonlConfig::new(blocker.join("a.jsonl")));
        assert_eq!(writer.state(), "stderr");
    }

    #[test]
    fn error_fields_carry_code() {
        let err = SpyError::ChannelClosed { component: "wake" };
        let entry = LogEntry::new(EventType::Error, Severity::Error).with_error(&err);
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"error_code\":\"ISPY-3003\""));
        assert!(json.contains("\"severity\":\"error\""));
    }

    #[test]
    fn entry_optional_fields_omitted_when_none() {
        let entry = LogEntry::new(EventType::DaemonStart, Severity::Info);
        let line = serde_json::to_string(&entry).unwrap();
        assert!(!line.contains("\"dir\""));
        assert!(!line.contains("\"cycle\""));
        assert!(!line.contains("\"error_code\""));
    }
}
