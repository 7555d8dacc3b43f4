//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use integrityspy::prelude::*;
//! ```

// Core
pub use crate::core::config::{Config, MonitorSettings, Overrides};
pub use crate::core::errors::{Result, SpyError};

// Scanner
pub use crate::scanner::checksum::{checksum_bytes, checksum_reader, format_checksum};
pub use crate::scanner::snapshot::{Snapshot, SnapshotEntry, display_name};
pub use crate::scanner::walker::{DirectoryScanner, ScanStats, scan_directory};

// Check
pub use crate::check::diff::{CheckResult, CheckStatus, diff};
pub use crate::check::report::{CheckSummary, ReportWriter, write_report};

// Daemon
#[cfg(feature = "daemon")]
pub use crate::daemon::loop_main::{DaemonArgs, IntegrityDaemon};
pub use crate::daemon::wake::{WakeReason, wake_channel};

// Logger
pub use crate::logger::jsonl::{JsonlConfig, JsonlWriter};
