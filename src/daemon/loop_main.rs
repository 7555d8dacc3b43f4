//! Main monitoring loop: wait for a trigger, run one check cycle, repeat.
//!
//! Architecture: one worker (this loop) plus notification sources that only
//! ever talk to it through the single-slot wake channel and atomic flags:
//! - **Signal forwarder thread**: SIGTERM / SIGUSR1 → flags + wake
//! - **Watcher thread** (owned by notify): directory changes → wake
//!
//! The baseline snapshot, the scanner and the report writer are touched only
//! by the loop, at checkpoints between cycles. A cycle is never interrupted:
//! termination requests are honoured before the next wait or cycle starts.

#![allow(missing_docs)]

use std::time::{Duration, Instant};

use crossbeam_channel::RecvTimeoutError;

use crate::check::diff::diff;
use crate::check::report::{CheckSummary, write_report};
use crate::core::config::MonitorSettings;
use crate::core::errors::{Result, SpyError};
use crate::daemon::signals::SignalHandler;
use crate::daemon::wake::{WakeReason, WakeReceiver, WakeSender, wake_channel};
use crate::daemon::watcher::DirectoryWatcher;
use crate::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, Severity};
use crate::scanner::snapshot::Snapshot;
use crate::scanner::walker::{DirectoryScanner, ScanStats};

/// Log message for a passed check.
pub const CHECK_OK_MESSAGE: &str = "Integrity check: OK";
/// Log message for a failed check.
pub const CHECK_FAIL_MESSAGE: &str = "Integrity check: FAIL";

// ──────────────────── daemon args ────────────────────

/// Process-level options that are not part of the monitor settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DaemonArgs {
    /// Running in the background without a terminal: SIGINT is ignored.
    pub detached: bool,
}

// ──────────────────── loop state ────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Scanning,
    Terminating,
}

/// What started a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Interval,
    DirectoryChanged,
    CheckRequested,
}

impl Trigger {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Interval => "interval",
            Self::DirectoryChanged => "directory_changed",
            Self::CheckRequested => "check_requested",
        }
    }
}

/// Result of one successful cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleOutcome {
    pub summary: CheckSummary,
    pub stats: ScanStats,
}

// ──────────────────── main daemon struct ────────────────────

/// The integrity daemon: owns the baseline and drives check cycles.
pub struct IntegrityDaemon {
    settings: MonitorSettings,
    scanner: DirectoryScanner,
    baseline: Snapshot,
    signals: SignalHandler,
    wake_tx: WakeSender,
    wake_rx: WakeReceiver,
    logger: JsonlWriter,
    state: LoopState,
    cycle: u64,
    start_time: Instant,
    detached: bool,
}

impl IntegrityDaemon {
    /// Build the daemon around an already captured baseline.
    pub fn new(settings: MonitorSettings, baseline: Snapshot, args: DaemonArgs) -> Self {
        let logger = JsonlWriter::open(JsonlConfig::new(&settings.log_path));
        let (wake_tx, wake_rx) = wake_channel();
        Self {
            scanner: DirectoryScanner::new(&settings.dir),
            settings,
            baseline,
            signals: SignalHandler::new(),
            wake_tx,
            wake_rx,
            logger,
            state: LoopState::Idle,
            cycle: 0,
            start_time: Instant::now(),
            detached: args.detached,
        }
    }

    pub fn signal_handler(&self) -> &SignalHandler {
        &self.signals
    }

    /// Extra sender for in-process notification sources.
    pub fn wake_sender(&self) -> WakeSender {
        self.wake_tx.clone()
    }

    pub fn baseline(&self) -> &Snapshot {
        &self.baseline
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Cycles started since construction.
    pub fn cycles(&self) -> u64 {
        self.cycle
    }

    /// Install signal hooks and the watcher, then loop until terminated.
    ///
    /// Returns `Err` only for daemon-fatal failures; a failed cycle is logged
    /// and the loop keeps going.
    pub fn run(&mut self) -> Result<()> {
        #[cfg(unix)]
        let forwarder = match self.signals.install(self.wake_tx.clone(), self.detached) {
            Ok(f) => f,
            Err(e) => return Err(self.fatal(e)),
        };

        let watcher = if self.settings.watch {
            match DirectoryWatcher::start(&self.settings.dir, self.wake_tx.clone()) {
                Ok(w) => Some(w),
                Err(e) => return Err(self.fatal(e)),
            }
        } else {
            None
        };

        // Logged once every wake source is live.
        self.log_start();

        let outcome = loop {
            match self.step() {
                Ok(Some(_)) => {}
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            }
        };

        drop(watcher);
        #[cfg(unix)]
        drop(forwarder);

        match outcome {
            Ok(()) => {
                self.shutdown("clean shutdown");
                Ok(())
            }
            Err(e) => Err(self.fatal(e)),
        }
    }

    /// Wait for one trigger and run one cycle.
    ///
    /// `Ok(None)` means termination was requested and no cycle was started.
    pub fn step(&mut self) -> Result<Option<Trigger>> {
        self.state = LoopState::Idle;
        let Some(trigger) = self.next_trigger()? else {
            self.state = LoopState::Terminating;
            return Ok(None);
        };

        // Whatever else is pending is covered by the cycle about to start.
        self.wake_rx.drain();
        self.signals.take_check_request();

        self.state = LoopState::Scanning;
        self.cycle += 1;
        let started = Instant::now();
        match self.run_cycle() {
            Ok(outcome) => self.log_cycle(trigger, &outcome, started.elapsed()),
            Err(e) if e.is_cycle_fatal() => self.log_cycle_failure(trigger, &e),
            Err(e) => return Err(e),
        }

        self.state = if self.signals.should_shutdown() {
            LoopState::Terminating
        } else {
            LoopState::Idle
        };
        Ok(Some(trigger))
    }

    /// Scan, diff against the baseline, write the report, and adopt the
    /// fresh snapshot as the new baseline. Any error leaves the baseline
    /// and the previous report untouched.
    pub fn run_cycle(&mut self) -> Result<CycleOutcome> {
        let (current, stats) = self.scanner.scan_with_stats()?;
        let next_baseline = current.clone();
        let summary = write_report(
            &self.settings.report_path,
            diff(self.baseline.clone(), current),
        )?;
        self.baseline = next_baseline;
        Ok(CycleOutcome { summary, stats })
    }

    fn next_trigger(&self) -> Result<Option<Trigger>> {
        if self.signals.should_shutdown() {
            return Ok(None);
        }
        if self.signals.take_check_request() {
            return Ok(Some(Trigger::CheckRequested));
        }

        let deadline = Instant::now() + self.settings.interval;
        let trigger = loop {
            let timeout = deadline.saturating_duration_since(Instant::now());
            match self.wake_rx.recv_timeout(timeout) {
                Ok(WakeReason::DirectoryChanged) => break Trigger::DirectoryChanged,
                // The check flag is the request; this wake only ends the wait.
                // With the flag already consumed by an earlier cycle it is stale.
                Ok(WakeReason::CheckRequested) => {
                    if self.signals.take_check_request() {
                        break Trigger::CheckRequested;
                    }
                }
                Ok(WakeReason::Shutdown) => {
                    self.signals.request_shutdown();
                    return Ok(None);
                }
                Err(RecvTimeoutError::Timeout) => break Trigger::Interval,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(SpyError::ChannelClosed { component: "wake" });
                }
            }
        };

        // A termination request that raced the wake wins.
        if self.signals.should_shutdown() {
            return Ok(None);
        }
        Ok(Some(trigger))
    }

    // ──────────────────── logging ────────────────────

    fn log_start(&mut self) {
        let dir = self.settings.dir.display().to_string();
        let report = self.settings.report_path.display().to_string();
        eprintln!(
            "[ISPY-DAEMON] monitoring {dir} every {}s (report={report})",
            self.settings.interval.as_secs()
        );

        let mut entry = LogEntry::new(EventType::DaemonStart, Severity::Info)
            .with_message(format!("integrityspy {}", env!("CARGO_PKG_VERSION")));
        entry.dir = Some(dir);
        entry.report = Some(report);
        entry.pid = Some(std::process::id());
        self.logger.write_entry(&entry);

        let mut baseline = LogEntry::new(EventType::BaselineCaptured, Severity::Info);
        baseline.files = Some(self.baseline.len());
        self.logger.write_entry(&baseline);
    }

    fn log_cycle(&mut self, trigger: Trigger, outcome: &CycleOutcome, elapsed: Duration) {
        let summary = outcome.summary;
        let (severity, message) = if summary.passed() {
            (Severity::Info, CHECK_OK_MESSAGE)
        } else {
            (Severity::Warning, CHECK_FAIL_MESSAGE)
        };
        eprintln!(
            "[ISPY-DAEMON] cycle {} ({}): {message} (ok={} fail={} absent={} new={})",
            self.cycle,
            trigger.as_str(),
            summary.unchanged,
            summary.failed,
            summary.absent,
            summary.new
        );

        let mut entry = LogEntry::new(EventType::CheckComplete, severity).with_message(message);
        entry.cycle = Some(self.cycle);
        entry.trigger = Some(trigger.as_str().to_string());
        let stats = outcome.stats;
        entry.files = Some(stats.hashed);
        entry.eligible = Some(stats.eligible);
        entry.vanished = Some(stats.vanished);
        entry.unreadable = Some(stats.unreadable);
        entry.unchanged = Some(summary.unchanged);
        entry.failed = Some(summary.failed);
        entry.absent = Some(summary.absent);
        entry.new = Some(summary.new);
        entry.duration_ms = Some(millis(elapsed));
        entry.scan_ms = Some(millis(stats.duration));
        self.logger.write_entry(&entry);
    }

    fn log_cycle_failure(&mut self, trigger: Trigger, err: &SpyError) {
        eprintln!(
            "[ISPY-DAEMON] cycle {} ({}) aborted: {err}",
            self.cycle,
            trigger.as_str()
        );
        let mut entry = LogEntry::new(EventType::CheckFailed, Severity::Error)
            .with_message("check cycle aborted; baseline kept")
            .with_error(err);
        entry.cycle = Some(self.cycle);
        entry.trigger = Some(trigger.as_str().to_string());
        self.logger.write_entry(&entry);
    }

    /// Log a daemon-fatal error and hand it back for propagation.
    fn fatal(&mut self, err: SpyError) -> SpyError {
        eprintln!("[ISPY-DAEMON] fatal: {err}");
        let entry = LogEntry::new(EventType::Error, Severity::Error).with_error(&err);
        self.logger.write_entry(&entry);
        self.shutdown("fatal error");
        err
    }

    fn shutdown(&mut self, reason: &str) {
        self.state = LoopState::Terminating;
        let uptime = self.start_time.elapsed();
        let mut entry = LogEntry::new(EventType::DaemonStop, Severity::Info).with_message(reason);
        entry.cycle = Some(self.cycle);
        entry.duration_ms = Some(millis(uptime));
        self.logger.write_entry(&entry);
        eprintln!(
            "[ISPY-DAEMON] shutdown complete ({reason}, cycles={}, uptime={}s)",
            self.cycle,
            uptime.as_secs()
        );
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ──────────────────── tests ────────────────────
