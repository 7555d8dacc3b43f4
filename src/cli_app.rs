//! Top-level CLI definition and dispatch.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use serde::Serialize;
use thiserror::Error;

use integrityspy::core::config::{Config, MonitorSettings, Overrides, parse_interval};
use integrityspy::core::errors::SpyError;
use integrityspy::daemon::launcher::{read_baseline, spawn_detached};
use integrityspy::daemon::loop_main::{DaemonArgs, IntegrityDaemon};
use integrityspy::scanner::checksum::format_checksum;
use integrityspy::scanner::snapshot::{Snapshot, display_name};
use integrityspy::scanner::walker::scan_directory;

/// integrityspy: watches a directory and reports files whose contents changed.
#[derive(Debug, Parser)]
#[command(
    name = "integrityspy",
    author,
    version,
    about = "Lightweight file integrity monitor",
    long_about = None,
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(flatten)]
    start: StartArgs,
    /// Subcommand to execute; without one the monitor is started.
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Scan a directory once and print its checksums.
    Scan(ScanArgs),
    /// Ask a running monitor to check immediately.
    Check(PidArgs),
    /// Stop a running monitor.
    Stop(PidArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args, Default)]
struct StartArgs {
    /// Override config file path.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Directory to monitor.
    #[arg(short = 'd', long, value_name = "DIR")]
    dir: Option<PathBuf>,
    /// Seconds between scheduled checks.
    #[arg(short = 'n', long, value_name = "SECS", value_parser = parse_interval_arg)]
    interval: Option<u64>,
    /// Report file path.
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,
    /// Operational log (JSONL) path.
    #[arg(long, value_name = "PATH")]
    log: Option<PathBuf>,
    /// Rely on the interval and signals only; no change notifications.
    #[arg(long)]
    no_watch: bool,
    /// Run the monitor in this process instead of detaching.
    #[arg(long)]
    foreground: bool,
    /// Read the baseline snapshot from stdin (set by the launcher).
    #[arg(long, hide = true, requires = "foreground")]
    baseline_stdin: bool,
}

impl StartArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            dir: self.dir.clone(),
            interval_secs: self.interval,
            report: self.report.clone(),
            log: self.log.clone(),
            no_watch: self.no_watch,
        }
    }
}

#[derive(Debug, Clone, Args)]
struct ScanArgs {
    /// Directory to scan.
    #[arg(short = 'd', long, value_name = "DIR")]
    dir: PathBuf,
    /// Emit JSON instead of a table.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Args)]
struct PidArgs {
    /// Process id of the running monitor.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pid: u32,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input or configuration.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Json(_) => 3,
        }
    }
}

impl From<SpyError> for CliError {
    fn from(err: SpyError) -> Self {
        match err {
            SpyError::InvalidConfig { .. }
            | SpyError::MissingConfig { .. }
            | SpyError::ConfigParse { .. } => Self::User(err.to_string()),
            _ => Self::Runtime(err.to_string()),
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    match &cli.command {
        None => run_start(&cli.start),
        Some(Command::Scan(args)) => run_scan(args),
        Some(Command::Check(args)) => signal_daemon(args.pid, DaemonSignal::Check),
        Some(Command::Stop(args)) => signal_daemon(args.pid, DaemonSignal::Stop),
        Some(Command::Completions(args)) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

fn parse_interval_arg(raw: &str) -> Result<u64, String> {
    parse_interval(raw).map_err(|_| "invalid interval argument".to_string())
}

// ──────────────────── start ────────────────────

fn run_start(args: &StartArgs) -> Result<(), CliError> {
    let config = Config::load_with_overrides(args.config.as_deref(), &args.overrides())?;
    let settings = config.settings()?;

    if args.baseline_stdin {
        let baseline = read_baseline(io::stdin().lock())?;
        return run_daemon(settings, baseline, true);
    }

    // Startup fails here, before anything detaches, if the directory is unusable.
    let baseline = scan_directory(&settings.dir)?;

    if args.foreground {
        print_started(std::process::id())?;
        return run_daemon(settings, baseline, false);
    }

    let pid = spawn_detached(&settings, &baseline)?;
    print_started(pid)
}

fn run_daemon(
    settings: MonitorSettings,
    baseline: Snapshot,
    detached: bool,
) -> Result<(), CliError> {
    let mut daemon = IntegrityDaemon::new(settings, baseline, DaemonArgs { detached });
    daemon.run()?;
    Ok(())
}

fn print_started(pid: u32) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "Integrity spy is started with pid {pid}")?;
    stdout.flush()?;
    Ok(())
}

// ──────────────────── scan ────────────────────

#[derive(Debug, Serialize)]
struct ScanRow {
    path: String,
    crc32: String,
}

fn run_scan(args: &ScanArgs) -> Result<(), CliError> {
    let snapshot = scan_directory(&args.dir)?;
    let rows: Vec<ScanRow> = snapshot
        .iter()
        .map(|(name, checksum)| ScanRow {
            path: display_name(name),
            crc32: format_checksum(checksum),
        })
        .collect();

    let mut stdout = io::stdout().lock();
    if args.json {
        serde_json::to_writer_pretty(&mut stdout, &rows)?;
        writeln!(stdout)?;
    } else {
        for row in &rows {
            writeln!(stdout, "{:>8}  {}", row.crc32, row.path)?;
        }
    }
    Ok(())
}

// ──────────────────── check / stop ────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DaemonSignal {
    Check,
    Stop,
}

#[cfg(unix)]
fn signal_daemon(pid: u32, which: DaemonSignal) -> Result<(), CliError> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let raw = i32::try_from(pid).map_err(|_| CliError::User(format!("invalid pid {pid}")))?;
    let signal = match which {
        DaemonSignal::Check => Signal::SIGUSR1,
        DaemonSignal::Stop => Signal::SIGTERM,
    };
    kill(Pid::from_raw(raw), signal)
        .map_err(|e| CliError::Runtime(format!("failed to send {signal} to pid {pid}: {e}")))
}

#[cfg(not(unix))]
fn signal_daemon(_pid: u32, _which: DaemonSignal) -> Result<(), CliError> {
    Err(CliError::User(
        "signalling a running monitor is only supported on Unix".to_string(),
    ))
}
