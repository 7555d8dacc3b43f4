//! Background launch: re-executes the current binary as a detached daemon.
//!
//! The controlling invocation has already taken the baseline. It hands that
//! snapshot to the child over stdin as JSON so the daemon compares against
//! exactly what was captured at startup, then reports the child's pid.

#![allow(missing_docs)]

use std::io::{Read, Write};
use std::process::{Command, Stdio};

use crate::core::config::MonitorSettings;
use crate::core::errors::{Result, SpyError};
use crate::scanner::snapshot::Snapshot;

/// Flag telling the child to run the loop in-process.
pub const FOREGROUND_FLAG: &str = "--foreground";
/// Flag telling the child to read its baseline from stdin (and that it is detached).
pub const BASELINE_STDIN_FLAG: &str = "--baseline-stdin";

/// Command-line arguments that reproduce `settings` in the child.
pub fn child_args(settings: &MonitorSettings) -> Vec<std::ffi::OsString> {
    let mut args: Vec<std::ffi::OsString> = vec![
        FOREGROUND_FLAG.into(),
        BASELINE_STDIN_FLAG.into(),
        "--dir".into(),
        settings.dir.clone().into_os_string(),
        "--interval".into(),
        settings.interval.as_secs().to_string().into(),
        "--report".into(),
        settings.report_path.clone().into_os_string(),
        "--log".into(),
        settings.log_path.clone().into_os_string(),
    ];
    if !settings.watch {
        args.push("--no-watch".into());
    }
    args
}

/// Spawn the detached daemon and feed it `baseline`. Returns the child pid.
pub fn spawn_detached(settings: &MonitorSettings, baseline: &Snapshot) -> Result<u32> {
    let exe = std::env::current_exe().map_err(|e| SpyError::Runtime {
        details: format!("cannot locate own executable: {e}"),
    })?;

    let mut command = Command::new(&exe);
    command
        .args(child_args(settings))
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // Own process group: terminal job-control signals stay with the shell.
        command.process_group(0);
    }

    let mut child = command.spawn().map_err(|e| SpyError::Runtime {
        details: format!("failed to start daemon {}: {e}", exe.display()),
    })?;
    let pid = child.id();

    let payload = serde_json::to_vec(baseline)?;
    let Some(mut stdin) = child.stdin.take() else {
        return Err(SpyError::Runtime {
            details: "daemon stdin was not captured".to_string(),
        });
    };
    stdin
        .write_all(&payload)
        .and_then(|()| stdin.flush())
        .map_err(|e| SpyError::Runtime {
            details: format!("failed to hand baseline to daemon pid {pid}: {e}"),
        })?;
    drop(stdin);

    Ok(pid)
}

/// Read the baseline handed over by [`spawn_detached`].
pub fn read_baseline(reader: impl Read) -> Result<Snapshot> {
    Ok(serde_json::from_reader(reader)?)
}
