//! Signal handling: SIGTERM graceful shutdown, SIGUSR1 immediate check, and
//! SIGINT/SIGHUP/SIGQUIT neutralized while detached.
//!
//! Uses the `signal-hook` crate for safe signal registration. Handlers only
//! flip atomic flags; a forwarder thread turns delivered signals into wake
//! messages so a loop blocked on the wake channel notices them at once. The
//! flags carry the request. A forwarded wake only interrupts the wait.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crate::core::errors::{Result, SpyError};
use crate::daemon::wake::{WakeReason, WakeSender};

// ──────────────────── signal handler ────────────────────

/// Thread-safe signal state shared between the signal handlers and the loop.
///
/// All flags use `Ordering::Relaxed` because the loop only reads them at its
/// checkpoints and exact ordering with other atomics is not required.
#[derive(Debug, Clone)]
pub struct SignalHandler {
    shutdown_flag: Arc<AtomicBool>,
    check_flag: Arc<AtomicBool>,
}

impl SignalHandler {
    /// Create a handler with both flags clear. Nothing is registered until
    /// [`SignalHandler::install`] runs.
    pub fn new() -> Self {
        Self {
            shutdown_flag: Arc::new(AtomicBool::new(false)),
            check_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Check whether a shutdown has been requested.
    pub fn should_shutdown(&self) -> bool {
        self.shutdown_flag.load(Ordering::Relaxed)
    }

    /// Check (and clear) whether an immediate check has been requested.
    pub fn take_check_request(&self) -> bool {
        self.check_flag.swap(false, Ordering::Relaxed)
    }

    /// Programmatically request shutdown.
    pub fn request_shutdown(&self) {
        self.shutdown_flag.store(true, Ordering::Relaxed);
    }

    /// Programmatically request an immediate check.
    pub fn request_check(&self) {
        self.check_flag.store(true, Ordering::Relaxed);
    }

    /// Register OS signal hooks and start the wake forwarder.
    ///
    /// SIGTERM → shutdown, SIGUSR1 → check now. SIGINT → shutdown in the
    /// foreground and is swallowed when `detached`. SIGHUP and SIGQUIT are
    /// always swallowed. The returned guard stops the forwarder when dropped.
    #[cfg(unix)]
    pub fn install(&self, wake: WakeSender, detached: bool) -> Result<SignalForwarder> {
        use signal_hook::consts::{SIGHUP, SIGINT, SIGQUIT, SIGTERM, SIGUSR1};
        use signal_hook::iterator::Signals;

        register_flag(SIGTERM, &self.shutdown_flag, "SIGTERM")?;
        register_flag(SIGUSR1, &self.check_flag, "SIGUSR1")?;
        if !detached {
            register_flag(SIGINT, &self.shutdown_flag, "SIGINT")?;
        }

        // Registering these with the iterator replaces their default
        // disposition, which is what keeps the detached daemon alive.
        let mut signals = Signals::new([SIGTERM, SIGUSR1, SIGINT, SIGHUP, SIGQUIT]).map_err(
            |e| SpyError::Signal {
                details: format!("failed to create signal iterator: {e}"),
            },
        )?;
        let handle = signals.handle();
        let join = thread::Builder::new()
            .name("ispy-signals".to_string())
            .spawn(move || {
                for sig in signals.forever() {
                    let reason = match sig {
                        SIGTERM => WakeReason::Shutdown,
                        SIGINT if !detached => WakeReason::Shutdown,
                        SIGUSR1 => WakeReason::CheckRequested,
                        _ => continue,
                    };
                    wake.wake(reason);
                }
            })
            .map_err(|e| SpyError::Signal {
                details: format!("failed to spawn signal forwarder: {e}"),
            })?;

        Ok(SignalForwarder {
            handle,
            join: Some(join),
        })
    }
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
fn register_flag(signal: i32, flag: &Arc<AtomicBool>, name: &str) -> Result<()> {
    signal_hook::flag::register(signal, Arc::clone(flag))
        .map(|_| ())
        .map_err(|e| SpyError::Signal {
            details: format!("failed to register {name}: {e}"),
        })
}

// ──────────────────── forwarder guard ────────────────────

/// Owns the signal forwarder thread; dropping it closes the iterator and
/// joins the thread.
#[cfg(unix)]
pub struct SignalForwarder {
    handle: signal_hook::iterator::Handle,
    join: Option<thread::JoinHandle<()>>,
}

#[cfg(unix)]
impl Drop for SignalForwarder {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

// ──────────────────── tests ────────────────────
