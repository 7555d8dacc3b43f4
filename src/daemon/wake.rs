//! Wake channel: how notification sources reach the daemon loop.
//!
//! Capacity is one. A wake that arrives while another is still pending is
//! dropped, so any burst of notifications between two checkpoints collapses
//! into a single pending wake.

#![allow(missing_docs)]

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded};

/// Why a notification source woke the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeReason {
    /// The directory watcher saw a relevant change.
    DirectoryChanged,
    /// An operator asked for an immediate check.
    CheckRequested,
    /// Termination was requested; the loop re-reads the shutdown flag.
    Shutdown,
}

impl WakeReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DirectoryChanged => "directory_changed",
            Self::CheckRequested => "check_requested",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Cloneable sending half handed to signal and watcher threads.
#[derive(Debug, Clone)]
pub struct WakeSender {
    tx: Sender<WakeReason>,
}

impl WakeSender {
    /// Queue a wake without blocking. Returns `false` when one was already
    /// pending (coalesced) or the loop is gone.
    pub fn wake(&self, reason: WakeReason) -> bool {
        match self.tx.try_send(reason) {
            Ok(()) => true,
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Receiving half owned by the daemon loop.
#[derive(Debug)]
pub struct WakeReceiver {
    rx: Receiver<WakeReason>,
}

impl WakeReceiver {
    /// Block until a wake arrives or `timeout` elapses.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<WakeReason, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    /// Discard whatever is pending. Returns how many wakes were dropped.
    pub fn drain(&self) -> usize {
        self.rx.try_iter().count()
    }

    pub fn is_pending(&self) -> bool {
        !self.rx.is_empty()
    }
}

/// Create the single-slot wake channel.
pub fn wake_channel() -> (WakeSender, WakeReceiver) {
    let (tx, rx) = bounded(1);
    (WakeSender { tx }, WakeReceiver { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_collapses_into_one_pending_wake() {
        let (tx, rx) = wake_channel();
        assert!(tx.wake(WakeReason::DirectoryChanged));
        assert!(!tx.wake(WakeReason::DirectoryChanged));
        assert!(!tx.wake(WakeReason::CheckRequested));

        assert_eq!(
            rx.recv_timeout(Duration::from_millis(10)),
            Ok(WakeReason::DirectoryChanged)
        );
        assert_eq!(
            rx.recv_timeout(Duration::from_millis(10)),
            Err(RecvTimeoutError::Timeout)
        );
    }

    #[test]
    fn drain_clears_pending() {
        let (tx, rx) = wake_channel();
        tx.wake(WakeReason::CheckRequested);
        assert!(rx.is_pending());
        assert_eq!(rx.drain(), 1);
        assert!(!rx.is_pending());
        assert_eq!(rx.drain(), 0);
    }

    #[test]
    fn cloned_senders_share_the_slot() {
        let (tx, rx) = wake_channel();
        let other = tx.clone();
        assert!(tx.wake(WakeReason::DirectoryChanged));
        assert!(!other.wake(WakeReason::CheckRequested));
        assert_eq!(rx.drain(), 1);
    }

    #[test]
    fn wake_after_receiver_dropped_is_not_queued() {
        let (tx, rx) = wake_channel();
        drop(rx);
        assert!(!tx.wake(WakeReason::Shutdown));
    }

    #[test]
    fn receiver_reports_disconnect() {
        let (tx, rx) = wake_channel();
        drop(tx);
        assert_eq!(
            rx.recv_timeout(Duration::from_millis(10)),
            Err(RecvTimeoutError::Disconnected)
        );
    }
}
