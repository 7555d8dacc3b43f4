//! Daemon subsystem: the check loop, its wake sources (signals and the
//! directory watcher), and the background launcher.

pub mod launcher;
#[cfg(feature = "daemon")]
pub mod loop_main;
#[cfg(feature = "daemon")]
pub mod signals;
pub mod wake;
#[cfg(feature = "daemon")]
pub mod watcher;
