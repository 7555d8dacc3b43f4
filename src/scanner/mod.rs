//! Snapshot side of an integrity check: streaming checksums, the snapshot
//! store, and the directory scanner that fills it.

pub mod checksum;
pub mod snapshot;
pub mod walker;
