//! Snapshot store: file name → checksum for one point in time.
//!
//! Backed by a plain vector searched linearly. Monitored directories are small
//! (tens to low thousands of entries), and a vector keeps iteration order equal
//! to insertion order, which makes reports reproducible. Swapping in a hash map
//! only has to preserve [`Snapshot::put`], [`Snapshot::pop_if_present`] and the
//! iteration methods.
//!
//! Keys are the raw directory entry names. Names that are not valid UTF-8 stay
//! distinct here; only [`display_name`] turns them into report text.

use std::ffi::{OsStr, OsString};

use serde::{Deserialize, Serialize};

/// One tracked file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    /// Bare entry name inside the monitored directory.
    pub name: OsString,
    /// CRC-32 of the file contents.
    pub checksum: u32,
}

/// Mapping from file name to checksum. Keys are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<SnapshotEntry>", into = "Vec<SnapshotEntry>")]
pub struct Snapshot {
    entries: Vec<SnapshotEntry>,
}

impl Snapshot {
    /// Empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `name`, replacing the checksum if it is already tracked.
    pub fn put(&mut self, name: impl Into<OsString>, checksum: u32) {
        let name = name.into();
        if let Some(entry) = self.entries.iter_mut().find(|e| e.name == name) {
            entry.checksum = checksum;
        } else {
            self.entries.push(SnapshotEntry { name, checksum });
        }
    }

    /// Remove and return the checksum for `name`; `None` leaves the snapshot untouched.
    pub fn pop_if_present(&mut self, name: &OsStr) -> Option<u32> {
        let idx = self.entries.iter().position(|e| e.name == name)?;
        Some(self.entries.remove(idx).checksum)
    }

    /// Checksum for `name` without removing it.
    #[must_use]
    pub fn get(&self, name: impl AsRef<OsStr>) -> Option<u32> {
        let name = name.as_ref();
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.checksum)
    }

    /// Forward traversal in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&OsStr, u32)> {
        self.entries.iter().map(|e| (e.name.as_os_str(), e.checksum))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for Snapshot {
    type Item = SnapshotEntry;
    type IntoIter = std::vec::IntoIter<SnapshotEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<N: Into<OsString>> FromIterator<(N, u32)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (N, u32)>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for (name, checksum) in iter {
            snapshot.put(name, checksum);
        }
        snapshot
    }
}

// Deserialized input goes through `put` so duplicate names cannot sneak in.
impl From<Vec<SnapshotEntry>> for Snapshot {
    fn from(entries: Vec<SnapshotEntry>) -> Self {
        entries.into_iter().map(|e| (e.name, e.checksum)).collect()
    }
}

impl From<Snapshot> for Vec<SnapshotEntry> {
    fn from(snapshot: Snapshot) -> Self {
        snapshot.entries
    }
}

/// Report text for an entry name; undecodable bytes become U+FFFD.
#[must_use]
pub fn display_name(name: &OsStr) -> String {
    name.to_string_lossy().into_owned()
}
