//! Diff engine: classifies every file in the baseline and the fresh scan.
//!
//! Output order is fixed by the snapshots themselves: first every baseline
//! entry in baseline order (OK / FAIL / ABSENT), then every entry only present
//! in the fresh scan, in scan order (NEW). No secondary sort is applied, so the
//! order is only as reproducible as the snapshots' iteration order.

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

use crate::scanner::snapshot::{Snapshot, SnapshotEntry, display_name};

/// Report status tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Ok,
    Fail,
    Absent,
    New,
}

/// Classified outcome for one file name, with the name rendered for the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckResult {
    Unchanged {
        path: String,
        checksum: u32,
    },
    Failed {
        path: String,
        expected: u32,
        actual: u32,
    },
    /// Tracked before, missing or unreadable now.
    Absent {
        path: String,
    },
    /// Present now, not tracked before.
    New {
        path: String,
    },
}

impl CheckResult {
    pub fn path(&self) -> &str {
        match self {
            Self::Unchanged { path, .. }
            | Self::Failed { path, .. }
            | Self::Absent { path }
            | Self::New { path } => path,
        }
    }

    pub const fn status(&self) -> CheckStatus {
        match self {
            Self::Unchanged { .. } => CheckStatus::Ok,
            Self::Failed { .. } => CheckStatus::Fail,
            Self::Absent { .. } => CheckStatus::Absent,
            Self::New { .. } => CheckStatus::New,
        }
    }

    /// FAIL and ABSENT make the whole check fail; NEW does not.
    pub const fn is_violation(&self) -> bool {
        matches!(self, Self::Failed { .. } | Self::Absent { .. })
    }
}

/// Lazy diff over two consumed snapshots.
///
/// Each baseline entry is matched by popping it from the fresh snapshot, so
/// whatever is left once the baseline is exhausted is exactly the set of new
/// files. Dropping the iterator early discards both snapshots.
#[derive(Debug)]
pub struct Diff {
    previous: std::vec::IntoIter<SnapshotEntry>,
    current: Snapshot,
    leftovers: Option<std::vec::IntoIter<SnapshotEntry>>,
}

/// Diff `previous` (the baseline) against `current` (the fresh scan).
pub fn diff(previous: Snapshot, current: Snapshot) -> Diff {
    Diff {
        previous: previous.into_iter(),
        current,
        leftovers: None,
    }
}

impl Iterator for Diff {
    type Item = CheckResult;

    fn next(&mut self) -> Option<CheckResult> {
        if let Some(SnapshotEntry { name, checksum }) = self.previous.next() {
            let found = self.current.pop_if_present(&name);
            let path = display_name(&name);
            let result = match found {
                None => CheckResult::Absent { path },
                Some(actual) if actual == checksum => CheckResult::Unchanged { path, checksum },
                Some(actual) => CheckResult::Failed {
                    path,
                    expected: checksum,
                    actual,
                },
            };
            return Some(result);
        }

        let current = &mut self.current;
        self.leftovers
            .get_or_insert_with(|| std::mem::take(current).into_iter())
            .next()
            .map(|entry| CheckResult::New {
                path: display_name(&entry.name),
            })
    }
}
