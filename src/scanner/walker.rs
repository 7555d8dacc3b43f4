//! Directory scanner: lists eligible files in the monitored directory and
//! checksums each one into a [`Snapshot`].
//!
//! Eligibility: regular files only (symlinks, subdirectories, devices, sockets
//! are skipped) whose names do not start with a dot. The scan is read-only and
//! does not descend into subdirectories.
//!
//! Files are expected to come and go while a scan is running, so per-entry
//! disappearance is absorbed here and never reaches the caller. Only failures
//! that say something about the directory as a whole abort the scan.

#![allow(missing_docs)]

use std::ffi::{OsStr, OsString};
use std::fs::{self, File};
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::core::errors::{Result, SpyError};
use crate::scanner::checksum::checksum_reader;
use crate::scanner::snapshot::Snapshot;

/// Counters for one scan, logged with every `check_complete` event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Regular, non-hidden entries seen in the listing.
    pub eligible: usize,
    /// Entries checksummed into the snapshot.
    pub hashed: usize,
    /// Entries gone by the time they were opened.
    pub vanished: usize,
    /// Entries whose contents could not be read to the end.
    pub unreadable: usize,
    pub duration: Duration,
}

impl ScanStats {
    /// Count one entry; returns the checksum when it belongs in the snapshot.
    fn record(&mut self, outcome: EntryOutcome) -> Option<u32> {
        match outcome {
            EntryOutcome::Hashed(checksum) => {
                self.hashed += 1;
                Some(checksum)
            }
            EntryOutcome::Vanished => {
                self.vanished += 1;
                None
            }
            EntryOutcome::Unreadable => {
                self.unreadable += 1;
                None
            }
        }
    }
}

/// What happened to one listed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryOutcome {
    Hashed(u32),
    /// Gone between listing and opening.
    Vanished,
    /// Opened, but a read failed before the end.
    Unreadable,
}

/// Scanner bound to one directory.
#[derive(Debug, Clone)]
pub struct DirectoryScanner {
    dir: PathBuf,
}

impl DirectoryScanner {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Scan and return only the snapshot.
    pub fn scan(&self) -> Result<Snapshot> {
        self.scan_with_stats().map(|(snapshot, _)| snapshot)
    }

    /// Scan the directory, returning the snapshot plus counters.
    ///
    /// Entries are hashed in name order so two scans of an unchanged
    /// directory produce identical snapshots.
    pub fn scan_with_stats(&self) -> Result<(Snapshot, ScanStats)> {
        let start = Instant::now();
        let mut stats = ScanStats::default();

        let mut names = self.list_eligible()?;
        names.sort();
        stats.eligible = names.len();

        let mut snapshot = Snapshot::new();
        for name in names {
            let opened = open_entry(&self.dir.join(&name))?;
            if let Some(checksum) = stats.record(checksum_entry(opened)) {
                snapshot.put(name, checksum);
            }
        }

        stats.duration = start.elapsed();
        Ok((snapshot, stats))
    }

    /// Collect eligible entry names. The directory handle is released on return.
    fn list_eligible(&self) -> Result<Vec<OsString>> {
        let entries = fs::read_dir(&self.dir).map_err(|source| SpyError::DirectoryOpen {
            path: self.dir.clone(),
            source,
        })?;

        let mut names = Vec::new();
        for entry_result in entries {
            let entry = entry_result.map_err(|source| SpyError::io(&self.dir, source))?;
            let name = entry.file_name();
            if is_hidden(&name) {
                continue;
            }
            // `file_type` does not follow symlinks, so links are excluded here.
            match entry.file_type() {
                Ok(ft) if ft.is_file() => names.push(name),
                Ok(_) => {}
                Err(err) if is_vanished(&err) => {}
                Err(source) => return Err(SpyError::io(entry.path(), source)),
            }
        }
        Ok(names)
    }
}

/// Convenience wrapper: scan `dir` once.
pub fn scan_directory(dir: &Path) -> Result<Snapshot> {
    DirectoryScanner::new(dir).scan()
}

/// Whether a bare entry name is hidden (dot-prefixed).
pub fn is_hidden(name: &OsStr) -> bool {
    name.as_encoded_bytes().first() == Some(&b'.')
}

/// Open one entry, retrying interrupted opens.
///
/// `Ok(None)` means the entry disappeared between listing and opening.
fn open_entry(path: &Path) -> Result<Option<File>> {
    loop {
        match File::open(path) {
            Ok(file) => {
                advise_sequential(&file);
                return Ok(Some(file));
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) if is_vanished(&err) => return Ok(None),
            Err(source) => {
                return Err(SpyError::FileOpen {
                    path: path.to_path_buf(),
                    source,
                });
            }
        }
    }
}

/// Checksum an opened entry. A read failure after a successful open is the
/// same race as a vanished file: the entry is skipped for this cycle.
fn checksum_entry(opened: Option<impl Read>) -> EntryOutcome {
    let Some(reader) = opened else {
        return EntryOutcome::Vanished;
    };
    checksum_reader(reader).map_or(EntryOutcome::Unreadable, EntryOutcome::Hashed)
}

fn is_vanished(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::NotFound | ErrorKind::BrokenPipe)
}

/// Readahead hint for the whole file; failure only costs speed.
#[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd"))]
fn advise_sequential(file: &File) {
    use nix::fcntl::{PosixFadviseAdvice, posix_fadvise};
    use std::os::fd::AsRawFd;

    let _ = posix_fadvise(
        file.as_raw_fd(),
        0,
        0,
        PosixFadviseAdvice::POSIX_FADV_SEQUENTIAL,
    );
}

#[cfg(not(any(target_os = "linux", target_os = "android", target_os = "freebsd")))]
fn advise_sequential(_file: &File) {}
