//! Report writer: streams classified results into a JSON array on disk.
//!
//! Records go to `<report>.tmp` one at a time as the diff produces them, then
//! the temp file is renamed over the report once the closing bracket is
//! flushed. A failed cycle therefore never leaves a truncated report behind;
//! whatever report the previous cycle produced stays in place.
//!
//! ```text
//! [
//!     {"path":"a.txt","etalon_crc32":"3610A686","result_crc32":"3610A686","status":"OK"},
//!     {"path":"b.txt","status":"NEW"}
//! ]
//! ```

#![allow(missing_docs)]

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::check::diff::{CheckResult, CheckStatus};
use crate::core::errors::{Result, SpyError};
use crate::scanner::checksum::format_checksum;

const INDENT: &[u8] = b"    ";

/// Wire shape of one report record.
#[derive(Debug, Serialize)]
struct ReportRecord<'a> {
    path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    etalon_crc32: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result_crc32: Option<String>,
    status: CheckStatus,
}

impl<'a> From<&'a CheckResult> for ReportRecord<'a> {
    fn from(result: &'a CheckResult) -> Self {
        let (etalon, actual) = match result {
            CheckResult::Unchanged { checksum, .. } => (Some(*checksum), Some(*checksum)),
            CheckResult::Failed {
                expected, actual, ..
            } => (Some(*expected), Some(*actual)),
            CheckResult::Absent { .. } | CheckResult::New { .. } => (None, None),
        };
        Self {
            path: result.path(),
            etalon_crc32: etalon.map(format_checksum),
            result_crc32: actual.map(format_checksum),
            status: result.status(),
        }
    }
}

/// Per-status counts for one check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckSummary {
    pub unchanged: usize,
    pub failed: usize,
    pub absent: usize,
    pub new: usize,
}

impl CheckSummary {
    pub fn record(&mut self, result: &CheckResult) {
        match result.status() {
            CheckStatus::Ok => self.unchanged += 1,
            CheckStatus::Fail => self.failed += 1,
            CheckStatus::Absent => self.absent += 1,
            CheckStatus::New => self.new += 1,
        }
    }

    /// Passed iff nothing was modified or removed.
    pub const fn passed(&self) -> bool {
        self.failed == 0 && self.absent == 0
    }

    pub const fn total(&self) -> usize {
        self.unchanged + self.failed + self.absent + self.new
    }
}

/// Streaming JSON-array writer for one report.
///
/// Dropping the writer without calling [`ReportWriter::finish`] removes the
/// temp file and leaves the existing report untouched.
#[derive(Debug)]
pub struct ReportWriter {
    path: PathBuf,
    tmp_path: PathBuf,
    out: Option<BufWriter<File>>,
    records: usize,
    summary: CheckSummary,
}

impl ReportWriter {
    /// Create the temp file and write the array header.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let tmp_path = tmp_path_for(&path);
        let file = File::create(&tmp_path).map_err(|source| SpyError::ReportWrite {
            path: tmp_path.clone(),
            source,
        })?;
        let mut writer = Self {
            path,
            tmp_path,
            out: Some(BufWriter::new(file)),
            records: 0,
            summary: CheckSummary::default(),
        };
        writer.write_raw(b"[\n")?;
        Ok(writer)
    }

    /// Append one record.
    pub fn write_result(&mut self, result: &CheckResult) -> Result<()> {
        let mut line = Vec::with_capacity(128);
        if self.records > 0 {
            line.extend_from_slice(b",\n");
        }
        line.extend_from_slice(INDENT);
        serde_json::to_writer(&mut line, &ReportRecord::from(result))?;
        self.write_raw(&line)?;
        self.records += 1;
        self.summary.record(result);
        Ok(())
    }

    /// Write the footer, flush, and move the report into place.
    pub fn finish(mut self) -> Result<CheckSummary> {
        let footer: &[u8] = if self.records > 0 { b"\n]\n" } else { b"]\n" };
        self.write_raw(footer)?;
        if let Some(mut out) = self.out.take() {
            out.flush().map_err(|source| self.write_error(source))?;
            let file = out
                .into_inner()
                .map_err(|err| self.write_error(err.into_error()))?;
            file.sync_all().map_err(|source| self.write_error(source))?;
        }
        fs::rename(&self.tmp_path, &self.path).map_err(|source| SpyError::ReportWrite {
            path: self.path.clone(),
            source,
        })?;
        Ok(self.summary)
    }

    fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        let result = match self.out.as_mut() {
            Some(out) => out.write_all(bytes),
            None => Err(std::io::Error::other("report already closed")),
        };
        result.map_err(|source| self.write_error(source))
    }

    fn write_error(&self, source: std::io::Error) -> SpyError {
        SpyError::ReportWrite {
            path: self.tmp_path.clone(),
            source,
        }
    }
}

impl Drop for ReportWriter {
    fn drop(&mut self) {
        // Still holding the handle means `finish` never ran to completion.
        if self.out.take().is_some() || self.tmp_path.exists() {
            let _ = fs::remove_file(&self.tmp_path);
        }
    }
}

/// Stream every result from `results` into the report at `path`.
pub fn write_report<I>(path: &Path, results: I) -> Result<CheckSummary>
where
    I: IntoIterator<Item = CheckResult>,
{
    let mut writer = ReportWriter::create(path)?;
    for result in results {
        writer.write_result(&result)?;
    }
    writer.finish()
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
