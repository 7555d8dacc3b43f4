//! Comparison side of an integrity check: the diff engine and the report
//! writer that persists its results.

pub mod diff;
pub mod report;
