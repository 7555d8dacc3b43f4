#![forbid(unsafe_code)]

//! integrityspy: a lightweight file integrity monitor.
//!
//! A daemon takes a baseline of CRC-32 checksums for every regular,
//! non-hidden file directly inside one directory, then re-checks on a fixed
//! interval, on directory change notifications, and on request. Each check
//! writes a JSON report classifying every file as OK, FAIL, ABSENT or NEW and
//! adopts the fresh scan as the next baseline.
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use integrityspy::prelude::*;
//!
//! let baseline = scan_directory(std::path::Path::new("/srv/data"))?;
//! let current = scan_directory(std::path::Path::new("/srv/data"))?;
//! for result in diff(baseline, current) {
//!     println!("{} {:?}", result.path(), result.status());
//! }
//! # Ok::<(), SpyError>(())
//! ```

pub mod prelude;

pub mod check;
pub mod core;
pub mod daemon;
pub mod logger;
pub mod scanner;
