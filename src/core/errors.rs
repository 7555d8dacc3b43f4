//! ISPY-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, SpyError>;

/// Top-level error type for integrityspy.
#[derive(Debug, Error)]
pub enum SpyError {
    #[error("[ISPY-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[ISPY-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[ISPY-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[ISPY-2001] failed to open directory {path}: {source}")]
    DirectoryOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[ISPY-2002] failed to open file {path}: {source}")]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[ISPY-2003] failed to write report {path}: {source}")]
    ReportWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[ISPY-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[ISPY-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[ISPY-3003] channel closed in component {component}")]
    ChannelClosed { component: &'static str },

    #[error("[ISPY-3101] directory watcher failure: {details}")]
    Watch { details: String },

    #[error("[ISPY-3102] signal registration failure: {details}")]
    Signal { details: String },

    #[error("[ISPY-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl SpyError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "ISPY-1001",
            Self::MissingConfig { .. } => "ISPY-1002",
            Self::ConfigParse { .. } => "ISPY-1003",
            Self::DirectoryOpen { .. } => "ISPY-2001",
            Self::FileOpen { .. } => "ISPY-2002",
            Self::ReportWrite { .. } => "ISPY-2003",
            Self::Serialization { .. } => "ISPY-2101",
            Self::Io { .. } => "ISPY-3002",
            Self::ChannelClosed { .. } => "ISPY-3003",
            Self::Watch { .. } => "ISPY-3101",
            Self::Signal { .. } => "ISPY-3102",
            Self::Runtime { .. } => "ISPY-3900",
        }
    }

    /// Whether the failure only aborts the current check cycle.
    ///
    /// Everything else ends the daemon: its wake sources are gone or were
    /// never set up, so the loop cannot make progress.
    #[must_use]
    pub const fn is_cycle_fatal(&self) -> bool {
        matches!(
            self,
            Self::DirectoryOpen { .. }
                | Self::FileOpen { .. }
                | Self::ReportWrite { .. }
                | Self::Serialization { .. }
                | Self::Io { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for SpyError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for SpyError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

#[cfg(feature = "daemon")]
impl From<notify::Error> for SpyError {
    fn from(value: notify::Error) -> Self {
        Self::Watch {
            details: value.to_string(),
        }
    }
}
