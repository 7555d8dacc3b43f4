//! Configuration system: TOML file + env var overrides + command-line overrides.
//!
//! Precedence, lowest to highest: built-in defaults, TOML file, environment,
//! command line. An environment variable whose setting is given on the command
//! line is never read, so a malformed value there cannot block startup.
//! [`Config::settings`] validates the merged result.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SpyError};

/// Default report file name, relative to the daemon's working directory.
pub const DEFAULT_REPORT_FILE: &str = ".integrityspy-report.json";

/// Full integrityspy configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub monitor: MonitorConfig,
    pub paths: PathsConfig,
}

/// What to monitor and how often.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MonitorConfig {
    /// Directory whose regular, non-hidden files are tracked.
    pub dir: Option<PathBuf>,
    /// Seconds between scheduled checks. Must be > 0.
    pub interval_secs: Option<u64>,
    /// Wake up early on directory change notifications.
    pub watch: bool,
}

/// Filesystem paths used by integrityspy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub report: PathBuf,
    pub log: PathBuf,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            dir: None,
            interval_secs: None,
            watch: true,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!(
                    "[ISPY-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths"
                );
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        let cfg = home_dir
            .join(".config")
            .join("integrityspy")
            .join("config.toml");
        let data = home_dir.join(".local").join("share").join("integrityspy");
        Self {
            config_file: cfg,
            report: PathBuf::from(DEFAULT_REPORT_FILE),
            log: data.join("activity.jsonl"),
        }
    }
}

/// Command-line values layered over file and environment settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub dir: Option<PathBuf>,
    pub interval_secs: Option<u64>,
    pub report: Option<PathBuf>,
    pub log: Option<PathBuf>,
    pub no_watch: bool,
}

/// Validated, fully resolved settings consumed by the scanner and daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSettings {
    pub dir: PathBuf,
    pub interval: Duration,
    pub report_path: PathBuf,
    pub log_path: PathBuf,
    pub watch: bool,
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_overrides(path, &Overrides::default())
    }

    /// Load file and environment layers, then the command-line `overrides`.
    pub fn load_with_overrides(path: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| SpyError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(SpyError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var, overrides)?;
        cfg.apply_overrides(overrides);
        Ok(cfg)
    }

    /// Layer command-line values on top of the loaded configuration.
    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(dir) = &overrides.dir {
            self.monitor.dir = Some(dir.clone());
        }
        if let Some(interval) = overrides.interval_secs {
            self.monitor.interval_secs = Some(interval);
        }
        if let Some(report) = &overrides.report {
            self.paths.report.clone_from(report);
        }
        if let Some(log) = &overrides.log {
            self.paths.log.clone_from(log);
        }
        if overrides.no_watch {
            self.monitor.watch = false;
        }
    }

    /// Validate and resolve into [`MonitorSettings`].
    pub fn settings(&self) -> Result<MonitorSettings> {
        let dir = self
            .monitor
            .dir
            .clone()
            .filter(|d| !d.as_os_str().is_empty())
            .ok_or_else(|| SpyError::InvalidConfig {
                details: "dir argument is required".to_string(),
            })?;
        let interval_secs = self
            .monitor
            .interval_secs
            .ok_or_else(|| SpyError::InvalidConfig {
                details: "interval argument is required".to_string(),
            })?;
        if interval_secs == 0 {
            return Err(invalid_interval());
        }
        if self.paths.report.as_os_str().is_empty() {
            return Err(SpyError::InvalidConfig {
                details: "paths.report must not be empty".to_string(),
            });
        }

        Ok(MonitorSettings {
            dir: normalize_dir(&dir),
            interval: Duration::from_secs(interval_secs),
            report_path: self.paths.report.clone(),
            log_path: self.paths.log.clone(),
            watch: self.monitor.watch,
        })
    }

    /// Env layer. Keys already supplied by `cli` are skipped without lookup.
    fn apply_env_overrides_from<F>(&mut self, mut lookup: F, cli: &Overrides) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        // Bare `dir` / `interval` are the legacy names.
        if cli.dir.is_none()
            && let Some(raw) = lookup("INTEGRITYSPY_DIR").or_else(|| lookup("dir"))
        {
            self.monitor.dir = Some(PathBuf::from(raw));
        }
        if cli.interval_secs.is_none()
            && let Some(raw) = lookup("INTEGRITYSPY_INTERVAL").or_else(|| lookup("interval"))
        {
            self.monitor.interval_secs = Some(parse_interval(&raw)?);
        }
        if cli.report.is_none()
            && let Some(raw) = lookup("INTEGRITYSPY_REPORT")
        {
            self.paths.report = PathBuf::from(raw);
        }
        if cli.log.is_none()
            && let Some(raw) = lookup("INTEGRITYSPY_LOG")
        {
            self.paths.log = PathBuf::from(raw);
        }
        if !cli.no_watch
            && let Some(raw) = lookup("INTEGRITYSPY_WATCH")
        {
            self.monitor.watch = parse_env_bool("INTEGRITYSPY_WATCH", &raw)?;
        }
        Ok(())
    }
}

/// Parse a wake interval in whole seconds; zero and garbage are rejected.
pub fn parse_interval(raw: &str) -> Result<u64> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(invalid_interval()),
    }
}

fn invalid_interval() -> SpyError {
    SpyError::InvalidConfig {
        details: "invalid interval argument".to_string(),
    }
}

/// Drop trailing and doubled separators so log lines and watcher paths
/// compare cleanly. Rebuilt from components, so the bytes of each name are kept.
fn normalize_dir(dir: &Path) -> PathBuf {
    dir.components().collect()
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env_bool(name: &str, raw: &str) -> Result<bool> {
    raw.trim()
        .parse::<bool>()
        .map_err(|error| SpyError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}
