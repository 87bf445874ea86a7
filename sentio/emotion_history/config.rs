//! TOML settings for the history service: window, ranking size, retention,
//! and telemetry sinks.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use shared_logging::LogLevel;

use crate::{ranking::DEFAULT_TOP_K, store::RetentionPolicy, window::DEFAULT_WINDOW_DAYS};

/// Service settings, usually loaded from a TOML document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HistoryConfig {
    /// Trailing window used by `summarize`, in days.
    #[serde(default = "default_window_days")]
    pub window_days: u32,
    /// Number of labels reported in the ranking.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Per-user growth bound.
    #[serde(default)]
    pub retention: RetentionSettings,
    /// Log and event sinks.
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

/// `[retention]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetentionSettings {
    /// Oldest events beyond this count are evicted. Absent means unbounded.
    pub max_events_per_user: Option<usize>,
}

impl RetentionSettings {
    /// Store policy for these settings.
    #[must_use]
    pub fn policy(&self) -> RetentionPolicy {
        self.max_events_per_user
            .map_or(RetentionPolicy::Unbounded, RetentionPolicy::MaxEventsPerUser)
    }
}

/// `[telemetry]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetrySettings {
    /// JSON-lines log file.
    pub log_path: Option<PathBuf>,
    /// JSON-lines domain event file.
    pub event_log: Option<PathBuf>,
    /// Lowest level written to `log_path` (`DEBUG`, `INFO`, `WARN`, `ERROR`).
    /// Absent means everything is written.
    pub min_level: Option<LogLevel>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            top_k: default_top_k(),
            retention: RetentionSettings::default(),
            telemetry: TelemetrySettings::default(),
        }
    }
}

impl HistoryConfig {
    /// Loads and validates a TOML file; relative sink paths resolve against
    /// the file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading history config {}", path.display()))?;
        let mut config =
            Self::from_toml(&raw).with_context(|| format!("parsing {}", path.display()))?;
        let base = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        for slot in [
            &mut config.telemetry.log_path,
            &mut config.telemetry.event_log,
        ] {
            if let Some(candidate) = slot.as_mut() {
                if candidate.is_relative() {
                    *candidate = base.join(&*candidate);
                }
            }
        }
        Ok(config)
    }

    /// Parses and validates a TOML document.
    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the service cannot honor.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.window_days > 0, "window_days must be at least 1");
        ensure!(self.top_k > 0, "top_k must be at least 1");
        if let Some(limit) = self.retention.max_events_per_user {
            ensure!(limit > 0, "retention.max_events_per_user must be at least 1");
        }
        Ok(())
    }
}

const fn default_window_days() -> u32 {
    DEFAULT_WINDOW_DAYS
}

const fn default_top_k() -> usize {
    DEFAULT_TOP_K
}
