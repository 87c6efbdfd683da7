// Copyright 2026 Chargewatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Runtime configuration.
//!
//! Resolution order, later layers winning: built-in defaults, an optional
//! JSON config file, `CHARGEWATCH_*` environment variables, then CLI flags
//! (applied by the caller). [`Config::validate`] runs once at startup.

use crate::scheduler::SchedulerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Station page polled by default (FLO 50 kW charger, University of Waterloo).
pub const DEFAULT_SOURCE_URL: &str = "https://chargehub.com/en/ev-charging-stations/canada/ontario/waterloo/university-of-waterloo/electric-car-stations-near-me?locId=62901";
pub const DEFAULT_INTERVAL_MINUTES: u64 = 5;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_DB_PATH: &str = "charger_data.db";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

const ENV_URL: &str = "CHARGEWATCH_URL";
const ENV_INTERVAL: &str = "CHARGEWATCH_INTERVAL_MINUTES";
const ENV_TIMEOUT: &str = "CHARGEWATCH_TIMEOUT_SECS";
const ENV_DB: &str = "CHARGEWATCH_DB";
const ENV_PORT: &str = "PORT";
const ENV_SNAPSHOT: &str = "CHARGEWATCH_SNAPSHOT";
const ENV_THRESHOLD: &str = "CHARGEWATCH_OPTIMAL_THRESHOLD";

/// Invalid or unreadable configuration. Fatal at startup only.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid value for {name}: '{value}'")]
    Env { name: &'static str, value: String },

    #[error("acquisition interval must be at least one minute")]
    ZeroInterval,

    #[error("transport timeout must be at least one second")]
    ZeroTimeout,

    #[error("transport timeout ({timeout_secs}s) exceeds the acquisition interval ({interval_secs}s)")]
    TimeoutExceedsInterval { timeout_secs: u64, interval_secs: u64 },

    #[error("listening port must be non-zero")]
    ZeroPort,

    #[error("invalid source URL '{0}': must be an absolute http(s) URL")]
    InvalidUrl(String),

    #[error("optimal threshold {0} is outside 0..=100")]
    ThresholdOutOfRange(f64),
}

/// Externally supplied settings for every entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source_url: String,
    /// Minutes between acquisition cycles.
    #[serde(rename = "update_interval")]
    pub interval_minutes: u64,
    pub timeout_secs: u64,
    pub database_path: PathBuf,
    pub port: u16,
    /// Where to publish the latest-status snapshot, if anywhere.
    pub snapshot_path: Option<PathBuf>,
    pub optimal_threshold: f64,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            database_path: PathBuf::from(DEFAULT_DB_PATH),
            port: DEFAULT_PORT,
            snapshot_path: None,
            optimal_threshold: chargewatch::analysis::DEFAULT_OPTIMAL_THRESHOLD,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Defaults, then `path` (if given), then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Read a JSON config file; missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write this config as pretty JSON.
    pub fn write_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        let body = serde_json::to_vec_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, body).map_err(io_err)
    }

    /// Overlay variables looked up through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &'static str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(|v| (name, v))
        };

        if let Some((_, v)) = read(ENV_URL) {
            self.source_url = v;
        }
        if let Some((name, v)) = read(ENV_INTERVAL) {
            self.interval_minutes = parse_env(name, &v)?;
        }
        if let Some((name, v)) = read(ENV_TIMEOUT) {
            self.timeout_secs = parse_env(name, &v)?;
        }
        if let Some((_, v)) = read(ENV_DB) {
            self.database_path = PathBuf::from(v);
        }
        if let Some((name, v)) = read(ENV_PORT) {
            self.port = parse_env(name, &v)?;
        }
        if let Some((_, v)) = read(ENV_SNAPSHOT) {
            self.snapshot_path = Some(PathBuf::from(v));
        }
        if let Some((name, v)) = read(ENV_THRESHOLD) {
            self.optimal_threshold = parse_env(name, &v)?;
        }
        Ok(())
    }

    /// Reject settings the runtime cannot operate with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_minutes == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        let interval_secs = self.interval_minutes.saturating_mul(60);
        if self.timeout_secs > interval_secs {
            return Err(ConfigError::TimeoutExceedsInterval {
                timeout_secs: self.timeout_secs,
                interval_secs,
            });
        }
        if self.port == 0 {
            return Err(ConfigError::ZeroPort);
        }
        match url::Url::parse(&self.source_url) {
            Ok(u) if matches!(u.scheme(), "http" | "https") && u.has_host() => {}
            _ => return Err(ConfigError::InvalidUrl(self.source_url.clone())),
        }
        if !(0.0..=100.0).contains(&self.optimal_threshold) {
            return Err(ConfigError::ThresholdOutOfRange(self.optimal_threshold));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.saturating_mul(60))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Scheduler cadence derived from the interval; slice and backoff keep their defaults.
    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            interval: self.interval(),
            ..SchedulerConfig::default()
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::Env {
        name,
        value: value.to_string(),
    })
}

/// Default location of the config file: `./config.json` if present, else
/// `~/.chargewatch/config.json`.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let cwd = PathBuf::from(DEFAULT_CONFIG_FILE);
    if cwd.is_file() {
        return Some(cwd);
    }
    let home = dirs::home_dir()?
        .join(".chargewatch")
        .join(DEFAULT_CONFIG_FILE);
    home.is_file().then_some(home)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.interval(), Duration::from_secs(300));
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.scheduler().interval, Duration::from_secs(300));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("CHARGEWATCH_INTERVAL_MINUTES", "10"),
                ("CHARGEWATCH_DB", "/var/lib/chargewatch/data.db"),
                ("PORT", "8080"),
                ("CHARGEWATCH_SNAPSHOT", "data.json"),
                ("CHARGEWATCH_URL", "  "),
            ]))
            .unwrap();
        assert_eq!(config.interval_minutes, 10);
        assert_eq!(
            config.database_path,
            PathBuf::from("/var/lib/chargewatch/data.db")
        );
        assert_eq!(config.port, 8080);
        assert_eq!(config.snapshot_path, Some(PathBuf::from("data.json")));
        assert_eq!(config.source_url, DEFAULT_SOURCE_URL);
    }

    #[test]
    fn test_unparseable_env_is_an_error() {
        let mut config = Config::default();
        let err = config
            .apply_env(env(&[("CHARGEWATCH_INTERVAL_MINUTES", "five")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Env {
                name: "CHARGEWATCH_INTERVAL_MINUTES",
                ..
            }
        ));
    }

    #[test]
    fn test_validation_failures() {
        let bad = |f: fn(&mut Config)| {
            let mut c = Config::default();
            f(&mut c);
            c.validate().unwrap_err()
        };
        assert!(matches!(bad(|c| c.interval_minutes = 0), ConfigError::ZeroInterval));
        assert!(matches!(bad(|c| c.timeout_secs = 0), ConfigError::ZeroTimeout));
        assert!(matches!(
            bad(|c| c.timeout_secs = 301),
            ConfigError::TimeoutExceedsInterval { .. }
        ));
        assert!(matches!(bad(|c| c.port = 0), ConfigError::ZeroPort));
        assert!(matches!(
            bad(|c| c.source_url = "ftp://example.com/page".into()),
            ConfigError::InvalidUrl(_)
        ));
        assert!(matches!(
            bad(|c| c.source_url = "not a url".into()),
            ConfigError::InvalidUrl(_)
        ));
        assert!(matches!(
            bad(|c| c.optimal_threshold = 120.0),
            ConfigError::ThresholdOutOfRange(_)
        ));
    }

    #[test]
    fn test_config_file_with_partial_and_unknown_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"github_username": "someone", "update_interval": 15, "database_path": "x.db", "log_level": "DEBUG"}"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.interval_minutes, 15);
        assert_eq!(config.database_path, PathBuf::from("x.db"));
        assert_eq!(config.log_level, "DEBUG");
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_config_file_round_trip_and_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let mut config = Config::default();
        config.snapshot_path = Some(PathBuf::from("data.json"));
        config.write_to(&path).unwrap();
        assert_eq!(Config::from_file(&path).unwrap(), config);

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            Config::from_file(&path),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            Config::from_file(&dir.path().join("missing.json")),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_explicit_config_path_wins() {
        let explicit = PathBuf::from("/etc/chargewatch.json");
        assert_eq!(resolve_config_path(Some(&explicit)), Some(explicit));
    }
}
