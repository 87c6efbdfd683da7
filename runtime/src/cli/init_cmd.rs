// Copyright 2026 Chargewatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! `chargewatch init`: create the database and a starter config file.

use crate::cli::output::Output;
use crate::cli::open_store;
use crate::config::{Config, DEFAULT_CONFIG_FILE};
use anyhow::Result;
use serde_json::json;
use std::path::{Path, PathBuf};

/// Outcome of an init run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitReport {
    pub database: PathBuf,
    pub config_file: PathBuf,
    /// `false` when an existing config file was left alone.
    pub config_written: bool,
}

pub fn init(config: &Config, config_path: Option<&Path>) -> Result<InitReport> {
    let store = open_store(&config.database_path)?;
    tracing::info!(path = %config.database_path.display(), rows = store.count()?, "database ready");

    let config_file = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config_written = !config_file.exists();
    if config_written {
        config.write_to(&config_file)?;
    }
    Ok(InitReport {
        database: config.database_path.clone(),
        config_file,
        config_written,
    })
}

pub fn run(config: &Config, config_path: Option<&Path>, out: Output) -> Result<()> {
    let report = init(config, config_path)?;
    let body = json!({
        "database": report.database,
        "config_file": report.config_file,
        "config_written": report.config_written,
    });
    out.emit(&body, || {
        let cfg = if report.config_written {
            format!("  Wrote {}", report.config_file.display())
        } else {
            format!("  Kept existing {}", report.config_file.display())
        };
        format!("  Database ready at {}\n{cfg}", report.database.display())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_database_and_config_once() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            database_path: dir.path().join("data").join("charger_data.db"),
            ..Config::default()
        };
        let cfg_path = dir.path().join("config.json");

        let first = init(&config, Some(&cfg_path)).unwrap();
        assert!(first.config_written);
        assert!(config.database_path.exists());
        assert_eq!(Config::from_file(&cfg_path).unwrap(), config);

        let second = init(&config, Some(&cfg_path)).unwrap();
        assert!(!second.config_written);
    }
}
