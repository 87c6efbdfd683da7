// Copyright 2026 Chargewatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Long-running modes: the acquisition scheduler and the REST API.

use crate::check::Checker;
use crate::cli::{open_store, GlobalOpts};
use crate::config::Config;
use crate::fetch::HttpFetcher;
use crate::rest::{self, AppState};
use crate::scheduler::Scheduler;
use crate::snapshot::SnapshotPublisher;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Wire fetcher, store, and optional snapshot publisher from `config`.
pub fn build_checker(config: &Config) -> Result<Arc<Checker>> {
    let store = Arc::new(open_store(&config.database_path)?);
    let fetcher = HttpFetcher::new(config.source_url.clone(), config.timeout())
        .context("failed to build HTTP client")?;
    let publisher = config.snapshot_path.clone().map(SnapshotPublisher::new);
    Ok(Arc::new(
        Checker::new(Arc::new(fetcher), store).with_publisher(publisher),
    ))
}

/// `chargewatch run`: scheduler in the foreground, REST API alongside if asked.
pub async fn run(
    opts: &GlobalOpts,
    config: Config,
    http_port: Option<u16>,
    shutdown: watch::Receiver<bool>,
) -> Result<()> {
    config.validate()?;
    let checker = build_checker(&config)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        url = %config.source_url,
        interval_minutes = config.interval_minutes,
        database = %config.database_path.display(),
        "starting charger monitor"
    );

    // Bind before the first check so a busy port is a startup error.
    let api = match http_port {
        Some(port) => {
            let listener = rest::bind(port).await?;
            let state = AppState::new(checker.clone());
            let rx = shutdown.clone();
            Some(tokio::spawn(rest::serve(listener, state, rx)))
        }
        None => None,
    };

    let scheduler = Scheduler::new(checker, config.scheduler());
    let state = scheduler.run(shutdown).await;

    if let Some(handle) = api {
        handle.await.context("REST API task failed")??;
    }

    if !opts.output.is_json() {
        eprintln!("  Monitor stopped ({state:?}).");
    }
    Ok(())
}

/// `chargewatch serve`: REST API only.
pub async fn serve(config: Config, shutdown: watch::Receiver<bool>) -> Result<()> {
    config.validate()?;
    let checker = build_checker(&config)?;
    info!(port = config.port, database = %config.database_path.display(), "starting REST API");
    rest::start(config.port, AppState::new(checker), shutdown).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chargewatch::Store;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> Config {
        Config {
            source_url: "http://127.0.0.1:9/station".to_string(),
            database_path: dir.path().join("charger_data.db"),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_busy_http_port_fails_before_any_check() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let db = config.database_path.clone();
        let taken = std::net::TcpListener::bind("0.0.0.0:0").unwrap();
        let port = taken.local_addr().unwrap().port();
        let (_tx, rx) = watch::channel(false);

        let err = run(&GlobalOpts::default(), config, Some(port), rx)
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("failed to bind REST API"));
        assert_eq!(Store::open(&db).unwrap().count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            interval_minutes: 0,
            ..config_in(&dir)
        };
        let (_tx, rx) = watch::channel(false);
        assert!(serve(config, rx).await.is_err());
    }
}
