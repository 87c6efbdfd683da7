// Copyright 2026 Chargewatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! CLI subcommand implementations for the Chargewatch binary.

pub mod analyze_cmd;
pub mod init_cmd;
pub mod logging;
pub mod output;
pub mod run_cmd;
pub mod store_cmd;
pub mod widget_cmd;

use crate::config::{resolve_config_path, Config};
use anyhow::{Context, Result};
use chargewatch::Store;
use output::Output;
use std::path::{Path, PathBuf};
use tokio::sync::watch;

/// Flags accepted by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct GlobalOpts {
    pub config: Option<PathBuf>,
    pub db: Option<PathBuf>,
    pub output: Output,
}

impl GlobalOpts {
    /// Layered config with `--db` applied; not yet validated.
    pub fn load_config(&self) -> Result<Config> {
        let path = resolve_config_path(self.config.as_deref());
        let mut config = Config::load(path.as_deref()).context("failed to load configuration")?;
        if let Some(db) = &self.db {
            config.database_path = db.clone();
        }
        Ok(config)
    }
}

/// Open (creating if needed) the configured database.
pub fn open_store(path: &Path) -> Result<Store> {
    Store::open(path).with_context(|| format!("failed to open database {}", path.display()))
}

/// Shutdown channel flipped by Ctrl-C or SIGTERM.
pub fn shutdown_channel() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("received shutdown signal");
        let _ = tx.send(true);
    });
    rx
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "cannot listen for SIGTERM");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
