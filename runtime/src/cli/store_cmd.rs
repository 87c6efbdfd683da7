// Copyright 2026 Chargewatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! One-shot commands: `check`, `latest`, `history`.

use crate::cli::output::Output;
use crate::cli::run_cmd::build_checker;
use crate::config::Config;
use anyhow::{Context, Result};
use chargewatch::{clamp_history_limit, Observation, Store};
use std::path::Path;
use serde_json::json;

/// Run a single acquisition cycle. Errors (exit 1) only if nothing was stored.
pub async fn check(config: Config, out: Output) -> Result<()> {
    config.validate()?;
    let checker = build_checker(&config)?;
    let outcome = checker.check().await?;
    let status = outcome.status();

    let body = json!({
        "success": true,
        "status": status,
        "timestamp": outcome.observation.key(),
        "transport_error": outcome.transport_error,
    });
    out.emit(&body, || match &outcome.transport_error {
        Some(e) => format!("  Status: {status} (fetch failed: {e})"),
        None => format!("  Status: {status}"),
    })
}

/// Open the database for reading. A missing file means no data and is left
/// uncreated.
fn open_for_reading(path: &Path) -> Result<Option<Store>> {
    let store = Store::open_existing(path)
        .with_context(|| format!("failed to open database {}", path.display()))?;
    if store.is_none() {
        tracing::warn!(path = %path.display(), "database not found");
    }
    Ok(store)
}

pub fn latest(config: &Config, out: Output) -> Result<()> {
    let latest = match open_for_reading(&config.database_path)? {
        Some(store) => store.latest()?,
        None => None,
    };
    match latest {
        Some(observation) => out.emit(&row(&observation), || {
            format!("  {}  {}", observation.key(), observation.status)
        }),
        None => out.emit(&json!({ "error": "No status data available" }), || {
            "  No status data available.".to_string()
        }),
    }
}

pub fn history(config: &Config, limit: i64, out: Output) -> Result<()> {
    let rows = match open_for_reading(&config.database_path)? {
        Some(store) => store.range(clamp_history_limit(limit))?,
        None => Vec::new(),
    };
    let data: Vec<_> = rows.iter().map(row).collect();
    out.emit(&json!({ "data": data, "count": data.len() }), || {
        if rows.is_empty() {
            return "  No observations recorded.".to_string();
        }
        rows.iter()
            .map(|o| format!("  {}  {}", o.key(), o.status))
            .collect::<Vec<_>>()
            .join("\n")
    })
}

fn row(observation: &Observation) -> serde_json::Value {
    json!({ "timestamp": observation.key(), "status": observation.status })
}
