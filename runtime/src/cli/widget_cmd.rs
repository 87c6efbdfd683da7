// Copyright 2026 Chargewatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! `chargewatch widget`: status JSON for desktop widgets.

use crate::cli::output::Output;
use crate::widget::{FallbackChain, LocalStoreSource, RemoteSnapshotSource, DEFAULT_DB_CANDIDATES};
use anyhow::Result;
use std::path::PathBuf;

/// Remote snapshot first (if given), then `candidates` (or the defaults).
pub fn build_chain(remote: Option<String>, candidates: Vec<PathBuf>) -> FallbackChain {
    let candidates = if candidates.is_empty() {
        DEFAULT_DB_CANDIDATES.iter().map(PathBuf::from).collect()
    } else {
        candidates
    };
    let mut chain = FallbackChain::new();
    if let Some(url) = remote {
        chain = chain.push(RemoteSnapshotSource::new(url));
    }
    chain.push(LocalStoreSource::new(candidates))
}

/// Always prints JSON; the widget host parses stdout.
pub async fn run(remote: Option<String>, candidates: Vec<PathBuf>, out: Output) -> Result<()> {
    let report = build_chain(remote, candidates).resolve().await;
    out.print_json(&report)
}
