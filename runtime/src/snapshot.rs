// Copyright 2026 Chargewatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Latest-status snapshot file for external distribution.
//!
//! After every check the runtime can publish a small JSON document that a
//! remote mirror serves to disconnected clients (see [`crate::widget`]).

use chargewatch::{timestamp_key, Observation, Status};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// `source` value written by the publisher.
pub const SOURCE_SCRAPER: &str = "scraper";

/// Wire shape shared by the published snapshot and the widget output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub source: String,
}

impl StatusReport {
    /// Report for a stored observation.
    pub fn from_observation(observation: &Observation, source: &str) -> Self {
        let ts = observation.key();
        Self {
            status: observation.status,
            timestamp: Some(ts.clone()),
            last_updated: Some(ts),
            source: source.to_string(),
        }
    }

    /// Report used when nothing better is available.
    pub fn unknown(source: &str) -> Self {
        Self {
            status: Status::Unknown,
            timestamp: None,
            last_updated: Some(timestamp_key(&Utc::now())),
            source: source.to_string(),
        }
    }
}

/// Writes the snapshot atomically (temp file, then rename).
#[derive(Debug, Clone)]
pub struct SnapshotPublisher {
    path: PathBuf,
}

impl SnapshotPublisher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn publish(&self, observation: &Observation) -> anyhow::Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let report = StatusReport {
            last_updated: Some(timestamp_key(&Utc::now())),
            ..StatusReport::from_observation(observation, SOURCE_SCRAPER)
        };
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(&report)?)?;
        std::fs::rename(&tmp, &self.path)?;
        tracing::debug!(path = %self.path.display(), status = %observation.status, "published snapshot");
        Ok(())
    }
}
