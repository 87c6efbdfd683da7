// Copyright 2026 Chargewatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Status lookup for the desktop widget.
//!
//! The widget may run far from the scraper, so it tries a list of sources in
//! order: the published remote snapshot, then any local database it can
//! find, then a fixed `Unknown` report.

use crate::fetch::BROWSER_USER_AGENT;
use crate::snapshot::StatusReport;
use async_trait::async_trait;
use chargewatch::Store;
use std::path::PathBuf;
use std::time::Duration;

pub const SOURCE_REMOTE: &str = "remote";
pub const SOURCE_LOCAL_DB: &str = "local_db";
pub const SOURCE_FALLBACK: &str = "fallback";

pub const REMOTE_TIMEOUT: Duration = Duration::from_secs(10);

/// Database locations probed when none are given.
pub const DEFAULT_DB_CANDIDATES: [&str; 3] =
    ["charger_data.db", "../charger_data.db", "../../charger_data.db"];

/// One place a status report might come from.
#[async_trait]
pub trait StatusSource: Send + Sync {
    fn name(&self) -> &str;

    /// `None` means "try the next source".
    async fn load(&self) -> Option<StatusReport>;
}

/// The snapshot file served over HTTP.
pub struct RemoteSnapshotSource {
    client: reqwest::Client,
    url: String,
}

impl RemoteSnapshotSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_timeout(url, REMOTE_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(BROWSER_USER_AGENT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl StatusSource for RemoteSnapshotSource {
    fn name(&self) -> &str {
        SOURCE_REMOTE
    }

    async fn load(&self) -> Option<StatusReport> {
        let resp = match self.client.get(&self.url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::debug!(url = %self.url, error = %e, "remote snapshot unreachable");
                return None;
            }
        };
        if !resp.status().is_success() {
            tracing::debug!(url = %self.url, status = resp.status().as_u16(), "remote snapshot rejected");
            return None;
        }
        match resp.json::<StatusReport>().await {
            Ok(mut report) => {
                report.source = SOURCE_REMOTE.to_string();
                Some(report)
            }
            Err(e) => {
                tracing::debug!(url = %self.url, error = %e, "remote snapshot malformed");
                None
            }
        }
    }
}

/// The newest row of the first existing database among `candidates`.
pub struct LocalStoreSource {
    candidates: Vec<PathBuf>,
}

impl LocalStoreSource {
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self { candidates }
    }

    fn read_latest(&self) -> Option<StatusReport> {
        for path in &self.candidates {
            let store = match Store::open_read_only(path) {
                Ok(Some(store)) => store,
                Ok(None) => continue,
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "cannot open database");
                    continue;
                }
            };
            match store.latest() {
                Ok(Some(observation)) => {
                    return Some(StatusReport::from_observation(&observation, SOURCE_LOCAL_DB))
                }
                Ok(None) => continue,
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "cannot read database");
                }
            }
        }
        None
    }
}

impl Default for LocalStoreSource {
    fn default() -> Self {
        Self::new(DEFAULT_DB_CANDIDATES.iter().map(PathBuf::from).collect())
    }
}

#[async_trait]
impl StatusSource for LocalStoreSource {
    fn name(&self) -> &str {
        SOURCE_LOCAL_DB
    }

    async fn load(&self) -> Option<StatusReport> {
        self.read_latest()
    }
}

/// Ordered sources; the first `Some` wins.
#[derive(Default)]
pub struct FallbackChain {
    sources: Vec<Box<dyn StatusSource>>,
}

impl FallbackChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, source: impl StatusSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub async fn resolve(&self) -> StatusReport {
        for source in &self.sources {
            if let Some(report) = source.load().await {
                tracing::debug!(source = source.name(), status = %report.status, "status resolved");
                return report;
            }
        }
        StatusReport::unknown(SOURCE_FALLBACK)
    }
}
