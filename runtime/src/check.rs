// Copyright 2026 Chargewatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! One acquisition cycle: fetch, extract, store, publish.

use crate::fetch::PageSource;
use crate::snapshot::SnapshotPublisher;
use chargewatch::extract::Evidence;
use chargewatch::{Extractor, Observation, PersistenceError, Status, Store};
use chrono::{DateTime, SubsecRound, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;

/// A cycle that could not record its observation.
#[derive(thiserror::Error, Debug)]
pub enum CheckError {
    #[error("failed to persist observation: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Result of a completed cycle.
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub observation: Observation,
    /// Which probe or rule decided the status, if any.
    pub evidence: Option<Evidence>,
    /// Transport failure that forced `Unknown`, if any.
    pub transport_error: Option<String>,
}

impl CheckOutcome {
    pub fn status(&self) -> Status {
        self.observation.status
    }
}

/// Runs acquisition cycles against a shared store.
pub struct Checker {
    source: Arc<dyn PageSource>,
    extractor: Extractor,
    store: Arc<Store>,
    publisher: Option<SnapshotPublisher>,
    /// Held for the whole cycle. Keeps store keys strictly increasing.
    last_stamp: Mutex<Option<DateTime<Utc>>>,
}

impl Checker {
    pub fn new(source: Arc<dyn PageSource>, store: Arc<Store>) -> Self {
        Self {
            source,
            extractor: Extractor::default(),
            store,
            publisher: None,
            last_stamp: Mutex::new(None),
        }
    }

    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_publisher(mut self, publisher: Option<SnapshotPublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Run one cycle. Concurrent callers wait for the cycle in flight.
    ///
    /// Transport failures are absorbed into an `Unknown` observation; only a
    /// storage failure is returned as an error.
    pub async fn check(&self) -> Result<CheckOutcome, CheckError> {
        let mut last_stamp = self.last_stamp.lock().await;
        tracing::info!(source = %self.source.describe(), "checking charger status");

        let (status, evidence, transport_error) = match self.source.fetch().await {
            Ok(document) => {
                let extraction = self.extractor.explain(&document);
                tracing::debug!(status = %extraction.status, evidence = ?extraction.evidence, "extracted status");
                (extraction.status, extraction.evidence, None)
            }
            Err(e) => {
                tracing::warn!(error = %e, "fetch failed, recording Unknown");
                (Status::Unknown, None, Some(e.to_string()))
            }
        };

        let mut stamp = Utc::now().trunc_subsecs(6);
        if let Some(prev) = *last_stamp {
            if stamp <= prev {
                stamp = prev + chrono::Duration::microseconds(1);
            }
        }
        *last_stamp = Some(stamp);

        let observation = Observation::new(stamp, status);
        if let Err(e) = self.store.insert_or_replace(&observation) {
            tracing::error!(error = %e, "failed to store observation");
            return Err(e.into());
        }
        tracing::info!(status = %status, timestamp = %observation.key(), "stored observation");

        if let Some(publisher) = &self.publisher {
            if let Err(e) = publisher.publish(&observation) {
                tracing::warn!(path = %publisher.path().display(), error = %e, "failed to publish snapshot");
            }
        }

        Ok(CheckOutcome {
            observation,
            evidence,
            transport_error,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    fn checker(source: ScriptedSource) -> (Checker, Arc<Store>) {
        let store = Arc::new(Store::open_in_memory().unwrap());
        (Checker::new(Arc::new(source), store.clone()), store)
    }

    #[tokio::test]
    async fn test_check_stores_extracted_status() {
        let (checker, store) = checker(ScriptedSource::page(AVAILABLE_PAGE));
        let outcome = checker.check().await.unwrap();
        assert_eq!(outcome.status(), Status::Available);
        assert!(outcome.evidence.is_some());
        assert!(outcome.transport_error.is_none());
        assert_eq!(store.latest().unwrap().unwrap(), outcome.observation);
    }

    #[tokio::test]
    async fn test_transport_failure_records_unknown() {
        let (checker, store) =
            checker(ScriptedSource::new(vec![Err(Duration::from_secs(30))]));
        let outcome = checker.check().await.unwrap();
        assert_eq!(outcome.status(), Status::Unknown);
        assert!(outcome.transport_error.unwrap().contains("timed out"));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_check_publishes_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        let (checker, _store) = checker(ScriptedSource::page(IN_USE_PAGE));
        let checker = checker.with_publisher(Some(SnapshotPublisher::new(&path)));
        checker.check().await.unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["status"], "In Use");
    }

    #[tokio::test]
    async fn test_unwritable_snapshot_does_not_fail_cycle() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be makes the rename fail.
        let path = dir.path().join("blocked");
        std::fs::create_dir_all(path.join("inner")).unwrap();
        let (checker, store) = checker(ScriptedSource::page(AVAILABLE_PAGE));
        let checker = checker.with_publisher(Some(SnapshotPublisher::new(&path)));
        assert!(checker.check().await.is_ok());
        assert_eq!(store.count().unwrap(), 1);
    }

    struct SlowSource {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl PageSource for SlowSource {
        async fn fetch(&self) -> Result<String, crate::fetch::TransportError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(AVAILABLE_PAGE.to_string())
        }

        fn describe(&self) -> String {
            "slow".into()
        }
    }

    #[tokio::test]
    async fn test_concurrent_checks_are_serialized() {
        let source = Arc::new(SlowSource {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let store = Arc::new(Store::open_in_memory().unwrap());
        let checker = Arc::new(Checker::new(source.clone(), store));
        let a = tokio::spawn({
            let c = checker.clone();
            async move { c.check().await }
        });
        let b = tokio::spawn({
            let c = checker.clone();
            async move { c.check().await }
        });
        assert!(a.await.unwrap().is_ok());
        assert!(b.await.unwrap().is_ok());
        assert_eq!(source.peak.load(Ordering::SeqCst), 1);
    }
}
