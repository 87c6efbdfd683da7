// Copyright 2026 Chargewatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Acquisition scheduler.
//!
//! Runs one check immediately, then one check per interval until the
//! shutdown channel flips to `true`. Sleeps are taken in bounded slices and
//! raced against the shutdown channel, so a stop request is honoured at the
//! next slice boundary at the latest. A check that has started always runs
//! to completion and its result is persisted before the loop exits.

use crate::check::Checker;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

const DEFAULT_INTERVAL_SECS: u64 = 5 * 60;
const DEFAULT_SLICE_SECS: u64 = 30;
const DEFAULT_ERROR_BACKOFF_SECS: u64 = 60;

/// Timing knobs for [`Scheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Time between the starts of consecutive checks.
    pub interval: Duration,
    /// Longest uninterrupted sleep.
    pub slice: Duration,
    /// Pause after a check task dies abnormally.
    pub error_backoff: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            slice: Duration::from_secs(DEFAULT_SLICE_SECS),
            error_backoff: Duration::from_secs(DEFAULT_ERROR_BACKOFF_SECS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    Running,
    Sleeping,
    Checking,
    Stopped,
}

/// Drives a [`Checker`] on a fixed cadence.
pub struct Scheduler {
    checker: Arc<Checker>,
    config: SchedulerConfig,
    state: watch::Sender<SchedulerState>,
}

impl Scheduler {
    pub fn new(checker: Arc<Checker>, config: SchedulerConfig) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self {
            checker,
            config,
            state,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    /// Run until `shutdown` carries `true` (or its sender is dropped).
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> SchedulerState {
        self.set(SchedulerState::Running);
        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            slice_secs = self.config.slice.as_secs(),
            "scheduler started"
        );

        let mut next_due = Instant::now();
        loop {
            if *shutdown.borrow() {
                break;
            }

            let now = Instant::now();
            if now >= next_due {
                next_due = now + self.config.interval;
                if !self.cycle().await {
                    self.set(SchedulerState::Sleeping);
                    tracing::warn!(
                        backoff_secs = self.config.error_backoff.as_secs(),
                        "backing off after check failure"
                    );
                    if !pause(self.config.error_backoff, &mut shutdown).await {
                        break;
                    }
                }
                continue;
            }

            self.set(SchedulerState::Sleeping);
            let nap = self.config.slice.min(next_due - now);
            if !pause(nap, &mut shutdown).await {
                break;
            }
        }

        self.set(SchedulerState::Stopped);
        tracing::info!("scheduler stopped");
        SchedulerState::Stopped
    }

    /// One isolated check. Returns `false` if the check task died.
    async fn cycle(&self) -> bool {
        self.set(SchedulerState::Checking);
        let checker = self.checker.clone();
        match tokio::spawn(async move { checker.check().await }).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                // Storage failures skip this cycle only.
                tracing::warn!(error = %e, "check cycle failed");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "check task aborted");
                false
            }
        }
    }

    fn set(&self, state: SchedulerState) {
        self.state.send_replace(state);
    }
}

/// Sleep for `duration` unless shutdown is requested first.
/// Returns `false` when the caller should stop.
async fn pause(duration: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => !*shutdown.borrow(),
        changed = shutdown.changed() => changed.is_ok() && !*shutdown.borrow(),
    }
}
