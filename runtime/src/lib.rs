// Copyright 2026 Chargewatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Chargewatch runtime library: scheduled status acquisition, the REST API,
//! the widget fallback chain, and the CLI behind the `chargewatch` binary.
//!
//! This library crate exposes the modules for integration testing.

pub mod check;
pub mod cli;
pub mod config;
pub mod fetch;
pub mod rest;
pub mod scheduler;
pub mod snapshot;
pub mod widget;

pub use check::{CheckError, CheckOutcome, Checker};
pub use config::{Config, ConfigError};
pub use fetch::{HttpFetcher, PageSource, TransportError};
pub use scheduler::{Scheduler, SchedulerConfig, SchedulerState};
pub use snapshot::{SnapshotPublisher, StatusReport};
