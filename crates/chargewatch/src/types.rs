// Copyright 2026 Chargewatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Core data types for charger observations.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Discrete charger state as read from the source page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "Available")]
    Available,
    #[serde(rename = "In Use")]
    InUse,
    #[serde(rename = "Out of Order")]
    OutOfOrder,
    #[default]
    #[serde(rename = "Unknown")]
    Unknown,
}

impl Status {
    /// All four states, in declaration order.
    pub const ALL: [Status; 4] = [
        Status::Available,
        Status::InUse,
        Status::OutOfOrder,
        Status::Unknown,
    ];

    /// Persisted/wire label. Matches the `CHECK` constraint of the store table.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::InUse => "In Use",
            Self::OutOfOrder => "Out of Order",
            Self::Unknown => "Unknown",
        }
    }

    /// Fractional utilization in [0,1]; `None` for readings excluded from analysis.
    pub fn utilization(self) -> Option<f64> {
        match self {
            Self::Available => Some(0.0),
            Self::InUse => Some(1.0),
            Self::OutOfOrder => Some(0.5),
            Self::Unknown => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unrecognized status label '{s}'"))
    }
}

/// One timestamped status reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub status: Status,
}

impl Observation {
    pub fn new(timestamp: DateTime<Utc>, status: Status) -> Self {
        Self { timestamp, status }
    }

    /// Stamp a status with the current wall-clock time, at store precision.
    pub fn now(status: Status) -> Self {
        Self::new(Utc::now().trunc_subsecs(6), status)
    }

    /// Primary key of the observation in the store.
    pub fn key(&self) -> String {
        timestamp_key(&self.timestamp)
    }

    /// Reinterpret as a utilization sample; `None` for `Unknown`.
    pub fn sample(&self) -> Option<UtilizationSample> {
        self.status.utilization().map(|utilization| UtilizationSample {
            timestamp: self.timestamp,
            utilization,
        })
    }
}

/// An observation reinterpreted as fractional busy-ness.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UtilizationSample {
    pub timestamp: DateTime<Utc>,
    pub utilization: f64,
}

/// Fixed-width ISO-8601 UTC rendering so lexical order equals time order.
pub fn timestamp_key(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Errors raised by the observation store.
#[derive(thiserror::Error, Debug)]
pub enum PersistenceError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt row at {timestamp}: {reason}")]
    Corrupt { timestamp: String, reason: String },
}

/// An extraction probe that could not be compiled.
#[derive(thiserror::Error, Debug)]
#[error("Invalid probe selector '{selector}': {reason}")]
pub struct ProbeError {
    pub selector: String,
    pub reason: String,
}

/// Convenience result type for store operations.
pub type StoreResult<T> = Result<T, PersistenceError>;
