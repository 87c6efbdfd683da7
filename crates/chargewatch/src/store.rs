// Copyright 2026 Chargewatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Append-only observation store backed by SQLite.
//!
//! One table, `utilization(timestamp TEXT PRIMARY KEY, status TEXT)`.
//! Writes are single-row upserts committed before returning; the database
//! runs in WAL mode so other connections (the API process, the widget
//! reader) can read while the scheduler writes.

use crate::types::{timestamp_key, Observation, PersistenceError, Status, StoreResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Upper bound applied by readers exposing history to callers.
pub const MAX_HISTORY_LIMIT: usize = 1000;

/// Default number of rows returned by history readers.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Clamp a caller-supplied history limit into `0..=MAX_HISTORY_LIMIT`.
/// Negative requests become zero.
pub fn clamp_history_limit(requested: i64) -> usize {
    requested.clamp(0, MAX_HISTORY_LIMIT as i64) as usize
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS utilization (
    timestamp TEXT PRIMARY KEY,
    status TEXT CHECK(status IN ('Available', 'In Use', 'Out of Order', 'Unknown'))
);";

/// Timestamp-keyed observation table.
pub struct Store {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl Store {
    /// Open or create a store at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        let mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        tracing::debug!(path = %path.display(), journal_mode = %mode, "opened observation store");
        Self::init(conn, Some(path.to_path_buf()))
    }

    /// Open an existing store without creating one; `Ok(None)` if absent.
    pub fn open_existing(path: impl AsRef<Path>) -> StoreResult<Option<Self>> {
        let path = path.as_ref();
        if !path.is_file() {
            return Ok(None);
        }
        Self::open(path).map(Some)
    }

    /// Open an existing store for reading only; `Ok(None)` if absent.
    /// Neither the schema nor the journal mode is touched, and every write
    /// through the handle fails.
    pub fn open_read_only(path: impl AsRef<Path>) -> StoreResult<Option<Self>> {
        let path = path.as_ref();
        if !path.is_file() {
            return Ok(None);
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(Duration::from_secs(5))?;
        tracing::debug!(path = %path.display(), "opened observation store read-only");
        Ok(Some(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        }))
    }

    /// Private in-memory store.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Database file, if not in-memory.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock cannot leave a half-written row:
        // every write is one autocommitted statement.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Idempotent upsert keyed by timestamp; the latest write wins.
    pub fn insert_or_replace(&self, observation: &Observation) -> StoreResult<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO utilization (timestamp, status) VALUES (?1, ?2)",
            params![observation.key(), observation.status.as_str()],
        )?;
        Ok(())
    }

    /// Observation with the greatest timestamp.
    pub fn latest(&self) -> StoreResult<Option<Observation>> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT timestamp, status FROM utilization ORDER BY timestamp DESC LIMIT 1",
                [],
                raw_row,
            )
            .optional()?;
        row.map(decode).transpose()
    }

    /// Up to `limit` observations, most recent first.
    pub fn range(&self, limit: usize) -> StoreResult<Vec<Observation>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT timestamp, status FROM utilization ORDER BY timestamp DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit as i64], raw_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(decode).collect()
    }

    /// Observations with `timestamp >= cutoff`, oldest first.
    pub fn since(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<Observation>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT timestamp, status FROM utilization WHERE timestamp >= ?1 ORDER BY timestamp ASC",
        )?;
        let rows = stmt
            .query_map(params![timestamp_key(&cutoff)], raw_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(decode).collect()
    }

    /// Total number of stored observations.
    pub fn count(&self) -> StoreResult<usize> {
        let n: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM utilization", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

fn raw_row(row: &Row<'_>) -> rusqlite::Result<(String, String)> {
    Ok((row.get(0)?, row.get(1)?))
}

fn decode((timestamp, status): (String, String)) -> StoreResult<Observation> {
    let ts = DateTime::parse_from_rfc3339(&timestamp)
        .map_err(|e| PersistenceError::Corrupt {
            timestamp: timestamp.clone(),
            reason: e.to_string(),
        })?
        .with_timezone(&Utc);
    let status = status
        .parse::<Status>()
        .map_err(|reason| PersistenceError::Corrupt { timestamp, reason })?;
    Ok(Observation::new(ts, status))
}
