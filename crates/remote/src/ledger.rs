// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Accepted clock events, keyed by `(user_id, offline_id)`.
//!
//! Recording the same offline id twice for a user returns the id assigned the
//! first time, which is what makes client retries safe.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection};

use tk_core::protocol::WireRecord;
use tk_core::{format_timestamp, Result};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS clock_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    offline_id TEXT NOT NULL,
    action TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    store_id TEXT NOT NULL,
    location TEXT,
    device_info TEXT,
    received_at TEXT NOT NULL,
    UNIQUE(user_id, offline_id)
);

CREATE INDEX IF NOT EXISTS idx_clock_events_user_time ON clock_events(user_id, timestamp);
"#;

/// Format a ledger row id as the id returned to clients.
pub fn server_record_id(rowid: i64) -> String {
    format!("clk-{:06}", rowid)
}

/// Why a record was refused, or `None` if it can be stored.
pub fn validate(record: &WireRecord, now: DateTime<Utc>, max_skew: Duration) -> Option<String> {
    if record.offline_id.trim().is_empty() {
        return Some("offlineId is required".to_string());
    }
    if record.store_id.trim().is_empty() {
        return Some("storeId is required".to_string());
    }
    let in_future = now
        .checked_add_signed(max_skew)
        .is_some_and(|latest| record.timestamp > latest);
    if in_future {
        return Some(format!(
            "timestamp {} is in the future",
            format_timestamp(&record.timestamp)
        ));
    }
    None
}

/// SQLite-backed ledger of accepted events.
pub struct Ledger {
    conn: Connection,
}

impl Ledger {
    /// Open or create the ledger at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")?;
        Self::init(conn)
    }

    /// In-memory ledger for tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Ledger { conn })
    }

    /// Store `record` for `user_id` and return its server id. The bool is
    /// false when the record was already present.
    pub fn record(
        &mut self,
        user_id: &str,
        record: &WireRecord,
        received_at: DateTime<Utc>,
    ) -> Result<(String, bool)> {
        let location = record.location.map(|l| serde_json::to_string(&l)).transpose()?;
        let device_info = record
            .device_info
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let inserted = self.conn.execute(
            "INSERT INTO clock_events
                (user_id, offline_id, action, timestamp, store_id, location, device_info, received_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(user_id, offline_id) DO NOTHING",
            params![
                user_id,
                record.offline_id,
                record.action.as_str(),
                format_timestamp(&record.timestamp),
                record.store_id,
                location,
                device_info,
                format_timestamp(&received_at),
            ],
        )?;

        let rowid: i64 = self.conn.query_row(
            "SELECT id FROM clock_events WHERE user_id = ?1 AND offline_id = ?2",
            params![user_id, record.offline_id],
            |row| row.get(0),
        )?;
        Ok((server_record_id(rowid), inserted > 0))
    }

    /// Number of stored events for `user_id`.
    pub fn count_for(&self, user_id: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM clock_events WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

#[cfg(test)]
#[path = "ledger_tests.rs"]
mod tests;
