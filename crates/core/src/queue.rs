// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite-backed local durable queue for offline clock records.
//!
//! The [`ClockQueue`] keeps every captured record until the remote system has
//! confirmed it and the retention window has passed. Pending records are read
//! in insertion order through the `(synced, seq)` index.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use std::path::Path;

use crate::clock::format_timestamp;
use crate::error::{Error, Result};
use crate::record::OfflineClockRecord;

/// Version stored in `PRAGMA user_version` once migrations have run.
pub const STORE_SCHEMA_VERSION: i64 = 1;

const LAST_SYNC_KEY: &str = "last_sync_at";

/// SQL schema for the offline queue.
pub const SCHEMA: &str = r#"
-- Clock events awaiting (or recently granted) confirmation
CREATE TABLE IF NOT EXISTS offline_clock_records (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    schema_version INTEGER NOT NULL,
    user_id TEXT NOT NULL,
    user_name TEXT NOT NULL,
    action TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    store_id TEXT NOT NULL,
    location TEXT,                   -- JSON GeoPoint
    device_info TEXT,                -- opaque JSON
    synced INTEGER NOT NULL DEFAULT 0 CHECK (synced IN (0, 1)),
    sync_attempts INTEGER NOT NULL DEFAULT 0,
    last_sync_error TEXT,
    last_sync_attempt TEXT,
    server_record_id TEXT,
    created_at TEXT NOT NULL,
    synced_at TEXT
);

-- Small key/value state that must survive restarts
CREATE TABLE IF NOT EXISTS sync_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- Scratch table for writability probes
CREATE TABLE IF NOT EXISTS write_probe (
    id INTEGER PRIMARY KEY,
    probed_at TEXT NOT NULL
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_records_synced_seq ON offline_clock_records(synced, seq);
CREATE INDEX IF NOT EXISTS idx_records_synced_at ON offline_clock_records(synced, synced_at);
"#;

const SELECT_COLUMNS: &str = "id, schema_version, user_id, user_name, action, timestamp, store_id,
    location, device_info, synced, sync_attempts, last_sync_error, last_sync_attempt,
    server_record_id, created_at, synced_at";

/// Maps SQLite failures onto the storage error taxonomy.
fn classify(err: rusqlite::Error) -> Error {
    if let rusqlite::Error::SqliteFailure(ref failure, _) = err {
        match failure.code {
            ErrorCode::DiskFull => return Error::StorageFull,
            ErrorCode::ReadOnly
            | ErrorCode::CannotOpen
            | ErrorCode::PermissionDenied
            | ErrorCode::NotADatabase
            | ErrorCode::SystemIoFailure => return Error::StorageUnavailable(err.to_string()),
            _ => {}
        }
    }
    Error::Database(err)
}

fn conversion_error(message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(Error::CorruptedData(message)),
    )
}

/// Parse a string value from the database, returning a rusqlite error on parse failure.
fn parse_db<T: std::str::FromStr>(
    value: &str,
    column: &str,
) -> std::result::Result<T, rusqlite::Error> {
    value
        .parse()
        .map_err(|_| conversion_error(format!("invalid value '{value}' in column '{column}'")))
}

/// Parse an RFC3339 timestamp from the database.
fn parse_timestamp(
    value: &str,
    column: &str,
) -> std::result::Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| conversion_error(format!("invalid timestamp '{value}' in column '{column}'")))
}

fn parse_timestamp_opt(
    value: Option<String>,
    column: &str,
) -> std::result::Result<Option<DateTime<Utc>>, rusqlite::Error> {
    value.map(|v| parse_timestamp(&v, column)).transpose()
}

fn parse_json_opt<T: serde::de::DeserializeOwned>(
    value: Option<String>,
    column: &str,
) -> std::result::Result<Option<T>, rusqlite::Error> {
    match value {
        None => Ok(None),
        Some(s) => serde_json::from_str(&s)
            .map(Some)
            .map_err(|_| conversion_error(format!("invalid JSON in column '{column}'"))),
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> std::result::Result<OfflineClockRecord, rusqlite::Error> {
    let action: String = row.get(4)?;
    let timestamp: String = row.get(5)?;
    let created_at: String = row.get(14)?;
    let synced: i64 = row.get(9)?;
    let attempts: i64 = row.get(10)?;

    Ok(OfflineClockRecord {
        id: row.get(0)?,
        schema_version: row.get(1)?,
        user_id: row.get(2)?,
        user_name: row.get(3)?,
        action: parse_db(&action, "action")?,
        timestamp: parse_timestamp(&timestamp, "timestamp")?,
        store_id: row.get(6)?,
        location: parse_json_opt(row.get(7)?, "location")?,
        device_info: parse_json_opt(row.get(8)?, "device_info")?,
        synced: synced != 0,
        sync_attempts: u32::try_from(attempts)
            .map_err(|_| conversion_error(format!("invalid sync_attempts {attempts}")))?,
        last_sync_error: row.get(11)?,
        last_sync_attempt: parse_timestamp_opt(row.get(12)?, "last_sync_attempt")?,
        server_record_id: row.get(13)?,
        created_at: parse_timestamp(&created_at, "created_at")?,
        synced_at: parse_timestamp_opt(row.get(15)?, "synced_at")?,
    })
}

fn to_json_opt<T: serde::Serialize>(value: &Option<T>) -> Result<Option<String>> {
    value
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(Error::from)
}

/// Run schema creation and all migrations on a database connection.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version > STORE_SCHEMA_VERSION {
        return Err(Error::CorruptedData(format!(
            "queue schema version {version} is newer than supported version {STORE_SCHEMA_VERSION}"
        )));
    }

    conn.execute_batch(SCHEMA)?;
    if version < STORE_SCHEMA_VERSION {
        tracing::debug!(from = version, to = STORE_SCHEMA_VERSION, "migrating queue schema");
        conn.execute_batch(&format!("PRAGMA user_version = {STORE_SCHEMA_VERSION}"))?;
    }
    Ok(())
}

/// Applies the mutable sync state of `record`. Returns the number of rows changed.
///
/// The guards keep the record invariants even if a caller passes stale data:
/// a confirmed record never reverts to pending, the attempt counter never
/// decreases, and the first server id and sync time are kept.
fn write_sync_state(conn: &Connection, record: &OfflineClockRecord) -> Result<usize> {
    let changed = conn
        .execute(
            "UPDATE offline_clock_records SET
                synced = MAX(synced, ?2),
                sync_attempts = MAX(sync_attempts, ?3),
                last_sync_error = ?4,
                last_sync_attempt = ?5,
                server_record_id = COALESCE(server_record_id, ?6),
                synced_at = COALESCE(synced_at, ?7)
             WHERE id = ?1",
            params![
                record.id,
                i64::from(record.synced),
                i64::from(record.sync_attempts),
                record.last_sync_error,
                record.last_sync_attempt.as_ref().map(format_timestamp),
                record.server_record_id,
                record.synced_at.as_ref().map(format_timestamp),
            ],
        )
        .map_err(classify)?;
    Ok(changed)
}

/// SQLite-backed durable queue of clock records.
pub struct ClockQueue {
    /// The underlying SQLite connection.
    conn: Connection,
}

impl ClockQueue {
    /// Open the queue at the given path, creating and migrating if needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path).map_err(classify)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = FULL;
             PRAGMA busy_timeout = 5000;",
        )
        .map_err(classify)?;

        run_migrations(&conn)?;
        Ok(ClockQueue { conn })
    }

    /// Open an in-memory queue (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;
        Ok(ClockQueue { conn })
    }

    /// Insert a newly captured record.
    ///
    /// The record is stored pending with zero attempts whatever the argument
    /// carries in its sync fields.
    pub fn insert(&mut self, record: &OfflineClockRecord) -> Result<()> {
        let location = to_json_opt(&record.location)?;
        let device_info = to_json_opt(&record.device_info)?;

        let result = self.conn.execute(
            "INSERT INTO offline_clock_records (id, schema_version, user_id, user_name, action,
             timestamp, store_id, location, device_info, synced, sync_attempts, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, 0, ?10)",
            params![
                record.id,
                record.schema_version,
                record.user_id,
                record.user_name,
                record.action.as_str(),
                format_timestamp(&record.timestamp),
                record.store_id,
                location,
                device_info,
                format_timestamp(&record.created_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(failure, _))
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                Err(Error::DuplicateRecord(record.id.clone()))
            }
            Err(e) => Err(classify(e)),
        }
    }

    /// Get a record by id.
    pub fn get(&self, id: &str) -> Result<OfflineClockRecord> {
        let record = self
            .conn
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM offline_clock_records WHERE id = ?1"),
                params![id],
                row_to_record,
            )
            .optional()?;

        record.ok_or_else(|| Error::RecordNotFound(id.to_string()))
    }

    /// Check if a record exists.
    pub fn exists(&self, id: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM offline_clock_records WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// All pending records, oldest first.
    ///
    /// Runs as a single statement, so the result is a consistent snapshot.
    pub fn list_unsynced(&self) -> Result<Vec<OfflineClockRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM offline_clock_records WHERE synced = 0 ORDER BY seq"
        ))?;
        let records = stmt
            .query_map([], row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Pending records that have failed at least `min_attempts` times.
    pub fn list_stalled(&self, min_attempts: u32) -> Result<Vec<OfflineClockRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM offline_clock_records
             WHERE synced = 0 AND sync_attempts >= ?1 ORDER BY seq"
        ))?;
        let records = stmt
            .query_map(params![i64::from(min_attempts)], row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Number of pending records.
    pub fn pending_count(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM offline_clock_records WHERE synced = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Replace the sync state of one record.
    ///
    /// Capture fields (identity, action, timestamp, store, location, device
    /// info) are immutable once written and are not touched.
    pub fn update(&mut self, record: &OfflineClockRecord) -> Result<()> {
        if write_sync_state(&self.conn, record)? == 0 {
            return Err(Error::RecordNotFound(record.id.clone()));
        }
        Ok(())
    }

    /// Replace the sync state of several records in one transaction.
    ///
    /// Either every record is updated or none is.
    pub fn update_many(&mut self, records: &[OfflineClockRecord]) -> Result<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(classify)?;
        for record in records {
            if write_sync_state(&tx, record)? == 0 {
                return Err(Error::RecordNotFound(record.id.clone()));
            }
        }
        tx.commit().map_err(classify)?;
        Ok(())
    }

    /// Delete confirmed records whose sync time is before `cutoff`.
    ///
    /// Pending records are never deleted, however old. Returns the number of
    /// records removed.
    pub fn delete_older_than_synced(&mut self, cutoff: DateTime<Utc>) -> Result<usize> {
        let deleted = self
            .conn
            .execute(
                "DELETE FROM offline_clock_records
                 WHERE synced = 1 AND synced_at IS NOT NULL AND synced_at < ?1",
                params![format_timestamp(&cutoff)],
            )
            .map_err(classify)?;
        if deleted > 0 {
            tracing::debug!(deleted, cutoff = %cutoff, "purged confirmed records");
        }
        Ok(deleted)
    }

    /// Cheap check that the store accepts writes: a trial insert and delete
    /// inside one transaction.
    pub fn probe_writable(&mut self) -> Result<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(classify)?;
        tx.execute(
            "INSERT INTO write_probe (probed_at) VALUES (?1)",
            params![format_timestamp(&Utc::now())],
        )
        .map_err(classify)?;
        tx.execute("DELETE FROM write_probe", []).map_err(classify)?;
        tx.commit().map_err(classify)?;
        Ok(())
    }

    /// Time of the last completed sync pass, if any.
    pub fn last_sync_at(&self) -> Result<Option<DateTime<Utc>>> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM sync_meta WHERE key = ?1",
                params![LAST_SYNC_KEY],
                |row| row.get(0),
            )
            .optional()?;
        Ok(parse_timestamp_opt(value, LAST_SYNC_KEY)?)
    }

    /// Persist the time of the last completed sync pass.
    pub fn set_last_sync_at(&mut self, at: DateTime<Utc>) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO sync_meta (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![LAST_SYNC_KEY, format_timestamp(&at)],
            )
            .map_err(classify)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
