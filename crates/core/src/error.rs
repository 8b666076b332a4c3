// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for tk-core operations.

use thiserror::Error;

/// All possible errors that can occur in tk-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("clock record not found: {0}")]
    RecordNotFound(String),

    #[error("clock record already exists: {0}")]
    DuplicateRecord(String),

    #[error("local storage is full\n  hint: free disk space or run 'tock cleanup'")]
    StorageFull,

    #[error("local storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("invalid action: '{0}'\n  hint: valid actions are: clock_in, clock_out")]
    InvalidAction(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupted data: {0}")]
    CorruptedData(String),
}

impl Error {
    /// Returns true for failures of the local store itself (as opposed to
    /// lookups or malformed input).
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Error::StorageFull | Error::StorageUnavailable(_) | Error::Database(_) | Error::Io(_)
        )
    }
}

/// A specialized Result type for tk-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
