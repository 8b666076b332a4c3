// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Server state management.
//!
//! Wraps the ledger and the token table for thread-safe access.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::Mutex;

use tk_core::protocol::{ErrorEntry, OriginalRef, ProcessedEntry, SyncDetails, SyncRequest, SyncResponse};
use tk_core::Result;

use crate::ledger::{validate, Ledger};

/// Shared server state containing the ledger and known credentials.
#[derive(Clone)]
pub struct ServerState {
    inner: Arc<ServerStateInner>,
}

struct ServerStateInner {
    /// Accepted events (protected by mutex for writes).
    ledger: Mutex<Ledger>,
    /// Token to user id.
    tokens: HashMap<String, String>,
    /// How far into the future a timestamp may be.
    max_skew: Duration,
}

impl ServerState {
    /// Creates a server state with the ledger in the given directory.
    pub fn new(data_dir: &Path, tokens: HashMap<String, String>, max_skew: Duration) -> Result<Self> {
        let ledger = Ledger::open(&data_dir.join("ledger.db"))?;
        Ok(Self::with_ledger(ledger, tokens, max_skew))
    }

    pub fn with_ledger(ledger: Ledger, tokens: HashMap<String, String>, max_skew: Duration) -> Self {
        ServerState {
            inner: Arc::new(ServerStateInner {
                ledger: Mutex::new(ledger),
                tokens,
                max_skew,
            }),
        }
    }

    /// User id for `token`, if the token is known.
    pub fn authenticate(&self, token: &str) -> Option<&str> {
        self.inner.tokens.get(token).map(String::as_str)
    }

    /// Validates and stores each record, answering per record.
    ///
    /// Only a ledger failure fails the whole batch.
    pub async fn process(&self, user_id: &str, request: &SyncRequest) -> Result<SyncResponse> {
        let now = Utc::now();
        let mut details = SyncDetails::default();
        let mut ledger = self.inner.ledger.lock().await;

        for record in &request.offline_records {
            let original = OriginalRef {
                offline_id: record.offline_id.clone(),
            };
            if let Some(error) = validate(record, now, self.inner.max_skew) {
                tracing::debug!(user_id, offline_id = %record.offline_id, %error, "record rejected");
                details.error_records.push(ErrorEntry { original, error });
                continue;
            }
            let (server_id, inserted) = ledger.record(user_id, record, now)?;
            if !inserted {
                tracing::debug!(user_id, offline_id = %record.offline_id, "duplicate submission");
            }
            details.processed_records.push(ProcessedEntry {
                original,
                processed: server_id,
            });
        }

        let stored_total = ledger.count_for(user_id)?;
        tracing::info!(
            user_id,
            processed = details.processed_records.len(),
            errors = details.error_records.len(),
            stored_total,
            "sync batch handled"
        );
        Ok(SyncResponse::success(details))
    }
}

/// Parse a `USER_ID=TOKEN` argument.
pub fn parse_token_pair(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((user, token)) if !user.trim().is_empty() && !token.trim().is_empty() => {
            Ok((user.trim().to_string(), token.trim().to_string()))
        }
        _ => Err(format!("expected USER_ID=TOKEN, got '{}'", s)),
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
