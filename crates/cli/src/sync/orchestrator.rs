// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync passes: read the pending queue, submit it, reconcile the answer.
//!
//! A pass is `Idle -> Running -> Idle`. The queue snapshot taken at the start
//! fixes the scope of the pass; records captured while the request is in
//! flight wait for the next one. A request that fails as a whole leaves every
//! record untouched.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tk_core::protocol::{RecordOutcome, SyncRequest, SyncResponse};
use tk_core::{Clock, OfflineClockRecord, SessionContext};
use tokio::sync::Mutex;

use super::client::SyncClient;
use super::transport::{Transport, WebSocketTransport};
use crate::connectivity::SharedConnectivity;
use crate::events::{EventBus, StatusEvent};
use crate::SharedQueue;

/// Error recorded on a submitted record the response did not mention.
pub const MISSING_FROM_RESPONSE: &str = "missing from sync response";

/// Error recorded when an acceptance carries no server record id.
pub const EMPTY_SERVER_ID: &str = "empty server record id";

/// What started a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// Connectivity came back.
    Connectivity,
    /// Periodic timer.
    Timer,
    /// Explicit request (the `sync` command).
    Manual,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::Connectivity => "connectivity",
            Trigger::Timer => "timer",
            Trigger::Manual => "manual",
        }
    }
}

/// Why a pass did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// Another pass is running.
    #[serde(rename = "sync-in-progress")]
    InProgress,
    NotAuthenticated,
    Offline,
    NoRecords,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::InProgress => "sync-in-progress",
            SkipReason::NotAuthenticated => "not-authenticated",
            SkipReason::Offline => "offline",
            SkipReason::NoRecords => "no-records",
        }
    }
}

/// Counts from a pass whose request reached the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PassReport {
    /// Records confirmed in this pass.
    pub processed: usize,
    /// Records rejected or missing from the response.
    pub errors: usize,
    /// Records still pending after the pass.
    pub pending_count: usize,
}

/// Result of one call to [`SyncOrchestrator::sync_pass`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    Skipped { reason: SkipReason },
    Completed(PassReport),
    /// The request failed as a whole; no record changed.
    TransportFailed { message: String },
}

/// Snapshot of sync health for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    /// `online`, `offline` or `unknown`.
    pub connectivity: &'static str,
    pub online: bool,
    pub sync_in_progress: bool,
    pub pending_count: usize,
    pub last_sync_at: Option<DateTime<Utc>>,
}

/// Per-record outcome of a response, ready to be written back.
#[derive(Debug)]
pub struct Reconciliation {
    /// Every snapshot record with its new sync state.
    pub records: Vec<OfflineClockRecord>,
    pub processed: usize,
    pub errors: usize,
    /// Offline ids in the response that were not part of the batch.
    pub unknown_ids: Vec<String>,
}

/// Applies a response to the records that were submitted.
///
/// A record the response does not mention, or accepts without a server id,
/// is treated as failed, so it stays pending and is retried.
pub fn reconcile(
    snapshot: Vec<OfflineClockRecord>,
    response: &SyncResponse,
    now: DateTime<Utc>,
) -> Reconciliation {
    let mut outcomes: HashMap<&str, RecordOutcome> = response.outcomes();
    let mut processed = 0;
    let mut errors = 0;

    let records = snapshot
        .into_iter()
        .map(|mut record| {
            match outcomes.remove(record.id.as_str()) {
                Some(RecordOutcome::Accepted(server_id)) if !server_id.trim().is_empty() => {
                    record.mark_synced(&server_id, now);
                    processed += 1;
                }
                Some(RecordOutcome::Accepted(_)) => {
                    record.mark_failed(EMPTY_SERVER_ID, now);
                    errors += 1;
                }
                Some(RecordOutcome::Rejected(error)) => {
                    record.mark_failed(&error, now);
                    errors += 1;
                }
                None => {
                    record.mark_failed(MISSING_FROM_RESPONSE, now);
                    errors += 1;
                }
            }
            record
        })
        .collect();

    let mut unknown_ids: Vec<String> = outcomes.into_keys().map(str::to_string).collect();
    unknown_ids.sort();

    Reconciliation {
        records,
        processed,
        errors,
        unknown_ids,
    }
}

/// Releases the running flag when a pass ends, however it ends.
struct RunningGuard<'a>(&'a AtomicBool);

impl<'a> RunningGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunningGuard(flag))
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives sync passes against the remote endpoint.
pub struct SyncOrchestrator<T: Transport = WebSocketTransport> {
    queue: SharedQueue,
    client: Mutex<SyncClient<T>>,
    session: SessionContext,
    connectivity: Arc<SharedConnectivity>,
    events: EventBus,
    clock: Arc<dyn Clock>,
    running: AtomicBool,
    /// Failed attempts at which a record is reported as stalled.
    escalate_after: u32,
}

impl<T: Transport> SyncOrchestrator<T> {
    pub fn new(
        queue: SharedQueue,
        client: SyncClient<T>,
        session: SessionContext,
        connectivity: Arc<SharedConnectivity>,
        events: EventBus,
        clock: Arc<dyn Clock>,
    ) -> Self {
        SyncOrchestrator {
            queue,
            client: Mutex::new(client),
            session,
            connectivity,
            events,
            clock,
            running: AtomicBool::new(false),
            escalate_after: 5,
        }
    }

    pub fn with_escalation_threshold(mut self, attempts: u32) -> Self {
        self.escalate_after = attempts.max(1);
        self
    }

    /// True while a pass is in flight.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Runs one pass. At most one pass runs at a time; a concurrent call
    /// returns `Skipped(InProgress)` immediately.
    ///
    /// Only local storage failures are errors; a failed request is reported
    /// as [`SyncOutcome::TransportFailed`].
    pub async fn sync_pass(&self, trigger: Trigger) -> tk_core::Result<SyncOutcome> {
        let Some(_guard) = RunningGuard::acquire(&self.running) else {
            tracing::debug!(trigger = trigger.as_str(), "sync pass already running");
            return Ok(skipped(SkipReason::InProgress));
        };

        let Some(token) = self.session.token().filter(|_| self.session.has_identity()) else {
            tracing::debug!("sync skipped: not authenticated");
            return Ok(skipped(SkipReason::NotAuthenticated));
        };

        if self.connectivity.is_offline() {
            tracing::debug!("sync skipped: offline");
            return Ok(skipped(SkipReason::Offline));
        }

        let snapshot = self.queue.lock().await.list_unsynced()?;
        if snapshot.is_empty() {
            return Ok(skipped(SkipReason::NoRecords));
        }

        let batch_size = snapshot.len();
        tracing::info!(trigger = trigger.as_str(), batch_size, "sync pass started");
        self.events.emit(StatusEvent::SyncStarted { batch_size });

        let request = SyncRequest {
            offline_records: snapshot.iter().map(OfflineClockRecord::to_wire).collect(),
        };

        let result = self.client.lock().await.submit(token, request).await;
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                let message = e.to_string();
                let pending_count = self.queue.lock().await.pending_count()?;
                tracing::warn!(error = %message, pending_count, "sync request failed");
                self.events.emit(StatusEvent::SyncError {
                    message: message.clone(),
                    pending_count,
                });
                return Ok(SyncOutcome::TransportFailed { message });
            }
        };

        let now = self.clock.now();
        let outcome = reconcile(snapshot, &response, now);
        for id in &outcome.unknown_ids {
            tracing::warn!(offline_id = %id, "response names a record that was not sent");
        }

        let pending_count = {
            let mut queue = self.queue.lock().await;
            queue.update_many(&outcome.records)?;
            queue.set_last_sync_at(now)?;
            queue.pending_count()?
        };

        tracing::info!(
            processed = outcome.processed,
            errors = outcome.errors,
            pending_count,
            "sync pass completed"
        );
        self.events.emit(StatusEvent::SyncCompleted {
            processed: outcome.processed,
            errors: outcome.errors,
            pending_count,
        });

        for record in outcome
            .records
            .iter()
            .filter(|r| !r.synced && r.sync_attempts == self.escalate_after)
        {
            tracing::warn!(
                record_id = %record.id,
                attempts = record.sync_attempts,
                last_error = record.last_sync_error.as_deref().unwrap_or_default(),
                "record keeps failing to sync"
            );
            self.events.emit(StatusEvent::RecordStalled {
                record_id: record.id.clone(),
                attempts: record.sync_attempts,
                last_error: record.last_sync_error.clone(),
            });
        }

        Ok(SyncOutcome::Completed(PassReport {
            processed: outcome.processed,
            errors: outcome.errors,
            pending_count,
        }))
    }

    /// Current sync health.
    pub async fn status(&self) -> tk_core::Result<SyncStatus> {
        let queue = self.queue.lock().await;
        Ok(SyncStatus {
            connectivity: self.connectivity.status_str(),
            online: self.connectivity.is_online(),
            sync_in_progress: self.is_running(),
            pending_count: queue.pending_count()?,
            last_sync_at: queue.last_sync_at()?,
        })
    }
}

fn skipped(reason: SkipReason) -> SyncOutcome {
    SyncOutcome::Skipped { reason }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
