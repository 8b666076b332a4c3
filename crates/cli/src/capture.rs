// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Capture API: record a clock event locally, whatever the network is doing.
//!
//! Capture never talks to the remote endpoint. A successful capture only
//! means the event is durably queued for a later sync pass.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tk_core::id::generate_unique_record_id;
use tk_core::{Clock, ClockAction, ClockQueue, GeoPoint, OfflineClockRecord, SessionContext};

use crate::events::{EventBus, StatusEvent};
use crate::SharedQueue;

/// Why offline capture is not possible right now.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreconditionError {
    #[error("offline capture unavailable: missing-user-info\n  hint: run 'tock init --user-id <id> --user-name <name>'")]
    MissingUserInfo,

    #[error("offline capture unavailable: storage-full\n  hint: free disk space or run 'tock cleanup'")]
    StorageFull,

    #[error("offline capture unavailable: unsupported ({0})")]
    Unsupported(String),
}

impl PreconditionError {
    /// Stable machine-readable reason.
    pub fn reason(&self) -> &'static str {
        match self {
            PreconditionError::MissingUserInfo => "missing-user-info",
            PreconditionError::StorageFull => "storage-full",
            PreconditionError::Unsupported(_) => "unsupported",
        }
    }
}

/// Error returned by [`CaptureService::capture`].
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    #[error("invalid capture: {0}")]
    InvalidInput(String),

    /// The queue refused the record after the preconditions passed.
    #[error("failed to store clock event: {0}")]
    Storage(#[from] tk_core::Error),
}

/// Diagnostics attached to a capture when the caller supplies none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub platform: String,
    pub arch: String,
    pub app_version: String,
    pub captured_at: DateTime<Utc>,
    pub offline_capture: bool,
}

impl DeviceInfo {
    /// Diagnostics for this process, stamped with the capture time.
    pub fn current(captured_at: DateTime<Utc>) -> Self {
        DeviceInfo {
            platform: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            captured_at,
            offline_capture: true,
        }
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// A clock event to capture.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureInput {
    pub action: ClockAction,
    /// Event time; defaults to now.
    pub timestamp: Option<DateTime<Utc>>,
    pub store_id: String,
    pub location: Option<GeoPoint>,
    /// Opaque diagnostics; defaults to [`DeviceInfo::current`].
    pub device_info: Option<serde_json::Value>,
}

impl CaptureInput {
    pub fn new(action: ClockAction, store_id: impl Into<String>) -> Self {
        CaptureInput {
            action,
            timestamp: None,
            store_id: store_id.into(),
            location: None,
            device_info: None,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_location(mut self, location: GeoPoint) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_device_info(mut self, device_info: serde_json::Value) -> Self {
        self.device_info = Some(device_info);
        self
    }
}

/// Proof that an event was queued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureReceipt {
    pub record_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Records clock events into the local queue.
#[derive(Clone)]
pub struct CaptureService {
    queue: SharedQueue,
    clock: Arc<dyn Clock>,
    events: EventBus,
}

impl CaptureService {
    pub fn new(queue: SharedQueue, clock: Arc<dyn Clock>, events: EventBus) -> Self {
        CaptureService {
            queue,
            clock,
            events,
        }
    }

    /// Checks identity, then whether the queue accepts writes.
    pub async fn can_capture_offline(
        &self,
        session: &SessionContext,
    ) -> Result<(), PreconditionError> {
        check_identity(session)?;
        let mut queue = self.queue.lock().await;
        check_storage(&mut queue)
    }

    /// Queues a clock event for later synchronization.
    pub async fn capture(
        &self,
        session: &SessionContext,
        input: CaptureInput,
    ) -> Result<CaptureReceipt, CaptureError> {
        check_identity(session)?;
        if input.store_id.trim().is_empty() {
            return Err(CaptureError::InvalidInput("store id is required".to_string()));
        }

        let now = self.clock.now();
        let timestamp = input.timestamp.unwrap_or(now);
        let device_info = input
            .device_info
            .unwrap_or_else(|| DeviceInfo::current(now).to_value());

        let (record_id, pending_count) = {
            let mut queue = self.queue.lock().await;
            check_storage(&mut queue)?;

            let record_id =
                generate_unique_record_id(&session.user_id, &timestamp, |id| queue.exists(id))?;
            let record = OfflineClockRecord::new(
                record_id.clone(),
                session.user_id.clone(),
                session.user_name.clone(),
                input.action,
                timestamp,
                input.store_id.trim().to_string(),
                now,
            )
            .with_location(input.location)
            .with_device_info(Some(device_info));

            queue.insert(&record)?;
            let pending_count = queue.pending_count().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "failed to count pending records");
                0
            });
            (record_id, pending_count)
        };

        tracing::info!(
            record_id = %record_id,
            action = %input.action,
            pending_count,
            "clock event queued"
        );
        self.events.emit(StatusEvent::RecordAdded {
            record_id: record_id.clone(),
            pending_count,
        });

        Ok(CaptureReceipt {
            record_id,
            timestamp,
        })
    }
}

fn check_identity(session: &SessionContext) -> Result<(), PreconditionError> {
    if session.has_identity() {
        Ok(())
    } else {
        Err(PreconditionError::MissingUserInfo)
    }
}

fn check_storage(queue: &mut ClockQueue) -> Result<(), PreconditionError> {
    match queue.probe_writable() {
        Ok(()) => Ok(()),
        Err(tk_core::Error::StorageFull) => Err(PreconditionError::StorageFull),
        Err(e) => Err(PreconditionError::Unsupported(e.to_string())),
    }
}

#[cfg(test)]
#[path = "capture_tests.rs"]
mod tests;
