// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Status events for observers (agent log, `--json` output, tests).
//!
//! Events are fire-and-forget: emitting never blocks and never fails, and an
//! emitter with no subscribers simply drops them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tk_core::Clock;
use tokio::sync::broadcast;

/// Buffered events per subscriber before the oldest are dropped.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Something observers may want to know about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StatusEvent {
    ConnectivityChanged {
        online: bool,
    },
    RecordAdded {
        record_id: String,
        pending_count: usize,
    },
    SyncStarted {
        batch_size: usize,
    },
    SyncCompleted {
        processed: usize,
        errors: usize,
        pending_count: usize,
    },
    SyncError {
        message: String,
        pending_count: usize,
    },
    /// A record has failed often enough that someone should look at it.
    RecordStalled {
        record_id: String,
        attempts: u32,
        last_error: Option<String>,
    },
    CleanupCompleted {
        deleted: usize,
    },
}

impl StatusEvent {
    /// Short name matching the serialized `event` tag.
    pub fn name(&self) -> &'static str {
        match self {
            StatusEvent::ConnectivityChanged { .. } => "connectivity_changed",
            StatusEvent::RecordAdded { .. } => "record_added",
            StatusEvent::SyncStarted { .. } => "sync_started",
            StatusEvent::SyncCompleted { .. } => "sync_completed",
            StatusEvent::SyncError { .. } => "sync_error",
            StatusEvent::RecordStalled { .. } => "record_stalled",
            StatusEvent::CleanupCompleted { .. } => "cleanup_completed",
        }
    }
}

/// A [`StatusEvent`] with the time it was emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StampedEvent {
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: StatusEvent,
}

/// Broadcast bus for [`StatusEvent`]s.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<StampedEvent>,
    clock: Arc<dyn Clock>,
}

impl EventBus {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        EventBus { tx, clock }
    }

    /// Stamps and publishes an event.
    pub fn emit(&self, event: StatusEvent) {
        let stamped = StampedEvent {
            at: self.clock.now(),
            event,
        };
        tracing::trace!(event = stamped.event.name(), "status event");
        // No receivers is not an error for fire-and-forget delivery.
        let _ = self.tx.send(stamped);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StampedEvent> {
        self.tx.subscribe()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("receivers", &self.tx.receiver_count())
            .finish()
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
