// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Retention of confirmed records.

use std::sync::Arc;

use chrono::TimeDelta;
use tk_core::Clock;

use crate::events::{EventBus, StatusEvent};
use crate::SharedQueue;

/// Purges confirmed records once they are older than the retention window.
///
/// Shares the queue lock with the orchestrator, so a purge never interleaves
/// with the write-back of a sync pass.
#[derive(Clone)]
pub struct CleanupManager {
    queue: SharedQueue,
    clock: Arc<dyn Clock>,
    events: EventBus,
}

impl CleanupManager {
    pub fn new(queue: SharedQueue, clock: Arc<dyn Clock>, events: EventBus) -> Self {
        CleanupManager {
            queue,
            clock,
            events,
        }
    }

    /// Deletes records confirmed more than `retention_days` ago. Pending
    /// records are never touched. Returns the number deleted.
    ///
    /// A window reaching past the earliest representable time deletes nothing.
    pub async fn cleanup(&self, retention_days: u32) -> tk_core::Result<usize> {
        let cutoff = TimeDelta::try_days(i64::from(retention_days))
            .and_then(|window| self.clock.now().checked_sub_signed(window));
        let deleted = match cutoff {
            Some(cutoff) => self.queue.lock().await.delete_older_than_synced(cutoff)?,
            None => {
                tracing::debug!(retention_days, "retention window out of range, nothing to purge");
                0
            }
        };

        if deleted > 0 {
            tracing::info!(deleted, retention_days, "purged confirmed clock records");
        }
        self.events.emit(StatusEvent::CleanupCompleted { deleted });
        Ok(deleted)
    }
}

#[cfg(test)]
#[path = "cleanup_tests.rs"]
mod tests;
