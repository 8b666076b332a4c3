// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Synchronization of queued clock records with the remote endpoint.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ SyncOrchestrator │────►│ SyncClient  │────►│  Transport  │────►│   Remote    │
//! │  (one pass at a  │◄────│ (request /  │◄────│   (trait)   │◄────│  Endpoint   │
//! │   time)          │     │  response)  │     └─────────────┘     └─────────────┘
//! └──────────────────┘     └─────────────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │ ClockQueue  │  (pending records)
//! └─────────────┘
//! ```
//!
//! # Features
//!
//! - Whole pending queue submitted as one batch, keyed by `offlineId`
//! - Per-record reconciliation; unmentioned records stay pending
//! - Request-level failures leave the queue untouched
//! - Injectable transport trait for testing

mod client;
mod orchestrator;
mod transport;

pub use client::{SyncClient, SyncConfig, SyncError};
pub use orchestrator::{
    reconcile, PassReport, Reconciliation, SkipReason, SyncOrchestrator, SyncOutcome, SyncStatus,
    Trigger, EMPTY_SERVER_ID, MISSING_FROM_RESPONSE,
};
pub use transport::{Transport, TransportError, WebSocketTransport};

#[cfg(test)]
pub(crate) mod test_helpers;
