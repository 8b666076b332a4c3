// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket protocol messages between the client and the remote
//! synchronization endpoint.
//!
//! The protocol is request/response:
//! - Client sends a batch of offline records, tagged with a request id
//! - Server answers with a per-record outcome for that request, or an error

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::{ClockAction, GeoPoint};

/// Top-level status value the endpoint uses for a structurally complete batch.
pub const STATUS_SUCCESS: &str = "success";

/// A clock record as sent to the remote endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRecord {
    pub timestamp: DateTime<Utc>,
    pub store_id: String,
    pub action: ClockAction,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub device_info: Option<serde_json::Value>,
    /// Client-side id, used by the endpoint as the idempotency key.
    pub offline_id: String,
}

/// A batch of records to synchronize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    pub offline_records: Vec<WireRecord>,
}

/// Echo of the submitted record inside a response entry.
///
/// Only `offlineId` is needed to match entries back; anything else the
/// server echoes is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginalRef {
    pub offline_id: String,
}

/// A record the endpoint accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedEntry {
    pub original: OriginalRef,
    /// Server-assigned record id.
    pub processed: String,
}

/// A record the endpoint rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub original: OriginalRef,
    pub error: String,
}

/// Per-record outcome lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncDetails {
    #[serde(default)]
    pub processed_records: Vec<ProcessedEntry>,
    #[serde(default)]
    pub error_records: Vec<ErrorEntry>,
}

/// The endpoint's answer to a [`SyncRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResponse {
    pub status: String,
    #[serde(default)]
    pub processed: usize,
    #[serde(default)]
    pub errors: usize,
    #[serde(default)]
    pub details: SyncDetails,
}

/// Outcome of one submitted record, as read from a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Accepted, with the server-assigned id.
    Accepted(String),
    /// Rejected, with the server's message.
    Rejected(String),
}

impl SyncResponse {
    /// Builds a successful response from per-record entries.
    pub fn success(details: SyncDetails) -> Self {
        SyncResponse {
            status: STATUS_SUCCESS.to_string(),
            processed: details.processed_records.len(),
            errors: details.error_records.len(),
            details,
        }
    }

    /// Returns true if the endpoint processed the batch as a whole.
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }

    /// Indexes the per-record entries by offline id.
    ///
    /// When an id appears in both lists the acceptance wins: the server
    /// already holds a record for it.
    pub fn outcomes(&self) -> HashMap<&str, RecordOutcome> {
        let mut outcomes = HashMap::new();
        for entry in &self.details.error_records {
            outcomes.insert(
                entry.original.offline_id.as_str(),
                RecordOutcome::Rejected(entry.error.clone()),
            );
        }
        for entry in &self.details.processed_records {
            outcomes.insert(
                entry.original.offline_id.as_str(),
                RecordOutcome::Accepted(entry.processed.clone()),
            );
        }
        outcomes
    }
}

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Submit a batch of offline records.
    #[serde(rename_all = "camelCase")]
    SyncOfflineRecords {
        /// Client-chosen id echoed in the response.
        request_id: u64,
        /// Credential identifying the employee.
        auth_token: String,
        payload: SyncRequest,
    },

    /// Ping message for keepalive.
    Ping {
        /// Client-chosen ID echoed in Pong.
        id: u64,
    },
}

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Per-record result of a sync request.
    #[serde(rename_all = "camelCase")]
    SyncResult {
        request_id: u64,
        response: SyncResponse,
    },

    /// Pong response to client Ping.
    Pong {
        /// Echoed from the Ping message.
        id: u64,
    },

    /// The request could not be processed at all.
    #[serde(rename_all = "camelCase")]
    Error {
        /// Request the error belongs to, when the server could read it.
        #[serde(default)]
        request_id: Option<u64>,
        /// Human-readable error description.
        message: String,
    },
}

impl ClientMessage {
    /// Creates a SyncOfflineRecords message.
    pub fn sync(request_id: u64, auth_token: impl Into<String>, payload: SyncRequest) -> Self {
        ClientMessage::SyncOfflineRecords {
            request_id,
            auth_token: auth_token.into(),
            payload,
        }
    }

    /// Creates a Ping message.
    pub fn ping(id: u64) -> Self {
        ClientMessage::Ping { id }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Creates a SyncResult message.
    pub fn sync_result(request_id: u64, response: SyncResponse) -> Self {
        ServerMessage::SyncResult {
            request_id,
            response,
        }
    }

    /// Creates a Pong message.
    pub fn pong(id: u64) -> Self {
        ServerMessage::Pong { id }
    }

    /// Creates an Error message.
    pub fn error(request_id: Option<u64>, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            request_id,
            message: message.into(),
        }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
