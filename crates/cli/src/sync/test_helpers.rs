// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for sync module tests.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tk_core::protocol::{
    ErrorEntry, OriginalRef, ProcessedEntry, ServerMessage, SyncDetails, SyncResponse,
};
use tk_core::{ClockAction, OfflineClockRecord, WireRecord};

use super::transport_tests::Responder;

/// Fixed reference time for deterministic tests.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 16, 8, 30, 0)
        .single()
        .unwrap_or_default()
}

/// Create a pending clock-in record captured `offset_mins` after [`base_time`].
pub fn make_test_record(id: &str, offset_mins: i64) -> OfflineClockRecord {
    let at = base_time() + Duration::minutes(offset_mins);
    OfflineClockRecord::new(
        id.to_string(),
        "emp-7".to_string(),
        "Mei Lin".to_string(),
        ClockAction::ClockIn,
        at,
        "store-01".to_string(),
        at,
    )
}

/// Server id the accepting responders assign to an offline id.
pub fn server_id_for(offline_id: &str) -> String {
    format!("clk-{}", offline_id)
}

fn processed(record: &WireRecord) -> ProcessedEntry {
    ProcessedEntry {
        original: OriginalRef {
            offline_id: record.offline_id.clone(),
        },
        processed: server_id_for(&record.offline_id),
    }
}

fn rejected(record: &WireRecord, error: &str) -> ErrorEntry {
    ErrorEntry {
        original: OriginalRef {
            offline_id: record.offline_id.clone(),
        },
        error: error.to_string(),
    }
}

/// Accepts every record.
pub fn accept_all() -> Responder {
    Arc::new(|request_id, request| {
        let details = SyncDetails {
            processed_records: request.offline_records.iter().map(processed).collect(),
            error_records: Vec::new(),
        };
        vec![ServerMessage::sync_result(
            request_id,
            SyncResponse::success(details),
        )]
    })
}

/// Rejects the listed ids with the given messages and accepts the rest.
pub fn reject(errors: &[(&str, &str)]) -> Responder {
    let errors: HashMap<String, String> = errors
        .iter()
        .map(|(id, msg)| (id.to_string(), msg.to_string()))
        .collect();
    Arc::new(move |request_id, request| {
        let mut details = SyncDetails::default();
        for record in &request.offline_records {
            match errors.get(&record.offline_id) {
                Some(msg) => details.error_records.push(rejected(record, msg)),
                None => details.processed_records.push(processed(record)),
            }
        }
        vec![ServerMessage::sync_result(
            request_id,
            SyncResponse::success(details),
        )]
    })
}

/// Accepts every record except the listed ids, which are left out of the
/// response entirely.
pub fn omit(missing: &[&str]) -> Responder {
    let missing: Vec<String> = missing.iter().map(|s| s.to_string()).collect();
    Arc::new(move |request_id, request| {
        let details = SyncDetails {
            processed_records: request
                .offline_records
                .iter()
                .filter(|r| !missing.contains(&r.offline_id))
                .map(processed)
                .collect(),
            error_records: Vec::new(),
        };
        vec![ServerMessage::sync_result(
            request_id,
            SyncResponse::success(details),
        )]
    })
}

/// Answers with a request-level error message.
pub fn refuse(message: &str) -> Responder {
    let message = message.to_string();
    Arc::new(move |request_id, _| vec![ServerMessage::error(Some(request_id), message.clone())])
}
