// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Offline clock records.
//!
//! An [`OfflineClockRecord`] is a clock-in or clock-out captured on the device
//! that the remote system of record has not yet confirmed (or confirmed
//! recently enough that it has not been purged).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::protocol::WireRecord;

/// Current version of the persisted record layout.
pub const RECORD_SCHEMA_VERSION: u32 = 1;

/// Direction of a clock event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockAction {
    /// Start of a shift.
    ClockIn,
    /// End of a shift.
    ClockOut,
}

impl ClockAction {
    /// Returns the string representation used in storage and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClockAction::ClockIn => "clock_in",
            ClockAction::ClockOut => "clock_out",
        }
    }
}

impl fmt::Display for ClockAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ClockAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "clock_in" | "in" | "clockin" => Ok(ClockAction::ClockIn),
            "clock_out" | "out" | "clockout" => Ok(ClockAction::ClockOut),
            _ => Err(Error::InvalidAction(s.to_string())),
        }
    }
}

/// Geographic position reported at capture time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy in meters, when the device reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy_m: Option<f64>,
}

impl GeoPoint {
    /// Creates a point, validating coordinate ranges.
    pub fn new(latitude: f64, longitude: f64, accuracy_m: Option<f64>) -> Result<Self> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(Error::InvalidInput(format!(
                "coordinates out of range: {latitude}, {longitude}"
            )));
        }
        if accuracy_m.is_some_and(|a| !a.is_finite() || a < 0.0) {
            return Err(Error::InvalidInput("accuracy must be a positive number".into()));
        }
        Ok(GeoPoint {
            latitude,
            longitude,
            accuracy_m,
        })
    }
}

/// A clock event held in the local durable queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineClockRecord {
    pub schema_version: u32,
    /// Locally generated id, doubling as the idempotency key (`offlineId`).
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub action: ClockAction,
    /// Event time assigned at capture; never changes afterward.
    pub timestamp: DateTime<Utc>,
    pub store_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    /// Opaque diagnostics forwarded verbatim to the remote endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_info: Option<serde_json::Value>,
    pub synced: bool,
    pub sync_attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_attempt: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_record_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synced_at: Option<DateTime<Utc>>,
}

impl OfflineClockRecord {
    /// Creates a new pending record.
    pub fn new(
        id: String,
        user_id: String,
        user_name: String,
        action: ClockAction,
        timestamp: DateTime<Utc>,
        store_id: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        OfflineClockRecord {
            schema_version: RECORD_SCHEMA_VERSION,
            id,
            user_id,
            user_name,
            action,
            timestamp,
            store_id,
            location: None,
            device_info: None,
            synced: false,
            sync_attempts: 0,
            last_sync_error: None,
            last_sync_attempt: None,
            server_record_id: None,
            created_at,
            synced_at: None,
        }
    }

    /// Sets the capture location.
    pub fn with_location(mut self, location: Option<GeoPoint>) -> Self {
        self.location = location;
        self
    }

    /// Sets the device diagnostics payload.
    pub fn with_device_info(mut self, device_info: Option<serde_json::Value>) -> Self {
        self.device_info = device_info;
        self
    }

    /// Returns true while the remote system has not confirmed this record.
    pub fn is_pending(&self) -> bool {
        !self.synced
    }

    /// Records a confirmation from the remote system.
    ///
    /// The server id is written only once; a later confirmation carrying a
    /// different id leaves the first one in place.
    pub fn mark_synced(&mut self, server_record_id: &str, at: DateTime<Utc>) {
        self.sync_attempts = self.sync_attempts.saturating_add(1);
        if self.server_record_id.is_none() {
            self.server_record_id = Some(server_record_id.to_string());
        }
        if !self.synced {
            self.synced = true;
            self.synced_at = Some(at);
        }
    }

    /// Records a rejected attempt. The record stays pending.
    pub fn mark_failed(&mut self, error: &str, at: DateTime<Utc>) {
        self.sync_attempts = self.sync_attempts.saturating_add(1);
        self.last_sync_error = Some(error.to_string());
        self.last_sync_attempt = Some(at);
    }

    /// Projects the record to the payload the remote endpoint expects.
    pub fn to_wire(&self) -> WireRecord {
        WireRecord {
            timestamp: self.timestamp,
            store_id: self.store_id.clone(),
            action: self.action,
            location: self.location,
            device_info: self.device_info.clone(),
            offline_id: self.id.clone(),
        }
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
