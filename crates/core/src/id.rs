// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Local record identifiers.
//!
//! Format: `off-{unix_ms:013}-{hash}` where hash is the first 8 hex chars of
//! SHA256(user_id, nanos, pid, counter). The zero-padded millisecond prefix
//! keeps ids roughly ordered by capture time.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Prefix shared by all locally generated record ids.
pub const RECORD_ID_PREFIX: &str = "off";

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a record id for a capture by `user_id` at `captured_at`.
pub fn generate_record_id(user_id: &str, captured_at: &DateTime<Utc>) -> String {
    let counter = COUNTER.fetch_add(1, Ordering::Relaxed);
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let input = format!("{}|{}|{}|{}", user_id, nanos, std::process::id(), counter);
    let hash = Sha256::digest(input.as_bytes());
    let short_hash = hex::encode(&hash[..4]);
    let millis = captured_at.timestamp_millis().max(0);
    format!("{}-{:013}-{}", RECORD_ID_PREFIX, millis, short_hash)
}

/// Generate a unique record id, handling collisions by appending an
/// incrementing suffix. An error from `exists` is returned as is.
pub fn generate_unique_record_id<F, E>(
    user_id: &str,
    captured_at: &DateTime<Utc>,
    mut exists: F,
) -> Result<String, E>
where
    F: FnMut(&str) -> Result<bool, E>,
{
    let base_id = generate_record_id(user_id, captured_at);

    if !exists(&base_id)? {
        return Ok(base_id);
    }

    let mut suffix = 2;
    loop {
        let id = format!("{}-{}", base_id, suffix);
        if !exists(&id)? {
            return Ok(id);
        }
        suffix += 1;
    }
}

/// Returns true if `id` looks like a locally generated record id.
#[cfg(test)]
fn is_record_id(id: &str) -> bool {
    let mut parts = id.splitn(4, '-');
    let prefix = parts.next();
    let millis = parts.next();
    let hash = parts.next();
    prefix == Some(RECORD_ID_PREFIX)
        && millis.is_some_and(|m| m.len() == 13 && m.chars().all(|c| c.is_ascii_digit()))
        && hash.is_some_and(|h| h.len() == 8 && h.chars().all(|c| c.is_ascii_hexdigit()))
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
