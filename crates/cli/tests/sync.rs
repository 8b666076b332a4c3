// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

mod common;
use common::*;

#[test]
fn nothing_to_sync() {
    let state = init_state();
    tock(&state)
        .arg("sync")
        .assert()
        .success()
        .stdout(predicate::str::contains("Sync skipped: no-records"));
}

#[test]
fn unreachable_remote_keeps_records_pending() {
    let state = init_state();
    capture(&state, "in", &[]);
    capture(&state, "out", &[]);

    tock(&state)
        .arg("sync")
        .assert()
        .success()
        .stdout(predicate::str::contains("Sync failed"))
        .stdout(predicate::str::contains("2 record(s) still pending"));

    let pending = json_output(&state, &["pending", "-o", "json"]);
    let records = pending.as_array().unwrap();
    assert_eq!(records.len(), 2);
    for record in records {
        assert_eq!(record["syncAttempts"], 0);
        assert_eq!(record["synced"], false);
    }
}

#[test]
fn json_reports_transport_failure() {
    let state = init_state();
    capture(&state, "in", &[]);

    let summary = json_output(&state, &["sync", "-o", "json"]);
    assert_eq!(summary["result"]["outcome"], "transport_failed");
    assert_eq!(summary["pending_count"], 1);
}

#[test]
fn missing_token_skips() {
    let state = TempDir::new().unwrap();
    tock(&state)
        .args(["init", "--user-id", "emp-7", "--user-name", "Mei Lin"])
        .args(["--store", "store-01", "--remote", UNREACHABLE_REMOTE])
        .assert()
        .success();
    capture(&state, "in", &[]);

    tock(&state)
        .arg("sync")
        .assert()
        .success()
        .stdout(predicate::str::contains("Sync skipped: not-authenticated"));
}

#[test]
fn token_from_environment() {
    let state = TempDir::new().unwrap();
    tock(&state)
        .args(["init", "--user-id", "emp-7", "--user-name", "Mei Lin"])
        .args(["--store", "store-01", "--remote", UNREACHABLE_REMOTE])
        .assert()
        .success();
    capture(&state, "in", &[]);

    tock(&state)
        .env("TOCK_AUTH_TOKEN", "t0k")
        .arg("sync")
        .assert()
        .success()
        .stdout(predicate::str::contains("Sync failed"));
}
