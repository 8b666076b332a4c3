// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::record::{ClockAction, GeoPoint};
use chrono::{Duration, TimeZone};
use tempfile::TempDir;

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 16, 8, 30, 0).unwrap()
}

fn test_record(id: &str, offset_mins: i64) -> OfflineClockRecord {
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

#[test]
fn insert_and_get_record() {
    let mut queue = ClockQueue::open_in_memory().unwrap();
    let record = test_record("rec-1", 0)
        .with_location(Some(GeoPoint::new(52.5, 13.25, Some(8.0)).unwrap()))
        .with_device_info(Some(serde_json::json!({"platform": "linux"})));

    queue.insert(&record).unwrap();
    let stored = queue.get("rec-1").unwrap();

    assert_eq!(stored, record);
}

#[test]
fn insert_forces_pending_state() {
    let mut queue = ClockQueue::open_in_memory().unwrap();
    let mut record = test_record("rec-1", 0);
    record.mark_synced("clk-000009", base_time());

    queue.insert(&record).unwrap();
    let stored = queue.get("rec-1").unwrap();

    assert!(!stored.synced);
    assert_eq!(stored.sync_attempts, 0);
    assert!(stored.server_record_id.is_none());
    assert!(stored.synced_at.is_none());
}

#[test]
fn insert_duplicate_id_fails() {
    let mut queue = ClockQueue::open_in_memory().unwrap();
    queue.insert(&test_record("rec-1", 0)).unwrap();

    let err = queue.insert(&test_record("rec-1", 5)).unwrap_err();
    assert!(matches!(err, Error::DuplicateRecord(id) if id == "rec-1"));
}

#[test]
fn get_missing_record_fails() {
    let queue = ClockQueue::open_in_memory().unwrap();
    let err = queue.get("nope").unwrap_err();
    assert!(matches!(err, Error::RecordNotFound(_)));
}

#[test]
fn exists_reflects_inserts() {
    let mut queue = ClockQueue::open_in_memory().unwrap();
    assert!(!queue.exists("rec-1").unwrap());
    queue.insert(&test_record("rec-1", 0)).unwrap();
    assert!(queue.exists("rec-1").unwrap());
}

#[test]
fn list_unsynced_keeps_insertion_order() {
    let mut queue = ClockQueue::open_in_memory().unwrap();
    // Inserted out of timestamp order on purpose.
    queue.insert(&test_record("rec-b", 10)).unwrap();
    queue.insert(&test_record("rec-a", 0)).unwrap();
    queue.insert(&test_record("rec-c", 20)).unwrap();

    let ids: Vec<_> = queue
        .list_unsynced()
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec!["rec-b", "rec-a", "rec-c"]);
}

#[test]
fn list_unsynced_excludes_confirmed() {
    let mut queue = ClockQueue::open_in_memory().unwrap();
    queue.insert(&test_record("rec-1", 0)).unwrap();
    queue.insert(&test_record("rec-2", 1)).unwrap();

    let mut confirmed = queue.get("rec-1").unwrap();
    confirmed.mark_synced("clk-000001", base_time());
    queue.update(&confirmed).unwrap();

    let pending = queue.list_unsynced().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, "rec-2");
    assert_eq!(queue.pending_count().unwrap(), 1);
    assert!(queue.get("rec-1").unwrap().synced);
}

#[test]
fn empty_queue_lists_nothing() {
    let queue = ClockQueue::open_in_memory().unwrap();
    assert!(queue.list_unsynced().unwrap().is_empty());
    assert_eq!(queue.pending_count().unwrap(), 0);
}

#[test]
fn update_missing_record_fails() {
    let mut queue = ClockQueue::open_in_memory().unwrap();
    let err = queue.update(&test_record("ghost", 0)).unwrap_err();
    assert!(matches!(err, Error::RecordNotFound(id) if id == "ghost"));
}

#[test]
fn update_persists_failure_details() {
    let mut queue = ClockQueue::open_in_memory().unwrap();
    queue.insert(&test_record("rec-1", 0)).unwrap();

    let mut record = queue.get("rec-1").unwrap();
    let at = base_time() + Duration::minutes(3);
    record.mark_failed("store closed", at);
    queue.update(&record).unwrap();

    let stored = queue.get("rec-1").unwrap();
    assert!(!stored.synced);
    assert_eq!(stored.sync_attempts, 1);
    assert_eq!(stored.last_sync_error.as_deref(), Some("store closed"));
    assert_eq!(stored.last_sync_attempt, Some(at));
}

#[test]
fn update_never_reverts_confirmation() {
    let mut queue = ClockQueue::open_in_memory().unwrap();
    queue.insert(&test_record("rec-1", 0)).unwrap();

    let stale = queue.get("rec-1").unwrap();
    let mut confirmed = stale.clone();
    confirmed.mark_synced("clk-000001", base_time());
    queue.update(&confirmed).unwrap();

    // A stale copy written afterward must not undo the confirmation.
    queue.update(&stale).unwrap();

    let stored = queue.get("rec-1").unwrap();
    assert!(stored.synced);
    assert_eq!(stored.sync_attempts, 1);
    assert_eq!(stored.server_record_id.as_deref(), Some("clk-000001"));
    assert_eq!(stored.synced_at, Some(base_time()));
}

#[test]
fn update_keeps_first_server_id() {
    let mut queue = ClockQueue::open_in_memory().unwrap();
    queue.insert(&test_record("rec-1", 0)).unwrap();

    let mut record = queue.get("rec-1").unwrap();
    record.mark_synced("clk-000001", base_time());
    queue.update(&record).unwrap();

    record.server_record_id = Some("clk-999999".to_string());
    queue.update(&record).unwrap();

    let stored = queue.get("rec-1").unwrap();
    assert_eq!(stored.server_record_id.as_deref(), Some("clk-000001"));
}

#[test]
fn update_ignores_capture_fields() {
    let mut queue = ClockQueue::open_in_memory().unwrap();
    queue.insert(&test_record("rec-1", 0)).unwrap();

    let mut record = queue.get("rec-1").unwrap();
    record.timestamp = base_time() + Duration::hours(4);
    record.store_id = "store-99".to_string();
    queue.update(&record).unwrap();

    let stored = queue.get("rec-1").unwrap();
    assert_eq!(stored.timestamp, base_time());
    assert_eq!(stored.store_id, "store-01");
}

#[test]
fn update_many_applies_all() {
    let mut queue = ClockQueue::open_in_memory().unwrap();
    queue.insert(&test_record("rec-1", 0)).unwrap();
    queue.insert(&test_record("rec-2", 1)).unwrap();

    let mut a = queue.get("rec-1").unwrap();
    let mut b = queue.get("rec-2").unwrap();
    a.mark_synced("clk-000001", base_time());
    b.mark_failed("invalid store", base_time());
    queue.update_many(&[a, b]).unwrap();

    assert!(queue.get("rec-1").unwrap().synced);
    assert_eq!(
        queue.get("rec-2").unwrap().last_sync_error.as_deref(),
        Some("invalid store")
    );
}

#[test]
fn update_many_is_all_or_nothing() {
    let mut queue = ClockQueue::open_in_memory().unwrap();
    queue.insert(&test_record("rec-1", 0)).unwrap();

    let mut a = queue.get("rec-1").unwrap();
    a.mark_synced("clk-000001", base_time());
    let ghost = test_record("ghost", 1);

    let err = queue.update_many(&[a, ghost]).unwrap_err();
    assert!(matches!(err, Error::RecordNotFound(_)));

    let stored = queue.get("rec-1").unwrap();
    assert!(!stored.synced);
    assert_eq!(stored.sync_attempts, 0);
}

#[test]
fn delete_older_than_synced_keeps_pending() {
    let mut queue = ClockQueue::open_in_memory().unwrap();
    queue.insert(&test_record("old-synced", 0)).unwrap();
    queue.insert(&test_record("new-synced", 1)).unwrap();
    queue.insert(&test_record("old-pending", 2)).unwrap();

    let mut old = queue.get("old-synced").unwrap();
    old.mark_synced("clk-000001", base_time() - Duration::days(10));
    let mut new = queue.get("new-synced").unwrap();
    new.mark_synced("clk-000002", base_time() - Duration::days(1));
    queue.update_many(&[old, new]).unwrap();

    let deleted = queue
        .delete_older_than_synced(base_time() - Duration::days(7))
        .unwrap();

    assert_eq!(deleted, 1);
    assert!(!queue.exists("old-synced").unwrap());
    assert!(queue.exists("new-synced").unwrap());
    assert!(queue.exists("old-pending").unwrap());
}

#[test]
fn delete_with_nothing_eligible_returns_zero() {
    let mut queue = ClockQueue::open_in_memory().unwrap();
    queue.insert(&test_record("rec-1", 0)).unwrap();
    assert_eq!(queue.delete_older_than_synced(Utc::now()).unwrap(), 0);
}

#[test]
fn list_stalled_filters_by_attempts() {
    let mut queue = ClockQueue::open_in_memory().unwrap();
    queue.insert(&test_record("rec-1", 0)).unwrap();
    queue.insert(&test_record("rec-2", 1)).unwrap();

    let mut record = queue.get("rec-1").unwrap();
    for _ in 0..3 {
        record.mark_failed("rejected", base_time());
    }
    queue.update(&record).unwrap();

    let stalled = queue.list_stalled(3).unwrap();
    assert_eq!(stalled.len(), 1);
    assert_eq!(stalled[0].id, "rec-1");
}

#[test]
fn last_sync_at_round_trips() {
    let mut queue = ClockQueue::open_in_memory().unwrap();
    assert!(queue.last_sync_at().unwrap().is_none());

    queue.set_last_sync_at(base_time()).unwrap();
    queue
        .set_last_sync_at(base_time() + Duration::minutes(1))
        .unwrap();

    assert_eq!(
        queue.last_sync_at().unwrap(),
        Some(base_time() + Duration::minutes(1))
    );
}

#[test]
fn probe_writable_succeeds_on_fresh_store() {
    let mut queue = ClockQueue::open_in_memory().unwrap();
    queue.probe_writable().unwrap();
    queue.probe_writable().unwrap();
}

#[test]
fn records_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("clock.db");

    {
        let mut queue = ClockQueue::open(&path).unwrap();
        queue.insert(&test_record("rec-1", 0)).unwrap();
        queue.set_last_sync_at(base_time()).unwrap();
    }

    let queue = ClockQueue::open(&path).unwrap();
    assert_eq!(queue.list_unsynced().unwrap().len(), 1);
    assert_eq!(queue.last_sync_at().unwrap(), Some(base_time()));
}

#[test]
fn migrations_set_user_version() {
    let conn = Connection::open_in_memory().unwrap();
    run_migrations(&conn).unwrap();
    run_migrations(&conn).unwrap();

    let version: i64 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .unwrap();
    assert_eq!(version, STORE_SCHEMA_VERSION);
}

#[test]
fn newer_schema_is_refused() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("PRAGMA user_version = 99").unwrap();

    let err = run_migrations(&conn).unwrap_err();
    assert!(matches!(err, Error::CorruptedData(_)));
}

#[test]
fn corrupted_row_is_reported() {
    let mut queue = ClockQueue::open_in_memory().unwrap();
    queue.insert(&test_record("rec-1", 0)).unwrap();
    queue
        .conn
        .execute(
            "UPDATE offline_clock_records SET action = 'lunch' WHERE id = 'rec-1'",
            [],
        )
        .unwrap();

    assert!(queue.get("rec-1").is_err());
}
