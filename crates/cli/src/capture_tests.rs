// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::*;
use chrono::{Duration, TimeZone};
use tk_core::ManualClock;
use tokio::sync::Mutex;
use yare::parameterized;

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 16, 8, 30, 0).unwrap()
}

fn service() -> (CaptureService, SharedQueue, EventBus) {
    let queue: SharedQueue = Arc::new(Mutex::new(ClockQueue::open_in_memory().unwrap()));
    let clock = Arc::new(ManualClock::new(fixed_now()));
    let events = EventBus::new(clock.clone());
    let service = CaptureService::new(Arc::clone(&queue), clock, events.clone());
    (service, queue, events)
}

fn session() -> SessionContext {
    SessionContext::new("emp-7", "Mei Lin")
}

#[parameterized(
    missing_user_info = { PreconditionError::MissingUserInfo, "missing-user-info" },
    storage_full = { PreconditionError::StorageFull, "storage-full" },
    unsupported = { PreconditionError::Unsupported("read-only".into()), "unsupported" },
)]
fn precondition_reasons_are_stable(err: PreconditionError, reason: &str) {
    assert_eq!(err.reason(), reason);
    assert!(err.to_string().contains(reason));
}

#[tokio::test]
async fn can_capture_with_identity_and_writable_store() {
    let (service, _, _) = service();
    assert_eq!(service.can_capture_offline(&session()).await, Ok(()));
}

#[parameterized(
    blank_id = { "", "Mei Lin" },
    blank_name = { "emp-7", "  " },
)]
fn cannot_capture_without_identity(user_id: &str, user_name: &str) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    rt.block_on(async {
        let (service, _, _) = service();
        let session = SessionContext::new(user_id, user_name);
        assert_eq!(
            service.can_capture_offline(&session).await,
            Err(PreconditionError::MissingUserInfo)
        );
    });
}

#[tokio::test]
async fn capture_queues_pending_record() {
    let (service, queue, events) = service();
    let mut rx = events.subscribe();

    let receipt = service
        .capture(&session(), CaptureInput::new(ClockAction::ClockIn, "store-01"))
        .await
        .unwrap();

    assert_eq!(receipt.timestamp, fixed_now());
    let prefix = format!("{}-{:013}-", tk_core::id::RECORD_ID_PREFIX, fixed_now().timestamp_millis());
    assert!(receipt.record_id.starts_with(&prefix), "unexpected id {}", receipt.record_id);

    let record = queue.lock().await.get(&receipt.record_id).unwrap();
    assert!(!record.synced);
    assert_eq!(record.sync_attempts, 0);
    assert_eq!(record.user_id, "emp-7");
    assert_eq!(record.user_name, "Mei Lin");
    assert_eq!(record.action, ClockAction::ClockIn);
    assert_eq!(record.store_id, "store-01");
    assert_eq!(record.timestamp, fixed_now());
    assert_eq!(record.created_at, fixed_now());

    let device = record.device_info.unwrap();
    assert_eq!(device["platform"], std::env::consts::OS);
    assert_eq!(device["offlineCapture"], true);

    assert_eq!(
        rx.try_recv().unwrap().event,
        StatusEvent::RecordAdded {
            record_id: receipt.record_id,
            pending_count: 1,
        }
    );
}

#[tokio::test]
async fn capture_keeps_caller_values() {
    let (service, queue, _) = service();
    let earlier = fixed_now() - Duration::minutes(42);
    let location = GeoPoint::new(40.5, -3.75, Some(12.0)).unwrap();
    let input = CaptureInput::new(ClockAction::ClockOut, "store-02")
        .at(earlier)
        .with_location(location)
        .with_device_info(serde_json::json!({"faceMatch": true}));

    let receipt = service.capture(&session(), input).await.unwrap();

    let record = queue.lock().await.get(&receipt.record_id).unwrap();
    assert_eq!(record.timestamp, earlier);
    assert_eq!(record.created_at, fixed_now());
    assert_eq!(record.location, Some(location));
    assert_eq!(record.device_info, Some(serde_json::json!({"faceMatch": true})));
}

#[tokio::test]
async fn capture_without_identity_touches_nothing() {
    let (service, queue, _) = service();

    let err = service
        .capture(
            &SessionContext::default(),
            CaptureInput::new(ClockAction::ClockIn, "store-01"),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CaptureError::Precondition(PreconditionError::MissingUserInfo)
    ));
    assert_eq!(queue.lock().await.pending_count().unwrap(), 0);
}

#[tokio::test]
async fn capture_rejects_blank_store() {
    let (service, queue, _) = service();

    let err = service
        .capture(&session(), CaptureInput::new(ClockAction::ClockIn, "   "))
        .await
        .unwrap_err();

    assert!(matches!(err, CaptureError::InvalidInput(_)));
    assert_eq!(queue.lock().await.pending_count().unwrap(), 0);
}

#[tokio::test]
async fn captures_at_same_instant_get_distinct_ids() {
    let (service, queue, _) = service();

    let a = service
        .capture(&session(), CaptureInput::new(ClockAction::ClockIn, "store-01"))
        .await
        .unwrap();
    let b = service
        .capture(&session(), CaptureInput::new(ClockAction::ClockOut, "store-01"))
        .await
        .unwrap();

    assert_ne!(a.record_id, b.record_id);
    let ids: Vec<_> = queue
        .lock()
        .await
        .list_unsynced()
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec![a.record_id, b.record_id]);
}

#[test]
fn device_info_serializes_camel_case() {
    let info = DeviceInfo::current(fixed_now()).to_value();
    assert_eq!(info["appVersion"], env!("CARGO_PKG_VERSION"));
    assert_eq!(info["capturedAt"], "2026-04-16T08:30:00Z");
    assert_eq!(info["arch"], std::env::consts::ARCH);
}
