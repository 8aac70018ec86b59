// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::FakeClock;
use crate::clock::Clock;

#[test]
fn kind_round_trips_known_names() {
    for kind in [
        EventKind::TaskCreated,
        EventKind::TaskTransitioned,
        EventKind::TaskValidationFailed,
        EventKind::TaskDeadletter,
        EventKind::LeaseExpired,
        EventKind::DispatchMatched,
        EventKind::ActionStarted,
        EventKind::ActionCompleted,
        EventKind::SchedulerPoll,
        EventKind::SlaViolation,
        EventKind::SessionForceCompleted,
        EventKind::ProtocolMessageRejected,
    ] {
        assert_eq!(EventKind::parse(kind.as_str()), kind);
    }
}

#[test]
fn kind_preserves_unknown_names() {
    let kind = EventKind::parse("future.event");
    assert_eq!(kind, EventKind::Other("future.event".to_string()));
    assert_eq!(kind.as_str(), "future.event");
}

#[test]
fn kind_serializes_as_dotted_string() {
    let json = serde_json::to_string(&EventKind::TaskValidationFailed).unwrap();
    assert_eq!(json, "\"task.validation.failed\"");
}

#[test]
fn record_wire_shape() {
    let clock = FakeClock::new();
    let record = EventRecord::new(EventKind::TaskCreated, "store", clock.now())
        .with_task(crate::TaskId::new("TASK-2026-01-15-001"))
        .with_payload(serde_json::json!({"priority": "high"}));

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["type"], "task.created");
    assert_eq!(json["taskId"], "TASK-2026-01-15-001");
    assert_eq!(json["actor"], "store");
    assert_eq!(json["payload"]["priority"], "high");
    assert_eq!(json["eventId"], 0);
}

#[test]
fn record_round_trip() {
    let clock = FakeClock::new();
    let record = EventRecord::new(EventKind::SchedulerPoll, "scheduler", clock.now())
        .with_payload(serde_json::json!({"actionsExecuted": 1}));
    let line = serde_json::to_string(&record).unwrap();
    let parsed: EventRecord = serde_json::from_str(&line).unwrap();
    assert_eq!(parsed, record);
}

#[test]
fn null_payload_is_skipped() {
    let clock = FakeClock::new();
    let record = EventRecord::new(EventKind::LeaseExpired, "lease", clock.now());
    let json = serde_json::to_string(&record).unwrap();
    assert!(!json.contains("payload"));
}
