// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use aof_adapters::notify::FakeNotifyAdapter;
use aof_core::{Clock, FakeClock, TaskId};

fn deadletter_record(clock: &FakeClock) -> EventRecord {
    EventRecord::new(EventKind::TaskDeadletter, "scheduler", clock.now())
        .with_task(TaskId::new("TASK-2026-01-15-001"))
        .with_payload(serde_json::json!({"lastFailureReason": "spawn_failed: timeout"}))
}

#[tokio::test]
async fn forwards_deadletter_events() {
    let adapter = FakeNotifyAdapter::new();
    let bridge = NotifyBridge::new(adapter.clone());
    let clock = FakeClock::new();

    bridge.on_event(&deadletter_record(&clock));
    // The notification is spawned; give the runtime a turn.
    tokio::task::yield_now().await;
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;

    let calls = adapter.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].title, "task deadlettered");
    assert!(calls[0].message.contains("TASK-2026-01-15-001"));
}

#[tokio::test]
async fn ignores_routine_events() {
    let adapter = FakeNotifyAdapter::new();
    let bridge = NotifyBridge::new(adapter.clone());
    let clock = FakeClock::new();

    bridge.on_event(&EventRecord::new(
        EventKind::TaskCreated,
        "store",
        clock.now(),
    ));
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    assert!(adapter.calls().is_empty());
}
