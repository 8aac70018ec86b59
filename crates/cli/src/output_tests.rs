// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use aof_core::test_support::ready_task_for_agent;
use aof_core::FakeClock;

#[test]
fn task_line_shows_assignee_and_status() {
    let clock = FakeClock::new();
    let task = ready_task_for_agent("TASK-2026-01-15-001", "a1", &clock);
    let line = task_line(&task);
    assert!(line.contains("TASK-2026-01-15-001"));
    assert!(line.contains("(ready)"));
    assert!(line.ends_with("-> a1"));
}

#[test]
fn task_line_prefers_lease_holder() {
    let clock = FakeClock::new();
    let mut task = ready_task_for_agent("TASK-2026-01-15-001", "a1", &clock);
    task.lease = Some(aof_core::Lease {
        agent: aof_core::AgentId::new("worker-9"),
        acquired_at: aof_core::Clock::now(&clock),
        expires_at: aof_core::Clock::now(&clock),
        renew_count: 0,
    });
    assert!(task_line(&task).ends_with("-> worker-9"));
}

#[test]
fn task_json_includes_body() {
    let clock = FakeClock::new();
    let mut task = ready_task_for_agent("TASK-2026-01-15-001", "a1", &clock);
    task.body = "the brief".to_string();
    let value = task_json(&task);
    assert_eq!(value["body"], "the brief");
    assert_eq!(value["id"], "TASK-2026-01-15-001");
}

#[test]
fn status_header_format() {
    assert_eq!(
        status_header(TaskStatus::InProgress, 3),
        "== in-progress (3)"
    );
}
