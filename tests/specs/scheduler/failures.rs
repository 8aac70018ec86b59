//! Spawn-failure specs: backoff, retry, and deadletter.

use crate::prelude::*;

#[test]
fn transient_failure_blocks_with_retry_count() {
    // a gateway timeout blocks the task.
    let project = Project::basic();
    let id = created_id(
        &project
            .aof()
            .args(&["task", "create", "--title", "B", "--agent", "a1", "--ready"])
            .passes(),
    );

    project
        .aof()
        .args(&["poll", "--active", "--executor", "fail:gateway timeout"])
        .passes()
        .stdout_has("failed 1")
        // The action list names the blocked task and the reason.
        .stdout_has("\"type\":\"block\"")
        .stdout_has("spawn_failed: gateway timeout");

    assert_eq!(project.tasks_in("blocked"), vec![id.clone()]);
    let record = project.record("blocked", &id);
    assert!(record.contains("retryCount: 1"));
    assert!(record.contains("spawn_failed: gateway timeout"));
    assert!(record.contains("errorClass: transient"));
}

#[test]
fn blocked_task_recovers_after_backoff_then_deadletters() {
    // recover, fail, repeat to the retry ceiling.
    let project = Project::basic();
    let id = created_id(
        &project
            .aof()
            .args(&["task", "create", "--title", "B", "--agent", "a1", "--ready"])
            .passes(),
    );

    project
        .aof()
        .args(&["poll", "--active", "--executor", "fail:gateway timeout"])
        .passes();

    for round in 2..=3 {
        // Within the backoff window nothing moves.
        project
            .aof()
            .args(&["poll", "--active", "--executor", "fail:gateway timeout"])
            .passes();
        assert_eq!(project.tasks_in("blocked"), vec![id.clone()], "round {round}: still waiting");

        // Backdate the block timestamp past the window (240s covers the
        // jittered 60s and 180s retries).
        project.rewrite_field("blocked", &id, "lastBlockedAt", "2026-01-01T00:00:00Z");

        // First poll requeues; the cooled-down task dispatches next poll.
        project
            .aof()
            .args(&["poll", "--active", "--executor", "fail:gateway timeout"])
            .passes();
        assert_eq!(project.tasks_in("ready"), vec![id.clone()]);
        project
            .aof()
            .args(&["poll", "--active", "--executor", "fail:gateway timeout"])
            .passes();
        assert_eq!(project.tasks_in("blocked"), vec![id.clone()]);
        assert!(project
            .record("blocked", &id)
            .contains(&format!("retryCount: {round}")));
    }

    // Retry ceiling reached: the next recovery pass deadletters.
    project
        .aof()
        .args(&["poll", "--active", "--executor", "fail:gateway timeout"])
        .passes();
    assert_eq!(project.tasks_in("deadletter"), vec![id]);
    assert!(project.has_event("task.deadletter"));
}

#[test]
fn permanent_failure_deadletters_in_a_single_poll() {
    // unknown agent.
    let project = Project::basic();
    let id = created_id(
        &project
            .aof()
            .args(&["task", "create", "--title", "C", "--agent", "ghost", "--ready"])
            .passes(),
    );

    project
        .aof()
        .args(&["poll", "--active", "--executor", "fail:Agent not found: ghost"])
        .passes();

    assert_eq!(project.tasks_in("deadletter"), vec![id.clone()]);
    assert!(project.record("deadletter", &id).contains("errorClass: permanent"));

    let deadletter_events: Vec<_> = project
        .events()
        .into_iter()
        .filter(|e| e["type"] == "task.deadletter")
        .collect();
    assert_eq!(deadletter_events.len(), 1);
    assert_eq!(deadletter_events[0]["taskId"], id.as_str());
}

#[test]
fn noop_executor_blocks_visibly() {
    let project = Project::basic();
    let id = created_id(
        &project
            .aof()
            .args(&["task", "create", "--title", "D", "--agent", "a1", "--ready"])
            .passes(),
    );

    project.aof().args(&["poll", "--active"]).passes();

    assert_eq!(project.tasks_in("blocked"), vec![id.clone()]);
    assert!(project
        .record("blocked", &id)
        .contains("spawn_failed: no executor configured"));
}
