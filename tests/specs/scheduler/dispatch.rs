//! Dispatch specs: happy path and throttling, through the real binary.

use crate::prelude::*;

#[test]
fn happy_path_dispatch_takes_lease() {
    // ready task routed to a1, executor succeeds.
    let project = Project::basic();
    let id = created_id(
        &project
            .aof()
            .args(&["task", "create", "--title", "A", "--agent", "a1", "--ready"])
            .passes(),
    );

    project
        .aof()
        .args(&["poll", "--active", "--executor", "always-ok"])
        .passes()
        .stdout_has("executed 1");

    assert_eq!(project.tasks_in("in-progress"), vec![id.clone()]);
    let record = project.record("in-progress", &id);
    assert!(record.contains("agent: a1"), "lease names the agent:\n{record}");
    assert!(record.contains("sessionId: sim-1"));

    assert!(project.has_event("action.started"));
    assert!(project.has_event("action.completed"));
    assert!(project.has_event("dispatch.matched"));
    assert!(project.has_event("scheduler.poll"));

    let poll_event = project
        .events()
        .into_iter()
        .find(|e| e["type"] == "scheduler.poll")
        .unwrap();
    assert_eq!(poll_event["payload"]["actionsExecuted"], 1);
}

#[test]
fn dry_run_poll_plans_without_spawning() {
    let project = Project::basic();
    let id = created_id(
        &project
            .aof()
            .args(&["task", "create", "--title", "A", "--agent", "a1", "--ready"])
            .passes(),
    );

    project
        .aof()
        .args(&["poll", "--executor", "always-ok"])
        .passes()
        .stdout_has("dry-run")
        .stdout_has("assign");

    assert_eq!(project.tasks_in("ready"), vec![id]);
    assert!(!project.has_event("dispatch.matched"));
}

#[test]
fn unroutable_task_stays_ready() {
    let project = Project::basic();
    let id = created_id(
        &project
            .aof()
            .args(&["task", "create", "--title", "A", "--role", "astronaut", "--ready"])
            .passes(),
    );

    project
        .aof()
        .args(&["poll", "--active", "--executor", "always-ok"])
        .passes();

    assert_eq!(project.tasks_in("ready"), vec![id]);
    assert!(project.has_event("dispatch.unassigned"));
}

#[test]
fn role_routing_resolves_through_the_org_chart() {
    let project = Project::basic();
    let id = created_id(
        &project
            .aof()
            .args(&["task", "create", "--title", "A", "--role", "developer", "--ready"])
            .passes(),
    );

    project
        .aof()
        .args(&["poll", "--active", "--executor", "always-ok"])
        .passes();

    assert_eq!(project.tasks_in("in-progress"), vec![id.clone()]);
    assert!(project.record("in-progress", &id).contains("agent: a1"));
}

#[test]
fn concurrency_cap_limits_assigns() {
    // At most maxConcurrentDispatches tasks may be in flight at once.
    let project = Project::basic();
    for n in 0..5 {
        project
            .aof()
            .args(&["task", "create", "--title", &format!("t{n}"), "--agent", "a1", "--ready"])
            .passes();
    }

    project
        .aof()
        .args(&["poll", "--active", "--executor", "always-ok"])
        .passes()
        .stdout_has("executed 3");

    assert_eq!(project.tasks_in("in-progress").len(), 3);
    assert_eq!(project.tasks_in("ready").len(), 2);
}
