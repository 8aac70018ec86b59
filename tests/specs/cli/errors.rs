//! CLI error handling specs
//!
//! Operator-facing failures exit 1 with a readable message.

use crate::prelude::*;

#[test]
fn unknown_task_id_fails() {
    let project = Project::basic();
    project
        .aof()
        .args(&["task", "get", "TASK-2026-01-01-999"])
        .fails()
        .stderr_has("task not found");
}

#[test]
fn poll_without_manifest_fails() {
    let project = Project::empty();
    project
        .aof()
        .args(&["poll"])
        .fails()
        .stderr_has("project.yaml");
}

#[test]
fn poll_with_wrong_project_filter_fails() {
    let project = Project::basic();
    project
        .aof()
        .args(&["poll", "--project", "elsewhere"])
        .fails()
        .stderr_has("not found here");
}

#[test]
fn invalid_priority_fails() {
    let project = Project::basic();
    project
        .aof()
        .args(&["task", "create", "--title", "x", "--priority", "urgent"])
        .fails()
        .stderr_has("unknown priority");
}

#[test]
fn invalid_transition_fails() {
    let project = Project::basic();
    let created = project
        .aof()
        .args(&["task", "create", "--title", "backlog task"])
        .passes();
    let id = created_id(&created);

    // backlog -> blocked is not an allowed edge
    project
        .aof()
        .args(&["task", "block", &id, "--reason", "nope"])
        .fails()
        .stderr_has("invalid transition");
}

#[test]
fn unknown_executor_fails() {
    let project = Project::basic();
    project
        .aof()
        .args(&["poll", "--active", "--executor", "bogus"])
        .fails()
        .stderr_has("unknown executor");
}
