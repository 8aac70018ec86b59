//! Task CRUD specs

use crate::prelude::*;

#[test]
fn create_lands_in_backlog_with_dated_id() {
    let project = Project::basic();
    let created = project
        .aof()
        .args(&["task", "create", "--title", "First task", "--body", "Do it."])
        .passes();
    let id = created_id(&created);

    assert_eq!(project.tasks_in("backlog"), vec![id.clone()]);
    let record = project.record("backlog", &id);
    assert!(record.starts_with("---\n"));
    assert!(record.contains("title: First task"));
    assert!(record.contains("Do it."));
    assert!(project.has_event("task.created"));
}

#[test]
fn create_ready_skips_backlog() {
    let project = Project::basic();
    let created = project
        .aof()
        .args(&["task", "create", "--title", "Ready now", "--ready"])
        .passes();
    let id = created_id(&created);
    assert_eq!(project.tasks_in("ready"), vec![id]);
    assert!(project.tasks_in("backlog").is_empty());
}

#[test]
fn ids_are_sequential_within_a_day() {
    let project = Project::basic();
    let first = created_id(&project.aof().args(&["task", "create", "--title", "a"]).passes());
    let second = created_id(&project.aof().args(&["task", "create", "--title", "b"]).passes());
    assert!(first.ends_with("-001"));
    assert!(second.ends_with("-002"));
}

#[test]
fn get_shows_title_and_body() {
    let project = Project::basic();
    let id = created_id(
        &project
            .aof()
            .args(&["task", "create", "--title", "Readable", "--body", "The brief."])
            .passes(),
    );
    project
        .aof()
        .args(&["task", "get", &id])
        .passes()
        .stdout_has("Readable")
        .stdout_has("The brief.");
}

#[test]
fn list_filters_by_status() {
    let project = Project::basic();
    let backlog = created_id(&project.aof().args(&["task", "create", "--title", "b1"]).passes());
    let ready = created_id(
        &project
            .aof()
            .args(&["task", "create", "--title", "r1", "--ready"])
            .passes(),
    );

    project
        .aof()
        .args(&["task", "list", "--status", "ready"])
        .passes()
        .stdout_has(&ready)
        .stdout_lacks(&backlog);
}

#[test]
fn update_changes_priority_and_body() {
    let project = Project::basic();
    let id = created_id(&project.aof().args(&["task", "create", "--title", "t"]).passes());

    project
        .aof()
        .args(&["task", "update", &id, "--priority", "critical", "--body", "new body"])
        .passes();

    let record = project.record("backlog", &id);
    assert!(record.contains("priority: critical"));
    assert!(record.contains("new body"));
}

#[test]
fn cancel_moves_record_to_cancelled() {
    let project = Project::basic();
    let id = created_id(&project.aof().args(&["task", "create", "--title", "t"]).passes());

    project.aof().args(&["task", "cancel", &id]).passes();
    assert_eq!(project.tasks_in("cancelled"), vec![id]);
    assert!(project.tasks_in("backlog").is_empty());
    assert!(project.has_event("task.transitioned"));
}

#[test]
fn block_then_unblock_round_trip() {
    let project = Project::basic();
    let id = created_id(
        &project
            .aof()
            .args(&["task", "create", "--title", "t", "--ready"])
            .passes(),
    );

    project
        .aof()
        .args(&["task", "block", &id, "--reason", "waiting on infra"])
        .passes();
    assert!(project.record("blocked", &id).contains("waiting on infra"));

    project.aof().args(&["task", "unblock", &id]).passes();
    assert_eq!(project.tasks_in("ready"), vec![id]);
}

#[test]
fn json_output_is_machine_readable() {
    let project = Project::basic();
    let id = created_id(
        &project
            .aof()
            .args(&["task", "create", "--title", "t", "--tag", "security"])
            .passes(),
    );

    let shown = project
        .aof()
        .args(&["-o", "json", "task", "get", &id])
        .passes();
    let value: serde_json::Value = serde_json::from_str(&shown.stdout()).unwrap();
    assert_eq!(value["id"], id.as_str());
    assert_eq!(value["routing"]["tags"][0], "security");
}
