//! Scan and watch projection specs.

use crate::prelude::*;

#[test]
fn scan_groups_by_status() {
    let project = Project::basic();
    let backlog = created_id(&project.aof().args(&["task", "create", "--title", "b"]).passes());
    let ready = created_id(
        &project
            .aof()
            .args(&["task", "create", "--title", "r", "--ready"])
            .passes(),
    );

    project
        .aof()
        .args(&["scan"])
        .passes()
        .stdout_has("== backlog (1)")
        .stdout_has("== ready (1)")
        .stdout_has(&backlog)
        .stdout_has(&ready);
}

#[test]
fn scan_json_buckets_ids() {
    let project = Project::basic();
    let id = created_id(&project.aof().args(&["task", "create", "--title", "b"]).passes());

    let shown = project.aof().args(&["-o", "json", "scan"]).passes();
    let value: serde_json::Value = serde_json::from_str(&shown.stdout()).unwrap();
    assert_eq!(value["project"], "demo");
    assert_eq!(value["tasks"]["backlog"][0], id.as_str());
}

#[test]
fn watch_kanban_once_renders_columns() {
    let project = Project::basic();
    created_id(
        &project
            .aof()
            .args(&["task", "create", "--title", "visible", "--ready"])
            .passes(),
    );

    project
        .aof()
        .args(&["watch", "kanban", "--once"])
        .passes()
        .stdout_has("== ready (1)")
        .stdout_has("visible");
}

#[test]
fn watch_mailbox_once_filters_by_agent() {
    let project = Project::basic();
    created_id(
        &project
            .aof()
            .args(&["task", "create", "--title", "for-a1", "--agent", "a1", "--ready"])
            .passes(),
    );
    created_id(
        &project
            .aof()
            .args(&["task", "create", "--title", "for-lead", "--agent", "lead-1", "--ready"])
            .passes(),
    );

    project
        .aof()
        .args(&["watch", "mailbox", "--once", "--agent", "a1"])
        .passes()
        .stdout_has("@a1 (1)")
        .stdout_has("for-a1")
        .stdout_lacks("for-lead");
}

#[test]
fn watch_accepts_explicit_path() {
    let project = Project::basic();
    created_id(
        &project
            .aof()
            .args(&["task", "create", "--title", "here", "--ready"])
            .passes(),
    );

    // Pass the data dir positionally; AOF_ROOT points there anyway, but the
    // positional path must be honored.
    let path = project.root().to_string_lossy().to_string();
    project
        .aof()
        .args(&["watch", "kanban", &path, "--once"])
        .passes()
        .stdout_has("here");
}
