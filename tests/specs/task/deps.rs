//! Dependency management specs

use crate::prelude::*;

#[test]
fn dep_add_and_remove() {
    let project = Project::basic();
    let a = created_id(&project.aof().args(&["task", "create", "--title", "a"]).passes());
    let b = created_id(&project.aof().args(&["task", "create", "--title", "b"]).passes());

    project.aof().args(&["task", "dep-add", &b, &a]).passes();
    assert!(project.record("backlog", &b).contains(&a));

    project.aof().args(&["task", "dep-remove", &b, &a]).passes();
    assert!(!project.record("backlog", &b).contains(&format!("- {a}")));
}

#[test]
fn dep_cycles_are_rejected() {
    let project = Project::basic();
    let a = created_id(&project.aof().args(&["task", "create", "--title", "a"]).passes());
    let b = created_id(&project.aof().args(&["task", "create", "--title", "b"]).passes());

    project.aof().args(&["task", "dep-add", &b, &a]).passes();
    project
        .aof()
        .args(&["task", "dep-add", &a, &b])
        .fails()
        .stderr_has("cycle");
}

#[test]
fn dep_on_missing_task_is_rejected() {
    let project = Project::basic();
    let a = created_id(&project.aof().args(&["task", "create", "--title", "a"]).passes());
    project
        .aof()
        .args(&["task", "dep-add", &a, "TASK-2026-01-01-999"])
        .fails()
        .stderr_has("task not found");
}

/// A pre-existing finished task, written as a fixture record.
const DONE_DEP: &str = "TASK-2026-01-01-001";

fn write_done_fixture(project: &Project) {
    project.file(
        &format!("tasks/done/{DONE_DEP}.md"),
        &format!(
            "---\nid: {DONE_DEP}\ntitle: finished dependency\nstatus: done\n\
             createdAt: 2026-01-01T00:00:00Z\nupdatedAt: 2026-01-01T01:00:00Z\n\
             lastTransitionAt: 2026-01-01T01:00:00Z\ncreatedBy: fixture\n---\n"
        ),
    );
}

#[test]
fn poll_promotes_when_dependency_done() {
    let project = Project::basic();
    write_done_fixture(&project);

    let open_dep = created_id(&project.aof().args(&["task", "create", "--title", "open"]).passes());
    let waiting = created_id(
        &project
            .aof()
            .args(&[
                "task", "create", "--title", "waiting", "--depends-on", DONE_DEP, "--depends-on",
                &open_dep,
            ])
            .passes(),
    );

    // One dependency is still open: no promotion.
    project.aof().args(&["poll", "--active"]).passes();
    assert!(project.tasks_in("backlog").contains(&waiting));

    project
        .aof()
        .args(&["task", "dep-remove", &waiting, &open_dep])
        .passes();

    // All remaining dependencies are done: promoted.
    project.aof().args(&["poll", "--active"]).passes();
    assert!(project.tasks_in("ready").contains(&waiting));
}

#[test]
fn dry_run_poll_does_not_promote() {
    let project = Project::basic();
    write_done_fixture(&project);
    let waiting = created_id(
        &project
            .aof()
            .args(&["task", "create", "--title", "waiting", "--depends-on", DONE_DEP])
            .passes(),
    );

    project.aof().args(&["poll"]).passes();
    assert!(project.tasks_in("backlog").contains(&waiting));

    project.aof().args(&["poll", "--active"]).passes();
    assert!(project.tasks_in("ready").contains(&waiting));
}
