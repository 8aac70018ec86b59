//! Lint specs: exit codes and validation events.

use crate::prelude::*;

#[test]
fn clean_directory_lints_ok() {
    let project = Project::basic();
    project
        .aof()
        .args(&["task", "create", "--title", "fine"])
        .passes();
    project
        .aof()
        .args(&["lint"])
        .passes()
        .stdout_has("0 error(s)");
}

#[test]
fn malformed_record_fails_lint_and_emits_event() {
    let project = Project::basic();
    project.file("tasks/backlog/TASK-2026-01-01-001.md", "no frontmatter");

    project
        .aof()
        .args(&["lint"])
        .fails()
        .stderr_has("lint error");

    assert!(project.has_event("task.validation.failed"));
}

#[test]
fn org_chart_errors_fail_lint() {
    let project = Project::empty();
    project.file("project.yaml", MINIMAL_PROJECT);
    project.file(
        "org/org-chart.yaml",
        "agents:\n  - id: a\n    reportsTo: b\n  - id: b\n    reportsTo: a\n",
    );

    project
        .aof()
        .args(&["lint"])
        .fails()
        .stdout_has("circular-reports-to");
}

#[test]
fn inverted_context_budget_fails_lint() {
    let project = Project::empty();
    project.file("project.yaml", MINIMAL_PROJECT);
    project.file(
        "org/org-chart.yaml",
        r#"
agents:
  - id: a1
    policies:
      context:
        target: 9000
        warn: 5000
        critical: 1000
"#,
    );

    project
        .aof()
        .args(&["lint"])
        .fails()
        .stdout_has("inverted-context-budget");
}

#[test]
fn bad_workflow_fails_lint() {
    let project = Project::empty();
    project.file(
        "project.yaml",
        "id: demo\nworkflow:\n  gates:\n    - id: dev\n      role: developer\n      canReject: true\n",
    );

    project.aof().args(&["lint"]).fails().stdout_has("canReject");
}
