//! Config command specs: validated atomic org-chart writes.

use crate::prelude::*;

#[test]
fn config_get_prints_the_roster() {
    let project = Project::basic();
    project
        .aof()
        .args(&["config", "get"])
        .passes()
        .stdout_has("alpha")
        .stdout_has("a1");
}

#[test]
fn config_validate_passes_on_clean_setup() {
    let project = Project::basic();
    project
        .aof()
        .args(&["config", "validate"])
        .passes()
        .stdout_has("configuration ok");
}

#[test]
fn config_validate_fails_without_manifest() {
    let project = Project::empty();
    project.aof().args(&["config", "validate"]).fails();
}

#[test]
fn config_set_replaces_the_roster_atomically() {
    let project = Project::basic();
    project.file(
        "new-org.yaml",
        "teams:\n  - id: beta\nagents:\n  - id: b1\n    team: beta\n",
    );

    project
        .aof()
        .args(&["config", "set", &project.root().join("new-org.yaml").to_string_lossy()])
        .passes();

    let chart = project.read("org/org-chart.yaml");
    assert!(chart.contains("beta"));
    assert!(!chart.contains("alpha"));
}

#[test]
fn config_set_rejects_invalid_rosters_without_writing() {
    let project = Project::basic();
    project.file(
        "bad-org.yaml",
        "agents:\n  - id: a\n    team: ghost-team\n",
    );

    project
        .aof()
        .args(&["config", "set", &project.root().join("bad-org.yaml").to_string_lossy()])
        .fails();

    // The previous roster is untouched.
    let chart = project.read("org/org-chart.yaml");
    assert!(chart.contains("alpha"));
}
