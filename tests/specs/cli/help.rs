//! Help and version specs

use crate::prelude::*;

#[test]
fn help_lists_every_command() {
    let project = Project::empty();
    let help = project.aof().args(&["--help"]).passes();
    for command in ["poll", "task", "scan", "lint", "watch", "metrics", "config"] {
        let stdout = help.stdout();
        assert!(stdout.contains(command), "help missing {command}");
    }
}

#[test]
fn version_prints() {
    let project = Project::empty();
    project.aof().args(&["--version"]).passes().stdout_has("aof");
}

#[test]
fn task_help_lists_subcommands() {
    let project = Project::empty();
    let help = project.aof().args(&["task", "--help"]).passes();
    for sub in ["create", "get", "list", "update", "cancel", "block", "unblock", "dep-add", "dep-remove"] {
        let stdout = help.stdout();
        assert!(stdout.contains(sub), "task help missing {sub}");
    }
}
