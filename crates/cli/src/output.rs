// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output formatting for CLI commands.

use aof_core::{Task, TaskStatus};
use clap::ValueEnum;
use serde_json::json;

/// Output format selected with `-o/--output`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Cli,
    /// One JSON document
    Json,
    /// One JSON object per line
    Jsonl,
}

/// Serialize a task for JSON output (body included).
pub fn task_json(task: &Task) -> serde_json::Value {
    let mut value = serde_json::to_value(task).unwrap_or_else(|_| json!({}));
    if let Some(map) = value.as_object_mut() {
        map.insert("body".to_string(), json!(task.body));
    }
    value
}

/// One-line human rendering of a task.
pub fn task_line(task: &Task) -> String {
    let assignee = task
        .lease
        .as_ref()
        .map(|l| l.agent.to_string())
        .or_else(|| task.routing.agent.as_ref().map(|a| a.to_string()))
        .or_else(|| task.routing.role.clone())
        .or_else(|| task.routing.team.as_ref().map(|t| t.to_string()))
        .unwrap_or_else(|| "-".to_string());
    let gate = task
        .gate
        .as_ref()
        .map(|g| format!(" gate:{}", g.current))
        .unwrap_or_default();
    format!(
        "{}  [{}] {}  ({}{}) -> {}",
        task.id, task.priority, task.title, task.status, gate, assignee
    )
}

/// Section header used by `scan` and the kanban view.
pub fn status_header(status: TaskStatus, count: usize) -> String {
    format!("== {} ({count})", status.dir_name())
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
