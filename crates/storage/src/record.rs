// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task record serialization: YAML frontmatter + free-form body.
//!
//! On disk a task looks like:
//!
//! ```text
//! ---
//! id: TASK-2026-01-15-001
//! title: Fix the flaky test
//! status: ready
//! ---
//!
//! The brief goes here.
//! ```
//!
//! Unknown frontmatter fields are preserved through the task's flattened
//! metadata bag; the body is carried verbatim.

use aof_core::Task;

const FENCE: &str = "---";

/// Render a task to its on-disk form.
pub fn render_record(task: &Task) -> Result<String, serde_yaml::Error> {
    let frontmatter = serde_yaml::to_string(task)?;
    let mut out = String::with_capacity(frontmatter.len() + task.body.len() + 16);
    out.push_str(FENCE);
    out.push('\n');
    out.push_str(&frontmatter);
    if !frontmatter.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(FENCE);
    out.push('\n');
    if !task.body.is_empty() {
        out.push('\n');
        out.push_str(&task.body);
        if !task.body.ends_with('\n') {
            out.push('\n');
        }
    }
    Ok(out)
}

/// Parse an on-disk record back into a task.
///
/// Returns the YAML error for a malformed frontmatter block; a record with
/// no frontmatter fences at all is also an error (every task has structured
/// metadata).
pub fn parse_record(raw: &str) -> Result<Task, String> {
    let rest = raw
        .strip_prefix(FENCE)
        .and_then(|r| r.strip_prefix('\n'))
        .ok_or_else(|| "missing frontmatter open fence".to_string())?;

    let close = rest
        .find("\n---\n")
        .or_else(|| rest.strip_suffix("\n---").map(|head| head.len()))
        .ok_or_else(|| "missing frontmatter close fence".to_string())?;

    let (frontmatter, tail) = rest.split_at(close);
    let mut task: Task =
        serde_yaml::from_str(frontmatter).map_err(|e| format!("frontmatter: {e}"))?;

    let body = tail
        .strip_prefix("\n---\n")
        .or_else(|| tail.strip_prefix("\n---"))
        .unwrap_or("");
    task.body = body.trim_start_matches('\n').to_string();
    Ok(task)
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
