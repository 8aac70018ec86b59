// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Gate context builder.
//!
//! Turns `(task, gate, workflow)` into the human-readable stage brief that
//! rides through `spawn_session` as `gate_context`, so agents see their
//! stage's role, expectations, and outcomes without reading raw config.

use aof_core::Task;
use aof_manifest::{Gate, Workflow};

/// Build the stage brief for a task entering a gate.
pub fn build_gate_context(task: &Task, gate: &Gate, workflow: &Workflow) -> String {
    let position = workflow
        .gate_index(&gate.id)
        .map(|i| format!("stage {} of {}", i + 1, workflow.gates.len()))
        .unwrap_or_else(|| "stage".to_string());

    let mut out = String::new();
    out.push_str(&format!("## Workflow stage: {} ({position})\n\n", gate.id));
    out.push_str(&format!("Role: {}\n", gate.role));
    if let Some(description) = &gate.description {
        out.push_str(&format!("\n{description}\n"));
    }

    out.push_str("\n### Expectations\n\n");
    if let Some(review) = &task.review_context {
        out.push_str(&format!(
            "This task was sent back from the '{}' gate. Address the blockers before anything else:\n",
            review.from_gate
        ));
        for blocker in &review.blockers {
            out.push_str(&format!("- {blocker}\n"));
        }
        if let Some(notes) = &review.notes {
            out.push_str(&format!("\nReviewer notes: {notes}\n"));
        }
    } else {
        out.push_str("Work the task brief below to this stage's standard.\n");
    }

    out.push_str("\n### Outcomes\n\n");
    out.push_str("Report completion with one of:\n");
    out.push_str("- `complete` — this stage's work is done; the task advances.\n");
    if gate.can_reject {
        out.push_str(
            "- `needs_review` — the work does not pass; the task returns to the first stage. Name concrete blockers.\n",
        );
    }
    out.push_str("- `blocked` — you cannot proceed; list what is missing.\n");

    let later: Vec<&str> = workflow
        .gate_index(&gate.id)
        .map(|i| {
            workflow.gates[i + 1..]
                .iter()
                .map(|g| g.id.as_str())
                .collect()
        })
        .unwrap_or_default();
    if !later.is_empty() {
        out.push_str("\n### Tips\n\n");
        out.push_str(&format!(
            "Stages after this one: {}. Leave the task in a state they can pick up.\n",
            later.join(" -> ")
        ));
    }

    out
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
