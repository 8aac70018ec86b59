// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Gate evaluator: a pure state machine over workflow configs.
//!
//! `evaluate` never touches storage. It computes the transition a gate
//! outcome implies; the protocol router (or recovery) applies it through
//! the store's atomic primitives.

mod context;

pub use context::build_gate_context;

use aof_core::{
    AgentId, GateHistoryEntry, GateState, ReviewContext, Task, TaskStatus,
};
use aof_manifest::Workflow;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors from gate evaluation
#[derive(Debug, Error)]
pub enum GateError {
    #[error("gate not in workflow: {0}")]
    GateNotInWorkflow(String),
    #[error("workflow misconfigured: {0}")]
    WorkflowMisconfigured(String),
    #[error("task {0} is not in a gate")]
    NotInGate(aof_core::TaskId),
}

/// Outcome reported for the current gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    Complete,
    NeedsReview,
    Blocked,
}

impl GateOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            GateOutcome::Complete => "complete",
            GateOutcome::NeedsReview => "needs_review",
            GateOutcome::Blocked => "blocked",
        }
    }
}

/// Inputs to one evaluation.
#[derive(Debug, Clone)]
pub struct GateEvaluation<'a> {
    pub task: &'a Task,
    pub workflow: &'a Workflow,
    pub outcome: GateOutcome,
    pub summary: Option<String>,
    pub blockers: Vec<String>,
    pub rejection_notes: Option<String>,
    pub agent: Option<AgentId>,
    pub now: DateTime<Utc>,
}

/// The computed transition: target status plus the record updates to fold
/// into the same atomic write.
#[derive(Debug, Clone, PartialEq)]
pub struct GateTransition {
    /// Status the task should move to.
    pub status: TaskStatus,
    /// Gate the task lands in; `None` means the workflow is finished.
    pub gate: Option<GateState>,
    /// Role to route the next dispatch to (the landing gate's role).
    pub routing_role: Option<String>,
    /// Review context to set (rejections) — `None` clears it on advance.
    pub review_context: Option<ReviewContext>,
    /// Exactly one entry appended per evaluation.
    pub history_entry: GateHistoryEntry,
    /// Gates skipped on advance because their `when` evaluated false.
    pub skipped: Vec<String>,
}

impl GateTransition {
    /// Fold the updates into a task record. The status change itself goes
    /// through the store so the bucket move stays atomic.
    pub fn apply(&self, task: &mut Task) {
        task.gate = self.gate.clone();
        task.gate_history.push(self.history_entry.clone());
        task.review_context = self.review_context.clone();
        if let Some(role) = &self.routing_role {
            task.routing.role = Some(role.clone());
        }
    }
}

/// Evaluate a gate outcome for a task inside a workflow.
pub fn evaluate(eval: GateEvaluation<'_>) -> Result<GateTransition, GateError> {
    let gate_state = eval
        .task
        .gate
        .as_ref()
        .ok_or_else(|| GateError::NotInGate(eval.task.id.clone()))?;

    let index = eval
        .workflow
        .gate_index(&gate_state.current)
        .ok_or_else(|| GateError::GateNotInWorkflow(gate_state.current.clone()))?;
    let current = &eval.workflow.gates[index];

    let duration = (eval.now - gate_state.entered).num_seconds().max(0);
    let history_entry = GateHistoryEntry {
        gate: current.id.clone(),
        role: current.role.clone(),
        agent: eval.agent.clone(),
        entered: gate_state.entered,
        exited: eval.now,
        outcome: eval.outcome.as_str().to_string(),
        summary: eval.summary.clone(),
        blockers: eval.blockers.clone(),
        duration,
    };

    match eval.outcome {
        GateOutcome::Complete => {
            let mut skipped = Vec::new();
            let mut next = None;
            for gate in eval.workflow.gates.iter().skip(index + 1) {
                let applies = gate
                    .when
                    .as_ref()
                    .map(|w| w.eval(&eval.task.routing, eval.task.priority))
                    .unwrap_or(true);
                if applies {
                    next = Some(gate);
                    break;
                }
                skipped.push(gate.id.clone());
            }

            match next {
                Some(gate) => Ok(GateTransition {
                    status: TaskStatus::Ready,
                    gate: Some(GateState {
                        current: gate.id.clone(),
                        entered: eval.now,
                    }),
                    routing_role: Some(gate.role.clone()),
                    review_context: None,
                    history_entry,
                    skipped,
                }),
                None => Ok(GateTransition {
                    status: TaskStatus::Done,
                    gate: None,
                    routing_role: None,
                    review_context: None,
                    history_entry,
                    skipped,
                }),
            }
        }

        GateOutcome::NeedsReview => {
            if !current.can_reject {
                return Err(GateError::WorkflowMisconfigured(format!(
                    "gate '{}' cannot reject",
                    current.id
                )));
            }
            let origin = eval
                .workflow
                .first_gate()
                .ok_or_else(|| GateError::WorkflowMisconfigured("workflow has no gates".into()))?;

            Ok(GateTransition {
                status: TaskStatus::Ready,
                gate: Some(GateState {
                    current: origin.id.clone(),
                    entered: eval.now,
                }),
                routing_role: Some(origin.role.clone()),
                // Rejection overwrites any prior review context.
                review_context: Some(ReviewContext {
                    from_gate: current.id.clone(),
                    from_agent: eval.agent.clone(),
                    from_role: Some(current.role.clone()),
                    timestamp: eval.now,
                    blockers: eval.blockers,
                    notes: eval.rejection_notes,
                }),
                history_entry,
                skipped: Vec::new(),
            })
        }

        GateOutcome::Blocked => Ok(GateTransition {
            status: TaskStatus::Blocked,
            // The task stays in its gate; `entered` is untouched.
            gate: Some(gate_state.clone()),
            routing_role: None,
            review_context: eval.task.review_context.clone(),
            history_entry,
            skipped: Vec::new(),
        }),
    }
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;
