// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol router: parse and apply agent-sent envelopes.
//!
//! Handlers for different tasks may run concurrently; handling of one task
//! id is serialized through a per-task mutex. Handler failures are logged
//! as `protocol.message.rejected` events and dropped — the router never
//! crashes on a bad message.

use crate::envelope::{self, Envelope};
use crate::gate::{self, GateEvaluation, GateOutcome};
use crate::murmur::MurmurManager;
use aof_core::{
    AgentId, EventKind, EventRecord, RunOutcome, RunResult, TaskId, TaskStatus, TestStats,
    WorkLogEntry,
};
use aof_manifest::{OrgChart, Workflow};
use aof_storage::{EventLogger, TaskStore, TransitionOpts};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Everything the router needs to act on one project.
#[derive(Clone)]
pub struct ProjectContext {
    pub store: TaskStore,
    pub workflow: Option<Workflow>,
    pub org: OrgChart,
}

/// Maps a `projectId` to its store and config.
pub trait ProjectResolver: Send + Sync {
    fn resolve(&self, project_id: &str) -> Option<ProjectContext>;
}

/// Resolver for the common single-project deployment.
pub struct SingleProjectResolver {
    project_id: String,
    context: ProjectContext,
}

impl SingleProjectResolver {
    pub fn new(project_id: impl Into<String>, context: ProjectContext) -> Self {
        Self {
            project_id: project_id.into(),
            context,
        }
    }
}

impl ProjectResolver for SingleProjectResolver {
    fn resolve(&self, project_id: &str) -> Option<ProjectContext> {
        (project_id == self.project_id).then(|| self.context.clone())
    }
}

/// What the router did with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Applied { kind: String },
    Rejected { reason: String },
    Unknown { kind: String },
}

/// The protocol router.
pub struct Router<R: ProjectResolver> {
    resolver: R,
    /// Fallback logger for messages that never resolve to a project.
    logger: EventLogger,
    locks: Mutex<HashMap<TaskId, Arc<Mutex<()>>>>,
}

impl<R: ProjectResolver> Router<R> {
    pub fn new(resolver: R, logger: EventLogger) -> Self {
        Self {
            resolver,
            logger,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn task_lock(&self, id: &TaskId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        locks.entry(id.clone()).or_default().clone()
    }

    fn reject(
        &self,
        logger: &EventLogger,
        envelope: Option<&Envelope>,
        reason: &str,
        detail: &str,
    ) -> Disposition {
        let now = chrono::Utc::now();
        let mut record = EventRecord::new(EventKind::ProtocolMessageRejected, "router", now)
            .with_payload(json!({"reason": reason, "detail": detail}));
        if let Some(envelope) = envelope {
            record = record.with_task(envelope.task_id.clone());
        }
        logger.emit(record);
        warn!(reason, detail, "protocol message rejected");
        Disposition::Rejected {
            reason: reason.to_string(),
        }
    }

    /// Decode and apply one message.
    pub fn handle(&self, raw: &str) -> Disposition {
        let fallback_logger = self.logger.clone();
        let envelope = match envelope::decode(raw) {
            Ok(envelope) => envelope,
            Err(e) => return self.reject(&fallback_logger, None, e.reason(), &e.to_string()),
        };

        let Some(ctx) = self.resolver.resolve(&envelope.project_id) else {
            return self.reject(
                &fallback_logger,
                Some(&envelope),
                "invalid_project_id",
                &envelope.project_id,
            );
        };

        // Serialize per task id across every handler path.
        let lock = self.task_lock(&envelope.task_id);
        let _guard = lock.lock();

        match envelope.kind.as_str() {
            "status.update" => self.handle_status_update(&ctx, &envelope),
            "completion.report" => self.handle_completion(&ctx, &envelope),
            "handoff.request" => self.handle_handoff_request(&ctx, &envelope),
            "handoff.accepted" => self.handle_handoff_accepted(&ctx, &envelope),
            "handoff.rejected" => self.handle_handoff_rejected(&ctx, &envelope),
            other => {
                ctx.store.logger().emit(
                    EventRecord::new(
                        EventKind::ProtocolMessageUnknown,
                        "router",
                        ctx.store.clock().now(),
                    )
                    .with_task(envelope.task_id.clone())
                    .with_payload(json!({"type": other})),
                );
                Disposition::Unknown {
                    kind: other.to_string(),
                }
            }
        }
    }

    fn handle_status_update(&self, ctx: &ProjectContext, envelope: &Envelope) -> Disposition {
        let logger = ctx.store.logger().clone();
        if ctx.store.get(&envelope.task_id).is_err() {
            return self.reject(
                &logger,
                Some(envelope),
                "task_not_found",
                envelope.task_id.as_str(),
            );
        }

        let payload = &envelope.payload;
        let blockers: Vec<String> = string_list(&payload["blockers"]);
        let entry = WorkLogEntry {
            timestamp: ctx.store.clock().now(),
            agent: Some(envelope.from_agent.clone()),
            progress: payload["progress"].as_str().map(str::to_string),
            blockers: blockers.clone(),
            notes: payload["notes"].as_str().map(str::to_string),
        };
        if let Err(e) = ctx
            .store
            .update(&envelope.task_id, |task| task.work_log.push(entry))
        {
            return self.reject(&logger, Some(envelope), "task_not_found", &e.to_string());
        }

        // Optional move to blocked when the agent says it is stuck.
        let mark_blocked = payload["markBlocked"].as_bool().unwrap_or(false);
        if mark_blocked && !blockers.is_empty() {
            let result = ctx.store.transition_and_update(
                &envelope.task_id,
                TaskStatus::Blocked,
                TransitionOpts {
                    reason: Some("agent reported blockers".to_string()),
                    blockers,
                    actor: Some(envelope.from_agent.to_string()),
                },
                |task| {
                    task.lease = None;
                },
            );
            if let Err(e) = result {
                warn!(task = %envelope.task_id, error = %e, "status.update blocked transition skipped");
            }
        }

        Disposition::Applied {
            kind: envelope.kind.clone(),
        }
    }

    fn handle_completion(&self, ctx: &ProjectContext, envelope: &Envelope) -> Disposition {
        let logger = ctx.store.logger().clone();
        let task = match ctx.store.get(&envelope.task_id) {
            Ok(task) => task,
            Err(_) => {
                return self.reject(
                    &logger,
                    Some(envelope),
                    "task_not_found",
                    envelope.task_id.as_str(),
                )
            }
        };

        let payload = &envelope.payload;
        let Some(outcome) = payload["outcome"].as_str().and_then(RunOutcome::parse) else {
            return self.reject(
                &logger,
                Some(envelope),
                "invalid_envelope",
                "missing or unknown outcome",
            );
        };

        let now = ctx.store.clock().now();
        let blockers = string_list(&payload["blockers"]);
        let tests: Option<TestStats> = serde_json::from_value(payload["tests"].clone()).ok();
        let notes = payload["notes"].as_str().map(str::to_string);

        // Durable artifact first; recovery depends on it existing even if
        // the transition below races a crash.
        let run_result = RunResult {
            task_id: envelope.task_id.clone(),
            outcome,
            agent: Some(envelope.from_agent.clone()),
            session_id: task.metadata.session_id.clone(),
            summary_ref: payload["summaryRef"].as_str().map(str::to_string),
            deliverables: string_list(&payload["deliverables"]),
            tests,
            blockers: blockers.clone(),
            notes,
            recorded_at: now,
        };
        match ctx.store.task_dir(&envelope.task_id) {
            Ok(task_dir) => {
                if let Err(e) = aof_storage::write_run_result(&task_dir, &run_result) {
                    warn!(task = %envelope.task_id, error = %e, "failed to write run result artifact");
                }
            }
            Err(e) => {
                warn!(task = %envelope.task_id, error = %e, "failed to locate task dir for run result");
            }
        }

        let applied = apply_outcome_transitions(
            ctx,
            &task,
            outcome,
            &blockers,
            payload["notes"].as_str(),
            Some(envelope.from_agent.clone()),
            "completion.report",
        );
        match applied {
            Ok(()) => Disposition::Applied {
                kind: envelope.kind.clone(),
            },
            Err(reason) => self.reject(&logger, Some(envelope), &reason, envelope.task_id.as_str()),
        }
    }

    fn handle_handoff_request(&self, ctx: &ProjectContext, envelope: &Envelope) -> Disposition {
        let logger = ctx.store.logger().clone();
        let payload = &envelope.payload;

        if let Some(payload_task) = payload["taskId"].as_str() {
            if payload_task != envelope.task_id.as_str() {
                return self.reject(&logger, Some(envelope), "taskId_mismatch", payload_task);
            }
        }

        let parent = match ctx.store.get(&envelope.task_id) {
            Ok(parent) => parent,
            Err(_) => {
                return self.reject(
                    &logger,
                    Some(envelope),
                    "missing_parent",
                    envelope.task_id.as_str(),
                )
            }
        };
        if parent.metadata.delegation_depth != 0 {
            return self.reject(
                &logger,
                Some(envelope),
                "nested_delegation",
                &parent.metadata.delegation_depth.to_string(),
            );
        }

        let Some(title) = payload["title"].as_str().filter(|t| !t.trim().is_empty()) else {
            return self.reject(&logger, Some(envelope), "invalid_envelope", "missing title");
        };
        let brief = payload["brief"].as_str().unwrap_or_default();
        let routing: aof_core::Routing =
            serde_json::from_value(payload["routing"].clone()).unwrap_or_default();

        let child = match ctx.store.create(aof_core::NewTask {
            title: title.to_string(),
            body: brief.to_string(),
            priority: parent.priority,
            routing,
            depends_on: Vec::new(),
            created_by: envelope.from_agent.to_string(),
            status: Some(TaskStatus::Ready),
            metadata: aof_core::TaskMetadata {
                delegation_depth: parent.metadata.delegation_depth + 1,
                correlation_id: parent.metadata.correlation_id.clone(),
                ..Default::default()
            },
        }) {
            Ok(child) => child,
            Err(e) => {
                return self.reject(&logger, Some(envelope), "invalid_envelope", &e.to_string())
            }
        };

        let now = ctx.store.clock().now();
        let handoff = aof_storage::Handoff {
            parent: parent.id.clone(),
            child: child.id.clone(),
            from_agent: envelope.from_agent.clone(),
            to_agent: envelope.to_agent.clone(),
            sent_at: envelope.sent_at,
            brief: brief.to_string(),
            context_refs: string_list(&payload["contextRefs"]),
        };
        match ctx.store.task_dir(&child.id) {
            Ok(task_dir) => {
                if let Err(e) = aof_storage::write_handoff(&task_dir, &handoff) {
                    warn!(task = %child.id, error = %e, "failed to write handoff artifacts");
                }
            }
            Err(e) => warn!(task = %child.id, error = %e, "failed to locate child task dir"),
        }

        logger.emit(
            EventRecord::new(EventKind::DelegationRequested, envelope.from_agent.as_str(), now)
                .with_task(parent.id.clone())
                .with_payload(json!({
                    "child": &child.id,
                    "fromAgent": &envelope.from_agent,
                    "toAgent": &envelope.to_agent,
                })),
        );
        Disposition::Applied {
            kind: envelope.kind.clone(),
        }
    }

    fn handle_handoff_accepted(&self, ctx: &ProjectContext, envelope: &Envelope) -> Disposition {
        let logger = ctx.store.logger().clone();
        if ctx.store.get(&envelope.task_id).is_err() {
            return self.reject(
                &logger,
                Some(envelope),
                "task_not_found",
                envelope.task_id.as_str(),
            );
        }
        logger.emit(
            EventRecord::new(
                EventKind::DelegationAccepted,
                envelope.from_agent.as_str(),
                ctx.store.clock().now(),
            )
            .with_task(envelope.task_id.clone()),
        );
        Disposition::Applied {
            kind: envelope.kind.clone(),
        }
    }

    fn handle_handoff_rejected(&self, ctx: &ProjectContext, envelope: &Envelope) -> Disposition {
        let logger = ctx.store.logger().clone();
        if ctx.store.get(&envelope.task_id).is_err() {
            return self.reject(
                &logger,
                Some(envelope),
                "task_not_found",
                envelope.task_id.as_str(),
            );
        }

        let reason = envelope.payload["reason"]
            .as_str()
            .unwrap_or("handoff rejected")
            .to_string();
        let result = ctx.store.transition_and_update(
            &envelope.task_id,
            TaskStatus::Blocked,
            TransitionOpts {
                reason: Some(reason.clone()),
                actor: Some(envelope.from_agent.to_string()),
                ..Default::default()
            },
            |task| {
                task.lease = None;
            },
        );
        if let Err(e) = result {
            warn!(task = %envelope.task_id, error = %e, "handoff.rejected block transition skipped");
        }

        logger.emit(
            EventRecord::new(
                EventKind::DelegationRejected,
                envelope.from_agent.as_str(),
                ctx.store.clock().now(),
            )
            .with_task(envelope.task_id.clone())
            .with_payload(json!({"reason": reason})),
        );
        Disposition::Applied {
            kind: envelope.kind.clone(),
        }
    }
}

fn string_list(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Shared by the router and stale-session recovery: apply a recorded run
/// outcome to a task, honoring the workflow/non-workflow split.
///
/// Returns a rejection reason on failure.
pub(crate) fn apply_outcome_transitions(
    ctx: &ProjectContext,
    task: &aof_core::Task,
    outcome: RunOutcome,
    blockers: &[String],
    notes: Option<&str>,
    agent: Option<AgentId>,
    actor: &str,
) -> Result<(), String> {
    let store = &ctx.store;
    let now = store.clock().now();
    let murmur = MurmurManager::new(store.root());

    if let Some(gate_state) = &task.gate {
        let Some(workflow) = &ctx.workflow else {
            return Err("workflow_misconfigured".to_string());
        };

        // Partial completions requeue the task in its current gate; the
        // gate evaluator only sees terminal gate outcomes.
        if outcome == RunOutcome::Partial {
            return store
                .transition_and_update(
                    &task.id,
                    TaskStatus::Ready,
                    TransitionOpts {
                        reason: Some("partial completion".to_string()),
                        actor: Some(actor.to_string()),
                        ..Default::default()
                    },
                    |t| {
                        t.lease = None;
                        t.metadata.session_id = None;
                    },
                )
                .map(|_| ())
                .map_err(|e| format!("invalid_transition: {e}"));
        }

        let gate_outcome = match outcome {
            RunOutcome::Done => GateOutcome::Complete,
            RunOutcome::NeedsReview => GateOutcome::NeedsReview,
            RunOutcome::Blocked => GateOutcome::Blocked,
            RunOutcome::Partial => unreachable!("handled above"),
        };
        let transition = gate::evaluate(GateEvaluation {
            task,
            workflow,
            outcome: gate_outcome,
            summary: notes.map(str::to_string),
            blockers: blockers.to_vec(),
            rejection_notes: notes.map(str::to_string),
            agent,
            now,
        })
        .map_err(|e| match e {
            gate::GateError::GateNotInWorkflow(_) => "gate_not_in_workflow".to_string(),
            _ => "workflow_misconfigured".to_string(),
        })?;

        let updated = store
            .transition_and_update(
                &task.id,
                transition.status,
                TransitionOpts {
                    reason: Some(format!("gate {}: {}", gate_state.current, outcome)),
                    blockers: blockers.to_vec(),
                    actor: Some(actor.to_string()),
                },
                |t| {
                    transition.apply(t);
                    t.lease = None;
                    t.metadata.session_id = None;
                },
            )
            .map_err(|e| format!("invalid_transition: {e}"))?;

        if updated.status == TaskStatus::Done {
            murmur.observe_terminal(&updated, TaskStatus::Done, &ctx.org, store);
        }
        return Ok(());
    }

    // Non-workflow path: needs_review surfaces as the `review` status.
    let target = match outcome {
        RunOutcome::Done => TaskStatus::Done,
        RunOutcome::NeedsReview => TaskStatus::Review,
        RunOutcome::Blocked => TaskStatus::Blocked,
        RunOutcome::Partial => TaskStatus::Ready,
    };
    let updated = store
        .transition_and_update(
            &task.id,
            target,
            TransitionOpts {
                reason: Some(format!("completion: {outcome}")),
                blockers: blockers.to_vec(),
                actor: Some(actor.to_string()),
            },
            |t| {
                t.lease = None;
                t.metadata.session_id = None;
            },
        )
        .map_err(|e| format!("invalid_transition: {e}"))?;

    if updated.status == TaskStatus::Done {
        murmur.observe_terminal(&updated, TaskStatus::Done, &ctx.org, store);
    }
    Ok(())
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
