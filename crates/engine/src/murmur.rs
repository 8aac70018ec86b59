// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Murmur: per-team periodic review cycles.
//!
//! Each team's triggers are evaluated in order during the scheduler's
//! murmur pass; the first match fires a review task assigned to the team's
//! orchestrator. The per-team guard (`current_review_task_id`) makes firing
//! idempotent across polls; a cleanup step clears guards whose review task
//! is gone, finished, or timed out.

use aof_core::{
    Clock, EventKind, EventRecord, NewTask, Priority, Routing, Task, TaskId, TaskStatus,
};
use aof_manifest::{MurmurTrigger, OrgChart, Team};
use aof_storage::{MurmurStateStore, TaskStore};
use serde_json::json;
use std::path::Path;
use tracing::warn;

/// Default review timeout: 30 minutes.
pub const DEFAULT_REVIEW_TIMEOUT_MS: i64 = 30 * 60 * 1000;

/// Why a stale review guard was cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupReason {
    TaskNotFound,
    TaskDone,
    Timeout,
}

impl CleanupReason {
    fn as_str(&self) -> &'static str {
        match self {
            CleanupReason::TaskNotFound => "task_not_found",
            CleanupReason::TaskDone => "task_done",
            CleanupReason::Timeout => "timeout",
        }
    }
}

/// Outcome of one murmur pass.
#[derive(Debug, Default)]
pub struct MurmurPassReport {
    /// Review tasks created this pass: `(team, task, trigger)`.
    pub created: Vec<(String, TaskId, String)>,
    /// Teams whose trigger matched but whose guard was already set.
    pub reviews_skipped: u32,
    /// Guards cleared: `(team, reason)`.
    pub cleaned: Vec<(String, CleanupReason)>,
}

/// The murmur manager: trigger evaluation plus counter bookkeeping.
pub struct MurmurManager {
    state: MurmurStateStore,
    review_timeout_ms: i64,
}

impl MurmurManager {
    pub fn new(root: &Path) -> Self {
        Self {
            state: MurmurStateStore::new(root),
            review_timeout_ms: DEFAULT_REVIEW_TIMEOUT_MS,
        }
    }

    pub fn with_review_timeout_ms(mut self, timeout_ms: i64) -> Self {
        self.review_timeout_ms = timeout_ms;
        self
    }

    pub fn state_store(&self) -> &MurmurStateStore {
        &self.state
    }

    /// The team a task flows through, for counter attribution.
    pub fn team_for_task<'a>(task: &Task, org: &'a OrgChart) -> Option<&'a Team> {
        if let Some(team) = &task.routing.team {
            return org.team(team.as_str());
        }
        let agent = task
            .routing
            .agent
            .as_ref()
            .or(task.lease.as_ref().map(|l| &l.agent))?;
        let entry = org.agent(agent.as_str())?;
        org.team(entry.team.as_ref()?.as_str())
    }

    /// Counter bookkeeping for a terminal transition.
    ///
    /// A regular task reaching `done` bumps the team's completion counter;
    /// a review task reaching `done` ends the review instead. Deadletters
    /// bump the failure counter.
    pub fn observe_terminal(&self, task: &Task, to: TaskStatus, org: &OrgChart, store: &TaskStore) {
        let Some(team) = Self::team_for_task(task, org) else {
            return;
        };
        let now = store.clock().now();
        let result = match to {
            TaskStatus::Done if task.is_orchestration_review() => {
                let ended = self.state.end_review(&team.id, now);
                if ended.is_ok() {
                    store.logger().emit(
                        EventRecord::new(EventKind::MurmurReviewEnded, "murmur", now)
                            .with_task(task.id.clone())
                            .with_payload(json!({"team": &team.id})),
                    );
                }
                ended
            }
            TaskStatus::Done => self.state.increment_completions(&team.id).map(|_| ()),
            TaskStatus::Deadletter => self.state.increment_failures(&team.id).map(|_| ()),
            _ => Ok(()),
        };
        if let Err(e) = result {
            warn!(team = %team.id, task = %task.id, error = %e, "murmur counter update failed");
        }
    }

    /// Clear a stale guard for one team, if any.
    fn cleanup(&self, team: &Team, store: &TaskStore) -> Option<CleanupReason> {
        let state = self.state.load(&team.id).ok()?;
        let review_id = state.current_review_task_id.clone()?;
        let now = store.clock().now();

        let reason = match store.get(&review_id) {
            Err(_) => Some(CleanupReason::TaskNotFound),
            Ok(task) if task.status == TaskStatus::Done => Some(CleanupReason::TaskDone),
            Ok(_) => {
                let timed_out = state
                    .review_started_at
                    .map(|started| (now - started).num_milliseconds() > self.review_timeout_ms)
                    .unwrap_or(true);
                timed_out.then_some(CleanupReason::Timeout)
            }
        }?;

        if let Err(e) = self.state.end_review(&team.id, now) {
            warn!(team = %team.id, error = %e, "failed to clear stale murmur review");
            return None;
        }
        store.logger().emit(
            EventRecord::new(EventKind::MurmurReviewCleaned, "murmur", now)
                .with_task(review_id)
                .with_payload(json!({"team": &team.id, "reason": reason.as_str()})),
        );
        Some(reason)
    }

    /// Evaluate a team's triggers against the current task snapshot.
    ///
    /// Returns the name of the first trigger that fires.
    pub fn evaluate_triggers(
        &self,
        team: &Team,
        tasks: &[Task],
        org: &OrgChart,
    ) -> Option<String> {
        let murmur = team.murmur.as_ref()?;
        let state = self.state.load(&team.id).ok()?;

        for trigger in &murmur.triggers {
            let fired = match trigger {
                // Review tasks are not team work: an open review must not
                // hold the queue non-empty.
                MurmurTrigger::QueueEmpty => !tasks.iter().any(|t| {
                    matches!(t.status, TaskStatus::Ready | TaskStatus::InProgress)
                        && !t.is_orchestration_review()
                        && Self::team_for_task(t, org).is_some_and(|tm| tm.id == team.id)
                }),
                MurmurTrigger::CompletionBatch { threshold } => {
                    state.completions_since_last_review >= *threshold
                }
                MurmurTrigger::FailureBatch { threshold } => {
                    state.failures_since_last_review >= *threshold
                }
            };
            if fired {
                return Some(trigger_name(trigger).to_string());
            }
        }
        None
    }

    /// Run cleanup + trigger evaluation + firing for every murmur-enabled
    /// team. In dry-run mode nothing is created or persisted.
    pub fn run_pass(
        &self,
        store: &TaskStore,
        org: &OrgChart,
        tasks: &[Task],
        dry_run: bool,
    ) -> MurmurPassReport {
        let mut report = MurmurPassReport::default();

        for team in org.teams.iter().filter(|t| t.murmur.is_some()) {
            if !dry_run {
                if let Some(reason) = self.cleanup(team, store) {
                    report.cleaned.push((team.id.to_string(), reason));
                }
            }

            let Some(trigger) = self.evaluate_triggers(team, tasks, org) else {
                continue;
            };

            let guard_open = self
                .state
                .load(&team.id)
                .map(|s| s.review_open())
                .unwrap_or(true);
            if guard_open {
                report.reviews_skipped += 1;
                continue;
            }

            if dry_run {
                report
                    .created
                    .push((team.id.to_string(), TaskId::default(), trigger));
                continue;
            }

            match self.fire(team, &trigger, store) {
                Ok(task_id) => report.created.push((team.id.to_string(), task_id, trigger)),
                Err(e) => {
                    warn!(team = %team.id, error = %e, "failed to create murmur review task")
                }
            }
        }
        report
    }

    /// Create the review task and arm the guard.
    fn fire(
        &self,
        team: &Team,
        trigger: &str,
        store: &TaskStore,
    ) -> Result<TaskId, Box<dyn std::error::Error + Send + Sync>> {
        let orchestrator = team
            .orchestrator
            .clone()
            .ok_or_else(|| format!("team {} has no orchestrator", team.id))?;

        let includes = team
            .murmur
            .as_ref()
            .map(|m| m.context_includes.clone())
            .unwrap_or_default();
        let mut body = format!(
            "Periodic orchestration review for team '{}' (trigger: {trigger}).\n\n\
             Look over the team's queue, recent completions, and failures; \
             rebalance routing or priorities where needed.\n",
            team.id
        );
        if !includes.is_empty() {
            body.push_str("\nContext to consider:\n");
            for include in &includes {
                body.push_str(&format!("- {include}\n"));
            }
        }

        let metadata = aof_core::TaskMetadata {
            kind: Some("orchestration_review".to_string()),
            ..Default::default()
        };

        let task = store.create(NewTask {
            title: format!("Orchestration review: {}", team.id),
            body,
            priority: Priority::High,
            routing: Routing {
                agent: Some(orchestrator),
                team: Some(team.id.clone()),
                ..Default::default()
            },
            depends_on: Vec::new(),
            created_by: "murmur".to_string(),
            status: Some(TaskStatus::Ready),
            metadata,
        })?;

        let now = store.clock().now();
        self.state.start_review(&team.id, &task.id, trigger, now)?;
        store.logger().emit(
            EventRecord::new(EventKind::MurmurReviewStarted, "murmur", now)
                .with_task(task.id.clone())
                .with_payload(json!({"team": &team.id, "trigger": trigger})),
        );
        Ok(task.id)
    }
}

fn trigger_name(trigger: &MurmurTrigger) -> &'static str {
    match trigger {
        MurmurTrigger::QueueEmpty => "queueEmpty",
        MurmurTrigger::CompletionBatch { .. } => "completionBatch",
        MurmurTrigger::FailureBatch { .. } => "failureBatch",
    }
}

#[cfg(test)]
#[path = "murmur_tests.rs"]
mod tests;
