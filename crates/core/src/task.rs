// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task record and status state machine.

use crate::id::{AgentId, SessionId, TeamId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

crate::define_id! {
    /// Unique identifier for a task.
    ///
    /// Ids are dated sequences of the form `TASK-<yyyy>-<mm>-<dd>-<nnn>`,
    /// allocated by the task store at creation time.
    #[derive(Default)]
    pub struct TaskId;
}

impl TaskId {
    /// Check the `TASK-<yyyy>-<mm>-<dd>-<nnn>` shape without parsing dates.
    pub fn is_well_formed(&self) -> bool {
        let parts: Vec<&str> = self.0.split('-').collect();
        parts.len() == 5
            && parts[0] == "TASK"
            && parts[1].len() == 4
            && parts[2].len() == 2
            && parts[3].len() == 2
            && parts[4].len() >= 3
            && parts[1..].iter().all(|p| p.bytes().all(|b| b.is_ascii_digit()))
    }
}

/// Status bucket a task lives in.
///
/// Status is encoded in the on-disk path (`tasks/<status>/<task-id>`);
/// a transition is an atomic rename between status directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Backlog,
    Ready,
    InProgress,
    Review,
    Blocked,
    Done,
    Deadletter,
    Cancelled,
}

impl TaskStatus {
    /// All statuses, in kanban display order. Also the set of directories
    /// the store scans.
    pub const ALL: [TaskStatus; 8] = [
        TaskStatus::Backlog,
        TaskStatus::Ready,
        TaskStatus::InProgress,
        TaskStatus::Review,
        TaskStatus::Blocked,
        TaskStatus::Done,
        TaskStatus::Deadletter,
        TaskStatus::Cancelled,
    ];

    /// Directory name under `tasks/` for this status.
    pub fn dir_name(&self) -> &'static str {
        match self {
            TaskStatus::Backlog => "backlog",
            TaskStatus::Ready => "ready",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Review => "review",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Done => "done",
            TaskStatus::Deadletter => "deadletter",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    /// Parse a status from its wire/directory name.
    pub fn parse(s: &str) -> Option<TaskStatus> {
        TaskStatus::ALL.into_iter().find(|st| st.dir_name() == s)
    }

    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Done | TaskStatus::Cancelled | TaskStatus::Deadletter
        )
    }

    /// The status transition table.
    ///
    /// `ready` is reachable from `in-progress` only through lease expiry,
    /// and from `review` only through the needs_review loopback; callers
    /// carry that context, the table just admits the edge.
    pub fn can_transition(from: TaskStatus, to: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (from, to),
            (Backlog, Ready)
                | (Backlog, Cancelled)
                | (Ready, InProgress)
                | (Ready, Blocked)
                | (Ready, Cancelled)
                | (InProgress, Review)
                | (InProgress, Done)
                | (InProgress, Blocked)
                | (InProgress, Ready)
                | (InProgress, Deadletter)
                | (Blocked, Ready)
                | (Blocked, Cancelled)
                | (Blocked, Deadletter)
                | (Review, Done)
                | (Review, Ready)
                | (Review, Blocked)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}

/// Dispatch priority. Sorts ascending: critical first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    #[default]
    Normal,
    Low,
}

impl Priority {
    pub fn parse(s: &str) -> Option<Priority> {
        match s {
            "critical" => Some(Priority::Critical),
            "high" => Some(Priority::High),
            "normal" => Some(Priority::Normal),
            "low" => Some(Priority::Low),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Critical => write!(f, "critical"),
            Priority::High => write!(f, "high"),
            Priority::Normal => write!(f, "normal"),
            Priority::Low => write!(f, "low"),
        }
    }
}

/// Routing hints used by the dispatch assigner and gate conditions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Routing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<TeamId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<String>,
}

/// Time-bounded single-agent claim on an in-progress task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lease {
    pub agent: AgentId,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub renew_count: u32,
}

impl Lease {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Position of a task inside a multi-stage workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateState {
    /// Id of the gate the task currently occupies.
    pub current: String,
    /// When the task entered the gate.
    pub entered: DateTime<Utc>,
}

/// Append-only record of one gate visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateHistoryEntry {
    pub gate: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentId>,
    pub entered: DateTime<Utc>,
    pub exited: DateTime<Utc>,
    /// `complete`, `needs_review`, or `blocked`.
    pub outcome: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blockers: Vec<String>,
    /// Seconds spent in the gate.
    pub duration: i64,
}

/// Context set when a gate rejects back to an earlier stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewContext {
    pub from_gate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_agent: Option<AgentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_role: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blockers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// One `status.update` merged into the task's work log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkLogEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blockers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

/// Open metadata map with a typed reserved schema.
///
/// Reserved keys are validated and used by the engine; everything else
/// passes through the flattened `extra` bag untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMetadata {
    #[serde(default, skip_serializing_if = "is_zero")]
    pub dispatch_failures: u32,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub retry_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_blocked_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    /// Task kind marker (e.g. `orchestration_review` for murmur reviews).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub delegation_depth: u32,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Per-task SLA override.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSla {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_in_progress_ms: Option<i64>,
}

/// Input for creating a new task.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub body: String,
    pub priority: Priority,
    pub routing: Routing,
    pub depends_on: Vec<TaskId>,
    pub created_by: String,
    /// `backlog` unless `ready` is explicitly requested.
    pub status: Option<TaskStatus>,
    pub metadata: TaskMetadata,
}

/// The primary entity tracked by the engine.
///
/// Serialized as YAML frontmatter; the free-form `body` is stored after the
/// closing fence and skipped here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Routing::is_empty")]
    pub routing: Routing,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease: Option<Lease>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate: Option<GateState>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gate_history: Vec<GateHistoryEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_context: Option<ReviewContext>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub work_log: Vec<WorkLogEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sla: Option<TaskSla>,
    #[serde(default, skip_serializing_if = "TaskMetadata::is_empty")]
    pub metadata: TaskMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_transition_at: DateTime<Utc>,
    #[serde(default)]
    pub created_by: String,
    /// Free-form task brief; lives outside the frontmatter on disk.
    #[serde(skip)]
    pub body: String,
}

impl Routing {
    pub fn is_empty(&self) -> bool {
        self.agent.is_none()
            && self.role.is_none()
            && self.team.is_none()
            && self.tags.is_empty()
            && self.workflow.is_none()
    }
}

impl TaskMetadata {
    pub fn is_empty(&self) -> bool {
        self.dispatch_failures == 0
            && self.retry_count == 0
            && self.last_blocked_at.is_none()
            && self.block_reason.is_none()
            && self.error_class.is_none()
            && self.correlation_id.is_none()
            && self.session_id.is_none()
            && self.kind.is_none()
            && self.delegation_depth == 0
            && self.extra.is_empty()
    }
}

impl Task {
    /// Build a task from creation input. The store assigns the id.
    pub fn new(id: TaskId, input: NewTask, now: DateTime<Utc>) -> Self {
        let status = match input.status {
            Some(TaskStatus::Ready) => TaskStatus::Ready,
            _ => TaskStatus::Backlog,
        };
        Self {
            id,
            title: input.title,
            status,
            priority: input.priority,
            routing: input.routing,
            depends_on: input.depends_on,
            lease: None,
            gate: None,
            gate_history: Vec::new(),
            review_context: None,
            work_log: Vec::new(),
            sla: None,
            metadata: input.metadata,
            created_at: now,
            updated_at: now,
            last_transition_at: now,
            created_by: input.created_by,
            body: input.body,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Check the edge table for a transition out of the current status.
    pub fn can_transition_to(&self, to: TaskStatus) -> bool {
        TaskStatus::can_transition(self.status, to)
    }

    /// Whether this task is a murmur-created review task.
    pub fn is_orchestration_review(&self) -> bool {
        self.metadata.kind.as_deref() == Some("orchestration_review")
    }

    /// Record a mutation timestamp without transitioning.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    /// Structural validation used by `lint()`.
    ///
    /// Returns one message per violated invariant; an empty vec means the
    /// record is well-formed.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if !self.id.is_well_formed() {
            issues.push(format!("malformed task id: {}", self.id));
        }
        if self.title.trim().is_empty() {
            issues.push("empty title".to_string());
        }
        match (self.status, &self.lease) {
            (TaskStatus::InProgress, None) => {
                issues.push("in-progress task has no lease".to_string());
            }
            (status, Some(_)) if status != TaskStatus::InProgress => {
                issues.push(format!("{status} task holds a lease"));
            }
            _ => {}
        }
        if self.depends_on.iter().any(|d| d == &self.id) {
            issues.push("task depends on itself".to_string());
        }
        if let Some(gate) = &self.gate {
            if gate.current.trim().is_empty() {
                issues.push("gate.current is empty".to_string());
            }
        }
        issues
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
