// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable run-result artifact shared by the protocol router and the
//! stale-session recovery pass.

use crate::id::{AgentId, SessionId};
use crate::task::TaskId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome reported by a completion, or recorded for recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Done,
    NeedsReview,
    Blocked,
    Partial,
}

impl RunOutcome {
    pub fn parse(s: &str) -> Option<RunOutcome> {
        match s {
            "done" => Some(RunOutcome::Done),
            "needs_review" => Some(RunOutcome::NeedsReview),
            "blocked" => Some(RunOutcome::Blocked),
            "partial" => Some(RunOutcome::Partial),
            _ => None,
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Done => write!(f, "done"),
            RunOutcome::NeedsReview => write!(f, "needs_review"),
            RunOutcome::Blocked => write!(f, "blocked"),
            RunOutcome::Partial => write!(f, "partial"),
        }
    }
}

/// Test tallies from a completion report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestStats {
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub passed: u32,
    #[serde(default)]
    pub failed: u32,
}

/// The durable artifact written for every completion report.
///
/// Recovery consults this record when a session goes stale: if present, the
/// recorded outcome is applied; if absent, the task is reclaimed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub task_id: TaskId,
    pub outcome: RunOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deliverables: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tests: Option<TestStats>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blockers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
#[path = "run_result_tests.rs"]
mod tests;
