// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SLA checker: emit-only detection of tasks stuck in progress.
//!
//! Effective limit resolution: task override, then the project default for
//! the agent's kind (researchers get the research ceiling), then hardcoded
//! defaults. Phase 1 only emits `sla.violation` events and alerts; nothing
//! is blocked.

use aof_core::{Clock, Task, TaskId, TaskStatus};
use aof_manifest::{OrgChart, SlaDefaults};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Hardcoded default in-progress ceiling: 1 hour.
pub const DEFAULT_MAX_IN_PROGRESS_MS: i64 = 60 * 60 * 1000;

/// Hardcoded researcher ceiling: 4 hours.
pub const RESEARCH_MAX_IN_PROGRESS_MS: i64 = 4 * 60 * 60 * 1000;

/// Default alert rate limit per task: 15 minutes.
pub const DEFAULT_RATE_LIMIT_MINUTES: i64 = 15;

/// A detected violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlaViolation {
    pub task_id: TaskId,
    pub duration_ms: i64,
    pub limit_ms: i64,
}

/// Stateful checker; the rate-limit memory is process-local.
pub struct SlaChecker {
    rate_limit_minutes: i64,
    last_alert_at: Mutex<HashMap<TaskId, DateTime<Utc>>>,
}

impl SlaChecker {
    pub fn new() -> Self {
        Self {
            rate_limit_minutes: DEFAULT_RATE_LIMIT_MINUTES,
            last_alert_at: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_rate_limit_minutes(mut self, minutes: i64) -> Self {
        self.rate_limit_minutes = minutes;
        self
    }

    /// The effective in-progress ceiling for a task.
    pub fn effective_limit_ms(task: &Task, defaults: &SlaDefaults, org: &OrgChart) -> i64 {
        if let Some(limit) = task.sla.as_ref().and_then(|s| s.max_in_progress_ms) {
            return limit;
        }
        let is_researcher = task
            .lease
            .as_ref()
            .and_then(|lease| org.agent(lease.agent.as_str()))
            .map(|agent| agent.roles.iter().any(|r| r == "researcher"))
            .unwrap_or(false);
        if is_researcher {
            defaults
                .research_max_in_progress_ms
                .unwrap_or(RESEARCH_MAX_IN_PROGRESS_MS)
        } else {
            defaults
                .default_max_in_progress_ms
                .unwrap_or(DEFAULT_MAX_IN_PROGRESS_MS)
        }
    }

    /// Check every in-progress task; returns violations that are not
    /// rate-limited (and arms the limiter for each one returned).
    pub fn check(
        &self,
        tasks: &[Task],
        defaults: &SlaDefaults,
        org: &OrgChart,
        clock: &Arc<dyn Clock>,
    ) -> Vec<SlaViolation> {
        let now = clock.now();
        let mut violations = Vec::new();
        let mut last_alerts = self.last_alert_at.lock();

        for task in tasks.iter().filter(|t| t.status == TaskStatus::InProgress) {
            let duration_ms = (now - task.updated_at).num_milliseconds();
            let limit_ms = Self::effective_limit_ms(task, defaults, org);
            if duration_ms <= limit_ms {
                continue;
            }
            let rate_limited = last_alerts
                .get(&task.id)
                .map(|last| (now - *last).num_minutes() < self.rate_limit_minutes)
                .unwrap_or(false);
            if rate_limited {
                continue;
            }
            last_alerts.insert(task.id.clone(), now);
            violations.push(SlaViolation {
                task_id: task.id.clone(),
                duration_ms,
                limit_ms,
            });
        }
        violations
    }
}

impl Default for SlaChecker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "sla_tests.rs"]
mod tests;
