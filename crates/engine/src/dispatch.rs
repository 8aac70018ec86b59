// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatch policy: throttles, agent resolution, spawn-error
//! classification, and retry backoff.

use aof_core::{AgentId, Task};
use aof_manifest::OrgChart;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use regex::RegexSet;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Spawn retry base delay: 60 s.
pub const BACKOFF_BASE_MS: i64 = 60_000;

/// Spawn retry ceiling: 15 min.
pub const BACKOFF_CEILING_MS: i64 = 900_000;

/// Backoff growth factor per retry.
pub const BACKOFF_FACTOR: i64 = 3;

/// Classification of a failed spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnErrorClass {
    /// Retrying cannot help (unknown agent, auth failure). Deadletter now.
    Permanent,
    /// Backpressure from the gateway. Retry with backoff.
    RateLimited,
    /// Everything else. Retry with backoff.
    Transient,
}

impl fmt::Display for SpawnErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpawnErrorClass::Permanent => write!(f, "permanent"),
            SpawnErrorClass::RateLimited => write!(f, "rate_limited"),
            SpawnErrorClass::Transient => write!(f, "transient"),
        }
    }
}

fn permanent_patterns() -> &'static RegexSet {
    static SET: OnceLock<RegexSet> = OnceLock::new();
    SET.get_or_init(|| {
        RegexSet::new([
            r"(?i)agent not found",
            r"(?i)agent_not_found",
            r"(?i)no such agent",
            r"(?i)agent deregistered",
            r"(?i)permission denied",
            r"(?i)forbidden",
            r"(?i)unauthorized",
        ])
        .unwrap_or_else(|_| RegexSet::empty())
    })
}

fn rate_limit_patterns() -> &'static RegexSet {
    static SET: OnceLock<RegexSet> = OnceLock::new();
    SET.get_or_init(|| {
        RegexSet::new([
            r"(?i)rate[ _-]?limit",
            r"(?i)too many requests",
            r"429",
            r"(?i)throttled",
            r"(?i)quota exceeded",
        ])
        .unwrap_or_else(|_| RegexSet::empty())
    })
}

/// Classify a spawn error string.
///
/// Permanent wins over rate-limited when both match (an unknown agent is
/// unrecoverable no matter what the gateway was doing).
pub fn classify_spawn_error(error: &str) -> SpawnErrorClass {
    if permanent_patterns().is_match(error) {
        SpawnErrorClass::Permanent
    } else if rate_limit_patterns().is_match(error) {
        SpawnErrorClass::RateLimited
    } else {
        SpawnErrorClass::Transient
    }
}

/// Delay before retry `n` (0-based), with uniform ±25% jitter.
///
/// `jitter` is a uniform sample in `[0, 1)`; `0.5` means no jitter, which
/// tests use to pin the schedule: 60 s, 180 s, 540 s, then capped at 15 min.
pub fn compute_retry_backoff_ms(retry: u32, jitter: f64) -> i64 {
    let factor = BACKOFF_FACTOR.saturating_pow(retry.min(16));
    let base = BACKOFF_BASE_MS
        .saturating_mul(factor)
        .min(BACKOFF_CEILING_MS);
    // Map jitter in [0,1) to a multiplier in [0.75, 1.25).
    let multiplier = 0.75 + jitter.clamp(0.0, 1.0) * 0.5;
    (base as f64 * multiplier) as i64
}

/// Sample a jittered backoff with thread-local randomness.
pub fn sample_retry_backoff_ms(retry: u32) -> i64 {
    compute_retry_backoff_ms(retry, rand::random::<f64>())
}

/// Dispatch throttle limits (global; teams override via the org chart).
#[derive(Debug, Clone)]
pub struct DispatchLimits {
    /// Ceiling on concurrent `in-progress` tasks.
    pub max_concurrent_dispatches: usize,
    /// Minimum wall-clock spacing between successful dispatches.
    pub min_dispatch_interval_ms: i64,
    /// Ceiling on assigns per poll invocation.
    pub max_dispatches_per_poll: usize,
    /// Spawn failures tolerated before deadletter.
    pub max_dispatch_retries: u32,
}

impl Default for DispatchLimits {
    fn default() -> Self {
        Self {
            max_concurrent_dispatches: 3,
            min_dispatch_interval_ms: 0,
            max_dispatches_per_poll: 10,
            max_dispatch_retries: 3,
        }
    }
}

/// In-memory interval tracker shared across polls.
///
/// Process-local and non-durable: after a restart the orchestrator behaves
/// as if no dispatch has ever occurred. Dry-run polls never touch it.
#[derive(Clone, Default)]
pub struct ThrottleState {
    inner: Arc<Mutex<ThrottleInner>>,
}

#[derive(Default)]
struct ThrottleInner {
    last_dispatch_at: Option<DateTime<Utc>>,
    last_team_dispatch_at: HashMap<String, DateTime<Utc>>,
}

impl ThrottleState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the global interval admits a dispatch now.
    pub fn global_interval_ok(&self, now: DateTime<Utc>, min_interval_ms: i64) -> bool {
        if min_interval_ms <= 0 {
            return true;
        }
        match self.inner.lock().last_dispatch_at {
            None => true,
            Some(last) => (now - last).num_milliseconds() >= min_interval_ms,
        }
    }

    /// Whether a team's interval admits a dispatch now.
    pub fn team_interval_ok(&self, team: &str, now: DateTime<Utc>, min_interval_ms: i64) -> bool {
        if min_interval_ms <= 0 {
            return true;
        }
        match self.inner.lock().last_team_dispatch_at.get(team) {
            None => true,
            Some(last) => (now - *last).num_milliseconds() >= min_interval_ms,
        }
    }

    /// Record a successful dispatch.
    pub fn record_dispatch(&self, team: Option<&str>, now: DateTime<Utc>) {
        let mut inner = self.inner.lock();
        inner.last_dispatch_at = Some(now);
        if let Some(team) = team {
            inner.last_team_dispatch_at.insert(team.to_string(), now);
        }
    }
}

/// Resolve the agent a ready task should be assigned to.
///
/// Preference order: explicit `routing.agent` (must be active), then the
/// first active agent carrying `routing.role`, then the first active member
/// of `routing.team`. `None` means the task stays `ready` and the action is
/// logged `dispatch.unassigned`.
pub fn resolve_agent(task: &Task, org: &OrgChart) -> Option<AgentId> {
    if let Some(agent) = &task.routing.agent {
        // An explicit agent wins even when absent from the roster: the org
        // chart may be trailing reality, and the gateway is the authority
        // on whether the agent exists.
        match org.agent(agent.as_str()) {
            Some(entry) if !entry.active => return None,
            _ => return Some(agent.clone()),
        }
    }
    if let Some(role) = &task.routing.role {
        if let Some(agent) = org.agents_with_role(role).next() {
            return Some(agent.id.clone());
        }
    }
    if let Some(team) = &task.routing.team {
        if let Some(agent) = org.team_members(team.as_str()).next() {
            return Some(agent.id.clone());
        }
    }
    None
}

/// Effective per-team concurrency limit for an agent's team, if any.
pub fn team_limits<'a>(
    agent: &AgentId,
    org: &'a OrgChart,
) -> Option<(&'a str, &'a aof_manifest::TeamDispatch)> {
    let entry = org.agent(agent.as_str())?;
    let team = entry.team.as_ref()?;
    let team_def = org.team(team.as_str())?;
    let dispatch = team_def.dispatch.as_ref()?;
    Some((team_def.id.as_str(), dispatch))
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
