// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake executor for deterministic testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ExecutorAdapter, ExecutorError, SessionStatus, SpawnContext, SpawnResult};
use aof_core::{SessionId, TaskId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Recorded call to FakeExecutor
#[derive(Debug, Clone)]
pub enum ExecutorCall {
    Spawn {
        task_id: TaskId,
        agent: String,
        gate_context: Option<String>,
    },
    GetStatus {
        session_id: SessionId,
    },
    ForceComplete {
        session_id: SessionId,
    },
}

struct FakeExecutorState {
    calls: Vec<ExecutorCall>,
    /// Queue of scripted spawn results, consumed front-first. When the
    /// queue is empty, spawns succeed with sequential session ids.
    spawn_script: Vec<SpawnResult>,
    /// Per-task overrides take precedence over the queue.
    spawn_by_task: HashMap<TaskId, SpawnResult>,
    statuses: HashMap<SessionId, SessionStatus>,
    next_session: u64,
}

/// Fake executor for testing
///
/// Records all calls and returns scripted results.
#[derive(Clone)]
pub struct FakeExecutor {
    inner: Arc<Mutex<FakeExecutorState>>,
}

impl Default for FakeExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeExecutorState {
                calls: Vec::new(),
                spawn_script: Vec::new(),
                spawn_by_task: HashMap::new(),
                statuses: HashMap::new(),
                next_session: 0,
            })),
        }
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<ExecutorCall> {
        self.inner.lock().calls.clone()
    }

    /// Number of spawn calls recorded so far.
    pub fn spawn_count(&self) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, ExecutorCall::Spawn { .. }))
            .count()
    }

    /// Queue a result for the next un-scripted spawn.
    pub fn push_spawn_result(&self, result: SpawnResult) {
        self.inner.lock().spawn_script.push(result);
    }

    /// Script the spawn result for one specific task.
    pub fn set_spawn_result_for(&self, task_id: &TaskId, result: SpawnResult) {
        self.inner
            .lock()
            .spawn_by_task
            .insert(task_id.clone(), result);
    }

    /// Set the status returned for a session.
    pub fn set_session_status(&self, status: SessionStatus) {
        self.inner
            .lock()
            .statuses
            .insert(status.session_id.clone(), status);
    }

    /// Mark a session's heartbeat.
    pub fn set_heartbeat(&self, session_id: &SessionId, at: DateTime<Utc>) {
        let mut inner = self.inner.lock();
        let entry = inner
            .statuses
            .entry(session_id.clone())
            .or_insert_with(|| SessionStatus {
                session_id: session_id.clone(),
                alive: true,
                last_heartbeat_at: None,
                completed_at: None,
            });
        entry.last_heartbeat_at = Some(at);
    }
}

#[async_trait]
impl ExecutorAdapter for FakeExecutor {
    async fn spawn_session(&self, ctx: SpawnContext) -> SpawnResult {
        let mut inner = self.inner.lock();
        inner.calls.push(ExecutorCall::Spawn {
            task_id: ctx.task_id.clone(),
            agent: ctx.agent.to_string(),
            gate_context: ctx.gate_context.clone(),
        });

        if let Some(result) = inner.spawn_by_task.get(&ctx.task_id) {
            return result.clone();
        }
        if !inner.spawn_script.is_empty() {
            return inner.spawn_script.remove(0);
        }

        inner.next_session += 1;
        let session_id = SessionId::new(format!("fake-{}", inner.next_session));
        inner.statuses.insert(
            session_id.clone(),
            SessionStatus {
                session_id: session_id.clone(),
                alive: true,
                last_heartbeat_at: None,
                completed_at: None,
            },
        );
        SpawnResult::ok(session_id)
    }

    async fn get_session_status(
        &self,
        session_id: &SessionId,
    ) -> Result<SessionStatus, ExecutorError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ExecutorCall::GetStatus {
            session_id: session_id.clone(),
        });
        inner
            .statuses
            .get(session_id)
            .cloned()
            .ok_or_else(|| ExecutorError::SessionNotFound(session_id.clone()))
    }

    async fn force_complete_session(&self, session_id: &SessionId) -> Result<(), ExecutorError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ExecutorCall::ForceComplete {
            session_id: session_id.clone(),
        });
        if let Some(status) = inner.statuses.get_mut(session_id) {
            status.alive = false;
            status.completed_at = Some(Utc::now());
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
