// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executor (gateway) adapter
//!
//! The engine reads the serialized task file once, builds a [`SpawnContext`],
//! and hands it to `spawn_session`. Everything after that — process
//! management, transport, platform quirks — belongs to the implementation.

mod noop;
mod sim;

pub use noop::NoOpExecutor;
pub use sim::SimExecutor;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{ExecutorCall, FakeExecutor};

use aof_core::{AgentId, Priority, Routing, SessionId, TaskId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors from executor status/force-complete RPCs.
///
/// Spawn failures are not errors at this seam: `spawn_session` always
/// returns a [`SpawnResult`] and the engine classifies the error string.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),
    #[error("gateway unavailable: {0}")]
    Unavailable(String),
}

/// Everything a gateway needs to start a session for a task.
#[derive(Debug, Clone)]
pub struct SpawnContext {
    pub task_id: TaskId,
    /// Path of the task record at dispatch time.
    pub task_path: std::path::PathBuf,
    /// Pre-serialized record contents, read once before the transition.
    pub task_file_contents: String,
    pub agent: AgentId,
    pub priority: Priority,
    pub routing: Routing,
    /// Extended-thinking hint for the session.
    pub thinking: Option<String>,
    pub project_id: Option<String>,
    pub project_root: Option<std::path::PathBuf>,
    /// Stage brief for workflow tasks (role, expectations, outcomes, tips).
    pub gate_context: Option<String>,
    /// Per-call spawn timeout; a timeout surfaces as a transient error.
    pub timeout_ms: Option<u64>,
}

/// Result envelope for a spawn attempt.
#[derive(Debug, Clone, Default)]
pub struct SpawnResult {
    pub success: bool,
    pub session_id: Option<SessionId>,
    pub error: Option<String>,
    /// Set when the gateway refused due to a platform concurrency limit.
    pub platform_limit: Option<u32>,
}

impl SpawnResult {
    pub fn ok(session_id: impl Into<SessionId>) -> Self {
        Self {
            success: true,
            session_id: Some(session_id.into()),
            ..Default::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// Point-in-time session health.
#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub session_id: SessionId,
    pub alive: bool,
    pub last_heartbeat_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// The three-method gateway contract.
#[async_trait]
pub trait ExecutorAdapter: Send + Sync + 'static {
    /// Start a session for the task. Never panics, never returns `Err` —
    /// failures come back as `SpawnResult { success: false, error }` and are
    /// classified by the dispatcher.
    async fn spawn_session(&self, ctx: SpawnContext) -> SpawnResult;

    /// Point-in-time health check for a session.
    async fn get_session_status(&self, session_id: &SessionId)
        -> Result<SessionStatus, ExecutorError>;

    /// Tear down a session that recovery has decided is gone.
    async fn force_complete_session(&self, session_id: &SessionId) -> Result<(), ExecutorError>;
}
