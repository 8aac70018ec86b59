// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op executor.

use super::{ExecutorAdapter, ExecutorError, SessionStatus, SpawnContext, SpawnResult};
use aof_core::SessionId;
use async_trait::async_trait;

/// Executor used when no gateway is configured.
///
/// Spawns fail with a transient error, so tasks back off and stay visible
/// in `blocked` instead of silently vanishing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpExecutor;

impl NoOpExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ExecutorAdapter for NoOpExecutor {
    async fn spawn_session(&self, _ctx: SpawnContext) -> SpawnResult {
        SpawnResult::failed("no executor configured")
    }

    async fn get_session_status(
        &self,
        session_id: &SessionId,
    ) -> Result<SessionStatus, ExecutorError> {
        Err(ExecutorError::SessionNotFound(session_id.clone()))
    }

    async fn force_complete_session(&self, _session_id: &SessionId) -> Result<(), ExecutorError> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "noop_tests.rs"]
mod tests;
