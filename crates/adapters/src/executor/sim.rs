// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Simulated executor for rehearsing orchestration without a gateway.
//!
//! `aof poll --executor always-ok` runs a full dispatch cycle against this
//! adapter: sessions "start" instantly and report a live heartbeat. The
//! failing variant exercises the retry/backoff/deadletter paths end to end.

use super::{ExecutorAdapter, ExecutorError, SessionStatus, SpawnContext, SpawnResult};
use aof_core::SessionId;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

enum SimMode {
    AlwaysOk,
    AlwaysFail(String),
}

/// Deterministic in-process executor.
pub struct SimExecutor {
    mode: SimMode,
    counter: AtomicU64,
    sessions: Mutex<Vec<SessionId>>,
}

impl SimExecutor {
    /// Every spawn succeeds with a fresh session id (`sim-1`, `sim-2`, …).
    pub fn always_ok() -> Arc<Self> {
        Arc::new(Self {
            mode: SimMode::AlwaysOk,
            counter: AtomicU64::new(0),
            sessions: Mutex::new(Vec::new()),
        })
    }

    /// Every spawn fails with the given error string.
    pub fn always_fail(error: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            mode: SimMode::AlwaysFail(error.into()),
            counter: AtomicU64::new(0),
            sessions: Mutex::new(Vec::new()),
        })
    }

    /// Sessions handed out so far.
    pub fn spawned(&self) -> usize {
        self.sessions.lock().len()
    }
}

#[async_trait]
impl ExecutorAdapter for SimExecutor {
    async fn spawn_session(&self, _ctx: SpawnContext) -> SpawnResult {
        match &self.mode {
            SimMode::AlwaysOk => {
                let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
                let id = SessionId::new(format!("sim-{n}"));
                self.sessions.lock().push(id.clone());
                SpawnResult::ok(id)
            }
            SimMode::AlwaysFail(error) => SpawnResult::failed(error.clone()),
        }
    }

    async fn get_session_status(
        &self,
        session_id: &SessionId,
    ) -> Result<SessionStatus, ExecutorError> {
        let known = self.sessions.lock().iter().any(|s| s == session_id);
        if !known {
            return Err(ExecutorError::SessionNotFound(session_id.clone()));
        }
        Ok(SessionStatus {
            session_id: session_id.clone(),
            alive: true,
            last_heartbeat_at: Some(chrono::Utc::now()),
            completed_at: None,
        })
    }

    async fn force_complete_session(&self, session_id: &SessionId) -> Result<(), ExecutorError> {
        self.sessions.lock().retain(|s| s != session_id);
        Ok(())
    }
}

#[cfg(test)]
#[path = "sim_tests.rs"]
mod tests;
