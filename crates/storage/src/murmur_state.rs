// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-team murmur review state.
//!
//! State lives at `.murmur/<team-id>.json`. Mutations are serialized per
//! team through a `.murmur/<team-id>.lock` file: create-new to acquire,
//! bounded retry with stale-lock takeover by mtime, remove on drop. The
//! JSON itself is written with the usual temp + rename.

use aof_core::{TaskId, TeamId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::warn;

/// How long to keep retrying the lock before giving up.
const LOCK_WAIT: Duration = Duration::from_secs(5);

/// A lock file older than this is presumed abandoned and taken over.
const LOCK_STALE: Duration = Duration::from_secs(30);

const LOCK_RETRY_SLEEP: Duration = Duration::from_millis(25);

/// Errors from murmur state operations
#[derive(Debug, Error)]
pub enum MurmurStateError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("state file corrupt for team {team}: {message}")]
    Corrupt { team: TeamId, message: String },
    #[error("could not acquire murmur lock for team {0} within {1:?}")]
    LockTimeout(TeamId, Duration),
}

/// Review-cycle state tracked per team.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MurmurState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_review_task_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_review_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_triggered_by: Option<String>,
    #[serde(default)]
    pub completions_since_last_review: u32,
    #[serde(default)]
    pub failures_since_last_review: u32,
}

impl MurmurState {
    /// The idempotency guard: no new review fires while one is open.
    pub fn review_open(&self) -> bool {
        self.current_review_task_id.is_some()
    }
}

/// RAII lock on one team's state file.
struct TeamLock {
    path: PathBuf,
}

impl TeamLock {
    fn acquire(path: PathBuf, team: &TeamId) -> Result<Self, MurmurStateError> {
        let deadline = Instant::now() + LOCK_WAIT;
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(Self { path }),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    // Take over locks abandoned by a crashed process.
                    if let Ok(meta) = fs::metadata(&path) {
                        let stale = meta
                            .modified()
                            .ok()
                            .and_then(|m| m.elapsed().ok())
                            .is_some_and(|age| age > LOCK_STALE);
                        if stale {
                            warn!(team = %team, lock = %path.display(), "taking over stale murmur lock");
                            let _ = fs::remove_file(&path);
                            continue;
                        }
                    }
                    if Instant::now() >= deadline {
                        return Err(MurmurStateError::LockTimeout(team.clone(), LOCK_WAIT));
                    }
                    std::thread::sleep(LOCK_RETRY_SLEEP);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl Drop for TeamLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Store for per-team murmur state under `<root>/.murmur/`.
#[derive(Clone)]
pub struct MurmurStateStore {
    dir: PathBuf,
}

impl MurmurStateStore {
    pub fn new(root: &Path) -> Self {
        Self {
            dir: root.join(".murmur"),
        }
    }

    fn state_path(&self, team: &TeamId) -> PathBuf {
        self.dir.join(format!("{team}.json"))
    }

    fn lock_path(&self, team: &TeamId) -> PathBuf {
        self.dir.join(format!("{team}.lock"))
    }

    /// Read a team's state without locking. Missing file is default state.
    pub fn load(&self, team: &TeamId) -> Result<MurmurState, MurmurStateError> {
        let raw = match fs::read_to_string(self.state_path(team)) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(MurmurState::default())
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&raw).map_err(|e| MurmurStateError::Corrupt {
            team: team.clone(),
            message: e.to_string(),
        })
    }

    /// Load, mutate, and persist a team's state under the team lock.
    pub fn update<R>(
        &self,
        team: &TeamId,
        mutate: impl FnOnce(&mut MurmurState) -> R,
    ) -> Result<R, MurmurStateError> {
        fs::create_dir_all(&self.dir)?;
        let _lock = TeamLock::acquire(self.lock_path(team), team)?;

        let mut state = self.load(team)?;
        let result = mutate(&mut state);

        let path = self.state_path(team);
        let tmp = path.with_extension("json.tmp");
        let raw = serde_json::to_string_pretty(&state)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &path)?;
        Ok(result)
    }

    /// Record one completed non-review task for the team.
    pub fn increment_completions(&self, team: &TeamId) -> Result<u32, MurmurStateError> {
        self.update(team, |state| {
            state.completions_since_last_review += 1;
            state.completions_since_last_review
        })
    }

    /// Record one failed (deadlettered) task for the team.
    pub fn increment_failures(&self, team: &TeamId) -> Result<u32, MurmurStateError> {
        self.update(team, |state| {
            state.failures_since_last_review += 1;
            state.failures_since_last_review
        })
    }

    /// Open a review cycle: set the guard and reset both counters.
    pub fn start_review(
        &self,
        team: &TeamId,
        review_task: &TaskId,
        triggered_by: &str,
        now: DateTime<Utc>,
    ) -> Result<(), MurmurStateError> {
        self.update(team, |state| {
            state.current_review_task_id = Some(review_task.clone());
            state.review_started_at = Some(now);
            state.last_triggered_by = Some(triggered_by.to_string());
            state.completions_since_last_review = 0;
            state.failures_since_last_review = 0;
        })
    }

    /// Close the review cycle and clear the guard.
    pub fn end_review(&self, team: &TeamId, now: DateTime<Utc>) -> Result<(), MurmurStateError> {
        self.update(team, |state| {
            state.current_review_task_id = None;
            state.review_started_at = None;
            state.last_review_at = Some(now);
            state.completions_since_last_review = 0;
            state.failures_since_last_review = 0;
        })
    }

    /// Team ids that have state files on disk.
    pub fn known_teams(&self) -> Result<Vec<TeamId>, MurmurStateError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut teams: Vec<TeamId> = entries
            .flatten()
            .filter_map(|e| {
                let name = e.file_name().to_string_lossy().to_string();
                name.strip_suffix(".json").map(TeamId::new)
            })
            .collect();
        teams.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(teams)
    }
}

#[cfg(test)]
#[path = "murmur_state_tests.rs"]
mod tests;
