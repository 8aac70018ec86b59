// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lease manager: single-owner, time-bounded claims on tasks.
//!
//! A lease exists if and only if its task is `in-progress`; acquire and
//! release fold the lease mutation and the status move into one atomic
//! record write.

use aof_core::{AgentId, Clock, EventKind, EventRecord, Lease, TaskId, TaskStatus};
use aof_storage::{StoreError, TaskStore, TransitionOpts};
use chrono::Duration;
use serde_json::json;
use thiserror::Error;

/// Default lease TTL: 30 minutes.
pub const DEFAULT_LEASE_TTL_MS: i64 = 30 * 60 * 1000;

/// Default renewal ceiling.
pub const DEFAULT_MAX_RENEWALS: u32 = 10;

/// Errors from lease operations
#[derive(Debug, Error)]
pub enum LeaseError {
    #[error("lease held by {holder} on {task}")]
    LeaseHeld { task: TaskId, holder: AgentId },
    #[error("wrong holder for {task}: lease held by {holder}, not {caller}")]
    WrongHolder {
        task: TaskId,
        holder: AgentId,
        caller: AgentId,
    },
    #[error("renewals exhausted for {task}: {renew_count} >= {max_renewals}")]
    RenewalsExhausted {
        task: TaskId,
        renew_count: u32,
        max_renewals: u32,
    },
    #[error("no lease on {0}")]
    NoLease(TaskId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Lease operations over a task store.
pub struct LeaseManager<'a> {
    store: &'a TaskStore,
    ttl_ms: i64,
    max_renewals: u32,
}

impl<'a> LeaseManager<'a> {
    pub fn new(store: &'a TaskStore) -> Self {
        Self {
            store,
            ttl_ms: DEFAULT_LEASE_TTL_MS,
            max_renewals: DEFAULT_MAX_RENEWALS,
        }
    }

    pub fn with_ttl_ms(mut self, ttl_ms: i64) -> Self {
        self.ttl_ms = ttl_ms;
        self
    }

    pub fn with_max_renewals(mut self, max_renewals: u32) -> Self {
        self.max_renewals = max_renewals;
        self
    }

    /// Claim a task for an agent.
    ///
    /// Succeeds when the task is `ready`, or when it is `in-progress` with
    /// an expired lease (takeover). Sets the lease and moves to
    /// `in-progress` in one write.
    pub fn acquire(
        &self,
        id: &TaskId,
        agent: &AgentId,
        ttl_ms: Option<i64>,
    ) -> Result<Lease, LeaseError> {
        let task = self.store.get(id)?;
        let now = self.store.clock().now();
        let ttl = ttl_ms.unwrap_or(self.ttl_ms);
        let lease = Lease {
            agent: agent.clone(),
            acquired_at: now,
            expires_at: now + Duration::milliseconds(ttl),
            renew_count: 0,
        };

        match (&task.status, &task.lease) {
            (TaskStatus::Ready, _) => {
                self.store.transition_and_update(
                    id,
                    TaskStatus::InProgress,
                    TransitionOpts {
                        actor: Some(agent.to_string()),
                        ..Default::default()
                    },
                    |t| t.lease = Some(lease.clone()),
                )?;
            }
            (TaskStatus::InProgress, Some(existing)) if existing.is_expired(now) => {
                // Takeover of an expired lease: the status does not move,
                // only the holder changes.
                self.store.update(id, |t| t.lease = Some(lease.clone()))?;
            }
            (TaskStatus::InProgress, Some(existing)) => {
                return Err(LeaseError::LeaseHeld {
                    task: id.clone(),
                    holder: existing.agent.clone(),
                });
            }
            _ => {
                return Err(StoreError::InvalidTransition {
                    task: id.clone(),
                    from: task.status,
                    to: TaskStatus::InProgress,
                }
                .into());
            }
        }

        self.store.logger().emit(
            EventRecord::new(EventKind::LeaseAcquired, agent.as_str(), now)
                .with_task(id.clone())
                .with_payload(json!({
                    "agent": agent,
                    "expiresAt": lease.expires_at,
                })),
        );
        Ok(lease)
    }

    /// Extend the holder's lease.
    pub fn renew(
        &self,
        id: &TaskId,
        agent: &AgentId,
        ttl_ms: Option<i64>,
    ) -> Result<Lease, LeaseError> {
        let task = self.store.get(id)?;
        let lease = task.lease.ok_or_else(|| LeaseError::NoLease(id.clone()))?;
        if lease.agent != *agent {
            return Err(LeaseError::WrongHolder {
                task: id.clone(),
                holder: lease.agent,
                caller: agent.clone(),
            });
        }
        if lease.renew_count >= self.max_renewals {
            return Err(LeaseError::RenewalsExhausted {
                task: id.clone(),
                renew_count: lease.renew_count,
                max_renewals: self.max_renewals,
            });
        }

        let now = self.store.clock().now();
        let ttl = ttl_ms.unwrap_or(self.ttl_ms);
        let renewed = Lease {
            agent: lease.agent,
            acquired_at: lease.acquired_at,
            expires_at: now + Duration::milliseconds(ttl),
            renew_count: lease.renew_count + 1,
        };
        self.store.update(id, |t| t.lease = Some(renewed.clone()))?;

        self.store.logger().emit(
            EventRecord::new(EventKind::LeaseRenewed, agent.as_str(), now)
                .with_task(id.clone())
                .with_payload(json!({
                    "renewCount": renewed.renew_count,
                    "expiresAt": renewed.expires_at,
                })),
        );
        Ok(renewed)
    }

    /// Give a task back: clear the lease and return to `ready`.
    pub fn release(&self, id: &TaskId, agent: &AgentId) -> Result<(), LeaseError> {
        let task = self.store.get(id)?;
        let lease = task.lease.ok_or_else(|| LeaseError::NoLease(id.clone()))?;
        if lease.agent != *agent {
            return Err(LeaseError::WrongHolder {
                task: id.clone(),
                holder: lease.agent,
                caller: agent.clone(),
            });
        }

        self.store.transition_and_update(
            id,
            TaskStatus::Ready,
            TransitionOpts {
                reason: Some("lease released".to_string()),
                actor: Some(agent.to_string()),
                ..Default::default()
            },
            |t| t.lease = None,
        )?;

        let now = self.store.clock().now();
        self.store.logger().emit(
            EventRecord::new(EventKind::LeaseReleased, agent.as_str(), now).with_task(id.clone()),
        );
        Ok(())
    }

    /// Expire one task's lease: clear it and requeue to `ready`.
    ///
    /// Returns the previous holder. The caller (the scheduler's expiry
    /// pass) decides which tasks qualify.
    pub fn expire(&self, id: &TaskId) -> Result<AgentId, LeaseError> {
        let task = self.store.get(id)?;
        let lease = task.lease.ok_or_else(|| LeaseError::NoLease(id.clone()))?;
        let now = self.store.clock().now();

        if task.status == TaskStatus::InProgress {
            self.store.transition_and_update(
                id,
                TaskStatus::Ready,
                TransitionOpts {
                    reason: Some("lease expired".to_string()),
                    ..Default::default()
                },
                |t| t.lease = None,
            )?;
        } else {
            // A lease on any other status violates the invariant; clear it
            // where it stands.
            self.store.update(id, |t| t.lease = None)?;
        }

        self.store.logger().emit(
            EventRecord::new(EventKind::LeaseExpired, "scheduler", now)
                .with_task(id.clone())
                .with_payload(json!({
                    "agent": &lease.agent,
                    "expiredAt": lease.expires_at,
                })),
        );
        Ok(lease.agent)
    }
}

#[cfg(test)]
#[path = "lease_tests.rs"]
mod tests;
