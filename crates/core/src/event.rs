// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event records for the append-only daily streams.

use crate::task::TaskId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Event type, serialized as the dotted wire name (`task.created`, …).
///
/// Unknown names round-trip through [`EventKind::Other`] so readers of old
/// or newer streams never drop records.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    TaskCreated,
    TaskTransitioned,
    TaskValidationFailed,
    TaskDeadletter,
    LeaseAcquired,
    LeaseRenewed,
    LeaseReleased,
    LeaseExpired,
    DispatchMatched,
    DispatchUnassigned,
    ActionStarted,
    ActionCompleted,
    SchedulerPoll,
    SlaViolation,
    SessionForceCompleted,
    DelegationRequested,
    DelegationAccepted,
    DelegationRejected,
    MurmurReviewStarted,
    MurmurReviewEnded,
    MurmurReviewCleaned,
    ProtocolMessageRejected,
    ProtocolMessageUnknown,
    Other(String),
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::TaskCreated => "task.created",
            EventKind::TaskTransitioned => "task.transitioned",
            EventKind::TaskValidationFailed => "task.validation.failed",
            EventKind::TaskDeadletter => "task.deadletter",
            EventKind::LeaseAcquired => "lease.acquired",
            EventKind::LeaseRenewed => "lease.renewed",
            EventKind::LeaseReleased => "lease.released",
            EventKind::LeaseExpired => "lease.expired",
            EventKind::DispatchMatched => "dispatch.matched",
            EventKind::DispatchUnassigned => "dispatch.unassigned",
            EventKind::ActionStarted => "action.started",
            EventKind::ActionCompleted => "action.completed",
            EventKind::SchedulerPoll => "scheduler.poll",
            EventKind::SlaViolation => "sla.violation",
            EventKind::SessionForceCompleted => "session.force_completed",
            EventKind::DelegationRequested => "delegation.requested",
            EventKind::DelegationAccepted => "delegation.accepted",
            EventKind::DelegationRejected => "delegation.rejected",
            EventKind::MurmurReviewStarted => "murmur.review.started",
            EventKind::MurmurReviewEnded => "murmur.review.ended",
            EventKind::MurmurReviewCleaned => "murmur.review.cleaned",
            EventKind::ProtocolMessageRejected => "protocol.message.rejected",
            EventKind::ProtocolMessageUnknown => "protocol.message.unknown",
            EventKind::Other(s) => s,
        }
    }

    pub fn parse(s: &str) -> EventKind {
        match s {
            "task.created" => EventKind::TaskCreated,
            "task.transitioned" => EventKind::TaskTransitioned,
            "task.validation.failed" => EventKind::TaskValidationFailed,
            "task.deadletter" => EventKind::TaskDeadletter,
            "lease.acquired" => EventKind::LeaseAcquired,
            "lease.renewed" => EventKind::LeaseRenewed,
            "lease.released" => EventKind::LeaseReleased,
            "lease.expired" => EventKind::LeaseExpired,
            "dispatch.matched" => EventKind::DispatchMatched,
            "dispatch.unassigned" => EventKind::DispatchUnassigned,
            "action.started" => EventKind::ActionStarted,
            "action.completed" => EventKind::ActionCompleted,
            "scheduler.poll" => EventKind::SchedulerPoll,
            "sla.violation" => EventKind::SlaViolation,
            "session.force_completed" => EventKind::SessionForceCompleted,
            "delegation.requested" => EventKind::DelegationRequested,
            "delegation.accepted" => EventKind::DelegationAccepted,
            "delegation.rejected" => EventKind::DelegationRejected,
            "murmur.review.started" => EventKind::MurmurReviewStarted,
            "murmur.review.ended" => EventKind::MurmurReviewEnded,
            "murmur.review.cleaned" => EventKind::MurmurReviewCleaned,
            "protocol.message.rejected" => EventKind::ProtocolMessageRejected,
            "protocol.message.unknown" => EventKind::ProtocolMessageUnknown,
            other => EventKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for EventKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(EventKind::parse(&s))
    }
}

/// One line of an `events/YYYY-MM-DD.jsonl` stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    /// Monotonic within a day's file.
    pub event_id: u64,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub payload: serde_json::Value,
}

impl EventRecord {
    /// Build a record with an unassigned event id; the logger assigns the
    /// day-monotonic id at append time.
    pub fn new(kind: EventKind, actor: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            event_id: 0,
            kind,
            timestamp,
            actor: actor.into(),
            task_id: None,
            payload: serde_json::Value::Null,
        }
    }

    pub fn with_task(mut self, task_id: TaskId) -> Self {
        self.task_id = Some(task_id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
