// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bridge from the event stream to notification adapters.
//!
//! Degraded-state events (deadletter, SLA violation, stale review cleanup)
//! fan out to the configured notifier so the operator hears about them
//! without tailing the event log.

use aof_adapters::notify::NotifyAdapter;
use aof_core::{format_elapsed_ms, EventKind, EventRecord};
use aof_storage::EventSink;

/// EventSink that forwards operator-facing events to a notifier.
pub struct NotifyBridge<N: NotifyAdapter> {
    adapter: N,
}

impl<N: NotifyAdapter> NotifyBridge<N> {
    pub fn new(adapter: N) -> Self {
        Self { adapter }
    }

    fn render(record: &EventRecord) -> Option<(String, String)> {
        let task = record
            .task_id
            .as_ref()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string());
        match record.kind {
            EventKind::TaskDeadletter => Some((
                "task deadlettered".to_string(),
                format!(
                    "{task}: {}; inspect tasks/deadletter/ and requeue or cancel",
                    record.payload["lastFailureReason"]
                        .as_str()
                        .unwrap_or("spawn failures exhausted")
                ),
            )),
            EventKind::SlaViolation => Some((
                "SLA violation".to_string(),
                format!(
                    "{task} has been in progress {} (limit {}); consider reassigning",
                    format_elapsed_ms(record.payload["durationMs"].as_i64().unwrap_or(0).max(0) as u64),
                    format_elapsed_ms(record.payload["limitMs"].as_i64().unwrap_or(0).max(0) as u64),
                ),
            )),
            EventKind::MurmurReviewCleaned => Some((
                "stale team review cleared".to_string(),
                format!(
                    "review {task} for team {} cleared ({})",
                    record.payload["team"].as_str().unwrap_or("?"),
                    record.payload["reason"].as_str().unwrap_or("unknown"),
                ),
            )),
            _ => None,
        }
    }
}

impl<N: NotifyAdapter> EventSink for NotifyBridge<N> {
    fn on_event(&self, record: &EventRecord) {
        let Some((title, message)) = Self::render(record) else {
            return;
        };
        // on_event is synchronous; ship the notification from the runtime
        // when one is available, otherwise drop it (never block a mutation).
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let adapter = self.adapter.clone();
            handle.spawn(async move {
                if let Err(e) = adapter.notify(&title, &message).await {
                    tracing::warn!(error = %e, "notification failed");
                }
            });
        }
    }
}

#[cfg(test)]
#[path = "alerts_tests.rs"]
mod tests;
