// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory Prometheus-shaped metrics.
//!
//! A process-local registry of counters and gauges, rendered in the
//! Prometheus text exposition format by `aof metrics serve`. Nothing is
//! persisted; restarts start from zero.

use indexmap::IndexMap;
use parking_lot::Mutex;
use std::fmt::Write as _;

const PREFIX: &str = "aof";

#[derive(Default)]
struct Registry {
    counters: IndexMap<String, u64>,
    gauges: IndexMap<String, f64>,
}

/// Shared metrics registry.
///
/// Keys are `name{label="value"}` strings so callers control cardinality
/// directly.
#[derive(Default)]
pub struct Metrics {
    inner: Mutex<Registry>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(name: &str, labels: &[(&str, &str)]) -> String {
        if labels.is_empty() {
            return name.to_string();
        }
        let rendered: Vec<String> = labels
            .iter()
            .map(|(k, v)| format!("{k}=\"{}\"", v.replace('"', "\\\"")))
            .collect();
        format!("{name}{{{}}}", rendered.join(","))
    }

    /// Increment a counter by 1.
    pub fn inc(&self, name: &str, labels: &[(&str, &str)]) {
        self.add(name, labels, 1);
    }

    /// Increment a counter by `n`.
    pub fn add(&self, name: &str, labels: &[(&str, &str)], n: u64) {
        let key = Self::key(name, labels);
        let mut inner = self.inner.lock();
        *inner.counters.entry(key).or_insert(0) += n;
    }

    /// Set a gauge.
    pub fn set_gauge(&self, name: &str, labels: &[(&str, &str)], value: f64) {
        let key = Self::key(name, labels);
        let mut inner = self.inner.lock();
        inner.gauges.insert(key, value);
    }

    /// Read a counter (0 when never incremented).
    pub fn counter(&self, name: &str, labels: &[(&str, &str)]) -> u64 {
        let key = Self::key(name, labels);
        self.inner.lock().counters.get(&key).copied().unwrap_or(0)
    }

    /// Read a gauge.
    pub fn gauge(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        let key = Self::key(name, labels);
        self.inner.lock().gauges.get(&key).copied()
    }

    /// Render the Prometheus text exposition.
    pub fn render(&self) -> String {
        let inner = self.inner.lock();
        let mut out = String::new();
        for (key, value) in &inner.counters {
            let _ = writeln!(out, "{PREFIX}_{key} {value}");
        }
        for (key, value) in &inner.gauges {
            let _ = writeln!(out, "{PREFIX}_{key} {value}");
        }
        out
    }
}

// Metric names used by the engine. Kept here so the poll loop, router, and
// exposition agree on spelling.
pub mod names {
    pub const TASKS_BY_STATUS: &str = "tasks_by_status";
    pub const POLLS_TOTAL: &str = "scheduler_polls_total";
    pub const ACTIONS_EXECUTED_TOTAL: &str = "scheduler_actions_executed_total";
    pub const ACTIONS_FAILED_TOTAL: &str = "scheduler_actions_failed_total";
    pub const DISPATCHES_TOTAL: &str = "dispatches_total";
    pub const DEADLETTERS_TOTAL: &str = "deadletters_total";
    pub const LEASES_EXPIRED_TOTAL: &str = "leases_expired_total";
    pub const SLA_VIOLATIONS_TOTAL: &str = "sla_violations_total";
    pub const PROTOCOL_MESSAGES_TOTAL: &str = "protocol_messages_total";
    pub const MURMUR_REVIEWS_TOTAL: &str = "murmur_reviews_total";
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
