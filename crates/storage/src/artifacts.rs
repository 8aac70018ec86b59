// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable per-task artifacts: run results, handoffs, summaries.
//!
//! All artifacts live under a task's side-channel directory and are written
//! with the same write-temp + rename discipline as the records themselves.

use aof_core::{AgentId, RunOutcome, RunResult, TaskId, TestStats};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

const RUN_RESULT_FILE: &str = "outputs/run-result.json";
const RUN_RESULT_EXPIRED_FILE: &str = "outputs/run-result.expired.json";
const HANDOFF_JSON_FILE: &str = "inputs/handoff.json";
const HANDOFF_MD_FILE: &str = "inputs/handoff.md";
const SUMMARY_FILE: &str = "outputs/summary.json";

fn write_json<T: Serialize>(task_dir: &Path, rel: &str, value: &T) -> io::Result<()> {
    let path = task_dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    let raw = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    fs::write(&tmp, raw)?;
    fs::rename(&tmp, &path)
}

fn read_json<T: for<'de> Deserialize<'de>>(task_dir: &Path, rel: &str) -> io::Result<Option<T>> {
    let path = task_dir.join(rel);
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

// ── Run result ──────────────────────────────────────────────────────────────

/// Persist the completion artifact consulted by stale-session recovery.
pub fn write_run_result(task_dir: &Path, result: &RunResult) -> io::Result<()> {
    write_json(task_dir, RUN_RESULT_FILE, result)
}

pub fn read_run_result(task_dir: &Path) -> io::Result<Option<RunResult>> {
    read_json(task_dir, RUN_RESULT_FILE)
}

/// Move the artifact aside after recovery has consumed (or given up on) it,
/// so the next recovery pass does not re-apply a stale outcome.
pub fn expire_run_result(task_dir: &Path) -> io::Result<()> {
    let from = task_dir.join(RUN_RESULT_FILE);
    let to = task_dir.join(RUN_RESULT_EXPIRED_FILE);
    match fs::rename(&from, &to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

pub fn run_result_is_expired(task_dir: &Path) -> bool {
    task_dir.join(RUN_RESULT_EXPIRED_FILE).exists() && !task_dir.join(RUN_RESULT_FILE).exists()
}

// ── Handoff ─────────────────────────────────────────────────────────────────

/// Delegation payload written to a child task's `inputs/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handoff {
    pub parent: TaskId,
    pub child: TaskId,
    pub from_agent: AgentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_agent: Option<AgentId>,
    pub sent_at: DateTime<Utc>,
    pub brief: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context_refs: Vec<String>,
}

/// Write `inputs/handoff.json` plus a human-readable `inputs/handoff.md`.
pub fn write_handoff(task_dir: &Path, handoff: &Handoff) -> io::Result<()> {
    write_json(task_dir, HANDOFF_JSON_FILE, handoff)?;

    let mut md = String::new();
    md.push_str(&format!("# Handoff from {}\n\n", handoff.parent));
    md.push_str(&format!(
        "- From: {}\n- Sent: {}\n",
        handoff.from_agent,
        handoff.sent_at.to_rfc3339()
    ));
    if let Some(to) = &handoff.to_agent {
        md.push_str(&format!("- To: {}\n", to));
    }
    md.push('\n');
    md.push_str(&handoff.brief);
    md.push('\n');
    if !handoff.context_refs.is_empty() {
        md.push_str("\n## Context\n\n");
        for r in &handoff.context_refs {
            md.push_str(&format!("- {r}\n"));
        }
    }

    let path = task_dir.join(HANDOFF_MD_FILE);
    let tmp = path.with_extension("md.tmp");
    fs::write(&tmp, md)?;
    fs::rename(&tmp, &path)
}

pub fn read_handoff(task_dir: &Path) -> io::Result<Option<Handoff>> {
    read_json(task_dir, HANDOFF_JSON_FILE)
}

// ── Summary ─────────────────────────────────────────────────────────────────

/// Completion summary referenced by `summaryRef` in run results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub task_id: TaskId,
    pub outcome: RunOutcome,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deliverables: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tests: Option<TestStats>,
    pub recorded_at: DateTime<Utc>,
}

pub fn write_summary(task_dir: &Path, summary: &Summary) -> io::Result<()> {
    write_json(task_dir, SUMMARY_FILE, summary)
}

pub fn read_summary(task_dir: &Path) -> io::Result<Option<Summary>> {
    read_json(task_dir, SUMMARY_FILE)
}

#[cfg(test)]
#[path = "artifacts_tests.rs"]
mod tests;
