// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable per-task records with atomic status transitions.
//!
//! Layout: `tasks/<status>/<task-id>.md` holds the record; an optional
//! sibling directory `tasks/<status>/<task-id>/` holds the side-channel
//! folders (`inputs/`, `work/`, `outputs/`, `subtasks/`). Status is encoded
//! in the path — a transition re-serializes the record at the new path in a
//! single rename and moves the side-channel directory with it.

use crate::event_log::EventLogger;
use crate::record::{parse_record, render_record};
use aof_core::{
    Clock, EventKind, EventRecord, NewTask, Task, TaskId, TaskStatus,
};
use chrono::Datelike;
use serde_json::json;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// Errors from task store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
    #[error("invalid transition for {task}: {from} -> {to}")]
    InvalidTransition {
        task: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },
    #[error("validation failed for {task}: {message}")]
    Validation { task: TaskId, message: String },
    #[error("dependency cycle: {0} would depend on itself")]
    DependencyCycle(TaskId),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// One lint finding against a stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskLintIssue {
    /// Task id when the record parsed far enough to have one, else the path.
    pub task: String,
    pub issue: String,
}

/// Options carried on a transition.
#[derive(Debug, Clone, Default)]
pub struct TransitionOpts {
    pub reason: Option<String>,
    pub blockers: Vec<String>,
    pub actor: Option<String>,
}

/// The durable task store rooted at a data directory.
#[derive(Clone)]
pub struct TaskStore {
    root: PathBuf,
    clock: Arc<dyn Clock>,
    logger: EventLogger,
}

impl TaskStore {
    pub fn new(root: impl Into<PathBuf>, clock: Arc<dyn Clock>, logger: EventLogger) -> Self {
        Self {
            root: root.into(),
            clock,
            logger,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn logger(&self) -> &EventLogger {
        &self.logger
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn status_dir(&self, status: TaskStatus) -> PathBuf {
        self.root.join("tasks").join(status.dir_name())
    }

    fn record_path(&self, status: TaskStatus, id: &TaskId) -> PathBuf {
        self.status_dir(status).join(format!("{id}.md"))
    }

    /// On-disk path of a task's record in its current bucket.
    pub fn record_path_of(&self, task: &Task) -> PathBuf {
        self.record_path(task.status, &task.id)
    }

    /// Side-channel directory for a task (`inputs/`, `work/`, `outputs/`,
    /// `subtasks/` live beneath it). Created lazily.
    pub fn task_dir(&self, id: &TaskId) -> Result<PathBuf, StoreError> {
        let status = self.find_status(id)?;
        Ok(self.status_dir(status).join(id.as_str()))
    }

    /// Create a task: assign the next dated id, write to `backlog/` (or
    /// `ready/` when explicitly requested), emit `task.created`.
    pub fn create(&self, input: NewTask) -> Result<Task, StoreError> {
        let now = self.clock.now();
        let id = self.next_id()?;
        let task = Task::new(id, input, now);

        if task.title.trim().is_empty() {
            return Err(StoreError::Validation {
                task: task.id.clone(),
                message: "empty title".to_string(),
            });
        }

        self.write_record(&task)?;
        self.logger.emit(
            EventRecord::new(EventKind::TaskCreated, "store", now)
                .with_task(task.id.clone())
                .with_payload(json!({
                    "title": &task.title,
                    "status": task.status,
                    "priority": task.priority,
                    "createdBy": &task.created_by,
                })),
        );
        Ok(task)
    }

    /// Allocate `TASK-<yyyy>-<mm>-<dd>-<nnn>` for today, scanning every
    /// status bucket so a transitioned task still reserves its sequence.
    fn next_id(&self) -> Result<TaskId, StoreError> {
        let now = self.clock.now();
        let prefix = format!(
            "TASK-{:04}-{:02}-{:02}-",
            now.year(),
            now.month(),
            now.day()
        );
        let mut max_seq = 0u32;
        for status in TaskStatus::ALL {
            let dir = self.status_dir(status);
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            for entry in entries.flatten() {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if let Some(seq) = name
                    .strip_prefix(&prefix)
                    .and_then(|rest| rest.strip_suffix(".md"))
                    .and_then(|seq| seq.parse::<u32>().ok())
                {
                    max_seq = max_seq.max(seq);
                }
            }
        }
        Ok(TaskId::new(format!("{prefix}{:03}", max_seq + 1)))
    }

    /// Locate which status bucket holds the task.
    fn find_status(&self, id: &TaskId) -> Result<TaskStatus, StoreError> {
        for status in TaskStatus::ALL {
            if self.record_path(status, id).exists() {
                return Ok(status);
            }
        }
        Err(StoreError::TaskNotFound(id.clone()))
    }

    /// Fetch a task by id.
    pub fn get(&self, id: &TaskId) -> Result<Task, StoreError> {
        let status = self.find_status(id)?;
        self.read_record(status, id)
    }

    fn read_record(&self, status: TaskStatus, id: &TaskId) -> Result<Task, StoreError> {
        let path = self.record_path(status, id);
        let raw = fs::read_to_string(&path)?;
        let mut task = parse_record(&raw).map_err(|message| StoreError::Validation {
            task: id.clone(),
            message,
        })?;
        // The path is authoritative for status.
        task.status = status;
        Ok(task)
    }

    /// All parseable tasks across every bucket. Malformed records are
    /// skipped with a warning; `lint()` surfaces them properly.
    pub fn list(&self) -> Result<Vec<Task>, StoreError> {
        let mut tasks = Vec::new();
        for status in TaskStatus::ALL {
            let dir = self.status_dir(status);
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("md") {
                    continue;
                }
                let raw = fs::read_to_string(&path)?;
                match parse_record(&raw) {
                    Ok(mut task) => {
                        task.status = status;
                        tasks.push(task);
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "skipping malformed task record");
                    }
                }
            }
        }
        tasks.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        Ok(tasks)
    }

    /// Count of records in each status bucket.
    pub fn count_by_status(&self) -> Result<HashMap<TaskStatus, usize>, StoreError> {
        let mut counts = HashMap::new();
        for status in TaskStatus::ALL {
            let dir = self.status_dir(status);
            let n = match fs::read_dir(&dir) {
                Ok(entries) => entries
                    .flatten()
                    .filter(|e| {
                        e.path().extension().and_then(|x| x.to_str()) == Some("md")
                    })
                    .count(),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
                Err(e) => return Err(e.into()),
            };
            counts.insert(status, n);
        }
        Ok(counts)
    }

    /// Validate the edge and move the record to its new status bucket.
    pub fn transition(
        &self,
        id: &TaskId,
        to: TaskStatus,
        opts: TransitionOpts,
    ) -> Result<Task, StoreError> {
        self.transition_and_update(id, to, opts, |_| {})
    }

    /// Transition with extra mutations applied in the same atomic write.
    ///
    /// This is the primitive the lease manager and protocol router build on:
    /// lease set/clear, gate updates, and the status move land in one rename.
    pub fn transition_and_update(
        &self,
        id: &TaskId,
        to: TaskStatus,
        opts: TransitionOpts,
        mutate: impl FnOnce(&mut Task),
    ) -> Result<Task, StoreError> {
        let from = self.find_status(id)?;
        let mut task = self.read_record(from, id)?;

        if !TaskStatus::can_transition(from, to) {
            return Err(StoreError::InvalidTransition {
                task: id.clone(),
                from,
                to,
            });
        }

        let now = self.clock.now();
        task.status = to;
        task.updated_at = now;
        task.last_transition_at = now;
        if to == TaskStatus::Blocked {
            task.metadata.last_blocked_at = Some(now);
            if let Some(reason) = &opts.reason {
                task.metadata.block_reason = Some(reason.clone());
            }
        } else if from == TaskStatus::Blocked {
            task.metadata.block_reason = None;
        }
        mutate(&mut task);

        // Write the new record first, then remove the old one; a crash in
        // between leaves a duplicate that lint flags, never a lost task.
        self.write_record(&task)?;
        let old_path = self.record_path(from, id);
        if let Err(e) = fs::remove_file(&old_path) {
            warn!(path = %old_path.display(), error = %e, "failed to remove old record after transition");
        }

        // Side-channel directory follows the record.
        let old_dir = self.status_dir(from).join(id.as_str());
        if old_dir.is_dir() {
            let new_dir = self.status_dir(to).join(id.as_str());
            if let Err(e) = fs::rename(&old_dir, &new_dir) {
                warn!(task = %id, error = %e, "failed to move task side-channel directory");
            }
        }

        self.logger.emit(
            EventRecord::new(
                EventKind::TaskTransitioned,
                opts.actor.as_deref().unwrap_or("store"),
                now,
            )
            .with_task(id.clone())
            .with_payload(json!({
                "from": from,
                "to": to,
                "reason": opts.reason,
                "blockers": opts.blockers,
            })),
        );
        Ok(task)
    }

    /// Apply a mutation and persist, preserving the record shape.
    pub fn update(
        &self,
        id: &TaskId,
        mutate: impl FnOnce(&mut Task),
    ) -> Result<Task, StoreError> {
        let status = self.find_status(id)?;
        let mut task = self.read_record(status, id)?;
        mutate(&mut task);
        task.status = status; // updates never change the bucket
        task.updated_at = self.clock.now();
        self.write_record(&task)?;
        Ok(task)
    }

    /// Replace the free-form body.
    pub fn update_body(&self, id: &TaskId, body: &str) -> Result<Task, StoreError> {
        self.update(id, |task| task.body = body.to_string())
    }

    /// Bump `updated_at` without any other change.
    pub fn touch(&self, id: &TaskId) -> Result<Task, StoreError> {
        self.update(id, |_| {})
    }

    /// Add a dependency edge, rejecting cycles.
    pub fn add_dependency(&self, id: &TaskId, dep: &TaskId) -> Result<Task, StoreError> {
        if id == dep {
            return Err(StoreError::DependencyCycle(id.clone()));
        }
        // Reject if `id` is reachable from `dep` through existing edges.
        let tasks = self.list()?;
        let edges: HashMap<&str, &[TaskId]> = tasks
            .iter()
            .map(|t| (t.id.as_str(), t.depends_on.as_slice()))
            .collect();
        let mut stack = vec![dep.as_str()];
        let mut seen = std::collections::HashSet::new();
        while let Some(current) = stack.pop() {
            if current == id.as_str() {
                return Err(StoreError::DependencyCycle(id.clone()));
            }
            if !seen.insert(current) {
                continue;
            }
            if let Some(deps) = edges.get(current) {
                stack.extend(deps.iter().map(|d| d.as_str()));
            }
        }
        // The dependency itself must exist.
        self.find_status(dep)?;
        self.update(id, |task| {
            if !task.depends_on.contains(dep) {
                task.depends_on.push(dep.clone());
            }
        })
    }

    pub fn remove_dependency(&self, id: &TaskId, dep: &TaskId) -> Result<Task, StoreError> {
        self.update(id, |task| {
            task.depends_on.retain(|d| d != dep);
        })
    }

    /// Backlog tasks whose dependencies are all `done`.
    pub fn compute_ready_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let tasks = self.list()?;
        let done: std::collections::HashSet<&str> = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Done)
            .map(|t| t.id.as_str())
            .collect();
        Ok(tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Backlog)
            .filter(|t| t.depends_on.iter().all(|d| done.contains(d.as_str())))
            .cloned()
            .collect())
    }

    /// Scan every record and report malformed ones.
    ///
    /// Schema failures emit `task.validation.failed` events — a broken
    /// record must be visible, not silently skipped.
    pub fn lint(&self) -> Result<Vec<TaskLintIssue>, StoreError> {
        let mut issues = Vec::new();
        let now = self.clock.now();
        // Buckets each id was seen in, to catch records duplicated across
        // status directories (e.g. a crash between the new-record write and
        // the old-record removal during a transition).
        let mut buckets_by_id: HashMap<String, Vec<TaskStatus>> = HashMap::new();
        for status in TaskStatus::ALL {
            let dir = self.status_dir(status);
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("md") {
                    continue;
                }
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    buckets_by_id.entry(stem.to_string()).or_default().push(status);
                }
                let raw = fs::read_to_string(&path)?;
                let found = match parse_record(&raw) {
                    Ok(task) => task
                        .validate()
                        .into_iter()
                        .map(|issue| TaskLintIssue {
                            task: task.id.to_string(),
                            issue,
                        })
                        .collect::<Vec<_>>(),
                    Err(e) => vec![TaskLintIssue {
                        task: path.display().to_string(),
                        issue: e,
                    }],
                };
                for issue in &found {
                    self.logger.emit(
                        EventRecord::new(EventKind::TaskValidationFailed, "lint", now)
                            .with_payload(json!({
                                "task": &issue.task,
                                "issue": &issue.issue,
                                "path": path.display().to_string(),
                            })),
                    );
                }
                issues.extend(found);
            }
        }

        // An id may exist in at most one bucket at any instant.
        let mut duplicated: Vec<(String, Vec<TaskStatus>)> = buckets_by_id
            .into_iter()
            .filter(|(_, buckets)| buckets.len() > 1)
            .collect();
        duplicated.sort_by(|a, b| a.0.cmp(&b.0));
        for (id, buckets) in duplicated {
            let names: Vec<&str> = buckets.iter().map(|s| s.dir_name()).collect();
            let issue = TaskLintIssue {
                task: id.clone(),
                issue: format!("record exists in multiple status buckets: {}", names.join(", ")),
            };
            self.logger.emit(
                EventRecord::new(EventKind::TaskValidationFailed, "lint", now)
                    .with_task(TaskId::new(id))
                    .with_payload(json!({
                        "task": &issue.task,
                        "issue": &issue.issue,
                        "buckets": names,
                    })),
            );
            issues.push(issue);
        }
        Ok(issues)
    }

    /// Enumerate files in the task's `inputs/` folder.
    pub fn get_task_inputs(&self, id: &TaskId) -> Result<Vec<PathBuf>, StoreError> {
        self.list_side_channel(id, "inputs")
    }

    /// Enumerate files in the task's `outputs/` folder.
    pub fn get_task_outputs(&self, id: &TaskId) -> Result<Vec<PathBuf>, StoreError> {
        self.list_side_channel(id, "outputs")
    }

    fn list_side_channel(&self, id: &TaskId, channel: &str) -> Result<Vec<PathBuf>, StoreError> {
        let dir = self.task_dir(id)?.join(channel);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut files: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();
        files.sort();
        Ok(files)
    }

    /// Serialize and write atomically: temp file in the target directory,
    /// then rename onto the final path.
    fn write_record(&self, task: &Task) -> Result<(), StoreError> {
        let dir = self.status_dir(task.status);
        fs::create_dir_all(&dir)?;
        let path = self.record_path(task.status, &task.id);
        let tmp = dir.join(format!(".{}.tmp", task.id));
        fs::write(&tmp, render_record(task)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "task_store_tests.rs"]
mod tests;
