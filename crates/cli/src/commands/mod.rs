// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod config;
pub mod lint;
pub mod metrics;
pub mod poll;
pub mod scan;
pub mod task;
pub mod watch;

use anyhow::{Context, Result};
use aof_core::SystemClock;
use aof_manifest::{OrgChart, ProjectManifest};
use aof_storage::{EventLogger, TaskStore};
use std::path::Path;
use std::sync::Arc;

/// Open the task store for a data directory.
pub fn open_store(root: &Path) -> TaskStore {
    let clock = Arc::new(SystemClock);
    let logger = EventLogger::new(root, clock.clone());
    TaskStore::new(root, clock, logger)
}

/// Load the project manifest, failing with an operator-readable message.
pub fn load_manifest(root: &Path) -> Result<ProjectManifest> {
    ProjectManifest::load(root)
        .with_context(|| format!("cannot load {}/project.yaml", root.display()))
}

/// Load the org chart (missing file is an empty roster).
pub fn load_org(root: &Path) -> Result<OrgChart> {
    OrgChart::load(root).with_context(|| format!("cannot load org chart under {}", root.display()))
}

/// Check a `--project <id>` filter against the manifest.
pub fn check_project_filter(manifest: &ProjectManifest, filter: Option<&str>) -> Result<()> {
    if let Some(project) = filter {
        anyhow::ensure!(
            manifest.id == project,
            "project '{}' not found here (this data directory is '{}')",
            project,
            manifest.id
        );
    }
    Ok(())
}
