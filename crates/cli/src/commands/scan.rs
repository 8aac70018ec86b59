// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `aof scan` - list tasks by status.

use super::{check_project_filter, load_manifest, open_store};
use crate::output::{status_header, task_line, OutputFormat};
use anyhow::Result;
use aof_core::TaskStatus;
use clap::Args;
use serde_json::json;
use std::path::Path;

#[derive(Args)]
pub struct ScanArgs {
    /// Only scan when the manifest matches this project id
    #[arg(long)]
    pub project: Option<String>,
}

pub fn run(root: &Path, output: OutputFormat, args: ScanArgs) -> Result<()> {
    let manifest = load_manifest(root)?;
    check_project_filter(&manifest, args.project.as_deref())?;
    let store = open_store(root);
    let tasks = store.list()?;

    match output {
        OutputFormat::Cli => {
            for status in TaskStatus::ALL {
                let bucket: Vec<_> = tasks.iter().filter(|t| t.status == status).collect();
                if bucket.is_empty() {
                    continue;
                }
                println!("{}", status_header(status, bucket.len()));
                for task in bucket {
                    println!("  {}", task_line(task));
                }
            }
        }
        OutputFormat::Json | OutputFormat::Jsonl => {
            let mut buckets = serde_json::Map::new();
            for status in TaskStatus::ALL {
                let ids: Vec<_> = tasks
                    .iter()
                    .filter(|t| t.status == status)
                    .map(|t| t.id.to_string())
                    .collect();
                buckets.insert(status.dir_name().to_string(), json!(ids));
            }
            let doc = json!({"project": manifest.id, "tasks": buckets});
            if output == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&doc)?);
            } else {
                println!("{}", serde_json::to_string(&doc)?);
            }
        }
    }
    Ok(())
}
