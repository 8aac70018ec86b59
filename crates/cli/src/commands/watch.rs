// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `aof watch` - live kanban/mailbox projections of the task store.
//!
//! A rescan loop: every interval the store is listed and re-rendered; output
//! is printed only when the projection changed. Read-only.

use super::open_store;
use crate::output::{status_header, task_line, OutputFormat};
use crate::poller::{Poller, Tick};
use anyhow::Result;
use aof_core::{Task, TaskStatus};
use clap::{Args, ValueEnum};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WatchView {
    /// Status columns across the whole store
    Kanban,
    /// Per-agent queues (assigned + in-flight work)
    Mailbox,
}

#[derive(Args)]
pub struct WatchArgs {
    /// Which projection to render
    #[arg(value_enum)]
    pub view: WatchView,

    /// Data directory to watch (defaults to the resolved root)
    pub path: Option<PathBuf>,

    /// Output format override for the stream
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Only this agent's mailbox
    #[arg(long)]
    pub agent: Option<String>,

    /// Rescan interval in milliseconds
    #[arg(long, default_value = "1000")]
    pub interval_ms: u64,

    /// Render one snapshot and exit
    #[arg(long)]
    pub once: bool,
}

fn render_kanban(tasks: &[Task], format: OutputFormat) -> String {
    match format {
        OutputFormat::Cli => {
            let mut out = String::new();
            for status in TaskStatus::ALL {
                let bucket: Vec<_> = tasks.iter().filter(|t| t.status == status).collect();
                if bucket.is_empty() {
                    continue;
                }
                out.push_str(&status_header(status, bucket.len()));
                out.push('\n');
                for task in bucket {
                    out.push_str(&format!("  {}\n", task_line(task)));
                }
            }
            out
        }
        OutputFormat::Json | OutputFormat::Jsonl => {
            let mut buckets = serde_json::Map::new();
            for status in TaskStatus::ALL {
                let entries: Vec<_> = tasks
                    .iter()
                    .filter(|t| t.status == status)
                    .map(|t| json!({"id": t.id, "title": t.title, "priority": t.priority}))
                    .collect();
                buckets.insert(status.dir_name().to_string(), json!(entries));
            }
            serde_json::to_string(&buckets).unwrap_or_default()
        }
    }
}

fn mailbox_owner(task: &Task) -> Option<String> {
    task.lease
        .as_ref()
        .map(|l| l.agent.to_string())
        .or_else(|| task.routing.agent.as_ref().map(|a| a.to_string()))
}

fn render_mailbox(tasks: &[Task], agent: Option<&str>, format: OutputFormat) -> String {
    let mut by_agent: std::collections::BTreeMap<String, Vec<&Task>> = Default::default();
    for task in tasks {
        if !matches!(task.status, TaskStatus::Ready | TaskStatus::InProgress) {
            continue;
        }
        let Some(owner) = mailbox_owner(task) else {
            continue;
        };
        if agent.is_some_and(|a| a != owner) {
            continue;
        }
        by_agent.entry(owner).or_default().push(task);
    }

    match format {
        OutputFormat::Cli => {
            let mut out = String::new();
            for (owner, tasks) in &by_agent {
                out.push_str(&format!("@{owner} ({})\n", tasks.len()));
                for task in tasks {
                    out.push_str(&format!("  {}\n", task_line(task)));
                }
            }
            out
        }
        OutputFormat::Json | OutputFormat::Jsonl => {
            let doc: serde_json::Map<String, serde_json::Value> = by_agent
                .iter()
                .map(|(owner, tasks)| {
                    (
                        owner.clone(),
                        json!(tasks
                            .iter()
                            .map(|t| json!({"id": t.id, "status": t.status, "title": t.title}))
                            .collect::<Vec<_>>()),
                    )
                })
                .collect();
            serde_json::to_string(&doc).unwrap_or_default()
        }
    }
}

pub async fn run(root: &Path, output: OutputFormat, args: WatchArgs) -> Result<()> {
    let root = args.path.clone().unwrap_or_else(|| root.to_path_buf());
    let store = open_store(&root);
    let format = args.format.unwrap_or(output);

    let render = |tasks: &[Task]| match args.view {
        WatchView::Kanban => render_kanban(tasks, format),
        WatchView::Mailbox => render_mailbox(tasks, args.agent.as_deref(), format),
    };

    let tasks = store.list()?;
    let current = render(&tasks);
    print!("{current}");
    if format != OutputFormat::Cli && !current.is_empty() {
        println!();
    }
    let mut last = current;

    if args.once {
        return Ok(());
    }

    let mut poller = Poller::new(Duration::from_millis(args.interval_ms.max(100)));
    loop {
        match poller.tick().await {
            Tick::Ready => {}
            Tick::Interrupted => return Ok(()),
        }
        let tasks = store.list()?;
        let current = render(&tasks);
        if current != last {
            print!("{current}");
            if format != OutputFormat::Cli && !current.is_empty() {
                println!();
            }
            last = current;
        }
    }
}
