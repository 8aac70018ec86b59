// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `aof poll` - run one scheduler cycle.

use super::{check_project_filter, load_manifest, load_org};
use crate::alerts::NotifyBridge;
use crate::output::OutputFormat;
use anyhow::{bail, Result};
use aof_adapters::executor::{ExecutorAdapter, NoOpExecutor, SimExecutor};
use aof_adapters::notify::{ConsoleNotifyAdapter, DesktopNotifyAdapter};
use aof_core::SystemClock;
use aof_storage::{EventLogger, EventSink, TaskStore};
use aof_engine::dispatch::ThrottleState;
use aof_engine::murmur::MurmurManager;
use aof_engine::sla::SlaChecker;
use aof_engine::{poll, PollConfig, PollDeps};
use clap::Args;
use std::path::Path;
use std::sync::Arc;

#[derive(Args)]
pub struct PollArgs {
    /// Execute planned actions (default is a dry-run plan)
    #[arg(long, conflicts_with = "dry_run")]
    pub active: bool,

    /// Plan and log without mutating state
    #[arg(long)]
    pub dry_run: bool,

    /// Only poll when the manifest matches this project id
    #[arg(long)]
    pub project: Option<String>,

    /// Executor to dispatch with: `noop`, `always-ok`, or `fail:<message>`
    #[arg(long, default_value = "noop")]
    pub executor: String,

    /// Where degraded-state alerts go: `console`, `desktop`, or `none`
    #[arg(long, default_value = "console")]
    pub notify: String,
}

fn alert_sinks(spec: &str) -> Result<Vec<Box<dyn EventSink>>> {
    match spec {
        "console" => Ok(vec![Box::new(NotifyBridge::new(ConsoleNotifyAdapter::new()))]),
        "desktop" => Ok(vec![Box::new(NotifyBridge::new(DesktopNotifyAdapter::new()))]),
        "none" => Ok(Vec::new()),
        other => bail!("unknown notifier '{other}' (expected console, desktop, or none)"),
    }
}

fn make_executor(spec: &str) -> Result<Arc<dyn ExecutorAdapter>> {
    match spec {
        "noop" => Ok(Arc::new(NoOpExecutor::new())),
        "always-ok" => Ok(SimExecutor::always_ok()),
        other => {
            if let Some(message) = other.strip_prefix("fail:") {
                Ok(SimExecutor::always_fail(message))
            } else {
                bail!("unknown executor '{other}' (expected noop, always-ok, or fail:<message>)")
            }
        }
    }
}

pub async fn run(root: &Path, output: OutputFormat, args: PollArgs) -> Result<()> {
    let manifest = load_manifest(root)?;
    check_project_filter(&manifest, args.project.as_deref())?;
    let org = load_org(root)?;
    let clock = std::sync::Arc::new(SystemClock);
    let logger = EventLogger::new(root, clock.clone()).with_sinks(alert_sinks(&args.notify)?);
    let store = TaskStore::new(root, clock, logger);
    let executor = make_executor(&args.executor)?;
    let throttle = ThrottleState::new();
    let murmur = MurmurManager::new(root);
    let sla = SlaChecker::new();

    let cfg = PollConfig {
        dry_run: !args.active || args.dry_run,
        ..Default::default()
    };
    let deps = PollDeps {
        store: &store,
        org: &org,
        manifest: &manifest,
        executor,
        throttle: &throttle,
        murmur: &murmur,
        sla: &sla,
        metrics: None,
    };

    let stats = poll(&deps, &cfg).await;

    match output {
        OutputFormat::Cli => {
            let mode = if cfg.dry_run { "dry-run" } else { "active" };
            println!(
                "poll complete ({mode}): planned {} executed {} failed {} promoted {} requeued {} leases-expired {}",
                stats.actions_planned,
                stats.actions_executed,
                stats.actions_failed,
                stats.tasks_promoted,
                stats.tasks_requeued,
                stats.leases_expired,
            );
            for action in &stats.actions {
                println!("  {}", serde_json::to_string(action)?);
            }
        }
        OutputFormat::Json => {
            let mut value = serde_json::to_value(&stats)?;
            if let Some(map) = value.as_object_mut() {
                map.insert("actions".into(), serde_json::to_value(&stats.actions)?);
            }
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Jsonl => {
            for action in &stats.actions {
                println!("{}", serde_json::to_string(action)?);
            }
            println!("{}", serde_json::to_string(&stats)?);
        }
    }
    Ok(())
}
