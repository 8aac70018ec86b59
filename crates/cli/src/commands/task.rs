// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `aof task` - task CRUD.

use super::open_store;
use crate::output::{task_json, task_line, OutputFormat};
use anyhow::{Context, Result};
use aof_core::{
    format_since, AgentId, Clock, NewTask, Priority, Routing, SystemClock, TaskId, TaskStatus,
    TeamId,
};
use aof_storage::TransitionOpts;
use clap::{Args, Subcommand};
use std::path::Path;

#[derive(Args)]
pub struct TaskArgs {
    #[command(subcommand)]
    pub command: TaskCommand,
}

#[derive(Subcommand)]
pub enum TaskCommand {
    /// Create a task
    Create {
        /// Task title
        #[arg(long)]
        title: String,
        /// Task brief (body text)
        #[arg(long, default_value = "")]
        body: String,
        /// Priority: critical, high, normal, low
        #[arg(long, default_value = "normal")]
        priority: String,
        /// Route to an explicit agent
        #[arg(long)]
        agent: Option<String>,
        /// Route to the first active agent with this role
        #[arg(long)]
        role: Option<String>,
        /// Route to the first active member of this team
        #[arg(long)]
        team: Option<String>,
        /// Routing tags (can be repeated)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Create directly in `ready` instead of `backlog`
        #[arg(long)]
        ready: bool,
        /// Task ids that must be done first (can be repeated)
        #[arg(long = "depends-on")]
        depends_on: Vec<String>,
    },
    /// Show one task
    Get {
        /// Task id
        id: String,
    },
    /// List tasks
    List {
        /// Only this status
        #[arg(long)]
        status: Option<String>,
    },
    /// Update title, priority, or body
    Update {
        /// Task id
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long)]
        body: Option<String>,
    },
    /// Cancel a task
    Cancel {
        /// Task id
        id: String,
    },
    /// Move a task to `blocked`
    Block {
        /// Task id
        id: String,
        /// Why the task is blocked
        #[arg(long)]
        reason: String,
    },
    /// Move a blocked task back to `ready`
    Unblock {
        /// Task id
        id: String,
    },
    /// Add a dependency edge (rejects cycles)
    DepAdd {
        /// Task id
        id: String,
        /// Task that must finish first
        dep: String,
    },
    /// Remove a dependency edge
    DepRemove {
        /// Task id
        id: String,
        /// Dependency to drop
        dep: String,
    },
}

fn parse_priority(s: &str) -> Result<Priority> {
    Priority::parse(s).with_context(|| format!("unknown priority '{s}'"))
}

fn print_task(output: OutputFormat, task: &aof_core::Task) -> Result<()> {
    match output {
        OutputFormat::Cli => {
            println!("{}", task_line(task));
            println!("  updated {} ago", format_since(task.updated_at, SystemClock.now()));
            if !task.body.is_empty() {
                println!("\n{}", task.body);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&task_json(task))?),
        OutputFormat::Jsonl => println!("{}", serde_json::to_string(&task_json(task))?),
    }
    Ok(())
}

pub fn run(root: &Path, output: OutputFormat, args: TaskArgs) -> Result<()> {
    let store = open_store(root);

    match args.command {
        TaskCommand::Create {
            title,
            body,
            priority,
            agent,
            role,
            team,
            tags,
            ready,
            depends_on,
        } => {
            let task = store.create(NewTask {
                title,
                body,
                priority: parse_priority(&priority)?,
                routing: Routing {
                    agent: agent.map(AgentId::new),
                    role,
                    team: team.map(TeamId::new),
                    tags,
                    workflow: None,
                },
                depends_on: depends_on.into_iter().map(TaskId::new).collect(),
                created_by: whoami(),
                status: ready.then_some(TaskStatus::Ready),
                metadata: Default::default(),
            })?;
            print_task(output, &task)
        }
        TaskCommand::Get { id } => {
            let task = store.get(&TaskId::new(id))?;
            print_task(output, &task)
        }
        TaskCommand::List { status } => {
            let filter = match status.as_deref() {
                Some(s) => {
                    Some(TaskStatus::parse(s).with_context(|| format!("unknown status '{s}'"))?)
                }
                None => None,
            };
            let tasks = store.list()?;
            for task in tasks
                .iter()
                .filter(|t| filter.map_or(true, |f| t.status == f))
            {
                match output {
                    OutputFormat::Cli => println!("{}", task_line(task)),
                    OutputFormat::Json | OutputFormat::Jsonl => {
                        println!("{}", serde_json::to_string(&task_json(task))?)
                    }
                }
            }
            Ok(())
        }
        TaskCommand::Update {
            id,
            title,
            priority,
            body,
        } => {
            let id = TaskId::new(id);
            let priority = priority.as_deref().map(parse_priority).transpose()?;
            let task = store.update(&id, |task| {
                if let Some(title) = title {
                    task.title = title;
                }
                if let Some(priority) = priority {
                    task.priority = priority;
                }
            })?;
            let task = match body {
                Some(body) => store.update_body(&id, &body)?,
                None => task,
            };
            print_task(output, &task)
        }
        TaskCommand::Cancel { id } => {
            let task = store.transition(
                &TaskId::new(id),
                TaskStatus::Cancelled,
                TransitionOpts {
                    reason: Some("cancelled by operator".to_string()),
                    actor: Some(whoami()),
                    ..Default::default()
                },
            )?;
            print_task(output, &task)
        }
        TaskCommand::Block { id, reason } => {
            let task = store.transition(
                &TaskId::new(id),
                TaskStatus::Blocked,
                TransitionOpts {
                    reason: Some(reason),
                    actor: Some(whoami()),
                    ..Default::default()
                },
            )?;
            print_task(output, &task)
        }
        TaskCommand::Unblock { id } => {
            let task = store.transition(
                &TaskId::new(id),
                TaskStatus::Ready,
                TransitionOpts {
                    reason: Some("unblocked by operator".to_string()),
                    actor: Some(whoami()),
                    ..Default::default()
                },
            )?;
            print_task(output, &task)
        }
        TaskCommand::DepAdd { id, dep } => {
            let task = store.add_dependency(&TaskId::new(id), &TaskId::new(dep))?;
            print_task(output, &task)
        }
        TaskCommand::DepRemove { id, dep } => {
            let task = store.remove_dependency(&TaskId::new(id), &TaskId::new(dep))?;
            print_task(output, &task)
        }
    }
}

fn whoami() -> String {
    std::env::var("USER").unwrap_or_else(|_| "operator".to_string())
}
