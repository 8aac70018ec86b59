// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! aof - AOF orchestration CLI

mod alerts;
mod commands;
mod env;
mod output;
mod poller;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{config, lint, metrics, poll, scan, task, watch};
use output::OutputFormat;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "aof",
    version,
    about = "AOF - deterministic orchestration for multi-agent software work"
)]
struct Cli {
    /// Data directory root (overrides AOF_ROOT)
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Output format
    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        default_value_t,
        global = true
    )]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one scheduler cycle
    Poll(poll::PollArgs),
    /// Task management
    Task(task::TaskArgs),
    /// List tasks by status
    Scan(scan::ScanArgs),
    /// Validate task records, the project manifest, and the org chart
    Lint(lint::LintArgs),
    /// Live view updates (kanban or mailbox projection)
    Watch(watch::WatchArgs),
    /// Metrics endpoints
    Metrics(metrics::MetricsArgs),
    /// Org-chart configuration access
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let root = env::resolve_root(cli.root.clone());

    let result: Result<()> = match cli.command {
        Commands::Poll(args) => poll::run(&root, cli.output, args).await,
        Commands::Task(args) => task::run(&root, cli.output, args),
        Commands::Scan(args) => scan::run(&root, cli.output, args),
        Commands::Lint(args) => lint::run(&root, cli.output, args),
        Commands::Watch(args) => watch::run(&root, cli.output, args).await,
        Commands::Metrics(args) => metrics::run(&root, args).await,
        Commands::Config(args) => config::run(&root, cli.output, args),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
