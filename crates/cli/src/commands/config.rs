// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `aof config` - validated org-chart access.

use crate::output::OutputFormat;
use anyhow::{bail, Context, Result};
use aof_manifest::{OrgChart, ProjectManifest, Severity};
use clap::{Args, Subcommand};
use std::path::Path;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the org chart
    Get,
    /// Replace the org chart from a YAML file (validated, atomic write)
    Set {
        /// Path to the new org-chart YAML
        file: std::path::PathBuf,
    },
    /// Validate project manifest and org chart; exit 1 on errors
    Validate,
}

pub fn run(root: &Path, output: OutputFormat, args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommand::Get => {
            let chart = OrgChart::load(root)?;
            match output {
                OutputFormat::Cli => print!("{}", serde_yaml::to_string(&chart)?),
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&chart)?)
                }
                OutputFormat::Jsonl => println!("{}", serde_json::to_string(&chart)?),
            }
            Ok(())
        }
        ConfigCommand::Set { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("cannot read {}", file.display()))?;
            // Parse validates error-severity lints before anything is written.
            let chart = OrgChart::parse(&raw)?;
            chart.save(root)?;
            eprintln!("org chart updated ({} team(s), {} agent(s))", chart.teams.len(), chart.agents.len());
            Ok(())
        }
        ConfigCommand::Validate => {
            let mut errors = 0usize;
            if let Err(e) = ProjectManifest::load(root) {
                eprintln!("project.yaml: {e}");
                errors += 1;
            }
            match OrgChart::load(root) {
                Ok(chart) => {
                    for issue in chart.lint() {
                        eprintln!("org-chart: {issue}");
                        if issue.severity == Severity::Error {
                            errors += 1;
                        }
                    }
                }
                Err(e) => {
                    eprintln!("org-chart: {e}");
                    errors += 1;
                }
            }
            if errors > 0 {
                bail!("{errors} configuration error(s)");
            }
            println!("configuration ok");
            Ok(())
        }
    }
}
