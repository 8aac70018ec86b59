// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `aof lint` - validate records and configuration; exit 1 on errors.

use super::open_store;
use crate::output::OutputFormat;
use anyhow::{bail, Result};
use aof_manifest::{OrgChart, ProjectManifest, Severity};
use clap::Args;
use serde_json::json;
use std::path::Path;

#[derive(Args)]
pub struct LintArgs {}

pub fn run(root: &Path, output: OutputFormat, _args: LintArgs) -> Result<()> {
    let mut errors = 0usize;
    let mut findings: Vec<serde_json::Value> = Vec::new();

    // Project manifest: a parse failure is itself a finding.
    match ProjectManifest::load(root) {
        Ok(_) => {}
        Err(e) => {
            errors += 1;
            findings.push(json!({
                "source": "project.yaml",
                "severity": "error",
                "message": e.to_string(),
            }));
        }
    }

    // Org chart lint (load leniently so we can report every rule).
    let chart_raw = std::fs::read_to_string(root.join(aof_manifest::ORG_CHART_FILE));
    if let Ok(raw) = chart_raw {
        match serde_yaml::from_str::<OrgChart>(&raw) {
            Ok(chart) => {
                for issue in chart.lint() {
                    if issue.severity == Severity::Error {
                        errors += 1;
                    }
                    findings.push(json!({
                        "source": "org-chart",
                        "severity": issue.severity,
                        "rule": issue.rule,
                        "message": issue.message,
                        "path": issue.path,
                    }));
                }
            }
            Err(e) => {
                errors += 1;
                findings.push(json!({
                    "source": "org-chart",
                    "severity": "error",
                    "message": e.to_string(),
                }));
            }
        }
    }

    // Task records. Emits task.validation.failed events as it goes.
    let store = open_store(root);
    for issue in store.lint()? {
        errors += 1;
        findings.push(json!({
            "source": "tasks",
            "severity": "error",
            "task": issue.task,
            "message": issue.issue,
        }));
    }

    match output {
        OutputFormat::Cli => {
            for finding in &findings {
                let rule = finding["rule"]
                    .as_str()
                    .map(|r| format!(" [{r}]"))
                    .unwrap_or_default();
                println!(
                    "{}: {}{} {}",
                    finding["severity"].as_str().unwrap_or("error"),
                    finding["source"].as_str().unwrap_or(""),
                    rule,
                    finding["message"].as_str().unwrap_or(""),
                );
            }
            println!("{} finding(s), {} error(s)", findings.len(), errors);
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&findings)?),
        OutputFormat::Jsonl => {
            for finding in &findings {
                println!("{}", serde_json::to_string(finding)?);
            }
        }
    }

    if errors > 0 {
        bail!("{errors} lint error(s)");
    }
    Ok(())
}
