// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Org chart (`org/org-chart.yaml`): teams, agents, dispatch and murmur
//! overrides.

use crate::error::ManifestError;
use crate::lint::{LintIssue, Severity};
use aof_core::{AgentId, TeamId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Org chart path relative to the data directory root.
pub const ORG_CHART_FILE: &str = "org/org-chart.yaml";

/// Per-team dispatch throttle overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamDispatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_interval_ms: Option<i64>,
}

/// A murmur trigger, evaluated in list order; the first match fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MurmurTrigger {
    /// No ready and no in-progress tasks for the team.
    QueueEmpty,
    /// `completions_since_last_review >= threshold`.
    CompletionBatch { threshold: u32 },
    /// `failures_since_last_review >= threshold`.
    FailureBatch { threshold: u32 },
}

/// Per-team murmur configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MurmurConfig {
    #[serde(default)]
    pub triggers: Vec<MurmurTrigger>,
    /// Context refs included in the review task brief.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context_includes: Vec<String>,
}

/// Character-budget thresholds for an agent's context bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextBudget {
    pub target: usize,
    pub warn: usize,
    pub critical: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPolicies {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ContextBudget>,
}

/// A team in the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: TeamId,
    /// Agent who receives murmur review tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orchestrator: Option<AgentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispatch: Option<TeamDispatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub murmur: Option<MurmurConfig>,
}

/// An agent in the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: AgentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<TeamId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reports_to: Option<AgentId>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policies: Option<AgentPolicies>,
}

fn default_active() -> bool {
    true
}

/// The org chart document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgChart {
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub agents: Vec<Agent>,
}

impl OrgChart {
    /// Load `org/org-chart.yaml` from a data directory root.
    ///
    /// A missing file is an empty roster, not an error — a data directory
    /// without an org chart simply has nothing to dispatch to.
    pub fn load(root: &Path) -> Result<Self, ManifestError> {
        let path = root.join(ORG_CHART_FILE);
        if !path.exists() {
            return Ok(OrgChart::default());
        }
        let raw = fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, ManifestError> {
        let chart: OrgChart = serde_yaml::from_str(raw)?;
        let errors: Vec<_> = chart
            .lint()
            .into_iter()
            .filter(|i| i.severity == Severity::Error)
            .collect();
        if let Some(first) = errors.first() {
            return Err(ManifestError::OrgChartInvalid(format!(
                "{} ({} issue(s) total)",
                first.message,
                errors.len()
            )));
        }
        Ok(chart)
    }

    /// Serialize, lint, and write atomically (write-temp + rename).
    pub fn save(&self, root: &Path) -> Result<(), ManifestError> {
        if let Some(issue) = self
            .lint()
            .into_iter()
            .find(|i| i.severity == Severity::Error)
        {
            return Err(ManifestError::OrgChartInvalid(issue.message));
        }
        let path = root.join(ORG_CHART_FILE);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("yaml.tmp");
        fs::write(&tmp, serde_yaml::to_string(self)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    pub fn team(&self, id: &str) -> Option<&Team> {
        self.teams.iter().find(|t| t.id.as_str() == id)
    }

    pub fn agent(&self, id: &str) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id.as_str() == id)
    }

    /// Active agents carrying the given role, in roster order.
    pub fn agents_with_role<'a>(&'a self, role: &'a str) -> impl Iterator<Item = &'a Agent> + 'a {
        self.agents
            .iter()
            .filter(move |a| a.active && a.roles.iter().any(|r| r == role))
    }

    /// Active members of the given team, in roster order.
    pub fn team_members<'a>(&'a self, team: &'a str) -> impl Iterator<Item = &'a Agent> + 'a {
        self.agents
            .iter()
            .filter(move |a| a.active && a.team.as_ref().is_some_and(|t| t.as_str() == team))
    }

    /// Lint the roster. Never fails; returns one issue per violated rule.
    pub fn lint(&self) -> Vec<LintIssue> {
        let mut issues = Vec::new();

        let mut team_ids = HashSet::new();
        for team in &self.teams {
            if !team_ids.insert(team.id.as_str()) {
                issues.push(LintIssue::error(
                    "duplicate-team",
                    format!("team '{}' is defined more than once", team.id),
                    format!("teams.{}", team.id),
                ));
            }
        }

        let mut agent_ids = HashSet::new();
        for agent in &self.agents {
            if !agent_ids.insert(agent.id.as_str()) {
                issues.push(LintIssue::error(
                    "duplicate-agent",
                    format!("agent '{}' is defined more than once", agent.id),
                    format!("agents.{}", agent.id),
                ));
            }
        }

        // Dangling references
        for team in &self.teams {
            if let Some(orchestrator) = &team.orchestrator {
                if !agent_ids.contains(orchestrator.as_str()) {
                    issues.push(LintIssue::error(
                        "dangling-orchestrator",
                        format!(
                            "team '{}' names unknown orchestrator '{}'",
                            team.id, orchestrator
                        ),
                        format!("teams.{}.orchestrator", team.id),
                    ));
                }
            }
        }
        for agent in &self.agents {
            if let Some(team) = &agent.team {
                if !team_ids.contains(team.as_str()) {
                    issues.push(LintIssue::error(
                        "dangling-team",
                        format!("agent '{}' names unknown team '{}'", agent.id, team),
                        format!("agents.{}.team", agent.id),
                    ));
                }
            }
        }

        // Circular reportsTo chains
        let reports: HashMap<&str, &str> = self
            .agents
            .iter()
            .filter_map(|a| a.reports_to.as_ref().map(|r| (a.id.as_str(), r.as_str())))
            .collect();
        for agent in &self.agents {
            let mut seen = HashSet::new();
            let mut current = agent.id.as_str();
            while let Some(next) = reports.get(current) {
                if !seen.insert(current) {
                    issues.push(LintIssue::error(
                        "circular-reports-to",
                        format!("agent '{}' is in a reportsTo cycle", agent.id),
                        format!("agents.{}.reportsTo", agent.id),
                    ));
                    break;
                }
                current = next;
            }
        }

        // Context budgets must be strictly increasing
        for agent in &self.agents {
            if let Some(budget) = agent.policies.as_ref().and_then(|p| p.context.as_ref()) {
                if !(budget.target < budget.warn && budget.warn < budget.critical) {
                    issues.push(LintIssue::error(
                        "inverted-context-budget",
                        format!(
                            "agent '{}' context budget must satisfy target < warn < critical",
                            agent.id
                        ),
                        format!("agents.{}.policies.context", agent.id),
                    ));
                }
            }
        }

        // Murmur thresholds of zero never stop firing
        for team in &self.teams {
            if let Some(murmur) = &team.murmur {
                for trigger in &murmur.triggers {
                    let threshold = match trigger {
                        MurmurTrigger::CompletionBatch { threshold }
                        | MurmurTrigger::FailureBatch { threshold } => *threshold,
                        MurmurTrigger::QueueEmpty => continue,
                    };
                    if threshold == 0 {
                        issues.push(LintIssue::warning(
                            "zero-murmur-threshold",
                            format!("team '{}' has a murmur trigger with threshold 0", team.id),
                            format!("teams.{}.murmur", team.id),
                        ));
                    }
                }
                if murmur.orchestrator_missing(team) {
                    issues.push(LintIssue::error(
                        "murmur-without-orchestrator",
                        format!(
                            "team '{}' configures murmur but has no orchestrator",
                            team.id
                        ),
                        format!("teams.{}.murmur", team.id),
                    ));
                }
            }
        }

        issues
    }
}

impl MurmurConfig {
    fn orchestrator_missing(&self, team: &Team) -> bool {
        !self.triggers.is_empty() && team.orchestrator.is_none()
    }
}

#[cfg(test)]
#[path = "org_tests.rs"]
mod tests;
