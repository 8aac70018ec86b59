// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project manifest (`project.yaml`): id, SLA defaults, optional workflow.

use crate::condition::GateCondition;
use crate::error::ManifestError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// File name of the project manifest within a data directory.
pub const PROJECT_MANIFEST_FILE: &str = "project.yaml";

/// SLA defaults applied when a task carries no override.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlaDefaults {
    /// Default in-progress ceiling, milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_max_in_progress_ms: Option<i64>,
    /// Ceiling for researcher agents, milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research_max_in_progress_ms: Option<i64>,
}

/// One stage of a multi-stage workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gate {
    pub id: String,
    /// Role expected to work the gate (resolved through the org chart).
    pub role: String,
    #[serde(default)]
    pub can_reject: bool,
    /// Condition gating whether this stage applies to a given task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<GateCondition>,
    #[serde(default)]
    pub require_human: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Ordered gate sequence on the project manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub gates: Vec<Gate>,
    /// Only `origin` is supported: all rejections return to the first gate.
    #[serde(default = "default_rejection_strategy")]
    pub rejection_strategy: String,
}

fn default_rejection_strategy() -> String {
    "origin".to_string()
}

impl Workflow {
    /// Position of a gate by id.
    pub fn gate_index(&self, id: &str) -> Option<usize> {
        self.gates.iter().position(|g| g.id == id)
    }

    pub fn gate(&self, id: &str) -> Option<&Gate> {
        self.gates.iter().find(|g| g.id == id)
    }

    pub fn first_gate(&self) -> Option<&Gate> {
        self.gates.first()
    }

    /// Structural validation.
    ///
    /// The first gate must never reject (a rejection has to loop back
    /// somewhere), gate ids must be unique, and the rejection strategy must
    /// be the one documented value.
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.gates.is_empty() {
            return Err(ManifestError::WorkflowMisconfigured(
                "workflow has no gates".to_string(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for gate in &self.gates {
            if gate.id.trim().is_empty() {
                return Err(ManifestError::WorkflowMisconfigured(
                    "gate with empty id".to_string(),
                ));
            }
            if !seen.insert(gate.id.as_str()) {
                return Err(ManifestError::WorkflowMisconfigured(format!(
                    "duplicate gate id: {}",
                    gate.id
                )));
            }
        }
        if self.gates[0].can_reject {
            return Err(ManifestError::WorkflowMisconfigured(format!(
                "first gate '{}' must not have canReject",
                self.gates[0].id
            )));
        }
        if self.rejection_strategy != "origin" {
            return Err(ManifestError::WorkflowMisconfigured(format!(
                "unknown rejection strategy '{}' (only 'origin' is supported)",
                self.rejection_strategy
            )));
        }
        Ok(())
    }
}

/// The `project.yaml` manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectManifest {
    pub id: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub project_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default)]
    pub sla: SlaDefaults,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<Workflow>,
}

impl ProjectManifest {
    /// Load and validate `project.yaml` from a data directory root.
    pub fn load(root: &Path) -> Result<Self, ManifestError> {
        let raw = fs::read_to_string(root.join(PROJECT_MANIFEST_FILE))?;
        Self::parse(&raw)
    }

    /// Parse and validate manifest text.
    pub fn parse(raw: &str) -> Result<Self, ManifestError> {
        let manifest: ProjectManifest = serde_yaml::from_str(raw)?;
        if manifest.id.trim().is_empty() {
            return Err(ManifestError::WorkflowMisconfigured(
                "project id is empty".to_string(),
            ));
        }
        if let Some(workflow) = &manifest.workflow {
            workflow.validate()?;
        }
        Ok(manifest)
    }

    /// Serialize, validate, and write atomically (write-temp + rename).
    pub fn save(&self, root: &Path) -> Result<(), ManifestError> {
        if let Some(workflow) = &self.workflow {
            workflow.validate()?;
        }
        let path = root.join(PROJECT_MANIFEST_FILE);
        let tmp = path.with_extension("yaml.tmp");
        fs::write(&tmp, serde_yaml::to_string(self)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "project_tests.rs"]
mod tests;
