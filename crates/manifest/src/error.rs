// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for manifest loading and validation

use thiserror::Error;

/// Errors from loading or writing manifests
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("workflow misconfigured: {0}")]
    WorkflowMisconfigured(String),
    #[error("invalid gate condition at {location}: {message}")]
    InvalidCondition { location: String, message: String },
    #[error("org chart invalid: {0}")]
    OrgChartInvalid(String),
}
