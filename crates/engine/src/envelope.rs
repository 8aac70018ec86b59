// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol envelope wire format.
//!
//! Accepted in three carriers: raw JSON, JSON wrapped in a transport
//! message's `payload` field, and a string prefixed `AOF/1 ` followed by
//! the JSON. The size limit applies to the decoded JSON bytes.

use aof_core::{AgentId, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hard cap on decoded envelope bytes: 256 KiB.
pub const MAX_ENVELOPE_BYTES: usize = 256 * 1024;

/// String carrier prefix.
pub const WIRE_PREFIX: &str = "AOF/1 ";

/// Errors from envelope decoding
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),
}

impl EnvelopeError {
    /// Rejection reason string used in `protocol.message.rejected` events.
    pub fn reason(&self) -> &'static str {
        match self {
            EnvelopeError::PayloadTooLarge { .. } => "payload_too_large",
            EnvelopeError::InvalidJson(_) => "invalid_json",
            EnvelopeError::InvalidEnvelope(_) => "invalid_envelope",
        }
    }
}

/// Wire record exchanged between the engine and agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub protocol: String,
    pub version: u32,
    pub project_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub task_id: TaskId,
    pub from_agent: AgentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_agent: Option<AgentId>,
    pub sent_at: DateTime<Utc>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Decode an envelope from any accepted carrier.
pub fn decode(raw: &str) -> Result<Envelope, EnvelopeError> {
    let json = raw.strip_prefix(WIRE_PREFIX).unwrap_or(raw).trim();

    if json.len() > MAX_ENVELOPE_BYTES {
        return Err(EnvelopeError::PayloadTooLarge {
            size: json.len(),
            max: MAX_ENVELOPE_BYTES,
        });
    }

    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| EnvelopeError::InvalidJson(e.to_string()))?;

    // Transport carrier: the envelope rides in a `payload` field.
    let envelope_value = if value.get("protocol").and_then(|p| p.as_str()) == Some("aof") {
        value
    } else if value
        .get("payload")
        .and_then(|p| p.get("protocol"))
        .and_then(|p| p.as_str())
        == Some("aof")
    {
        value
            .get("payload")
            .cloned()
            .unwrap_or(serde_json::Value::Null)
    } else {
        return Err(EnvelopeError::InvalidEnvelope(
            "missing protocol marker".to_string(),
        ));
    };

    let envelope: Envelope = serde_json::from_value(envelope_value)
        .map_err(|e| EnvelopeError::InvalidEnvelope(e.to_string()))?;

    if envelope.version != 1 {
        return Err(EnvelopeError::InvalidEnvelope(format!(
            "unsupported version {}",
            envelope.version
        )));
    }
    if envelope.project_id.trim().is_empty() {
        return Err(EnvelopeError::InvalidEnvelope("empty projectId".to_string()));
    }
    if envelope.task_id.as_str().trim().is_empty() {
        return Err(EnvelopeError::InvalidEnvelope("empty taskId".to_string()));
    }
    if envelope.from_agent.as_str().trim().is_empty() {
        return Err(EnvelopeError::InvalidEnvelope("empty fromAgent".to_string()));
    }
    if envelope.kind.trim().is_empty() {
        return Err(EnvelopeError::InvalidEnvelope("empty type".to_string()));
    }
    Ok(envelope)
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
