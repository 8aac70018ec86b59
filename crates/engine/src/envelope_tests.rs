// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn raw_envelope() -> String {
    serde_json::json!({
        "protocol": "aof",
        "version": 1,
        "projectId": "demo",
        "type": "status.update",
        "taskId": "TASK-2026-01-15-001",
        "fromAgent": "dev-1",
        "sentAt": "2026-01-15T12:00:00Z",
        "payload": {"progress": "halfway"}
    })
    .to_string()
}

#[test]
fn decodes_raw_json() {
    let envelope = decode(&raw_envelope()).unwrap();
    assert_eq!(envelope.kind, "status.update");
    assert_eq!(envelope.project_id, "demo");
    assert_eq!(envelope.task_id.as_str(), "TASK-2026-01-15-001");
    assert_eq!(envelope.payload["progress"], "halfway");
}

#[test]
fn decodes_prefixed_carrier() {
    let wire = format!("{WIRE_PREFIX}{}", raw_envelope());
    let envelope = decode(&wire).unwrap();
    assert_eq!(envelope.from_agent.as_str(), "dev-1");
}

#[test]
fn decodes_transport_wrapped_carrier() {
    let wrapped = serde_json::json!({
        "channel": "bridge-7",
        "payload": serde_json::from_str::<serde_json::Value>(&raw_envelope()).unwrap(),
    })
    .to_string();
    let envelope = decode(&wrapped).unwrap();
    assert_eq!(envelope.kind, "status.update");
}

#[test]
fn rejects_oversized_payload() {
    let mut big = serde_json::from_str::<serde_json::Value>(&raw_envelope()).unwrap();
    big["payload"]["blob"] = serde_json::json!("z".repeat(MAX_ENVELOPE_BYTES));
    let err = decode(&big.to_string()).unwrap_err();
    assert_eq!(err.reason(), "payload_too_large");
}

#[test]
fn rejects_invalid_json() {
    let err = decode("{not json").unwrap_err();
    assert_eq!(err.reason(), "invalid_json");
}

#[parameterized(
    no_protocol = { r#"{"version":1,"taskId":"T"}"# },
    wrong_protocol = { r#"{"protocol":"mcp","version":1}"# },
)]
fn rejects_foreign_messages(raw: &str) {
    let err = decode(raw).unwrap_err();
    assert_eq!(err.reason(), "invalid_envelope");
}

#[test]
fn rejects_missing_required_fields() {
    let raw = serde_json::json!({
        "protocol": "aof",
        "version": 1,
        "type": "status.update",
    })
    .to_string();
    let err = decode(&raw).unwrap_err();
    assert_eq!(err.reason(), "invalid_envelope");
}

#[test]
fn rejects_unsupported_version() {
    let mut value = serde_json::from_str::<serde_json::Value>(&raw_envelope()).unwrap();
    value["version"] = serde_json::json!(2);
    let err = decode(&value.to_string()).unwrap_err();
    assert!(err.to_string().contains("unsupported version"));
}

#[test]
fn round_trips() {
    let envelope = decode(&raw_envelope()).unwrap();
    let re_encoded = serde_json::to_string(&envelope).unwrap();
    assert_eq!(decode(&re_encoded).unwrap(), envelope);
}
