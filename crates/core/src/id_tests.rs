// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn agent_id_display() {
    let id = AgentId::new("dev-1");
    assert_eq!(id.to_string(), "dev-1");
}

#[test]
fn agent_id_equality() {
    let a = AgentId::new("a1");
    let b = AgentId::new("a1");
    let c = AgentId::new("a2");

    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(a, "a1");
}

#[test]
fn session_id_from_str() {
    let id: SessionId = "sess".into();
    assert_eq!(id.as_str(), "sess");
}

#[test]
fn team_id_serde() {
    let id = TeamId::new("alpha");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"alpha\"");

    let parsed: TeamId = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, id);
}

#[test]
fn short_truncates() {
    let id = SessionId::new("abcdefgh");
    assert_eq!(id.short(4), "abcd");
    assert_eq!(id.short(100), "abcdefgh");
}

#[test]
fn short_id_on_str() {
    assert_eq!("abcdef".short(3), "abc");
    assert_eq!("ab".short(3), "ab");
}

#[test]
fn correlation_ids_are_unique() {
    assert_ne!(new_correlation_id(), new_correlation_id());
}
