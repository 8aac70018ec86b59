// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Gate `when` predicates.
//!
//! A condition is a single comparison over the task's routing context:
//!
//! ```text
//! tags.includes('security')
//! routing.agent == 'a1'
//! routing.role == 'qa'
//! routing.team == 'alpha'
//! priority == 'critical'
//! ```
//!
//! Conditions are parsed once at manifest load; evaluation is a pure match
//! against the task.

use crate::error::ManifestError;
use aof_core::task::{Priority, Routing};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A parsed gate condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateCondition {
    TagIncludes(String),
    AgentIs(String),
    RoleIs(String),
    TeamIs(String),
    PriorityIs(Priority),
}

impl GateCondition {
    /// Parse the condition mini-grammar.
    pub fn parse(input: &str, location: &str) -> Result<GateCondition, ManifestError> {
        let s = input.trim();

        if let Some(arg) = s
            .strip_prefix("tags.includes(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let tag = unquote(arg).ok_or_else(|| invalid(location, "expected a quoted tag"))?;
            return Ok(GateCondition::TagIncludes(tag));
        }

        let (lhs, rhs) = s
            .split_once("==")
            .ok_or_else(|| invalid(location, "expected `lhs == 'value'` or tags.includes(...)"))?;
        let value =
            unquote(rhs).ok_or_else(|| invalid(location, "right-hand side must be quoted"))?;

        match lhs.trim() {
            "routing.agent" => Ok(GateCondition::AgentIs(value)),
            "routing.role" => Ok(GateCondition::RoleIs(value)),
            "routing.team" => Ok(GateCondition::TeamIs(value)),
            "priority" => {
                let priority = Priority::parse(&value)
                    .ok_or_else(|| invalid(location, &format!("unknown priority '{value}'")))?;
                Ok(GateCondition::PriorityIs(priority))
            }
            other => Err(invalid(location, &format!("unknown field '{other}'"))),
        }
    }

    /// Evaluate against a task's routing context.
    pub fn eval(&self, routing: &Routing, priority: Priority) -> bool {
        match self {
            GateCondition::TagIncludes(tag) => routing.tags.iter().any(|t| t == tag),
            GateCondition::AgentIs(agent) => {
                routing.agent.as_ref().is_some_and(|a| a.as_str() == agent)
            }
            GateCondition::RoleIs(role) => routing.role.as_deref() == Some(role.as_str()),
            GateCondition::TeamIs(team) => {
                routing.team.as_ref().is_some_and(|t| t.as_str() == team)
            }
            GateCondition::PriorityIs(p) => priority == *p,
        }
    }
}

impl fmt::Display for GateCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateCondition::TagIncludes(tag) => write!(f, "tags.includes('{tag}')"),
            GateCondition::AgentIs(a) => write!(f, "routing.agent == '{a}'"),
            GateCondition::RoleIs(r) => write!(f, "routing.role == '{r}'"),
            GateCondition::TeamIs(t) => write!(f, "routing.team == '{t}'"),
            GateCondition::PriorityIs(p) => write!(f, "priority == '{p}'"),
        }
    }
}

impl Serialize for GateCondition {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for GateCondition {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        GateCondition::parse(&s, "when").map_err(serde::de::Error::custom)
    }
}

fn unquote(s: &str) -> Option<String> {
    let s = s.trim();
    let inner = s
        .strip_prefix('\'')
        .and_then(|r| r.strip_suffix('\''))
        .or_else(|| s.strip_prefix('"').and_then(|r| r.strip_suffix('"')))?;
    if inner.is_empty() {
        None
    } else {
        Some(inner.to_string())
    }
}

fn invalid(location: &str, message: &str) -> ManifestError {
    ManifestError::InvalidCondition {
        location: location.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
#[path = "condition_tests.rs"]
mod tests;
