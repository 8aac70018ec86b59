// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::clock::Clock;
use crate::task::{NewTask, Priority, Routing, Task, TaskId, TaskStatus};
use crate::AgentId;

// ── Task factory functions ──────────────────────────────────────────────────

/// A minimal backlog task with the given id.
pub fn task_fixture(id: &str, clock: &dyn Clock) -> Task {
    Task::new(
        TaskId::new(id),
        NewTask {
            title: format!("task {id}"),
            body: "Do the thing.".to_string(),
            created_by: "tests".to_string(),
            ..Default::default()
        },
        clock.now(),
    )
}

/// A ready task routed to an explicit agent.
pub fn ready_task_for_agent(id: &str, agent: &str, clock: &dyn Clock) -> Task {
    Task::new(
        TaskId::new(id),
        NewTask {
            title: format!("task {id}"),
            body: "Do the thing.".to_string(),
            priority: Priority::Normal,
            routing: Routing {
                agent: Some(AgentId::new(agent)),
                ..Default::default()
            },
            created_by: "tests".to_string(),
            status: Some(TaskStatus::Ready),
            ..Default::default()
        },
        clock.now(),
    )
}

/// A new-task input routed to a team, for store-level tests.
pub fn new_task_for_team(title: &str, team: &str) -> NewTask {
    NewTask {
        title: title.to_string(),
        body: String::new(),
        routing: Routing {
            team: Some(crate::TeamId::new(team)),
            ..Default::default()
        },
        created_by: "tests".to_string(),
        ..Default::default()
    }
}
