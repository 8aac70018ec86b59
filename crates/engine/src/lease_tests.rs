// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use aof_core::{FakeClock, NewTask};
use aof_storage::EventLogger;
use std::sync::Arc;
use tempfile::TempDir;

fn fixture() -> (TempDir, TaskStore, FakeClock) {
    let dir = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();
    let logger = EventLogger::new(dir.path(), Arc::new(clock.clone()));
    let store = TaskStore::new(dir.path(), Arc::new(clock.clone()), logger);
    (dir, store, clock)
}

fn ready_task(store: &TaskStore) -> TaskId {
    let task = store
        .create(NewTask {
            title: "t".into(),
            created_by: "tests".into(),
            status: Some(TaskStatus::Ready),
            ..Default::default()
        })
        .unwrap();
    task.id
}

#[test]
fn acquire_takes_ready_task_in_progress() {
    let (_dir, store, clock) = fixture();
    let id = ready_task(&store);
    let manager = LeaseManager::new(&store);

    let lease = manager.acquire(&id, &AgentId::new("a1"), None).unwrap();
    assert_eq!(lease.agent.as_str(), "a1");
    assert_eq!(lease.renew_count, 0);
    assert_eq!(
        lease.expires_at,
        clock.now() + Duration::milliseconds(DEFAULT_LEASE_TTL_MS)
    );

    let task = store.get(&id).unwrap();
    assert_eq!(task.status, TaskStatus::InProgress);
    assert_eq!(task.lease.unwrap().agent.as_str(), "a1");
}

#[test]
fn acquire_fails_while_lease_live() {
    let (_dir, store, _clock) = fixture();
    let id = ready_task(&store);
    let manager = LeaseManager::new(&store);

    manager.acquire(&id, &AgentId::new("a1"), None).unwrap();
    let err = manager.acquire(&id, &AgentId::new("a2"), None).unwrap_err();
    assert!(matches!(err, LeaseError::LeaseHeld { .. }));
}

#[test]
fn acquire_takes_over_expired_lease() {
    let (_dir, store, clock) = fixture();
    let id = ready_task(&store);
    let manager = LeaseManager::new(&store);

    manager
        .acquire(&id, &AgentId::new("a1"), Some(1000))
        .unwrap();
    clock.advance_ms(2000);

    let lease = manager.acquire(&id, &AgentId::new("a2"), None).unwrap();
    assert_eq!(lease.agent.as_str(), "a2");

    // Status never left in-progress during takeover.
    assert_eq!(store.get(&id).unwrap().status, TaskStatus::InProgress);
}

#[test]
fn acquire_rejects_backlog_task() {
    let (_dir, store, _clock) = fixture();
    let task = store
        .create(NewTask {
            title: "t".into(),
            created_by: "tests".into(),
            ..Default::default()
        })
        .unwrap();
    let manager = LeaseManager::new(&store);
    let err = manager
        .acquire(&task.id, &AgentId::new("a1"), None)
        .unwrap_err();
    assert!(matches!(err, LeaseError::Store(_)));
}

#[test]
fn renew_extends_and_counts() {
    let (_dir, store, clock) = fixture();
    let id = ready_task(&store);
    let manager = LeaseManager::new(&store);
    let agent = AgentId::new("a1");

    manager.acquire(&id, &agent, Some(1000)).unwrap();
    clock.advance_ms(500);
    let renewed = manager.renew(&id, &agent, Some(1000)).unwrap();

    assert_eq!(renewed.renew_count, 1);
    assert_eq!(renewed.expires_at, clock.now() + Duration::milliseconds(1000));
}

#[test]
fn renew_rejects_wrong_holder() {
    let (_dir, store, _clock) = fixture();
    let id = ready_task(&store);
    let manager = LeaseManager::new(&store);

    manager.acquire(&id, &AgentId::new("a1"), None).unwrap();
    let err = manager.renew(&id, &AgentId::new("a2"), None).unwrap_err();
    assert!(matches!(err, LeaseError::WrongHolder { .. }));
}

#[test]
fn renewals_exhaust() {
    let (_dir, store, _clock) = fixture();
    let id = ready_task(&store);
    let manager = LeaseManager::new(&store).with_max_renewals(2);
    let agent = AgentId::new("a1");

    manager.acquire(&id, &agent, None).unwrap();
    manager.renew(&id, &agent, None).unwrap();
    manager.renew(&id, &agent, None).unwrap();
    let err = manager.renew(&id, &agent, None).unwrap_err();
    assert!(matches!(err, LeaseError::RenewalsExhausted { .. }));
}

#[test]
fn release_returns_task_to_ready() {
    let (_dir, store, _clock) = fixture();
    let id = ready_task(&store);
    let manager = LeaseManager::new(&store);
    let agent = AgentId::new("a1");

    manager.acquire(&id, &agent, None).unwrap();
    manager.release(&id, &agent).unwrap();

    let task = store.get(&id).unwrap();
    assert_eq!(task.status, TaskStatus::Ready);
    assert!(task.lease.is_none());
}

#[test]
fn release_rejects_wrong_holder() {
    let (_dir, store, _clock) = fixture();
    let id = ready_task(&store);
    let manager = LeaseManager::new(&store);

    manager.acquire(&id, &AgentId::new("a1"), None).unwrap();
    let err = manager.release(&id, &AgentId::new("a2")).unwrap_err();
    assert!(matches!(err, LeaseError::WrongHolder { .. }));
}

#[test]
fn expire_requeues_and_reports_holder() {
    let (_dir, store, clock) = fixture();
    let id = ready_task(&store);
    let manager = LeaseManager::new(&store);

    manager
        .acquire(&id, &AgentId::new("a1"), Some(1000))
        .unwrap();
    clock.advance_ms(2000);

    let holder = manager.expire(&id).unwrap();
    assert_eq!(holder.as_str(), "a1");

    let task = store.get(&id).unwrap();
    assert_eq!(task.status, TaskStatus::Ready);
    assert!(task.lease.is_none());
}

#[test]
fn lease_events_are_emitted() {
    let (_dir, store, _clock) = fixture();
    let id = ready_task(&store);
    let manager = LeaseManager::new(&store);
    let agent = AgentId::new("a1");

    manager.acquire(&id, &agent, None).unwrap();
    manager.renew(&id, &agent, None).unwrap();
    manager.release(&id, &agent).unwrap();

    let kinds: Vec<String> = store
        .logger()
        .read_today()
        .into_iter()
        .map(|e| e.kind.to_string())
        .collect();
    assert!(kinds.contains(&"lease.acquired".to_string()));
    assert!(kinds.contains(&"lease.renewed".to_string()));
    assert!(kinds.contains(&"lease.released".to_string()));
}
