// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use aof_core::{Clock, FakeClock};

fn store(dir: &Path) -> MurmurStateStore {
    MurmurStateStore::new(dir)
}

#[test]
fn missing_state_is_default() {
    let dir = tempfile::tempdir().unwrap();
    let state = store(dir.path()).load(&TeamId::new("alpha")).unwrap();
    assert_eq!(state, MurmurState::default());
    assert!(!state.review_open());
}

#[test]
fn increment_persists() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    let team = TeamId::new("alpha");

    assert_eq!(store.increment_completions(&team).unwrap(), 1);
    assert_eq!(store.increment_completions(&team).unwrap(), 2);
    assert_eq!(store.increment_failures(&team).unwrap(), 1);

    let state = store.load(&team).unwrap();
    assert_eq!(state.completions_since_last_review, 2);
    assert_eq!(state.failures_since_last_review, 1);
}

#[test]
fn start_review_sets_guard_and_resets_counters() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    let clock = FakeClock::new();
    let team = TeamId::new("alpha");

    store.increment_completions(&team).unwrap();
    store
        .start_review(&team, &TaskId::new("TASK-2026-01-15-001"), "queueEmpty", clock.now())
        .unwrap();

    let state = store.load(&team).unwrap();
    assert!(state.review_open());
    assert_eq!(state.last_triggered_by.as_deref(), Some("queueEmpty"));
    assert_eq!(state.completions_since_last_review, 0);
    assert_eq!(state.failures_since_last_review, 0);
}

#[test]
fn start_then_end_review_leaves_counters_zero_and_guard_clear() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    let clock = FakeClock::new();
    let team = TeamId::new("alpha");

    store
        .start_review(&team, &TaskId::new("TASK-2026-01-15-001"), "queueEmpty", clock.now())
        .unwrap();
    store.increment_completions(&team).unwrap();
    store.increment_completions(&team).unwrap();
    assert_eq!(
        store.load(&team).unwrap().completions_since_last_review,
        2,
        "intervening completions are observed"
    );

    clock.advance_secs(60);
    store.end_review(&team, clock.now()).unwrap();

    let state = store.load(&team).unwrap();
    assert!(!state.review_open());
    assert!(state.current_review_task_id.is_none());
    assert_eq!(state.completions_since_last_review, 0);
    assert_eq!(state.failures_since_last_review, 0);
    assert_eq!(state.last_review_at, Some(clock.now()));
}

#[test]
fn interleaved_updates_do_not_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    let team = TeamId::new("alpha");

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            let team = team.clone();
            std::thread::spawn(move || store.increment_completions(&team).unwrap())
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let state = store.load(&team).unwrap();
    assert_eq!(state.completions_since_last_review, 8);
}

#[test]
fn stale_lock_is_taken_over() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    let team = TeamId::new("alpha");

    // Simulate a crashed holder: a lock file with an old mtime.
    std::fs::create_dir_all(dir.path().join(".murmur")).unwrap();
    let lock = dir.path().join(".murmur/alpha.lock");
    std::fs::write(&lock, b"").unwrap();
    let old = std::time::SystemTime::now() - std::time::Duration::from_secs(120);
    let file = std::fs::OpenOptions::new().write(true).open(&lock).unwrap();
    file.set_modified(old).unwrap();
    drop(file);

    assert_eq!(store.increment_completions(&team).unwrap(), 1);
    assert!(!lock.exists(), "lock released after update");
}

#[test]
fn known_teams_lists_state_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    store.increment_completions(&TeamId::new("alpha")).unwrap();
    store.increment_completions(&TeamId::new("beta")).unwrap();

    let teams: Vec<String> = store
        .known_teams()
        .unwrap()
        .into_iter()
        .map(|t| t.to_string())
        .collect();
    assert_eq!(teams, vec!["alpha", "beta"]);
}

#[test]
fn corrupt_state_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join(".murmur")).unwrap();
    std::fs::write(dir.path().join(".murmur/alpha.json"), "{broken").unwrap();

    let err = store(dir.path()).load(&TeamId::new("alpha")).unwrap_err();
    assert!(matches!(err, MurmurStateError::Corrupt { .. }));
}
