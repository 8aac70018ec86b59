// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler poll: one orchestration cycle.
//!
//! `poll()` runs the passes in a strict, deterministic order — snapshot,
//! lease expiry, stale heartbeats, promotion, blocked recovery, dispatch,
//! cascade, SLA, murmur — then emits a single `scheduler.poll` summary
//! event. The caller decides when to invoke it; there is no internal loop,
//! and a single task's failure never aborts the cycle.

use crate::dispatch::{
    classify_spawn_error, compute_retry_backoff_ms, resolve_agent, team_limits, DispatchLimits,
    SpawnErrorClass, ThrottleState,
};
use crate::gate::build_gate_context;
use crate::lease::LeaseManager;
use crate::metrics::{names, Metrics};
use crate::murmur::MurmurManager;
use crate::router::{apply_outcome_transitions, ProjectContext};
use crate::sla::SlaChecker;
use aof_adapters::executor::{ExecutorAdapter, SpawnContext};
use aof_core::{
    AgentId, EventKind, EventRecord, SessionId, Task, TaskId, TaskStatus,
};
use aof_manifest::{OrgChart, ProjectManifest};
use aof_storage::{expire_run_result, read_run_result, TaskStore, TransitionOpts};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Default stale-heartbeat threshold: 10 minutes.
pub const DEFAULT_STALE_HEARTBEAT_MS: i64 = 10 * 60 * 1000;

/// Configuration for one poll cycle.
#[derive(Clone)]
pub struct PollConfig {
    /// Plan and log, mutate nothing.
    pub dry_run: bool,
    pub limits: DispatchLimits,
    pub lease_ttl_ms: i64,
    pub stale_heartbeat_ms: i64,
    /// Spawn RPC timeout; a timeout classifies as transient.
    pub spawn_timeout_ms: Option<u64>,
    /// Pinned jitter for the retry backoff (tests); `None` samples.
    pub backoff_jitter: Option<f64>,
    pub actor: String,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            limits: DispatchLimits::default(),
            lease_ttl_ms: crate::lease::DEFAULT_LEASE_TTL_MS,
            stale_heartbeat_ms: DEFAULT_STALE_HEARTBEAT_MS,
            spawn_timeout_ms: None,
            backoff_jitter: None,
            actor: "scheduler".to_string(),
        }
    }
}

/// Everything a poll cycle reads or mutates.
pub struct PollDeps<'a> {
    pub store: &'a TaskStore,
    pub org: &'a OrgChart,
    pub manifest: &'a ProjectManifest,
    pub executor: Arc<dyn ExecutorAdapter>,
    pub throttle: &'a ThrottleState,
    pub murmur: &'a MurmurManager,
    pub sla: &'a SlaChecker,
    pub metrics: Option<&'a Metrics>,
}

/// One planned (and possibly executed) scheduler action.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SchedulerAction {
    ExpireLease {
        task_id: TaskId,
        agent: AgentId,
    },
    StaleHeartbeat {
        task_id: TaskId,
        session_id: SessionId,
        recovered_outcome: Option<String>,
    },
    Promote {
        task_id: TaskId,
    },
    Assign {
        task_id: TaskId,
        agent: AgentId,
    },
    Requeue {
        task_id: TaskId,
        reason: String,
    },
    Deadletter {
        task_id: TaskId,
        reason: String,
    },
    Alert {
        task_id: Option<TaskId>,
        message: String,
    },
    Block {
        task_id: TaskId,
        reason: String,
    },
    SlaViolation {
        task_id: TaskId,
        duration_ms: i64,
        limit_ms: i64,
    },
    MurmurCreateTask {
        team: String,
        task_id: TaskId,
        trigger: String,
    },
}

/// Poll summary, also emitted as the `scheduler.poll` event payload.
#[derive(Debug, Default, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollStats {
    pub actions_planned: usize,
    pub actions_executed: usize,
    pub actions_failed: usize,
    pub leases_expired: usize,
    pub tasks_requeued: usize,
    pub tasks_promoted: usize,
    pub reviews_skipped: u32,
    pub dry_run: bool,
    #[serde(skip)]
    pub actions: Vec<SchedulerAction>,
}

/// Run one scheduler cycle.
pub async fn poll(deps: &PollDeps<'_>, cfg: &PollConfig) -> PollStats {
    let store = deps.store;
    let mut stats = PollStats {
        dry_run: cfg.dry_run,
        ..Default::default()
    };
    let ctx = ProjectContext {
        store: store.clone(),
        workflow: deps.manifest.workflow.clone(),
        org: deps.org.clone(),
    };

    // Pass 1: snapshot.
    let snapshot = match store.list() {
        Ok(tasks) => tasks,
        Err(e) => {
            error!(error = %e, "poll aborted: cannot list tasks");
            return stats;
        }
    };

    expire_leases(deps, cfg, &snapshot, &mut stats);
    recover_stale_sessions(deps, cfg, &ctx, &snapshot, &mut stats).await;
    promote_ready(deps, cfg, &snapshot, &mut stats);
    recover_blocked(deps, cfg, &snapshot, &mut stats);
    dispatch_ready(deps, cfg, &snapshot, &mut stats).await;
    cascade_dependents(deps, cfg, &mut stats);
    check_sla(deps, cfg, &mut stats);
    run_murmur(deps, cfg, &mut stats);

    finish(deps, cfg, &mut stats);
    stats
}

fn plan(stats: &mut PollStats, action: SchedulerAction) {
    stats.actions_planned += 1;
    stats.actions.push(action);
}

// ── Pass 2: lease expiry ────────────────────────────────────────────────────

fn expire_leases(deps: &PollDeps<'_>, cfg: &PollConfig, snapshot: &[Task], stats: &mut PollStats) {
    let now = deps.store.clock().now();
    let manager = LeaseManager::new(deps.store).with_ttl_ms(cfg.lease_ttl_ms);

    for task in snapshot {
        let Some(lease) = &task.lease else { continue };
        if !lease.is_expired(now) {
            continue;
        }
        // Blocked spawn-failed tasks are recovered by the backoff pass, not
        // reclaimed here.
        if task.status == TaskStatus::Blocked && is_spawn_failed(task) {
            continue;
        }
        plan(
            stats,
            SchedulerAction::ExpireLease {
                task_id: task.id.clone(),
                agent: lease.agent.clone(),
            },
        );
        if cfg.dry_run {
            continue;
        }
        match manager.expire(&task.id) {
            Ok(_) => {
                stats.leases_expired += 1;
                stats.tasks_requeued += 1;
                if let Some(metrics) = deps.metrics {
                    metrics.inc(names::LEASES_EXPIRED_TOTAL, &[]);
                }
            }
            Err(e) => warn!(task = %task.id, error = %e, "lease expiry failed"),
        }
    }
}

// ── Pass 3: stale heartbeats ────────────────────────────────────────────────

async fn recover_stale_sessions(
    deps: &PollDeps<'_>,
    cfg: &PollConfig,
    ctx: &ProjectContext,
    snapshot: &[Task],
    stats: &mut PollStats,
) {
    if cfg.stale_heartbeat_ms <= 0 {
        return;
    }
    let now = deps.store.clock().now();

    for task in snapshot {
        if task.status != TaskStatus::InProgress {
            continue;
        }
        let Some(lease) = &task.lease else { continue };
        if lease.is_expired(now) {
            continue; // handled by the expiry pass
        }
        let Some(session_id) = &task.metadata.session_id else {
            continue;
        };

        let stale = match deps.executor.get_session_status(session_id).await {
            Ok(status) => {
                // A session that never heartbeated is judged from when the
                // lease was taken.
                let baseline = status.last_heartbeat_at.unwrap_or(lease.acquired_at);
                let heartbeat_age_ms = (now - baseline).num_milliseconds();
                !status.alive || heartbeat_age_ms > cfg.stale_heartbeat_ms
            }
            Err(_) => true, // a session the gateway no longer knows is stale
        };
        if !stale {
            continue;
        }

        let recovered = read_recovery_outcome(deps.store, &task.id);
        plan(
            stats,
            SchedulerAction::StaleHeartbeat {
                task_id: task.id.clone(),
                session_id: session_id.clone(),
                recovered_outcome: recovered.as_ref().map(|r| r.outcome.to_string()),
            },
        );
        if cfg.dry_run {
            continue;
        }

        if deps.executor.force_complete_session(session_id).await.is_ok() {
            deps.store.logger().emit(
                EventRecord::new(EventKind::SessionForceCompleted, &cfg.actor, now)
                    .with_task(task.id.clone())
                    .with_payload(json!({"sessionId": session_id})),
            );
        }

        match recovered {
            Some(result) => {
                // Apply the recorded outcome; `done` cascades via pass 7.
                if let Err(reason) = apply_outcome_transitions(
                    ctx,
                    task,
                    result.outcome,
                    &result.blockers,
                    result.notes.as_deref(),
                    result.agent.clone(),
                    &cfg.actor,
                ) {
                    warn!(task = %task.id, reason, "stale-session recovery could not apply run result");
                }
                expire_artifact(deps.store, &task.id);
            }
            None => {
                // No durable result: reclaim the task.
                let result = deps.store.transition_and_update(
                    &task.id,
                    TaskStatus::Ready,
                    TransitionOpts {
                        reason: Some("stale session reclaimed".to_string()),
                        actor: Some(cfg.actor.clone()),
                        ..Default::default()
                    },
                    |t| {
                        t.lease = None;
                        t.metadata.session_id = None;
                    },
                );
                match result {
                    Ok(_) => stats.tasks_requeued += 1,
                    Err(e) => warn!(task = %task.id, error = %e, "stale-session reclaim failed"),
                }
                expire_artifact(deps.store, &task.id);
            }
        }
    }
}

fn read_recovery_outcome(store: &TaskStore, id: &TaskId) -> Option<aof_core::RunResult> {
    let dir = store.task_dir(id).ok()?;
    read_run_result(&dir).ok().flatten()
}

fn expire_artifact(store: &TaskStore, id: &TaskId) {
    if let Ok(dir) = store.task_dir(id) {
        if let Err(e) = expire_run_result(&dir) {
            warn!(task = %id, error = %e, "failed to expire run result artifact");
        }
    }
}

// ── Pass 4: promotion ───────────────────────────────────────────────────────

fn promote_ready(deps: &PollDeps<'_>, cfg: &PollConfig, snapshot: &[Task], stats: &mut PollStats) {
    let eligible: Vec<Task> = if cfg.dry_run {
        compute_ready_from(snapshot)
    } else {
        deps.store.compute_ready_tasks().unwrap_or_default()
    };

    for task in eligible {
        plan(stats, SchedulerAction::Promote {
            task_id: task.id.clone(),
        });
        if cfg.dry_run {
            stats.tasks_promoted += 1;
            continue;
        }
        let result = deps.store.transition(
            &task.id,
            TaskStatus::Ready,
            TransitionOpts {
                reason: Some("dependencies met".to_string()),
                actor: Some(cfg.actor.clone()),
                ..Default::default()
            },
        );
        match result {
            Ok(_) => stats.tasks_promoted += 1,
            Err(e) => warn!(task = %task.id, error = %e, "promotion failed"),
        }
    }
}

fn compute_ready_from(tasks: &[Task]) -> Vec<Task> {
    let done: std::collections::HashSet<&str> = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Done)
        .map(|t| t.id.as_str())
        .collect();
    tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Backlog)
        .filter(|t| t.depends_on.iter().all(|d| done.contains(d.as_str())))
        .cloned()
        .collect()
}

// ── Pass 5: blocked recovery ────────────────────────────────────────────────

fn is_spawn_failed(task: &Task) -> bool {
    task.metadata
        .block_reason
        .as_deref()
        .is_some_and(|r| r.starts_with("spawn_failed"))
}

fn recover_blocked(deps: &PollDeps<'_>, cfg: &PollConfig, snapshot: &[Task], stats: &mut PollStats) {
    let now = deps.store.clock().now();

    for task in snapshot {
        if task.status != TaskStatus::Blocked || !is_spawn_failed(task) {
            continue;
        }

        if task.metadata.retry_count >= cfg.limits.max_dispatch_retries
            || task.metadata.dispatch_failures >= cfg.limits.max_dispatch_retries
        {
            deadletter(deps, cfg, task, "max_dispatch_failures", stats);
            continue;
        }

        let elapsed_ms = task
            .metadata
            .last_blocked_at
            .map(|at| (now - at).num_milliseconds())
            .unwrap_or(i64::MAX);
        let retries_done = task.metadata.retry_count.saturating_sub(1);
        let wait_ms = match cfg.backoff_jitter {
            Some(jitter) => compute_retry_backoff_ms(retries_done, jitter),
            None => crate::dispatch::sample_retry_backoff_ms(retries_done),
        };
        if elapsed_ms < wait_ms {
            continue;
        }

        plan(stats, SchedulerAction::Requeue {
            task_id: task.id.clone(),
            reason: "spawn retry backoff elapsed".to_string(),
        });
        if cfg.dry_run {
            continue;
        }
        let result = deps.store.transition(
            &task.id,
            TaskStatus::Ready,
            TransitionOpts {
                reason: Some("spawn retry backoff elapsed".to_string()),
                actor: Some(cfg.actor.clone()),
                ..Default::default()
            },
        );
        match result {
            Ok(_) => stats.tasks_requeued += 1,
            Err(e) => warn!(task = %task.id, error = %e, "blocked recovery failed"),
        }
    }
}

fn deadletter(
    deps: &PollDeps<'_>,
    cfg: &PollConfig,
    task: &Task,
    reason: &str,
    stats: &mut PollStats,
) {
    plan(stats, SchedulerAction::Deadletter {
        task_id: task.id.clone(),
        reason: reason.to_string(),
    });
    let message = format!(
        "task {} deadlettered after {} spawn failures (last: {}); inspect the record under tasks/deadletter/ and `aof task update` to requeue",
        task.id,
        task.metadata.dispatch_failures.max(task.metadata.retry_count),
        task.metadata.block_reason.as_deref().unwrap_or("unknown")
    );
    plan(stats, SchedulerAction::Alert {
        task_id: Some(task.id.clone()),
        message: message.clone(),
    });
    if cfg.dry_run {
        return;
    }

    let now = deps.store.clock().now();
    let result = deps.store.transition(
        &task.id,
        TaskStatus::Deadletter,
        TransitionOpts {
            reason: Some(reason.to_string()),
            actor: Some(cfg.actor.clone()),
            ..Default::default()
        },
    );
    match result {
        Ok(updated) => {
            deps.store.logger().emit(
                EventRecord::new(EventKind::TaskDeadletter, &cfg.actor, now)
                    .with_task(task.id.clone())
                    .with_payload(json!({
                        "reason": reason,
                        "failureCount": task.metadata.dispatch_failures.max(task.metadata.retry_count),
                        "lastFailureReason": &task.metadata.block_reason,
                    })),
            );
            error!(task = %task.id, reason, "task deadlettered; operator attention required");
            if let Some(metrics) = deps.metrics {
                metrics.inc(names::DEADLETTERS_TOTAL, &[]);
            }
            deps.murmur
                .observe_terminal(&updated, TaskStatus::Deadletter, deps.org, deps.store);
        }
        Err(e) => warn!(task = %task.id, error = %e, "deadletter transition failed"),
    }
}

// ── Pass 6: dispatch ────────────────────────────────────────────────────────

async fn dispatch_ready(
    deps: &PollDeps<'_>,
    cfg: &PollConfig,
    snapshot: &[Task],
    stats: &mut PollStats,
) {
    let store = deps.store;
    let fresh: Vec<Task> = if cfg.dry_run {
        // Fold the promotions planned earlier into the snapshot view.
        let promoted: std::collections::HashSet<&TaskId> = stats
            .actions
            .iter()
            .filter_map(|a| match a {
                SchedulerAction::Promote { task_id } => Some(task_id),
                _ => None,
            })
            .collect();
        snapshot
            .iter()
            .map(|t| {
                let mut t = t.clone();
                if promoted.contains(&t.id) {
                    t.status = TaskStatus::Ready;
                }
                t
            })
            .collect()
    } else {
        store.list().unwrap_or_default()
    };

    // Tasks this same poll just requeued (expiry, stale reclaim, backoff)
    // cool down until the next cycle.
    let requeued: std::collections::HashSet<TaskId> = stats
        .actions
        .iter()
        .filter_map(|a| match a {
            SchedulerAction::Requeue { task_id, .. }
            | SchedulerAction::ExpireLease { task_id, .. }
            | SchedulerAction::StaleHeartbeat { task_id, .. } => Some(task_id.clone()),
            _ => None,
        })
        .collect();

    let mut in_progress = fresh
        .iter()
        .filter(|t| t.status == TaskStatus::InProgress)
        .count();
    let mut candidates: Vec<&Task> = fresh
        .iter()
        .filter(|t| t.status == TaskStatus::Ready)
        .filter(|t| !requeued.contains(&t.id))
        .collect();
    candidates.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| a.id.as_str().cmp(b.id.as_str()))
    });

    let mut dispatched_this_poll = 0usize;
    let lease_manager = LeaseManager::new(store).with_ttl_ms(cfg.lease_ttl_ms);

    for task in candidates {
        if dispatched_this_poll >= cfg.limits.max_dispatches_per_poll {
            break;
        }
        if in_progress >= cfg.limits.max_concurrent_dispatches {
            break;
        }
        let now = store.clock().now();
        if !deps
            .throttle
            .global_interval_ok(now, cfg.limits.min_dispatch_interval_ms)
        {
            break;
        }

        let Some(agent) = resolve_agent(task, deps.org) else {
            store.logger().emit(
                EventRecord::new(EventKind::DispatchUnassigned, &cfg.actor, now)
                    .with_task(task.id.clone())
                    .with_payload(json!({"routing": &task.routing})),
            );
            continue;
        };

        // Per-team throttles.
        let team = team_limits(&agent, deps.org);
        if let Some((team_id, limits)) = &team {
            if let Some(max) = limits.max_concurrent {
                let team_in_progress = fresh
                    .iter()
                    .filter(|t| t.status == TaskStatus::InProgress)
                    .filter(|t| {
                        MurmurManager::team_for_task(t, deps.org)
                            .is_some_and(|tm| tm.id.as_str() == *team_id)
                    })
                    .count();
                if team_in_progress >= max {
                    continue;
                }
            }
            if let Some(interval) = limits.min_interval_ms {
                if !deps.throttle.team_interval_ok(team_id, now, interval) {
                    continue;
                }
            }
        }

        plan(stats, SchedulerAction::Assign {
            task_id: task.id.clone(),
            agent: agent.clone(),
        });
        dispatched_this_poll += 1;
        if cfg.dry_run {
            in_progress += 1;
            continue;
        }

        match spawn_and_lease(deps, cfg, &lease_manager, task, &agent, stats).await {
            Ok(()) => {
                stats.actions_executed += 1;
                in_progress += 1;
                deps.throttle
                    .record_dispatch(team.as_ref().map(|(id, _)| *id), store.clock().now());
                if let Some(metrics) = deps.metrics {
                    metrics.inc(names::DISPATCHES_TOTAL, &[("agent", agent.as_str())]);
                }
            }
            Err(class) => {
                stats.actions_failed += 1;
                if class == SpawnErrorClass::Permanent {
                    // The task just moved to blocked; deadletter it now.
                    if let Ok(blocked) = store.get(&task.id) {
                        deadletter(deps, cfg, &blocked, "permanent_spawn_failure", stats);
                    }
                }
            }
        }
    }
}

/// Read the task file, spawn a session, and take the lease on success.
///
/// On failure the task is moved to `blocked` with the classified reason
/// (recorded as a `block` action) and the class is returned for the
/// caller's bookkeeping.
async fn spawn_and_lease(
    deps: &PollDeps<'_>,
    cfg: &PollConfig,
    lease_manager: &LeaseManager<'_>,
    task: &Task,
    agent: &AgentId,
    stats: &mut PollStats,
) -> Result<(), SpawnErrorClass> {
    let store = deps.store;
    let now = store.clock().now();

    // Read the pre-serialized record once, before any state change.
    let task_path = store.record_path_of(task);
    let task_file_contents = std::fs::read_to_string(&task_path).unwrap_or_default();

    let gate_context = task.gate.as_ref().and_then(|gate_state| {
        let workflow = deps.manifest.workflow.as_ref()?;
        let gate = workflow.gate(&gate_state.current)?;
        Some(build_gate_context(task, gate, workflow))
    });

    store.logger().emit(
        EventRecord::new(EventKind::ActionStarted, &cfg.actor, now)
            .with_task(task.id.clone())
            .with_payload(json!({"agent": agent, "action": "assign"})),
    );

    let ctx = SpawnContext {
        task_id: task.id.clone(),
        task_path,
        task_file_contents,
        agent: agent.clone(),
        priority: task.priority,
        routing: task.routing.clone(),
        thinking: None,
        project_id: Some(deps.manifest.id.clone()),
        project_root: Some(store.root().to_path_buf()),
        gate_context,
        timeout_ms: cfg.spawn_timeout_ms,
    };

    let spawn = deps.executor.spawn_session(ctx);
    let result = match cfg.spawn_timeout_ms {
        Some(timeout_ms) => {
            match tokio::time::timeout(std::time::Duration::from_millis(timeout_ms), spawn).await {
                Ok(result) => result,
                Err(_) => aof_adapters::executor::SpawnResult::failed(format!(
                    "spawn timeout after {timeout_ms}ms"
                )),
            }
        }
        None => spawn.await,
    };

    if result.success {
        let session_id = result.session_id.clone();
        match lease_manager.acquire(&task.id, agent, None) {
            Ok(_) => {
                let update = store.update(&task.id, |t| {
                    t.metadata.session_id = session_id.clone();
                    if t.metadata.correlation_id.is_none() {
                        t.metadata.correlation_id = Some(aof_core::id::new_correlation_id());
                    }
                });
                if let Err(e) = update {
                    warn!(task = %task.id, error = %e, "failed to record session id");
                }
                let now = store.clock().now();
                store.logger().emit(
                    EventRecord::new(EventKind::DispatchMatched, &cfg.actor, now)
                        .with_task(task.id.clone())
                        .with_payload(json!({"agent": agent, "sessionId": session_id})),
                );
                store.logger().emit(
                    EventRecord::new(EventKind::ActionCompleted, &cfg.actor, now)
                        .with_task(task.id.clone())
                        .with_payload(json!({"success": true, "agent": agent})),
                );
                info!(task = %task.id, agent = %agent, "dispatched");
                Ok(())
            }
            Err(e) => {
                // Spawned but could not claim: classify as transient so the
                // next poll reconsiders.
                warn!(task = %task.id, error = %e, "spawn succeeded but lease acquisition failed");
                fail_dispatch(
                    deps,
                    cfg,
                    task,
                    agent,
                    "lease acquisition failed",
                    SpawnErrorClass::Transient,
                    stats,
                )
            }
        }
    } else {
        let message = result
            .error
            .unwrap_or_else(|| "spawn failed with no error".to_string());
        let class = classify_spawn_error(&message);
        fail_dispatch(deps, cfg, task, agent, &message, class, stats)
    }
}

fn fail_dispatch(
    deps: &PollDeps<'_>,
    cfg: &PollConfig,
    task: &Task,
    agent: &AgentId,
    message: &str,
    class: SpawnErrorClass,
    stats: &mut PollStats,
) -> Result<(), SpawnErrorClass> {
    let store = deps.store;
    let now = store.clock().now();
    let reason = format!("spawn_failed: {message}");

    // Permanent failures deadletter right after this; the block action is
    // the operator-visible record for the retryable classes.
    if class != SpawnErrorClass::Permanent {
        plan(stats, SchedulerAction::Block {
            task_id: task.id.clone(),
            reason: reason.clone(),
        });
    }

    let result = store.transition_and_update(
        &task.id,
        TaskStatus::Blocked,
        TransitionOpts {
            reason: Some(reason.clone()),
            actor: Some(cfg.actor.clone()),
            ..Default::default()
        },
        |t| {
            t.metadata.retry_count += 1;
            t.metadata.dispatch_failures += 1;
            t.metadata.error_class = Some(class.to_string());
            t.lease = None;
        },
    );
    if let Err(e) = result {
        warn!(task = %task.id, error = %e, "failed to block task after spawn failure");
    }

    store.logger().emit(
        EventRecord::new(EventKind::ActionCompleted, &cfg.actor, now)
            .with_task(task.id.clone())
            .with_payload(json!({
                "success": false,
                "agent": agent,
                "error": message,
                "errorClass": class,
            })),
    );
    warn!(task = %task.id, agent = %agent, error_class = %class, message, "spawn failed");
    Err(class)
}

// ── Pass 7: cascade ─────────────────────────────────────────────────────────

fn cascade_dependents(deps: &PollDeps<'_>, cfg: &PollConfig, stats: &mut PollStats) {
    if cfg.dry_run {
        return;
    }
    // Anything that reached `done` during this poll may have unblocked
    // dependents; promote them in the same cycle.
    let newly_ready = deps.store.compute_ready_tasks().unwrap_or_default();
    for task in newly_ready {
        plan(stats, SchedulerAction::Promote {
            task_id: task.id.clone(),
        });
        let result = deps.store.transition(
            &task.id,
            TaskStatus::Ready,
            TransitionOpts {
                reason: Some("dependency cascade".to_string()),
                actor: Some(cfg.actor.clone()),
                ..Default::default()
            },
        );
        match result {
            Ok(_) => stats.tasks_promoted += 1,
            Err(e) => warn!(task = %task.id, error = %e, "cascade promotion failed"),
        }
    }
}

// ── Pass 8: SLA ─────────────────────────────────────────────────────────────

fn check_sla(deps: &PollDeps<'_>, cfg: &PollConfig, stats: &mut PollStats) {
    if cfg.dry_run {
        return;
    }
    let tasks = deps.store.list().unwrap_or_default();
    let violations = deps.sla.check(
        &tasks,
        &deps.manifest.sla,
        deps.org,
        deps.store.clock(),
    );
    let now = deps.store.clock().now();
    for violation in violations {
        plan(stats, SchedulerAction::SlaViolation {
            task_id: violation.task_id.clone(),
            duration_ms: violation.duration_ms,
            limit_ms: violation.limit_ms,
        });
        deps.store.logger().emit(
            EventRecord::new(EventKind::SlaViolation, &cfg.actor, now)
                .with_task(violation.task_id.clone())
                .with_payload(json!({
                    "durationMs": violation.duration_ms,
                    "limitMs": violation.limit_ms,
                })),
        );
        warn!(
            task = %violation.task_id,
            duration_ms = violation.duration_ms,
            limit_ms = violation.limit_ms,
            "SLA violation; consider reassigning or splitting the task"
        );
        if let Some(metrics) = deps.metrics {
            metrics.inc(names::SLA_VIOLATIONS_TOTAL, &[]);
        }
    }
}

// ── Pass 9: murmur ──────────────────────────────────────────────────────────

fn run_murmur(deps: &PollDeps<'_>, cfg: &PollConfig, stats: &mut PollStats) {
    let tasks = deps.store.list().unwrap_or_default();
    let report = deps
        .murmur
        .run_pass(deps.store, deps.org, &tasks, cfg.dry_run);
    stats.reviews_skipped += report.reviews_skipped;
    for (team, task_id, trigger) in report.created {
        plan(stats, SchedulerAction::MurmurCreateTask {
            team,
            task_id,
            trigger,
        });
        if let Some(metrics) = deps.metrics {
            metrics.inc(names::MURMUR_REVIEWS_TOTAL, &[]);
        }
    }
}

// ── Pass 10: summary ────────────────────────────────────────────────────────

fn finish(deps: &PollDeps<'_>, cfg: &PollConfig, stats: &mut PollStats) {
    let now = deps.store.clock().now();
    let payload = json!({
        "actionsPlanned": stats.actions_planned,
        "actionsExecuted": stats.actions_executed,
        "actionsFailed": stats.actions_failed,
        "leasesExpired": stats.leases_expired,
        "tasksRequeued": stats.tasks_requeued,
        "tasksPromoted": stats.tasks_promoted,
        "reviewsSkipped": stats.reviews_skipped,
        "dryRun": cfg.dry_run,
        "actions": &stats.actions,
    });
    deps.store.logger().emit(
        EventRecord::new(EventKind::SchedulerPoll, &cfg.actor, now).with_payload(payload),
    );

    if let Some(metrics) = deps.metrics {
        metrics.inc(names::POLLS_TOTAL, &[]);
        metrics.add(
            names::ACTIONS_EXECUTED_TOTAL,
            &[],
            stats.actions_executed as u64,
        );
        metrics.add(names::ACTIONS_FAILED_TOTAL, &[], stats.actions_failed as u64);
        if let Ok(counts) = deps.store.count_by_status() {
            for (status, count) in counts {
                metrics.set_gauge(
                    names::TASKS_BY_STATUS,
                    &[("status", status.dir_name())],
                    count as f64,
                );
            }
        }
    }
    info!(
        planned = stats.actions_planned,
        executed = stats.actions_executed,
        failed = stats.actions_failed,
        promoted = stats.tasks_promoted,
        requeued = stats.tasks_requeued,
        dry_run = cfg.dry_run,
        "scheduler poll complete"
    );
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
