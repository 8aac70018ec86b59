// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `aof metrics serve` - Prometheus exposition over HTTP.

use super::open_store;
use anyhow::{Context, Result};
use aof_engine::metrics::{names, Metrics};
use aof_storage::TaskStore;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use clap::{Args, Subcommand};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

#[derive(Args)]
pub struct MetricsArgs {
    #[command(subcommand)]
    pub command: MetricsCommand,
}

#[derive(Subcommand)]
pub enum MetricsCommand {
    /// Serve `/metrics` and `/health`
    Serve {
        /// Port to listen on
        #[arg(long)]
        port: u16,
    },
}

#[derive(Clone)]
struct AppState {
    store: TaskStore,
    metrics: Arc<Metrics>,
}

async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    // Refresh the status gauges on every scrape; counters accumulate from
    // whatever engine activity runs in this process.
    if let Ok(counts) = state.store.count_by_status() {
        for (status, count) in counts {
            state.metrics.set_gauge(
                names::TASKS_BY_STATUS,
                &[("status", status.dir_name())],
                count as f64,
            );
        }
    }
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.count_by_status() {
        Ok(counts) => {
            let total: usize = counts.values().sum();
            (
                StatusCode::OK,
                Json(serde_json::json!({"status": "ok", "tasks": total})),
            )
        }
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({"status": "degraded", "error": e.to_string()})),
        ),
    }
}

pub async fn run(root: &Path, args: MetricsArgs) -> Result<()> {
    let MetricsCommand::Serve { port } = args.command;

    let state = AppState {
        store: open_store(root),
        metrics: Arc::new(Metrics::new()),
    };
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;
    eprintln!("metrics listening on http://{addr}/metrics");
    axum::serve(listener, app)
        .await
        .context("metrics server failed")?;
    Ok(())
}
