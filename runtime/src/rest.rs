// Copyright 2026 Chargewatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP REST API for Chargewatch.
//!
//! Read access to the store plus an on-demand check. Handlers share the
//! scheduler's [`Checker`], so a manual check never overlaps a scheduled one.

use crate::check::Checker;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use anyhow::Context;
use axum::{Json, Router};
use chargewatch::{clamp_history_limit, Observation, Store, DEFAULT_HISTORY_LIMIT};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};

pub const SERVICE_NAME: &str = "Charger Status API";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub checker: Arc<Checker>,
}

impl AppState {
    pub fn new(checker: Arc<Checker>) -> Self {
        Self {
            store: checker.store().clone(),
            checker,
        }
    }
}

/// Any failure inside a handler. The detail is logged, never returned.
struct InternalError(String);

impl<E: std::fmt::Display> From<E> for InternalError {
    fn from(e: E) -> Self {
        Self(e.to_string())
    }
}

impl IntoResponse for InternalError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "error": "Internal server error" })),
        )
            .into_response()
    }
}

type ApiResult = Result<Response, InternalError>;

/// Build the axum Router with all REST endpoints.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/status", get(handle_status))
        .route("/api/history", get(handle_history))
        .route("/api/check", post(handle_check))
        .route("/api/health", get(health))
        .fallback(not_found)
        .layer(cors)
        .with_state(state)
}

/// Serve on `0.0.0.0:port` until `shutdown` carries `true`.
pub async fn start(port: u16, state: AppState, shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
    let listener = bind(port).await?;
    serve(listener, state, shutdown).await
}

/// Claim `0.0.0.0:port`. Callers bind before starting other work so a busy
/// port fails the process at startup.
pub async fn bind(port: u16) -> anyhow::Result<TcpListener> {
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind REST API on {addr}"))?;
    tracing::info!("REST API listening on http://{addr}");
    Ok(listener)
}

/// Serve on an already bound listener until `shutdown` carries `true`.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            while !*shutdown.borrow() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
        })
        .await?;
    tracing::info!("REST API stopped");
    Ok(())
}

fn row(observation: &Observation) -> Value {
    json!({
        "timestamp": observation.key(),
        "status": observation.status,
    })
}

async fn handle_status(State(state): State<AppState>) -> ApiResult {
    let resp = match state.store.latest()? {
        Some(observation) => Json(json!({ "success": true, "data": row(&observation) })).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "error": "No status data available" })),
        )
            .into_response(),
    };
    Ok(resp)
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    limit: Option<String>,
}

async fn handle_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> ApiResult {
    // Non-numeric limits fall back to the default.
    let requested = params
        .limit
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .unwrap_or(DEFAULT_HISTORY_LIMIT as i64);
    let rows = state.store.range(clamp_history_limit(requested))?;
    let data: Vec<Value> = rows.iter().map(row).collect();
    Ok(Json(json!({
        "success": true,
        "count": data.len(),
        "data": data,
    }))
    .into_response())
}

async fn handle_check(State(state): State<AppState>) -> ApiResult {
    let outcome = state.checker.check().await?;
    let status = outcome.status();
    Ok(Json(json!({
        "success": true,
        "status": status,
        "message": format!("Status check completed: {status}"),
    }))
    .into_response())
}

async fn health() -> Json<Value> {
    Json(json!({
        "success": true,
        "status": "healthy",
        "service": SERVICE_NAME,
    }))
}

async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "error": "Endpoint not found" })),
    )
        .into_response()
}
