// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Extension-facing HTTP handlers.
//!
//! Every ingest endpoint follows the same admission path: malformed JSON is
//! 400, admission denial is 429, memory pressure is 503. Successful bodies
//! report how many records were appended.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::capture::event::{
    LogEntry, NetworkBody, PerformanceSnapshot, UserAction, WebSocketEvent,
};
use crate::capture::CommandRecord;
use crate::error::ErrorCode;
use crate::state::{epoch_ms, rfc3339_ms, BridgeState};
use crate::tools;

// -- Request/Response types ---------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct LogsRequest {
    #[serde(default)]
    pub entries: Vec<LogEntry>,
}

#[derive(Debug, Deserialize)]
pub struct NetworkBodiesRequest {
    #[serde(default)]
    pub bodies: Vec<NetworkBody>,
}

#[derive(Debug, Deserialize)]
pub struct WebSocketEventsRequest {
    #[serde(default)]
    pub events: Vec<WebSocketEvent>,
}

#[derive(Debug, Deserialize)]
pub struct ActionsRequest {
    #[serde(default)]
    pub actions: Vec<UserAction>,
}

#[derive(Debug, Deserialize)]
pub struct SnapshotsRequest {
    #[serde(default)]
    pub snapshots: Vec<PerformanceSnapshot>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub added: usize,
}

#[derive(Debug, Deserialize)]
pub struct QueryResultRequest {
    pub id: String,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TestBoundaryRequest {
    #[serde(alias = "testId")]
    pub test_id: String,
    pub action: String,
}

#[derive(Debug, Deserialize)]
pub struct ToolCallRequest {
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_seconds: u64,
}

// -- Helpers ------------------------------------------------------------------

fn invalid_json(rejection: JsonRejection) -> Response {
    ErrorCode::InvalidJson
        .to_http_response(format!("request body is not valid JSON: {rejection}"))
        .into_response()
}

/// Shared admission + append path for all telemetry endpoints.
macro_rules! ingest_endpoint {
    ($fn_name:ident, $req:ty, $field:ident, $add:ident) => {
        pub async fn $fn_name(
            State(s): State<Arc<BridgeState>>,
            payload: Result<Json<$req>, JsonRejection>,
        ) -> Response {
            let Json(req) = match payload {
                Ok(p) => p,
                Err(e) => return invalid_json(e),
            };
            let now = epoch_ms();
            let mut capture = s.capture.write().await;
            if let Err(err) = capture.admit(req.$field.len() as u32, now) {
                return err.code.to_http_response(err.message).into_response();
            }
            let added = capture.$add(req.$field, now);
            Json(IngestResponse { added }).into_response()
        }
    };
}

ingest_endpoint!(post_logs, LogsRequest, entries, add_logs);
ingest_endpoint!(post_network_bodies, NetworkBodiesRequest, bodies, add_network_bodies);
ingest_endpoint!(post_websocket_events, WebSocketEventsRequest, events, add_ws_events);
ingest_endpoint!(post_enhanced_actions, ActionsRequest, actions, add_actions);
ingest_endpoint!(post_performance_snapshots, SnapshotsRequest, snapshots, add_snapshots);

// -- Handlers -----------------------------------------------------------------

/// `GET /health`
pub async fn health(State(s): State<Arc<BridgeState>>) -> impl IntoResponse {
    Json(HealthResponse { status: "running".to_owned(), uptime_seconds: s.uptime_seconds() })
}

/// `GET /diagnostics` — operational snapshot for humans and dashboards.
pub async fn diagnostics(State(s): State<Arc<BridgeState>>) -> impl IntoResponse {
    let now = epoch_ms();
    let capture = s.capture.read().await;
    Json(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": s.uptime_seconds(),
        "buffers": {
            "logs": capture.logs.len(),
            "network_bodies": capture.network.len(),
            "websocket_events": capture.ws_events.len(),
            "actions": capture.actions.len(),
            "performance_snapshots": capture.snapshots.len(),
        },
        "circuit": {
            "open": capture.admission.circuit_open,
            "reason": capture.admission.circuit_reason,
        },
        "extension": {
            "polling": capture.extension_polling(now),
        },
        "memory": {
            "total": capture.total_memory(),
            "ws_memory_total": capture.memory.ws_memory_total,
            "nb_memory_total": capture.memory.nb_memory_total,
            "minimal_mode": capture.memory.minimal_mode,
            "total_evictions": capture.memory.total_evictions,
            "evicted_entries": capture.memory.evicted_entries,
        },
        "connections": {
            "active": capture.connections.active_count(),
            "closed": capture.connections.closed_count(),
        },
        "pending_queries": capture.pending.len(),
    }))
}

/// `GET /pending-queries` — extension poll for outstanding reverse commands.
pub async fn get_pending_queries(State(s): State<Arc<BridgeState>>) -> impl IntoResponse {
    let now = epoch_ms();
    let mut capture = s.capture.write().await;
    capture.last_poll_ms = Some(now);
    let queries = capture.pending.snapshot();
    Json(serde_json::json!({ "queries": queries }))
}

/// `POST /dom-result`, `/a11y-result`, `/query-result` — deliver a result by
/// id. The waiter (if still present) is woken; late results are kept for
/// `command_result` polling either way.
pub async fn post_query_result(
    State(s): State<Arc<BridgeState>>,
    payload: Result<Json<QueryResultRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(p) => p,
        Err(e) => return invalid_json(e),
    };
    let now = epoch_ms();
    let mut capture = s.capture.write().await;
    let Some((query, sender)) = capture.pending.take(&req.id) else {
        return ErrorCode::UnknownId
            .to_http_response(format!("no pending query with id {:?}", req.id))
            .into_response();
    };

    let outcome = match req.error {
        Some(message) => Err(message),
        None => Ok(req.result.unwrap_or(serde_json::Value::Null)),
    };

    let correlation_id = query.correlation_id.clone().unwrap_or_else(|| query.id.clone());
    capture.record_command_result(CommandRecord {
        correlation_id,
        action: query.kind.clone(),
        status: if outcome.is_ok() { "ok".into() } else { "error".into() },
        result: outcome.as_ref().ok().cloned(),
        error: outcome.as_ref().err().cloned(),
        elapsed_ms: now.saturating_sub(query.created_ms),
        completed_at: rfc3339_ms(now),
    });

    if let Some(tx) = sender {
        // Send fails only if the waiter timed out between take and send;
        // the command record above still makes the result pollable.
        let _ = tx.send(outcome);
    }
    Json(serde_json::json!({ "delivered": true })).into_response()
}

/// `POST /clear` — empty all buffers.
pub async fn post_clear(State(s): State<Arc<BridgeState>>) -> impl IntoResponse {
    let mut capture = s.capture.write().await;
    let cleared = capture.clear_all();
    tracing::info!(cleared, "buffers cleared");
    Json(serde_json::json!({ "cleared": cleared }))
}

/// `POST /test-boundary` — mark the active test.
pub async fn post_test_boundary(
    State(s): State<Arc<BridgeState>>,
    payload: Result<Json<TestBoundaryRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(p) => p,
        Err(e) => return invalid_json(e),
    };
    let mut capture = s.capture.write().await;
    match req.action.as_str() {
        "start" => {
            capture.active_test = Some(req.test_id.clone());
            Json(serde_json::json!({ "active_test": req.test_id })).into_response()
        }
        "end" => {
            capture.active_test = None;
            Json(serde_json::json!({ "active_test": null })).into_response()
        }
        other => ErrorCode::InvalidParam
            .to_http_response(format!("action must be start|end, got {other:?}"))
            .into_response(),
    }
}

/// `POST /tools/call` — consumer tool dispatch.
pub async fn post_tool_call(
    State(s): State<Arc<BridgeState>>,
    payload: Result<Json<ToolCallRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(p) => p,
        Err(e) => return invalid_json(e),
    };
    let response = tools::dispatch(&s, &req.name, req.arguments).await;
    Json(response).into_response()
}
