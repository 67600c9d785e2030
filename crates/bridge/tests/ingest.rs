// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Integration tests for the ingest HTTP surface.
//!
//! Uses `axum_test::TestServer` — no real TCP needed.

use std::sync::Arc;

use axum_test::TestServer;
use tokio_util::sync::CancellationToken;

use lookout_bridge::capture::memory::{CRITICAL_LIMIT, HARD_LIMIT};
use lookout_bridge::config::BridgeConfig;
use lookout_bridge::state::BridgeState;
use lookout_bridge::transport::build_router;

fn test_config() -> BridgeConfig {
    BridgeConfig {
        host: "127.0.0.1".into(),
        port: 0,
        log_capacity: 100,
        network_capacity: 50,
        ws_capacity: 50,
        action_capacity: 50,
        perf_capacity: 20,
        buffer_ttl_secs: 0,
        max_pending: 8,
        query_timeout_ms: 10_000,
        admission_limit: 1000,
        memory_check_ms: 10_000,
        reaper_ms: 1000,
        max_connections: 10,
        max_closed_connections: 5,
        allow_pilot: false,
        log_file: None,
        log_rotate_mb: 10,
    }
}

fn test_state() -> Arc<BridgeState> {
    Arc::new(BridgeState::new(test_config(), CancellationToken::new()))
}

fn test_server(state: Arc<BridgeState>) -> TestServer {
    TestServer::new(build_router(state)).expect("failed to create test server")
}

fn log_entries(count: usize) -> serde_json::Value {
    let entries: Vec<serde_json::Value> = (0..count)
        .map(|i| serde_json::json!({"level": "info", "message": format!("entry {i}")}))
        .collect();
    serde_json::json!({ "entries": entries })
}

#[tokio::test]
async fn health_reports_running() {
    let server = test_server(test_state());
    let resp = server.get("/health").await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["status"], "running");
}

#[tokio::test]
async fn logs_ingest_updates_diagnostics() {
    let server = test_server(test_state());
    let resp = server.post("/logs").json(&log_entries(3)).await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["added"], 3);

    let diag: serde_json::Value = server.get("/diagnostics").await.json();
    assert_eq!(diag["buffers"]["logs"], 3);
    assert_eq!(diag["circuit"]["open"], false);
    assert_eq!(diag["extension"]["polling"], false);
}

#[tokio::test]
async fn malformed_json_returns_400_with_error_body() {
    let server = test_server(test_state());
    let resp = server.post("/logs").text("{not json").await;
    resp.assert_status(axum::http::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["error"], "invalid_json");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn wrong_method_returns_405() {
    let server = test_server(test_state());
    let resp = server.get("/logs").await;
    resp.assert_status(axum::http::StatusCode::METHOD_NOT_ALLOWED);
}

// S1: a flood within one second trips admission; the next post is 429.
#[tokio::test]
async fn admission_rejects_flood() {
    let server = test_server(test_state());
    for _ in 0..10 {
        server.post("/logs").json(&log_entries(100)).await.assert_status_ok();
    }
    // 1000 events are in this second's window; the next batch tips it over.
    let over = server.post("/logs").json(&log_entries(100)).await;
    over.assert_status(axum::http::StatusCode::TOO_MANY_REQUESTS);

    let resp = server
        .post("/websocket-events")
        .json(&serde_json::json!({"events": [{"event": "message"}]}))
        .await;
    resp.assert_status(axum::http::StatusCode::TOO_MANY_REQUESTS);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["error"], "rate_limited");
    assert_eq!(body["retryable"], true);
}

// S2: memory over the hard limit rejects ingestion with 503.
#[tokio::test]
async fn memory_exceeded_returns_503() {
    let state = test_state();
    state.capture.write().await.memory.simulated_memory = HARD_LIMIT + 1;

    let server = test_server(Arc::clone(&state));
    let resp = server
        .post("/network-bodies")
        .json(&serde_json::json!({"bodies": [{"url": "https://x.test", "method": "GET"}]}))
        .await;
    resp.assert_status(axum::http::StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["error"], "memory_exceeded");

    // Nothing was appended.
    assert_eq!(state.capture.read().await.network.len(), 0);
}

// S3: password redaction end to end.
#[tokio::test]
async fn password_redaction_end_to_end() {
    let state = test_state();
    let server = test_server(Arc::clone(&state));
    let resp = server
        .post("/enhanced-actions")
        .json(&serde_json::json!({
            "actions": [{
                "type": "input",
                "inputType": "password",
                "value": "mysecret",
                "timestamp": 1,
            }]
        }))
        .await;
    resp.assert_status_ok();

    let tool: serde_json::Value = server
        .post("/tools/call")
        .json(&serde_json::json!({"name": "observe", "arguments": {"what": "actions"}}))
        .await
        .json();
    let text = tool["content"][0]["text"].as_str().expect("text block");
    let payload: serde_json::Value = serde_json::from_str(text).expect("payload json");
    assert_eq!(payload["actions"][0]["value"], "[redacted]");
    assert!(!text.contains("mysecret"));
}

// S6: critical memory pressure clears the governed buffers and turns on
// minimal mode.
#[tokio::test]
async fn critical_eviction_clears_buffers() {
    let state = test_state();
    let server = test_server(Arc::clone(&state));

    server.post("/logs").json(&log_entries(5)).await.assert_status_ok();
    server
        .post("/network-bodies")
        .json(&serde_json::json!({"bodies": [
            {"url": "https://x.test/a", "method": "GET", "responseBody": "aaaa"},
        ]}))
        .await
        .assert_status_ok();
    server
        .post("/websocket-events")
        .json(&serde_json::json!({"events": [
            {"event": "open", "connectionId": "c1", "url": "wss://x.test"},
        ]}))
        .await
        .assert_status_ok();
    server
        .post("/enhanced-actions")
        .json(&serde_json::json!({"actions": [{"type": "click"}]}))
        .await
        .assert_status_ok();

    let evictions_before = state.capture.read().await.memory.total_evictions;
    state.capture.write().await.memory.simulated_memory = CRITICAL_LIMIT + 1;

    let resp = server
        .post("/websocket-events")
        .json(&serde_json::json!({"events": [{"event": "message", "connectionId": "c1"}]}))
        .await;
    resp.assert_status(axum::http::StatusCode::SERVICE_UNAVAILABLE);

    let capture = state.capture.read().await;
    assert!(capture.memory.minimal_mode);
    assert_eq!(capture.network.len(), 0);
    assert!(capture.ws_events.len() <= 1);
    assert_eq!(capture.actions.len(), 0);
    assert_eq!(capture.memory.total_evictions, evictions_before + 1);
    // Console logs are not governed; they survive.
    assert_eq!(capture.logs.len(), 5);
}

#[tokio::test]
async fn network_bodies_are_truncated_and_flagged() {
    let state = test_state();
    let server = test_server(Arc::clone(&state));
    let resp = server
        .post("/network-bodies")
        .json(&serde_json::json!({"bodies": [{
            "url": "https://x.test/big",
            "method": "POST",
            "requestBody": "q".repeat(9 * 1024),
            "responseBody": "r".repeat(20 * 1024),
        }]}))
        .await;
    resp.assert_status_ok();

    let capture = state.capture.read().await;
    let rows = capture.network.rows(0);
    assert!(rows[0].record.request_truncated);
    assert!(rows[0].record.response_truncated);
    assert_eq!(rows[0].record.request_body.as_ref().map(String::len), Some(8 * 1024));
    assert_eq!(rows[0].record.response_body.as_ref().map(String::len), Some(16 * 1024));
}

#[tokio::test]
async fn websocket_events_drive_connection_tracking() {
    let state = test_state();
    let server = test_server(Arc::clone(&state));
    server
        .post("/websocket-events")
        .json(&serde_json::json!({"events": [
            {"event": "open", "connectionId": "c1", "url": "wss://x.test/live"},
            {"event": "message", "connectionId": "c1", "direction": "incoming", "size": 12},
            {"event": "close", "connectionId": "c1", "code": 1000},
        ]}))
        .await
        .assert_status_ok();

    let capture = state.capture.read().await;
    assert_eq!(capture.connections.active_count(), 0);
    assert_eq!(capture.connections.closed_count(), 1);
    assert_eq!(capture.ws_events.len(), 3);
}

#[tokio::test]
async fn pending_queries_poll_marks_extension_live() {
    let state = test_state();
    let server = test_server(Arc::clone(&state));
    let resp = server.get("/pending-queries").await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["queries"].as_array().map(Vec::len), Some(0));

    let diag: serde_json::Value = server.get("/diagnostics").await.json();
    assert_eq!(diag["extension"]["polling"], true);
}

#[tokio::test]
async fn query_result_for_unknown_id_is_404() {
    let server = test_server(test_state());
    let resp = server
        .post("/query-result")
        .json(&serde_json::json!({"id": "nope", "result": {"ok": true}}))
        .await;
    resp.assert_status(axum::http::StatusCode::NOT_FOUND);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["error"], "unknown_id");
}

#[tokio::test]
async fn clear_empties_all_buffers() {
    let state = test_state();
    let server = test_server(Arc::clone(&state));
    server.post("/logs").json(&log_entries(4)).await.assert_status_ok();
    server
        .post("/enhanced-actions")
        .json(&serde_json::json!({"actions": [{"type": "click"}]}))
        .await
        .assert_status_ok();

    let resp = server.post("/clear").await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["cleared"], 5);

    let diag: serde_json::Value = server.get("/diagnostics").await.json();
    assert_eq!(diag["buffers"]["logs"], 0);
    assert_eq!(diag["buffers"]["actions"], 0);
}

#[tokio::test]
async fn test_boundary_stamps_log_entries() {
    let state = test_state();
    let server = test_server(Arc::clone(&state));
    server
        .post("/test-boundary")
        .json(&serde_json::json!({"test_id": "login-flow", "action": "start"}))
        .await
        .assert_status_ok();
    server.post("/logs").json(&log_entries(1)).await.assert_status_ok();
    server
        .post("/test-boundary")
        .json(&serde_json::json!({"test_id": "login-flow", "action": "end"}))
        .await
        .assert_status_ok();
    server.post("/logs").json(&log_entries(1)).await.assert_status_ok();

    let capture = state.capture.read().await;
    let rows = capture.logs.rows(0);
    assert_eq!(rows[0].record.test_id.as_deref(), Some("login-flow"));
    assert!(rows[1].record.test_id.is_none());
}

#[tokio::test]
async fn test_boundary_rejects_unknown_action() {
    let server = test_server(test_state());
    let resp = server
        .post("/test-boundary")
        .json(&serde_json::json!({"test_id": "x", "action": "pause"}))
        .await;
    resp.assert_status(axum::http::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["error"], "invalid_param");
}

#[tokio::test]
async fn performance_snapshots_build_baselines() {
    let state = test_state();
    let server = test_server(Arc::clone(&state));
    for lcp in [1200.0, 1800.0] {
        server
            .post("/performance-snapshots")
            .json(&serde_json::json!({"snapshots": [{
                "url": "https://app.test/",
                "metrics": {"lcp": lcp},
            }]}))
            .await
            .assert_status_ok();
    }
    let capture = state.capture.read().await;
    let baseline = capture.baselines.get("https://app.test/").expect("baseline");
    assert_eq!(baseline.samples, 2);
    assert!((baseline.means["lcp"] - 1500.0).abs() < 1e-9);
}
