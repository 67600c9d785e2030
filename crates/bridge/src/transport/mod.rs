// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP surface: extension-facing ingest endpoints plus the consumer tool
//! endpoint. Wrong-method requests get 405 from the router itself.

pub mod ingest;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::BridgeState;

/// Build the axum `Router` with all bridge routes.
pub fn build_router(state: Arc<BridgeState>) -> Router {
    Router::new()
        // Liveness
        .route("/health", get(ingest::health))
        .route("/diagnostics", get(ingest::diagnostics))
        // Telemetry ingest
        .route("/logs", post(ingest::post_logs))
        .route("/network-bodies", post(ingest::post_network_bodies))
        .route("/websocket-events", post(ingest::post_websocket_events))
        .route("/enhanced-actions", post(ingest::post_enhanced_actions))
        .route("/performance-snapshots", post(ingest::post_performance_snapshots))
        // Reverse-command rendezvous
        .route("/pending-queries", get(ingest::get_pending_queries))
        .route("/dom-result", post(ingest::post_query_result))
        .route("/a11y-result", post(ingest::post_query_result))
        .route("/query-result", post(ingest::post_query_result))
        // Session management
        .route("/clear", post(ingest::post_clear))
        .route("/test-boundary", post(ingest::post_test_boundary))
        // Consumer tool surface
        .route("/tools/call", post(ingest::post_tool_call))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
