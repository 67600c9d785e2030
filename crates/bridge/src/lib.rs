// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lookout: a local bridge between a browser extension capturing page
//! telemetry and an AI-assisted consumer querying it through tools.

pub mod capture;
pub mod config;
pub mod error;
pub mod state;
pub mod tickers;
pub mod tools;
pub mod transport;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::BridgeConfig;
use crate::state::BridgeState;
use crate::tickers::{spawn_memory_sweeper, spawn_query_reaper};
use crate::transport::build_router;

/// Run the bridge until shutdown.
pub async fn run(config: BridgeConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let shutdown = CancellationToken::new();

    let state = Arc::new(BridgeState::new(config, shutdown.clone()));

    spawn_memory_sweeper(Arc::clone(&state));
    spawn_query_reaper(Arc::clone(&state));

    // Ctrl-C triggers graceful shutdown; background tickers observe the
    // same token.
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                shutdown.cancel();
            }
        });
    }

    tracing::info!("lookout bridge listening on {addr}");
    let router = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, router).with_graceful_shutdown(shutdown.cancelled_owned()).await?;

    Ok(())
}
