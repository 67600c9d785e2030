// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background maintenance tasks: the memory sweep and the pending-query
//! reaper. Both run until the shutdown token fires; failures are logged and
//! never terminate the process.

use std::sync::Arc;

use crate::state::{epoch_ms, BridgeState};

/// Spawn the periodic memory-governor sweep.
pub fn spawn_memory_sweeper(state: Arc<BridgeState>) {
    let interval = state.config.memory_check_interval();

    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = state.shutdown.cancelled() => break,
                _ = timer.tick() => {}
            }

            let mut capture = state.capture.write().await;
            capture.enforce_memory(epoch_ms());
        }
    });
}

/// Spawn the pending-query timeout reaper. Dropping an expired query's
/// waker wakes its waiter immediately rather than letting it sleep out the
/// full timeout.
pub fn spawn_query_reaper(state: Arc<BridgeState>) {
    let interval = state.config.reaper_interval();

    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = state.shutdown.cancelled() => break,
                _ = timer.tick() => {}
            }

            let reaped = {
                let mut capture = state.capture.write().await;
                capture.pending.reap(epoch_ms())
            };
            if reaped > 0 {
                tracing::debug!(reaped, "expired pending queries reaped");
            }
        }
    });
}
