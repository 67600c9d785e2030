// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Instant;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::capture::CaptureState;
use crate::config::BridgeConfig;

/// Shared bridge state. One reader-writer lock guards all capture state;
/// handlers take the write lock for ingestion and the read lock for queries.
pub struct BridgeState {
    pub capture: RwLock<CaptureState>,
    pub config: BridgeConfig,
    pub shutdown: CancellationToken,
    pub started: Instant,
}

impl BridgeState {
    pub fn new(config: BridgeConfig, shutdown: CancellationToken) -> Self {
        let capture = CaptureState::new(&config, epoch_ms());
        Self { capture: RwLock::new(capture), config, shutdown, started: Instant::now() }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}

/// Return current epoch millis.
pub fn epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Epoch millis formatted as RFC3339 with millisecond precision.
pub fn rfc3339_ms(ms: u64) -> String {
    chrono::DateTime::from_timestamp_millis(ms as i64)
        .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
        .unwrap_or_default()
}

/// Parse an RFC3339 timestamp into epoch millis.
pub fn parse_rfc3339_ms(value: &str) -> Option<u64> {
    chrono::DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.timestamp_millis().max(0) as u64)
}
