// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The capture façade: every buffer, gate, tracker, and rendezvous lives
//! behind this one state struct, mutated only under the bridge's write lock.

pub mod admission;
pub mod buffer;
pub mod checkpoint;
pub mod connections;
pub mod event;
pub mod memory;
pub mod pagination;
pub mod pending;

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::Serialize;

use crate::capture::admission::AdmissionGate;
use crate::capture::buffer::{EventBuffer, Row};
use crate::capture::checkpoint::{dedupe_and_rank, Checkpoint, CheckpointStore, SeverityFilter};
use crate::capture::connections::ConnectionTracker;
use crate::capture::event::{
    LogEntry, NetworkBody, PerformanceSnapshot, UserAction, WebSocketEvent,
};
use crate::capture::memory::{
    tier, MemoryState, Tier, HARD_DENOMINATOR, HARD_LIMIT, SOFT_DENOMINATOR, SOFT_LIMIT,
};
use crate::capture::pending::PendingQueryBus;
use crate::config::BridgeConfig;
use crate::error::{ErrorCode, ToolError};

/// Completed async command outcomes kept for `command_result` polling.
const MAX_COMMAND_RESULTS: usize = 50;

/// The extension counts as polling if it asked for work this recently.
pub const POLL_LIVENESS_MS: u64 = 10_000;

#[derive(Debug, Clone, Serialize)]
pub struct CommandRecord {
    pub correlation_id: String,
    pub action: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
    pub completed_at: String,
}

/// A compiled console noise-suppression rule.
#[derive(Debug)]
pub struct NoiseRule {
    pub pattern: String,
    regex: regex::Regex,
}

impl NoiseRule {
    pub fn compile(pattern: &str) -> Result<Self, ToolError> {
        let regex = regex::Regex::new(pattern).map_err(|e| {
            ErrorCode::InvalidParam.with_message(format!("invalid noise pattern: {e}"))
        })?;
        Ok(Self { pattern: pattern.to_owned(), regex })
    }

    pub fn matches(&self, message: &str) -> bool {
        self.regex.is_match(message)
    }
}

/// Incremental per-URL mean of every numeric performance metric.
#[derive(Debug, Default, Clone, Serialize)]
pub struct UrlBaseline {
    pub samples: u64,
    pub means: BTreeMap<String, f64>,
    #[serde(skip)]
    counts: BTreeMap<String, u64>,
}

impl UrlBaseline {
    fn observe(&mut self, metrics: &serde_json::Map<String, serde_json::Value>) {
        self.samples += 1;
        for (key, value) in metrics {
            let Some(v) = value.as_f64() else { continue };
            let count = self.counts.entry(key.clone()).or_insert(0);
            *count += 1;
            let mean = self.means.entry(key.clone()).or_insert(0.0);
            *mean += (v - *mean) / *count as f64;
        }
    }
}

pub struct CaptureState {
    pub logs: EventBuffer<LogEntry>,
    pub network: EventBuffer<NetworkBody>,
    pub ws_events: EventBuffer<WebSocketEvent>,
    pub actions: EventBuffer<UserAction>,
    pub snapshots: EventBuffer<PerformanceSnapshot>,
    pub baselines: BTreeMap<String, UrlBaseline>,
    pub memory: MemoryState,
    pub admission: AdmissionGate,
    pub connections: ConnectionTracker,
    pub pending: PendingQueryBus,
    pub checkpoints: CheckpointStore,
    pub command_results: IndexMap<String, CommandRecord>,
    pub noise_rules: Vec<NoiseRule>,
    pub active_test: Option<String>,
    pub last_poll_ms: Option<u64>,
    pub started_ms: u64,
}

impl CaptureState {
    pub fn new(config: &BridgeConfig, now_ms: u64) -> Self {
        let ttl = config.buffer_ttl_ms();
        Self {
            logs: EventBuffer::new(config.log_capacity, ttl),
            network: EventBuffer::new(config.network_capacity, ttl),
            ws_events: EventBuffer::new(config.ws_capacity, ttl),
            actions: EventBuffer::new(config.action_capacity, ttl),
            snapshots: EventBuffer::new(config.perf_capacity, ttl),
            baselines: BTreeMap::new(),
            memory: MemoryState::default(),
            admission: AdmissionGate::new(config.admission_limit),
            connections: ConnectionTracker::new(
                config.max_connections,
                config.max_closed_connections,
            ),
            pending: PendingQueryBus::new(config.max_pending),
            checkpoints: CheckpointStore::default(),
            command_results: IndexMap::new(),
            noise_rules: Vec::new(),
            active_test: None,
            last_poll_ms: None,
            started_ms: now_ms,
        }
    }

    pub fn total_memory(&self) -> usize {
        self.memory.total(self.actions.len())
    }

    /// Gate one ingest request carrying `count` records. Memory pressure is
    /// checked first (and given a chance to evict) so that memory refusals
    /// surface as 503 rather than 429.
    pub fn admit(&mut self, count: u32, now_ms: u64) -> Result<(), ToolError> {
        if self.total_memory() > HARD_LIMIT {
            self.enforce_memory(now_ms);
            if self.total_memory() > HARD_LIMIT {
                self.admission.open(now_ms, "memory_exceeded");
                return Err(ErrorCode::MemoryExceeded.with_message(format!(
                    "captured data exceeds the hard memory limit ({} bytes buffered)",
                    self.total_memory()
                )));
            }
        }
        let memory = self.total_memory();
        if !self.admission.record_and_recheck(count, now_ms, memory) {
            return Err(ErrorCode::RateLimited
                .with_message("ingest rate exceeds the admission threshold"));
        }
        Ok(())
    }

    // -- Ingestion -------------------------------------------------------------

    pub fn add_logs(&mut self, mut entries: Vec<LogEntry>, now_ms: u64) -> usize {
        if let Some(test) = &self.active_test {
            for entry in &mut entries {
                if entry.test_id.is_none() {
                    entry.test_id = Some(test.clone());
                }
            }
        }
        let n = entries.len();
        self.logs.add(entries, now_ms, self.memory.minimal_mode);
        self.enforce_memory(now_ms);
        n
    }

    pub fn add_network_bodies(&mut self, mut bodies: Vec<NetworkBody>, now_ms: u64) -> usize {
        for body in &mut bodies {
            body.truncate_bodies();
            self.memory.nb_memory_total += body.memory_estimate();
        }
        let n = bodies.len();
        let evicted = self.network.add(bodies, now_ms, self.memory.minimal_mode);
        for body in &evicted {
            self.memory.sub_nb(body.memory_estimate());
        }
        self.enforce_memory(now_ms);
        n
    }

    pub fn add_ws_events(&mut self, events: Vec<WebSocketEvent>, now_ms: u64) -> usize {
        for event in &events {
            self.connections.apply(event, now_ms);
            self.memory.ws_memory_total += event.memory_estimate();
        }
        let n = events.len();
        let evicted = self.ws_events.add(events, now_ms, self.memory.minimal_mode);
        for event in &evicted {
            self.memory.sub_ws(event.memory_estimate());
        }
        self.enforce_memory(now_ms);
        n
    }

    pub fn add_actions(&mut self, mut actions: Vec<UserAction>, now_ms: u64) -> usize {
        for action in &mut actions {
            action.redact();
        }
        let n = actions.len();
        self.actions.add(actions, now_ms, self.memory.minimal_mode);
        self.enforce_memory(now_ms);
        n
    }

    pub fn add_snapshots(&mut self, snapshots: Vec<PerformanceSnapshot>, now_ms: u64) -> usize {
        for snap in &snapshots {
            let url = snap.url.clone().unwrap_or_default();
            self.baselines.entry(url).or_default().observe(&snap.metrics);
        }
        let n = snapshots.len();
        self.snapshots.add(snapshots, now_ms, self.memory.minimal_mode);
        self.enforce_memory(now_ms);
        n
    }

    // -- Memory governor -------------------------------------------------------

    /// Run one governor pass: sweep TTL-expired entries, then evict by tier.
    /// Honors the eviction cooldown.
    pub fn enforce_memory(&mut self, now_ms: u64) {
        self.sweep_ttl(now_ms);
        if !self.memory.cooled_down(now_ms) {
            return;
        }
        match tier(self.total_memory()) {
            Tier::Critical => self.evict_critical(now_ms),
            Tier::Hard => self.evict_tiered(HARD_DENOMINATOR, now_ms),
            Tier::Soft => self.evict_tiered(SOFT_DENOMINATOR, now_ms),
            Tier::Ok => {}
        }
    }

    fn sweep_ttl(&mut self, now_ms: u64) {
        for body in self.network.sweep_expired(now_ms) {
            self.memory.sub_nb(body.memory_estimate());
        }
        for event in self.ws_events.sweep_expired(now_ms) {
            self.memory.sub_ws(event.memory_estimate());
        }
        self.logs.sweep_expired(now_ms);
        self.actions.sweep_expired(now_ms);
        self.snapshots.sweep_expired(now_ms);
    }

    /// Shared soft/hard eviction: drop `len/denominator` of each governed
    /// buffer in priority order, stopping once the total is back under the
    /// soft limit.
    fn evict_tiered(&mut self, denominator: usize, now_ms: u64) {
        let mut evicted = 0u64;

        let dropped = self.network.evict_fraction(denominator);
        for body in &dropped {
            self.memory.sub_nb(body.memory_estimate());
        }
        evicted += dropped.len() as u64;

        if self.total_memory() > SOFT_LIMIT {
            let dropped = self.ws_events.evict_fraction(denominator);
            for event in &dropped {
                self.memory.sub_ws(event.memory_estimate());
            }
            evicted += dropped.len() as u64;
        }

        if self.total_memory() > SOFT_LIMIT {
            evicted += self.actions.evict_fraction(denominator).len() as u64;
        }

        // A pass that found nothing to drop is not an eviction: it must not
        // bump the counters or arm the cooldown.
        if evicted > 0 {
            self.memory.note_eviction(now_ms, evicted);
            tracing::debug!(evicted, denominator, "memory eviction pass");
        }
    }

    /// Clear the governed buffers outright and enter minimal mode.
    fn evict_critical(&mut self, now_ms: u64) {
        let evicted =
            (self.network.clear() + self.ws_events.clear() + self.actions.clear()) as u64;
        self.memory.nb_memory_total = 0;
        self.memory.ws_memory_total = 0;
        self.memory.minimal_mode = true;
        self.memory.note_eviction(now_ms, evicted);
        tracing::warn!(evicted, "critical memory eviction: buffers cleared, minimal mode on");
    }

    /// Empty every buffer. Sequence counters are preserved.
    pub fn clear_all(&mut self) -> usize {
        let n = self.logs.clear()
            + self.network.clear()
            + self.ws_events.clear()
            + self.actions.clear()
            + self.snapshots.clear();
        self.memory.nb_memory_total = 0;
        self.memory.ws_memory_total = 0;
        n
    }

    // -- Command results -------------------------------------------------------

    pub fn record_command_result(&mut self, record: CommandRecord) {
        while self.command_results.len() >= MAX_COMMAND_RESULTS {
            self.command_results.shift_remove_index(0);
        }
        self.command_results.insert(record.correlation_id.clone(), record);
    }

    /// Drained on read so the map stays bounded by outstanding commands.
    pub fn take_command_result(&mut self, correlation_id: &str) -> Option<CommandRecord> {
        self.command_results.shift_remove(correlation_id)
    }

    pub fn extension_polling(&self, now_ms: u64) -> bool {
        self.last_poll_ms
            .is_some_and(|at| now_ms.saturating_sub(at) < POLL_LIVENESS_MS)
    }

    // -- Checkpoints -----------------------------------------------------------

    /// Current per-buffer watermarks.
    pub fn checkpoint_now(&self, now_ms: u64) -> Checkpoint {
        Checkpoint {
            console_seq: self.logs.total_added(),
            network_seq: self.network.total_added(),
            ws_seq: self.ws_events.total_added(),
            action_seq: self.actions.total_added(),
            timestamp_ms: now_ms,
        }
    }

    /// Category-scoped delta since a checkpoint; see `ChangesParams`.
    pub fn changes_since(
        &mut self,
        params: &ChangesParams,
        now_ms: u64,
    ) -> Result<serde_json::Value, ToolError> {
        let (baseline, anonymous, since_ms) = match (&params.checkpoint, &params.since) {
            (Some(name), _) => {
                let cp = self.checkpoints.get(name).ok_or_else(|| {
                    ErrorCode::InvalidParam.with_message(format!("unknown checkpoint {name:?}"))
                })?;
                (cp, false, None)
            }
            (None, Some(since)) => {
                let ms = crate::state::parse_rfc3339_ms(since).ok_or_else(|| {
                    ErrorCode::InvalidParam
                        .with_message(format!("since must be RFC3339, got {since:?}"))
                })?;
                // Timestamp baselines carry no watermarks; records are
                // filtered by insertion time instead.
                (Checkpoint::default(), false, Some(ms))
            }
            (None, None) => {
                // First anonymous diff reports everything captured so far.
                (self.checkpoints.last().unwrap_or_default(), true, None)
            }
        };

        let in_window =
            |row_ms: u64| since_ms.is_none_or(|since| row_ms >= since);

        let mut out = serde_json::Map::new();

        if params.includes("console") {
            let mut rows: Vec<Row<LogEntry>> = self
                .logs
                .rows_since(baseline.console_seq, now_ms)
                .into_iter()
                .filter(|r| in_window(r.inserted_at_ms))
                .filter(|r| params.severity.admits(&r.record.level))
                .filter(|r| !self.noise_rules.iter().any(|n| n.matches(&r.record.message)))
                .collect();
            rows = dedupe_and_rank(rows);
            out.insert("console".into(), rows_to_json(&rows));
        }
        if params.includes("network") {
            let rows: Vec<Row<NetworkBody>> = self
                .network
                .rows_since(baseline.network_seq, now_ms)
                .into_iter()
                .filter(|r| in_window(r.inserted_at_ms))
                .collect();
            out.insert("network".into(), rows_to_json(&rows));
        }
        if params.includes("websocket") {
            let rows: Vec<Row<WebSocketEvent>> = self
                .ws_events
                .rows_since(baseline.ws_seq, now_ms)
                .into_iter()
                .filter(|r| in_window(r.inserted_at_ms))
                .collect();
            out.insert("websocket".into(), rows_to_json(&rows));
        }
        if params.includes("actions") {
            let rows: Vec<Row<UserAction>> = self
                .actions
                .rows_since(baseline.action_seq, now_ms)
                .into_iter()
                .filter(|r| in_window(r.inserted_at_ms))
                .collect();
            out.insert("actions".into(), rows_to_json(&rows));
        }

        let next = self.checkpoint_now(now_ms);
        if anonymous {
            self.checkpoints.advance_last(next);
        }
        out.insert(
            "since".into(),
            serde_json::json!({
                "timestamp": crate::state::rfc3339_ms(baseline.timestamp_ms),
            }),
        );
        out.insert(
            "watermarks".into(),
            serde_json::to_value(next).map_err(|e| {
                ErrorCode::MarshalFailed.with_message(format!("watermarks: {e}"))
            })?,
        );
        Ok(serde_json::Value::Object(out))
    }
}

/// Serialize rows with their sequence numbers and capture times merged in.
pub fn rows_to_json<T: Serialize>(rows: &[Row<T>]) -> serde_json::Value {
    serde_json::Value::Array(
        rows.iter()
            .map(|r| {
                let mut obj = serde_json::Map::new();
                obj.insert("seq".into(), r.seq.into());
                obj.insert(
                    "captured_at".into(),
                    crate::state::rfc3339_ms(r.inserted_at_ms).into(),
                );
                let record = serde_json::to_value(&r.record).unwrap_or_default();
                if let serde_json::Value::Object(fields) = record {
                    obj.extend(fields);
                }
                serde_json::Value::Object(obj)
            })
            .collect(),
    )
}

/// Parameters for `changes_since`.
#[derive(Debug, Default)]
pub struct ChangesParams {
    pub checkpoint: Option<String>,
    pub since: Option<String>,
    pub include: Option<Vec<String>>,
    pub severity: SeverityFilter,
}

impl ChangesParams {
    fn includes(&self, category: &str) -> bool {
        self.include
            .as_ref()
            .is_none_or(|list| list.iter().any(|c| c == category))
    }
}

#[cfg(test)]
#[path = "facade_tests.rs"]
mod tests;
