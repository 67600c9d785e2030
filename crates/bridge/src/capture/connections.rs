// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket connection tracking: per-connection state machine,
//! per-direction stats, and rolling-window message rates.

use std::collections::VecDeque;

use indexmap::IndexMap;
use serde::Serialize;

use crate::capture::event::WebSocketEvent;

/// Rolling window used for message-rate computation.
pub const RATE_WINDOW_MS: u64 = 5000;

/// Payload previews kept per direction are capped to this many bytes.
const PREVIEW_CAP: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnState {
    Open,
    Error,
    Closed,
}

impl ConnState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Error => "error",
            Self::Closed => "closed",
        }
    }
}

/// Per-direction message statistics.
#[derive(Debug, Clone, Default)]
pub struct DirStats {
    pub total: u64,
    pub bytes: u64,
    pub last_at_ms: Option<u64>,
    pub last_preview: Option<String>,
    recent: VecDeque<u64>,
}

impl DirStats {
    fn record(&mut self, size: u64, preview: Option<&str>, now_ms: u64) {
        self.total += 1;
        self.bytes += size;
        self.last_at_ms = Some(now_ms);
        if let Some(p) = preview {
            let mut cut = p.len().min(PREVIEW_CAP);
            while cut > 0 && !p.is_char_boundary(cut) {
                cut -= 1;
            }
            self.last_preview = Some(p[..cut].to_owned());
        }
        self.prune(now_ms);
        self.recent.push_back(now_ms);
    }

    fn prune(&mut self, now_ms: u64) {
        let cutoff = now_ms.saturating_sub(RATE_WINDOW_MS);
        while self.recent.front().is_some_and(|&t| t < cutoff) {
            self.recent.pop_front();
        }
    }

    /// Messages per second over the rolling window.
    pub fn rate(&self, now_ms: u64) -> f64 {
        let cutoff = now_ms.saturating_sub(RATE_WINDOW_MS);
        let in_window = self.recent.iter().filter(|&&t| t >= cutoff).count();
        in_window as f64 / (RATE_WINDOW_MS as f64 / 1000.0)
    }
}

/// Tracked state of one WebSocket connection.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: String,
    pub url: String,
    pub state: ConnState,
    pub opened_at_ms: u64,
    pub closed_at_ms: Option<u64>,
    pub incoming: DirStats,
    pub outgoing: DirStats,
    pub sampling: bool,
    pub close_code: Option<u16>,
    pub close_reason: Option<String>,
}

#[derive(Debug)]
pub struct ConnectionTracker {
    active: IndexMap<String, Connection>,
    closed: VecDeque<Connection>,
    max_active: usize,
    max_closed: usize,
}

impl ConnectionTracker {
    pub fn new(max_active: usize, max_closed: usize) -> Self {
        Self {
            active: IndexMap::new(),
            closed: VecDeque::new(),
            max_active,
            max_closed,
        }
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn closed_count(&self) -> usize {
        self.closed.len()
    }

    pub fn get(&self, id: &str) -> Option<&Connection> {
        self.active.get(id)
    }

    /// Apply one extension-reported event. Events for unknown ids (other
    /// than `open`) are ignored.
    pub fn apply(&mut self, ev: &WebSocketEvent, now_ms: u64) {
        let Some(id) = ev.connection_id.as_deref() else {
            return;
        };
        match ev.event.as_str() {
            "open" => self.on_open(id, ev, now_ms),
            "message" => self.on_message(id, ev, now_ms),
            "error" => {
                if let Some(conn) = self.active.get_mut(id) {
                    conn.state = ConnState::Error;
                }
            }
            "close" => self.on_close(id, ev, now_ms),
            _ => {}
        }
        if ev.sampling.is_some() {
            if let Some(conn) = self.active.get_mut(id) {
                conn.sampling = true;
            }
        }
    }

    fn on_open(&mut self, id: &str, ev: &WebSocketEvent, now_ms: u64) {
        if self.active.len() >= self.max_active && !self.active.contains_key(id) {
            // Evict the oldest by insertion order; its stats are forgotten.
            self.active.shift_remove_index(0);
        }
        self.active.insert(
            id.to_owned(),
            Connection {
                id: id.to_owned(),
                url: ev.url.clone().unwrap_or_default(),
                state: ConnState::Open,
                opened_at_ms: now_ms,
                closed_at_ms: None,
                incoming: DirStats::default(),
                outgoing: DirStats::default(),
                sampling: false,
                close_code: None,
                close_reason: None,
            },
        );
    }

    fn on_message(&mut self, id: &str, ev: &WebSocketEvent, now_ms: u64) {
        let Some(conn) = self.active.get_mut(id) else {
            return;
        };
        let size = ev.size.unwrap_or_else(|| ev.data.as_deref().map_or(0, |d| d.len() as u64));
        let stats = if ev.direction.as_deref() == Some("outgoing") {
            &mut conn.outgoing
        } else {
            &mut conn.incoming
        };
        stats.record(size, ev.data.as_deref(), now_ms);
    }

    fn on_close(&mut self, id: &str, ev: &WebSocketEvent, now_ms: u64) {
        let Some(mut conn) = self.active.shift_remove(id) else {
            return;
        };
        conn.state = ConnState::Closed;
        conn.closed_at_ms = Some(now_ms);
        conn.close_code = ev.code;
        conn.close_reason = ev.reason.clone();
        if self.closed.len() >= self.max_closed {
            self.closed.pop_front();
        }
        self.closed.push_back(conn);
    }

    /// Consumer-facing summaries, active connections first.
    pub fn summaries(&self, now_ms: u64) -> Vec<ConnectionSummary> {
        let active = self.active.values().map(|c| ConnectionSummary::from_conn(c, now_ms));
        let closed = self.closed.iter().map(|c| ConnectionSummary::from_conn(c, now_ms));
        active.chain(closed).collect()
    }
}

#[derive(Debug, Serialize)]
pub struct DirSummary {
    pub total: u64,
    pub bytes: u64,
    pub rate_per_sec: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message_age: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_preview: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConnectionSummary {
    pub id: String,
    pub url: String,
    pub state: &'static str,
    pub duration: String,
    pub incoming: DirSummary,
    pub outgoing: DirSummary,
    pub sampling: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_reason: Option<String>,
}

impl ConnectionSummary {
    fn from_conn(conn: &Connection, now_ms: u64) -> Self {
        let end = conn.closed_at_ms.unwrap_or(now_ms);
        Self {
            id: conn.id.clone(),
            url: conn.url.clone(),
            state: conn.state.as_str(),
            duration: format_duration(end.saturating_sub(conn.opened_at_ms)),
            incoming: dir_summary(&conn.incoming, now_ms),
            outgoing: dir_summary(&conn.outgoing, now_ms),
            sampling: conn.sampling,
            close_code: conn.close_code,
            close_reason: conn.close_reason.clone(),
        }
    }
}

fn dir_summary(stats: &DirStats, now_ms: u64) -> DirSummary {
    DirSummary {
        total: stats.total,
        bytes: stats.bytes,
        rate_per_sec: stats.rate(now_ms),
        last_message_age: stats.last_at_ms.map(|at| format_duration(now_ms.saturating_sub(at))),
        last_preview: stats.last_preview.clone(),
    }
}

/// Compact human duration: `0.2s`, `3s`, `2m30s`, `1h15m`.
pub fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        return format!("{:.1}s", ms as f64 / 1000.0);
    }
    let secs = ms / 1000;
    if secs < 60 {
        return format!("{secs}s");
    }
    let mins = secs / 60;
    if mins < 60 {
        let rem = secs % 60;
        if rem == 0 {
            return format!("{mins}m");
        }
        return format!("{mins}m{rem}s");
    }
    let hours = mins / 60;
    let rem = mins % 60;
    if rem == 0 {
        return format!("{hours}h");
    }
    format!("{hours}h{rem}m")
}

#[cfg(test)]
#[path = "connections_tests.rs"]
mod tests;
