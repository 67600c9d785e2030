// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Captured record types posted by the browser extension.
//!
//! The extension posts camelCase keys; everything the bridge emits is
//! snake_case. Deserialization therefore carries camelCase aliases while
//! serialization uses the field names. Record timestamps are pass-through
//! values (the extension sends either epoch numbers or RFC3339 strings) and
//! are never interpreted by the bridge; insertion times are tracked
//! separately by the buffers.

use serde::{Deserialize, Serialize};

/// Request bodies larger than this are truncated at ingest.
pub const REQUEST_BODY_CAP: usize = 8 * 1024;
/// Response bodies larger than this are truncated at ingest.
pub const RESPONSE_BODY_CAP: usize = 16 * 1024;

/// Literal stored in place of captured password values.
pub const REDACTED: &str = "[redacted]";

/// Per-entry memory overhead estimates, matching the governor's accounting.
pub const WS_EVENT_OVERHEAD: usize = 200;
pub const NETWORK_BODY_OVERHEAD: usize = 300;
pub const USER_ACTION_MEMORY: usize = 500;

/// A console log entry or uncaught error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default)]
    pub timestamp: serde_json::Value,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    /// "page" for page console output, "extension" for the extension's own logs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Active test id stamped at ingest when a test boundary is open.
    #[serde(default, alias = "testId", skip_serializing_if = "Option::is_none")]
    pub test_id: Option<String>,
}

/// Rank console levels for severity ordering; higher is more severe.
pub fn severity_rank(level: &str) -> u8 {
    match level {
        "error" | "exception" => 4,
        "warn" | "warning" => 3,
        "info" => 2,
        "log" => 1,
        _ => 0,
    }
}

/// A captured network request/response body pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkBody {
    #[serde(default)]
    pub timestamp: serde_json::Value,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, alias = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<String>,
    #[serde(default, alias = "responseBody", skip_serializing_if = "Option::is_none")]
    pub response_body: Option<String>,
    #[serde(default, alias = "requestTruncated")]
    pub request_truncated: bool,
    #[serde(default, alias = "responseTruncated")]
    pub response_truncated: bool,
    #[serde(default, alias = "contentType", skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, alias = "durationMs", skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
}

impl NetworkBody {
    /// Cap both bodies, flagging whichever was cut.
    pub fn truncate_bodies(&mut self) {
        if let Some(body) = self.request_body.as_mut() {
            if truncate_to(body, REQUEST_BODY_CAP) {
                self.request_truncated = true;
            }
        }
        if let Some(body) = self.response_body.as_mut() {
            if truncate_to(body, RESPONSE_BODY_CAP) {
                self.response_truncated = true;
            }
        }
    }

    pub fn memory_estimate(&self) -> usize {
        NETWORK_BODY_OVERHEAD
            + self.request_body.as_deref().map_or(0, str::len)
            + self.response_body.as_deref().map_or(0, str::len)
    }
}

/// Truncate a string to at most `cap` bytes on a char boundary.
/// Returns true if anything was removed.
fn truncate_to(s: &mut String, cap: usize) -> bool {
    if s.len() <= cap {
        return false;
    }
    let mut cut = cap;
    while cut > 0 && !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
    true
}

/// A WebSocket lifecycle or message event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketEvent {
    #[serde(default)]
    pub timestamp: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, alias = "connectionId", skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
    /// `open`, `close`, `error`, or `message`.
    #[serde(default)]
    pub event: String,
    /// `incoming` or `outgoing`; only meaningful for message events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Payload preview; counted against the memory budget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Sampling descriptor when the extension is downsampling a chatty socket.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampling: Option<serde_json::Value>,
}

impl WebSocketEvent {
    pub fn memory_estimate(&self) -> usize {
        WS_EVENT_OVERHEAD + self.data.as_deref().map_or(0, str::len)
    }
}

/// Multi-strategy selector captured with a user action.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectorMap {
    #[serde(default, alias = "testId", skip_serializing_if = "Option::is_none")]
    pub test_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, alias = "ariaLabel", skip_serializing_if = "Option::is_none")]
    pub aria_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, alias = "cssPath", skip_serializing_if = "Option::is_none")]
    pub css_path: Option<String>,
}

impl SelectorMap {
    /// Best available selector, preferring the most stable strategy.
    pub fn best(&self) -> Option<String> {
        if let Some(t) = &self.test_id {
            return Some(format!("[data-testid=\"{t}\"]"));
        }
        if let Some(id) = &self.id {
            return Some(format!("#{id}"));
        }
        if let Some(css) = &self.css_path {
            return Some(css.clone());
        }
        if let (Some(role), Some(label)) = (&self.role, &self.aria_label) {
            return Some(format!("[role=\"{role}\"][aria-label=\"{label}\"]"));
        }
        self.text.as_ref().map(|t| format!("text={t}"))
    }
}

/// A captured user action (click, input, navigation, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAction {
    #[serde(default)]
    pub timestamp: serde_json::Value,
    /// `click`, `input`, `navigate`, `scroll`, `select`, or `keypress`.
    #[serde(rename = "type", default)]
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selectors: Option<SelectorMap>,
    #[serde(default, alias = "inputType", skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl UserAction {
    /// Password values never reach the buffer in the clear.
    pub fn redact(&mut self) {
        if self.input_type.as_deref() == Some("password") && self.value.is_some() {
            self.value = Some(REDACTED.to_owned());
        }
    }

    pub fn is_redacted(&self) -> bool {
        self.input_type.as_deref() != Some("password")
            || self.value.as_deref().is_none_or(|v| v == REDACTED)
    }
}

/// A performance snapshot: arbitrary numeric metrics keyed by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    #[serde(default)]
    pub timestamp: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub metrics: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
