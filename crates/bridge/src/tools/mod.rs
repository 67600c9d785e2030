// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The tool dispatcher: one entry point normalizing parameter parsing,
//! unknown-key warnings, structured errors, and alert appending for every
//! consumer-facing tool.

pub mod analyze;
pub mod configure;
pub mod generate;
pub mod interact;
pub mod observe;

use std::sync::Arc;

use serde::Serialize;

use crate::capture::pagination::PageOptions;
use crate::error::{ErrorCode, ToolError};
use crate::state::{epoch_ms, BridgeState};

pub type Args = serde_json::Map<String, serde_json::Value>;
pub type ToolResult = Result<serde_json::Value, ToolError>;

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
}

#[derive(Debug, Serialize)]
pub struct ToolResponse {
    pub content: Vec<ContentBlock>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl ToolResponse {
    fn success(value: &serde_json::Value) -> Self {
        let text = serde_json::to_string_pretty(value)
            .unwrap_or_else(|_| "{}".to_owned());
        Self { content: vec![ContentBlock::Text { text }], is_error: None }
    }

    fn failure(err: &ToolError) -> Self {
        let body = serde_json::to_value(err.to_error_body()).unwrap_or_default();
        let text = format!("Error: {body}");
        Self { content: vec![ContentBlock::Text { text }], is_error: Some(true) }
    }

    fn push_text(&mut self, text: String) {
        self.content.push(ContentBlock::Text { text });
    }
}

/// Dispatch one `tools/call`. Never panics; every failure becomes a
/// structured error response.
pub async fn dispatch(
    state: &Arc<BridgeState>,
    name: &str,
    arguments: serde_json::Value,
) -> ToolResponse {
    let args: Args = match arguments {
        serde_json::Value::Object(map) => map,
        serde_json::Value::Null => Args::new(),
        _ => {
            return ToolResponse::failure(
                &ErrorCode::InvalidParam.with_message("arguments must be a JSON object"),
            )
        }
    };

    let discriminator = match name {
        "observe" | "analyze" => "what",
        "interact" | "configure" => "action",
        "generate" => "format",
        other => {
            return ToolResponse::failure(
                &ErrorCode::UnknownMode.with_message(format!("unknown tool {other:?}")),
            )
        }
    };

    let mode = match args.get(discriminator) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(_) => {
            return ToolResponse::failure(
                &ErrorCode::InvalidParam
                    .with_message(format!("{discriminator} must be a string")),
            )
        }
        None => {
            return ToolResponse::failure(
                &ErrorCode::MissingParam
                    .with_message(format!("{discriminator} is required")),
            )
        }
    };

    let (known_keys, result) = match name {
        "observe" => (observe::known_keys(&mode), observe::handle(state, &mode, &args).await),
        "interact" => (interact::known_keys(&mode), interact::handle(state, &mode, &args).await),
        "configure" => {
            (configure::known_keys(&mode), configure::handle(state, &mode, &args).await)
        }
        "analyze" => (analyze::known_keys(&mode), analyze::handle(state, &mode, &args).await),
        "generate" => (generate::known_keys(&mode), generate::handle(state, &mode, &args).await),
        _ => unreachable!("tool name checked above"),
    };

    let mut response = match &result {
        Ok(value) => ToolResponse::success(value),
        Err(err) => ToolResponse::failure(err),
    };

    // Unknown parameter keys are a warning, never a failure.
    if let Some(known) = known_keys {
        let unknown: Vec<&str> = args
            .keys()
            .map(String::as_str)
            .filter(|k| !known.iter().any(|allowed| allowed == k))
            .collect();
        if !unknown.is_empty() {
            response.push_text(format!(
                "Warning: unknown parameter(s) ignored: {}",
                unknown.join(", ")
            ));
        }
    }

    append_alerts(state, &mut response).await;
    response
}

/// Append operational alerts so consumers see degraded-state context on any
/// tool call.
async fn append_alerts(state: &Arc<BridgeState>, response: &mut ToolResponse) {
    let capture = state.capture.read().await;
    if capture.admission.circuit_open {
        let reason =
            capture.admission.circuit_reason.clone().unwrap_or_else(|| "unknown".to_owned());
        response.push_text(format!("Alert: ingestion circuit open ({reason})"));
    }
    if capture.memory.minimal_mode {
        response
            .push_text("Alert: minimal mode active; buffer capacities are halved".to_owned());
    }
}

// -- Parameter helpers --------------------------------------------------------

pub(crate) fn opt_str(args: &Args, key: &str) -> Result<Option<String>, ToolError> {
    match args.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ErrorCode::InvalidParam.with_message(format!("{key} must be a string"))),
    }
}

pub(crate) fn req_str(args: &Args, key: &str) -> Result<String, ToolError> {
    opt_str(args, key)?
        .ok_or_else(|| ErrorCode::MissingParam.with_message(format!("{key} is required")))
}

pub(crate) fn opt_bool(args: &Args, key: &str) -> Result<Option<bool>, ToolError> {
    match args.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(ErrorCode::InvalidParam.with_message(format!("{key} must be a boolean"))),
    }
}

pub(crate) fn opt_u64(args: &Args, key: &str) -> Result<Option<u64>, ToolError> {
    match args.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .map(Some)
            .ok_or_else(|| {
                ErrorCode::InvalidParam
                    .with_message(format!("{key} must be a non-negative integer"))
            }),
    }
}

pub(crate) fn opt_str_list(args: &Args, key: &str) -> Result<Option<Vec<String>>, ToolError> {
    match args.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_str().map(str::to_owned).ok_or_else(|| {
                    ErrorCode::InvalidParam
                        .with_message(format!("{key} must be an array of strings"))
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        Some(_) => {
            Err(ErrorCode::InvalidParam.with_message(format!("{key} must be an array of strings")))
        }
    }
}

/// Shared pagination parameter names accepted by list-shaped observe modes.
pub(crate) const PAGE_KEYS: &[&str] =
    &["after_cursor", "before_cursor", "since", "limit", "restart_on_eviction"];

pub(crate) fn parse_page_options(args: &Args) -> Result<PageOptions, ToolError> {
    let since_ms = match opt_str(args, "since")? {
        Some(value) => Some(crate::state::parse_rfc3339_ms(&value).ok_or_else(|| {
            ErrorCode::InvalidParam.with_message(format!("since must be RFC3339, got {value:?}"))
        })?),
        None => None,
    };
    Ok(PageOptions {
        after: opt_str(args, "after_cursor")?,
        before: opt_str(args, "before_cursor")?,
        since_ms,
        limit: opt_u64(args, "limit")?.map(|v| v as usize),
        restart_on_eviction: opt_bool(args, "restart_on_eviction")?.unwrap_or(false),
    })
}

/// Schedule a browser-side query and await its result with a wall-clock
/// bound. Returns the correlation id, the extension's payload, and elapsed
/// milliseconds.
pub(crate) async fn run_extension_query(
    state: &Arc<BridgeState>,
    kind: &str,
    params: serde_json::Value,
    correlation_id: Option<String>,
    timeout_ms: u64,
) -> Result<(String, serde_json::Value, u64), ToolError> {
    let started = std::time::Instant::now();
    let correlation_id = correlation_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let (id, rx) = {
        let mut capture = state.capture.write().await;
        capture
            .pending
            .create(kind, params, Some(correlation_id.clone()), timeout_ms, epoch_ms())
            .map_err(|_| {
                ErrorCode::RateLimited.with_message("too many pending extension queries")
            })?
    };

    let deadline = std::time::Duration::from_millis(timeout_ms);
    let outcome = tokio::select! {
        received = tokio::time::timeout(deadline, rx) => received,
        _ = state.shutdown.cancelled() => {
            let mut capture = state.capture.write().await;
            capture.pending.abandon(&id);
            return Err(ErrorCode::ExtTimeout.with_message("bridge is shutting down"));
        }
    };

    let elapsed_ms = started.elapsed().as_millis() as u64;
    match outcome {
        Ok(Ok(Ok(value))) => Ok((correlation_id, value, elapsed_ms)),
        Ok(Ok(Err(message))) => Err(ErrorCode::ExtError.with_message(format!(
            "extension reported an error for {correlation_id}: {message}"
        ))),
        // Sender dropped: the reaper expired the query.
        Ok(Err(_)) => Err(ErrorCode::ExtTimeout.with_message(format!(
            "extension did not answer {kind} query within {timeout_ms} ms"
        ))),
        Err(_) => {
            let mut capture = state.capture.write().await;
            capture.pending.abandon(&id);
            Err(ErrorCode::ExtTimeout.with_message(format!(
                "extension did not answer {kind} query within {timeout_ms} ms"
            )))
        }
    }
}

/// Clamp a caller-supplied timeout to something sane.
pub(crate) fn effective_timeout(state: &BridgeState, requested: Option<u64>) -> u64 {
    const MAX_TIMEOUT_MS: u64 = 30_000;
    requested.unwrap_or(state.config.query_timeout_ms).min(MAX_TIMEOUT_MS).max(100)
}
