// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only queries over captured data.

use std::sync::Arc;

use crate::capture::buffer::Row;
use crate::capture::checkpoint::SeverityFilter;
use crate::capture::event::{severity_rank, LogEntry};
use crate::capture::pagination::{paginate, PageOptions};
use crate::capture::{rows_to_json, ChangesParams};
use crate::error::ErrorCode;
use crate::state::{epoch_ms, BridgeState};
use crate::tools::{
    opt_str, opt_str_list, opt_u64, parse_page_options, Args, ToolResult, PAGE_KEYS,
};

pub fn known_keys(mode: &str) -> Option<Vec<&'static str>> {
    let mut keys = vec!["what"];
    match mode {
        "errors" | "extension_logs" | "actions" => keys.extend_from_slice(PAGE_KEYS),
        "logs" => {
            keys.extend_from_slice(PAGE_KEYS);
            keys.push("severity");
        }
        "network_bodies" => {
            keys.extend_from_slice(PAGE_KEYS);
            keys.extend_from_slice(&["url_contains", "status"]);
        }
        "websocket_events" => {
            keys.extend_from_slice(PAGE_KEYS);
            keys.push("connection_id");
        }
        "performance" | "pilot" | "pending_commands" => {}
        "changes" => keys.extend_from_slice(&["checkpoint", "since", "include", "severity"]),
        "command_result" => keys.push("correlation_id"),
        _ => return None,
    }
    Some(keys)
}

pub async fn handle(state: &Arc<BridgeState>, mode: &str, args: &Args) -> ToolResult {
    let now = epoch_ms();
    match mode {
        "errors" => {
            let opts = parse_page_options(args)?;
            logs_page(state, opts, SeverityFilter::ErrorsOnly, None, now).await
        }
        "logs" => {
            let severity = match opt_str(args, "severity")? {
                Some(value) => SeverityFilter::parse(&value)?,
                None => SeverityFilter::All,
            };
            let opts = parse_page_options(args)?;
            logs_page(state, opts, severity, None, now).await
        }
        "extension_logs" => {
            let opts = parse_page_options(args)?;
            logs_page(state, opts, SeverityFilter::All, Some("extension"), now).await
        }
        "network_bodies" => {
            let opts = parse_page_options(args)?;
            let url_contains = opt_str(args, "url_contains")?;
            let status = opt_u64(args, "status")?;
            let capture = state.capture.read().await;
            let rows: Vec<_> = capture
                .network
                .rows(now)
                .into_iter()
                .filter(|r| {
                    url_contains.as_deref().is_none_or(|needle| r.record.url.contains(needle))
                })
                .filter(|r| status.is_none_or(|s| r.record.status == Some(s as u16)))
                .collect();
            let oldest = capture.network.first_seq();
            drop(capture);
            page_response("bodies", rows, oldest, &opts)
        }
        "websocket_events" => {
            let opts = parse_page_options(args)?;
            let connection_id = opt_str(args, "connection_id")?;
            let capture = state.capture.read().await;
            let rows: Vec<_> = capture
                .ws_events
                .rows(now)
                .into_iter()
                .filter(|r| {
                    connection_id
                        .as_deref()
                        .is_none_or(|id| r.record.connection_id.as_deref() == Some(id))
                })
                .collect();
            let oldest = capture.ws_events.first_seq();
            let connections = capture.connections.summaries(now);
            drop(capture);
            let mut value = page_response("events", rows, oldest, &opts)?;
            if let Some(obj) = value.as_object_mut() {
                obj.insert(
                    "connections".into(),
                    serde_json::to_value(connections).unwrap_or_default(),
                );
            }
            Ok(value)
        }
        "actions" => {
            let opts = parse_page_options(args)?;
            let capture = state.capture.read().await;
            let rows = capture.actions.rows(now);
            let oldest = capture.actions.first_seq();
            drop(capture);
            page_response("actions", rows, oldest, &opts)
        }
        "performance" => {
            let capture = state.capture.read().await;
            let rows = capture.snapshots.rows(now);
            let baselines = serde_json::to_value(&capture.baselines).unwrap_or_default();
            Ok(serde_json::json!({
                "snapshots": rows_to_json(&rows),
                "baselines": baselines,
            }))
        }
        "changes" => {
            let severity = match opt_str(args, "severity")? {
                Some(value) => SeverityFilter::parse(&value)?,
                None => SeverityFilter::All,
            };
            let params = ChangesParams {
                checkpoint: opt_str(args, "checkpoint")?,
                since: opt_str(args, "since")?,
                include: opt_str_list(args, "include")?,
                severity,
            };
            let mut capture = state.capture.write().await;
            capture.changes_since(&params, now)
        }
        "pilot" => Ok(serde_json::json!({
            "enabled": state.config.allow_pilot,
        })),
        "command_result" => {
            let correlation_id = crate::tools::req_str(args, "correlation_id")?;
            let mut capture = state.capture.write().await;
            match capture.take_command_result(&correlation_id) {
                Some(record) => serde_json::to_value(&record).map_err(|e| {
                    ErrorCode::MarshalFailed.with_message(format!("command record: {e}"))
                }),
                None => Err(ErrorCode::NoData.with_message(format!(
                    "no completed command for correlation id {correlation_id:?}"
                ))),
            }
        }
        "pending_commands" => {
            let capture = state.capture.read().await;
            let pending: Vec<serde_json::Value> = capture
                .pending
                .snapshot()
                .into_iter()
                .map(|q| {
                    serde_json::json!({
                        "id": q.id,
                        "type": q.kind,
                        "params": q.params,
                        "correlation_id": q.correlation_id,
                        "expires_at": crate::state::rfc3339_ms(q.expires_ms),
                    })
                })
                .collect();
            Ok(serde_json::json!({ "pending": pending }))
        }
        other => Err(ErrorCode::UnknownMode.with_message(format!("unknown observe mode {other:?}"))),
    }
}

/// Shared console query: severity floor, optional source filter, noise
/// rules, then pagination.
async fn logs_page(
    state: &Arc<BridgeState>,
    opts: PageOptions,
    severity: SeverityFilter,
    source: Option<&str>,
    now: u64,
) -> ToolResult {
    let capture = state.capture.read().await;
    let rows: Vec<Row<LogEntry>> = capture
        .logs
        .rows(now)
        .into_iter()
        .filter(|r| severity.admits(&r.record.level))
        .filter(|r| source.is_none_or(|s| r.record.source.as_deref() == Some(s)))
        .filter(|r| !capture.noise_rules.iter().any(|n| n.matches(&r.record.message)))
        .collect();
    let oldest = capture.logs.first_seq();
    drop(capture);

    let mut value = page_response("entries", rows, oldest, &opts)?;
    if let Some(obj) = value.as_object_mut() {
        let errors = obj["entries"]
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| {
                        e["level"].as_str().map_or(false, |l| severity_rank(l) >= 4)
                    })
                    .count()
            })
            .unwrap_or(0);
        obj.insert("error_count".into(), errors.into());
    }
    Ok(value)
}

/// Paginate rows and wrap them with metadata under the given key.
fn page_response<T: serde::Serialize + Clone>(
    key: &str,
    rows: Vec<Row<T>>,
    oldest_seq: u64,
    opts: &PageOptions,
) -> ToolResult {
    let (page, meta) = paginate(rows, oldest_seq, opts)?;
    let mut obj = serde_json::Map::new();
    obj.insert(key.to_owned(), rows_to_json(&page));
    obj.insert(
        "meta".into(),
        serde_json::to_value(meta)
            .map_err(|e| ErrorCode::MarshalFailed.with_message(format!("page meta: {e}")))?,
    );
    Ok(serde_json::Value::Object(obj))
}
