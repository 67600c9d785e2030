// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bridge management verbs: health, clear, noise rules, streaming status,
//! checkpoints.

use std::sync::Arc;

use crate::capture::connections::format_duration;
use crate::capture::NoiseRule;
use crate::error::ErrorCode;
use crate::state::{epoch_ms, BridgeState};
use crate::tools::{req_str, Args, ToolResult};

pub fn known_keys(verb: &str) -> Option<Vec<&'static str>> {
    let mut keys = vec!["action"];
    match verb {
        "health" | "clear" | "streaming" => {}
        "noise_rule" => keys.extend_from_slice(&["op", "pattern"]),
        "checkpoint" => keys.push("name"),
        _ => return None,
    }
    Some(keys)
}

pub async fn handle(state: &Arc<BridgeState>, verb: &str, args: &Args) -> ToolResult {
    let now = epoch_ms();
    match verb {
        "health" => {
            let capture = state.capture.read().await;
            Ok(serde_json::json!({
                "status": "running",
                "version": env!("CARGO_PKG_VERSION"),
                "uptime_seconds": state.uptime_seconds(),
                "buffers": {
                    "logs": capture.logs.len(),
                    "network_bodies": capture.network.len(),
                    "websocket_events": capture.ws_events.len(),
                    "actions": capture.actions.len(),
                    "performance_snapshots": capture.snapshots.len(),
                },
                "memory_total": capture.total_memory(),
                "minimal_mode": capture.memory.minimal_mode,
                "circuit_open": capture.admission.circuit_open,
                "extension_polling": capture.extension_polling(now),
            }))
        }
        "clear" => {
            let mut capture = state.capture.write().await;
            let cleared = capture.clear_all();
            Ok(serde_json::json!({ "cleared": cleared }))
        }
        "noise_rule" => {
            let op = req_str(args, "op")?;
            let mut capture = state.capture.write().await;
            match op.as_str() {
                "add" => {
                    let pattern = req_str(args, "pattern")?;
                    if capture.noise_rules.iter().any(|r| r.pattern == pattern) {
                        return Ok(serde_json::json!({ "added": false, "pattern": pattern }));
                    }
                    let rule = NoiseRule::compile(&pattern)?;
                    capture.noise_rules.push(rule);
                    Ok(serde_json::json!({ "added": true, "pattern": pattern }))
                }
                "remove" => {
                    let pattern = req_str(args, "pattern")?;
                    let before = capture.noise_rules.len();
                    capture.noise_rules.retain(|r| r.pattern != pattern);
                    Ok(serde_json::json!({
                        "removed": capture.noise_rules.len() < before,
                        "pattern": pattern,
                    }))
                }
                "list" => {
                    let rules: Vec<&str> =
                        capture.noise_rules.iter().map(|r| r.pattern.as_str()).collect();
                    Ok(serde_json::json!({ "rules": rules }))
                }
                other => Err(ErrorCode::InvalidParam
                    .with_message(format!("op must be add|remove|list, got {other:?}"))),
            }
        }
        "streaming" => {
            let capture = state.capture.read().await;
            let last_poll_age = capture
                .last_poll_ms
                .map(|at| format_duration(now.saturating_sub(at)));
            Ok(serde_json::json!({
                "extension_polling": capture.extension_polling(now),
                "last_poll_age": last_poll_age,
                "pending_queries": capture.pending.len(),
            }))
        }
        "checkpoint" => {
            let name = req_str(args, "name")?;
            let mut capture = state.capture.write().await;
            let checkpoint = capture.checkpoint_now(now);
            capture.checkpoints.save(&name, checkpoint);
            Ok(serde_json::json!({
                "checkpoint": name,
                "watermarks": serde_json::to_value(checkpoint).unwrap_or_default(),
            }))
        }
        other => {
            Err(ErrorCode::UnknownMode.with_message(format!("unknown configure verb {other:?}")))
        }
    }
}
