// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Browser-side command verbs, serviced by the extension through the
//! pending-query bus.

use std::sync::Arc;

use crate::error::ErrorCode;
use crate::state::BridgeState;
use crate::tools::{
    effective_timeout, opt_str, opt_u64, req_str, run_extension_query, Args, ToolResult,
};

/// Verbs that drive navigation or execute script; refused unless the pilot
/// flag is set.
const PILOT_VERBS: &[&str] = &["navigate", "refresh", "execute_js"];

pub fn known_keys(verb: &str) -> Option<Vec<&'static str>> {
    let mut keys = vec!["action", "correlation_id", "timeout_ms"];
    match verb {
        "click" | "highlight" => keys.push("selector"),
        "type" => keys.extend_from_slice(&["selector", "text"]),
        "select" => keys.extend_from_slice(&["selector", "value"]),
        "scroll" => keys.extend_from_slice(&["selector", "x", "y"]),
        "navigate" => keys.push("url"),
        "refresh" => {}
        "execute_js" => keys.push("code"),
        _ => return None,
    }
    Some(keys)
}

pub async fn handle(state: &Arc<BridgeState>, verb: &str, args: &Args) -> ToolResult {
    if known_keys(verb).is_none() {
        return Err(ErrorCode::UnknownMode.with_message(format!("unknown interact verb {verb:?}")));
    }
    if PILOT_VERBS.contains(&verb) && !state.config.allow_pilot {
        return Err(ErrorCode::PilotDisabled
            .with_message(format!("{verb} requires the pilot flag")));
    }

    let params = build_params(verb, args)?;
    let correlation_id = opt_str(args, "correlation_id")?;
    let timeout_ms = effective_timeout(state, opt_u64(args, "timeout_ms")?);

    let (correlation_id, result, elapsed_ms) =
        run_extension_query(state, verb, params, correlation_id, timeout_ms).await?;

    Ok(serde_json::json!({
        "status": "ok",
        "action": verb,
        "correlation_id": correlation_id,
        "elapsed_ms": elapsed_ms,
        "result": result,
    }))
}

/// Validate verb-specific parameters and assemble the payload the extension
/// will see.
fn build_params(verb: &str, args: &Args) -> Result<serde_json::Value, crate::error::ToolError> {
    let value = match verb {
        "click" | "highlight" => serde_json::json!({
            "selector": req_str(args, "selector")?,
        }),
        "type" => serde_json::json!({
            "selector": req_str(args, "selector")?,
            "text": req_str(args, "text")?,
        }),
        "select" => serde_json::json!({
            "selector": req_str(args, "selector")?,
            "value": req_str(args, "value")?,
        }),
        "scroll" => {
            let selector = opt_str(args, "selector")?;
            let x = opt_u64(args, "x")?;
            let y = opt_u64(args, "y")?;
            if selector.is_none() && x.is_none() && y.is_none() {
                return Err(ErrorCode::MissingParam
                    .with_message("scroll requires selector or x/y offsets"));
            }
            serde_json::json!({ "selector": selector, "x": x, "y": y })
        }
        "navigate" => {
            let url = req_str(args, "url")?;
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ErrorCode::InvalidParam
                    .with_message("url must be http(s)"));
            }
            serde_json::json!({ "url": url })
        }
        "refresh" => serde_json::json!({}),
        "execute_js" => serde_json::json!({
            "code": req_str(args, "code")?,
        }),
        _ => serde_json::json!({}),
    };
    Ok(value)
}
