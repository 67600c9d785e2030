// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DOM and accessibility analyses, serviced by the extension.

use std::sync::Arc;

use crate::error::ErrorCode;
use crate::state::BridgeState;
use crate::tools::{
    effective_timeout, opt_str, opt_u64, req_str, run_extension_query, Args, ToolResult,
};

pub fn known_keys(mode: &str) -> Option<Vec<&'static str>> {
    let mut keys = vec!["what", "correlation_id", "timeout_ms"];
    match mode {
        "dom" => keys.push("selector"),
        "a11y" => keys.push("scope"),
        _ => return None,
    }
    Some(keys)
}

pub async fn handle(state: &Arc<BridgeState>, mode: &str, args: &Args) -> ToolResult {
    let params = match mode {
        "dom" => serde_json::json!({ "selector": req_str(args, "selector")? }),
        "a11y" => serde_json::json!({ "scope": opt_str(args, "scope")? }),
        other => {
            return Err(
                ErrorCode::UnknownMode.with_message(format!("unknown analyze mode {other:?}"))
            )
        }
    };

    let correlation_id = opt_str(args, "correlation_id")?;
    let timeout_ms = effective_timeout(state, opt_u64(args, "timeout_ms")?);

    let (correlation_id, result, elapsed_ms) =
        run_extension_query(state, mode, params, correlation_id, timeout_ms).await?;

    Ok(serde_json::json!({
        "status": "ok",
        "analysis": mode,
        "correlation_id": correlation_id,
        "elapsed_ms": elapsed_ms,
        "result": result,
    }))
}
