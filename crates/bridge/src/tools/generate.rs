// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Serialized artifacts derived from captured data: replay scripts, HAR
//! logs, CSP suggestions, SRI attributes, and SARIF reports.

use std::collections::BTreeSet;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha384};

use crate::capture::buffer::Row;
use crate::capture::event::{severity_rank, NetworkBody, UserAction};
use crate::error::{ErrorCode, ToolError};
use crate::state::{epoch_ms, BridgeState};
use crate::tools::{Args, ToolResult};

pub fn known_keys(format: &str) -> Option<Vec<&'static str>> {
    match format {
        "reproduction" | "test" | "har" | "csp" | "sri" | "sarif" => Some(vec!["format"]),
        _ => None,
    }
}

pub async fn handle(state: &Arc<BridgeState>, format: &str, _args: &Args) -> ToolResult {
    let now = epoch_ms();
    let capture = state.capture.read().await;
    match format {
        "reproduction" => {
            let script = action_script(&capture.actions.rows(now))?;
            Ok(serde_json::json!({ "format": "reproduction", "content": script }))
        }
        "test" => {
            let body = action_script(&capture.actions.rows(now))?;
            let indented: String =
                body.lines().map(|l| format!("  {l}\n")).collect();
            let content = format!(
                "import {{ test, expect }} from '@playwright/test';\n\n\
                 test('captured session', async ({{ page }}) => {{\n{indented}}});\n"
            );
            Ok(serde_json::json!({ "format": "test", "content": content }))
        }
        "har" => {
            let rows = capture.network.rows(now);
            if rows.is_empty() {
                return Err(no_data("no network bodies captured"));
            }
            Ok(serde_json::json!({ "format": "har", "content": har_log(&rows) }))
        }
        "csp" => {
            let mut origins = BTreeSet::new();
            for row in capture.network.rows(now) {
                if let Some(origin) = origin_of(&row.record.url) {
                    origins.insert(origin);
                }
            }
            for summary in capture.connections.summaries(now) {
                if let Some(origin) = origin_of(&summary.url) {
                    origins.insert(origin);
                }
            }
            if origins.is_empty() {
                return Err(no_data("no traffic captured to derive a policy from"));
            }
            let connect: Vec<String> = origins.into_iter().collect();
            let content = format!(
                "default-src 'self'; connect-src 'self' {}; img-src 'self' data:;",
                connect.join(" ")
            );
            Ok(serde_json::json!({ "format": "csp", "content": content }))
        }
        "sri" => {
            let rows = capture.network.rows(now);
            let entries: Vec<serde_json::Value> = rows
                .iter()
                .filter_map(|row| {
                    let body = row.record.response_body.as_deref()?;
                    // A truncated body would hash to the wrong integrity value.
                    if row.record.response_truncated {
                        return None;
                    }
                    let digest = Sha384::digest(body.as_bytes());
                    Some(serde_json::json!({
                        "url": row.record.url,
                        "integrity": format!("sha384-{}", STANDARD.encode(digest)),
                    }))
                })
                .collect();
            if entries.is_empty() {
                return Err(no_data("no complete response bodies captured"));
            }
            Ok(serde_json::json!({ "format": "sri", "content": entries }))
        }
        "sarif" => {
            let rows = capture.logs.rows(now);
            let results: Vec<serde_json::Value> = rows
                .iter()
                .filter(|r| severity_rank(&r.record.level) >= 4)
                .map(|r| {
                    serde_json::json!({
                        "ruleId": "console-error",
                        "level": "error",
                        "message": { "text": r.record.message },
                        "locations": [{
                            "physicalLocation": {
                                "artifactLocation": {
                                    "uri": r.record.url.clone().unwrap_or_default(),
                                }
                            }
                        }],
                    })
                })
                .collect();
            if results.is_empty() {
                return Err(no_data("no console errors captured"));
            }
            Ok(serde_json::json!({
                "format": "sarif",
                "content": {
                    "$schema": "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json",
                    "version": "2.1.0",
                    "runs": [{
                        "tool": { "driver": {
                            "name": "lookout-bridge",
                            "version": env!("CARGO_PKG_VERSION"),
                        }},
                        "results": results,
                    }],
                },
            }))
        }
        other => {
            Err(ErrorCode::UnknownMode.with_message(format!("unknown generate format {other:?}")))
        }
    }
}

fn no_data(message: &str) -> ToolError {
    ErrorCode::NoData.with_message(message)
}

/// Render captured actions as a Playwright-flavored replay script.
fn action_script(rows: &[Row<UserAction>]) -> Result<String, ToolError> {
    if rows.is_empty() {
        return Err(no_data("no user actions captured"));
    }
    let mut lines = Vec::with_capacity(rows.len());
    for row in rows {
        let action = &row.record;
        let selector = action
            .selectors
            .as_ref()
            .and_then(|s| s.best())
            .unwrap_or_else(|| "body".to_owned());
        let line = match action.action.as_str() {
            "click" => format!("await page.click('{}');", escape(&selector)),
            "input" => format!(
                "await page.fill('{}', '{}');",
                escape(&selector),
                escape(action.value.as_deref().unwrap_or_default())
            ),
            "select" => format!(
                "await page.selectOption('{}', '{}');",
                escape(&selector),
                escape(action.value.as_deref().unwrap_or_default())
            ),
            "navigate" => format!(
                "await page.goto('{}');",
                escape(action.url.as_deref().unwrap_or_default())
            ),
            "scroll" => {
                format!("await page.locator('{}').scrollIntoViewIfNeeded();", escape(&selector))
            }
            "keypress" => format!(
                "await page.press('{}', '{}');",
                escape(&selector),
                escape(action.value.as_deref().unwrap_or_default())
            ),
            other => format!("// unsupported action: {other}"),
        };
        lines.push(line);
    }
    Ok(lines.join("\n"))
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

/// HAR 1.2 log built from captured network bodies.
fn har_log(rows: &[Row<NetworkBody>]) -> serde_json::Value {
    let entries: Vec<serde_json::Value> = rows
        .iter()
        .map(|row| {
            let body = &row.record;
            serde_json::json!({
                "startedDateTime": crate::state::rfc3339_ms(row.inserted_at_ms),
                "time": body.duration_ms.unwrap_or(0.0),
                "request": {
                    "method": body.method,
                    "url": body.url,
                    "httpVersion": "HTTP/1.1",
                    "headers": [],
                    "queryString": [],
                    "postData": body.request_body.as_ref().map(|text| serde_json::json!({
                        "mimeType": body.content_type.clone().unwrap_or_default(),
                        "text": text,
                    })),
                    "headersSize": -1,
                    "bodySize": body.request_body.as_deref().map_or(0, str::len),
                },
                "response": {
                    "status": body.status.unwrap_or(0),
                    "statusText": "",
                    "httpVersion": "HTTP/1.1",
                    "headers": [],
                    "content": {
                        "size": body.response_body.as_deref().map_or(0, str::len),
                        "mimeType": body.content_type.clone().unwrap_or_default(),
                        "text": body.response_body.clone().unwrap_or_default(),
                    },
                    "headersSize": -1,
                    "bodySize": body.response_body.as_deref().map_or(0, str::len),
                },
                "cache": {},
                "timings": { "send": 0, "wait": body.duration_ms.unwrap_or(0.0), "receive": 0 },
            })
        })
        .collect();

    serde_json::json!({
        "log": {
            "version": "1.2",
            "creator": { "name": "lookout-bridge", "version": env!("CARGO_PKG_VERSION") },
            "entries": entries,
        }
    })
}

/// Scheme://host[:port] prefix of a URL, if it has one.
fn origin_of(url: &str) -> Option<String> {
    let scheme_end = url.find("://")?;
    let rest = &url[scheme_end + 3..];
    let host_end = rest.find('/').unwrap_or(rest.len());
    if rest[..host_end].is_empty() {
        return None;
    }
    Some(format!("{}{}", &url[..scheme_end + 3], &rest[..host_end]))
}

#[cfg(test)]
#[path = "generate_tests.rs"]
mod tests;
