// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::capture::event::SelectorMap;
use yare::parameterized;

#[parameterized(
    https = { "https://api.example.com/v1/items?q=1", Some("https://api.example.com") },
    port = { "http://localhost:3000/app", Some("http://localhost:3000") },
    wss = { "wss://feed.example.com/live", Some("wss://feed.example.com") },
    bare_host = { "https://example.com", Some("https://example.com") },
    no_scheme = { "/relative/path", None },
    empty_host = { "https:///path", None },
)]
fn origin_extraction(url: &str, expected: Option<&str>) {
    assert_eq!(origin_of(url).as_deref(), expected);
}

fn action_row(seq: u64, action: &str, value: Option<&str>) -> Row<UserAction> {
    Row {
        seq,
        inserted_at_ms: 1000,
        record: UserAction {
            timestamp: serde_json::Value::Null,
            action: action.into(),
            url: Some("https://app.example.com/".into()),
            selectors: Some(SelectorMap { test_id: Some("submit".into()), ..Default::default() }),
            input_type: None,
            value: value.map(str::to_owned),
        },
    }
}

#[test]
fn script_renders_clicks_and_fills() {
    let rows = vec![
        action_row(0, "navigate", None),
        action_row(1, "click", None),
        action_row(2, "input", Some("hello")),
    ];
    let script = action_script(&rows).expect("script");
    let lines: Vec<&str> = script.lines().collect();
    assert_eq!(lines[0], "await page.goto('https://app.example.com/');");
    assert_eq!(lines[1], "await page.click('[data-testid=\"submit\"]');");
    assert_eq!(lines[2], "await page.fill('[data-testid=\"submit\"]', 'hello');");
}

#[test]
fn script_escapes_quotes() {
    let mut row = action_row(0, "input", Some("it's"));
    row.record.selectors = Some(SelectorMap { css_path: Some("a'b".into()), ..Default::default() });
    let script = action_script(&[row]).expect("script");
    assert!(script.contains("a\\'b"));
    assert!(script.contains("it\\'s"));
}

#[test]
fn empty_actions_is_no_data() {
    let err = action_script(&[]).expect_err("no data");
    assert_eq!(err.code, ErrorCode::NoData);
}

#[test]
fn har_log_shape() {
    let rows = vec![Row {
        seq: 0,
        inserted_at_ms: 1_700_000_000_000,
        record: NetworkBody {
            timestamp: serde_json::Value::Null,
            url: "https://api.example.com/items".into(),
            method: "POST".into(),
            status: Some(201),
            request_body: Some("{\"a\":1}".into()),
            response_body: Some("{\"id\":9}".into()),
            request_truncated: false,
            response_truncated: false,
            content_type: Some("application/json".into()),
            duration_ms: Some(12.5),
        },
    }];
    let har = har_log(&rows);
    assert_eq!(har["log"]["version"], "1.2");
    let entry = &har["log"]["entries"][0];
    assert_eq!(entry["request"]["method"], "POST");
    assert_eq!(entry["response"]["status"], 201);
    assert_eq!(entry["response"]["content"]["text"], "{\"id\":9}");
}
