// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn ws_event(id: &str, event: &str) -> WebSocketEvent {
    WebSocketEvent {
        timestamp: serde_json::Value::Null,
        url: Some("wss://feed.example.com/live".into()),
        connection_id: Some(id.into()),
        event: event.into(),
        direction: None,
        size: None,
        data: None,
        code: None,
        reason: None,
        sampling: None,
    }
}

fn message(id: &str, direction: &str, size: u64) -> WebSocketEvent {
    WebSocketEvent {
        direction: Some(direction.into()),
        size: Some(size),
        data: Some("payload".into()),
        ..ws_event(id, "message")
    }
}

#[test]
fn open_message_close_lifecycle() {
    let mut tracker = ConnectionTracker::new(10, 5);
    tracker.apply(&ws_event("c1", "open"), 1000);
    tracker.apply(&message("c1", "incoming", 42), 2000);
    tracker.apply(&message("c1", "outgoing", 7), 2500);

    let conn = tracker.get("c1").expect("active");
    assert_eq!(conn.state, ConnState::Open);
    assert_eq!(conn.incoming.total, 1);
    assert_eq!(conn.incoming.bytes, 42);
    assert_eq!(conn.outgoing.total, 1);

    tracker.apply(&ws_event("c1", "close"), 5000);
    assert!(tracker.get("c1").is_none());
    assert_eq!(tracker.closed_count(), 1);
    assert_eq!(tracker.active_count(), 0);
}

#[test]
fn error_then_close_moves_to_history() {
    let mut tracker = ConnectionTracker::new(10, 5);
    tracker.apply(&ws_event("c1", "open"), 0);
    tracker.apply(&ws_event("c1", "error"), 100);
    assert_eq!(tracker.get("c1").map(|c| c.state), Some(ConnState::Error));
    tracker.apply(&ws_event("c1", "close"), 200);
    assert_eq!(tracker.closed_count(), 1);
}

#[test]
fn unknown_ids_are_ignored() {
    let mut tracker = ConnectionTracker::new(10, 5);
    tracker.apply(&message("ghost", "incoming", 10), 100);
    tracker.apply(&ws_event("ghost", "close"), 200);
    assert_eq!(tracker.active_count(), 0);
    assert_eq!(tracker.closed_count(), 0);
}

#[test]
fn capacity_evicts_oldest_by_insertion() {
    let mut tracker = ConnectionTracker::new(2, 5);
    tracker.apply(&ws_event("a", "open"), 0);
    tracker.apply(&ws_event("b", "open"), 1);
    tracker.apply(&ws_event("c", "open"), 2);
    assert!(tracker.get("a").is_none());
    assert!(tracker.get("b").is_some());
    assert!(tracker.get("c").is_some());
}

#[test]
fn closed_history_is_bounded() {
    let mut tracker = ConnectionTracker::new(10, 2);
    for i in 0..4 {
        let id = format!("c{i}");
        tracker.apply(&ws_event(&id, "open"), i);
        tracker.apply(&ws_event(&id, "close"), i + 10);
    }
    assert_eq!(tracker.closed_count(), 2);
    let summaries = tracker.summaries(100);
    let ids: Vec<&str> = summaries.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["c2", "c3"]);
}

#[test]
fn rate_uses_five_second_window() {
    let mut tracker = ConnectionTracker::new(10, 5);
    tracker.apply(&ws_event("c1", "open"), 0);
    for i in 0..10u64 {
        tracker.apply(&message("c1", "incoming", 1), i * 100);
    }
    let conn = tracker.get("c1").expect("active");
    // 10 messages within the window → 2.0/s.
    assert!((conn.incoming.rate(1000) - 2.0).abs() < f64::EPSILON);
    // Seven seconds later they have all aged out.
    assert!((conn.incoming.rate(8000)).abs() < f64::EPSILON);
}

#[test]
fn sampling_descriptor_marks_connection() {
    let mut tracker = ConnectionTracker::new(10, 5);
    tracker.apply(&ws_event("c1", "open"), 0);
    let ev = WebSocketEvent {
        sampling: Some(serde_json::json!({"strategy": "head", "rate": 0.1})),
        ..message("c1", "incoming", 1)
    };
    tracker.apply(&ev, 100);
    assert!(tracker.get("c1").expect("active").sampling);
}

#[parameterized(
    sub_second = { 200, "0.2s" },
    seconds = { 3000, "3s" },
    minutes = { 150_000, "2m30s" },
    exact_minutes = { 120_000, "2m" },
    hours = { 4_500_000, "1h15m" },
    exact_hours = { 3_600_000, "1h" },
)]
fn duration_formatting(ms: u64, expected: &str) {
    assert_eq!(format_duration(ms), expected);
}
