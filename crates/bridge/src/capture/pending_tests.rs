// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn result_is_delivered_exactly_once() {
    let mut bus = PendingQueryBus::new(4);
    let (id, rx) = bus
        .create("dom", serde_json::json!({"selector": ".btn"}), None, 10_000, 0)
        .expect("create");

    let (query, sender) = bus.take(&id).expect("take");
    assert_eq!(query.kind, "dom");
    sender.expect("waiter present").send(Ok(serde_json::json!({"ok": true}))).expect("send");

    let outcome = rx.await.expect("recv");
    assert_eq!(outcome.expect("ok")["ok"], true);

    // The entry is gone; a second delivery reports unknown.
    assert!(bus.take(&id).is_none());
}

#[test]
fn create_rejects_when_full() {
    let mut bus = PendingQueryBus::new(2);
    bus.create("dom", serde_json::Value::Null, None, 1000, 0).expect("first");
    bus.create("dom", serde_json::Value::Null, None, 1000, 0).expect("second");
    assert!(bus.create("dom", serde_json::Value::Null, None, 1000, 0).is_err());
    assert_eq!(bus.len(), 2);
}

#[test]
fn snapshot_is_non_destructive() {
    let mut bus = PendingQueryBus::new(4);
    let (id, _rx) =
        bus.create("a11y", serde_json::json!({"scope": "main"}), Some("corr-1".into()), 1000, 0)
            .expect("create");
    let snap = bus.snapshot();
    assert_eq!(snap.len(), 1);
    assert_eq!(snap[0].id, id);
    assert_eq!(snap[0].correlation_id.as_deref(), Some("corr-1"));
    assert_eq!(bus.len(), 1);
}

#[tokio::test]
async fn reap_wakes_expired_waiters() {
    let mut bus = PendingQueryBus::new(4);
    let (_id, rx) = bus.create("dom", serde_json::Value::Null, None, 1000, 0).expect("create");
    assert_eq!(bus.reap(500), 0);
    assert_eq!(bus.reap(1000), 1);
    assert!(bus.is_empty());
    // The dropped sender surfaces as a receive error, not a hang.
    assert!(rx.await.is_err());
}

#[test]
fn snapshot_serializes_extension_shape() {
    let mut bus = PendingQueryBus::new(4);
    bus.create("dom", serde_json::json!({"selector": "#x"}), Some("c9".into()), 1000, 0)
        .expect("create");
    let json = serde_json::to_value(bus.snapshot()).expect("serialize");
    let q = &json[0];
    assert!(q["id"].is_string());
    assert_eq!(q["type"], "dom");
    assert_eq!(q["correlationId"], "c9");
    assert!(q.get("createdMs").is_none());
}
