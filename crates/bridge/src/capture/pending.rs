// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rendezvous between synchronous tool calls and the polling extension.
//!
//! A tool call creates a pending query and holds a one-shot receiver; the
//! extension discovers the query via `/pending-queries` and posts the result
//! back by id. Delivery is at-most-once: the queue entry is removed when the
//! result is taken, and a second delivery for the same id reports unknown.
//!
//! The one-shot sender doubles as the waker the condvar design note calls
//! for: dropping it (reaper, eviction) wakes the waiter immediately instead
//! of letting it run out its timeout.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::oneshot;

/// Result posted by the extension: payload on success, message on failure.
pub type Outcome = Result<serde_json::Value, String>;

/// The bus is at its max-pending bound; new queries are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusFull;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingQuery {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub params: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(skip)]
    pub created_ms: u64,
    #[serde(skip)]
    pub expires_ms: u64,
}

#[derive(Debug)]
pub struct PendingQueryBus {
    queue: Vec<PendingQuery>,
    waiters: HashMap<String, oneshot::Sender<Outcome>>,
    max_pending: usize,
}

impl PendingQueryBus {
    pub fn new(max_pending: usize) -> Self {
        Self { queue: Vec::new(), waiters: HashMap::new(), max_pending }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Enqueue a query for the extension. Returns the assigned id and the
    /// receiver the caller awaits.
    pub fn create(
        &mut self,
        kind: &str,
        params: serde_json::Value,
        correlation_id: Option<String>,
        timeout_ms: u64,
        now_ms: u64,
    ) -> Result<(String, oneshot::Receiver<Outcome>), BusFull> {
        if self.queue.len() >= self.max_pending {
            return Err(BusFull);
        }
        let id = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        self.queue.push(PendingQuery {
            id: id.clone(),
            kind: kind.to_owned(),
            params,
            correlation_id,
            created_ms: now_ms,
            expires_ms: now_ms + timeout_ms,
        });
        self.waiters.insert(id.clone(), tx);
        Ok((id, rx))
    }

    /// Non-destructive snapshot for extension polling.
    pub fn snapshot(&self) -> Vec<PendingQuery> {
        self.queue.clone()
    }

    /// Remove the query and hand back its metadata plus the waiter's sender
    /// (absent when the waiter already gave up).
    pub fn take(&mut self, id: &str) -> Option<(PendingQuery, Option<oneshot::Sender<Outcome>>)> {
        let pos = self.queue.iter().position(|q| q.id == id)?;
        let query = self.queue.remove(pos);
        let sender = self.waiters.remove(id);
        Some((query, sender))
    }

    /// Drop a query a caller abandoned (timeout fired before delivery).
    pub fn abandon(&mut self, id: &str) {
        self.queue.retain(|q| q.id != id);
        self.waiters.remove(id);
    }

    /// Remove expired queries; dropping their senders wakes any waiters.
    pub fn reap(&mut self, now_ms: u64) -> usize {
        let expired: Vec<String> = self
            .queue
            .iter()
            .filter(|q| q.expires_ms <= now_ms)
            .map(|q| q.id.clone())
            .collect();
        for id in &expired {
            self.queue.retain(|q| q.id != *id);
            self.waiters.remove(id);
        }
        expired.len()
    }
}

#[cfg(test)]
#[path = "pending_tests.rs"]
mod tests;
