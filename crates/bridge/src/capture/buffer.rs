// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded insertion-ordered buffer with monotonic sequence numbers.
//!
//! Records and insertion timestamps are kept as parallel vectors. Trimming
//! copies the surviving tail into a fresh allocation so the old backing
//! array is actually released rather than pinned by a shrunk `Vec`.

use std::mem;

/// A record together with its stable sequence number and insertion time.
#[derive(Debug, Clone)]
pub struct Row<T> {
    pub seq: u64,
    pub inserted_at_ms: u64,
    pub record: T,
}

#[derive(Debug)]
pub struct EventBuffer<T> {
    records: Vec<T>,
    inserted_at: Vec<u64>,
    total_added: u64,
    capacity: usize,
    ttl_ms: u64,
}

impl<T: Clone> EventBuffer<T> {
    /// `ttl_ms == 0` disables expiry.
    pub fn new(capacity: usize, ttl_ms: u64) -> Self {
        Self { records: Vec::new(), inserted_at: Vec::new(), total_added: 0, capacity, ttl_ms }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn total_added(&self) -> u64 {
        self.total_added
    }

    /// Sequence number of the oldest buffered record.
    pub fn first_seq(&self) -> u64 {
        self.total_added - self.records.len() as u64
    }

    /// Configured max, halved while minimal mode is active.
    pub fn effective_capacity(&self, minimal_mode: bool) -> usize {
        if minimal_mode {
            (self.capacity / 2).max(1)
        } else {
            self.capacity
        }
    }

    /// Append records, trimming to the effective capacity. Returns the
    /// evicted records, oldest first, so the caller can settle memory totals.
    pub fn add(&mut self, items: Vec<T>, now_ms: u64, minimal_mode: bool) -> Vec<T> {
        let n = items.len();
        self.records.extend(items);
        self.inserted_at.extend(std::iter::repeat_n(now_ms, n));
        self.total_added += n as u64;

        let cap = self.effective_capacity(minimal_mode);
        let evicted = if self.records.len() > cap {
            self.trim_front(self.records.len() - cap)
        } else {
            Vec::new()
        };
        self.check_parallel();
        evicted
    }

    /// Remove the oldest `len/denominator` records (at least one). Returns
    /// the evicted records.
    pub fn evict_fraction(&mut self, denominator: usize) -> Vec<T> {
        if self.records.is_empty() {
            return Vec::new();
        }
        let n = (self.records.len() / denominator).max(1).min(self.records.len());
        let evicted = self.trim_front(n);
        self.check_parallel();
        evicted
    }

    /// Remove records whose TTL has lapsed. Expired records form a prefix
    /// because insertion times are monotonic.
    pub fn sweep_expired(&mut self, now_ms: u64) -> Vec<T> {
        let Some(cutoff) = self.ttl_cutoff(now_ms) else {
            return Vec::new();
        };
        let n = self.inserted_at.iter().take_while(|&&at| at < cutoff).count();
        if n == 0 {
            return Vec::new();
        }
        let evicted = self.trim_front(n);
        self.check_parallel();
        evicted
    }

    /// Release all storage. `total_added` is preserved so sequence numbers
    /// stay monotonic across clears.
    pub fn clear(&mut self) -> usize {
        let n = self.records.len();
        self.records = Vec::new();
        self.inserted_at = Vec::new();
        n
    }

    /// Snapshot rows in insertion order, dropping TTL-expired entries.
    pub fn rows(&self, now_ms: u64) -> Vec<Row<T>> {
        let cutoff = self.ttl_cutoff(now_ms).unwrap_or(0);
        let first = self.first_seq();
        self.records
            .iter()
            .zip(self.inserted_at.iter())
            .enumerate()
            .filter(|(_, (_, &at))| at >= cutoff)
            .map(|(i, (record, &at))| Row {
                seq: first + i as u64,
                inserted_at_ms: at,
                record: record.clone(),
            })
            .collect()
    }

    /// Rows added strictly after the given sequence watermark.
    pub fn rows_since(&self, watermark: u64, now_ms: u64) -> Vec<Row<T>> {
        let mut rows = self.rows(now_ms);
        rows.retain(|r| r.seq >= watermark);
        rows
    }

    fn ttl_cutoff(&self, now_ms: u64) -> Option<u64> {
        if self.ttl_ms == 0 {
            None
        } else {
            Some(now_ms.saturating_sub(self.ttl_ms))
        }
    }

    /// Drop the oldest `n` entries, re-homing survivors in fresh vectors.
    fn trim_front(&mut self, n: usize) -> Vec<T> {
        let tail = self.records.split_off(n);
        let evicted = mem::replace(&mut self.records, tail);
        let at_tail = self.inserted_at.split_off(n);
        self.inserted_at = at_tail;
        evicted
    }

    /// Parallel-slice mismatch is an internal invariant violation.
    fn check_parallel(&self) {
        assert_eq!(
            self.records.len(),
            self.inserted_at.len(),
            "record/timestamp slices diverged"
        );
    }
}

#[cfg(test)]
#[path = "buffer_tests.rs"]
mod tests;
