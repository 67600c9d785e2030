// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sliding-window rate counter with a circuit breaker.
//!
//! The window is one second. The circuit opens after five consecutive
//! over-threshold seconds (or when memory passes the hard limit) and closes
//! only after the rate has stayed under threshold for ten seconds with memory
//! back under the floor. The asymmetry is the hysteresis that keeps the
//! breaker from flapping under a bursty source.

use serde::Serialize;

use crate::capture::memory::{CIRCUIT_CLOSE_FLOOR, HARD_LIMIT};

pub const WINDOW_MS: u64 = 1000;
pub const OPEN_STREAK: u32 = 5;
pub const CLOSE_HOLD_MS: u64 = 10_000;

#[derive(Debug, Serialize)]
pub struct AdmissionGate {
    limit: u32,
    window_start_ms: u64,
    window_count: u32,
    streak_over_limit: u32,
    first_below_threshold_ms: Option<u64>,
    pub circuit_open: bool,
    pub circuit_opened_ms: u64,
    pub circuit_reason: Option<String>,
}

impl AdmissionGate {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            window_start_ms: 0,
            window_count: 0,
            streak_over_limit: 0,
            first_below_threshold_ms: None,
            circuit_open: false,
            circuit_opened_ms: 0,
            circuit_reason: None,
        }
    }

    /// Record `count` arriving events and report whether ingestion is
    /// permitted. Attempts are counted even while the circuit is open so a
    /// continuing flood keeps it open.
    pub fn record_and_recheck(&mut self, count: u32, now_ms: u64, total_memory: usize) -> bool {
        if self.window_start_ms == 0 {
            self.window_start_ms = now_ms;
        }
        self.roll_window(now_ms);

        if !self.circuit_open && self.streak_over_limit >= OPEN_STREAK {
            self.open(now_ms, "rate_limit_exceeded");
        }
        if !self.circuit_open && total_memory > HARD_LIMIT {
            self.open(now_ms, "memory_exceeded");
        }
        if self.circuit_open && self.may_close(now_ms, total_memory) {
            self.close();
        }

        self.window_count = self.window_count.saturating_add(count);
        // Over-limit traffic inside the current window is refused right away;
        // the breaker itself only advances on window boundaries.
        !self.circuit_open && self.window_count <= self.limit
    }

    /// Open the circuit for a reason decided outside the gate (memory checks
    /// run before admission on the ingest path).
    pub fn open(&mut self, now_ms: u64, reason: &str) {
        if !self.circuit_open {
            self.circuit_open = true;
            self.circuit_opened_ms = now_ms;
            self.circuit_reason = Some(reason.to_owned());
            tracing::warn!(reason, "admission circuit opened");
        }
    }

    pub fn over_threshold_streak(&self) -> u32 {
        self.streak_over_limit
    }

    fn close(&mut self) {
        self.circuit_open = false;
        self.circuit_reason = None;
        self.streak_over_limit = 0;
        tracing::info!("admission circuit closed");
    }

    fn may_close(&self, now_ms: u64, total_memory: usize) -> bool {
        if total_memory >= CIRCUIT_CLOSE_FLOOR {
            return false;
        }
        if self.window_count > self.limit {
            return false;
        }
        self.first_below_threshold_ms
            .is_some_and(|since| now_ms.saturating_sub(since) >= CLOSE_HOLD_MS)
    }

    /// Advance window boundaries, folding in any fully idle windows.
    fn roll_window(&mut self, now_ms: u64) {
        let elapsed = now_ms.saturating_sub(self.window_start_ms);
        if elapsed < WINDOW_MS {
            return;
        }

        let over = self.window_count > self.limit;
        if over {
            self.streak_over_limit += 1;
            self.first_below_threshold_ms = None;
        } else {
            self.streak_over_limit = 0;
            if self.first_below_threshold_ms.is_none() {
                self.first_below_threshold_ms = Some(self.window_start_ms + WINDOW_MS);
            }
        }

        // Windows with no traffic at all count as under-threshold seconds.
        if elapsed >= 2 * WINDOW_MS && over {
            self.streak_over_limit = 0;
            self.first_below_threshold_ms = Some(self.window_start_ms + 2 * WINDOW_MS);
        }

        self.window_start_ms = now_ms - (elapsed % WINDOW_MS);
        self.window_count = 0;
    }
}

#[cfg(test)]
#[path = "admission_tests.rs"]
mod tests;
