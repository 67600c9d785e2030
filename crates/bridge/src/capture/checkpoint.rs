// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sequence-watermark checkpoints for change diffing.

use std::collections::HashMap;

use serde::Serialize;

use crate::capture::buffer::Row;
use crate::capture::event::{severity_rank, LogEntry};
use crate::error::{ErrorCode, ToolError};

/// Per-buffer sequence watermarks plus the wall-clock time they were taken.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Checkpoint {
    pub console_seq: u64,
    pub network_seq: u64,
    pub ws_seq: u64,
    pub action_seq: u64,
    pub timestamp_ms: u64,
}

#[derive(Debug, Default)]
pub struct CheckpointStore {
    named: HashMap<String, Checkpoint>,
    /// The anonymous checkpoint; advances after each diff against it.
    last: Option<Checkpoint>,
}

impl CheckpointStore {
    pub fn save(&mut self, name: &str, checkpoint: Checkpoint) {
        self.named.insert(name.to_owned(), checkpoint);
    }

    pub fn get(&self, name: &str) -> Option<Checkpoint> {
        self.named.get(name).copied()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.named.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn last(&self) -> Option<Checkpoint> {
        self.last
    }

    pub fn advance_last(&mut self, checkpoint: Checkpoint) {
        self.last = Some(checkpoint);
    }
}

/// Severity scoping for diff output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeverityFilter {
    #[default]
    All,
    Warnings,
    ErrorsOnly,
}

impl SeverityFilter {
    pub fn parse(value: &str) -> Result<Self, ToolError> {
        match value {
            "all" => Ok(Self::All),
            "warnings" => Ok(Self::Warnings),
            "errors_only" => Ok(Self::ErrorsOnly),
            other => Err(ErrorCode::InvalidParam
                .with_message(format!("severity must be all|warnings|errors_only, got {other:?}"))),
        }
    }

    pub fn admits(&self, level: &str) -> bool {
        match self {
            Self::All => true,
            Self::Warnings => severity_rank(level) >= 3,
            Self::ErrorsOnly => severity_rank(level) >= 4,
        }
    }
}

/// Deduplicate console rows by `(level, message)` keeping the first, then
/// order by severity (most severe first; ties keep insertion order).
pub fn dedupe_and_rank(rows: Vec<Row<LogEntry>>) -> Vec<Row<LogEntry>> {
    let mut seen = std::collections::HashSet::new();
    let mut kept: Vec<Row<LogEntry>> = rows
        .into_iter()
        .filter(|row| seen.insert((row.record.level.clone(), row.record.message.clone())))
        .collect();
    kept.sort_by(|a, b| {
        severity_rank(&b.record.level)
            .cmp(&severity_rank(&a.record.level))
            .then(a.seq.cmp(&b.seq))
    });
    kept
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;
