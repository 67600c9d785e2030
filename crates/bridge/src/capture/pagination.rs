// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Opaque-cursor pagination over sequence-numbered rows.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::capture::buffer::Row;
use crate::error::{ErrorCode, ToolError};

pub const DEFAULT_LIMIT: usize = 50;
pub const MAX_LIMIT: usize = 500;

/// Decoded cursor contents. The wire form is opaque to callers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CursorPayload {
    pub sequence_number: u64,
    pub timestamp: u64,
}

pub fn encode_cursor(sequence_number: u64, timestamp: u64) -> String {
    let payload = CursorPayload { sequence_number, timestamp };
    // Serializing a two-field numeric struct cannot fail.
    let json = serde_json::to_vec(&payload).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json)
}

pub fn decode_cursor(cursor: &str) -> Result<CursorPayload, ToolError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(cursor)
        .map_err(|_| ErrorCode::InvalidParam.with_message("cursor is not valid"))?;
    serde_json::from_slice(&bytes)
        .map_err(|_| ErrorCode::InvalidParam.with_message("cursor is not valid"))
}

#[derive(Debug, Clone, Default)]
pub struct PageOptions {
    pub after: Option<String>,
    pub before: Option<String>,
    /// Inclusive lower bound on insertion time.
    pub since_ms: Option<u64>,
    pub limit: Option<usize>,
    pub restart_on_eviction: bool,
}

#[derive(Debug, Serialize)]
pub struct PageMeta {
    pub count: usize,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_timestamp: Option<String>,
    pub has_more: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub cursor_restarted: bool,
}

/// Apply cursor/time filters and the page limit to rows already filtered by
/// the caller. `oldest_seq` is the oldest sequence still buffered; an
/// `after`/`before` cursor pointing before it has been evicted.
pub fn paginate<T: Clone>(
    rows: Vec<Row<T>>,
    oldest_seq: u64,
    opts: &PageOptions,
) -> Result<(Vec<Row<T>>, PageMeta), ToolError> {
    let mut cursor_restarted = false;

    let after = match opts.after.as_deref() {
        Some(c) => {
            let payload = decode_cursor(c)?;
            if payload.sequence_number < oldest_seq {
                if !opts.restart_on_eviction {
                    return Err(ErrorCode::CursorExpired.with_message(format!(
                        "cursor sequence {} precedes oldest buffered sequence {}",
                        payload.sequence_number, oldest_seq
                    )));
                }
                cursor_restarted = true;
                None
            } else {
                Some(payload.sequence_number)
            }
        }
        None => None,
    };

    let before = match opts.before.as_deref() {
        Some(c) => {
            let payload = decode_cursor(c)?;
            if payload.sequence_number < oldest_seq && !opts.restart_on_eviction {
                return Err(ErrorCode::CursorExpired.with_message(format!(
                    "cursor sequence {} precedes oldest buffered sequence {}",
                    payload.sequence_number, oldest_seq
                )));
            }
            Some(payload.sequence_number)
        }
        None => None,
    };

    let mut filtered: Vec<Row<T>> = rows
        .into_iter()
        .filter(|r| after.is_none_or(|seq| r.seq > seq))
        .filter(|r| before.is_none_or(|seq| r.seq < seq))
        .filter(|r| opts.since_ms.is_none_or(|since| r.inserted_at_ms >= since))
        .collect();

    let total = filtered.len();
    let limit = opts.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let has_more = total > limit;
    filtered.truncate(limit);

    let meta = PageMeta {
        count: filtered.len(),
        total,
        cursor: filtered.last().map(|r| encode_cursor(r.seq, r.inserted_at_ms)),
        oldest_timestamp: filtered.first().map(|r| crate::state::rfc3339_ms(r.inserted_at_ms)),
        newest_timestamp: filtered.last().map(|r| crate::state::rfc3339_ms(r.inserted_at_ms)),
        has_more,
        cursor_restarted,
    };
    Ok((filtered, meta))
}

#[cfg(test)]
#[path = "pagination_tests.rs"]
mod tests;
