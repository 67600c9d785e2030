// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine-readable error codes shared by the HTTP ingest surface and the
/// tool dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidJson,
    MissingParam,
    InvalidParam,
    UnknownMode,
    NoData,
    NotInitialized,
    ExtTimeout,
    ExtError,
    RateLimited,
    CursorExpired,
    Internal,
    MarshalFailed,
    PilotDisabled,
    MemoryExceeded,
    UnknownId,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidJson => "invalid_json",
            Self::MissingParam => "missing_param",
            Self::InvalidParam => "invalid_param",
            Self::UnknownMode => "unknown_mode",
            Self::NoData => "no_data",
            Self::NotInitialized => "not_initialized",
            Self::ExtTimeout => "ext_timeout",
            Self::ExtError => "ext_error",
            Self::RateLimited => "rate_limited",
            Self::CursorExpired => "cursor_expired",
            Self::Internal => "internal",
            Self::MarshalFailed => "marshal_failed",
            Self::PilotDisabled => "pilot_disabled",
            Self::MemoryExceeded => "memory_exceeded",
            Self::UnknownId => "unknown_id",
        }
    }

    /// Whether a caller should retry the same call unchanged.
    pub fn retryable(&self) -> bool {
        matches!(self, Self::ExtTimeout | Self::ExtError | Self::RateLimited)
    }

    /// Short guidance appended to error payloads.
    pub fn retry_hint(&self) -> &'static str {
        match self {
            Self::InvalidJson => "fix the request body and resend",
            Self::MissingParam | Self::InvalidParam => "fix the parameters and resend",
            Self::UnknownMode => "use one of the documented modes",
            Self::NoData => "capture some traffic first, then retry",
            Self::NotInitialized => "initialize the session, then retry",
            Self::ExtTimeout => "retry once the extension reconnects",
            Self::ExtError => "retry; the extension reported a transient failure",
            Self::RateLimited => "back off and retry after the window clears",
            Self::CursorExpired => "retry with a fresh cursor or restart_on_eviction=true",
            Self::Internal => "do not retry; report this as a bug",
            Self::MarshalFailed => "do not retry; report this as a bug",
            Self::PilotDisabled => "start the bridge with --allow-pilot to enable this",
            Self::MemoryExceeded => "wait for eviction to reclaim memory, then retry",
            Self::UnknownId => "the id is not pending; poll /pending-queries for current ids",
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::InvalidJson | Self::MissingParam | Self::InvalidParam | Self::UnknownMode => {
                StatusCode::BAD_REQUEST
            }
            Self::NoData | Self::UnknownId => StatusCode::NOT_FOUND,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::MemoryExceeded => StatusCode::SERVICE_UNAVAILABLE,
            Self::ExtTimeout => StatusCode::GATEWAY_TIMEOUT,
            Self::ExtError => StatusCode::BAD_GATEWAY,
            Self::NotInitialized | Self::PilotDisabled => StatusCode::FORBIDDEN,
            Self::CursorExpired => StatusCode::GONE,
            Self::Internal | Self::MarshalFailed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_error_body(&self, message: impl Into<String>) -> ErrorBody {
        ErrorBody {
            error: self.as_str().to_owned(),
            message: message.into(),
            retry: self.retry_hint().to_owned(),
            retryable: self.retryable(),
        }
    }

    pub fn to_http_response(&self, message: impl Into<String>) -> (StatusCode, Json<ErrorBody>) {
        (self.http_status(), Json(self.to_error_body(message)))
    }

    /// Build a tool-layer error with an attached message.
    pub fn with_message(self, message: impl Into<String>) -> ToolError {
        ToolError { code: self, message: message.into() }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured error payload used by both surfaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    pub retry: String,
    pub retryable: bool,
}

/// A tool-call failure: code plus human-readable context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolError {
    pub code: ErrorCode,
    pub message: String,
}

impl ToolError {
    pub fn to_error_body(&self) -> ErrorBody {
        self.code.to_error_body(self.message.clone())
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
