// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    ext_timeout = { ErrorCode::ExtTimeout, true },
    ext_error = { ErrorCode::ExtError, true },
    rate_limited = { ErrorCode::RateLimited, true },
    internal = { ErrorCode::Internal, false },
    marshal_failed = { ErrorCode::MarshalFailed, false },
    cursor_expired = { ErrorCode::CursorExpired, false },
    pilot_disabled = { ErrorCode::PilotDisabled, false },
)]
fn retryable_derivation(code: ErrorCode, expected: bool) {
    assert_eq!(code.retryable(), expected);
}

#[test]
fn codes_serialize_snake_case() {
    let body = ErrorCode::CursorExpired.to_error_body("cursor points before the oldest record");
    let json = serde_json::to_value(&body).expect("serialize");
    assert_eq!(json["error"], "cursor_expired");
    assert_eq!(json["retryable"], false);
    assert!(json["message"].as_str().expect("message").contains("oldest"));
}

#[test]
fn http_status_mapping() {
    assert_eq!(ErrorCode::RateLimited.http_status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(ErrorCode::MemoryExceeded.http_status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(ErrorCode::InvalidJson.http_status(), StatusCode::BAD_REQUEST);
    assert_eq!(ErrorCode::UnknownId.http_status(), StatusCode::NOT_FOUND);
}

#[test]
fn tool_error_display_includes_code_and_message() {
    let err = ErrorCode::MissingParam.with_message("what is required");
    assert_eq!(err.to_string(), "missing_param: what is required");
}
