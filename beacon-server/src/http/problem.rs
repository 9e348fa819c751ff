//! Problem documents (RFC 7807) for failing API calls.
//!
//! Every error leaves the server as `application/problem+json`. The `code` member is one of a
//! closed set of [`ErrorCode`]s so clients can branch on it without parsing prose.

use std::fmt;

use axum::http::StatusCode;
use serde::Serialize;
use serde_json::Value;

pub const PROBLEM_JSON: &str = "application/problem+json";

const PROBLEM_BASE: &str = "https://beacon.dev/problems/";

/// Stable machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    ValidationFailed,
    StoreUnavailable,
    InternalError,
}

impl ErrorCode {
    pub const fn status(self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::ValidationFailed => StatusCode::BAD_REQUEST,
            Self::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::ValidationFailed => "validation_failed",
            Self::StoreUnavailable => "store_unavailable",
            Self::InternalError => "internal_error",
        }
    }

    /// Short human summary, stable per code.
    pub const fn title(self) -> &'static str {
        match self {
            Self::Unauthorized => "Missing or invalid principal",
            Self::ValidationFailed => "Request rejected",
            Self::StoreUnavailable => "Notification store unavailable",
            Self::InternalError => "Internal error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub problem_type: String,
    pub title: &'static str,
    pub status: u16,
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ProblemDetails {
    pub fn new(code: ErrorCode, message: String, details: Option<Value>) -> Self {
        Self {
            problem_type: format!("{PROBLEM_BASE}{code}"),
            title: code.title(),
            status: code.status().as_u16(),
            code,
            message,
            details,
        }
    }
}
