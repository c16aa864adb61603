//! Stable error payload crossing the runtime boundary.
//!
//! Frontends match on `category` and `code`, never on message text, so both
//! are part of the contract and stay snake_case and immutable.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse-grained failure class, used for frontend messaging decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The request itself was malformed or refused; retrying unchanged won't help.
    Config,
    /// The server or the path to it misbehaved.
    Network,
    /// The server asked us to slow down.
    RateLimited,
    /// The payload was too large for the server to accept.
    Payload,
    /// A wire frame or response body failed to parse.
    Serialization,
    /// A bug on our side of the boundary.
    Internal,
}

/// Error payload with a stable machine-readable code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{code}: {message}")]
pub struct ClientError {
    pub category: ErrorCategory,
    pub code: String,
    pub message: String,
}

impl ClientError {
    pub fn new(
        category: ErrorCategory,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Builds the canonical error for a non-success HTTP status.
    pub fn http_status(status: u16, message: impl Into<String>) -> Self {
        Self::new(
            classify_http_status(status),
            format!("http_{status}"),
            message,
        )
    }
}

/// Maps an HTTP status to the category frontends should treat it as.
pub fn classify_http_status(status: u16) -> ErrorCategory {
    match status {
        408 | 429 => ErrorCategory::RateLimited,
        413 => ErrorCategory::Payload,
        400..=499 => ErrorCategory::Config,
        500..=599 => ErrorCategory::Network,
        _ => ErrorCategory::Internal,
    }
}
