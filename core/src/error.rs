//! Error types for the board client.
//!
//! # Design
//! `Unauthorized` and `Retryable` get dedicated variants because callers
//! react to them differently from other failures: the first means "show no
//! data", the second means "try again later". Everything else the remote
//! side reports lands in `Remote` or `Http` with the raw detail kept for
//! debugging.

use thiserror::Error;

/// Errors returned by `BoardClient` parse methods.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The API rejected the token (HTTP 401/403 or `status_code: 403`).
    #[error("not authorized")]
    Unauthorized,

    /// Complexity budget or rate limit exhausted; the request may be retried.
    #[error("retryable API error {code}: {message}")]
    Retryable { code: String, message: String },

    /// The API answered 200 but reported an error in the body.
    #[error("API error {code}: {message}")]
    Remote { code: String, message: String },

    /// Non-200 status not covered by the variants above.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("transport failed: {0}")]
    Transport(#[from] TransportError),
}

/// Failure raised by a `Transport` before any response was received.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors from the title-based lookups in `mapper`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapperError {
    #[error("item {item_id} has no column titled {title:?}")]
    MissingColumn { item_id: String, title: String },

    #[error("item name must not be blank")]
    BlankName,
}

/// Configuration problems detected before any request is built.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no board configured; set MONDAY_BOARD_ID")]
    NotConfigured,

    #[error("invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}
