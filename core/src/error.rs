//! Error types for the request executor.
//!
//! # Design
//! Transport failures and HTTP status are kept on separate variants and are
//! never folded together: the executor only ever reports `Transport` (or
//! `Cancelled`) through `ApiResponse::error`. `Status` exists for callers
//! that opt in through `HttpResponse::as_error`. Errors are `Clone` so a
//! completed response record can be duplicated freely.

use std::fmt;

use thiserror::Error;

/// Broad category of a transport-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// DNS resolution, connection refused, TLS handshake.
    Connect,
    Timeout,
    /// The request could not be built or written.
    Request,
    /// The response body could not be read.
    Body,
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportErrorKind::Connect => "connect",
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Request => "request",
            TransportErrorKind::Body => "body",
            TransportErrorKind::Other => "other",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The exchange failed before a usable server response was obtained.
    #[error("transport error ({kind}): {message}")]
    Transport {
        kind: TransportErrorKind,
        message: String,
    },

    /// The server answered with a status other than 200.
    #[error("HTTP status {status}")]
    Status { status: u16 },

    /// The exchange was cancelled through its task handle, or its runtime
    /// went away before it finished.
    #[error("request cancelled")]
    Cancelled,

    /// A JSON request body could not be serialized.
    #[error("request body could not be encoded as JSON: {0}")]
    Encode(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("unknown HTTP method: {0}")]
    InvalidMethod(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// No async runtime could be found or built.
    #[error("runtime unavailable: {0}")]
    Runtime(String),
}

impl ApiError {
    pub fn transport(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        ApiError::Transport {
            kind,
            message: message.into(),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport { .. })
    }

    pub fn transport_kind(&self) -> Option<TransportErrorKind> {
        match self {
            ApiError::Transport { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Status code carried by a `Status` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            TransportErrorKind::Connect
        } else if err.is_body() || err.is_decode() {
            TransportErrorKind::Body
        } else if err.is_request() || err.is_builder() || err.is_redirect() {
            TransportErrorKind::Request
        } else {
            TransportErrorKind::Other
        };
        ApiError::transport(kind, err.to_string())
    }
}
