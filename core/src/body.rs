//! Request and response payloads.
//!
//! # Design
//! Both directions treat JSON as a best-effort upgrade over raw bytes.
//! Outgoing, a JSON body that fails to serialize is replaced by an empty
//! payload; incoming, bytes that fail to parse stay raw. Neither failure is
//! reported through the transport error field.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::http::{HttpRequest, CONTENT_TYPE, JSON_CONTENT_TYPE};

/// A classified response payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Body {
    Bytes(Vec<u8>),
    Json(Value),
    #[default]
    Empty,
}

impl Body {
    /// Classify bytes returned by a transport.
    ///
    /// Resolution order: no bytes (or zero bytes) is `Empty`; bytes that parse
    /// as JSON are `Json`; anything else is `Bytes`.
    pub fn classify(bytes: Option<Vec<u8>>) -> Self {
        let bytes = match bytes {
            Some(b) if !b.is_empty() => b,
            _ => return Body::Empty,
        };
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(value) => Body::Json(value),
            Err(err) => {
                tracing::trace!(len = bytes.len(), error = %err, "response body is not JSON, keeping raw bytes");
                Body::Bytes(bytes)
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Body::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Body::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

/// A value that can be written as a JSON request body.
///
/// Implemented for every `Serialize` type; boxed inside `RequestBody::Json`
/// so serialization happens at dispatch time.
pub trait JsonPayload: Send + Sync {
    fn to_json_vec(&self) -> serde_json::Result<Vec<u8>>;
}

impl<T: Serialize + Send + Sync> JsonPayload for T {
    fn to_json_vec(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// An outgoing payload.
#[derive(Default)]
pub enum RequestBody {
    Bytes(Vec<u8>),
    Json(Box<dyn JsonPayload>),
    #[default]
    Empty,
}

impl RequestBody {
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        RequestBody::Bytes(bytes.into())
    }

    pub fn json<T: Serialize + Send + Sync + 'static>(value: T) -> Self {
        RequestBody::Json(Box::new(value))
    }

    /// Write this payload into `request`.
    ///
    /// Returns the serialization error when a JSON body could not be
    /// encoded; the request then carries no payload and no forced
    /// content type.
    pub(crate) fn apply_to(self, request: &mut HttpRequest) -> Option<ApiError> {
        match self {
            RequestBody::Bytes(bytes) => {
                request.body = Some(bytes);
                None
            }
            RequestBody::Json(value) => match value.to_json_vec() {
                Ok(bytes) => {
                    request.body = Some(bytes);
                    request.set_header(CONTENT_TYPE, JSON_CONTENT_TYPE);
                    None
                }
                Err(err) => {
                    tracing::warn!(
                        url = %request.url,
                        error = %err,
                        "JSON request body failed to serialize, sending empty payload"
                    );
                    request.body = None;
                    Some(ApiError::Encode(err.to_string()))
                }
            },
            RequestBody::Empty => {
                request.body = None;
                None
            }
        }
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestBody::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            RequestBody::Json(_) => f.write_str("Json(..)"),
            RequestBody::Empty => f.write_str("Empty"),
        }
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self {
        RequestBody::Bytes(bytes)
    }
}

impl From<&[u8]> for RequestBody {
    fn from(bytes: &[u8]) -> Self {
        RequestBody::Bytes(bytes.to_vec())
    }
}

impl From<Value> for RequestBody {
    fn from(value: Value) -> Self {
        RequestBody::json(value)
    }
}
