//! Request hooks applied before dispatch.
//!
//! An auth hook takes the bare request built from a URL and returns the
//! request that is actually sent. Any `Fn(HttpRequest) -> HttpRequest` works;
//! the structs below cover the common header schemes.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::http::HttpRequest;

pub const AUTHORIZATION: &str = "authorization";

pub trait AuthHook: Send + Sync {
    fn apply(&self, request: HttpRequest) -> HttpRequest;
}

impl<F> AuthHook for F
where
    F: Fn(HttpRequest) -> HttpRequest + Send + Sync,
{
    fn apply(&self, request: HttpRequest) -> HttpRequest {
        self(request)
    }
}

/// Identity hook; the default when none is given.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuth;

impl AuthHook for NoAuth {
    fn apply(&self, request: HttpRequest) -> HttpRequest {
        request
    }
}

/// `Authorization: Bearer <token>`
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl AuthHook for BearerToken {
    fn apply(&self, request: HttpRequest) -> HttpRequest {
        request.with_header(AUTHORIZATION, format!("Bearer {}", self.0))
    }
}

/// `Authorization: Basic base64(username:password)`
#[derive(Debug, Clone)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl AuthHook for BasicAuth {
    fn apply(&self, request: HttpRequest) -> HttpRequest {
        let credentials = format!("{}:{}", self.username, self.password);
        let encoded = STANDARD.encode(credentials.as_bytes());
        request.with_header(AUTHORIZATION, format!("Basic {encoded}"))
    }
}

/// A single custom header, e.g. `X-API-Key`.
#[derive(Debug, Clone)]
pub struct HeaderAuth {
    pub name: String,
    pub value: String,
}

impl HeaderAuth {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl AuthHook for HeaderAuth {
    fn apply(&self, request: HttpRequest) -> HttpRequest {
        request.with_header(self.name.clone(), self.value.clone())
    }
}
