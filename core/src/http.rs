//! HTTP request and response descriptors.
//!
//! # Design
//! These types describe an exchange as plain data. `HttpRequest` is what an
//! auth hook receives and returns, so it is an owned value with public fields
//! rather than a wrapper around the transport's own request type. Headers are
//! an ordered list of pairs; lookups ignore ASCII case.

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::body::Body;
use crate::error::ApiError;

pub const CONTENT_TYPE: &str = "content-type";
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 4] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
    ];

    /// The uppercase token written on the request line.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| ApiError::InvalidMethod(s.to_string()))
    }
}

/// An HTTP request described as plain data.
///
/// Built from a URL (optionally passed through an auth hook) and handed to a
/// `RequestExecutor`, which sets the method and payload before dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// A bare GET request for `url` with no headers and no body.
    pub fn new(url: Url) -> Self {
        Self {
            method: HttpMethod::default(),
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    /// Parse an absolute `http` or `https` URL into a bare request.
    pub fn parse(url: &str) -> Result<Self, ApiError> {
        let url = Url::parse(url).map_err(|e| ApiError::InvalidUrl(format!("{url}: {e}")))?;
        match url.scheme() {
            "http" | "https" => Ok(Self::new(url)),
            other => Err(ApiError::InvalidUrl(format!("unsupported scheme `{other}`"))),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Set `name` to `value`, replacing any existing header of that name.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.headers.iter().position(|(k, _)| k.eq_ignore_ascii_case(&name)) {
            Some(idx) => {
                self.headers[idx].1 = value;
                let mut i = idx + 1;
                while i < self.headers.len() {
                    if self.headers[i].0.eq_ignore_ascii_case(&name) {
                        self.headers.remove(i);
                    } else {
                        i += 1;
                    }
                }
            }
            None => self.headers.push((name, value)),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    pub fn remove_header(&mut self, name: &str) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    }
}

/// Status line and headers of a response that reached a server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Final URL after any redirects the transport followed.
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Convert any status other than exactly 200 into an error.
    ///
    /// This is opt-in: the executor never calls it, so a 404 still arrives
    /// as a normal response with `error == None`.
    pub fn as_error(&self) -> Option<ApiError> {
        if self.status == 200 {
            None
        } else {
            Some(ApiError::Status {
                status: self.status,
            })
        }
    }
}

/// The record delivered to a completion callback.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub body: Body,
    /// Present iff the exchange reached a server.
    pub response: Option<HttpResponse>,
    /// Transport failure or cancellation. Never set for HTTP status codes.
    pub error: Option<ApiError>,
    /// Set when a JSON request body failed to serialize and an empty payload
    /// was sent in its place.
    pub encode_error: Option<ApiError>,
}

impl ApiResponse {
    pub(crate) fn cancelled(encode_error: Option<ApiError>) -> Self {
        Self {
            body: Body::Empty,
            response: None,
            error: Some(ApiError::Cancelled),
            encode_error,
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.response.as_ref().map(|r| r.status)
    }

    /// Shorthand for `self.response.as_ref().and_then(HttpResponse::as_error)`.
    pub fn status_error(&self) -> Option<ApiError> {
        self.response.as_ref().and_then(HttpResponse::as_error)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.error, Some(ApiError::Cancelled))
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16) -> HttpResponse {
        HttpResponse {
            status,
            url: "http://localhost/".to_string(),
            headers: Vec::new(),
        }
    }

    #[test]
    fn method_tokens_are_uppercase_literals() {
        let tokens: Vec<&str> = HttpMethod::ALL.iter().map(HttpMethod::as_str).collect();
        assert_eq!(tokens, ["GET", "POST", "PUT", "DELETE"]);
        assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
    }

    #[test]
    fn method_parses_its_own_token() {
        for method in HttpMethod::ALL {
            assert_eq!(method.as_str().parse::<HttpMethod>().unwrap(), method);
        }
    }

    #[test]
    fn method_parse_is_case_sensitive() {
        let err = "get".parse::<HttpMethod>().unwrap_err();
        assert!(matches!(err, ApiError::InvalidMethod(ref m) if m == "get"));
        assert!("PATCH".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn default_method_is_get() {
        assert_eq!(HttpMethod::default(), HttpMethod::Get);
    }

    #[test]
    fn parse_rejects_relative_and_non_http_urls() {
        assert!(matches!(HttpRequest::parse("/items"), Err(ApiError::InvalidUrl(_))));
        assert!(matches!(
            HttpRequest::parse("ftp://example.com/file"),
            Err(ApiError::InvalidUrl(_))
        ));
    }

    #[test]
    fn parse_builds_bare_get() {
        let req = HttpRequest::parse("https://example.com/items?page=2").unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url.as_str(), "https://example.com/items?page=2");
        assert!(req.headers.is_empty());
        assert!(req.body.is_none());
    }

    #[test]
    fn set_header_replaces_case_insensitively() {
        let mut req = HttpRequest::parse("http://localhost/").unwrap();
        req.headers.push(("Accept".to_string(), "text/plain".to_string()));
        req.headers.push(("ACCEPT".to_string(), "text/html".to_string()));
        req.set_header("accept", "application/json");
        assert_eq!(req.headers, vec![("Accept".to_string(), "application/json".to_string())]);
        assert_eq!(req.header("ACCEPT"), Some("application/json"));
    }

    #[test]
    fn remove_header_drops_all_matches() {
        let mut req = HttpRequest::parse("http://localhost/")
            .unwrap()
            .with_header("X-Trace", "1")
            .with_header("Accept", "*/*");
        req.remove_header("x-trace");
        assert_eq!(req.header("x-trace"), None);
        assert_eq!(req.header("accept"), Some("*/*"));
    }

    #[test]
    fn as_error_is_none_only_for_200() {
        assert!(response(200).as_error().is_none());
        for status in [201, 204, 301, 404, 500] {
            let err = response(status).as_error().expect("non-200 must map to an error");
            assert_eq!(err.status(), Some(status));
        }
    }

    #[test]
    fn is_success_covers_2xx() {
        assert!(response(204).is_success());
        assert!(!response(301).is_success());
    }

    #[test]
    fn cancelled_record_has_no_metadata() {
        let record = ApiResponse::cancelled(None);
        assert!(record.is_cancelled());
        assert!(record.response.is_none());
        assert_eq!(record.body, Body::Empty);
        assert_eq!(record.status(), None);
        assert_eq!(record.status_error(), None);
    }
}
