//! The network seam.
//!
//! # Design
//! `Transport::execute` returns the same three-part outcome a platform data
//! task hands its completion: optional bytes, optional response metadata,
//! optional error. It never fails with `Err`, and it never turns an HTTP
//! status into an error. `ReqwestTransport` is the default; tests plug in
//! in-memory implementations.

use async_trait::async_trait;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Raw outcome of one exchange, before body classification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Exchange {
    pub bytes: Option<Vec<u8>>,
    pub response: Option<HttpResponse>,
    pub error: Option<ApiError>,
}

impl Exchange {
    pub fn completed(response: HttpResponse, bytes: Vec<u8>) -> Self {
        Self {
            bytes: Some(bytes),
            response: Some(response),
            error: None,
        }
    }

    pub fn failed(error: ApiError) -> Self {
        Self {
            bytes: None,
            response: None,
            error: Some(error),
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Exchange;
}

/// Transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, ApiError> {
        Self::from_config(&ClientConfig::default())
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = config.connect_timeout() {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ApiError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Exchange {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let mut builder = self.client.request(reqwest_method(method), url);
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) => return Exchange::failed(err.into()),
        };

        let head = HttpResponse {
            status: response.status().as_u16(),
            url: response.url().to_string(),
            headers: response
                .headers()
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_string(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
                .collect(),
        };

        match response.bytes().await {
            Ok(bytes) => Exchange::completed(head, bytes.to_vec()),
            Err(err) => Exchange {
                bytes: None,
                response: Some(head),
                error: Some(err.into()),
            },
        }
    }
}
