use std::time::Duration;

use axum::{
    body::Bytes,
    extract::Path,
    http::{header, HeaderMap, Method, StatusCode},
    response::{AppendHeaders, IntoResponse},
    routing::{any, get},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Body served by `GET /bytes`. Deliberately not valid JSON or UTF-8.
pub const BYTES_FIXTURE: &[u8] = b"\x00\x01\x02 not json \xff";

pub fn json_fixture_value() -> Value {
    json!({"message": "hello", "items": [1, 2, 3]})
}

pub fn app() -> Router {
    Router::new()
        .route("/json", get(json_fixture))
        .route("/bytes", get(bytes_fixture))
        .route("/empty", get(empty_fixture))
        .route("/status/{code}", get(status_fixture))
        .route("/slow/{millis}", get(slow_fixture))
        .route("/echo", any(echo))
        .layer(TraceLayer::new_for_http())
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn json_fixture() -> Json<Value> {
    Json(json_fixture_value())
}

async fn bytes_fixture() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/octet-stream")], BYTES_FIXTURE)
}

async fn empty_fixture() -> StatusCode {
    StatusCode::OK
}

async fn status_fixture(Path(code): Path<u16>) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}

async fn slow_fixture(Path(millis): Path<u64>) -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(millis)).await;
    Json(json!({"slept_ms": millis}))
}

/// Reflect the request body byte-for-byte, with the method and selected
/// request headers copied into `x-echo-*` response headers.
async fn echo(method: Method, headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    let mut reflected = vec![("x-echo-method", method.to_string())];
    for (name, echo_name) in [
        (header::CONTENT_TYPE, "x-echo-content-type"),
        (header::AUTHORIZATION, "x-echo-authorization"),
    ] {
        if let Some(value) = headers.get(&name).and_then(|v| v.to_str().ok()) {
            reflected.push((echo_name, value.to_string()));
        }
    }
    (StatusCode::OK, AppendHeaders(reflected), body)
}
