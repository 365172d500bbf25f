//! One-shot asynchronous HTTP requests with callback delivery.
//!
//! # Overview
//! A `RequestExecutor` builds a request (method, URL, headers via an auth
//! hook, optional body), starts the exchange immediately on a runtime
//! worker, and hands a classified `ApiResponse` to a callback exactly once.
//! Response bytes are upgraded to JSON when they parse and kept raw when
//! they do not.
//!
//! # Design
//! - No retries, pooling policy, or timeouts of our own; the transport
//!   (reqwest by default) decides those.
//! - Transport failures land in `ApiResponse::error`. HTTP status codes are
//!   never errors unless the caller opts in with `HttpResponse::as_error`.
//! - JSON encode/decode failures are logged, not raised.
//!
//! ```no_run
//! use courier_core::{BearerToken, HttpMethod, Session};
//! use url::Url;
//!
//! let session = Session::shared()?;
//! let url = Url::parse("https://api.example.com/items").unwrap();
//! let executor = session
//!     .request(url)
//!     .method(HttpMethod::Post)
//!     .auth(BearerToken("secret".into()))
//!     .json(serde_json::json!({ "name": "widget" }))
//!     .send(|response| println!("{:?}", response.body));
//! # let _ = executor;
//! # Ok::<(), courier_core::ApiError>(())
//! ```

pub mod auth;
pub mod body;
pub mod config;
pub mod error;
pub mod executor;
pub mod http;
pub mod logging;
pub mod session;
pub mod transport;

pub use auth::{AuthHook, BasicAuth, BearerToken, HeaderAuth, NoAuth};
pub use body::{Body, JsonPayload, RequestBody};
pub use config::ClientConfig;
pub use error::{ApiError, TransportErrorKind};
pub use executor::{Completion, RequestBuilder, RequestExecutor, TaskHandle};
pub use http::{ApiResponse, HttpMethod, HttpRequest, HttpResponse};
pub use session::Session;
pub use transport::{Exchange, ReqwestTransport, Transport};
