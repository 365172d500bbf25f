//! Transport plus the runtime exchanges are spawned on.
//!
//! # Design
//! A session created inside a tokio runtime spawns onto that runtime. Created
//! anywhere else, it builds and owns a small multi-thread runtime that plays
//! the part of the network stack's worker pool. `Session::shared()` always
//! owns its runtime so it outlives whatever runtime first touched it.

use std::fmt;
use std::sync::{Arc, OnceLock};

use tokio::runtime::{Handle, Runtime};
use tokio::sync::oneshot;
use url::Url;

use crate::body::RequestBody;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::executor::{RequestBuilder, RequestExecutor};
use crate::http::{ApiResponse, HttpMethod, HttpRequest};
use crate::transport::{ReqwestTransport, Transport};

static SHARED: OnceLock<Session> = OnceLock::new();

pub struct Session {
    transport: Arc<dyn Transport>,
    handle: Handle,
    runtime: Option<Runtime>,
}

impl Session {
    /// Use `transport`, spawning on the current runtime if there is one.
    pub fn new(transport: impl Transport + 'static) -> Result<Self, ApiError> {
        let transport: Arc<dyn Transport> = Arc::new(transport);
        match Handle::try_current() {
            Ok(handle) => Ok(Self {
                transport,
                handle,
                runtime: None,
            }),
            Err(_) => Self::with_own_runtime(transport, ClientConfig::default().worker_threads),
        }
    }

    /// Spawn exchanges on `handle`. The session does not own that runtime.
    pub fn with_handle(transport: impl Transport + 'static, handle: Handle) -> Self {
        Self {
            transport: Arc::new(transport),
            handle,
            runtime: None,
        }
    }

    /// A reqwest-backed session that owns its runtime.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::from_config(config)?;
        Self::with_own_runtime(Arc::new(transport), config.worker_threads)
    }

    /// Process-wide session built from `ClientConfig::from_env()` on first use.
    pub fn shared() -> Result<&'static Session, ApiError> {
        if let Some(session) = SHARED.get() {
            return Ok(session);
        }
        let session = Self::from_config(&ClientConfig::from_env()?)?;
        Ok(SHARED.get_or_init(|| session))
    }

    fn with_own_runtime(transport: Arc<dyn Transport>, worker_threads: usize) -> Result<Self, ApiError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .thread_name("courier-worker")
            .enable_all()
            .build()
            .map_err(|e| ApiError::Runtime(e.to_string()))?;
        tracing::debug!(worker_threads, "started session runtime");
        Ok(Self {
            transport,
            handle: runtime.handle().clone(),
            runtime: Some(runtime),
        })
    }

    /// Start building a request for `url` (GET, no auth, empty body).
    pub fn request(&self, url: Url) -> RequestBuilder<'_> {
        RequestBuilder::new(self, url)
    }

    /// Dispatch `request` and wait for its response record.
    pub async fn fetch(&self, method: HttpMethod, request: HttpRequest, body: RequestBody) -> ApiResponse {
        let (tx, rx) = oneshot::channel();
        let _executor = RequestExecutor::from_request(self, method, request, body, move |response| {
            let _ = tx.send(response);
        });
        rx.await.unwrap_or_else(|_| ApiResponse::cancelled(None))
    }

    pub(crate) fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    pub(crate) fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn owns_runtime(&self) -> bool {
        self.runtime.is_some()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("owns_runtime", &self.owns_runtime())
            .finish_non_exhaustive()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Dropping a runtime from async context panics; shutdown_background does not.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
