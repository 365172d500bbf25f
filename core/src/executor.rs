//! One request, one task, one callback.
//!
//! # Design
//! `RequestExecutor` prepares an `HttpRequest`, spawns the exchange on the
//! session's runtime, and returns immediately with a `TaskHandle`. Response
//! handling happens later on a runtime worker, never on the constructing
//! call stack.
//!
//! The callback sits behind a `Completion` guard that runs it at most once.
//! If the task is dropped before it resolves (its runtime shut down or was
//! already closed) the guard delivers `ApiError::Cancelled` from a separate
//! thread so it never fires zero times.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::oneshot;
use tracing::Instrument;
use url::Url;
use uuid::Uuid;

use crate::auth::{AuthHook, NoAuth};
use crate::body::{Body, RequestBody};
use crate::error::ApiError;
use crate::http::{ApiResponse, HttpMethod, HttpRequest};
use crate::session::Session;
use crate::transport::Exchange;

type Callback = Box<dyn FnOnce(ApiResponse) + Send + 'static>;

/// A callback that can be resolved at most once.
///
/// When attached to a task, resolving marks the task finished before the
/// callback runs. An unresolved guard that is dropped delivers a cancelled
/// record on a fresh thread, so the callback never runs on the stack that
/// dropped it.
pub struct Completion {
    callback: Mutex<Option<Callback>>,
    encode_error: Option<ApiError>,
    task: Option<Arc<TaskState>>,
}

impl Completion {
    pub fn new(callback: impl FnOnce(ApiResponse) + Send + 'static) -> Self {
        Self {
            callback: Mutex::new(Some(Box::new(callback))),
            encode_error: None,
            task: None,
        }
    }

    fn for_task(callback: Callback, task: Arc<TaskState>, encode_error: Option<ApiError>) -> Self {
        Self {
            callback: Mutex::new(Some(callback)),
            encode_error,
            task: Some(task),
        }
    }

    /// Run the callback with `response`. Returns `false` if it already ran.
    pub fn resolve(&self, response: ApiResponse) -> bool {
        let callback = lock(&self.callback).take();
        match callback {
            Some(callback) => {
                self.mark_finished();
                callback(response);
                true
            }
            None => false,
        }
    }

    pub fn is_resolved(&self) -> bool {
        lock(&self.callback).is_none()
    }

    fn mark_finished(&self) {
        if let Some(task) = &self.task {
            lock(&task.cancel).take();
            task.finished.store(true, Ordering::Release);
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        let callback = match self.callback.get_mut() {
            Ok(slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(callback) = callback else {
            return;
        };
        self.mark_finished();
        tracing::debug!("exchange dropped before completing");
        deliver_detached(callback, ApiResponse::cancelled(self.encode_error.take()));
    }
}

/// Run `callback` on a new thread, or inline if no thread can be started.
fn deliver_detached(callback: Callback, response: ApiResponse) {
    let pending = Arc::new(Mutex::new(Some((callback, response))));
    let detached = Arc::clone(&pending);
    let spawned = std::thread::Builder::new()
        .name("courier-cancel".to_string())
        .spawn(move || {
            if let Some((callback, response)) = lock(&detached).take() {
                callback(response);
            }
        });
    if let Err(err) = spawned {
        tracing::warn!(error = %err, "failed to start delivery thread");
        let pending = lock(&pending).take();
        if let Some((callback, response)) = pending {
            callback(response);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug)]
struct TaskState {
    /// Taken by whichever side settles the outcome first: `cancel` or the
    /// finished exchange.
    cancel: Mutex<Option<oneshot::Sender<()>>>,
    finished: AtomicBool,
}

/// Caller-side handle to an in-flight exchange.
///
/// Dropping the handle does not cancel the exchange.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: Uuid,
    state: Arc<TaskState>,
}

impl TaskHandle {
    /// Identifier attached to this exchange's log events.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Ask the exchange to stop. A `true` return guarantees the callback
    /// fires with `ApiError::Cancelled`. Returns `false` if the exchange had
    /// already settled or a cancel was already sent.
    pub fn cancel(&self) -> bool {
        match lock(&self.state.cancel).take() {
            Some(tx) => {
                let _ = tx.send(());
                true
            }
            None => false,
        }
    }

    /// True once the exchange has produced its response record.
    pub fn is_finished(&self) -> bool {
        self.state.finished.load(Ordering::Acquire)
    }
}

/// Starts a single asynchronous exchange on construction and reports it
/// through a one-shot callback.
#[derive(Debug)]
pub struct RequestExecutor {
    task: TaskHandle,
}

impl RequestExecutor {
    /// Build a request from `url`, pass it through `auth`, then dispatch it
    /// as [`RequestExecutor::from_request`] does.
    pub fn from_url<A, F>(
        session: &Session,
        method: HttpMethod,
        url: Url,
        auth: A,
        body: RequestBody,
        completion: F,
    ) -> Self
    where
        A: AuthHook,
        F: FnOnce(ApiResponse) + Send + 'static,
    {
        let request = auth.apply(HttpRequest::new(url));
        Self::from_request(session, method, request, body, completion)
    }

    /// Set `method`, encode `body` into `request`, and start the exchange.
    pub fn from_request<F>(
        session: &Session,
        method: HttpMethod,
        mut request: HttpRequest,
        body: RequestBody,
        completion: F,
    ) -> Self
    where
        F: FnOnce(ApiResponse) + Send + 'static,
    {
        request.method = method;
        let encode_error = body.apply_to(&mut request);

        let id = Uuid::new_v4();
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        let state = Arc::new(TaskState {
            cancel: Mutex::new(Some(cancel_tx)),
            finished: AtomicBool::new(false),
        });

        let span = tracing::debug_span!("exchange", %id, method = %request.method, url = %request.url);
        span.in_scope(|| {
            tracing::debug!(
                payload_len = request.body.as_ref().map_or(0, Vec::len),
                "dispatching request"
            );
        });

        let completion = Completion::for_task(Box::new(completion), Arc::clone(&state), encode_error.clone());
        let transport = session.transport();
        let task_state = Arc::clone(&state);

        session.handle().spawn(
            async move {
                // A sender dropped without sending is not a cancel.
                let cancelled = async move {
                    if cancel_rx.await.is_err() {
                        std::future::pending::<()>().await;
                    }
                };

                let exchange = tokio::select! {
                    exchange = transport.execute(request) => Some(exchange),
                    _ = cancelled => None,
                };

                // A cancel that took the sender first wins even if the
                // exchange also completed.
                let settled = lock(&task_state.cancel).take().is_some();
                let response = match exchange {
                    Some(exchange) if settled => finish(exchange, encode_error),
                    _ => {
                        tracing::debug!("exchange cancelled");
                        ApiResponse::cancelled(encode_error)
                    }
                };
                completion.resolve(response);
            }
            .instrument(span),
        );

        Self {
            task: TaskHandle { id, state },
        }
    }

    pub fn task(&self) -> &TaskHandle {
        &self.task
    }

    pub fn into_task(self) -> TaskHandle {
        self.task
    }

    pub fn cancel(&self) -> bool {
        self.task.cancel()
    }
}

fn finish(exchange: Exchange, encode_error: Option<ApiError>) -> ApiResponse {
    match (&exchange.response, &exchange.error) {
        (_, Some(err)) => tracing::warn!(error = %err, "exchange failed"),
        (Some(head), None) => tracing::debug!(status = head.status, final_url = %head.url, "exchange finished"),
        (None, None) => tracing::debug!("exchange finished without a response"),
    }
    ApiResponse {
        body: Body::classify(exchange.bytes),
        response: exchange.response,
        error: exchange.error,
        encode_error,
    }
}

/// Builder for path-A construction with defaults: GET, no auth, empty body.
pub struct RequestBuilder<'a> {
    session: &'a Session,
    method: HttpMethod,
    url: Url,
    auth: Box<dyn AuthHook>,
    body: RequestBody,
}

impl<'a> RequestBuilder<'a> {
    pub(crate) fn new(session: &'a Session, url: Url) -> Self {
        Self {
            session,
            method: HttpMethod::default(),
            url,
            auth: Box::new(NoAuth),
            body: RequestBody::Empty,
        }
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn auth(mut self, hook: impl AuthHook + 'static) -> Self {
        self.auth = Box::new(hook);
        self
    }

    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = body.into();
        self
    }

    pub fn json<T: serde::Serialize + Send + Sync + 'static>(mut self, value: T) -> Self {
        self.body = RequestBody::json(value);
        self
    }

    pub fn send(self, completion: impl FnOnce(ApiResponse) + Send + 'static) -> RequestExecutor {
        let auth = self.auth;
        RequestExecutor::from_url(
            self.session,
            self.method,
            self.url,
            move |request: HttpRequest| auth.apply(request),
            self.body,
            completion,
        )
    }
}
