//! C-ABI wrapper around `courier-core`.
//!
//! # Overview
//! Lets any language with a C FFI fire a one-shot HTTP request and receive
//! the classified response through a C function pointer, without linking to
//! Rust's async runtime directly. Requests run on the process-wide
//! `Session::shared()`.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - `courier_request_start` returns an opaque `FfiTask` for cancellation;
//!   freeing the task does not cancel the exchange.
//! - The callback receives ownership of an `FfiApiResponse` and must release
//!   it with `courier_response_free`.

pub mod types;

use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;
use std::panic::catch_unwind;

use courier_core::{HttpRequest, RequestBody, RequestExecutor, Session};

use types::*;

/// Copy a C string. `None` for null pointers and invalid UTF-8.
unsafe fn read_c_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(str::to_string)
}

/// Copy caller-supplied headers. Pairs with a null or non-UTF-8 side are
/// skipped.
unsafe fn read_headers(headers: *const FfiHeaderRef, len: usize) -> Vec<(String, String)> {
    if headers.is_null() || len == 0 {
        return Vec::new();
    }
    std::slice::from_raw_parts(headers, len)
        .iter()
        .filter_map(|h| Some((read_c_str(h.key)?, read_c_str(h.value)?)))
        .collect()
}

unsafe fn read_body(tag: FfiBodyTag, body: *const u8, len: usize) -> RequestBody {
    let bytes = if body.is_null() || len == 0 {
        Vec::new()
    } else {
        std::slice::from_raw_parts(body, len).to_vec()
    };
    match tag {
        FfiBodyTag::Empty => RequestBody::Empty,
        FfiBodyTag::Bytes => RequestBody::Bytes(bytes),
        FfiBodyTag::Json => RequestBody::json(JsonText(bytes)),
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Start a request and return its task handle.
///
/// `headers` (may be null) are applied before dispatch. `body` is read
/// according to `body_tag` and copied. `completion` is called exactly once
/// with `user_data`, on a worker thread.
///
/// Returns null if `url` or `completion` is null, the URL is not an
/// absolute http(s) URL, the shared session cannot start, or an internal
/// panic occurs. In that case `completion` is never called.
/// The caller must free the returned pointer with `courier_task_free`.
#[unsafe(no_mangle)]
pub extern "C" fn courier_request_start(
    method: FfiHttpMethod,
    url: *const c_char,
    headers: *const FfiHeaderRef,
    headers_len: usize,
    body_tag: FfiBodyTag,
    body: *const u8,
    body_len: usize,
    completion: Option<FfiCompletion>,
    user_data: *mut c_void,
) -> *mut FfiTask {
    catch_unwind(|| {
        let Some(callback) = completion else {
            return std::ptr::null_mut();
        };
        let Some(url) = (unsafe { read_c_str(url) }) else {
            return std::ptr::null_mut();
        };
        let request = match HttpRequest::parse(&url) {
            Ok(req) => req,
            Err(_) => return std::ptr::null_mut(),
        };
        let session = match Session::shared() {
            Ok(session) => session,
            Err(_) => return std::ptr::null_mut(),
        };

        let extra_headers = unsafe { read_headers(headers, headers_len) };
        let body = unsafe { read_body(body_tag, body, body_len) };
        let target = CallbackTarget {
            callback,
            user_data,
        };

        let request = extra_headers
            .into_iter()
            .fold(request, |req, (k, v)| req.with_header(k, v));
        let executor = RequestExecutor::from_request(session, method.into(), request, body, move |resp| {
            target.deliver(resp)
        });
        Box::into_raw(Box::new(FfiTask {
            inner: executor.into_task(),
        }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Cancel an in-flight request. Its callback then fires with
/// `error_code = Cancelled`. Returns false if `task` is null or the request
/// already finished.
#[unsafe(no_mangle)]
pub extern "C" fn courier_task_cancel(task: *const FfiTask) -> bool {
    catch_unwind(|| {
        if task.is_null() {
            return false;
        }
        unsafe { &*task }.inner.cancel()
    })
    .unwrap_or(false)
}

/// True once the request's response record has been produced.
#[unsafe(no_mangle)]
pub extern "C" fn courier_task_is_finished(task: *const FfiTask) -> bool {
    catch_unwind(|| {
        if task.is_null() {
            return false;
        }
        unsafe { &*task }.inner.is_finished()
    })
    .unwrap_or(false)
}

/// Free a task handle. Does not cancel the request. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn courier_task_free(task: *mut FfiTask) {
    if !task.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(task) });
        });
    }
}

/// Install a log subscriber filtered by `RUST_LOG`. Returns false if one was
/// already installed.
#[unsafe(no_mangle)]
pub extern "C" fn courier_init_logging() -> bool {
    catch_unwind(courier_core::logging::init).unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiApiResponse` delivered to a completion callback.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn courier_response_free(response: *mut FfiApiResponse) {
    if response.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let response = unsafe { Box::from_raw(response) };
        drop(unsafe { from_raw_slice(response.body, response.body_len) });
        for header in unsafe { from_raw_slice(response.headers, response.headers_len) } {
            if !header.key.is_null() {
                drop(unsafe { CString::from_raw(header.key) });
            }
            if !header.value.is_null() {
                drop(unsafe { CString::from_raw(header.value) });
            }
        }
        if !response.error_message.is_null() {
            drop(unsafe { CString::from_raw(response.error_message) });
        }
    });
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::sync::mpsc;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Owned copy of an `FfiApiResponse`, taken inside the callback.
    #[derive(Debug)]
    struct Delivered {
        body_tag: FfiBodyTag,
        body: Vec<u8>,
        has_response: bool,
        status: u16,
        headers: Vec<(String, String)>,
        error_code: FfiErrorCode,
        error_message: Option<String>,
        encode_failed: bool,
    }

    impl Delivered {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }
    }

    type Sink = Mutex<mpsc::Sender<Delivered>>;

    /// Leaked so a callback still unlocking it can never outlive it.
    fn new_sink() -> (&'static Sink, mpsc::Receiver<Delivered>) {
        let (tx, rx) = mpsc::channel();
        (Box::leak(Box::new(Mutex::new(tx))), rx)
    }

    extern "C" fn collect(response: *mut FfiApiResponse, user_data: *mut c_void) {
        let sink = unsafe { &*(user_data as *const Sink) };
        let r = unsafe { &*response };
        let body = if r.body.is_null() {
            Vec::new()
        } else {
            unsafe { std::slice::from_raw_parts(r.body, r.body_len) }.to_vec()
        };
        let headers = if r.headers.is_null() {
            Vec::new()
        } else {
            unsafe { std::slice::from_raw_parts(r.headers, r.headers_len) }
                .iter()
                .map(|h| unsafe {
                    (
                        CStr::from_ptr(h.key).to_str().unwrap().to_string(),
                        CStr::from_ptr(h.value).to_str().unwrap().to_string(),
                    )
                })
                .collect()
        };
        let error_message = if r.error_message.is_null() {
            None
        } else {
            Some(unsafe { CStr::from_ptr(r.error_message) }.to_str().unwrap().to_string())
        };
        let delivered = Delivered {
            body_tag: r.body_tag,
            body,
            has_response: r.has_response,
            status: r.status,
            headers,
            error_code: r.error_code,
            error_message,
            encode_failed: r.encode_failed,
        };
        courier_response_free(response);
        sink.lock().unwrap().send(delivered).unwrap();
    }

    /// Start the mock server on a background thread and return its base URL.
    fn spawn_mock_server() -> String {
        let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = std_listener.local_addr().unwrap();
        std_listener.set_nonblocking(true).unwrap();

        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
                mock_server::run(listener).await
            })
            .unwrap();
        });

        format!("http://{addr}")
    }

    struct Call {
        method: FfiHttpMethod,
        url: String,
        headers: Vec<(CString, CString)>,
        body_tag: FfiBodyTag,
        body: Vec<u8>,
    }

    impl Call {
        fn get(url: String) -> Self {
            Self {
                method: FfiHttpMethod::Get,
                url,
                headers: Vec::new(),
                body_tag: FfiBodyTag::Empty,
                body: Vec::new(),
            }
        }

        fn start(&self, sink: &'static Sink) -> *mut FfiTask {
            let url = CString::new(self.url.clone()).unwrap();
            let refs: Vec<FfiHeaderRef> = self
                .headers
                .iter()
                .map(|(k, v)| FfiHeaderRef {
                    key: k.as_ptr(),
                    value: v.as_ptr(),
                })
                .collect();
            courier_request_start(
                self.method,
                url.as_ptr(),
                refs.as_ptr(),
                refs.len(),
                self.body_tag,
                self.body.as_ptr(),
                self.body.len(),
                Some(collect),
                sink as *const Sink as *mut c_void,
            )
        }

        /// Start the call and block until its callback delivers.
        fn run(&self) -> Delivered {
            let (sink, rx) = new_sink();
            let task = self.start(sink);
            assert!(!task.is_null());
            let delivered = rx.recv_timeout(Duration::from_secs(10)).unwrap();
            courier_task_free(task);
            delivered
        }
    }

    #[test]
    fn start_with_null_url_returns_null() {
        let (sink, _rx) = new_sink();
        let task = courier_request_start(
            FfiHttpMethod::Get,
            std::ptr::null(),
            std::ptr::null(),
            0,
            FfiBodyTag::Empty,
            std::ptr::null(),
            0,
            Some(collect),
            sink as *const Sink as *mut c_void,
        );
        assert!(task.is_null());
    }

    #[test]
    fn start_with_null_completion_returns_null() {
        let url = CString::new("http://127.0.0.1:9/").unwrap();
        let task = courier_request_start(
            FfiHttpMethod::Get,
            url.as_ptr(),
            std::ptr::null(),
            0,
            FfiBodyTag::Empty,
            std::ptr::null(),
            0,
            None,
            std::ptr::null_mut(),
        );
        assert!(task.is_null());
    }

    #[test]
    fn start_with_relative_url_returns_null() {
        let (sink, rx) = new_sink();
        let task = Call::get("/json".to_string()).start(sink);
        assert!(task.is_null());
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err(), "no callback on rejected start");
    }

    #[test]
    fn get_json_delivers_json_tag() {
        let base = spawn_mock_server();
        let d = Call::get(format!("{base}/json")).run();

        assert_eq!(d.error_code, FfiErrorCode::Ok);
        assert!(d.error_message.is_none());
        assert!(d.has_response);
        assert_eq!(d.status, 200);
        assert_eq!(d.body_tag, FfiBodyTag::Json);
        let value: serde_json::Value = serde_json::from_slice(&d.body).unwrap();
        assert_eq!(value, mock_server::json_fixture_value());
    }

    #[test]
    fn get_bytes_delivers_raw_tag() {
        let base = spawn_mock_server();
        let d = Call::get(format!("{base}/bytes")).run();

        assert_eq!(d.body_tag, FfiBodyTag::Bytes);
        assert_eq!(d.body, mock_server::BYTES_FIXTURE);
    }

    #[test]
    fn get_empty_delivers_empty_tag() {
        let base = spawn_mock_server();
        let d = Call::get(format!("{base}/empty")).run();

        assert_eq!(d.body_tag, FfiBodyTag::Empty);
        assert!(d.body.is_empty());
    }

    #[test]
    fn json_body_is_sent_with_content_type() {
        let base = spawn_mock_server();
        let call = Call {
            method: FfiHttpMethod::Post,
            body_tag: FfiBodyTag::Json,
            body: br#"{"title":"Buy milk"}"#.to_vec(),
            ..Call::get(format!("{base}/echo"))
        };
        let d = call.run();

        assert_eq!(d.header("x-echo-method"), Some("POST"));
        assert_eq!(d.header("x-echo-content-type"), Some("application/json"));
        assert_eq!(d.body_tag, FfiBodyTag::Json);
        assert!(!d.encode_failed);
    }

    #[test]
    fn invalid_json_text_is_sent_empty() {
        let base = spawn_mock_server();
        let call = Call {
            method: FfiHttpMethod::Put,
            body_tag: FfiBodyTag::Json,
            body: b"{not json".to_vec(),
            ..Call::get(format!("{base}/echo"))
        };
        let d = call.run();

        assert!(d.encode_failed);
        assert_eq!(d.error_code, FfiErrorCode::Ok);
        assert_eq!(d.body_tag, FfiBodyTag::Empty);
        assert_eq!(d.header("x-echo-content-type"), None);
    }

    #[test]
    fn headers_are_applied() {
        let base = spawn_mock_server();
        let call = Call {
            headers: vec![(
                CString::new("Authorization").unwrap(),
                CString::new("Bearer from-c").unwrap(),
            )],
            ..Call::get(format!("{base}/echo"))
        };
        let d = call.run();

        assert_eq!(d.header("x-echo-authorization"), Some("Bearer from-c"));
    }

    #[test]
    fn raw_body_round_trips_through_echo() {
        let base = spawn_mock_server();
        let call = Call {
            method: FfiHttpMethod::Put,
            body_tag: FfiBodyTag::Bytes,
            body: vec![0, 1, 2, 0xfe],
            ..Call::get(format!("{base}/echo"))
        };
        let d = call.run();

        assert_eq!(d.body_tag, FfiBodyTag::Bytes);
        assert_eq!(d.body, vec![0, 1, 2, 0xfe]);
    }

    #[test]
    fn refused_connection_reports_transport_error() {
        let addr = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
        let d = Call::get(format!("http://{addr}/")).run();

        assert_eq!(d.error_code, FfiErrorCode::Transport);
        assert!(d.error_message.is_some());
        assert!(!d.has_response);
        assert_eq!(d.body_tag, FfiBodyTag::Empty);
    }

    #[test]
    fn cancel_delivers_cancelled() {
        let base = spawn_mock_server();
        let (sink, rx) = new_sink();
        let task = Call::get(format!("{base}/slow/10000")).start(sink);
        assert!(!task.is_null());
        assert!(!courier_task_is_finished(task));

        assert!(courier_task_cancel(task));
        let d = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(d.error_code, FfiErrorCode::Cancelled);
        assert!(!d.has_response);
        assert!(courier_task_is_finished(task));
        assert!(!courier_task_cancel(task));
        courier_task_free(task);
    }

    #[test]
    fn null_handles_are_safe() {
        assert!(!courier_task_cancel(std::ptr::null()));
        assert!(!courier_task_is_finished(std::ptr::null()));
        courier_task_free(std::ptr::null_mut());
        courier_response_free(std::ptr::null_mut());
    }
}
