//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type with C-compatible representations:
//! `*mut c_char` instead of `String`, pointer + length instead of `Vec`, and
//! tagged enums with explicit discriminants. Conversion functions live here
//! to keep `lib.rs` focused on the `extern "C"` surface.

use std::ffi::{c_void, CString};
use std::os::raw::c_char;

use courier_core::{ApiError, ApiResponse, Body, HttpMethod, TaskHandle};
use serde::{Serialize, Serializer};

/// Opaque handle to an in-flight exchange.
pub struct FfiTask {
    pub(crate) inner: TaskHandle,
}

/// Completion callback. Receives ownership of `response`, which must be
/// released with `courier_response_free`. Runs on a worker thread.
pub type FfiCompletion = extern "C" fn(response: *mut FfiApiResponse, user_data: *mut c_void);

// ---------------------------------------------------------------------------
// Request input
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiHttpMethod {
    Get = 0,
    Post = 1,
    Put = 2,
    Delete = 3,
}

impl From<FfiHttpMethod> for HttpMethod {
    fn from(m: FfiHttpMethod) -> Self {
        match m {
            FfiHttpMethod::Get => HttpMethod::Get,
            FfiHttpMethod::Post => HttpMethod::Post,
            FfiHttpMethod::Put => HttpMethod::Put,
            FfiHttpMethod::Delete => HttpMethod::Delete,
        }
    }
}

/// Which body variant a payload holds. For `Json`, the bytes are UTF-8 JSON
/// text (not NUL-terminated).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiBodyTag {
    Empty = 0,
    Bytes = 1,
    Json = 2,
}

/// A caller-owned header pair passed into `courier_request_start`. The FFI
/// layer copies both strings and never frees them.
#[repr(C)]
pub struct FfiHeaderRef {
    pub key: *const c_char,
    pub value: *const c_char,
}

/// JSON text supplied by a C caller, validated when the request body is
/// encoded. Invalid text fails encoding like any other unserializable value.
pub(crate) struct JsonText(pub(crate) Vec<u8>);

impl Serialize for JsonText {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let value: serde_json::Value =
            serde_json::from_slice(&self.0).map_err(serde::ser::Error::custom)?;
        value.serialize(serializer)
    }
}

/// Lets the completion closure carry the caller's callback and context
/// pointer to a worker thread.
pub(crate) struct CallbackTarget {
    pub(crate) callback: FfiCompletion,
    pub(crate) user_data: *mut c_void,
}

// SAFETY: the C caller guarantees `user_data` may be used from any thread
// until the callback has run.
unsafe impl Send for CallbackTarget {}

impl CallbackTarget {
    pub(crate) fn deliver(self, response: ApiResponse) {
        (self.callback)(FfiApiResponse::from_core(response), self.user_data);
    }
}

// ---------------------------------------------------------------------------
// Response output
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    Transport = 1,
    Cancelled = 2,
    Other = 3,
}

impl From<&ApiError> for FfiErrorCode {
    fn from(err: &ApiError) -> Self {
        match err {
            ApiError::Transport { .. } => FfiErrorCode::Transport,
            ApiError::Cancelled => FfiErrorCode::Cancelled,
            _ => FfiErrorCode::Other,
        }
    }
}

/// A response header owned by the enclosing `FfiApiResponse`.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// The response record handed to the completion callback.
///
/// `body` is null when `body_len` is 0. `status` and `headers` are only
/// meaningful when `has_response` is true. `error_message` is null when
/// `error_code` is `Ok`.
#[repr(C)]
pub struct FfiApiResponse {
    pub body_tag: FfiBodyTag,
    pub body: *mut u8,
    pub body_len: usize,
    pub has_response: bool,
    pub status: u16,
    pub headers: *mut FfiHeader,
    pub headers_len: usize,
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    /// True when a JSON request body failed to encode and was sent empty.
    pub encode_failed: bool,
}

impl FfiApiResponse {
    /// Convert a core `ApiResponse` into a heap-allocated `FfiApiResponse`.
    pub(crate) fn from_core(resp: ApiResponse) -> *mut Self {
        let (body_tag, bytes) = match resp.body {
            Body::Empty => (FfiBodyTag::Empty, Vec::new()),
            Body::Bytes(b) => (FfiBodyTag::Bytes, b),
            Body::Json(v) => (FfiBodyTag::Json, serde_json::to_vec(&v).unwrap_or_default()),
        };
        let (body, body_len) = into_raw_slice(bytes);

        let (has_response, status, headers) = match resp.response {
            Some(head) => {
                let headers: Vec<FfiHeader> = head
                    .headers
                    .into_iter()
                    .map(|(k, v)| FfiHeader {
                        key: to_c_string(k),
                        value: to_c_string(v),
                    })
                    .collect();
                (true, head.status, headers)
            }
            None => (false, 0, Vec::new()),
        };
        let (headers, headers_len) = into_raw_slice(headers);

        let (error_code, error_message) = match &resp.error {
            None => (FfiErrorCode::Ok, std::ptr::null_mut()),
            Some(err) => (FfiErrorCode::from(err), to_c_string(err.to_string())),
        };

        Box::into_raw(Box::new(FfiApiResponse {
            body_tag,
            body,
            body_len,
            has_response,
            status,
            headers,
            headers_len,
            error_code,
            error_message,
            encode_failed: resp.encode_error.is_some(),
        }))
    }
}

/// Leak `items` as a boxed slice. Empty input yields a null pointer.
fn into_raw_slice<T>(items: Vec<T>) -> (*mut T, usize) {
    if items.is_empty() {
        return (std::ptr::null_mut(), 0);
    }
    let boxed = items.into_boxed_slice();
    let len = boxed.len();
    (Box::into_raw(boxed) as *mut T, len)
}

/// Reclaim a slice produced by `into_raw_slice`.
///
/// # Safety
/// `ptr`/`len` must come from `into_raw_slice` and not have been freed.
pub(crate) unsafe fn from_raw_slice<T>(ptr: *mut T, len: usize) -> Vec<T> {
    if ptr.is_null() || len == 0 {
        return Vec::new();
    }
    Box::from_raw(std::ptr::slice_from_raw_parts_mut(ptr, len)).into_vec()
}

/// Interior NULs cannot cross the boundary; they are dropped.
fn to_c_string(s: String) -> *mut c_char {
    let cleaned = if s.contains('\0') { s.replace('\0', "") } else { s };
    CString::new(cleaned).unwrap_or_default().into_raw()
}
