//! Task-local trace id.
//!
//! `RequestTrace` opens the scope for HTTP requests and the websocket actor
//! opens one around each room lookup, so errors and logs raised deeper in the stack
//! can attach the same id without threading it through every signature.

use std::cell::RefCell;
use std::future::Future;

use tokio::task_local;

const UNKNOWN: &str = "unknown";

task_local! {
    static TRACE_ID: RefCell<Option<String>>;
}

/// Fresh random trace id.
pub fn new_trace_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current trace id, or `"unknown"` outside any scope.
pub fn trace_id() -> String {
    TRACE_ID
        .try_with(|cell| cell.borrow().clone())
        .ok()
        .flatten()
        .unwrap_or_else(|| UNKNOWN.to_string())
}

pub async fn with_trace_id<F, R>(trace_id: String, future: F) -> R
where
    F: Future<Output = R>,
{
    TRACE_ID.scope(RefCell::new(Some(trace_id)), future).await
}
