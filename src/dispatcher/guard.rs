//! Exactly-once completion.
//!
//! Every execute call owns one `CompletionGuard`. Completing consumes it; if it
//! is dropped on a path that forgot to complete (an early return, a panic in a
//! continuation), `Drop` reports a failure instead, so the caller always hears
//! back exactly once.

use super::types::{ExecuteResponse, RequestId};

pub type ExecuteCallback = Box<dyn FnOnce(ExecuteResponse) + Send + 'static>;

pub struct CompletionGuard {
    request_id: RequestId,
    done: Option<ExecuteCallback>,
}

impl CompletionGuard {
    pub fn new<F>(request_id: RequestId, done: F) -> Self
    where
        F: FnOnce(ExecuteResponse) + Send + 'static,
    {
        Self {
            request_id,
            done: Some(Box::new(done)),
        }
    }

    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    pub fn complete(mut self, response: ExecuteResponse) {
        if let Some(done) = self.done.take() {
            done(response);
        }
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if let Some(done) = self.done.take() {
            tracing::warn!(
                "Request {} released without a response, reporting failure",
                self.request_id
            );
            done(ExecuteResponse {
                ok: false,
                metadata: Vec::new(),
                error: Some("request abandoned before completion".to_string()),
            });
        }
    }
}
