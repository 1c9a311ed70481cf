//! Per-request diagnostic and cancellation context.

use std::future::Future;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// The request was cancelled while an operation was in flight.
#[derive(Debug, Clone, Copy, Error)]
#[error("request cancelled")]
pub struct Cancelled;

/// Context passed explicitly into every identity service operation.
///
/// Carries the request id recorded on the operation's span and the token used
/// to cancel the request's in-flight collaborator calls.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    cancel: CancellationToken,
}

impl RequestContext {
    /// Create a context with the given request id and a fresh cancellation token.
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            cancel: CancellationToken::new(),
        }
    }

    /// Create a context with a generated request id.
    pub fn generate() -> Self {
        Self::new(format!("req_{}", nanoid::nanoid!(12)))
    }

    /// Replace the cancellation token, e.g. with a child of a server-wide one.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Drive `fut` to completion unless the request is cancelled first.
    ///
    /// On cancellation `fut` is dropped, which aborts the awaited call.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Cancelled> {
        if self.cancel.is_cancelled() {
            return Err(Cancelled);
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Cancelled),
            output = fut => Ok(output),
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::generate()
    }
}
