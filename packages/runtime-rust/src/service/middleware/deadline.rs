//! Deadline middleware for calls.
//!
//! An invocation waiting on a continuation that never fires would otherwise
//! never settle. Calls that outlive their deadline fail with
//! `OperationError::Timeout`.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use hookline_core::Args;
use tower::{Layer, Service};

use crate::service::call::{Call, OperationError};

// ---------------------------------------------------------------------------
// DeadlineLayer
// ---------------------------------------------------------------------------

/// Tower layer that wraps services with per-call deadline enforcement.
///
/// The deadline is read from each call's `deadline_ms`, falling back to
/// the layer's default.
#[derive(Debug, Clone, Copy)]
pub struct DeadlineLayer {
    default_ms: u64,
}

impl DeadlineLayer {
    #[must_use]
    pub fn new(default_ms: u64) -> Self {
        Self { default_ms }
    }
}

impl<S> Layer<S> for DeadlineLayer {
    type Service = DeadlineService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        DeadlineService {
            inner,
            default_ms: self.default_ms,
        }
    }
}

// ---------------------------------------------------------------------------
// DeadlineService
// ---------------------------------------------------------------------------

/// Service wrapper that enforces per-call deadlines.
#[derive(Debug, Clone)]
pub struct DeadlineService<S> {
    inner: S,
    default_ms: u64,
}

impl<S, T> Service<Call<T>> for DeadlineService<S>
where
    S: Service<Call<T>, Response = Args, Error = OperationError> + Send,
    S::Future: Send + 'static,
{
    type Response = Args;
    type Error = OperationError;
    type Future = Pin<Box<dyn Future<Output = Result<Args, OperationError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, call: Call<T>) -> Self::Future {
        let timeout_ms = call.deadline_ms.unwrap_or(self.default_ms);
        let fut = self.inner.call(call);
        Box::pin(async move {
            let duration = Duration::from_millis(timeout_ms);
            match tokio::time::timeout(duration, fut).await {
                Ok(result) => result,
                Err(_elapsed) => Err(OperationError::Timeout { timeout_ms }),
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tower::ServiceExt;

    use super::*;

    /// Service that takes a configurable delay before responding.
    struct SlowService {
        delay_ms: u64,
    }

    impl Service<Call<()>> for SlowService {
        type Response = Args;
        type Error = OperationError;
        type Future = Pin<Box<dyn Future<Output = Result<Args, OperationError>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, call: Call<()>) -> Self::Future {
            let delay = self.delay_ms;
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(call.args)
            })
        }
    }

    fn make_call(deadline_ms: Option<u64>) -> Call<()> {
        let call = Call::new(Arc::new(()), "save", ["a"]);
        match deadline_ms {
            Some(ms) => call.with_deadline_ms(ms),
            None => call,
        }
    }

    #[tokio::test]
    async fn completes_within_deadline() {
        let svc = DeadlineLayer::new(1000).layer(SlowService { delay_ms: 10 });
        let args = svc.oneshot(make_call(None)).await.unwrap();
        assert_eq!(args, Args::from(["a"]));
    }

    #[tokio::test]
    async fn call_deadline_overrides_default() {
        let svc = DeadlineLayer::new(1000).layer(SlowService { delay_ms: 200 });
        let err = svc.oneshot(make_call(Some(50))).await.unwrap_err();
        assert!(matches!(err, OperationError::Timeout { timeout_ms: 50 }));
    }

    #[tokio::test]
    async fn default_deadline_applies_without_override() {
        let svc = DeadlineLayer::new(50).layer(SlowService { delay_ms: 200 });
        let err = svc.oneshot(make_call(None)).await.unwrap_err();
        assert!(matches!(err, OperationError::Timeout { timeout_ms: 50 }));
    }
}
