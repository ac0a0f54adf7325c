//! Tower service that runs a call through the registry and waits for the
//! invocation to settle.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use hookline_core::{Args, Callback, Value};
use tokio::sync::oneshot;
use tower::Service;

use super::call::{Call, OperationError};
use crate::registry::HookRegistry;

/// Adapts a [`HookRegistry`] to `tower::Service<Call<T>>`.
///
/// Each call gets a trailing callback backed by a oneshot channel, so the
/// response future resolves with the final argument vector on success or
/// the routed error on failure, however long the asynchronous
/// interceptors take.
pub struct HookService<T> {
    registry: Arc<HookRegistry<T>>,
}

impl<T> HookService<T> {
    #[must_use]
    pub fn new(registry: Arc<HookRegistry<T>>) -> Self {
        Self { registry }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<HookRegistry<T>> {
        &self.registry
    }
}

impl<T> Clone for HookService<T> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<T> std::fmt::Debug for HookService<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookService").finish_non_exhaustive()
    }
}

impl<T> Service<Call<T>> for HookService<T>
where
    T: Send + Sync + 'static,
{
    type Response = Args;
    type Error = OperationError;
    type Future = Pin<Box<dyn Future<Output = Result<Args, OperationError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, call: Call<T>) -> Self::Future {
        let registry = Arc::clone(&self.registry);
        Box::pin(async move {
            let Call {
                target,
                operation,
                mut args,
                ..
            } = call;

            let (tx, rx) = oneshot::channel();
            args.push(Value::Callback(Callback::once(move |outcome| {
                // The receiver is gone once the caller stopped waiting.
                let _ = tx.send(outcome);
            })));

            registry.invoke(&target, &operation, args)?;

            match rx.await {
                Ok(Ok(args)) => Ok(args),
                Ok(Err(error)) => Err(OperationError::Chain(error)),
                Err(_closed) => Err(OperationError::Abandoned { operation }),
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
