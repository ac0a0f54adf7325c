//! Interceptable operations and their registered bindings.

use std::fmt;
use std::sync::Arc;

use hookline_core::{Args, ChainError, InterceptorChain};

use crate::interceptor::Interceptor;

type OperationFn<T> = dyn Fn(&T, Args) -> anyhow::Result<()> + Send + Sync;
type ErrorHandlerFn<T> = dyn Fn(&T, ChainError) + Send + Sync;

/// The wrapped function plus its optional error handler and declared arity.
pub struct Operation<T> {
    func: Arc<OperationFn<T>>,
    error_handler: Option<Arc<ErrorHandlerFn<T>>>,
    arity: Option<usize>,
}

impl<T> Operation<T> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&T, Args) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(f),
            error_handler: None,
            arity: None,
        }
    }

    /// Handler that receives every chain error for this operation.
    #[must_use]
    pub fn with_error_handler<H>(mut self, handler: H) -> Self
    where
        H: Fn(&T, ChainError) + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    /// Number of parameters the operation reads. Calls supplying fewer are
    /// padded with `Null` before the before-chain sees them.
    #[must_use]
    pub fn with_arity(mut self, arity: usize) -> Self {
        self.arity = Some(arity);
        self
    }

    #[must_use]
    pub fn arity(&self) -> Option<usize> {
        self.arity
    }

    #[must_use]
    pub fn has_error_handler(&self) -> bool {
        self.error_handler.is_some()
    }

    pub(crate) fn call(&self, target: &T, args: Args) -> anyhow::Result<()> {
        (self.func)(target, args)
    }

    pub(crate) fn handle_error(&self, target: &T, error: ChainError) -> bool {
        match &self.error_handler {
            Some(handler) => {
                handler(target, error);
                true
            }
            None => false,
        }
    }
}

impl<T> Clone for Operation<T> {
    fn clone(&self) -> Self {
        Self {
            func: Arc::clone(&self.func),
            error_handler: self.error_handler.clone(),
            arity: self.arity,
        }
    }
}

impl<T> fmt::Debug for Operation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("has_error_handler", &self.has_error_handler())
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// OperationBinding
// ---------------------------------------------------------------------------

/// Registered association between an operation name, its function, and
/// its interceptor chain.
///
/// A binding may exist without an operation: adding an interceptor to a
/// name that was never installed creates one, and `install` fills it in later.
#[derive(Debug)]
pub struct OperationBinding<T> {
    name: String,
    operation: Option<Operation<T>>,
    chain: InterceptorChain<Interceptor<T>>,
}

impl<T> OperationBinding<T> {
    pub(crate) fn pending(name: &str) -> Self {
        Self {
            name: name.to_string(),
            operation: None,
            chain: InterceptorChain::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn operation(&self) -> Option<&Operation<T>> {
        self.operation.as_ref()
    }

    #[must_use]
    pub fn chain(&self) -> &InterceptorChain<Interceptor<T>> {
        &self.chain
    }

    pub(crate) fn bind(&mut self, operation: Operation<T>) {
        self.operation = Some(operation);
    }

    pub(crate) fn chain_mut(&mut self) -> &mut InterceptorChain<Interceptor<T>> {
        &mut self.chain
    }
}
