//! Interceptors and their calling conventions.
//!
//! The calling convention is declared at construction rather than inferred:
//! [`Interceptor::sync`] receives only `next`, [`Interceptor::asynchronous`]
//! receives `next` and `done`.

use std::fmt;
use std::sync::Arc;

use hookline_core::{Args, Identified, InterceptorId};

use crate::engine::{Done, Next};
use crate::error::HookError;

type SyncFn<T> = dyn Fn(&T, Next<T>, Args) -> Result<(), HookError> + Send + Sync;
type AsyncFn<T> = dyn Fn(&T, Next<T>, Done<T>, Args) -> Result<(), HookError> + Send + Sync;

pub(crate) enum Body<T> {
    Sync(Arc<SyncFn<T>>),
    Async(Arc<AsyncFn<T>>),
}

impl<T> Clone for Body<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Sync(f) => Self::Sync(Arc::clone(f)),
            Self::Async(f) => Self::Async(Arc::clone(f)),
        }
    }
}

/// A before- or after-step attached to an operation.
///
/// Cloning keeps the identity, so a clone can later be passed to
/// `remove_before`/`remove_after` to remove the registered entry.
pub struct Interceptor<T> {
    id: InterceptorId,
    body: Body<T>,
    arity: Option<usize>,
}

impl<T> Interceptor<T> {
    /// A synchronous interceptor. It must eventually call `next` exactly once.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&T, Next<T>, Args) -> Result<(), HookError> + Send + Sync + 'static,
    {
        Self {
            id: InterceptorId::next(),
            body: Body::Sync(Arc::new(f)),
            arity: None,
        }
    }

    /// An asynchronous before-interceptor. Calling `next` advances the chain
    /// immediately; the operation additionally waits for `done`.
    pub fn asynchronous<F>(f: F) -> Self
    where
        F: Fn(&T, Next<T>, Done<T>, Args) -> Result<(), HookError> + Send + Sync + 'static,
    {
        Self {
            id: InterceptorId::next(),
            body: Body::Async(Arc::new(f)),
            arity: None,
        }
    }

    /// Declares how many domain arguments this interceptor reads. Shorter
    /// argument vectors are padded with `Null` in the view it receives.
    #[must_use]
    pub fn expecting(mut self, arity: usize) -> Self {
        self.arity = Some(arity);
        self
    }

    #[must_use]
    pub fn is_async(&self) -> bool {
        matches!(self.body, Body::Async(_))
    }

    #[must_use]
    pub fn arity(&self) -> Option<usize> {
        self.arity
    }

    pub(crate) fn body(&self) -> &Body<T> {
        &self.body
    }
}

impl<T> Identified for Interceptor<T> {
    fn id(&self) -> InterceptorId {
        self.id
    }
}

impl<T> Clone for Interceptor<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            body: self.body.clone(),
            arity: self.arity,
        }
    }
}

impl<T> fmt::Debug for Interceptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("id", &self.id)
            .field("is_async", &self.is_async())
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}
