use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::ChainError;
use crate::types::Args;

/// Outcome delivered to a trailing callback: the final argument vector on
/// success, or the error that halted the chain.
pub type Outcome = Result<Args, ChainError>;

type CallbackFn = dyn Fn(Outcome) + Send + Sync;

/// A callable value, passed as the last call argument to opt into the
/// trailing-callback convention.
///
/// Cloning shares the same underlying function; equality is identity.
#[derive(Clone)]
pub struct Callback(Arc<CallbackFn>);

impl Callback {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Outcome) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Wraps a one-shot function. Calls after the first are dropped.
    pub fn once<F>(f: F) -> Self
    where
        F: FnOnce(Outcome) + Send + 'static,
    {
        let slot = Mutex::new(Some(f));
        Self::new(move |outcome| {
            let f = slot.lock().take();
            if let Some(f) = f {
                f(outcome);
            } else {
                tracing::trace!("one-shot callback fired more than once; ignored");
            }
        })
    }

    pub fn call(&self, outcome: Outcome) {
        (self.0)(outcome);
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback(..)")
    }
}
