//! `next` and `done` continuation handles.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hookline_core::{Args, ChainError, Stage};

use super::{router, runner, Invocation, Phase};
use crate::error::{ContractViolation, HookError};

/// Single-use latch shared between a continuation handle and the runner
/// that handed it out.
#[derive(Debug, Clone, Default)]
pub(crate) struct Latch(Arc<AtomicBool>);

impl Latch {
    /// Returns `true` if the latch was already fired.
    pub(crate) fn fire(&self) -> bool {
        self.0.swap(true, Ordering::AcqRel)
    }
}

// ---------------------------------------------------------------------------
// Next
// ---------------------------------------------------------------------------

/// Advances the chain past the interceptor it was handed to.
///
/// Exactly one of `proceed`, `proceed_with`, or `fail` may be called, once.
/// A second call is a contract violation: it returns
/// `HookError::Contract` and aborts the invocation.
pub struct Next<T> {
    invocation: Arc<Invocation<T>>,
    stage: Stage,
    index: usize,
    latch: Latch,
}

impl<T> Next<T> {
    pub(crate) fn new(invocation: Arc<Invocation<T>>, stage: Stage, index: usize, latch: Latch) -> Self {
        Self {
            invocation,
            stage,
            index,
            latch,
        }
    }

    /// Current phase of the invocation this handle belongs to.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.invocation.ctx.lock().phase()
    }

    /// Continue with the current argument vector.
    ///
    /// # Errors
    ///
    /// Contract violations, and any error surfaced by steps that run
    /// synchronously as a result of this call.
    pub fn proceed(&self) -> Result<(), HookError> {
        self.resume(None)
    }

    /// Continue, replacing the argument vector for every later step.
    ///
    /// # Errors
    ///
    /// Same as [`Next::proceed`].
    pub fn proceed_with(&self, args: impl Into<Args>) -> Result<(), HookError> {
        self.resume(Some(args.into()))
    }

    /// Halt the chain and route `error` to the error router.
    ///
    /// # Errors
    ///
    /// Contract violations, or `HookError::Unhandled` when the router has
    /// nowhere to deliver the error.
    pub fn fail(&self, error: impl Into<ChainError>) -> Result<(), HookError> {
        self.claim()?;
        router::route(&self.invocation, error.into())
    }

    fn resume(&self, args: Option<Args>) -> Result<(), HookError> {
        self.claim()?;
        let step = {
            let mut ctx = self.invocation.ctx.lock();
            match self.stage {
                Stage::Before => ctx.advance_before(self.index, args),
                Stage::After => ctx.advance_after(self.index, args),
            }
        };
        match step {
            Some(step) => runner::schedule(&self.invocation, step),
            None => Ok(()),
        }
    }

    fn claim(&self) -> Result<(), HookError> {
        if self.latch.fire() {
            return Err(self.invocation.abort(ContractViolation::ContinuationReused {
                stage: self.stage,
                index: self.index,
            }));
        }
        Ok(())
    }
}

impl<T> fmt::Debug for Next<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("operation", &self.invocation.operation)
            .field("stage", &self.stage)
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Done
// ---------------------------------------------------------------------------

/// Completion signal handed only to asynchronous before-interceptors.
///
/// The operation does not run until every asynchronous interceptor of the
/// invocation has called `complete` (or one of them called `fail`).
pub struct Done<T> {
    invocation: Arc<Invocation<T>>,
    index: usize,
    latch: Latch,
}

impl<T> Done<T> {
    pub(crate) fn new(invocation: Arc<Invocation<T>>, index: usize) -> Self {
        Self {
            invocation,
            index,
            latch: Latch::default(),
        }
    }

    /// Current phase of the invocation. A deferred side effect can check
    /// for a terminal phase and skip work whose result would be ignored.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.invocation.ctx.lock().phase()
    }

    /// Report that this interceptor's side effect finished.
    ///
    /// # Errors
    ///
    /// Contract violations, and any error surfaced by steps that run
    /// synchronously as a result of this call (including the operation).
    pub fn complete(&self) -> Result<(), HookError> {
        self.claim()?;
        let step = self.invocation.ctx.lock().complete_async();
        match step {
            Some(step) => runner::schedule(&self.invocation, step),
            None => Ok(()),
        }
    }

    /// Report failure. The operation is suppressed even if every other
    /// interceptor already finished.
    ///
    /// # Errors
    ///
    /// Contract violations, or `HookError::Unhandled` when the router has
    /// nowhere to deliver the error.
    pub fn fail(&self, error: impl Into<ChainError>) -> Result<(), HookError> {
        self.claim()?;
        router::route(&self.invocation, error.into())
    }

    fn claim(&self) -> Result<(), HookError> {
        if self.latch.fire() {
            return Err(self
                .invocation
                .abort(ContractViolation::CompletionReused { index: self.index }));
        }
        Ok(())
    }
}

impl<T> fmt::Debug for Done<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Done")
            .field("operation", &self.invocation.operation)
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}
