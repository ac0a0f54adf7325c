//! Chain execution engine.
//!
//! Each call to an installed operation becomes an [`Invocation`]:
//!
//! 1. **Before phase** (`runner`): before-interceptors run in registration
//!    order; asynchronous ones also hold the barrier until they call `done`
//! 2. **Barrier** (`barrier`): opens once, when the cursor reached the end
//!    and every asynchronous interceptor completed
//! 3. **Operation**: invoked with the current argument vector
//! 4. **After phase** (`runner`): after-interceptors run in order
//! 5. **Errors** (`router`): routed to exactly one handler; the rest of the
//!    chain is dropped
//!
//! Steps are driven by a trampoline, so continuations fired synchronously
//! do not grow the stack and continuations fired later (from a timer or
//! another thread) resume the chain on the caller's thread.

mod barrier;
mod context;
mod continuation;
mod router;
mod runner;

use std::sync::Arc;

use hookline_core::{Args, Callback};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::config::{HookConfig, UnhandledPolicy};
use crate::error::{ContractViolation, HookError};
use crate::interceptor::Interceptor;
use crate::operation::Operation;

use self::context::ExecutionContext;

pub use context::Phase;
pub use continuation::{Done, Next};

/// Snapshot of a binding taken when an invocation starts. Changes to the
/// registry after this point affect only later invocations.
pub(crate) struct Plan<T> {
    pub(crate) operation: Operation<T>,
    pub(crate) before: Vec<Interceptor<T>>,
    pub(crate) after: Vec<Interceptor<T>>,
}

pub(crate) struct Invocation<T> {
    id: Uuid,
    operation: String,
    target: Arc<T>,
    plan: Plan<T>,
    unhandled: UnhandledPolicy,
    pad_missing_args: bool,
    ctx: Mutex<ExecutionContext>,
}

impl<T> Invocation<T> {
    /// The argument vector as interceptor `arity` should see it.
    fn args_for(&self, arity: Option<usize>) -> Args {
        let args = self.ctx.lock().args().clone();
        match arity {
            Some(n) if self.pad_missing_args => args.padded(n),
            _ => args,
        }
    }

    /// Stops the invocation for a contract violation and builds the error
    /// returned to the offending caller.
    fn abort(&self, violation: ContractViolation) -> HookError {
        tracing::error!(
            operation = %self.operation,
            invocation = %self.id,
            %violation,
            "contract violation in interceptor chain"
        );
        // The trailing callback is dropped, not called.
        let _ = self.ctx.lock().halt(Phase::Aborted);
        HookError::Contract {
            operation: self.operation.clone(),
            violation,
        }
    }
}

/// Starts one invocation of `plan` against `target`.
///
/// Returns once no more work can run synchronously: either the invocation
/// settled, or it is waiting on a continuation that has not fired yet.
pub(crate) fn start<T>(
    target: Arc<T>,
    operation: &str,
    plan: Plan<T>,
    config: &HookConfig,
    mut args: Args,
) -> Result<(), HookError> {
    let trailing: Option<Callback> = args.pop_callback();
    if let (Some(arity), true) = (plan.operation.arity(), config.pad_missing_args) {
        args.pad_to(arity);
    }

    let pending_async = plan.before.iter().filter(|i| i.is_async()).count();
    let mut ctx = ExecutionContext::new(
        args,
        plan.before.len(),
        plan.after.len(),
        pending_async,
        trailing,
    );
    let first = ctx.first_step();

    let invocation = Arc::new(Invocation {
        id: Uuid::new_v4(),
        operation: operation.to_string(),
        target,
        plan,
        unhandled: config.unhandled,
        pad_missing_args: config.pad_missing_args,
        ctx: Mutex::new(ctx),
    });

    {
        let ctx = invocation.ctx.lock();
        tracing::debug!(
            operation = %invocation.operation,
            invocation = %invocation.id,
            before = invocation.plan.before.len(),
            after = invocation.plan.after.len(),
            pending_async = ctx.pending_async(),
            trailing_callback = ctx.has_trailing(),
            "invocation started"
        );
    }

    match first {
        Some(step) => runner::schedule(&invocation, step),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
