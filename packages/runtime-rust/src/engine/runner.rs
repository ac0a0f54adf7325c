//! Before/after chain runner and the step driver.

use std::sync::Arc;

use hookline_core::{ChainError, Stage};

use super::context::{Phase, Step};
use super::continuation::{Done, Latch, Next};
use super::{router, Invocation};
use crate::error::{ContractViolation, HookError};
use crate::interceptor::Body;

/// Queues `step` and, if no driver is active for this invocation, drives
/// the chain on the current thread until it settles or suspends.
pub(crate) fn schedule<T>(invocation: &Arc<Invocation<T>>, step: Step) -> Result<(), HookError> {
    let must_drive = invocation.ctx.lock().enqueue(step);
    if must_drive {
        drive(invocation)
    } else {
        Ok(())
    }
}

fn drive<T>(invocation: &Arc<Invocation<T>>) -> Result<(), HookError> {
    loop {
        let Some(step) = invocation.ctx.lock().next_step() else {
            return Ok(());
        };
        if let Err(err) = run_step(invocation, step) {
            let mut ctx = invocation.ctx.lock();
            let phase = if err.is_contract_violation() {
                Phase::Aborted
            } else {
                Phase::Failed
            };
            // No-op when the step already settled the invocation.
            let _ = ctx.halt(phase);
            ctx.release_driver();
            return Err(err);
        }
    }
}

fn run_step<T>(invocation: &Arc<Invocation<T>>, step: Step) -> Result<(), HookError> {
    match step {
        Step::Before(index) => run_interceptor(invocation, Stage::Before, index),
        Step::After(index) => run_interceptor(invocation, Stage::After, index),
        Step::Operation => run_operation(invocation),
        Step::Finish => finish(invocation),
    }
}

fn run_interceptor<T>(
    invocation: &Arc<Invocation<T>>,
    stage: Stage,
    index: usize,
) -> Result<(), HookError> {
    let interceptor = match stage {
        Stage::Before => &invocation.plan.before[index],
        Stage::After => &invocation.plan.after[index],
    };
    let args = invocation.args_for(interceptor.arity());
    let latch = Latch::default();
    let next = Next::new(Arc::clone(invocation), stage, index, latch.clone());

    tracing::trace!(
        operation = %invocation.operation,
        invocation = %invocation.id,
        %stage,
        index,
        "running interceptor"
    );

    let result = match (interceptor.body(), stage) {
        (Body::Sync(f), _) => f(&*invocation.target, next, args),
        (Body::Async(f), Stage::Before) => {
            let done = Done::new(Arc::clone(invocation), index);
            f(&*invocation.target, next, done, args)
        }
        (Body::Async(_), Stage::After) => {
            return Err(invocation.abort(ContractViolation::AsyncAfterInterceptor));
        }
    };

    match result {
        Ok(()) => Ok(()),
        Err(err @ HookError::Contract { .. }) => Err(err),
        // Raised by this invocation's own router; it already settled.
        Err(err @ HookError::Unhandled { .. }) if invocation.ctx.lock().phase().is_terminal() => {
            Err(err)
        }
        // Any other `Err` from the body stands in for `next.fail(..)`,
        // including an unhandled error from a nested invocation.
        Err(err) => {
            if latch.fire() {
                return Err(invocation.abort(ContractViolation::ContinuationReused { stage, index }));
            }
            let error = match err {
                HookError::Rejected(error) => error,
                other => ChainError::new(other),
            };
            router::route(invocation, error)
        }
    }
}

fn run_operation<T>(invocation: &Arc<Invocation<T>>) -> Result<(), HookError> {
    let args = {
        let mut ctx = invocation.ctx.lock();
        if !ctx.enter_operation() {
            return Ok(());
        }
        tracing::debug!(
            operation = %invocation.operation,
            invocation = %invocation.id,
            cursor = ctx.cursor(),
            "before-chain settled; invoking operation"
        );
        ctx.args().clone()
    };

    match invocation.plan.operation.call(&*invocation.target, args) {
        Ok(()) => {
            let step = invocation.ctx.lock().operation_returned();
            match step {
                Some(step) => schedule(invocation, step),
                None => Ok(()),
            }
        }
        Err(error) => router::route(invocation, ChainError::from(error)),
    }
}

fn finish<T>(invocation: &Arc<Invocation<T>>) -> Result<(), HookError> {
    let (trailing, args) = {
        let mut ctx = invocation.ctx.lock();
        let Some(trailing) = ctx.complete() else {
            return Ok(());
        };
        (trailing, ctx.args().clone())
    };
    tracing::debug!(
        operation = %invocation.operation,
        invocation = %invocation.id,
        "invocation completed"
    );
    if let Some(callback) = trailing {
        callback.call(Ok(args));
    }
    Ok(())
}
