//! Error routing. A chain error goes to exactly one place, first match wins:
//!
//! 1. the error handler installed with the operation
//! 2. the trailing callback captured from the call arguments
//! 3. the registry's [`UnhandledPolicy`]: the operation itself, or the caller

use std::sync::Arc;

use hookline_core::{Args, ChainError, Value};

use super::context::Phase;
use super::Invocation;
use crate::config::UnhandledPolicy;
use crate::error::HookError;

pub(crate) fn route<T>(invocation: &Arc<Invocation<T>>, error: ChainError) -> Result<(), HookError> {
    let Some(trailing) = invocation.ctx.lock().halt(Phase::Failed) else {
        tracing::debug!(
            operation = %invocation.operation,
            invocation = %invocation.id,
            %error,
            "error signaled after invocation settled; ignored"
        );
        return Ok(());
    };

    let target = &*invocation.target;
    let operation = &invocation.plan.operation;

    if operation.handle_error(target, error.clone()) {
        tracing::debug!(
            operation = %invocation.operation,
            invocation = %invocation.id,
            %error,
            "chain error routed to error handler"
        );
        return Ok(());
    }

    if let Some(callback) = trailing {
        tracing::debug!(
            operation = %invocation.operation,
            invocation = %invocation.id,
            %error,
            "chain error routed to trailing callback"
        );
        callback.call(Err(error));
        return Ok(());
    }

    match invocation.unhandled {
        UnhandledPolicy::SelfHeal => {
            tracing::warn!(
                operation = %invocation.operation,
                invocation = %invocation.id,
                %error,
                "no error handler; invoking operation with the error"
            );
            operation
                .call(target, Args::from(vec![Value::Error(error)]))
                .map_err(|source| HookError::Unhandled {
                    operation: invocation.operation.clone(),
                    source: ChainError::from(source),
                })
        }
        UnhandledPolicy::Surface => {
            tracing::warn!(
                operation = %invocation.operation,
                invocation = %invocation.id,
                %error,
                "no error handler; surfacing error to caller"
            );
            Err(HookError::Unhandled {
                operation: invocation.operation.clone(),
                source: error,
            })
        }
    }
}
