//! Call request and service error types.

use std::sync::Arc;

use hookline_core::{Args, ChainError};

use crate::error::HookError;

// ---------------------------------------------------------------------------
// Call
// ---------------------------------------------------------------------------

/// One call of an installed operation, as seen by the service pipeline.
#[derive(Debug)]
pub struct Call<T> {
    /// Object the operation and interceptors run against.
    pub target: Arc<T>,
    /// Name the operation was installed under.
    pub operation: String,
    /// Call arguments. A trailing callback is appended by [`HookService`](super::HookService).
    pub args: Args,
    /// Per-call deadline; the pipeline default applies when `None`.
    pub deadline_ms: Option<u64>,
}

impl<T> Call<T> {
    #[must_use]
    pub fn new(target: Arc<T>, operation: impl Into<String>, args: impl Into<Args>) -> Self {
        Self {
            target,
            operation: operation.into(),
            args: args.into(),
            deadline_ms: None,
        }
    }

    #[must_use]
    pub fn with_deadline_ms(mut self, deadline_ms: u64) -> Self {
        self.deadline_ms = Some(deadline_ms);
        self
    }
}

// ---------------------------------------------------------------------------
// OperationError
// ---------------------------------------------------------------------------

/// Errors returned by the service pipeline.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    /// The invocation did not settle before its deadline.
    #[error("call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The chain failed and the error was routed to the call.
    #[error("chain failed: {0}")]
    Chain(ChainError),

    /// The invocation ended without reporting back: the error went to the
    /// operation's own handler, or every continuation handle was dropped.
    #[error("invocation of `{operation}` ended without reporting an outcome")]
    Abandoned { operation: String },

    /// The registry rejected the call or a contract was violated.
    #[error(transparent)]
    Hook(#[from] HookError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_defaults_to_pipeline_deadline() {
        let call = Call::new(Arc::new(()), "save", ["a"]);
        assert_eq!(call.operation, "save");
        assert_eq!(call.args.len(), 1);
        assert_eq!(call.deadline_ms, None);
        assert_eq!(call.with_deadline_ms(250).deadline_ms, Some(250));
    }

    #[test]
    fn hook_errors_convert_transparently() {
        let err = OperationError::from(HookError::NotInstalled {
            operation: "save".to_string(),
        });
        assert!(matches!(err, OperationError::Hook(HookError::NotInstalled { .. })));
        assert!(err.to_string().contains("save"));
    }
}
