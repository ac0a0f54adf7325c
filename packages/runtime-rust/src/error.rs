use hookline_core::{ChainError, Stage};

/// Programmer errors in how an interceptor uses its continuations.
///
/// These are never routed to an error handler. The offending call fails
/// and the invocation it belongs to is aborted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractViolation {
    #[error("`next` invoked more than once by {stage} interceptor {index}")]
    ContinuationReused { stage: Stage, index: usize },
    #[error("`done` invoked more than once by asynchronous before interceptor {index}")]
    CompletionReused { index: usize },
    #[error("after-interceptors are always synchronous; an asynchronous interceptor was given")]
    AsyncAfterInterceptor,
}

/// Errors produced by the hook registry and chain engine.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("operation `{operation}` has not been installed")]
    NotInstalled { operation: String },
    #[error("contract violation in `{operation}`: {violation}")]
    Contract {
        operation: String,
        violation: ContractViolation,
    },
    #[error("unhandled error in `{operation}`: {source}")]
    Unhandled {
        operation: String,
        source: ChainError,
    },
    /// Returned by an interceptor body instead of calling `next.fail`.
    #[error("interceptor rejected the call: {0}")]
    Rejected(ChainError),
}

impl HookError {
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::Contract { .. })
    }
}

impl From<anyhow::Error> for HookError {
    fn from(error: anyhow::Error) -> Self {
        Self::Rejected(ChainError::from(error))
    }
}

impl From<ChainError> for HookError {
    fn from(error: ChainError) -> Self {
        Self::Rejected(error)
    }
}
