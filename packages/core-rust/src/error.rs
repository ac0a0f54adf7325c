use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// Error signaled by a chain step.
///
/// Wraps an `anyhow::Error` behind an `Arc` so one failure can be handed to
/// an error handler, a trailing callback, or back into the operation as a
/// `Value::Error` without re-allocating or losing its source chain.
#[derive(Clone)]
pub struct ChainError {
    inner: Arc<anyhow::Error>,
}

impl ChainError {
    /// Wraps any standard error.
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::from(anyhow::Error::new(error))
    }

    /// Creates an error from a printable message.
    pub fn msg<M>(message: M) -> Self
    where
        M: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        Self::from(anyhow::Error::msg(message))
    }

    /// Attempts to view the underlying error as a concrete type.
    #[must_use]
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.inner.downcast_ref::<E>()
    }

    /// Whether two handles refer to the same signaled error.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl From<anyhow::Error> for ChainError {
    fn from(error: anyhow::Error) -> Self {
        Self {
            inner: Arc::new(error),
        }
    }
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.inner, f)
    }
}

impl fmt::Debug for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}

impl StdError for ChainError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        (**self.inner).source()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Invalid;

    impl fmt::Display for Invalid {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("invalid")
        }
    }

    impl StdError for Invalid {}

    #[test]
    fn display_forwards_to_inner() {
        let err = ChainError::msg("save rejected");
        assert_eq!(err.to_string(), "save rejected");
    }

    #[test]
    fn downcast_recovers_concrete_type() {
        let err = ChainError::new(Invalid);
        assert!(err.downcast_ref::<Invalid>().is_some());
    }

    #[test]
    fn clones_share_identity() {
        let err = ChainError::msg("x");
        assert!(err.ptr_eq(&err.clone()));
    }
}
