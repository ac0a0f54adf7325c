//! Ordered before/after interceptor lists for a single operation.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_INTERCEPTOR_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of an interceptor, assigned at construction.
///
/// Removal by identity compares these, so a cloned interceptor handle
/// removes the entry it was registered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterceptorId(u64);

impl InterceptorId {
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_INTERCEPTOR_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for InterceptorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which side of the operation an interceptor runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Before,
    After,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Before => f.write_str("before"),
            Self::After => f.write_str("after"),
        }
    }
}

/// Anything stored in an [`InterceptorChain`] must expose its identity.
pub trait Identified {
    fn id(&self) -> InterceptorId;
}

/// Ordered before- and after-interceptor lists for one operation name.
///
/// Insertion order is execution order. Removing an entry never reorders
/// the remaining ones.
#[derive(Debug, Clone)]
pub struct InterceptorChain<I> {
    before: Vec<I>,
    after: Vec<I>,
}

impl<I> InterceptorChain<I> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            before: Vec::new(),
            after: Vec::new(),
        }
    }

    #[must_use]
    pub fn before(&self) -> &[I] {
        &self.before
    }

    #[must_use]
    pub fn after(&self) -> &[I] {
        &self.after
    }

    pub fn push_before(&mut self, interceptor: I) {
        self.before.push(interceptor);
    }

    pub fn push_after(&mut self, interceptor: I) {
        self.after.push(interceptor);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }
}

impl<I: Identified> InterceptorChain<I> {
    /// Removes the matching before-interceptor, or every one when `id` is `None`.
    /// Returns how many entries were removed.
    pub fn remove_before(&mut self, id: Option<InterceptorId>) -> usize {
        remove_from(&mut self.before, id, Stage::Before)
    }

    /// Removes the matching after-interceptor, or every one when `id` is `None`.
    /// Returns how many entries were removed.
    pub fn remove_after(&mut self, id: Option<InterceptorId>) -> usize {
        remove_from(&mut self.after, id, Stage::After)
    }
}

impl<I> Default for InterceptorChain<I> {
    fn default() -> Self {
        Self::new()
    }
}

fn remove_from<I: Identified>(list: &mut Vec<I>, id: Option<InterceptorId>, stage: Stage) -> usize {
    let before = list.len();
    match id {
        Some(id) => list.retain(|entry| entry.id() != id),
        None => list.clear(),
    }
    let removed = before - list.len();
    tracing::trace!(%stage, removed, "interceptors removed");
    removed
}
