//! Completion barrier gating the operation on the before-phase.

/// Opens once every before-interceptor has called `next` and every
/// asynchronous one has called `done`, whichever happens last.
#[derive(Debug)]
pub(crate) struct AsyncBarrier {
    pending: usize,
    cursor_complete: bool,
    opened: bool,
}

impl AsyncBarrier {
    /// `pending` is the number of asynchronous before-interceptors in this
    /// invocation's snapshot. It is set here and only ever decremented.
    pub(crate) fn new(pending: usize) -> Self {
        Self {
            pending,
            cursor_complete: false,
            opened: false,
        }
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending
    }

    /// Records that the cursor reached the end of the before-chain.
    /// Returns `true` if this call opened the barrier.
    pub(crate) fn mark_cursor_complete(&mut self) -> bool {
        self.cursor_complete = true;
        self.try_open()
    }

    /// Records one asynchronous completion.
    /// Returns `true` if this call opened the barrier.
    pub(crate) fn complete_one(&mut self) -> bool {
        debug_assert!(self.pending > 0, "more completions than asynchronous interceptors");
        self.pending = self.pending.saturating_sub(1);
        self.try_open()
    }

    fn try_open(&mut self) -> bool {
        if self.opened || !self.cursor_complete || self.pending > 0 {
            return false;
        }
        self.opened = true;
        true
    }
}
