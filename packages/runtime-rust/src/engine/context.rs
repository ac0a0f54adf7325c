//! Per-invocation state. One `ExecutionContext` exists per call to the
//! wrapped operation and is never shared with another call.

use std::collections::VecDeque;

use hookline_core::{Args, Callback};

use super::barrier::AsyncBarrier;

/// Unit of work queued for the chain driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Before(usize),
    Operation,
    After(usize),
    Finish,
}

/// Where an invocation currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Before,
    Operation,
    After,
    /// The after-chain ran to the end.
    Completed,
    /// A chain error was routed.
    Failed,
    /// A contract violation stopped the invocation.
    Aborted,
}

impl Phase {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Aborted)
    }
}

#[derive(Debug)]
pub(crate) struct ExecutionContext {
    args: Args,
    cursor: usize,
    before_len: usize,
    after_len: usize,
    barrier: AsyncBarrier,
    trailing: Option<Callback>,
    phase: Phase,
    queue: VecDeque<Step>,
    driving: bool,
}

impl ExecutionContext {
    pub(crate) fn new(
        args: Args,
        before_len: usize,
        after_len: usize,
        pending_async: usize,
        trailing: Option<Callback>,
    ) -> Self {
        Self {
            args,
            cursor: 0,
            before_len,
            after_len,
            barrier: AsyncBarrier::new(pending_async),
            trailing,
            phase: Phase::Before,
            queue: VecDeque::new(),
            driving: false,
        }
    }

    /// The first step of the invocation.
    pub(crate) fn first_step(&mut self) -> Option<Step> {
        if self.before_len > 0 {
            Some(Step::Before(0))
        } else if self.barrier.mark_cursor_complete() {
            Some(Step::Operation)
        } else {
            None
        }
    }

    pub(crate) fn args(&self) -> &Args {
        &self.args
    }

    pub(crate) fn phase(&self) -> Phase {
        self.phase
    }

    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }

    pub(crate) fn pending_async(&self) -> usize {
        self.barrier.pending()
    }

    pub(crate) fn has_trailing(&self) -> bool {
        self.trailing.is_some()
    }

    /// Before-interceptor `index` called `next`.
    pub(crate) fn advance_before(&mut self, index: usize, args: Option<Args>) -> Option<Step> {
        if self.phase != Phase::Before {
            return None;
        }
        debug_assert_eq!(index, self.cursor, "before-chain advanced out of order");
        self.replace_args(args);
        self.cursor = index + 1;
        if self.cursor < self.before_len {
            Some(Step::Before(self.cursor))
        } else if self.barrier.mark_cursor_complete() {
            Some(Step::Operation)
        } else {
            None
        }
    }

    /// An asynchronous before-interceptor called `done`.
    pub(crate) fn complete_async(&mut self) -> Option<Step> {
        if self.phase != Phase::Before {
            return None;
        }
        self.barrier.complete_one().then_some(Step::Operation)
    }

    /// Moves into the operation phase. Returns `false` if the invocation
    /// already settled.
    pub(crate) fn enter_operation(&mut self) -> bool {
        if self.phase != Phase::Before {
            return false;
        }
        self.phase = Phase::Operation;
        true
    }

    /// The operation returned successfully.
    pub(crate) fn operation_returned(&mut self) -> Option<Step> {
        if self.phase != Phase::Operation {
            return None;
        }
        self.phase = Phase::After;
        if self.after_len > 0 {
            Some(Step::After(0))
        } else {
            Some(Step::Finish)
        }
    }

    /// After-interceptor `index` called `next`.
    pub(crate) fn advance_after(&mut self, index: usize, args: Option<Args>) -> Option<Step> {
        if self.phase != Phase::After {
            return None;
        }
        self.replace_args(args);
        if index + 1 < self.after_len {
            Some(Step::After(index + 1))
        } else {
            Some(Step::Finish)
        }
    }

    /// Marks the invocation completed and hands back the trailing callback.
    pub(crate) fn complete(&mut self) -> Option<Option<Callback>> {
        if self.phase != Phase::After {
            return None;
        }
        self.phase = Phase::Completed;
        Some(self.trailing.take())
    }

    /// Stops the invocation. Queued steps are discarded. Returns `None` if
    /// it had already settled, otherwise the trailing callback (if any).
    pub(crate) fn halt(&mut self, phase: Phase) -> Option<Option<Callback>> {
        debug_assert!(phase.is_terminal());
        if self.phase.is_terminal() {
            return None;
        }
        self.phase = phase;
        self.queue.clear();
        Some(self.trailing.take())
    }

    /// Queues a step. Returns `true` when the caller must start driving.
    pub(crate) fn enqueue(&mut self, step: Step) -> bool {
        if self.phase.is_terminal() {
            return false;
        }
        self.queue.push_back(step);
        if self.driving {
            false
        } else {
            self.driving = true;
            true
        }
    }

    /// Takes the next queued step. Releases the driver when the queue is empty.
    pub(crate) fn next_step(&mut self) -> Option<Step> {
        let step = self.queue.pop_front();
        if step.is_none() {
            self.driving = false;
        }
        step
    }

    /// Releases the driver without draining the queue.
    pub(crate) fn release_driver(&mut self) {
        self.driving = false;
    }

    fn replace_args(&mut self, args: Option<Args>) {
        if let Some(args) = args {
            self.args = args;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(before: usize, after: usize, pending: usize) -> ExecutionContext {
        ExecutionContext::new(Args::from(["hello", "world"]), before, after, pending, None)
    }

    #[test]
    fn empty_chain_goes_straight_to_operation() {
        let mut ctx = ctx(0, 0, 0);
        assert_eq!(ctx.first_step(), Some(Step::Operation));
    }

    #[test]
    fn cursor_walks_before_chain_in_order() {
        let mut ctx = ctx(3, 0, 0);
        assert_eq!(ctx.first_step(), Some(Step::Before(0)));
        assert_eq!(ctx.advance_before(0, None), Some(Step::Before(1)));
        assert_eq!(ctx.advance_before(1, None), Some(Step::Before(2)));
        assert_eq!(ctx.advance_before(2, None), Some(Step::Operation));
        assert_eq!(ctx.cursor(), 3);
    }

    #[test]
    fn replacement_args_are_kept() {
        let mut ctx = ctx(1, 0, 0);
        ctx.advance_before(0, Some(Args::from(["foo", "bar"])));
        assert_eq!(ctx.args(), &Args::from(["foo", "bar"]));
    }

    #[test]
    fn end_of_cursor_waits_for_async_completion() {
        let mut ctx = ctx(2, 0, 1);
        assert_eq!(ctx.advance_before(0, None), Some(Step::Before(1)));
        assert_eq!(ctx.advance_before(1, None), None);
        assert_eq!(ctx.complete_async(), Some(Step::Operation));
    }

    #[test]
    fn after_phase_finishes_after_last_interceptor() {
        let mut ctx = ctx(0, 2, 0);
        ctx.first_step();
        assert!(ctx.enter_operation());
        assert_eq!(ctx.operation_returned(), Some(Step::After(0)));
        assert_eq!(ctx.advance_after(0, None), Some(Step::After(1)));
        assert_eq!(ctx.advance_after(1, None), Some(Step::Finish));
        assert!(ctx.complete().is_some());
        assert_eq!(ctx.phase(), Phase::Completed);
    }

    #[test]
    fn halt_discards_queue_and_happens_once() {
        let mut ctx = ctx(2, 0, 0);
        assert!(ctx.enqueue(Step::Before(0)));
        assert!(!ctx.enqueue(Step::Before(1)));
        assert!(ctx.halt(Phase::Failed).is_some());
        assert!(ctx.halt(Phase::Aborted).is_none());
        assert_eq!(ctx.phase(), Phase::Failed);
        assert_eq!(ctx.next_step(), None);
        assert!(!ctx.enqueue(Step::Operation));
    }

    #[test]
    fn steps_after_halt_are_ignored() {
        let mut ctx = ctx(2, 0, 1);
        ctx.halt(Phase::Failed);
        assert_eq!(ctx.advance_before(0, None), None);
        assert_eq!(ctx.complete_async(), None);
        assert!(!ctx.enter_operation());
    }
}
