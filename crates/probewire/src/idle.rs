//! Waiters deferred until no call is outstanding.
//!
//! The barrier is a snapshot fence: a waiter is released the first time the
//! outstanding count reaches zero after it was queued, which covers every
//! call already in flight at queuing time but not necessarily calls issued
//! afterwards.

use std::collections::VecDeque;
use std::mem;

/// Work scheduled to run once the connection is idle.
pub type IdleCallback = Box<dyn FnOnce()>;

/// FIFO queue of idle waiters.
#[derive(Default)]
pub(crate) struct IdleBarrier {
    waiters: VecDeque<IdleCallback>,
}

impl IdleBarrier {
    /// Appends a waiter to the back of the queue.
    pub(crate) fn push(&mut self, callback: IdleCallback) {
        self.waiters.push_back(callback);
    }

    /// Number of queued waiters.
    pub(crate) fn len(&self) -> usize {
        self.waiters.len()
    }

    /// Removes every waiter, preserving queue order.
    ///
    /// The caller runs the returned callbacks once it no longer holds any
    /// borrow of the owning state, so waiters may queue further work.
    pub(crate) fn take_all(&mut self) -> VecDeque<IdleCallback> {
        mem::take(&mut self.waiters)
    }
}

/// Runs drained waiters in FIFO order.
pub(crate) fn run_waiters(waiters: VecDeque<IdleCallback>) {
    for waiter in waiters {
        waiter();
    }
}
