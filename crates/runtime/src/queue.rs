//! Two-lane cooperative task queue.
//!
//! The continuation lane is the host's job FIFO. The deferred lane holds work
//! that may only run once the continuation lane is empty, so every
//! continuation queued in a round runs before any deferred work of that
//! round. Within a lane, tasks run in FIFO order.

use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    Continuation,
    Deferred,
}

#[derive(Debug)]
pub struct TaskQueue<T> {
    continuations: VecDeque<T>,
    deferred: VecDeque<T>,
    dispatched: u64,
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TaskQueue<T> {
    pub fn new() -> Self {
        TaskQueue {
            continuations: VecDeque::new(),
            deferred: VecDeque::new(),
            dispatched: 0,
        }
    }

    pub fn push_continuation(&mut self, task: T) {
        self.continuations.push_back(task);
    }

    pub fn push_deferred(&mut self, task: T) {
        self.deferred.push_back(task);
    }

    /// Next task to run, continuations first.
    pub fn pop(&mut self) -> Option<(Lane, T)> {
        let next = match self.continuations.pop_front() {
            Some(task) => Some((Lane::Continuation, task)),
            None => self.deferred.pop_front().map(|task| (Lane::Deferred, task)),
        };
        if next.is_some() {
            self.dispatched += 1;
        }
        next
    }

    /// Total tasks handed out by [`TaskQueue::pop`].
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }
}
