//! Reference module evaluator.
//!
//! A reentrant graph walk over an index-addressed module table. Every module
//! moves `Ready -> Busy -> Done` exactly once. A module waits for each import
//! that is not already on its own dependency path, then runs its body. The
//! current path is passed explicitly, so a module is never re-entered while
//! it is being evaluated further up the same path; that is what makes cyclic
//! graphs terminate.
//!
//! Resumptions, "after" events and the completion of a suspended module run
//! in FIFO order on the continuation lane of a [`TaskQueue`]. A resumed module
//! queues its "after" event before its completion, so importers start only
//! once that tail has run. The report to the caller that the entry finished
//! goes on the deferred lane.

use std::collections::BTreeSet;

use tlafuzz_graph::{EffectScript, ModuleTable, TestCase};

use crate::error::EvaluationError;
use crate::queue::TaskQueue;
use crate::sink::{Trace, TraceSink};

/// Lifecycle of a module inside one evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ready,
    Busy,
    Done,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready => write!(f, "ready"),
            Self::Busy => write!(f, "busy"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Continuation invoked when a module completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Waiter {
    /// One of `parent`'s imports finished.
    Import { parent: usize },
    /// The module passed to [`ReferenceEvaluator::evaluate`] finished.
    Entry,
}

#[derive(Debug)]
enum Task {
    Resume(usize),
    Emit(String),
    /// A suspended body finished; notify its waiters.
    Complete(usize),
    EntryDone,
}

#[derive(Debug)]
struct EvaluationRecord {
    status: Status,
    pending: usize,
    waiters: Vec<Waiter>,
    effects: EffectScript,
}

pub struct ReferenceEvaluator {
    table: ModuleTable,
    records: Vec<EvaluationRecord>,
    queue: TaskQueue<Task>,
    entry_done: bool,
}

impl ReferenceEvaluator {
    pub fn new(case: &TestCase) -> Result<Self, EvaluationError> {
        let table = case.resolve()?;
        let records = case
            .modules
            .iter()
            .map(|m| EvaluationRecord {
                status: Status::Ready,
                pending: 0,
                waiters: Vec::new(),
                effects: m.effects.clone(),
            })
            .collect();
        Ok(ReferenceEvaluator {
            table,
            records,
            queue: TaskQueue::new(),
            entry_done: false,
        })
    }

    pub fn status(&self, name: &str) -> Option<Status> {
        let idx = self.table.names.iter().position(|n| n == name)?;
        Some(self.records[idx].status)
    }

    /// Evaluate `entry` and everything it imports, running all scheduled
    /// work to completion. Modules already done are not evaluated again.
    pub fn evaluate(&mut self, entry: &str, sink: &mut TraceSink) -> Result<(), EvaluationError> {
        let id = self
            .table
            .names
            .iter()
            .position(|n| n == entry)
            .ok_or_else(|| EvaluationError::UnknownModule(entry.to_string()))?;

        tracing::trace!(entry, "reference evaluation started");
        self.entry_done = false;
        self.visit(id, Waiter::Entry, &BTreeSet::new(), sink);

        while let Some((_, task)) = self.queue.pop() {
            match task {
                Task::Resume(idx) => self.resume(idx, sink),
                Task::Emit(event) => sink.emit(event),
                Task::Complete(idx) => self.complete(idx, sink),
                Task::EntryDone => self.entry_done = true,
            }
        }

        if !self.entry_done {
            let unfinished = self
                .records
                .iter()
                .zip(&self.table.names)
                .filter(|(r, _)| r.status == Status::Busy)
                .map(|(_, n)| n.clone())
                .collect();
            return Err(EvaluationError::Stalled(unfinished));
        }
        tracing::trace!(entry, tasks = self.queue.dispatched(), "reference evaluation finished");
        Ok(())
    }

    fn visit(&mut self, id: usize, on_done: Waiter, path: &BTreeSet<usize>, sink: &mut TraceSink) {
        match self.records[id].status {
            Status::Done => {
                self.notify(on_done, sink);
                return;
            }
            Status::Busy => {
                self.records[id].waiters.push(on_done);
                return;
            }
            Status::Ready => {}
        }

        let record = &mut self.records[id];
        record.status = Status::Busy;
        record.waiters.push(on_done);
        // One extra count for the module itself, released after every
        // import has been issued.
        record.pending = 1;

        let mut path = path.clone();
        path.insert(id);

        let imports = self.table.imports[id].clone();
        for dep in imports {
            if path.contains(&dep) {
                continue;
            }
            self.records[id].pending += 1;
            self.visit(dep, Waiter::Import { parent: id }, &path, sink);
        }
        self.import_done(id, sink);
    }

    fn import_done(&mut self, id: usize, sink: &mut TraceSink) {
        let record = &mut self.records[id];
        record.pending -= 1;
        if record.pending == 0 {
            self.run_body(id, sink);
        }
    }

    fn run_body(&mut self, id: usize, sink: &mut TraceSink) {
        let effects = &self.records[id].effects;
        sink.emit(effects.before.clone());
        if effects.suspends() {
            self.queue.push_continuation(Task::Resume(id));
            return;
        }
        if let Some(after) = effects.after.clone() {
            self.queue.push_continuation(Task::Emit(after));
        }
        self.complete(id, sink);
    }

    fn resume(&mut self, id: usize, sink: &mut TraceSink) {
        let effects = &self.records[id].effects;
        if let Some(resume) = &effects.resume {
            sink.emit(resume.clone());
        }
        if let Some(after) = effects.after.clone() {
            self.queue.push_continuation(Task::Emit(after));
        }
        self.queue.push_continuation(Task::Complete(id));
    }

    fn complete(&mut self, id: usize, sink: &mut TraceSink) {
        let record = &mut self.records[id];
        record.status = Status::Done;
        let waiters = std::mem::take(&mut record.waiters);
        for waiter in waiters {
            self.notify(waiter, sink);
        }
    }

    fn notify(&mut self, waiter: Waiter, sink: &mut TraceSink) {
        match waiter {
            Waiter::Import { parent } => self.import_done(parent, sink),
            Waiter::Entry => self.queue.push_deferred(Task::EntryDone),
        }
    }
}

/// Evaluate the entry module of `case` against a fresh sink.
pub fn evaluate_trace(case: &TestCase) -> Result<Trace, EvaluationError> {
    let entry = case
        .entry()
        .map(|m| m.name.clone())
        .ok_or(EvaluationError::Graph(tlafuzz_graph::GraphError::Empty))?;
    let mut evaluator = ReferenceEvaluator::new(case)?;
    let mut sink = TraceSink::new();
    evaluator.evaluate(&entry, &mut sink)?;
    Ok(sink.drain())
}
