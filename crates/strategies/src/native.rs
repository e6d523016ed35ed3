//! Model of the ECMAScript cyclic module record evaluation algorithm with
//! top-level await.
//!
//! Modules are evaluated by a depth-first walk that numbers every module,
//! tracks the lowest reachable ancestor index and closes strongly connected
//! components when a module turns out to be its own root. A module that has
//! top-level await, or waits on an import that does, is evaluated
//! asynchronously: it is stamped with a global async evaluation order and
//! runs once all its async imports have fulfilled. Completion of an async
//! module wakes every parent whose last pending import it was, in async
//! evaluation order.
//!
//! Host jobs run on a single FIFO. `await 0` costs one job, completion of an
//! async body queues one job that runs the fulfilment step, and an "after"
//! event is one job queued when it is scheduled.

use std::path::Path;

use tlafuzz_graph::{EffectScript, ModuleTable, TestCase};
use tlafuzz_runtime::{TaskQueue, TraceSink};

use crate::error::StrategyError;
use crate::{Artifact, Strategy, StrategyDescriptor};

pub const NAME: &str = "native";

/// Oracle strategy following the language's own module semantics.
pub struct NativeStrategy {
    descriptor: StrategyDescriptor,
}

impl NativeStrategy {
    pub fn new() -> Self {
        NativeStrategy {
            descriptor: StrategyDescriptor::new(NAME, "ECMAScript module evaluation (TLA)"),
        }
    }
}

impl Default for NativeStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for NativeStrategy {
    fn descriptor(&self) -> &StrategyDescriptor {
        &self.descriptor
    }

    fn build(&self, case: &TestCase, dir: &Path) -> Result<Box<dyn Artifact>, StrategyError> {
        let table = case.resolve()?;
        for (file, source) in case.sources() {
            std::fs::write(dir.join(file), source)?;
        }
        tracing::trace!(dir = %dir.display(), modules = table.len(), "wrote module sources");

        let records = case
            .modules
            .iter()
            .enumerate()
            .map(|(idx, m)| ModuleRecord::new(table.unique_imports(idx), m.effects.clone()))
            .collect();
        Ok(Box::new(NativeArtifact {
            table,
            records,
            jobs: TaskQueue::new(),
            async_order: 0,
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordStatus {
    Linked,
    Evaluating,
    EvaluatingAsync,
    Evaluated,
}

#[derive(Debug)]
struct ModuleRecord {
    status: RecordStatus,
    /// Import requests, deduplicated, in source order.
    requested: Vec<usize>,
    effects: EffectScript,
    dfs_index: usize,
    dfs_ancestor_index: usize,
    cycle_root: Option<usize>,
    async_evaluation: bool,
    async_order: u64,
    pending_async: usize,
    async_parents: Vec<usize>,
}

impl ModuleRecord {
    fn new(requested: Vec<usize>, effects: EffectScript) -> Self {
        ModuleRecord {
            status: RecordStatus::Linked,
            requested,
            effects,
            dfs_index: 0,
            dfs_ancestor_index: 0,
            cycle_root: None,
            async_evaluation: false,
            async_order: 0,
            pending_async: 0,
            async_parents: Vec::new(),
        }
    }

    fn has_tla(&self) -> bool {
        self.effects.suspends()
    }
}

#[derive(Debug)]
enum Job {
    /// Continue a body after its `await`.
    Resume(usize),
    /// The async body's promise fulfilled.
    Fulfilled(usize),
    Emit(String),
}

struct NativeArtifact {
    table: ModuleTable,
    records: Vec<ModuleRecord>,
    jobs: TaskQueue<Job>,
    async_order: u64,
}

impl NativeArtifact {
    fn inner_evaluation(
        &mut self,
        module: usize,
        stack: &mut Vec<usize>,
        mut index: usize,
        sink: &mut TraceSink,
    ) -> usize {
        if self.records[module].status != RecordStatus::Linked {
            return index;
        }

        let record = &mut self.records[module];
        record.status = RecordStatus::Evaluating;
        record.dfs_index = index;
        record.dfs_ancestor_index = index;
        record.pending_async = 0;
        index += 1;
        stack.push(module);

        let requested = self.records[module].requested.clone();
        for req in requested {
            index = self.inner_evaluation(req, stack, index, sink);
            let mut required = req;
            if self.records[req].status == RecordStatus::Evaluating {
                let ancestor = self.records[req].dfs_ancestor_index;
                let record = &mut self.records[module];
                record.dfs_ancestor_index = record.dfs_ancestor_index.min(ancestor);
            } else {
                required = self.records[req].cycle_root.unwrap_or(req);
            }
            if self.records[required].async_evaluation {
                self.records[module].pending_async += 1;
                self.records[required].async_parents.push(module);
            }
        }

        let record = &self.records[module];
        if record.pending_async > 0 || record.has_tla() {
            self.async_order += 1;
            let record = &mut self.records[module];
            record.async_evaluation = true;
            record.async_order = self.async_order;
            if record.pending_async == 0 {
                self.execute_async(module, sink);
            }
        } else {
            self.execute_sync(module, sink);
        }

        let record = &self.records[module];
        if record.dfs_ancestor_index == record.dfs_index {
            while let Some(member) = stack.pop() {
                let record = &mut self.records[member];
                record.status = if record.async_evaluation {
                    RecordStatus::EvaluatingAsync
                } else {
                    RecordStatus::Evaluated
                };
                record.cycle_root = Some(module);
                if member == module {
                    break;
                }
            }
        }
        index
    }

    fn execute_sync(&mut self, module: usize, sink: &mut TraceSink) {
        let effects = &self.records[module].effects;
        sink.emit(effects.before.clone());
        if let Some(after) = effects.after.clone() {
            self.jobs.push_continuation(Job::Emit(after));
        }
    }

    fn execute_async(&mut self, module: usize, sink: &mut TraceSink) {
        sink.emit(self.records[module].effects.before.clone());
        self.jobs.push_continuation(Job::Resume(module));
    }

    fn resume(&mut self, module: usize, sink: &mut TraceSink) {
        let effects = &self.records[module].effects;
        if let Some(resume) = &effects.resume {
            sink.emit(resume.clone());
        }
        if let Some(after) = effects.after.clone() {
            self.jobs.push_continuation(Job::Emit(after));
        }
        self.jobs.push_continuation(Job::Fulfilled(module));
    }

    fn fulfilled(&mut self, module: usize, sink: &mut TraceSink) {
        if self.records[module].status == RecordStatus::Evaluated {
            return;
        }
        let record = &mut self.records[module];
        record.async_evaluation = false;
        record.status = RecordStatus::Evaluated;

        let mut exec_list = Vec::new();
        self.gather_available_ancestors(module, &mut exec_list);
        exec_list.sort_by_key(|&m| self.records[m].async_order);

        for m in exec_list {
            if self.records[m].status == RecordStatus::Evaluated {
                continue;
            }
            if self.records[m].has_tla() {
                self.execute_async(m, sink);
            } else {
                self.execute_sync(m, sink);
                let record = &mut self.records[m];
                record.async_evaluation = false;
                record.status = RecordStatus::Evaluated;
            }
        }
    }

    fn gather_available_ancestors(&mut self, module: usize, exec_list: &mut Vec<usize>) {
        let parents = self.records[module].async_parents.clone();
        for parent in parents {
            if exec_list.contains(&parent) {
                continue;
            }
            let record = &mut self.records[parent];
            record.pending_async -= 1;
            if record.pending_async == 0 {
                exec_list.push(parent);
                if !record.has_tla() {
                    self.gather_available_ancestors(parent, exec_list);
                }
            }
        }
    }
}

impl Artifact for NativeArtifact {
    fn execute(&mut self, sink: &mut TraceSink) -> Result<(), StrategyError> {
        let entry = self.table.entry;
        let mut stack = Vec::new();
        self.inner_evaluation(entry, &mut stack, 0, sink);

        while let Some((_, job)) = self.jobs.pop() {
            match job {
                Job::Resume(m) => self.resume(m, sink),
                Job::Fulfilled(m) => self.fulfilled(m, sink),
                Job::Emit(event) => sink.emit(event),
            }
        }

        if self.records[entry].status != RecordStatus::Evaluated {
            return Err(StrategyError::Unsettled(self.table.names[entry].clone()));
        }
        Ok(())
    }
}
