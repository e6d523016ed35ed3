//! Modules concatenated into one program in dependency post-order.
//!
//! The order is a depth-first walk from the entry that places every module
//! after its imports, visiting imports in declared order and cutting cycles
//! at the back edge. The program runs top to bottom, so a suspending module
//! holds up every module placed after it.

use std::collections::BTreeSet;
use std::path::Path;

use tlafuzz_graph::{EffectScript, TestCase};
use tlafuzz_runtime::{TaskQueue, TraceSink};

use crate::error::StrategyError;
use crate::{Artifact, Strategy, StrategyDescriptor};

pub const NAME: &str = "flattened";

/// File the concatenated program is written to.
pub const BUNDLE_FILE: &str = "bundle.mjs";

pub struct FlattenedStrategy {
    descriptor: StrategyDescriptor,
}

impl FlattenedStrategy {
    pub fn new() -> Self {
        FlattenedStrategy {
            descriptor: StrategyDescriptor::new(NAME, "Flattened bundle with top-level await"),
        }
    }
}

impl Default for FlattenedStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for FlattenedStrategy {
    fn descriptor(&self) -> &StrategyDescriptor {
        &self.descriptor
    }

    fn build(&self, case: &TestCase, dir: &Path) -> Result<Box<dyn Artifact>, StrategyError> {
        let order = bundle_order(case)?;

        let mut bundle = String::new();
        for &idx in &order {
            let module = &case.modules[idx];
            bundle.push_str(&format!("// {}\n", module.file_name()));
            for line in module.source().lines() {
                if !line.starts_with("import ") {
                    bundle.push_str(line);
                    bundle.push('\n');
                }
            }
        }
        std::fs::write(dir.join(BUNDLE_FILE), bundle)?;
        tracing::trace!(dir = %dir.display(), modules = order.len(), "wrote bundle");

        let program = order
            .iter()
            .map(|&idx| case.modules[idx].effects.clone())
            .collect();
        Ok(Box::new(FlattenedArtifact {
            program,
            jobs: TaskQueue::new(),
        }))
    }
}

/// Module indices in bundle order. Only modules reachable from the entry
/// are included.
pub fn bundle_order(case: &TestCase) -> Result<Vec<usize>, StrategyError> {
    let table = case.resolve()?;
    let mut visited = BTreeSet::new();
    let mut order = Vec::with_capacity(table.len());

    // Explicit stack of (module, next import to look at).
    let mut stack = vec![(table.entry, 0usize)];
    visited.insert(table.entry);
    while let Some((module, next)) = stack.pop() {
        match table.imports[module].get(next) {
            Some(&dep) => {
                stack.push((module, next + 1));
                if visited.insert(dep) {
                    stack.push((dep, 0));
                }
            }
            None => order.push(module),
        }
    }
    Ok(order)
}

enum Job {
    /// Continue the program at `position`, after that module's `await`.
    Resume(usize),
    Emit(String),
}

struct FlattenedArtifact {
    program: Vec<EffectScript>,
    jobs: TaskQueue<Job>,
}

impl FlattenedArtifact {
    /// Run the program from `position` until it suspends or ends.
    fn run_from(&mut self, mut position: usize, mut resumed: bool, sink: &mut TraceSink) {
        while let Some(effects) = self.program.get(position) {
            if !resumed {
                sink.emit(effects.before.clone());
                if effects.suspends() {
                    self.jobs.push_continuation(Job::Resume(position));
                    return;
                }
            } else if let Some(resume) = &effects.resume {
                sink.emit(resume.clone());
            }
            if let Some(after) = effects.after.clone() {
                self.jobs.push_continuation(Job::Emit(after));
            }
            resumed = false;
            position += 1;
        }
    }
}

impl Artifact for FlattenedArtifact {
    fn execute(&mut self, sink: &mut TraceSink) -> Result<(), StrategyError> {
        self.run_from(0, false, sink);
        while let Some((_, job)) = self.jobs.pop() {
            match job {
                Job::Resume(position) => self.run_from(position, true, sink),
                Job::Emit(event) => sink.emit(event),
            }
        }
        Ok(())
    }
}
