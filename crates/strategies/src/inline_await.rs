//! Every import becomes an inline `await` of a once-guarded async
//! initializer.
//!
//! Each module is compiled to `once(async () => { await init(dep)...; body })`.
//! The guard has three phases: not started, running and finished. Calling
//! it while the initializer is still running returns nothing instead of the
//! pending promise, which is what keeps import cycles from deadlocking.
//! The guard learns that the initializer finished through a reaction on its
//! promise, so it costs a job like any other reaction.
//!
//! Promises are modelled by a small table of pending/fulfilled entries with
//! reaction lists; fulfilling a promise queues one job per reaction, and
//! awaiting a settled promise or a plain value queues one job.

use std::path::Path;

use tlafuzz_graph::{EffectScript, ModuleTable, TestCase};
use tlafuzz_runtime::{TaskQueue, TraceSink};

use crate::error::StrategyError;
use crate::{Artifact, Strategy, StrategyDescriptor};

pub const NAME: &str = "inline-await";

pub struct InlineAwaitStrategy {
    descriptor: StrategyDescriptor,
}

impl InlineAwaitStrategy {
    pub fn new() -> Self {
        InlineAwaitStrategy {
            descriptor: StrategyDescriptor::new(NAME, "Import becomes inline await"),
        }
    }
}

impl Default for InlineAwaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for InlineAwaitStrategy {
    fn descriptor(&self) -> &StrategyDescriptor {
        &self.descriptor
    }

    fn build(&self, case: &TestCase, _dir: &Path) -> Result<Box<dyn Artifact>, StrategyError> {
        let table = case.resolve()?;
        let guards = case
            .modules
            .iter()
            .map(|m| Guard {
                phase: Phase::NotStarted,
                result: None,
                effects: m.effects.clone(),
            })
            .collect();
        Ok(Box::new(InlineAwaitArtifact {
            table,
            guards,
            promises: Vec::new(),
            frames: Vec::new(),
            jobs: TaskQueue::new(),
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    NotStarted,
    Running,
    Finished,
}

struct Guard {
    phase: Phase,
    result: Option<PromiseId>,
    effects: EffectScript,
}

type PromiseId = usize;
type FrameId = usize;

#[derive(Debug, Clone, Copy)]
enum Reaction {
    Resume(FrameId),
    /// `result.then(() => phase++)`
    Finish(usize),
}

enum PromiseState {
    Pending(Vec<Reaction>),
    Fulfilled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    /// Awaiting import number `n`.
    Import(usize),
    /// About to run the body from the top.
    Body,
    /// Resumed after the body's own `await 0`.
    Resumed,
}

struct Frame {
    module: usize,
    stage: Stage,
    promise: PromiseId,
}

enum Job {
    React(Reaction),
    Emit(String),
}

struct InlineAwaitArtifact {
    table: ModuleTable,
    guards: Vec<Guard>,
    promises: Vec<PromiseState>,
    frames: Vec<Frame>,
    jobs: TaskQueue<Job>,
}

impl InlineAwaitArtifact {
    fn new_promise(&mut self) -> PromiseId {
        self.promises.push(PromiseState::Pending(Vec::new()));
        self.promises.len() - 1
    }

    fn then(&mut self, promise: PromiseId, reaction: Reaction) {
        match &mut self.promises[promise] {
            PromiseState::Pending(reactions) => reactions.push(reaction),
            PromiseState::Fulfilled => self.jobs.push_continuation(Job::React(reaction)),
        }
    }

    fn fulfill(&mut self, promise: PromiseId) {
        let state = std::mem::replace(&mut self.promises[promise], PromiseState::Fulfilled);
        if let PromiseState::Pending(reactions) = state {
            for reaction in reactions {
                self.jobs.push_continuation(Job::React(reaction));
            }
        }
    }

    /// `await value`, where `None` stands for `undefined`.
    fn await_value(&mut self, value: Option<PromiseId>, frame: FrameId) {
        match value {
            Some(promise) => self.then(promise, Reaction::Resume(frame)),
            None => self.jobs.push_continuation(Job::React(Reaction::Resume(frame))),
        }
    }

    /// Call the once-guarded initializer of `module`.
    fn call_once(&mut self, module: usize, sink: &mut TraceSink) -> Option<PromiseId> {
        match self.guards[module].phase {
            Phase::NotStarted => {
                self.guards[module].phase = Phase::Running;
                let promise = self.start(module, sink);
                self.guards[module].result = Some(promise);
                self.then(promise, Reaction::Finish(module));
                Some(promise)
            }
            Phase::Running => None,
            Phase::Finished => self.guards[module].result,
        }
    }

    fn start(&mut self, module: usize, sink: &mut TraceSink) -> PromiseId {
        let promise = self.new_promise();
        let stage = if self.table.imports[module].is_empty() {
            Stage::Body
        } else {
            Stage::Import(0)
        };
        self.frames.push(Frame {
            module,
            stage,
            promise,
        });
        self.step(self.frames.len() - 1, sink);
        promise
    }

    /// Run a frame until its next `await` or its end.
    fn step(&mut self, frame: FrameId, sink: &mut TraceSink) {
        let module = self.frames[frame].module;
        match self.frames[frame].stage {
            Stage::Import(n) => {
                let dep = self.table.imports[module][n];
                self.frames[frame].stage = if n + 1 < self.table.imports[module].len() {
                    Stage::Import(n + 1)
                } else {
                    Stage::Body
                };
                let value = self.call_once(dep, sink);
                self.await_value(value, frame);
            }
            Stage::Body => {
                sink.emit(self.guards[module].effects.before.clone());
                if self.guards[module].effects.suspends() {
                    self.frames[frame].stage = Stage::Resumed;
                    self.await_value(None, frame);
                } else {
                    self.finish(frame);
                }
            }
            Stage::Resumed => {
                if let Some(resume) = self.guards[module].effects.resume.clone() {
                    sink.emit(resume);
                }
                self.finish(frame);
            }
        }
    }

    fn finish(&mut self, frame: FrameId) {
        let module = self.frames[frame].module;
        if let Some(after) = self.guards[module].effects.after.clone() {
            self.jobs.push_continuation(Job::Emit(after));
        }
        self.fulfill(self.frames[frame].promise);
    }
}

impl Artifact for InlineAwaitArtifact {
    fn execute(&mut self, sink: &mut TraceSink) -> Result<(), StrategyError> {
        let entry = self.table.entry;
        let root = self.call_once(entry, sink);

        while let Some((_, job)) = self.jobs.pop() {
            match job {
                Job::React(Reaction::Resume(frame)) => self.step(frame, sink),
                Job::React(Reaction::Finish(module)) => {
                    self.guards[module].phase = Phase::Finished;
                }
                Job::Emit(event) => sink.emit(event),
            }
        }

        match root.map(|p| &self.promises[p]) {
            Some(PromiseState::Fulfilled) => Ok(()),
            _ => Err(StrategyError::Unsettled(self.table.names[entry].clone())),
        }
    }
}
