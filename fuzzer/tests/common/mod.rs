#![allow(dead_code)]

use std::path::Path;

use tlafuzz::{FuzzConfig, StrategySet};
use tlafuzz_graph::{Module, TestCase, Variant};
use tlafuzz_runtime::TraceSink;
use tlafuzz_strategies::{Artifact, NativeStrategy, Strategy, StrategyDescriptor, StrategyError};

#[derive(Clone, Copy)]
pub enum Rig {
    Faithful,
    SwapFirstTwo,
    FailOnCyclic,
    AlwaysFail(&'static str),
}

/// Wraps the native strategy and misbehaves on purpose.
pub struct Rigged {
    descriptor: StrategyDescriptor,
    inner: NativeStrategy,
    rig: Rig,
}

impl Rigged {
    pub fn boxed(name: &str, rig: Rig) -> Box<dyn Strategy> {
        Box::new(Rigged {
            descriptor: StrategyDescriptor::new(name, &format!("rigged {name}")),
            inner: NativeStrategy::new(),
            rig,
        })
    }
}

impl Strategy for Rigged {
    fn descriptor(&self) -> &StrategyDescriptor {
        &self.descriptor
    }

    fn build(&self, case: &TestCase, dir: &Path) -> Result<Box<dyn Artifact>, StrategyError> {
        match self.rig {
            Rig::AlwaysFail(message) => return Err(StrategyError::Failed(message.into())),
            Rig::FailOnCyclic if case.variant.cyclic => {
                return Err(StrategyError::Failed("cyclic graphs unsupported".into()))
            }
            _ => {}
        }
        let inner = self.inner.build(case, dir)?;
        Ok(Box::new(RiggedArtifact {
            inner,
            swap: matches!(self.rig, Rig::SwapFirstTwo),
        }))
    }
}

struct RiggedArtifact {
    inner: Box<dyn Artifact>,
    swap: bool,
}

impl Artifact for RiggedArtifact {
    fn execute(&mut self, sink: &mut TraceSink) -> Result<(), StrategyError> {
        self.inner.execute(sink)?;
        if self.swap {
            let mut trace = sink.drain();
            if trace.len() >= 2 {
                trace.0.swap(0, 1);
            }
            for event in trace.0 {
                sink.emit(event);
            }
        }
        Ok(())
    }
}

pub fn native_oracle(candidates: Vec<Box<dyn Strategy>>) -> StrategySet {
    StrategySet {
        oracle: Box::new(NativeStrategy::new()),
        candidates,
    }
}

pub fn config(scratch_root: &Path, trials: u32, variants: &[Variant]) -> FuzzConfig {
    FuzzConfig {
        trials,
        variants: variants.to_vec(),
        scratch_root: Some(scratch_root.to_path_buf()),
        ..FuzzConfig::default()
    }
}

/// 2 imports 1 imports 0, all synchronous.
pub fn sync_chain() -> TestCase {
    TestCase::new(
        Variant::new(false, false),
        vec![
            Module::new("0", &[], false, false),
            Module::new("1", &["0"], false, false),
            Module::new("2", &["1"], false, false),
        ],
    )
    .unwrap()
}

/// A -> B, A -> C, B -> D, C -> D with suspension and deferred tails.
pub fn diamond() -> TestCase {
    TestCase::new(
        Variant::new(false, true),
        vec![
            Module::new("D", &[], true, true),
            Module::new("B", &["D"], true, true),
            Module::new("C", &["D"], false, true),
            Module::new("A", &["B", "C"], true, true),
        ],
    )
    .unwrap()
}

pub fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}
