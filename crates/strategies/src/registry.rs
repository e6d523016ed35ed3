use std::path::Path;

use tlafuzz_graph::TestCase;
use tlafuzz_runtime::{ReferenceEvaluator, TraceSink};

use crate::error::StrategyError;
use crate::{Artifact, Strategy, StrategyDescriptor};

pub const NAME: &str = "registry";

/// Runs the reference evaluator.
pub struct RegistryStrategy {
    descriptor: StrategyDescriptor,
}

impl RegistryStrategy {
    pub fn new() -> Self {
        RegistryStrategy {
            descriptor: StrategyDescriptor::new(NAME, "Custom module registry algorithm"),
        }
    }
}

impl Default for RegistryStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for RegistryStrategy {
    fn descriptor(&self) -> &StrategyDescriptor {
        &self.descriptor
    }

    fn build(&self, case: &TestCase, _dir: &Path) -> Result<Box<dyn Artifact>, StrategyError> {
        case.validate()?;
        let entry = case
            .entry()
            .map(|m| m.name.clone())
            .ok_or(tlafuzz_graph::GraphError::Empty)?;
        let evaluator = ReferenceEvaluator::new(case)?;
        Ok(Box::new(RegistryArtifact { evaluator, entry }))
    }
}

struct RegistryArtifact {
    evaluator: ReferenceEvaluator,
    entry: String,
}

impl Artifact for RegistryArtifact {
    fn execute(&mut self, sink: &mut TraceSink) -> Result<(), StrategyError> {
        self.evaluator.evaluate(&self.entry, sink)?;
        Ok(())
    }
}
