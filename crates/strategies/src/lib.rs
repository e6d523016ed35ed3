//! Module evaluation strategies.
//!
//! A [`Strategy`] turns a [`TestCase`] into an executable [`Artifact`]. The
//! fuzzer designates one strategy as the oracle and compares every other
//! strategy's trace against it.

pub mod error;
pub mod flattened;
pub mod inline_await;
pub mod native;
pub mod registry;

use std::path::Path;

use serde::{Deserialize, Serialize};
use tlafuzz_graph::TestCase;
use tlafuzz_runtime::TraceSink;

pub use error::StrategyError;
pub use flattened::FlattenedStrategy;
pub use inline_await::InlineAwaitStrategy;
pub use native::NativeStrategy;
pub use registry::RegistryStrategy;

/// Static metadata attached to a strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyDescriptor {
    pub name: String,
    pub version: String,
}

impl StrategyDescriptor {
    pub fn new(name: &str, version: &str) -> Self {
        StrategyDescriptor {
            name: name.to_string(),
            version: version.to_string(),
        }
    }
}

/// An executable built from a test case.
pub trait Artifact {
    /// Run to completion, including every scheduled continuation, reporting
    /// observable effects through `sink`.
    fn execute(&mut self, sink: &mut TraceSink) -> Result<(), StrategyError>;
}

pub trait Strategy {
    fn descriptor(&self) -> &StrategyDescriptor;

    /// Build an artifact for `case`. `dir` is an empty directory owned by
    /// this build for the lifetime of the trial.
    fn build(&self, case: &TestCase, dir: &Path) -> Result<Box<dyn Artifact>, StrategyError>;

    fn name(&self) -> &str {
        &self.descriptor().name
    }
}

/// Names of the built-in strategies, in catalogue order.
pub const BUILTIN_NAMES: [&str; 4] = [
    native::NAME,
    registry::NAME,
    inline_await::NAME,
    flattened::NAME,
];

/// Look up a built-in strategy by name.
pub fn by_name(name: &str) -> Option<Box<dyn Strategy>> {
    match name {
        native::NAME => Some(Box::new(NativeStrategy::new())),
        registry::NAME => Some(Box::new(RegistryStrategy::new())),
        inline_await::NAME => Some(Box::new(InlineAwaitStrategy::new())),
        flattened::NAME => Some(Box::new(FlattenedStrategy::new())),
        _ => None,
    }
}

/// Every built-in strategy, in catalogue order.
pub fn builtin() -> Vec<Box<dyn Strategy>> {
    BUILTIN_NAMES.iter().filter_map(|n| by_name(n)).collect()
}
