pub mod error;
pub mod generator;
pub mod module;
pub mod variant;

pub use error::GraphError;
pub use generator::{GraphGenerator, DEFAULT_MODULE_COUNT};
pub use module::{EffectScript, Module, ModuleTable, TestCase};
pub use variant::Variant;
