pub mod error;
pub mod queue;
pub mod reference;
pub mod sink;

pub use error::EvaluationError;
pub use queue::{Lane, TaskQueue};
pub use reference::{evaluate_trace, ReferenceEvaluator, Status};
pub use sink::{SinkLease, Trace, TraceSink};
