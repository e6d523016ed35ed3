use thiserror::Error;
use tlafuzz_graph::GraphError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    #[error("invalid graph: {0}")]
    Graph(#[from] GraphError),

    #[error("unknown module: {0}")]
    UnknownModule(String),

    #[error("evaluation stalled with unfinished modules: {}", .0.join(", "))]
    Stalled(Vec<String>),
}
