use thiserror::Error;
use tlafuzz_graph::GraphError;
use tlafuzz_runtime::EvaluationError;

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("invalid graph: {0}")]
    Graph(#[from] GraphError),

    #[error("evaluation failed: {0}")]
    Evaluation(#[from] EvaluationError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("entry module `{0}` never settled")]
    Unsettled(String),

    #[error("{0}")]
    Failed(String),
}
