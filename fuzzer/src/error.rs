use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("trial budget must be positive")]
    ZeroTrials,

    #[error("module count must be positive")]
    ZeroModules,

    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("oracle `{0}` is also listed as a candidate")]
    OracleIsCandidate(String),

    #[error("candidate `{0}` listed twice")]
    DuplicateCandidate(String),

    #[error("no candidate strategies selected")]
    NoCandidates,

    #[error("no variants selected")]
    NoVariants,
}

#[derive(Debug, Error)]
pub enum FuzzError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("cannot create scratch directory: {0}")]
    Scratch(std::io::Error),

    #[error("cannot write report {}: {source}", path.display())]
    Report {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}
