use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("test case has no modules")]
    Empty,

    #[error("duplicate module name: {0}")]
    DuplicateModule(String),

    #[error("module `{module}` imports unknown module `{import}`")]
    UnknownImport { module: String, import: String },
}
