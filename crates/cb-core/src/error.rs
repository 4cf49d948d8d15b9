use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("unknown job status: {0}")]
    UnknownStatus(String),
    #[error("unknown generation kind: {0}")]
    UnknownKind(String),
}
