use thiserror::Error;

pub type AuditResult<T> = Result<T, InferenceError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum InferenceError {
    #[error("original and synthetic tables differ in schema: {0}")]
    SchemaMismatch(String),
    #[error("unknown sensitive column {0}")]
    UnknownColumn(String),
    #[error("{0} table has no rows")]
    EmptyInput(&'static str),
    #[error("invalid audit config: {0}")]
    InvalidConfig(String),
}
