use synthguard_table::TableError;
use thiserror::Error;

pub type AnonymityResult<T> = Result<T, AnonymityError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnonymityError {
    #[error("unknown quasi-identifier column {0}")]
    UnknownColumn(String),
    #[error(transparent)]
    Table(TableError),
}

impl From<TableError> for AnonymityError {
    fn from(err: TableError) -> Self {
        match err {
            TableError::UnknownColumn(name) => AnonymityError::UnknownColumn(name),
            other => AnonymityError::Table(other),
        }
    }
}
