use thiserror::Error;

use crate::column::ColumnKind;

pub type TableResult<T> = Result<T, TableError>;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum TableError {
    #[error("column {column} has {actual} rows, expected {expected}")]
    RaggedColumn {
        column: String,
        expected: usize,
        actual: usize,
    },
    #[error("duplicate column name {0}")]
    DuplicateColumn(String),
    #[error("unknown column {0}")]
    UnknownColumn(String),
    #[error("column {column} is {actual:?}, expected {expected:?}")]
    KindMismatch {
        column: String,
        expected: ColumnKind,
        actual: ColumnKind,
    },
    #[error("row index {row} out of bounds for table with {rows} rows")]
    RowOutOfBounds { row: usize, rows: usize },
}
