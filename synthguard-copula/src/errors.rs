use synthguard_table::TableError;
use thiserror::Error;

pub type CopulaResult<T> = Result<T, CopulaError>;

#[derive(Debug, Error)]
pub enum CopulaError {
    #[error("column {column} has {observed} non-missing values, at least {required} required")]
    InsufficientData {
        column: String,
        observed: usize,
        required: usize,
    },
    #[error("correlation matrix is degenerate: {reason}")]
    DegenerateCorrelation { reason: String },
    #[error("column {column} is not part of the fitted model")]
    UnfittedColumn { column: String },
    #[error(transparent)]
    Table(#[from] TableError),
}
