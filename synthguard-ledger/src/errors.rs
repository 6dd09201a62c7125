use thiserror::Error;

pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LedgerError {
    #[error("epsilon must be finite and positive, got {epsilon}")]
    InvalidEpsilon { epsilon: f64 },
    #[error("privacy budget exhausted for dataset {dataset_id}: requested {requested}, spent {spent} of {total}")]
    BudgetExhausted {
        dataset_id: String,
        requested: f64,
        spent: f64,
        total: f64,
    },
    #[error("unknown dataset {0}")]
    UnknownDataset(String),
    #[error("dataset {0} already has a ledger")]
    DatasetExists(String),
    #[error("invalid ledger config: {0}")]
    InvalidConfig(String),
}
