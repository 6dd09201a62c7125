use synthguard_anonymity::AnonymityError;
use synthguard_copula::CopulaError;
use synthguard_inference::InferenceError;
use synthguard_ledger::LedgerError;
use synthguard_table::TableError;
use thiserror::Error;

use crate::config::ConfigError;

pub type CertifyResult<T> = Result<T, CertifyError>;

#[derive(Debug, Error)]
pub enum CertifyError {
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Copula(#[from] CopulaError),
    #[error(transparent)]
    Anonymity(#[from] AnonymityError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
