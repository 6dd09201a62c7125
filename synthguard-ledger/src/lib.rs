//! Differential-privacy budget accounting per dataset.
//!
//! A [`BudgetLedger`] records every ε spend against one dataset, refused
//! attempts included, and reports the effective spend under its
//! [`CompositionMethod`]. [`LedgerStore`] keys ledgers by dataset id and
//! serialises check-then-act per dataset behind its own lock.

pub mod composition;
pub mod config;
pub mod errors;
pub mod ledger;
pub mod state;
pub mod store;

pub use composition::{AccountingMethod, Composed, CompositionMethod};
pub use config::LedgerConfig;
pub use errors::{LedgerError, LedgerResult};
pub use ledger::BudgetLedger;
pub use state::{
    BudgetEntry, BudgetState, BudgetStatus, BudgetWarning, ConsumeReceipt, EntryOutcome,
    ResetRecord, LEDGER_SCHEMA_VERSION,
};
pub use store::LedgerStore;
