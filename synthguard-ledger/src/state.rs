use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::composition::{AccountingMethod, CompositionMethod};

pub const LEDGER_SCHEMA_VERSION: u32 = 1;

fn schema_version() -> u32 {
    LEDGER_SCHEMA_VERSION
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntryOutcome {
    Accepted,
    Refused,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BudgetEntry {
    pub epsilon: f64,
    pub label: String,
    pub actor: String,
    pub timestamp: DateTime<Utc>,
    pub outcome: EntryOutcome,
}

impl BudgetEntry {
    pub fn is_accepted(&self) -> bool {
        self.outcome == EntryOutcome::Accepted
    }
}

/// Audit record of one explicit reset; the cleared entries are archived here.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ResetRecord {
    pub actor: String,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
    pub spent_before: f64,
    pub archived: Vec<BudgetEntry>,
}

/// Serializable snapshot of one dataset's ledger.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BudgetState {
    #[serde(default = "schema_version")]
    pub schema_version: u32,
    pub dataset_id: String,
    pub total_budget: f64,
    /// Effective ε under `method`.
    pub spent: f64,
    #[serde(default)]
    pub sequential_spent: f64,
    pub remaining: f64,
    #[serde(default)]
    pub method: AccountingMethod,
    #[serde(default)]
    pub composition: CompositionMethod,
    pub warning_fraction: f64,
    pub auto_pause: bool,
    pub entries: Vec<BudgetEntry>,
    #[serde(default)]
    pub resets: Vec<ResetRecord>,
}

impl BudgetState {
    pub fn accepted_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_accepted()).count()
    }

    pub fn refused_count(&self) -> usize {
        self.entries.len() - self.accepted_count()
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining <= 0.0
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BudgetStatus {
    pub dataset_id: String,
    pub total_budget: f64,
    pub spent: f64,
    pub remaining: f64,
    pub accepted: usize,
    pub refused: usize,
    pub method: AccountingMethod,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BudgetWarning {
    pub remaining_fraction: f64,
    pub threshold: f64,
    pub message: String,
}

/// Outcome of an accepted spend.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ConsumeReceipt {
    pub entry: BudgetEntry,
    pub state: BudgetState,
    pub warning: Option<BudgetWarning>,
    /// Spend exceeded the budget because auto-pause is off.
    pub overrun: bool,
}
