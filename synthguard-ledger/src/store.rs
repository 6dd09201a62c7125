use std::sync::Arc;

use dashmap::{mapref::entry::Entry, DashMap};
use parking_lot::Mutex;
use tracing::info;

use crate::{
    config::LedgerConfig,
    errors::{LedgerError, LedgerResult},
    ledger::BudgetLedger,
    state::{BudgetState, BudgetStatus, ConsumeReceipt, ResetRecord},
};

/// Ledgers keyed by dataset id, each behind its own lock.
pub struct LedgerStore {
    default_config: LedgerConfig,
    ledgers: DashMap<String, Arc<Mutex<BudgetLedger>>>,
}

impl LedgerStore {
    /// `default_config` applies to datasets first touched by [`LedgerStore::consume`].
    pub fn new(default_config: LedgerConfig) -> LedgerResult<Self> {
        default_config.validate()?;
        Ok(Self {
            default_config,
            ledgers: DashMap::new(),
        })
    }

    pub fn default_config(&self) -> &LedgerConfig {
        &self.default_config
    }

    pub fn register(&self, dataset_id: &str, config: LedgerConfig) -> LedgerResult<BudgetState> {
        let ledger = BudgetLedger::new(dataset_id, config)?;
        let state = ledger.state();
        match self.ledgers.entry(dataset_id.to_owned()) {
            Entry::Occupied(_) => {
                Err(LedgerError::DatasetExists(dataset_id.to_owned()))
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(ledger)));
                info!(
                    dataset = dataset_id,
                    total = state.total_budget,
                    "privacy ledger registered"
                );
                Ok(state)
            }
        }
    }

    pub fn contains(&self, dataset_id: &str) -> bool {
        self.ledgers.contains_key(dataset_id)
    }

    pub fn dataset_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.ledgers.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }

    fn ledger(&self, dataset_id: &str) -> LedgerResult<Arc<Mutex<BudgetLedger>>> {
        self.ledgers
            .get(dataset_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| LedgerError::UnknownDataset(dataset_id.to_owned()))
    }

    fn ledger_or_default(&self, dataset_id: &str) -> LedgerResult<Arc<Mutex<BudgetLedger>>> {
        if let Some(entry) = self.ledgers.get(dataset_id) {
            return Ok(entry.value().clone());
        }
        let ledger = BudgetLedger::new(dataset_id, self.default_config.clone())?;
        Ok(self
            .ledgers
            .entry(dataset_id.to_owned())
            .or_insert_with(|| Arc::new(Mutex::new(ledger)))
            .clone())
    }

    /// Spends `epsilon` against `dataset_id`, creating its ledger with the
    /// default config on first use. Check and record happen under the
    /// dataset's lock.
    pub fn consume(
        &self,
        dataset_id: &str,
        epsilon: f64,
        label: &str,
        actor: &str,
    ) -> LedgerResult<ConsumeReceipt> {
        let ledger = self.ledger_or_default(dataset_id)?;
        let mut guard = ledger.lock();
        guard.consume(epsilon, label, actor)
    }

    pub fn status(&self, dataset_id: &str) -> LedgerResult<BudgetStatus> {
        Ok(self.ledger(dataset_id)?.lock().status())
    }

    pub fn snapshot(&self, dataset_id: &str) -> LedgerResult<BudgetState> {
        Ok(self.ledger(dataset_id)?.lock().state())
    }

    pub fn reset(&self, dataset_id: &str, actor: &str, reason: &str) -> LedgerResult<ResetRecord> {
        Ok(self.ledger(dataset_id)?.lock().reset(actor, reason))
    }
}

impl Default for LedgerStore {
    fn default() -> Self {
        Self {
            default_config: LedgerConfig::default(),
            ledgers: DashMap::new(),
        }
    }
}
