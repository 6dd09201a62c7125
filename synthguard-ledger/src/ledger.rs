use chrono::Utc;
use tracing::{debug, info, warn};

use crate::{
    composition::Composed,
    config::LedgerConfig,
    errors::{LedgerError, LedgerResult},
    state::{
        BudgetEntry, BudgetState, BudgetStatus, BudgetWarning, ConsumeReceipt, EntryOutcome,
        ResetRecord, LEDGER_SCHEMA_VERSION,
    },
};

/// Absorbs float summation noise when comparing spend with the budget.
const SPEND_TOLERANCE: f64 = 1e-12;

/// Privacy-budget ledger for one dataset.
#[derive(Clone, Debug)]
pub struct BudgetLedger {
    dataset_id: String,
    config: LedgerConfig,
    entries: Vec<BudgetEntry>,
    resets: Vec<ResetRecord>,
}

impl BudgetLedger {
    pub fn new(dataset_id: impl Into<String>, config: LedgerConfig) -> LedgerResult<Self> {
        config.validate()?;
        Ok(Self {
            dataset_id: dataset_id.into(),
            config,
            entries: Vec::new(),
            resets: Vec::new(),
        })
    }

    pub fn dataset_id(&self) -> &str {
        &self.dataset_id
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    fn accepted_epsilons(&self) -> Vec<f64> {
        self.entries
            .iter()
            .filter(|entry| entry.is_accepted())
            .map(|entry| entry.epsilon)
            .collect()
    }

    fn composed(&self) -> Composed {
        self.config.composition.accumulate(&self.accepted_epsilons())
    }

    /// Records a spend of `epsilon`.
    ///
    /// With auto-pause on, a spend whose projected effective ε exceeds the
    /// budget is recorded as refused and returned as
    /// [`LedgerError::BudgetExhausted`]; spent is unchanged. With auto-pause
    /// off the spend is accepted and the overrun flagged on the receipt.
    pub fn consume(
        &mut self,
        epsilon: f64,
        label: &str,
        actor: &str,
    ) -> LedgerResult<ConsumeReceipt> {
        if !(epsilon.is_finite() && epsilon > 0.0) {
            return Err(LedgerError::InvalidEpsilon { epsilon });
        }
        let total = self.config.total_budget;
        let current = self.composed();
        let mut projected_entries = self.accepted_epsilons();
        projected_entries.push(epsilon);
        let projected = self.config.composition.accumulate(&projected_entries);
        let exceeds = projected.epsilon - total > SPEND_TOLERANCE;
        debug!(
            dataset = %self.dataset_id,
            epsilon,
            projected = projected.epsilon,
            method = projected.method.as_str(),
            "projected budget spend"
        );

        let mut entry = BudgetEntry {
            epsilon,
            label: label.to_owned(),
            actor: actor.to_owned(),
            timestamp: Utc::now(),
            outcome: EntryOutcome::Accepted,
        };
        if exceeds && self.config.auto_pause {
            entry.outcome = EntryOutcome::Refused;
            self.entries.push(entry);
            warn!(
                dataset = %self.dataset_id,
                epsilon,
                label,
                actor,
                spent = current.epsilon,
                total,
                "budget spend refused"
            );
            return Err(LedgerError::BudgetExhausted {
                dataset_id: self.dataset_id.clone(),
                requested: epsilon,
                spent: current.epsilon,
                total,
            });
        }

        self.entries.push(entry.clone());
        let state = self.state();
        if exceeds {
            warn!(
                dataset = %self.dataset_id,
                epsilon,
                label,
                actor,
                spent = state.spent,
                total,
                "budget overrun recorded"
            );
        } else {
            info!(
                dataset = %self.dataset_id,
                epsilon,
                label,
                actor,
                spent = state.spent,
                remaining = state.remaining,
                method = state.method.as_str(),
                "budget spend accepted"
            );
        }
        let remaining_fraction = state.remaining / total;
        let warning = (remaining_fraction < self.config.warning_fraction).then(|| BudgetWarning {
            remaining_fraction,
            threshold: self.config.warning_fraction,
            message: format!(
                "dataset {} has {:.1}% of its privacy budget left",
                self.dataset_id,
                remaining_fraction * 100.0
            ),
        });
        if let Some(warning) = &warning {
            warn!(dataset = %self.dataset_id, remaining_fraction, "{}", warning.message);
        }
        Ok(ConsumeReceipt {
            entry,
            state,
            warning,
            overrun: exceeds,
        })
    }

    pub fn status(&self) -> BudgetStatus {
        let composed = self.composed();
        let accepted = self.entries.iter().filter(|entry| entry.is_accepted()).count();
        BudgetStatus {
            dataset_id: self.dataset_id.clone(),
            total_budget: self.config.total_budget,
            spent: composed.epsilon,
            remaining: (self.config.total_budget - composed.epsilon).max(0.0),
            accepted,
            refused: self.entries.len() - accepted,
            method: composed.method,
        }
    }

    pub fn state(&self) -> BudgetState {
        let epsilons = self.accepted_epsilons();
        let composed = self.config.composition.accumulate(&epsilons);
        BudgetState {
            schema_version: LEDGER_SCHEMA_VERSION,
            dataset_id: self.dataset_id.clone(),
            total_budget: self.config.total_budget,
            spent: composed.epsilon,
            sequential_spent: epsilons.iter().sum(),
            remaining: (self.config.total_budget - composed.epsilon).max(0.0),
            method: composed.method,
            composition: self.config.composition.clone(),
            warning_fraction: self.config.warning_fraction,
            auto_pause: self.config.auto_pause,
            entries: self.entries.clone(),
            resets: self.resets.clone(),
        }
    }

    pub fn resets(&self) -> &[ResetRecord] {
        &self.resets
    }

    /// Clears all spend. The cleared entries move into the reset log along
    /// with who asked and why.
    pub fn reset(&mut self, actor: &str, reason: &str) -> ResetRecord {
        let spent_before = self.composed().epsilon;
        let record = ResetRecord {
            actor: actor.to_owned(),
            reason: reason.to_owned(),
            timestamp: Utc::now(),
            spent_before,
            archived: std::mem::take(&mut self.entries),
        };
        warn!(
            dataset = %self.dataset_id,
            actor,
            reason,
            spent_before,
            archived = record.archived.len(),
            "privacy budget reset"
        );
        self.resets.push(record.clone());
        record
    }
}
