use serde::{Deserialize, Serialize};

use crate::{
    composition::CompositionMethod,
    errors::{LedgerError, LedgerResult},
};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct LedgerConfig {
    /// Total ε budget `B`.
    pub total_budget: f64,
    /// Warn once `remaining / B` drops below this fraction.
    pub warning_fraction: f64,
    /// Refuse spends that would push the effective ε past `B`.
    pub auto_pause: bool,
    pub composition: CompositionMethod,
}

impl LedgerConfig {
    pub fn with_budget(total_budget: f64) -> Self {
        Self {
            total_budget,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> LedgerResult<()> {
        if !(self.total_budget.is_finite() && self.total_budget > 0.0) {
            return Err(LedgerError::InvalidConfig(format!(
                "total budget {} must be finite and positive",
                self.total_budget
            )));
        }
        if !(self.warning_fraction > 0.0 && self.warning_fraction < 1.0) {
            return Err(LedgerError::InvalidConfig(format!(
                "warning fraction {} must lie in (0, 1)",
                self.warning_fraction
            )));
        }
        self.composition.validate().map_err(LedgerError::InvalidConfig)
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            total_budget: 10.0,
            warning_fraction: 0.2,
            auto_pause: true,
            composition: CompositionMethod::Sequential,
        }
    }
}
