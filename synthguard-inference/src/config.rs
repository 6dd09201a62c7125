use serde::{Deserialize, Serialize};

use crate::errors::{AuditResult, InferenceError};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct AuditConfig {
    /// The attack passes while its success rate stays below this.
    pub pass_threshold: f64,
    pub train_fraction: f64,
    /// Cap on rows drawn from each table.
    pub max_records_per_class: usize,
    pub learning_rate: f64,
    pub epochs: usize,
}

impl AuditConfig {
    pub fn validate(&self) -> AuditResult<()> {
        if !(self.pass_threshold > 0.0 && self.pass_threshold <= 1.0) {
            return Err(InferenceError::InvalidConfig(format!(
                "pass threshold {} must lie in (0, 1]",
                self.pass_threshold
            )));
        }
        if !(self.train_fraction > 0.0 && self.train_fraction < 1.0) {
            return Err(InferenceError::InvalidConfig(format!(
                "train fraction {} must lie in (0, 1)",
                self.train_fraction
            )));
        }
        if self.max_records_per_class == 0 {
            return Err(InferenceError::InvalidConfig(
                "max records per class must be positive".into(),
            ));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) || self.epochs == 0 {
            return Err(InferenceError::InvalidConfig(
                "learning rate and epochs must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            pass_threshold: 0.55,
            train_fraction: 0.7,
            max_records_per_class: 2_000,
            learning_rate: 0.5,
            epochs: 300,
        }
    }
}
