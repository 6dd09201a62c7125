use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct EnforcerConfig {
    /// Equal-width bands per numeric quasi-identifier.
    pub band_count: usize,
    /// Fixed band width per column, overriding `band_count` (e.g. `age = 5.0`).
    pub band_widths: BTreeMap<String, f64>,
    /// Label shared by categories rarer than the target `k`.
    pub other_label: String,
}

impl EnforcerConfig {
    pub fn with_band_width(mut self, column: impl Into<String>, width: f64) -> Self {
        self.band_widths.insert(column.into(), width);
        self
    }
}

impl Default for EnforcerConfig {
    fn default() -> Self {
        Self {
            band_count: 10,
            band_widths: BTreeMap::new(),
            other_label: "Other".into(),
        }
    }
}
