use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PassKind {
    NumericGeneralization,
    CategoricalGeneralization,
    MicroAggregation,
    Suppression,
}

impl PassKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PassKind::NumericGeneralization => "numeric_generalization",
            PassKind::CategoricalGeneralization => "categorical_generalization",
            PassKind::MicroAggregation => "micro_aggregation",
            PassKind::Suppression => "suppression",
        }
    }
}

/// One applied pass.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PassRecord {
    pub kind: PassKind,
    pub columns: Vec<String>,
    /// Rows whose quasi-identifier cells changed, or rows removed for suppression.
    pub rows_affected: usize,
    /// Minimum class size once the pass finished.
    pub k_after: usize,
    pub detail: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EnforcementReport {
    pub target_k: usize,
    pub quasi_identifiers: Vec<String>,
    pub initial_k: usize,
    pub final_k: usize,
    pub passes: Vec<PassRecord>,
    pub rows_in: usize,
    pub rows_out: usize,
    pub rows_suppressed: usize,
    pub compliant: bool,
}

impl EnforcementReport {
    pub fn new(target_k: usize, quasi_identifiers: Vec<String>, rows: usize, initial_k: usize) -> Self {
        let mut report = Self {
            target_k,
            quasi_identifiers,
            initial_k,
            final_k: initial_k,
            passes: Vec::new(),
            rows_in: rows,
            rows_out: rows,
            rows_suppressed: 0,
            compliant: false,
        };
        report.finish(initial_k, rows);
        report
    }

    pub fn record(&mut self, pass: PassRecord) {
        if pass.kind == PassKind::Suppression {
            self.rows_suppressed += pass.rows_affected;
        }
        self.passes.push(pass);
    }

    /// Sets the outcome: compliant when at least one row remains and every
    /// class holds `target_k` rows.
    pub fn finish(&mut self, final_k: usize, rows_out: usize) {
        self.final_k = final_k;
        self.rows_out = rows_out;
        self.compliant = rows_out > 0 && final_k >= self.target_k;
    }

    pub fn applied(&self, kind: PassKind) -> bool {
        self.passes.iter().any(|pass| pass.kind == kind)
    }

    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|pass| pass.kind.as_str()).collect()
    }
}
