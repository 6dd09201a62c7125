use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use synthguard_anonymity::EnforcementReport;
use synthguard_inference::InferenceResult;
use synthguard_ledger::BudgetState;

use crate::risk::RiskSummary;

pub const CERTIFICATE_SCHEMA_VERSION: u32 = 1;

/// Largest release ε still labelled anonymous.
pub const ANONYMOUS_MAX_EPSILON: f64 = 1.0;

/// Smallest achieved k still labelled de-identified.
pub const DE_IDENTIFIED_MIN_K: usize = 5;

fn default_schema_version() -> u32 {
    CERTIFICATE_SCHEMA_VERSION
}

/// ε/δ attributed to the release and, when a dataset ledger was charged,
/// its state right after the charge.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PrivacyAccounting {
    pub epsilon: f64,
    pub delta: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger: Option<BudgetState>,
}

impl PrivacyAccounting {
    pub fn standalone(epsilon: f64, delta: f64) -> Self {
        Self {
            epsilon,
            delta,
            dataset_id: None,
            ledger: None,
        }
    }

    pub fn from_ledger(epsilon: f64, delta: f64, state: BudgetState) -> Self {
        Self {
            epsilon,
            delta,
            dataset_id: Some(state.dataset_id.clone()),
            ledger: Some(state),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComplianceMap {
    pub anonymous: bool,
    pub de_identified: bool,
    pub safe_harbor: bool,
}

impl ComplianceMap {
    pub fn evaluate(epsilon: f64, achieved_k: usize) -> Self {
        let anonymous = epsilon <= ANONYMOUS_MAX_EPSILON;
        let de_identified = achieved_k >= DE_IDENTIFIED_MIN_K;
        Self {
            anonymous,
            de_identified,
            safe_harbor: anonymous && de_identified,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PrivacyCertificate {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub certificate_id: String,
    pub issued_at: DateTime<Utc>,
    pub enforcement: EnforcementReport,
    pub accounting: PrivacyAccounting,
    pub inference: InferenceResult,
    pub risk: RiskSummary,
    pub compliance: ComplianceMap,
}

impl PrivacyCertificate {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Parses a certificate, including ones written before later fields
    /// existed.
    pub fn from_json(document: &str) -> serde_json::Result<Self> {
        serde_json::from_str(document)
    }

    /// Human-readable compliance summary.
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!(
                "certificate {} issued {}",
                self.certificate_id,
                self.issued_at.to_rfc3339()
            ),
            format!(
                "k-anonymity: target {} achieved {} over {}, {} of {} rows released ({} suppressed)",
                self.enforcement.target_k,
                self.enforcement.final_k,
                self.enforcement.quasi_identifiers.join(", "),
                self.enforcement.rows_out,
                self.enforcement.rows_in,
                self.enforcement.rows_suppressed,
            ),
        ];
        match &self.accounting.ledger {
            Some(state) => lines.push(format!(
                "privacy budget: epsilon {} charged to {}, {:.4} of {} spent ({})",
                self.accounting.epsilon,
                state.dataset_id,
                state.spent,
                state.total_budget,
                state.method.as_str(),
            )),
            None => lines.push(format!(
                "privacy budget: standalone epsilon {} delta {:e}",
                self.accounting.epsilon, self.accounting.delta
            )),
        }
        match &self.inference.skipped {
            Some(reason) => lines.push(format!("membership inference: skipped ({reason})")),
            None => lines.push(format!(
                "membership inference: attack success {:.3} vs baseline {:.2}, {}",
                self.inference.attack_success_rate,
                self.inference.baseline,
                if self.inference.passed { "passed" } else { "FAILED" },
            )),
        }
        lines.push(format!(
            "re-identification risk: prosecutor {:.4}, journalist {:.4}, sample uniqueness {:.4}",
            self.risk.prosecutor_risk, self.risk.journalist_risk, self.risk.sample_uniqueness
        ));
        lines.push(format!(
            "compliance: anonymous={} de_identified={} safe_harbor={}",
            self.compliance.anonymous, self.compliance.de_identified, self.compliance.safe_harbor
        ));
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compliance_thresholds_are_inclusive() {
        assert_eq!(
            ComplianceMap::evaluate(1.0, 5),
            ComplianceMap {
                anonymous: true,
                de_identified: true,
                safe_harbor: true,
            }
        );
        let loose = ComplianceMap::evaluate(1.5, 5);
        assert!(!loose.anonymous && loose.de_identified && !loose.safe_harbor);
        let small = ComplianceMap::evaluate(0.5, 4);
        assert!(small.anonymous && !small.de_identified && !small.safe_harbor);
    }
}
