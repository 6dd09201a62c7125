use std::{collections::BTreeSet, sync::Arc};

use chrono::{DateTime, Utc};
use synthguard_anonymity::AnonymityEnforcer;
use synthguard_inference::{InferenceAuditor, InferenceResult};
use synthguard_ledger::LedgerStore;
use synthguard_table::{Column, ColumnData, QuasiIdentifierSet, Table, TableResult};
use tracing::{info, warn};

use crate::{
    certificate::{
        ComplianceMap, PrivacyAccounting, PrivacyCertificate, CERTIFICATE_SCHEMA_VERSION,
    },
    config::{CertificationConfig, CoreConfig},
    errors::CertifyResult,
    risk::RiskSummary,
};

/// Ledger label for spends made while certifying.
pub const CERTIFICATION_LABEL: &str = "certification";

/// A certificate together with the table it certifies.
#[derive(Clone, Debug)]
pub struct Certification {
    pub certificate: PrivacyCertificate,
    pub table: Table,
    pub summary: String,
}

pub struct CertificateAssembler {
    enforcer: AnonymityEnforcer,
    auditor: InferenceAuditor,
    ledgers: Arc<LedgerStore>,
}

impl CertificateAssembler {
    pub fn new(enforcer: AnonymityEnforcer, auditor: InferenceAuditor, ledgers: Arc<LedgerStore>) -> Self {
        Self {
            enforcer,
            auditor,
            ledgers,
        }
    }

    pub fn from_config(config: &CoreConfig) -> CertifyResult<Self> {
        config.validate()?;
        Ok(Self::new(
            AnonymityEnforcer::new(config.enforcer.clone()),
            InferenceAuditor::new(config.audit.clone())?,
            Arc::new(LedgerStore::new(config.ledger.clone())?),
        ))
    }

    pub fn ledgers(&self) -> &Arc<LedgerStore> {
        &self.ledgers
    }

    pub fn generate_certificate(
        &self,
        original: &Table,
        synthetic: &Table,
        config: &CertificationConfig,
    ) -> CertifyResult<PrivacyCertificate> {
        Ok(self.certify(original, synthetic, config)?.certificate)
    }

    /// Enforces k on `synthetic`, charges ε, audits the release against
    /// `original` and assembles the certificate. Unreachable k is reported
    /// in the certificate; every other failure aborts.
    pub fn certify(
        &self,
        original: &Table,
        synthetic: &Table,
        config: &CertificationConfig,
    ) -> CertifyResult<Certification> {
        config.validate()?;
        self.auditor
            .validate_inputs(original, synthetic, &config.sensitive_columns)?;
        let qis = QuasiIdentifierSet::new(config.quasi_identifiers.iter().cloned());

        let (released, enforcement) = if config.enforcement_applied_upstream {
            let report = self.enforcer.evaluate(synthetic, &qis, config.target_k)?;
            (synthetic.clone(), report)
        } else {
            self.enforcer.enforce(synthetic, &qis, config.target_k)?
        };

        let accounting = match config.dataset_id.as_deref() {
            Some(dataset_id) => {
                let receipt = self.ledgers.consume(
                    dataset_id,
                    config.epsilon,
                    CERTIFICATION_LABEL,
                    &config.actor,
                )?;
                PrivacyAccounting::from_ledger(config.epsilon, config.delta, receipt.state)
            }
            None => PrivacyAccounting::standalone(config.epsilon, config.delta),
        };

        let inference = if released.is_empty() {
            warn!(
                target_k = enforcement.target_k,
                "no rows released, membership audit skipped"
            );
            InferenceResult::skipped(
                "no rows released",
                self.auditor.config().pass_threshold,
                config.seed,
            )
        } else {
            let aligned = align_to_release(original, &released, &self.enforcer.config().other_label)?;
            self.auditor
                .run_attack(&aligned, &released, &config.sensitive_columns, config.seed)?
        };

        let risk = RiskSummary::assess(&released, &qis, enforcement.final_k, config.population_size)?;
        let compliance = ComplianceMap::evaluate(config.epsilon, enforcement.final_k);
        let issued_at = Utc::now();
        let certificate = PrivacyCertificate {
            schema_version: CERTIFICATE_SCHEMA_VERSION,
            certificate_id: certificate_id(config.dataset_id.as_deref(), issued_at),
            issued_at,
            enforcement,
            accounting,
            inference,
            risk,
            compliance,
        };
        info!(
            certificate = %certificate.certificate_id,
            dataset = config.dataset_id.as_deref().unwrap_or("standalone"),
            final_k = certificate.enforcement.final_k,
            epsilon = config.epsilon,
            attack_rate = certificate.inference.attack_success_rate,
            anonymous = certificate.compliance.anonymous,
            de_identified = certificate.compliance.de_identified,
            "privacy certificate issued"
        );
        let summary = certificate.summary();
        Ok(Certification {
            certificate,
            table: released,
            summary,
        })
    }
}

/// `cert-` followed by a blake3 digest over the dataset id, the issue time
/// and a random nonce.
fn certificate_id(dataset_id: Option<&str>, issued_at: DateTime<Utc>) -> String {
    let nonce: [u8; 16] = rand::random();
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"synthguard/certificate");
    hasher.update(dataset_id.unwrap_or_default().as_bytes());
    hasher.update(issued_at.to_rfc3339().as_bytes());
    hasher.update(&nonce);
    format!("cert-{}", hex::encode(hasher.finalize().as_bytes()))
}

/// Rewrites `original` in the release's representation so the audit
/// compares like with like: numeric cells snap to the midpoint of the
/// released column's band, and categories the release folded away become
/// the shared `other_label`.
fn align_to_release(original: &Table, released: &Table, other_label: &str) -> TableResult<Table> {
    let mut columns = Vec::with_capacity(original.column_count());
    for column in original.columns() {
        let target = released.require_column(column.name())?;
        let aligned = match (column.data(), target.data()) {
            (ColumnData::Numeric(values), ColumnData::Numeric(_)) => match target.banding() {
                Some(banding) => Column::numeric(
                    column.name(),
                    values
                        .iter()
                        .map(|value| {
                            value.map(|v| {
                                if v.is_finite() {
                                    banding.midpoint(banding.index_of(v))
                                } else {
                                    v
                                }
                            })
                        })
                        .collect(),
                )
                .with_banding(banding.clone()),
                None => column.clone(),
            },
            (ColumnData::Categorical(values), ColumnData::Categorical(released_values)) => {
                let kept: BTreeSet<&str> = released_values.iter().flatten().map(String::as_str).collect();
                if kept.contains(other_label) {
                    Column::categorical(
                        column.name(),
                        values
                            .iter()
                            .map(|value| {
                                value.as_ref().map(|v| {
                                    if kept.contains(v.as_str()) {
                                        v.clone()
                                    } else {
                                        other_label.to_owned()
                                    }
                                })
                            })
                            .collect(),
                    )
                } else {
                    column.clone()
                }
            }
            _ => column.clone(),
        };
        columns.push(aligned);
    }
    Table::new(columns)
}
