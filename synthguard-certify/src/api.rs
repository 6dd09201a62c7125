use std::sync::Arc;

use serde::{Deserialize, Serialize};
use synthguard_anonymity::{AnonymityEnforcer, EnforcementReport};
use synthguard_copula::{CorrelationModel, GaussianCopula};
use synthguard_inference::{InferenceAuditor, InferenceResult};
use synthguard_ledger::{BudgetState, BudgetWarning, LedgerError, LedgerStore};
use synthguard_table::{QuasiIdentifierSet, Table};
use tracing::debug;

use crate::{
    assembler::{CertificateAssembler, Certification},
    certificate::PrivacyCertificate,
    config::{CertificationConfig, CoreConfig},
    errors::CertifyResult,
};

/// Shared handle to a fitted correlation model.
#[derive(Clone)]
pub struct ModelHandle(Arc<dyn CorrelationModel>);

impl ModelHandle {
    pub fn new(model: impl CorrelationModel + 'static) -> Self {
        Self(Arc::new(model))
    }

    pub fn model(&self) -> &dyn CorrelationModel {
        self.0.as_ref()
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("numeric_columns", &self.0.numeric_columns())
            .finish()
    }
}

/// Result of a budget spend. Refusals are reported here rather than raised.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ConsumeOutcome {
    pub success: bool,
    pub message: String,
    pub state: BudgetState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<BudgetWarning>,
}

/// Facade over the whole pipeline, sharing one ledger store.
pub struct PrivacyCore {
    config: CoreConfig,
    enforcer: AnonymityEnforcer,
    auditor: InferenceAuditor,
    ledgers: Arc<LedgerStore>,
    assembler: CertificateAssembler,
}

impl PrivacyCore {
    pub fn new(config: CoreConfig) -> CertifyResult<Self> {
        let assembler = CertificateAssembler::from_config(&config)?;
        Ok(Self {
            enforcer: AnonymityEnforcer::new(config.enforcer.clone()),
            auditor: InferenceAuditor::new(config.audit.clone())?,
            ledgers: Arc::clone(assembler.ledgers()),
            assembler,
            config,
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn ledgers(&self) -> &LedgerStore {
        &self.ledgers
    }

    pub fn fit_correlation_model(&self, table: &Table) -> CertifyResult<ModelHandle> {
        Ok(ModelHandle::new(GaussianCopula::fit(table, &self.config.copula)?))
    }

    pub fn sample_from_model(&self, handle: &ModelHandle, n: usize, seed: u64) -> CertifyResult<Table> {
        Ok(handle.model().sample(n, seed)?)
    }

    pub fn enforce_anonymity(
        &self,
        table: &Table,
        quasi_identifiers: &[String],
        k: usize,
    ) -> CertifyResult<(Table, EnforcementReport)> {
        let qis = QuasiIdentifierSet::new(quasi_identifiers.iter().cloned());
        Ok(self.enforcer.enforce(table, &qis, k)?)
    }

    /// Spends `epsilon` on `dataset_id`, creating its ledger on first use.
    /// An exhausted budget yields `success: false` with the refusal recorded;
    /// malformed requests are errors.
    pub fn consume_budget(
        &self,
        dataset_id: &str,
        epsilon: f64,
        label: &str,
        actor: &str,
    ) -> CertifyResult<ConsumeOutcome> {
        match self.ledgers.consume(dataset_id, epsilon, label, actor) {
            Ok(receipt) => {
                let message = match &receipt.warning {
                    Some(warning) => warning.message.clone(),
                    None => format!(
                        "spent {epsilon} on {dataset_id}, {:.4} remaining",
                        receipt.state.remaining
                    ),
                };
                Ok(ConsumeOutcome {
                    success: true,
                    message,
                    state: receipt.state,
                    warning: receipt.warning,
                })
            }
            Err(err @ LedgerError::BudgetExhausted { .. }) => {
                debug!(dataset = dataset_id, "budget spend refused");
                Ok(ConsumeOutcome {
                    success: false,
                    message: err.to_string(),
                    state: self.ledgers.snapshot(dataset_id)?,
                    warning: None,
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn get_budget_status(&self, dataset_id: &str) -> CertifyResult<BudgetState> {
        Ok(self.ledgers.snapshot(dataset_id)?)
    }

    pub fn run_membership_attack(
        &self,
        original: &Table,
        synthetic: &Table,
        sensitive_columns: &[String],
        seed: u64,
    ) -> CertifyResult<InferenceResult> {
        Ok(self
            .auditor
            .run_attack(original, synthetic, sensitive_columns, seed)?)
    }

    pub fn generate_certificate(
        &self,
        original: &Table,
        synthetic: &Table,
        config: &CertificationConfig,
    ) -> CertifyResult<PrivacyCertificate> {
        self.assembler.generate_certificate(original, synthetic, config)
    }

    /// Like [`PrivacyCore::generate_certificate`], also returning the
    /// released table and the compliance summary.
    pub fn certify(
        &self,
        original: &Table,
        synthetic: &Table,
        config: &CertificationConfig,
    ) -> CertifyResult<Certification> {
        self.assembler.certify(original, synthetic, config)
    }
}
