//! Privacy certification for synthetic tables.
//!
//! [`CertificateAssembler`] runs a (source, synthetic) pair through
//! k-anonymity enforcement, charges the release's ε to the dataset's budget
//! ledger, audits the released table with a membership-inference attack and
//! seals the outcome, a re-identification risk summary and a compliance map
//! into one [`PrivacyCertificate`]. [`PrivacyCore`] exposes the individual
//! steps over a shared ledger store, and [`load_config`] reads the settings
//! of every subsystem from TOML or YAML.

pub mod api;
pub mod assembler;
pub mod certificate;
pub mod config;
pub mod errors;
pub mod risk;

pub use api::{ConsumeOutcome, ModelHandle, PrivacyCore};
pub use assembler::{CertificateAssembler, Certification, CERTIFICATION_LABEL};
pub use certificate::{
    ComplianceMap, PrivacyAccounting, PrivacyCertificate, ANONYMOUS_MAX_EPSILON,
    CERTIFICATE_SCHEMA_VERSION, DE_IDENTIFIED_MIN_K,
};
pub use config::{load_config, parse_config, CertificationConfig, ConfigError, ConfigFormat, CoreConfig};
pub use errors::{CertifyError, CertifyResult};
pub use risk::RiskSummary;
