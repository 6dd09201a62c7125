//! Membership-inference auditing.
//!
//! [`InferenceAuditor::run_attack`] builds a balanced set of source rows
//! (members) and synthetic rows (non-members), describes each row by its
//! nearest-neighbour distance to both tables and its density under the
//! source marginals, and trains a logistic-regression adversary. The
//! held-out accuracy is the attack success rate; anything close to the 0.5
//! baseline means the synthetic table does not reveal membership.

pub mod auditor;
pub mod classifier;
pub mod config;
pub mod errors;
pub mod features;

pub use auditor::{InferenceAuditor, InferenceResult, BASELINE_RATE, FEATURE_NAMES};
pub use classifier::LogisticRegression;
pub use config::AuditConfig;
pub use errors::{AuditResult, InferenceError};
pub use features::FeatureSpace;
