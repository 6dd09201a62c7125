//! k-anonymity enforcement for synthetic tables.
//!
//! The [`AnonymityEnforcer`] groups rows by their quasi-identifier tuple and
//! applies passes from least to most destructive until every remaining class
//! holds at least `k` rows: numeric banding, rare-category collapsing,
//! micro-aggregation and finally suppression. Each pass is a pure
//! `(table, report) -> (table, report)` step behind [`EnforcementPass`].
//! An unreachable `k` is reported, never raised.

pub mod config;
pub mod enforcer;
pub mod errors;
pub mod passes;
pub mod report;

pub use config::EnforcerConfig;
pub use enforcer::AnonymityEnforcer;
pub use errors::{AnonymityError, AnonymityResult};
pub use passes::{
    CategoricalGeneralization, EnforcementPass, MicroAggregation, NumericGeneralization,
    PassContext, Suppression,
};
pub use report::{EnforcementReport, PassKind, PassRecord};
