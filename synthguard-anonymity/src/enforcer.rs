use synthguard_table::{QuasiIdentifierSet, Table};
use tracing::{debug, info, warn};

use crate::{
    config::EnforcerConfig,
    errors::AnonymityResult,
    passes::{default_passes, EnforcementPass, PassContext},
    report::EnforcementReport,
};

pub struct AnonymityEnforcer {
    config: EnforcerConfig,
    passes: Vec<Box<dyn EnforcementPass>>,
}

impl AnonymityEnforcer {
    pub fn new(config: EnforcerConfig) -> Self {
        Self {
            config,
            passes: default_passes(),
        }
    }

    /// Enforcer running a caller-chosen pass sequence.
    pub fn with_passes(config: EnforcerConfig, passes: Vec<Box<dyn EnforcementPass>>) -> Self {
        Self { config, passes }
    }

    pub fn config(&self) -> &EnforcerConfig {
        &self.config
    }

    /// Transforms `table` until every quasi-identifier class holds at least
    /// `target_k` rows. A `target_k` of 0 is treated as 1. Returns the input
    /// unchanged when it already complies.
    pub fn enforce(
        &self,
        table: &Table,
        quasi_identifiers: &QuasiIdentifierSet,
        target_k: usize,
    ) -> AnonymityResult<(Table, EnforcementReport)> {
        let target_k = target_k.max(1);
        let ctx = PassContext {
            quasi_identifiers,
            target_k,
            config: &self.config,
        };
        let initial_k = ctx.min_class_size(table)?;
        let mut report = EnforcementReport::new(
            target_k,
            quasi_identifiers.names().to_vec(),
            table.row_count(),
            initial_k,
        );
        if report.compliant {
            debug!(initial_k, target_k, "table already k-anonymous");
            return Ok((table.clone(), report));
        }

        let mut current = table.clone();
        for pass in &self.passes {
            if report.compliant {
                break;
            }
            let (next, updated) = pass.apply(&ctx, current, report)?;
            current = next;
            report = updated;
            let k = ctx.min_class_size(&current)?;
            report.finish(k, current.row_count());
            if let Some(record) = report.passes.last().filter(|record| record.kind == pass.kind()) {
                info!(
                    pass = record.kind.as_str(),
                    columns = ?record.columns,
                    rows_affected = record.rows_affected,
                    k_after = record.k_after,
                    "enforcement pass applied"
                );
            }
        }

        if report.compliant {
            info!(
                initial_k = report.initial_k,
                final_k = report.final_k,
                target_k,
                rows_out = report.rows_out,
                rows_suppressed = report.rows_suppressed,
                "k-anonymity enforced"
            );
        } else {
            warn!(
                initial_k = report.initial_k,
                final_k = report.final_k,
                target_k,
                rows_out = report.rows_out,
                "k-anonymity target not reached"
            );
        }
        Ok((current, report))
    }

    /// Report for `table` as it stands, without applying any pass.
    pub fn evaluate(
        &self,
        table: &Table,
        quasi_identifiers: &QuasiIdentifierSet,
        target_k: usize,
    ) -> AnonymityResult<EnforcementReport> {
        let ctx = PassContext {
            quasi_identifiers,
            target_k: target_k.max(1),
            config: &self.config,
        };
        let k = ctx.min_class_size(table)?;
        Ok(EnforcementReport::new(
            ctx.target_k,
            quasi_identifiers.names().to_vec(),
            table.row_count(),
            k,
        ))
    }
}

impl Default for AnonymityEnforcer {
    fn default() -> Self {
        Self::new(EnforcerConfig::default())
    }
}
