use serde::{Deserialize, Serialize};
use synthguard_table::{EquivalenceClasses, QuasiIdentifierSet, Table, TableResult};

/// Re-identification risk of a released table.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RiskSummary {
    /// Released rows whose quasi-identifier tuple is unique.
    pub sample_uniqueness: f64,
    /// Released rows over the assumed population size.
    pub sampling_fraction: f64,
    pub population_uniqueness: f64,
    /// Smallest class size scaled up to the population.
    pub extrapolated_k: f64,
    pub prosecutor_risk: f64,
    pub journalist_risk: f64,
    #[serde(default)]
    pub population_size: usize,
}

impl RiskSummary {
    /// `population_size` defaults to the released row count.
    pub fn assess(
        released: &Table,
        quasi_identifiers: &QuasiIdentifierSet,
        final_k: usize,
        population_size: Option<usize>,
    ) -> TableResult<Self> {
        let rows = released.row_count();
        let classes = EquivalenceClasses::compute(released, quasi_identifiers)?;
        let sample_uniqueness = if rows == 0 {
            0.0
        } else {
            classes.unique_rows() as f64 / rows as f64
        };
        let population = population_size.unwrap_or(rows).max(rows);
        let sampling_fraction = if population == 0 {
            0.0
        } else {
            rows as f64 / population as f64
        };
        let extrapolated_k = if final_k == 0 || sampling_fraction == 0.0 {
            0.0
        } else {
            final_k as f64 / sampling_fraction
        };
        Ok(Self {
            sample_uniqueness,
            sampling_fraction,
            population_uniqueness: sample_uniqueness * sampling_fraction,
            extrapolated_k,
            prosecutor_risk: inverse_or_one(final_k as f64),
            journalist_risk: inverse_or_one(extrapolated_k),
            population_size: population,
        })
    }
}

fn inverse_or_one(k: f64) -> f64 {
    if k > 0.0 {
        (1.0 / k).min(1.0)
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn released() -> Table {
        Table::builder()
            .categorical("state", ["CA", "CA", "NY", "NY", "TX"])
            .build()
            .expect("table")
    }

    #[test]
    fn risk_scales_with_population() {
        let qis = QuasiIdentifierSet::new(["state"]);
        let risk = RiskSummary::assess(&released(), &qis, 1, Some(50)).expect("known column");
        assert_relative_eq!(risk.sample_uniqueness, 0.2);
        assert_relative_eq!(risk.sampling_fraction, 0.1);
        assert_relative_eq!(risk.population_uniqueness, 0.02);
        assert_relative_eq!(risk.extrapolated_k, 10.0);
        assert_relative_eq!(risk.prosecutor_risk, 1.0);
        assert_relative_eq!(risk.journalist_risk, 0.1);
    }

    #[test]
    fn empty_release_has_maximal_risk() {
        let table = released().select_rows(&[]).expect("empty selection");
        let qis = QuasiIdentifierSet::new(["state"]);
        let risk = RiskSummary::assess(&table, &qis, 0, None).expect("known column");
        assert_eq!(risk.sample_uniqueness, 0.0);
        assert_eq!(risk.extrapolated_k, 0.0);
        assert_eq!(risk.prosecutor_risk, 1.0);
        assert_eq!(risk.journalist_risk, 1.0);
    }
}
