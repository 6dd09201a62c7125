use std::collections::BTreeMap;

use statrs::distribution::{Continuous, Normal};
use synthguard_table::{Cell, ColumnKind, Table};

/// One encoded cell of a sensitive column.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Value {
    Number(f64),
    Category(String),
    Missing,
}

pub(crate) type EncodedRow = Vec<Value>;

#[derive(Clone, Debug)]
enum Scale {
    Numeric {
        mean: f64,
        std: f64,
        density: Option<Normal>,
    },
    Categorical {
        counts: BTreeMap<String, usize>,
        observed: usize,
    },
}

/// Per-column scaling and marginal densities fitted on the original table.
#[derive(Clone, Debug)]
pub struct FeatureSpace {
    columns: Vec<usize>,
    scales: Vec<Scale>,
}

impl FeatureSpace {
    /// `columns` are positions in `original`.
    pub fn fit(original: &Table, columns: &[usize]) -> Self {
        let scales = columns
            .iter()
            .map(|&idx| {
                let column = &original.columns()[idx];
                match column.kind() {
                    ColumnKind::Numeric => {
                        let observed = column.observed_numeric();
                        let (mean, std) = moments(&observed);
                        Scale::Numeric {
                            mean,
                            std,
                            density: Normal::new(mean, std).ok(),
                        }
                    }
                    ColumnKind::Categorical => {
                        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
                        for value in column.categorical_values().unwrap_or_default().iter().flatten() {
                            *counts.entry(value.clone()).or_insert(0) += 1;
                        }
                        let observed: usize = counts.values().sum();
                        Scale::Categorical { counts, observed }
                    }
                }
            })
            .collect();
        Self {
            columns: columns.to_vec(),
            scales,
        }
    }

    pub(crate) fn encode(&self, table: &Table) -> Vec<EncodedRow> {
        (0..table.row_count())
            .map(|row| {
                self.columns
                    .iter()
                    .map(|&column| match table.cell(column, row) {
                        Cell::Numeric(value) if value.is_finite() => Value::Number(value),
                        Cell::Categorical(value) => Value::Category(value.to_owned()),
                        _ => Value::Missing,
                    })
                    .collect()
            })
            .collect()
    }

    /// Euclidean distance over standardised numeric cells plus 1 per
    /// categorical mismatch. A missing cell against a present one counts 1.
    pub(crate) fn distance(&self, left: &[Value], right: &[Value]) -> f64 {
        left.iter()
            .zip(right)
            .zip(&self.scales)
            .map(|((a, b), scale)| match (a, b, scale) {
                (Value::Number(a), Value::Number(b), Scale::Numeric { std, .. }) => {
                    ((a - b) / std).powi(2)
                }
                (Value::Missing, Value::Missing, _) => 0.0,
                (a, b, _) if a == b => 0.0,
                _ => 1.0,
            })
            .sum::<f64>()
            .sqrt()
    }

    /// Distance to the closest row of `reference`. The first exact match is
    /// treated as the row itself and skipped whichever set `reference` is, so
    /// the result depends only on row content.
    pub(crate) fn nearest_distance(&self, row: &[Value], reference: &[EncodedRow]) -> f64 {
        let mut skipped_self = false;
        let mut nearest = f64::INFINITY;
        for candidate in reference {
            let distance = self.distance(row, candidate);
            if distance == 0.0 && !skipped_self {
                skipped_self = true;
                continue;
            }
            nearest = nearest.min(distance);
        }
        if nearest.is_finite() {
            nearest
        } else {
            0.0
        }
    }

    /// Log-likelihood of `row` under independent original marginals:
    /// Gaussian for numeric cells, Laplace-smoothed frequencies for
    /// categorical cells. Missing cells contribute nothing.
    pub(crate) fn density_score(&self, row: &[Value]) -> f64 {
        row.iter()
            .zip(&self.scales)
            .map(|(value, scale)| match (value, scale) {
                (Value::Number(x), Scale::Numeric { density: Some(normal), .. }) => {
                    normal.ln_pdf(*x)
                }
                (Value::Category(category), Scale::Categorical { counts, observed }) => {
                    let count = counts.get(category).copied().unwrap_or(0);
                    ((count + 1) as f64 / (observed + counts.len() + 1) as f64).ln()
                }
                _ => 0.0,
            })
            .sum()
    }

    pub fn numeric_scale(&self, position: usize) -> Option<(f64, f64)> {
        match self.scales.get(position)? {
            Scale::Numeric { mean, std, .. } => Some((*mean, *std)),
            Scale::Categorical { .. } => None,
        }
    }
}

/// Mean and sample standard deviation; a degenerate spread becomes 1.
fn moments(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 1.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = if values.len() > 1 {
        values.iter().map(|value| (value - mean).powi(2)).sum::<f64>() / (n - 1.0)
    } else {
        0.0
    };
    let std = variance.sqrt();
    (mean, if std > 1e-12 && std.is_finite() { std } else { 1.0 })
}
