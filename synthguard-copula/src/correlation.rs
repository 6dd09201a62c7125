use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use synthguard_table::{ColumnKind, Table};

use crate::{
    config::CopulaConfig,
    errors::{CopulaError, CopulaResult},
    linalg::Matrix,
    marginal::latent_scores,
};

/// Difference between two correlation structures over shared numeric columns.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CorrelationComparison {
    pub columns: Vec<String>,
    pub frobenius: f64,
    pub max_abs_difference: f64,
}

impl CorrelationComparison {
    pub fn between(columns: Vec<String>, left: &Matrix, right: &Matrix) -> CopulaResult<Self> {
        let (Some(frobenius), Some(max_abs_difference)) = (
            left.frobenius_distance(right),
            left.max_abs_difference(right),
        ) else {
            return Err(CopulaError::DegenerateCorrelation {
                reason: format!(
                    "cannot compare {}x{} with {}x{}",
                    left.dim(),
                    left.dim(),
                    right.dim(),
                    right.dim()
                ),
            });
        };
        Ok(Self {
            columns,
            frobenius,
            max_abs_difference,
        })
    }
}

/// Latent-normal columns of `names`, in order. Every column must be numeric
/// with at least two observed values.
pub(crate) fn latent_columns(
    table: &Table,
    names: &[String],
    config: &CopulaConfig,
) -> CopulaResult<Vec<Vec<f64>>> {
    names
        .par_iter()
        .map(|name| {
            let column = table.require_kind(name, ColumnKind::Numeric)?;
            let observed = column.observed_numeric().len();
            if observed < 2 {
                return Err(CopulaError::InsufficientData {
                    column: name.clone(),
                    observed,
                    required: 2,
                });
            }
            let values = column.numeric_values().unwrap_or_default();
            Ok(latent_scores(values, config.uniform_clamp))
        })
        .collect()
}

/// Pearson correlation of equally long columns. A zero-variance column is
/// uncorrelated with every other column.
pub(crate) fn pearson_matrix(columns: &[Vec<f64>]) -> Matrix {
    let dim = columns.len();
    let rows = columns.first().map_or(0, Vec::len);
    let centred: Vec<(Vec<f64>, f64)> = columns
        .iter()
        .map(|column| {
            let mean = column.iter().sum::<f64>() / rows.max(1) as f64;
            let deviations: Vec<f64> = column.iter().map(|value| value - mean).collect();
            let norm = deviations.iter().map(|d| d * d).sum::<f64>().sqrt();
            (deviations, norm)
        })
        .collect();
    let mut matrix = Matrix::identity(dim);
    for i in 0..dim {
        for j in 0..i {
            let (left, left_norm) = &centred[i];
            let (right, right_norm) = &centred[j];
            let denominator = left_norm * right_norm;
            let value = if denominator > f64::EPSILON {
                let covariance = left.iter().zip(right).map(|(a, b)| a * b).sum::<f64>();
                (covariance / denominator).clamp(-1.0, 1.0)
            } else {
                0.0
            };
            matrix.set(i, j, value);
            matrix.set(j, i, value);
        }
    }
    matrix
}

/// Correlation matrix of the latent-normal transform of `names` in `table`.
pub fn latent_correlation(
    table: &Table,
    names: &[String],
    config: &CopulaConfig,
) -> CopulaResult<Matrix> {
    let columns = latent_columns(table, names, config)?;
    Ok(pearson_matrix(&columns))
}

/// Compares the latent correlation structure of two tables over the numeric
/// columns they share (by name, in `left`'s column order).
pub fn compare_correlations(
    left: &Table,
    right: &Table,
    config: &CopulaConfig,
) -> CopulaResult<CorrelationComparison> {
    let shared: Vec<String> = left
        .names_of_kind(ColumnKind::Numeric)
        .into_iter()
        .filter(|name| {
            right
                .column(name)
                .is_some_and(|column| column.kind() == ColumnKind::Numeric)
        })
        .map(str::to_owned)
        .collect();
    let left_matrix = latent_correlation(left, &shared, config)?;
    let right_matrix = latent_correlation(right, &shared, config)?;
    CorrelationComparison::between(shared, &left_matrix, &right_matrix)
}
