use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use statrs::function::erf::{erfc, erfc_inv};
use synthguard_table::Column;

use crate::errors::{CopulaError, CopulaResult};

const MIN_OBSERVATIONS: usize = 2;

/// Standard-normal CDF.
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}

/// Standard-normal quantile for `p` in (0, 1).
pub fn normal_quantile(p: f64) -> f64 {
    -std::f64::consts::SQRT_2 * erfc_inv(2.0 * p)
}

/// Empirical marginal of one numeric column.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NumericMarginal {
    pub name: String,
    pub sorted: Vec<f64>,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std: f64,
    pub missing_fraction: f64,
}

impl NumericMarginal {
    pub fn fit(column: &Column) -> CopulaResult<Self> {
        let mut sorted = column.observed_numeric();
        if sorted.len() < MIN_OBSERVATIONS {
            return Err(CopulaError::InsufficientData {
                column: column.name().to_owned(),
                observed: sorted.len(),
                required: MIN_OBSERVATIONS,
            });
        }
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len() as f64;
        let mean = sorted.iter().sum::<f64>() / n;
        let variance = sorted.iter().map(|value| (value - mean).powi(2)).sum::<f64>() / (n - 1.0);
        let missing_fraction = if column.is_empty() {
            0.0
        } else {
            (column.len() - sorted.len()) as f64 / column.len() as f64
        };
        Ok(Self {
            name: column.name().to_owned(),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            mean,
            std: variance.sqrt(),
            missing_fraction,
            sorted,
        })
    }

    /// Empirical inverse CDF: linear interpolation between sorted values,
    /// clamped to the observed range.
    pub fn quantile(&self, u: f64) -> f64 {
        let last = self.sorted.len() - 1;
        let position = u.clamp(0.0, 1.0) * last as f64;
        let lower = (position.floor() as usize).min(last);
        let upper = (lower + 1).min(last);
        let fraction = position - lower as f64;
        let value = self.sorted[lower] + fraction * (self.sorted[upper] - self.sorted[lower]);
        value.clamp(self.min, self.max)
    }
}

/// Uniform scores for `values` (missing cells stay `None`). Ties take the
/// average of their 1-based ranks; scores are `rank / (n + 1)` clamped to
/// `(clamp, 1 - clamp)`.
pub fn uniform_scores(values: &[Option<f64>], clamp: f64) -> Vec<Option<f64>> {
    let mut observed: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(row, value)| value.filter(|v| v.is_finite()).map(|v| (row, v)))
        .collect();
    observed.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    let n = observed.len();
    let mut scores = vec![None; values.len()];
    let mut start = 0;
    while start < n {
        let mut end = start;
        while end + 1 < n && observed[end + 1].1 == observed[start].1 {
            end += 1;
        }
        // ranks start..=end (0-based) share their mean, converted to 1-based
        let average_rank = (start + end) as f64 / 2.0 + 1.0;
        let score = (average_rank / (n as f64 + 1.0)).clamp(clamp, 1.0 - clamp);
        for &(row, _) in &observed[start..=end] {
            scores[row] = Some(score);
        }
        start = end + 1;
    }
    scores
}

/// Latent standard-normal values for one column; missing cells map to 0.
pub fn latent_scores(values: &[Option<f64>], clamp: f64) -> Vec<f64> {
    uniform_scores(values, clamp)
        .into_iter()
        .map(|score| score.map_or(0.0, normal_quantile))
        .collect()
}

/// Observed category frequencies of one categorical column.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CategoricalMarginal {
    pub name: String,
    pub categories: Vec<(String, usize)>,
    pub observed: usize,
    pub missing_fraction: f64,
}

impl CategoricalMarginal {
    pub fn fit(column: &Column) -> CopulaResult<Self> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        let values = column.categorical_values().unwrap_or_default();
        for value in values.iter().flatten() {
            *counts.entry(value.clone()).or_default() += 1;
        }
        let observed = counts.values().sum::<usize>();
        if observed == 0 {
            return Err(CopulaError::InsufficientData {
                column: column.name().to_owned(),
                observed,
                required: 1,
            });
        }
        Ok(Self {
            name: column.name().to_owned(),
            missing_fraction: (values.len() - observed) as f64 / values.len() as f64,
            categories: counts.into_iter().collect(),
            observed,
        })
    }

    pub fn frequency(&self, category: &str) -> f64 {
        self.categories
            .iter()
            .find(|(name, _)| name == category)
            .map_or(0.0, |(_, count)| *count as f64 / self.observed as f64)
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let target = rng.gen_range(0..self.observed);
        let mut cumulative = 0;
        for (name, count) in &self.categories {
            cumulative += count;
            if target < cumulative {
                return name.clone();
            }
        }
        self.categories
            .last()
            .map(|(name, _)| name.clone())
            .unwrap_or_default()
    }
}
