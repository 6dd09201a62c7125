use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use synthguard_table::{Column, ColumnData, ColumnKind, Table};
use tracing::{debug, info};

use crate::{
    config::CopulaConfig,
    correlation::{latent_columns, pearson_matrix, CorrelationComparison},
    errors::{CopulaError, CopulaResult},
    linalg::Matrix,
    marginal::{normal_cdf, CategoricalMarginal, NumericMarginal},
};

/// A fitted joint-distribution model that can emit synthetic rows.
pub trait CorrelationModel: Send + Sync {
    /// Draws `n` rows. Deterministic for a given `seed`; never mutates the model.
    fn sample(&self, n: usize, seed: u64) -> CopulaResult<Table>;

    /// Latent correlation matrix estimated at fit time, ordered as
    /// [`CorrelationModel::numeric_columns`].
    fn correlation(&self) -> &Matrix;

    fn numeric_columns(&self) -> Vec<&str>;
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
enum ColumnSlot {
    Numeric(usize),
    Categorical(usize),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GaussianCopula {
    config: CopulaConfig,
    layout: Vec<ColumnSlot>,
    numeric: Vec<NumericMarginal>,
    categorical: Vec<CategoricalMarginal>,
    correlation: Matrix,
    sampling_factor: Matrix,
    eigen_floored: bool,
    source_rows: usize,
}

impl GaussianCopula {
    pub fn fit(table: &Table, config: &CopulaConfig) -> CopulaResult<Self> {
        if table.is_empty() {
            return Err(CopulaError::InsufficientData {
                column: table
                    .column_names()
                    .first()
                    .map(|name| name.to_string())
                    .unwrap_or_default(),
                observed: 0,
                required: 2,
            });
        }
        let mut layout = Vec::with_capacity(table.column_count());
        let mut numeric = Vec::new();
        let mut categorical = Vec::new();
        for column in table.columns() {
            match column.kind() {
                ColumnKind::Numeric => {
                    layout.push(ColumnSlot::Numeric(numeric.len()));
                    numeric.push(NumericMarginal::fit(column)?);
                }
                ColumnKind::Categorical => {
                    layout.push(ColumnSlot::Categorical(categorical.len()));
                    categorical.push(CategoricalMarginal::fit(column)?);
                }
            }
        }

        let names: Vec<String> = numeric.iter().map(|m| m.name.clone()).collect();
        let latent = latent_columns(table, &names, config)?;
        let correlation = pearson_matrix(&latent);
        if !correlation.is_finite() {
            return Err(CopulaError::DegenerateCorrelation {
                reason: "non-finite latent correlation".into(),
            });
        }
        let (sampling_matrix, eigen_floored) =
            correlation.floor_eigenvalues(config.eigen_floor, config.max_jacobi_sweeps);
        if !sampling_matrix.is_finite() {
            return Err(CopulaError::DegenerateCorrelation {
                reason: "non-finite entries after eigenvalue flooring".into(),
            });
        }
        let sampling_factor =
            sampling_matrix
                .cholesky()
                .ok_or_else(|| CopulaError::DegenerateCorrelation {
                    reason: format!(
                        "not positive definite after flooring eigenvalues at {}",
                        config.eigen_floor
                    ),
                })?;
        if eigen_floored {
            debug!(
                columns = names.len(),
                floor = config.eigen_floor,
                "copula correlation eigenvalues floored"
            );
        }
        info!(
            rows = table.row_count(),
            numeric = numeric.len(),
            categorical = categorical.len(),
            eigen_floored,
            "fitted gaussian copula"
        );
        Ok(Self {
            config: config.clone(),
            layout,
            numeric,
            categorical,
            correlation,
            sampling_factor,
            eigen_floored,
            source_rows: table.row_count(),
        })
    }

    pub fn numeric_marginals(&self) -> &[NumericMarginal] {
        &self.numeric
    }

    pub fn categorical_marginals(&self) -> &[CategoricalMarginal] {
        &self.categorical
    }

    pub fn eigen_floored(&self) -> bool {
        self.eigen_floored
    }

    pub fn source_rows(&self) -> usize {
        self.source_rows
    }

    /// Compares the fitted correlation with the latent correlation of `table`.
    pub fn compare_with(&self, table: &Table) -> CopulaResult<CorrelationComparison> {
        let names: Vec<String> = self.numeric.iter().map(|m| m.name.clone()).collect();
        for name in &names {
            if table.column(name).is_none() {
                return Err(CopulaError::UnfittedColumn {
                    column: name.clone(),
                });
            }
        }
        let other = pearson_matrix(&latent_columns(table, &names, &self.config)?);
        CorrelationComparison::between(names, &self.correlation, &other)
    }

    /// One synthetic row. Draw order per row: the independent normals, one
    /// missing draw per numeric column, then per categorical column a
    /// missing draw followed by the category draw.
    fn draw_row(
        &self,
        rng: &mut ChaCha20Rng,
        numeric: &mut [Vec<Option<f64>>],
        categorical: &mut [Vec<Option<String>>],
    ) {
        let independent: Vec<f64> = (0..self.numeric.len())
            .map(|_| rng.sample::<f64, _>(StandardNormal))
            .collect();
        let correlated = self.sampling_factor.mul_vec(&independent);
        let clamp = self.config.uniform_clamp;
        for (idx, marginal) in self.numeric.iter().enumerate() {
            let u = normal_cdf(correlated[idx]).clamp(clamp, 1.0 - clamp);
            let missing = self.config.preserve_missing
                && marginal.missing_fraction > 0.0
                && rng.gen::<f64>() < marginal.missing_fraction;
            numeric[idx].push((!missing).then(|| marginal.quantile(u)));
        }
        for (idx, marginal) in self.categorical.iter().enumerate() {
            let missing = self.config.preserve_missing
                && marginal.missing_fraction > 0.0
                && rng.gen::<f64>() < marginal.missing_fraction;
            let value = marginal.sample(rng);
            categorical[idx].push((!missing).then_some(value));
        }
    }
}

impl CorrelationModel for GaussianCopula {
    fn sample(&self, n: usize, seed: u64) -> CopulaResult<Table> {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let mut numeric: Vec<Vec<Option<f64>>> = vec![Vec::with_capacity(n); self.numeric.len()];
        let mut categorical: Vec<Vec<Option<String>>> =
            vec![Vec::with_capacity(n); self.categorical.len()];
        for _ in 0..n {
            self.draw_row(&mut rng, &mut numeric, &mut categorical);
        }
        let columns = self
            .layout
            .iter()
            .map(|slot| match *slot {
                ColumnSlot::Numeric(idx) => Column::new(
                    self.numeric[idx].name.clone(),
                    ColumnData::Numeric(std::mem::take(&mut numeric[idx])),
                ),
                ColumnSlot::Categorical(idx) => Column::new(
                    self.categorical[idx].name.clone(),
                    ColumnData::Categorical(std::mem::take(&mut categorical[idx])),
                ),
            })
            .collect();
        debug!(rows = n, seed, "sampled synthetic rows from copula");
        Ok(Table::new(columns)?)
    }

    fn correlation(&self) -> &Matrix {
        &self.correlation
    }

    fn numeric_columns(&self) -> Vec<&str> {
        self.numeric.iter().map(|m| m.name.as_str()).collect()
    }
}
