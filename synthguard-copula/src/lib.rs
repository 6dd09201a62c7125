//! Gaussian-copula correlation model.
//!
//! Fitting maps every numeric column onto a latent standard-normal scale via
//! its empirical CDF and estimates the correlation of the latent matrix, so
//! marginal shape and dependence are modelled separately. Sampling draws
//! correlated normals and pushes them back through each column's empirical
//! inverse CDF. Categorical columns bypass the copula and are drawn from
//! their observed frequencies.

pub mod config;
pub mod correlation;
pub mod errors;
pub mod linalg;
pub mod marginal;
pub mod model;

pub use config::CopulaConfig;
pub use correlation::{compare_correlations, latent_correlation, CorrelationComparison};
pub use errors::{CopulaError, CopulaResult};
pub use linalg::Matrix;
pub use marginal::{CategoricalMarginal, NumericMarginal};
pub use model::{CorrelationModel, GaussianCopula};
