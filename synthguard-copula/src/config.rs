use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct CopulaConfig {
    /// Smallest eigenvalue allowed in the sampling matrix.
    pub eigen_floor: f64,
    /// Uniform scores are clamped to `(clamp, 1 - clamp)`.
    pub uniform_clamp: f64,
    pub max_jacobi_sweeps: usize,
    /// Re-emit missing numeric cells at the observed missing rate.
    pub preserve_missing: bool,
}

impl Default for CopulaConfig {
    fn default() -> Self {
        Self {
            eigen_floor: 1e-6,
            uniform_clamp: 1e-6,
            max_jacobi_sweeps: 64,
            preserve_missing: true,
        }
    }
}
