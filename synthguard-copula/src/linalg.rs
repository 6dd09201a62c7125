use serde::{Deserialize, Serialize};

/// Dense square matrix, row-major.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    dim: usize,
    values: Vec<f64>,
}

impl Matrix {
    pub fn zeros(dim: usize) -> Self {
        Self {
            dim,
            values: vec![0.0; dim * dim],
        }
    }

    pub fn identity(dim: usize) -> Self {
        let mut matrix = Self::zeros(dim);
        for idx in 0..dim {
            matrix.set(idx, idx, 1.0);
        }
        matrix
    }

    pub fn from_rows(rows: &[Vec<f64>]) -> Option<Self> {
        let dim = rows.len();
        if rows.iter().any(|row| row.len() != dim) {
            return None;
        }
        Some(Self {
            dim,
            values: rows.iter().flatten().copied().collect(),
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.dim + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.values[row * self.dim + col] = value;
    }

    pub fn rows(&self) -> Vec<Vec<f64>> {
        self.values
            .chunks(self.dim.max(1))
            .take(self.dim)
            .map(<[f64]>::to_vec)
            .collect()
    }

    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|value| value.is_finite())
    }

    pub fn is_symmetric(&self, tolerance: f64) -> bool {
        (0..self.dim).all(|i| (0..i).all(|j| (self.get(i, j) - self.get(j, i)).abs() <= tolerance))
    }

    /// Frobenius norm of `self - other`; `None` on dimension mismatch.
    pub fn frobenius_distance(&self, other: &Matrix) -> Option<f64> {
        if self.dim != other.dim {
            return None;
        }
        let sum = self
            .values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>();
        Some(sum.sqrt())
    }

    pub fn max_abs_difference(&self, other: &Matrix) -> Option<f64> {
        if self.dim != other.dim {
            return None;
        }
        Some(
            self.values
                .iter()
                .zip(&other.values)
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max),
        )
    }

    /// `self · vector`.
    pub fn mul_vec(&self, vector: &[f64]) -> Vec<f64> {
        (0..self.dim)
            .map(|row| {
                self.values[row * self.dim..(row + 1) * self.dim]
                    .iter()
                    .zip(vector)
                    .map(|(a, b)| a * b)
                    .sum()
            })
            .collect()
    }

    /// Eigen-decomposition of a symmetric matrix by cyclic Jacobi rotations.
    /// Returns eigenvalues and a matrix whose columns are the eigenvectors.
    pub fn symmetric_eigen(&self, max_sweeps: usize) -> (Vec<f64>, Matrix) {
        let n = self.dim;
        let mut a = self.clone();
        let mut v = Matrix::identity(n);
        for _ in 0..max_sweeps.max(1) {
            let off_diagonal: f64 = (0..n)
                .flat_map(|i| (0..n).filter(move |&j| j != i).map(move |j| (i, j)))
                .map(|(i, j)| a.get(i, j).powi(2))
                .sum();
            if off_diagonal < 1e-22 {
                break;
            }
            for p in 0..n {
                for q in (p + 1)..n {
                    let apq = a.get(p, q);
                    if apq.abs() < 1e-300 {
                        continue;
                    }
                    let theta = (a.get(q, q) - a.get(p, p)) / (2.0 * apq);
                    let sign = if theta >= 0.0 { 1.0 } else { -1.0 };
                    let t = sign / (theta.abs() + (theta * theta + 1.0).sqrt());
                    let c = 1.0 / (t * t + 1.0).sqrt();
                    let s = t * c;
                    for k in 0..n {
                        let akp = a.get(k, p);
                        let akq = a.get(k, q);
                        a.set(k, p, c * akp - s * akq);
                        a.set(k, q, s * akp + c * akq);
                    }
                    for k in 0..n {
                        let apk = a.get(p, k);
                        let aqk = a.get(q, k);
                        a.set(p, k, c * apk - s * aqk);
                        a.set(q, k, s * apk + c * aqk);
                    }
                    for k in 0..n {
                        let vkp = v.get(k, p);
                        let vkq = v.get(k, q);
                        v.set(k, p, c * vkp - s * vkq);
                        v.set(k, q, s * vkp + c * vkq);
                    }
                }
            }
        }
        let eigenvalues = (0..n).map(|idx| a.get(idx, idx)).collect();
        (eigenvalues, v)
    }

    /// Raises eigenvalues below `floor` and rescales the result back to a
    /// unit diagonal. Returns the repaired matrix and whether any eigenvalue
    /// was raised.
    pub fn floor_eigenvalues(&self, floor: f64, max_sweeps: usize) -> (Matrix, bool) {
        let (eigenvalues, vectors) = self.symmetric_eigen(max_sweeps);
        if eigenvalues.iter().all(|value| *value >= floor) {
            return (self.clone(), false);
        }
        let floored: Vec<f64> = eigenvalues.iter().map(|value| value.max(floor)).collect();
        let n = self.dim;
        let mut rebuilt = Matrix::zeros(n);
        for i in 0..n {
            for j in 0..=i {
                let value = (0..n)
                    .map(|k| vectors.get(i, k) * floored[k] * vectors.get(j, k))
                    .sum::<f64>();
                rebuilt.set(i, j, value);
                rebuilt.set(j, i, value);
            }
        }
        let diagonal: Vec<f64> = (0..n).map(|idx| rebuilt.get(idx, idx).sqrt()).collect();
        for i in 0..n {
            for j in 0..n {
                let scale = diagonal[i] * diagonal[j];
                let value = if i == j { 1.0 } else { rebuilt.get(i, j) / scale };
                rebuilt.set(i, j, value);
            }
        }
        (rebuilt, true)
    }

    /// Lower-triangular Cholesky factor; `None` if not positive definite.
    pub fn cholesky(&self) -> Option<Matrix> {
        let n = self.dim;
        let mut lower = Matrix::zeros(n);
        for i in 0..n {
            for j in 0..=i {
                let partial = (0..j).map(|k| lower.get(i, k) * lower.get(j, k)).sum::<f64>();
                let residual = self.get(i, j) - partial;
                if i == j {
                    if !(residual > 0.0) {
                        return None;
                    }
                    lower.set(i, j, residual.sqrt());
                } else {
                    lower.set(i, j, residual / lower.get(j, j));
                }
            }
        }
        Some(lower)
    }
}
