use serde::{Deserialize, Serialize};

/// Binary logistic regression fitted by batch gradient descent on
/// standardised features.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LogisticRegression {
    means: Vec<f64>,
    scales: Vec<f64>,
    weights: Vec<f64>,
    bias: f64,
}

impl LogisticRegression {
    /// `labels` are 1.0 for members and 0.0 otherwise.
    pub fn fit(features: &[Vec<f64>], labels: &[f64], learning_rate: f64, epochs: usize) -> Self {
        let width = features.first().map_or(0, Vec::len);
        let n = features.len().max(1) as f64;
        let means: Vec<f64> = (0..width)
            .map(|col| features.iter().map(|row| row[col]).sum::<f64>() / n)
            .collect();
        let scales: Vec<f64> = (0..width)
            .map(|col| {
                let variance = features
                    .iter()
                    .map(|row| (row[col] - means[col]).powi(2))
                    .sum::<f64>()
                    / n;
                let std = variance.sqrt();
                if std > 1e-12 && std.is_finite() {
                    std
                } else {
                    1.0
                }
            })
            .collect();
        let mut model = Self {
            means,
            scales,
            weights: vec![0.0; width],
            bias: 0.0,
        };
        let standardised: Vec<Vec<f64>> = features.iter().map(|row| model.standardise(row)).collect();
        for _ in 0..epochs {
            let mut gradient = vec![0.0; width];
            let mut bias_gradient = 0.0;
            for (row, label) in standardised.iter().zip(labels) {
                let error = sigmoid(model.logit(row)) - label;
                for (slot, value) in gradient.iter_mut().zip(row) {
                    *slot += error * value;
                }
                bias_gradient += error;
            }
            for (weight, slot) in model.weights.iter_mut().zip(&gradient) {
                *weight -= learning_rate * slot / n;
            }
            model.bias -= learning_rate * bias_gradient / n;
        }
        model
    }

    fn standardise(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(value, (mean, scale))| (value - mean) / scale)
            .collect()
    }

    fn logit(&self, standardised: &[f64]) -> f64 {
        self.bias
            + self
                .weights
                .iter()
                .zip(standardised)
                .map(|(weight, value)| weight * value)
                .sum::<f64>()
    }

    /// Probability that `row` is a member.
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        sigmoid(self.logit(&self.standardise(row)))
    }

    pub fn predict(&self, row: &[f64]) -> bool {
        self.predict_proba(row) >= 0.5
    }

    /// Fraction of `features` whose prediction matches `labels`.
    pub fn accuracy(&self, features: &[Vec<f64>], labels: &[f64]) -> f64 {
        if features.is_empty() {
            return 0.0;
        }
        let correct = features
            .iter()
            .zip(labels)
            .filter(|(row, label)| self.predict(row) == (**label >= 0.5))
            .count();
        correct as f64 / features.len() as f64
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
