use std::collections::HashSet;

use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use synthguard_table::{QiKey, QuasiIdentifierSet, Table, TableError};
use tracing::{debug, info};

use crate::{
    classifier::LogisticRegression,
    config::AuditConfig,
    errors::{AuditResult, InferenceError},
    features::FeatureSpace,
};

/// Accuracy of an adversary that guesses.
pub const BASELINE_RATE: f64 = 0.5;

/// Per-row attack features. Both nearest-neighbour distances skip one exact
/// match, also when the row is looked up in the other set, so a verbatim copy
/// of an original row looks like the original itself and does not separate
/// the classes. Copies are reported by [`InferenceResult::exact_match_rate`].
pub const FEATURE_NAMES: [&str; 3] = [
    "nn_distance_original",
    "nn_distance_synthetic",
    "density_score",
];

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct InferenceResult {
    pub attack_success_rate: f64,
    pub baseline: f64,
    pub pass_threshold: f64,
    pub passed: bool,
    pub features: Vec<String>,
    #[serde(default)]
    pub sensitive_columns: Vec<String>,
    #[serde(default)]
    pub train_records: usize,
    #[serde(default)]
    pub test_records: usize,
    #[serde(default)]
    pub seed: u64,
    /// Share of synthetic rows that duplicate an original row verbatim on the
    /// sensitive columns.
    #[serde(default)]
    pub exact_match_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
}

impl InferenceResult {
    /// Placeholder for an audit that could not run, e.g. nothing was released.
    pub fn skipped(reason: impl Into<String>, pass_threshold: f64, seed: u64) -> Self {
        Self {
            attack_success_rate: BASELINE_RATE,
            baseline: BASELINE_RATE,
            pass_threshold,
            passed: true,
            features: FEATURE_NAMES.iter().map(|name| name.to_string()).collect(),
            sensitive_columns: Vec::new(),
            train_records: 0,
            test_records: 0,
            seed,
            exact_match_rate: 0.0,
            skipped: Some(reason.into()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Source {
    Original,
    Synthetic,
}

#[derive(Clone, Debug, Default)]
pub struct InferenceAuditor {
    config: AuditConfig,
}

impl InferenceAuditor {
    pub fn new(config: AuditConfig) -> AuditResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Checks what an attack needs before any work is done: matching
    /// schemas, sensitive columns that exist and a non-empty `original`.
    /// Returns the resolved sensitive column indices.
    pub fn validate_inputs(
        &self,
        original: &Table,
        synthetic: &Table,
        sensitive_columns: &[String],
    ) -> AuditResult<Vec<usize>> {
        if !original.same_schema(synthetic) {
            return Err(InferenceError::SchemaMismatch(format!(
                "original {:?} vs synthetic {:?}",
                original.column_names(),
                synthetic.column_names()
            )));
        }
        let columns: Vec<String> = if sensitive_columns.is_empty() {
            original.column_names().iter().map(|name| name.to_string()).collect()
        } else {
            sensitive_columns.to_vec()
        };
        let sensitive = QuasiIdentifierSet::new(columns);
        let indices = sensitive.resolve(original).map_err(|err| match err {
            TableError::UnknownColumn(name) => InferenceError::UnknownColumn(name),
            other => InferenceError::SchemaMismatch(other.to_string()),
        })?;
        if original.is_empty() {
            return Err(InferenceError::EmptyInput("original"));
        }
        Ok(indices)
    }

    /// Membership-inference attack of `original` against `synthetic`.
    /// An empty `sensitive_columns` list means every column.
    pub fn run_attack(
        &self,
        original: &Table,
        synthetic: &Table,
        sensitive_columns: &[String],
        seed: u64,
    ) -> AuditResult<InferenceResult> {
        let indices = self.validate_inputs(original, synthetic, sensitive_columns)?;
        if synthetic.is_empty() {
            return Err(InferenceError::EmptyInput("synthetic"));
        }
        let names = original.column_names();
        let sensitive_columns: Vec<String> =
            indices.iter().map(|&index| names[index].to_string()).collect();

        let space = FeatureSpace::fit(original, &indices);
        let original_rows = space.encode(original);
        let synthetic_rows = space.encode(synthetic);

        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let per_class = original
            .row_count()
            .min(synthetic.row_count())
            .min(self.config.max_records_per_class);
        let mut labelled: Vec<(Source, usize)> =
            rand::seq::index::sample(&mut rng, original.row_count(), per_class)
                .into_iter()
                .map(|row| (Source::Original, row))
                .collect();
        labelled.extend(
            rand::seq::index::sample(&mut rng, synthetic.row_count(), per_class)
                .into_iter()
                .map(|row| (Source::Synthetic, row)),
        );
        labelled.shuffle(&mut rng);

        let features: Vec<Vec<f64>> = labelled
            .par_iter()
            .map(|&(source, row)| {
                let encoded = match source {
                    Source::Original => &original_rows[row],
                    Source::Synthetic => &synthetic_rows[row],
                };
                vec![
                    space.nearest_distance(encoded, &original_rows),
                    space.nearest_distance(encoded, &synthetic_rows),
                    space.density_score(encoded),
                ]
            })
            .collect();
        let labels: Vec<f64> = labelled
            .iter()
            .map(|(source, _)| if *source == Source::Original { 1.0 } else { 0.0 })
            .collect();

        let total = labelled.len();
        let train_records = ((total as f64 * self.config.train_fraction).round() as usize)
            .clamp(1, total.saturating_sub(1).max(1));
        let (train_x, test_x) = features.split_at(train_records);
        let (train_y, test_y) = labels.split_at(train_records);
        let model = LogisticRegression::fit(
            train_x,
            train_y,
            self.config.learning_rate,
            self.config.epochs,
        );
        let attack_success_rate = if test_x.is_empty() {
            BASELINE_RATE
        } else {
            model.accuracy(test_x, test_y)
        };
        debug!(weights = ?model.weights(), "membership classifier trained");

        let exact_match_rate = exact_match_rate(original, synthetic, &indices);
        let passed = attack_success_rate < self.config.pass_threshold;
        info!(
            rate = attack_success_rate,
            threshold = self.config.pass_threshold,
            passed,
            per_class,
            exact_match_rate,
            seed,
            "membership inference audit finished"
        );
        Ok(InferenceResult {
            attack_success_rate,
            baseline: BASELINE_RATE,
            pass_threshold: self.config.pass_threshold,
            passed,
            features: FEATURE_NAMES.iter().map(|name| name.to_string()).collect(),
            sensitive_columns,
            train_records,
            test_records: test_x.len(),
            seed,
            exact_match_rate,
            skipped: None,
        })
    }
}

/// Share of synthetic rows whose sensitive cells equal some original row.
fn exact_match_rate(original: &Table, synthetic: &Table, indices: &[usize]) -> f64 {
    if synthetic.is_empty() {
        return 0.0;
    }
    let seen: HashSet<QiKey> = (0..original.row_count())
        .map(|row| QuasiIdentifierSet::row_key(original, indices, row))
        .collect();
    let matches = (0..synthetic.row_count())
        .filter(|&row| seen.contains(&QuasiIdentifierSet::row_key(synthetic, indices, row)))
        .count();
    matches as f64 / synthetic.row_count() as f64
}
