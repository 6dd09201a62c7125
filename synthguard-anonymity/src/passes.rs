use std::collections::BTreeMap;

use synthguard_table::{
    Banding, Column, ColumnKind, EquivalenceClasses, QuasiIdentifierSet, Table,
};
use tracing::debug;

use crate::{
    config::EnforcerConfig,
    errors::AnonymityResult,
    report::{EnforcementReport, PassKind, PassRecord},
};

/// Inputs shared by every pass of one enforcement run.
#[derive(Clone, Copy, Debug)]
pub struct PassContext<'a> {
    pub quasi_identifiers: &'a QuasiIdentifierSet,
    pub target_k: usize,
    pub config: &'a EnforcerConfig,
}

impl PassContext<'_> {
    pub fn classes(&self, table: &Table) -> AnonymityResult<EquivalenceClasses> {
        Ok(EquivalenceClasses::compute(table, self.quasi_identifiers)?)
    }

    pub fn min_class_size(&self, table: &Table) -> AnonymityResult<usize> {
        Ok(self.classes(table)?.min_size())
    }
}

/// One step of the enforcement pipeline. A pass that finds nothing to do
/// returns its inputs untouched and records nothing.
pub trait EnforcementPass: Send + Sync {
    fn kind(&self) -> PassKind;

    fn apply(
        &self,
        ctx: &PassContext<'_>,
        table: Table,
        report: EnforcementReport,
    ) -> AnonymityResult<(Table, EnforcementReport)>;
}

/// Replaces numeric quasi-identifiers with the midpoint of their band.
#[derive(Clone, Copy, Debug, Default)]
pub struct NumericGeneralization;

impl EnforcementPass for NumericGeneralization {
    fn kind(&self) -> PassKind {
        PassKind::NumericGeneralization
    }

    fn apply(
        &self,
        ctx: &PassContext<'_>,
        mut table: Table,
        mut report: EnforcementReport,
    ) -> AnonymityResult<(Table, EnforcementReport)> {
        let mut columns = Vec::new();
        let mut details = Vec::new();
        let mut changed_rows = vec![false; table.row_count()];
        for name in ctx.quasi_identifiers.iter() {
            let column = table.require_column(name)?;
            if column.kind() != ColumnKind::Numeric || column.banding().is_some() {
                continue;
            }
            let observed = column.observed_numeric();
            let Some((min, max)) = range(&observed) else {
                continue;
            };
            let banding = match ctx.config.band_widths.get(name) {
                Some(&width) => Banding::fixed_width(min, max, width),
                None => Banding::equal_width(min, max, ctx.config.band_count),
            };
            let values = column.numeric_values().unwrap_or_default();
            let generalized: Vec<Option<f64>> = values
                .iter()
                .enumerate()
                .map(|(row, value)| match value {
                    Some(value) if value.is_finite() => {
                        let midpoint = banding.midpoint(banding.index_of(*value));
                        if midpoint.to_bits() != value.to_bits() {
                            changed_rows[row] = true;
                        }
                        Some(midpoint)
                    }
                    other => *other,
                })
                .collect();
            details.push(format!("{name}: {} bands", banding.band_count()));
            table = table.with_column(Column::numeric(name, generalized).with_banding(banding))?;
            columns.push(name.to_owned());
        }
        if columns.is_empty() {
            return Ok((table, report));
        }
        let k_after = ctx.min_class_size(&table)?;
        debug!(columns = ?columns, k_after, "numeric quasi-identifiers banded");
        report.record(PassRecord {
            kind: self.kind(),
            columns,
            rows_affected: changed_rows.iter().filter(|changed| **changed).count(),
            k_after,
            detail: details.join("; "),
        });
        Ok((table, report))
    }
}

/// Collapses categories seen fewer than `k` times into one shared label.
#[derive(Clone, Copy, Debug, Default)]
pub struct CategoricalGeneralization;

impl EnforcementPass for CategoricalGeneralization {
    fn kind(&self) -> PassKind {
        PassKind::CategoricalGeneralization
    }

    fn apply(
        &self,
        ctx: &PassContext<'_>,
        mut table: Table,
        mut report: EnforcementReport,
    ) -> AnonymityResult<(Table, EnforcementReport)> {
        let other = ctx.config.other_label.as_str();
        let mut columns = Vec::new();
        let mut details = Vec::new();
        let mut changed_rows = vec![false; table.row_count()];
        for name in ctx.quasi_identifiers.iter() {
            let column = table.require_column(name)?;
            let Some(values) = column.categorical_values() else {
                continue;
            };
            let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
            for value in values.iter().flatten() {
                *counts.entry(value.as_str()).or_default() += 1;
            }
            let rare: Vec<&str> = counts
                .iter()
                .filter(|(category, count)| **count < ctx.target_k && **category != other)
                .map(|(category, _)| *category)
                .collect();
            if rare.is_empty() {
                continue;
            }
            let collapsed: Vec<Option<String>> = values
                .iter()
                .enumerate()
                .map(|(row, value)| match value {
                    Some(category) if rare.contains(&category.as_str()) => {
                        changed_rows[row] = true;
                        Some(other.to_owned())
                    }
                    kept => kept.clone(),
                })
                .collect();
            details.push(format!("{name}: {} categories merged", rare.len()));
            table = table.with_column(Column::categorical(name, collapsed))?;
            columns.push(name.to_owned());
        }
        if columns.is_empty() {
            return Ok((table, report));
        }
        let k_after = ctx.min_class_size(&table)?;
        debug!(columns = ?columns, k_after, label = other, "rare categories collapsed");
        report.record(PassRecord {
            kind: self.kind(),
            columns,
            rows_affected: changed_rows.iter().filter(|changed| **changed).count(),
            k_after,
            detail: details.join("; "),
        });
        Ok((table, report))
    }
}

/// Sorts the rows of undersized classes by quasi-identifier tuple, cuts them
/// into consecutive groups of at least `k` rows and gives every row of a group
/// the group mean (numeric) or mode (categorical).
#[derive(Clone, Copy, Debug, Default)]
pub struct MicroAggregation;

impl EnforcementPass for MicroAggregation {
    fn kind(&self) -> PassKind {
        PassKind::MicroAggregation
    }

    fn apply(
        &self,
        ctx: &PassContext<'_>,
        mut table: Table,
        mut report: EnforcementReport,
    ) -> AnonymityResult<(Table, EnforcementReport)> {
        let k = ctx.target_k.max(1);
        let classes = ctx.classes(&table)?;
        let mut rows: Vec<usize> = classes
            .undersized(k)
            .into_iter()
            .flat_map(|(_, rows)| rows.iter().copied())
            .collect();
        if rows.len() < k || ctx.quasi_identifiers.is_empty() {
            return Ok((table, report));
        }

        let indices = ctx.quasi_identifiers.resolve(&table)?;
        let (mut order, numeric): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&idx| table.columns()[idx].kind() == ColumnKind::Categorical);
        order.extend(numeric);
        rows.sort_by_cached_key(|&row| (QuasiIdentifierSet::row_key(&table, &order, row), row));

        let group_count = rows.len() / k;
        let groups: Vec<&[usize]> = (0..group_count)
            .map(|group| {
                let start = group * k;
                let end = if group + 1 == group_count {
                    rows.len()
                } else {
                    start + k
                };
                &rows[start..end]
            })
            .collect();

        let mut changed_rows = vec![false; table.row_count()];
        for name in ctx.quasi_identifiers.iter() {
            let column = table.require_column(name)?;
            let replacement = match column.kind() {
                ColumnKind::Numeric => {
                    let mut values = column.numeric_values().unwrap_or_default().to_vec();
                    for group in &groups {
                        aggregate_mean(&mut values, group, &mut changed_rows);
                    }
                    let replaced = Column::numeric(name, values);
                    match column.banding() {
                        Some(banding) => replaced.with_banding(banding.clone()),
                        None => replaced,
                    }
                }
                ColumnKind::Categorical => {
                    let mut values = column.categorical_values().unwrap_or_default().to_vec();
                    for group in &groups {
                        aggregate_mode(&mut values, group, &mut changed_rows);
                    }
                    Column::categorical(name, values)
                }
            };
            table = table.with_column(replacement)?;
        }

        let k_after = ctx.min_class_size(&table)?;
        debug!(
            rows = rows.len(),
            groups = groups.len(),
            k_after,
            "noncompliant rows micro-aggregated"
        );
        report.record(PassRecord {
            kind: self.kind(),
            columns: ctx.quasi_identifiers.names().to_vec(),
            rows_affected: changed_rows.iter().filter(|changed| **changed).count(),
            k_after,
            detail: format!("{} rows in {} groups", rows.len(), groups.len()),
        });
        Ok((table, report))
    }
}

/// Drops the rows of every class smaller than `k`, smallest class first.
#[derive(Clone, Copy, Debug, Default)]
pub struct Suppression;

impl EnforcementPass for Suppression {
    fn kind(&self) -> PassKind {
        PassKind::Suppression
    }

    fn apply(
        &self,
        ctx: &PassContext<'_>,
        table: Table,
        mut report: EnforcementReport,
    ) -> AnonymityResult<(Table, EnforcementReport)> {
        let classes = ctx.classes(&table)?;
        let mut undersized = classes.undersized(ctx.target_k.max(1));
        if undersized.is_empty() {
            return Ok((table, report));
        }
        // stable sort keeps key order among equally sized classes
        undersized.sort_by_key(|(_, rows)| rows.len());
        let mut removed = vec![false; table.row_count()];
        for (_, rows) in &undersized {
            for &row in rows.iter() {
                removed[row] = true;
            }
        }
        let keep: Vec<usize> = (0..table.row_count()).filter(|&row| !removed[row]).collect();
        let rows_removed = table.row_count() - keep.len();
        let released = table.select_rows(&keep)?;
        let k_after = ctx.min_class_size(&released)?;
        debug!(
            classes = undersized.len(),
            rows_removed,
            remaining = released.row_count(),
            "undersized classes suppressed"
        );
        report.record(PassRecord {
            kind: self.kind(),
            columns: ctx.quasi_identifiers.names().to_vec(),
            rows_affected: rows_removed,
            k_after,
            detail: format!("{} classes removed", undersized.len()),
        });
        Ok((released, report))
    }
}

/// Default pass order, least destructive first.
pub fn default_passes() -> Vec<Box<dyn EnforcementPass>> {
    vec![
        Box::new(NumericGeneralization),
        Box::new(CategoricalGeneralization),
        Box::new(MicroAggregation),
        Box::new(Suppression),
    ]
}

fn range(values: &[f64]) -> Option<(f64, f64)> {
    let first = *values.first()?;
    Some(
        values
            .iter()
            .fold((first, first), |(lo, hi), value| (lo.min(*value), hi.max(*value))),
    )
}

fn aggregate_mean(values: &mut [Option<f64>], group: &[usize], changed: &mut [bool]) {
    let observed: Vec<f64> = group
        .iter()
        .filter_map(|&row| values[row])
        .filter(|value| value.is_finite())
        .collect();
    if observed.is_empty() {
        return;
    }
    let mean = observed.iter().sum::<f64>() / observed.len() as f64;
    for &row in group {
        if values[row].map(f64::to_bits) != Some(mean.to_bits()) {
            changed[row] = true;
        }
        values[row] = Some(mean);
    }
}

/// Most frequent category; ties go to the lexicographically smallest.
fn aggregate_mode(values: &mut [Option<String>], group: &[usize], changed: &mut [bool]) {
    let mode = {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for value in group.iter().filter_map(|&row| values[row].as_deref()) {
            *counts.entry(value).or_default() += 1;
        }
        let mut best: Option<(&str, usize)> = None;
        for (category, count) in counts {
            if best.map_or(true, |(_, top)| count > top) {
                best = Some((category, count));
            }
        }
        best.map(|(category, _)| category.to_owned())
    };
    let Some(mode) = mode else {
        return;
    };
    for &row in group {
        if values[row].as_deref() != Some(mode.as_str()) {
            changed[row] = true;
            values[row] = Some(mode.clone());
        }
    }
}
