use std::{
    cmp::Ordering,
    collections::BTreeMap,
    hash::{Hash, Hasher},
};

use serde::{Deserialize, Serialize};

use crate::{
    errors::{TableError, TableResult},
    table::{Cell, Table},
};

/// `f64` with a total order so generalized numeric values can key a map.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderedF64(pub f64);

impl PartialEq for OrderedF64 {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for OrderedF64 {}

impl PartialOrd for OrderedF64 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedF64 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Hash for OrderedF64 {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

/// One quasi-identifier component of a row key. Categorical parts order
/// before numeric parts so rows sort by category first.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KeyPart {
    Missing,
    Categorical(String),
    Numeric(OrderedF64),
}

impl KeyPart {
    pub fn from_cell(cell: Cell<'_>) -> Self {
        match cell {
            Cell::Numeric(value) => KeyPart::Numeric(OrderedF64(value)),
            Cell::Categorical(value) => KeyPart::Categorical(value.to_owned()),
            Cell::Missing => KeyPart::Missing,
        }
    }
}

pub type QiKey = Vec<KeyPart>;

/// Caller-designated re-identification risk columns, ordered and de-duplicated.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuasiIdentifierSet(Vec<String>);

impl QuasiIdentifierSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ordered: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            if !ordered.contains(&name) {
                ordered.push(name);
            }
        }
        Self(ordered)
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|candidate| candidate == name)
    }

    /// Column positions of every quasi-identifier in `table`.
    pub fn resolve(&self, table: &Table) -> TableResult<Vec<usize>> {
        self.0
            .iter()
            .map(|name| {
                table
                    .column_index(name)
                    .ok_or_else(|| TableError::UnknownColumn(name.clone()))
            })
            .collect()
    }

    /// Quasi-identifier tuple for one row.
    pub fn row_key(table: &Table, indices: &[usize], row: usize) -> QiKey {
        indices
            .iter()
            .map(|&column| KeyPart::from_cell(table.cell(column, row)))
            .collect()
    }
}

impl<S: Into<String>> FromIterator<S> for QuasiIdentifierSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Rows grouped by identical quasi-identifier tuples.
#[derive(Clone, Debug, PartialEq)]
pub struct EquivalenceClasses {
    classes: BTreeMap<QiKey, Vec<usize>>,
    rows: usize,
}

impl EquivalenceClasses {
    pub fn compute(table: &Table, quasi_identifiers: &QuasiIdentifierSet) -> TableResult<Self> {
        let indices = quasi_identifiers.resolve(table)?;
        let mut classes: BTreeMap<QiKey, Vec<usize>> = BTreeMap::new();
        for row in 0..table.row_count() {
            classes
                .entry(QuasiIdentifierSet::row_key(table, &indices, row))
                .or_default()
                .push(row);
        }
        Ok(Self {
            classes,
            rows: table.row_count(),
        })
    }

    /// Smallest class size; 0 when there are no rows.
    pub fn min_size(&self) -> usize {
        self.classes.values().map(Vec::len).min().unwrap_or(0)
    }

    pub fn max_size(&self) -> usize {
        self.classes.values().map(Vec::len).max().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn iter(&self) -> impl Iterator<Item = (&QiKey, &[usize])> {
        self.classes.iter().map(|(key, rows)| (key, rows.as_slice()))
    }

    /// Classes smaller than `k`, in key order.
    pub fn undersized(&self, k: usize) -> Vec<(&QiKey, &[usize])> {
        self.iter().filter(|(_, rows)| rows.len() < k).collect()
    }

    pub fn satisfies(&self, k: usize) -> bool {
        !self.classes.is_empty() && self.min_size() >= k
    }

    /// Rows whose quasi-identifier tuple occurs exactly once.
    pub fn unique_rows(&self) -> usize {
        self.classes.values().filter(|rows| rows.len() == 1).count()
    }
}
