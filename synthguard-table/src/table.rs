use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    column::{Column, ColumnData, ColumnKind},
    errors::{TableError, TableResult},
};

/// Borrowed view of a single cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Cell<'a> {
    Numeric(f64),
    Categorical(&'a str),
    Missing,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TableDocument", into = "TableDocument")]
pub struct Table {
    columns: Vec<Column>,
    rows: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct TableDocument {
    columns: Vec<Column>,
}

impl TryFrom<TableDocument> for Table {
    type Error = TableError;

    fn try_from(document: TableDocument) -> Result<Self, Self::Error> {
        Table::new(document.columns)
    }
}

impl From<Table> for TableDocument {
    fn from(table: Table) -> Self {
        TableDocument {
            columns: table.columns,
        }
    }
}

impl Table {
    pub fn new(columns: Vec<Column>) -> TableResult<Self> {
        let rows = columns.first().map_or(0, Column::len);
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.name().to_owned()) {
                return Err(TableError::DuplicateColumn(column.name().to_owned()));
            }
            if column.len() != rows {
                return Err(TableError::RaggedColumn {
                    column: column.name().to_owned(),
                    expected: rows,
                    actual: column.len(),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    pub fn builder() -> TableBuilder {
        TableBuilder::default()
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name() == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name() == name)
    }

    pub fn require_column(&self, name: &str) -> TableResult<&Column> {
        self.column(name)
            .ok_or_else(|| TableError::UnknownColumn(name.to_owned()))
    }

    pub fn require_kind(&self, name: &str, kind: ColumnKind) -> TableResult<&Column> {
        let column = self.require_column(name)?;
        if column.kind() != kind {
            return Err(TableError::KindMismatch {
                column: name.to_owned(),
                expected: kind,
                actual: column.kind(),
            });
        }
        Ok(column)
    }

    pub fn names_of_kind(&self, kind: ColumnKind) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|column| column.kind() == kind)
            .map(Column::name)
            .collect()
    }

    /// Column names paired with kinds, in column order.
    pub fn schema(&self) -> Vec<(String, ColumnKind)> {
        self.columns
            .iter()
            .map(|column| (column.name().to_owned(), column.kind()))
            .collect()
    }

    pub fn same_schema(&self, other: &Table) -> bool {
        self.schema() == other.schema()
    }

    pub fn cell(&self, column: usize, row: usize) -> Cell<'_> {
        let Some(column) = self.columns.get(column) else {
            return Cell::Missing;
        };
        match column.data() {
            ColumnData::Numeric(values) => match values.get(row).copied().flatten() {
                Some(value) => Cell::Numeric(value),
                None => Cell::Missing,
            },
            ColumnData::Categorical(values) => match values.get(row).and_then(Option::as_deref) {
                Some(value) => Cell::Categorical(value),
                None => Cell::Missing,
            },
        }
    }

    /// New table holding only `rows`, in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> TableResult<Table> {
        if let Some(&row) = rows.iter().find(|&&row| row >= self.rows) {
            return Err(TableError::RowOutOfBounds {
                row,
                rows: self.rows,
            });
        }
        Ok(Table {
            columns: self.columns.iter().map(|column| column.select(rows)).collect(),
            rows: rows.len(),
        })
    }

    /// New table with the same-named column swapped for `column`. The kind
    /// and length must match so the schema stays fixed.
    pub fn with_column(&self, column: Column) -> TableResult<Table> {
        let index = self
            .column_index(column.name())
            .ok_or_else(|| TableError::UnknownColumn(column.name().to_owned()))?;
        let current = &self.columns[index];
        if current.kind() != column.kind() {
            return Err(TableError::KindMismatch {
                column: column.name().to_owned(),
                expected: current.kind(),
                actual: column.kind(),
            });
        }
        if column.len() != self.rows {
            return Err(TableError::RaggedColumn {
                column: column.name().to_owned(),
                expected: self.rows,
                actual: column.len(),
            });
        }
        let mut columns = self.columns.clone();
        columns[index] = column;
        Ok(Table {
            columns,
            rows: self.rows,
        })
    }
}

#[derive(Default)]
pub struct TableBuilder {
    columns: Vec<Column>,
}

impl TableBuilder {
    pub fn numeric<I>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        self.columns.push(Column::numeric(
            name,
            values.into_iter().map(Some).collect(),
        ));
        self
    }

    pub fn numeric_opt<I>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        self.columns
            .push(Column::numeric(name, values.into_iter().collect()));
        self
    }

    pub fn categorical<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.push(Column::categorical(
            name,
            values.into_iter().map(|value| Some(value.into())).collect(),
        ));
        self
    }

    pub fn categorical_opt<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        self.columns.push(Column::categorical(
            name,
            values.into_iter().map(|value| value.map(Into::into)).collect(),
        ));
        self
    }

    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn build(self) -> TableResult<Table> {
        Table::new(self.columns)
    }
}
