use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

/// Cell storage for one column. `None` marks a missing cell.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(values) => values.len(),
            ColumnData::Categorical(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnData::Numeric(_) => ColumnKind::Numeric,
            ColumnData::Categorical(_) => ColumnKind::Categorical,
        }
    }

    pub fn is_missing(&self, row: usize) -> bool {
        match self {
            ColumnData::Numeric(values) => values.get(row).map_or(true, Option::is_none),
            ColumnData::Categorical(values) => values.get(row).map_or(true, Option::is_none),
        }
    }

    pub(crate) fn select(&self, rows: &[usize]) -> ColumnData {
        match self {
            ColumnData::Numeric(values) => {
                ColumnData::Numeric(rows.iter().map(|&row| values[row]).collect())
            }
            ColumnData::Categorical(values) => {
                ColumnData::Categorical(rows.iter().map(|&row| values[row].clone()).collect())
            }
        }
    }
}

/// Upper bound on the bands [`Banding::fixed_width`] produces.
pub const MAX_FIXED_BANDS: usize = 10_000;

/// Equal-width band edges attached to a generalized numeric column.
///
/// `edges` is ascending with `band_count() + 1` entries; band `i` covers
/// `[edges[i], edges[i + 1])` and the last band is closed on the right.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Banding {
    pub edges: Vec<f64>,
}

impl Banding {
    /// Splits `[min, max]` into `bands` equal-width bands. A degenerate range
    /// collapses to a single band.
    pub fn equal_width(min: f64, max: f64, bands: usize) -> Self {
        let bands = bands.max(1);
        if !(max > min) {
            return Self {
                edges: vec![min, max.max(min)],
            };
        }
        let width = (max - min) / bands as f64;
        let mut edges: Vec<f64> = (0..bands).map(|idx| min + width * idx as f64).collect();
        edges.push(max);
        Self { edges }
    }

    /// Fixed-width bands anchored at a multiple of `width` at or below `min`
    /// (e.g. 5-year age bands starting at 15 for a minimum age of 18).
    ///
    /// A width that would need more than [`MAX_FIXED_BANDS`] bands to cover
    /// the range falls back to that many equal-width bands from the anchor.
    pub fn fixed_width(min: f64, max: f64, width: f64) -> Self {
        if !(width > 0.0) || !(max > min) || !min.is_finite() || !max.is_finite() {
            return Self::equal_width(min, max, 1);
        }
        let start = (min / width).floor() * width;
        let bands = ((max - start) / width).floor() + 1.0;
        if !(bands.is_finite() && bands <= MAX_FIXED_BANDS as f64) {
            return Self::equal_width(start, max, MAX_FIXED_BANDS);
        }
        let edges = (0..=bands as usize)
            .map(|idx| start + width * idx as f64)
            .collect();
        Self { edges }
    }

    pub fn band_count(&self) -> usize {
        self.edges.len().saturating_sub(1).max(1)
    }

    pub fn index_of(&self, value: f64) -> usize {
        let last = self.band_count() - 1;
        if self.edges.len() < 2 {
            return 0;
        }
        // edges[1..] are the exclusive upper bounds of each band
        let position = self.edges[1..].partition_point(|upper| *upper <= value);
        position.min(last)
    }

    pub fn bounds(&self, index: usize) -> (f64, f64) {
        let lo = self.edges.get(index).copied().unwrap_or(f64::NAN);
        let hi = self.edges.get(index + 1).copied().unwrap_or(lo);
        (lo, hi)
    }

    pub fn midpoint(&self, index: usize) -> f64 {
        let (lo, hi) = self.bounds(index);
        lo + (hi - lo) / 2.0
    }

    pub fn label(&self, index: usize) -> String {
        let (lo, hi) = self.bounds(index);
        if index + 1 == self.band_count() {
            format!("[{}, {}]", trim_float(lo), trim_float(hi))
        } else {
            format!("[{}, {})", trim_float(lo), trim_float(hi))
        }
    }

    pub fn label_for(&self, value: f64) -> String {
        self.label(self.index_of(value))
    }
}

fn trim_float(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value:.2}")
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Column {
    name: String,
    data: ColumnData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    banding: Option<Banding>,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
            banding: None,
        }
    }

    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self::new(name, ColumnData::Numeric(values))
    }

    pub fn categorical(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self::new(name, ColumnData::Categorical(values))
    }

    /// Attaches band metadata. Only meaningful on numeric columns.
    pub fn with_banding(mut self, banding: Banding) -> Self {
        if self.kind() == ColumnKind::Numeric {
            self.banding = Some(banding);
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ColumnKind {
        self.data.kind()
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn banding(&self) -> Option<&Banding> {
        self.banding.as_ref()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn numeric_values(&self) -> Option<&[Option<f64>]> {
        match &self.data {
            ColumnData::Numeric(values) => Some(values),
            ColumnData::Categorical(_) => None,
        }
    }

    pub fn categorical_values(&self) -> Option<&[Option<String>]> {
        match &self.data {
            ColumnData::Categorical(values) => Some(values),
            ColumnData::Numeric(_) => None,
        }
    }

    /// Observed (non-missing, finite) numeric values in row order.
    pub fn observed_numeric(&self) -> Vec<f64> {
        self.numeric_values()
            .map(|values| {
                values
                    .iter()
                    .flatten()
                    .copied()
                    .filter(|value| value.is_finite())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn missing_count(&self) -> usize {
        (0..self.len()).filter(|&row| self.data.is_missing(row)).count()
    }

    /// Human-readable rendering of one cell, using band labels when present.
    pub fn display(&self, row: usize) -> String {
        match &self.data {
            ColumnData::Numeric(values) => match (values.get(row).copied().flatten(), &self.banding) {
                (Some(value), Some(banding)) => banding.label_for(value),
                (Some(value), None) => value.to_string(),
                (None, _) => String::new(),
            },
            ColumnData::Categorical(values) => values
                .get(row)
                .cloned()
                .flatten()
                .unwrap_or_default(),
        }
    }

    pub(crate) fn select(&self, rows: &[usize]) -> Column {
        Column {
            name: self.name.clone(),
            data: self.data.select(rows),
            banding: self.banding.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_width_bands_cover_range() {
        let banding = Banding::equal_width(0.0, 100.0, 4);
        assert_eq!(banding.band_count(), 4);
        assert_eq!(banding.index_of(0.0), 0);
        assert_eq!(banding.index_of(24.9), 0);
        assert_eq!(banding.index_of(25.0), 1);
        assert_eq!(banding.index_of(100.0), 3);
        assert_eq!(banding.midpoint(1), 37.5);
        assert_eq!(banding.label(0), "[0, 25)");
        assert_eq!(banding.label(3), "[75, 100]");
    }

    #[test]
    fn fixed_width_bands_align_to_width() {
        let banding = Banding::fixed_width(18.0, 64.0, 5.0);
        assert_eq!(banding.edges[0], 15.0);
        assert_eq!(banding.label_for(18.0), "[15, 20)");
        assert_eq!(banding.label_for(64.0), "[60, 65]");
        assert_eq!(banding.band_count(), 10);
    }

    #[test]
    fn tiny_width_is_capped() {
        let banding = Banding::fixed_width(0.0, 1e12, 1e-6);
        assert_eq!(banding.band_count(), MAX_FIXED_BANDS);
        assert_eq!(banding.edges[0], 0.0);
        assert_eq!(banding.edges.last().copied(), Some(1e12));
        assert_eq!(banding.index_of(1e12), MAX_FIXED_BANDS - 1);
        assert_eq!(banding.index_of(0.5), 0);
    }

    #[test]
    fn degenerate_range_has_single_band() {
        let banding = Banding::equal_width(3.0, 3.0, 10);
        assert_eq!(banding.band_count(), 1);
        assert_eq!(banding.index_of(3.0), 0);
        assert_eq!(banding.midpoint(0), 3.0);
    }

    #[test]
    fn display_uses_band_labels() {
        let column = Column::numeric("age", vec![Some(31.0), None])
            .with_banding(Banding::equal_width(30.0, 40.0, 2));
        assert_eq!(column.display(0), "[30, 35)");
        assert_eq!(column.display(1), "");
        assert_eq!(column.missing_count(), 1);
    }
}
