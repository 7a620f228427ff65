use crate::error::{EngineError, Result};
use serde::{Deserialize, Deserializer, Serialize};

/// Continuous `[start, stop)` span in seconds during which an event is active.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub start: f64,
    pub stop: f64,
}

impl Interval {
    pub fn new(start: f64, stop: f64) -> Self {
        Self { start, stop }
    }

    pub fn duration(&self) -> f64 {
        self.stop - self.start
    }
}

impl From<(f64, f64)> for Interval {
    fn from((start, stop): (f64, f64)) -> Self {
        Self { start, stop }
    }
}

/// Per-second occupancy produced by the rasterizer.
///
/// Entry `i` holds the time the event was active during second `i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupancyVector {
    cells: Vec<f64>,
}

impl OccupancyVector {
    pub(crate) fn from_cells(cells: Vec<f64>) -> Self {
        Self { cells }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[f64] {
        &self.cells
    }

    /// Total active time across the window.
    pub fn total(&self) -> f64 {
        self.cells.iter().sum()
    }

    pub fn into_cells(self) -> Vec<f64> {
        self.cells
    }
}

/// Subjects x columns matrix. Row order is the caller's subject order.
///
/// Serialized as a plain array of rows; deserializing goes through
/// [`SubjectMatrix::new`], so a stored matrix is always rectangular.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")]
pub struct SubjectMatrix {
    rows: Vec<Vec<f64>>,
    width: usize,
}

impl SubjectMatrix {
    /// Build a matrix, rejecting rows whose length differs from the first row.
    pub fn new(rows: Vec<Vec<f64>>) -> Result<Self> {
        let width = rows.first().map_or(0, Vec::len);
        for (row, values) in rows.iter().enumerate() {
            if values.len() != width {
                return Err(EngineError::RaggedMatrix {
                    row,
                    expected: width,
                    found: values.len(),
                });
            }
        }
        Ok(Self { rows, width })
    }

    /// Stack occupancy vectors, one row per subject, in the given order.
    pub fn from_occupancy(vectors: Vec<OccupancyVector>) -> Result<Self> {
        Self::new(vectors.into_iter().map(OccupancyVector::into_cells).collect())
    }

    pub fn n_subjects(&self) -> usize {
        self.rows.len()
    }

    pub fn n_columns(&self) -> usize {
        self.width
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[f64]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// Values of one column, one per subject.
    ///
    /// Panics if `index >= n_columns()`.
    pub fn column(&self, index: usize) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().map(move |row| row[index])
    }

    /// Multiply every entry by `factor` (e.g. 100 for percentages).
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            rows: self
                .rows
                .iter()
                .map(|row| row.iter().map(|v| v * factor).collect())
                .collect(),
            width: self.width,
        }
    }
}

impl TryFrom<Vec<Vec<f64>>> for SubjectMatrix {
    type Error = EngineError;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self> {
        Self::new(rows)
    }
}

impl From<SubjectMatrix> for Vec<Vec<f64>> {
    fn from(matrix: SubjectMatrix) -> Self {
        matrix.rows
    }
}

/// Result of summing contiguous groups of cells per subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinnedMatrix {
    pub bin_width: usize,
    /// Trailing cells that did not fill a whole bin and were dropped.
    pub dropped_cells: usize,
    pub values: SubjectMatrix,
}

impl BinnedMatrix {
    pub fn n_bins(&self) -> usize {
        self.values.n_columns()
    }
}

/// Cross-subject mean and standard error per bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinSummary {
    pub n_subjects: usize,
    #[serde(deserialize_with = "nan_from_null")]
    pub mean: Vec<f64>,
    /// NaN when fewer than two subjects contributed; serialized as `null`.
    #[serde(deserialize_with = "nan_from_null")]
    pub sem: Vec<f64>,
}

impl BinSummary {
    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.mean.iter().copied().zip(self.sem.iter().copied())
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            n_subjects: self.n_subjects,
            mean: self.mean.iter().map(|v| v * factor).collect(),
            sem: self.sem.iter().map(|v| v * factor).collect(),
        }
    }
}

/// JSON has no NaN: `serde_json` writes it as `null`, so read `null` back as NaN.
pub fn nan_from_null<'de, D>(deserializer: D) -> std::result::Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let values: Vec<Option<f64>> = Vec::deserialize(deserializer)?;
    Ok(values
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}

pub fn nan_scalar_from_null<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ragged_rows_are_rejected() {
        let err = SubjectMatrix::new(vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert_eq!(
            err,
            EngineError::RaggedMatrix {
                row: 1,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn column_walks_subjects_in_order() {
        let m = SubjectMatrix::new(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(m.column(1).collect::<Vec<_>>(), vec![2.0, 4.0]);
        assert_eq!(m.row(0), Some(&[1.0, 2.0][..]));
        assert_eq!(m.n_columns(), 2);
    }

    #[test]
    fn summary_reads_null_sem_as_nan() {
        let summary: BinSummary =
            serde_json::from_str(r#"{"n_subjects":1,"mean":[2.0],"sem":[null]}"#).unwrap();
        assert_eq!(summary.mean, vec![2.0]);
        assert!(summary.sem[0].is_nan());
    }

    #[test]
    fn deserializing_ragged_rows_fails() {
        let err = serde_json::from_str::<SubjectMatrix>("[[1.0, 2.0], [3.0]]").unwrap_err();
        assert!(err.to_string().contains("row 1"), "{}", err);
    }

    #[test]
    fn matrix_json_round_trips_through_rows() {
        let m = SubjectMatrix::new(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, "[[1.0,2.0],[3.0,4.0]]");
        let back: SubjectMatrix = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
        assert_eq!(back.n_columns(), 2);
    }

    #[test]
    fn empty_matrix_has_no_columns() {
        let m = SubjectMatrix::new(Vec::new()).unwrap();
        assert!(m.is_empty());
        assert_eq!(m.n_columns(), 0);
    }
}
