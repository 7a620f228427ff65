use crate::{
    error::{EngineError, Result},
    signal::{BinSummary, BinnedMatrix, SubjectMatrix},
};

/// Sum disjoint runs of `bin_width` columns per subject.
///
/// `floor(columns / bin_width)` bins are produced; trailing columns that do
/// not fill a whole bin are dropped. An empty matrix yields an empty result.
pub fn bin_sum(matrix: &SubjectMatrix, bin_width: usize) -> Result<BinnedMatrix> {
    if matrix.is_empty() {
        return Ok(BinnedMatrix {
            bin_width,
            dropped_cells: 0,
            values: SubjectMatrix::default(),
        });
    }
    let cells = matrix.n_columns();
    validate_bin_width(bin_width, cells)?;
    let n_bins = cells / bin_width;
    let rows: Vec<Vec<f64>> = matrix
        .rows()
        .iter()
        .map(|row| {
            row.chunks_exact(bin_width)
                .map(|chunk| chunk.iter().sum())
                .collect()
        })
        .collect();
    Ok(BinnedMatrix {
        bin_width,
        dropped_cells: cells - n_bins * bin_width,
        values: SubjectMatrix::new(rows)?,
    })
}

/// Cross-subject mean and standard error per column.
///
/// With `normalize_by`, every value is divided by that count before the
/// statistics are taken. The standard error uses the unbiased sample standard
/// deviation and is NaN when fewer than two subjects are present.
pub fn summarize(matrix: &SubjectMatrix, normalize_by: Option<usize>) -> Result<BinSummary> {
    let divisor = match normalize_by {
        Some(0) => {
            return Err(EngineError::InvalidConfig(
                "normalize_by must be a positive count".into(),
            ))
        }
        Some(count) => count as f64,
        None => 1.0,
    };
    let n_subjects = matrix.n_subjects();
    let mut mean = Vec::with_capacity(matrix.n_columns());
    let mut sem = Vec::with_capacity(matrix.n_columns());
    for column in 0..matrix.n_columns() {
        let values: Vec<f64> = matrix.column(column).map(|v| v / divisor).collect();
        let (m, sd) = mean_sd(&values);
        mean.push(m);
        sem.push(sd / (values.len() as f64).sqrt());
    }
    Ok(BinSummary {
        n_subjects,
        mean,
        sem,
    })
}

/// Mean of each subject's row; NaN for a row with no columns.
pub fn row_means(matrix: &SubjectMatrix) -> Vec<f64> {
    matrix.rows().iter().map(|row| mean_sd(row).0).collect()
}

/// Mean and unbiased sample standard deviation.
///
/// The deviation is NaN below two values; the mean is NaN for an empty slice.
pub fn mean_sd(values: &[f64]) -> (f64, f64) {
    let n = values.len();
    if n == 0 {
        return (f64::NAN, f64::NAN);
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    if n < 2 {
        return (mean, f64::NAN);
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n as f64 - 1.0);
    (mean, var.sqrt())
}

pub(crate) fn validate_bin_width(bin_width: usize, cells: usize) -> Result<()> {
    if bin_width == 0 || bin_width > cells {
        return Err(EngineError::InvalidBinWidth { bin_width, cells });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn trailing_cells_are_dropped() {
        let m = SubjectMatrix::new(vec![vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]]).unwrap();
        let binned = bin_sum(&m, 3).unwrap();
        assert_eq!(binned.n_bins(), 2);
        assert_eq!(binned.dropped_cells, 1);
        assert_eq!(binned.values.row(0), Some(&[6.0, 15.0][..]));
    }

    #[test]
    fn bin_width_is_validated() {
        let m = SubjectMatrix::new(vec![vec![0.0; 4]]).unwrap();
        assert_eq!(
            bin_sum(&m, 0).unwrap_err(),
            EngineError::InvalidBinWidth {
                bin_width: 0,
                cells: 4
            }
        );
        assert!(matches!(
            bin_sum(&m, 5),
            Err(EngineError::InvalidBinWidth { bin_width: 5, .. })
        ));
        assert_eq!(bin_sum(&m, 4).unwrap().n_bins(), 1);
    }

    #[test]
    fn empty_matrix_bins_to_empty() {
        let binned = bin_sum(&SubjectMatrix::default(), 150).unwrap();
        assert!(binned.values.is_empty());
        let summary = summarize(&binned.values, None).unwrap();
        assert!(summary.is_empty());
        assert_eq!(summary.n_subjects, 0);
    }

    #[test]
    fn mean_and_sem_across_subjects() {
        let m = SubjectMatrix::new(vec![vec![1.0, 2.0, 3.0], vec![3.0, 2.0, 1.0]]).unwrap();
        let summary = summarize(&m, None).unwrap();
        assert_eq!(summary.mean, vec![2.0, 2.0, 2.0]);
        // {1, 3}: sd = sqrt(2), sem = sqrt(2) / sqrt(2)
        assert_close(summary.sem[0], 1.0);
        assert_close(summary.sem[1], 0.0);
        assert_close(summary.sem[2], 1.0);
    }

    #[test]
    fn two_value_closed_form() {
        let m = SubjectMatrix::new(vec![vec![4.0], vec![6.0]]).unwrap();
        let summary = summarize(&m, None).unwrap();
        assert_close(summary.mean[0], 5.0);
        assert_close(summary.sem[0], 1.0);
    }

    #[test]
    fn normalization_divides_before_statistics() {
        let m = SubjectMatrix::new(vec![vec![4.0], vec![6.0]]).unwrap();
        let summary = summarize(&m, Some(2)).unwrap();
        assert_close(summary.mean[0], 2.5);
        assert_close(summary.sem[0], 0.5);
        assert!(matches!(
            summarize(&m, Some(0)),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn single_subject_sem_is_nan() {
        let m = SubjectMatrix::new(vec![vec![3.0, 4.0]]).unwrap();
        let summary = summarize(&m, None).unwrap();
        assert_eq!(summary.mean, vec![3.0, 4.0]);
        assert!(summary.sem.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn nan_sem_serializes_as_null() {
        let m = SubjectMatrix::new(vec![vec![3.0]]).unwrap();
        let summary = summarize(&m, None).unwrap();
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json["sem"][0].is_null());
    }

    #[test]
    fn row_means_follow_subject_order() {
        let m = SubjectMatrix::new(vec![vec![1.0, 3.0], vec![10.0, 20.0]]).unwrap();
        assert_eq!(row_means(&m), vec![2.0, 15.0]);
    }

    #[test]
    fn occupancy_pipeline_end_to_end() {
        use crate::{raster::rasterize_subjects, signal::Interval};
        let subjects = vec![
            vec![Interval::new(0.5, 2.5), Interval::new(5.0, 6.0)],
            vec![Interval::new(3.0, 4.0)],
        ];
        let m = rasterize_subjects(&subjects, 7).unwrap();
        let binned = bin_sum(&m, 3).unwrap();
        assert_eq!(binned.values.row(0), Some(&[2.0, 1.0][..]));
        assert_eq!(binned.values.row(1), Some(&[0.0, 1.0][..]));
        let summary = summarize(&binned.values, None).unwrap();
        assert_close(summary.mean[0], 1.0);
        assert_close(summary.mean[1], 1.0);
        assert_close(summary.sem[1], 0.0);
    }
}
