use crate::{
    error::{EngineError, Result},
    metrics::binned::{mean_sd, validate_bin_width},
    signal::nan_scalar_from_null,
};
use serde::{Deserialize, Serialize};

/// Fraction of events that fall in a category, per bin.
///
/// Bin `i` covers `[i * bin_width, (i + 1) * bin_width)` seconds and
/// `floor(window_length / bin_width)` bins are produced. A bin with no
/// events in `total_events` reports `0.0`. Timestamps outside every bin are
/// ignored.
pub fn ratio_per_bin(
    category_events: &[f64],
    total_events: &[f64],
    bin_width: usize,
    window_length: usize,
) -> Result<Vec<f64>> {
    validate_bin_width(bin_width, window_length)?;
    validate_events(category_events)?;
    validate_events(total_events)?;
    let n_bins = window_length / bin_width;
    let category = count_per_bin(category_events, bin_width, n_bins);
    let total = count_per_bin(total_events, bin_width, n_bins);
    Ok(category
        .into_iter()
        .zip(total)
        .map(|(hits, all)| {
            if all > 0 {
                hits as f64 / all as f64
            } else {
                0.0
            }
        })
        .collect())
}

/// Number of events in each half-open bin.
pub fn count_per_bin(events: &[f64], bin_width: usize, n_bins: usize) -> Vec<usize> {
    (0..n_bins)
        .map(|i| {
            let start = (i * bin_width) as f64;
            let end = start + bin_width as f64;
            events.iter().filter(|&&t| t >= start && t < end).count()
        })
        .collect()
}

fn validate_events(events: &[f64]) -> Result<()> {
    match events.iter().position(|t| !t.is_finite()) {
        Some(index) => Err(EngineError::MalformedEvent {
            index,
            value: events[index],
        }),
        None => Ok(()),
    }
}

/// Per-subject event totals with their cross-subject mean and spread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountSummary {
    pub counts: Vec<usize>,
    #[serde(deserialize_with = "nan_scalar_from_null")]
    pub mean: f64,
    /// Unbiased sample standard deviation; NaN below two subjects.
    #[serde(deserialize_with = "nan_scalar_from_null")]
    pub sd: f64,
}

pub fn count_summary<S: AsRef<[f64]>>(subjects: &[S]) -> CountSummary {
    let counts: Vec<usize> = subjects.iter().map(|events| events.as_ref().len()).collect();
    let as_f64: Vec<f64> = counts.iter().map(|&c| c as f64).collect();
    let (mean, sd) = mean_sd(&as_f64);
    CountSummary { counts, mean, sd }
}
