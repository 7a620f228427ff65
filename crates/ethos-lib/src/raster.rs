use crate::{
    error::{EngineError, Result},
    signal::{Interval, OccupancyVector, SubjectMatrix},
};

/// Convert continuous intervals into a per-second occupancy vector.
///
/// Each interval contributes its exact duration, split across the cells it
/// spans: the remainder of the first second, whole seconds in between and the
/// lead-in of the last second. A boundary equal to `window_length` falls into
/// the last cell.
pub fn rasterize(intervals: &[Interval], window_length: usize) -> Result<OccupancyVector> {
    if window_length == 0 {
        return Err(EngineError::InvalidWindow);
    }
    let mut cells = vec![0.0; window_length];
    for (index, interval) in intervals.iter().enumerate() {
        validate_interval(index, interval, window_length)?;
        let Interval { start, stop } = *interval;
        let s = cell_of(start, window_length);
        let e = cell_of(stop, window_length);
        if s == e {
            cells[s] += stop - start;
        } else {
            cells[s] += 1.0 - (start - s as f64);
            cells[e] += stop - e as f64;
            for cell in &mut cells[s + 1..e] {
                *cell += 1.0;
            }
        }
    }
    Ok(OccupancyVector::from_cells(cells))
}

/// Rasterize one interval list per subject and stack the results in order.
pub fn rasterize_subjects(
    subjects: &[Vec<Interval>],
    window_length: usize,
) -> Result<SubjectMatrix> {
    let vectors = subjects
        .iter()
        .map(|intervals| rasterize(intervals, window_length))
        .collect::<Result<Vec<_>>>()?;
    SubjectMatrix::from_occupancy(vectors)
}

fn validate_interval(index: usize, interval: &Interval, window_length: usize) -> Result<()> {
    let Interval { start, stop } = *interval;
    let within = start.is_finite()
        && stop.is_finite()
        && start >= 0.0
        && start <= stop
        && stop <= window_length as f64;
    if within {
        Ok(())
    } else {
        Err(EngineError::MalformedInterval {
            index,
            start,
            stop,
            window_length,
        })
    }
}

fn cell_of(t: f64, window_length: usize) -> usize {
    (t.floor() as usize).min(window_length - 1)
}
