use crate::{
    error::{EngineError, Result},
    signal::SubjectMatrix,
};

/// One measured value attributed to a subject, in recording order.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialRecord {
    pub subject: String,
    pub value: f64,
}

/// Build a subjects x trials matrix in roster order.
///
/// The first `trials` records of each subject are kept, preserving their
/// order in `records`. A subject with fewer records is an error.
pub fn trial_matrix(
    records: &[TrialRecord],
    subjects: &[String],
    trials: usize,
) -> Result<SubjectMatrix> {
    if trials == 0 {
        return Err(EngineError::InvalidConfig(
            "trial count must be positive".into(),
        ));
    }
    let mut rows = Vec::with_capacity(subjects.len());
    for subject in subjects {
        let row: Vec<f64> = records
            .iter()
            .filter(|record| &record.subject == subject)
            .take(trials)
            .map(|record| record.value)
            .collect();
        if row.len() < trials {
            return Err(EngineError::MissingTrials {
                subject: subject.clone(),
                expected: trials,
                found: row.len(),
            });
        }
        rows.push(row);
    }
    SubjectMatrix::new(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(subject: &str, value: f64) -> TrialRecord {
        TrialRecord {
            subject: subject.into(),
            value,
        }
    }

    #[test]
    fn rows_follow_roster_and_truncate() {
        let records = vec![
            record("C1B", 10.0),
            record("C1W", 20.0),
            record("C1B", 11.0),
            record("C1W", 21.0),
            record("C1B", 12.0),
        ];
        let roster = vec!["C1W".to_string(), "C1B".to_string()];
        let m = trial_matrix(&records, &roster, 2).unwrap();
        assert_eq!(m.row(0), Some(&[20.0, 21.0][..]));
        assert_eq!(m.row(1), Some(&[10.0, 11.0][..]));
    }

    #[test]
    fn short_subject_is_reported() {
        let records = vec![record("C1B", 10.0)];
        let roster = vec!["C1B".to_string(), "C2G".to_string()];
        let err = trial_matrix(&records, &roster, 1).unwrap_err();
        assert_eq!(
            err,
            EngineError::MissingTrials {
                subject: "C2G".into(),
                expected: 1,
                found: 0
            }
        );
    }
}
