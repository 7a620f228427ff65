use crate::metrics::trials::TrialRecord;
use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::path::Path;

/// Read `(subject, value)` rows from a delimited table with headers.
///
/// Column names are matched case-insensitively after trimming; subject ids are
/// trimmed. Rows keep file order.
pub fn read_trial_table(
    path: &Path,
    subject_col: &str,
    value_col: &str,
    delimiter: u8,
) -> Result<Vec<TrialRecord>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(file);
    let headers = reader.headers().context("reading header")?.clone();

    let subject_idx = locate_column(&headers, subject_col, "subject id")?;
    let value_idx = locate_column(&headers, value_col, "value")?;

    let mut records = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result.context("reading record")?;
        let subject = record
            .get(subject_idx)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow::anyhow!("row {} has no subject id", row + 1))?;
        let value = record
            .get(value_idx)
            .ok_or_else(|| anyhow::anyhow!("row {} has no {} value", row + 1, value_col))?
            .trim()
            .parse::<f64>()
            .with_context(|| format!("parsing {} on row {}", value_col, row + 1))?;
        records.push(TrialRecord {
            subject: subject.to_string(),
            value,
        });
    }
    Ok(records)
}

fn locate_column(headers: &StringRecord, requested: &str, hint: &str) -> Result<usize> {
    headers
        .iter()
        .position(|name| name.trim().eq_ignore_ascii_case(requested.trim()))
        .ok_or_else(|| anyhow::anyhow!("missing {} column ({})", hint, requested))
}
