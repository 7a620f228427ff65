use crate::signal::Interval;
use anyhow::{Context, Result};
use std::path::Path;

fn data_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}

/// Parse newline-delimited event timestamps (seconds), ignoring blank/comment lines.
///
/// An input without samples is an empty series.
pub fn parse_event_times(text: &str) -> Result<Vec<f64>> {
    let mut out = Vec::new();
    for (line_no, line) in data_lines(text) {
        let val: f64 = line
            .parse()
            .with_context(|| format!("line {} is not f64: {}", line_no, line))?;
        out.push(val);
    }
    Ok(out)
}

/// Read event timestamps from disk.
pub fn read_event_times(path: &Path) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_event_times(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Parse one `start stop` pair per line; whitespace, commas and tabs all separate.
pub fn parse_intervals(text: &str) -> Result<Vec<Interval>> {
    let mut out = Vec::new();
    for (line_no, line) in data_lines(text) {
        let fields: Vec<&str> = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|field| !field.is_empty())
            .collect();
        if fields.len() != 2 {
            anyhow::bail!(
                "line {} must hold a start and a stop, found {} field(s): {}",
                line_no,
                fields.len(),
                line
            );
        }
        let start: f64 = fields[0]
            .parse()
            .with_context(|| format!("line {} start is not f64: {}", line_no, fields[0]))?;
        let stop: f64 = fields[1]
            .parse()
            .with_context(|| format!("line {} stop is not f64: {}", line_no, fields[1]))?;
        out.push(Interval::from((start, stop)));
    }
    Ok(out)
}

/// Read interval pairs from disk.
pub fn read_intervals(path: &Path) -> Result<Vec<Interval>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_intervals(&text).with_context(|| format!("parsing {}", path.display()))
}
