//! Error types for the rasterization and binning engine.

use thiserror::Error;

/// Errors raised at the entry of an engine operation.
///
/// Statistical degeneracies (a single subject, an empty bin in the ratio
/// variant) are not errors; they surface as NaN or zero in the output.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error(
        "malformed interval #{index}: [{start}, {stop}) is not within [0, {window_length}] with start <= stop"
    )]
    MalformedInterval {
        index: usize,
        start: f64,
        stop: f64,
        window_length: usize,
    },

    #[error("malformed event timestamp #{index}: {value}")]
    MalformedEvent { index: usize, value: f64 },

    #[error("window length must be at least one second")]
    InvalidWindow,

    #[error("bin width {bin_width} is invalid for {cells} cells")]
    InvalidBinWidth { bin_width: usize, cells: usize },

    #[error("row {row} has {found} columns, expected {expected}")]
    RaggedMatrix {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("subject '{subject}' has {found} trials, expected {expected}")]
    MissingTrials {
        subject: String,
        expected: usize,
        found: usize,
    },
}

pub type Result<T> = std::result::Result<T, EngineError>;
