//! Interval rasterization and binned aggregation for behavioral recordings.
//!
//! Event intervals are rasterized into per-second occupancy vectors, stacked
//! per subject, summed into fixed-width bins and summarized across subjects
//! (mean, standard error). A ratio variant bins instantaneous event
//! timestamps into per-bin category fractions.

pub mod error;
pub mod io;
pub mod metrics;
pub mod plot;
pub mod raster;
pub mod signal;

pub use error::{EngineError, Result};
pub use metrics::*;
pub use raster::*;
pub use signal::*;
