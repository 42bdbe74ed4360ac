//! Error types for the risk pipeline.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Fewer than 3 distinct usable epochs, or a degenerate regression system.
    #[error("insufficient data for trend fit: {usable} usable epochs (need {required})")]
    InsufficientData { usable: usize, required: usize },

    #[error("no sea-level trend resolvable at ({lat:.4}, {lon:.4})")]
    MissingRegionTrend { lat: f64, lon: f64 },

    #[error("grid mismatch: {0}")]
    GridMismatch(String),

    #[error("no measurement points available for interpolation")]
    EmptyPointSet,

    #[error("invalid epochs: {0}")]
    InvalidEpochs(String),

    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
