//! Error types for the core crate.

use thiserror::Error;

use crate::time::RationalTime;

/// Errors raised by core value types.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Rescaling a time value to a coarser timescale lost more than allowed.
    #[error("cannot represent {value} on timescale {timescale} (off by {error})")]
    Precision {
        value: RationalTime,
        timescale: i64,
        error: RationalTime,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
