//! Error types for image operations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EffectError {
    #[error("image size mismatch: expected {expected:?}, got {found:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        found: (u32, u32),
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type alias for effect operations.
pub type Result<T> = std::result::Result<T, EffectError>;
