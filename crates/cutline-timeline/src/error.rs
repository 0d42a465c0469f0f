//! Build-time validation errors.

use cutline_core::{CoreError, RationalTime, TimeRange};
use thiserror::Error;

use crate::track::{MediaKind, TrackId};

/// Errors raised while building or editing a timeline.
///
/// A failed build call leaves the timeline untouched.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("source range {range} exceeds asset track range {available}")]
    OutOfRange {
        range: TimeRange,
        available: TimeRange,
    },

    #[error("track {0} already exists")]
    DuplicateTrack(TrackId),

    #[error("no track with id {0}")]
    UnknownTrack(TrackId),

    #[error("track {track} holds {expected:?} media, got {found:?}")]
    MediaKindMismatch {
        track: TrackId,
        expected: MediaKind,
        found: MediaKind,
    },

    #[error("cannot place {value} on timescale {timescale}: {source}")]
    InvalidTimescale {
        value: RationalTime,
        timescale: i64,
        #[source]
        source: CoreError,
    },

    #[error("overlap must not be negative, got {0}")]
    NegativeOverlap(RationalTime),

    #[error("duration must not be negative, got {0}")]
    NegativeDuration(RationalTime),

    #[error("speed factor must be positive and finite, got {0}")]
    InvalidSpeed(f64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for timeline operations.
pub type Result<T> = std::result::Result<T, ValidationError>;
