//! Per-request render errors.
//!
//! None of these are fatal to a session; the worker that hit one moves on to
//! the next request.

use cutline_effects::EffectError;
use cutline_timeline::TrackId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// No output buffer could be allocated: the session has no render
    /// context or its frame pool was torn down.
    #[error("no output pixel buffer available")]
    MissingPixelBuffer,

    /// A listed track had no frame. The compositor treats the track as
    /// absent, so this only shows up in diagnostics.
    #[error("no source frame for track {0}")]
    MissingSourceFrame(TrackId),

    #[error("effect failed: {0}")]
    Effect(#[from] EffectError),

    #[error("render session is shut down")]
    SessionClosed,

    #[error("failed to start render thread: {0}")]
    ThreadSpawn(String),

    /// Compositing panicked; the worker survives and reports this instead.
    #[error("render worker panicked: {0}")]
    WorkerPanicked(String),
}

/// Result type alias for render operations.
pub type Result<T> = std::result::Result<T, RenderError>;
