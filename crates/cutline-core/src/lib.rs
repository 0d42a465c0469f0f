//! Cutline Core - Foundation types for the timeline engine
//!
//! This crate provides the fundamental types used throughout cutline:
//! - Time representation (RationalTime, FrameRate, TimeRange)
//! - Affine transforms, sizes and rectangles
//! - Colors and easing curves
//! - RGBA frame buffers and a reusable frame pool

pub mod color;
pub mod easing;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod time;

pub use color::Color;
pub use easing::{CubicBezier, EasingCurve};
pub use error::{CoreError, Result};
pub use frame::{FrameBuffer, FramePool, PoolStats, PooledFrame, SharedFrameBuffer};
pub use geometry::{Rect, Size, Transform2D, Vec2};
pub use time::{FrameRate, RationalTime, TimeRange};

/// Memory budget constants for output frame pools
pub mod memory_budget {
    /// Default bytes retained by a render session's frame pool
    pub const OUTPUT_POOL_SIZE: usize = 256 * 1024 * 1024; // 256 MB

    /// Default number of queued render requests per worker
    pub const QUEUE_DEPTH_PER_WORKER: usize = 4;
}
