//! Cutline Render - Frame compositing and concurrent rendering
//!
//! - [`FrameCompositor`]: turns a render request into one output frame
//! - [`RenderSession`]: worker pool with cooperative cancellation and
//!   in-order result delivery
//! - [`RenderContext`]: output size, quality and the output frame pool

pub mod compositor;
pub mod context;
pub mod error;
pub mod request;
pub mod session;

pub use compositor::{CompositorConfig, FrameCompositor, Watermark};
pub use context::RenderContext;
pub use error::{RenderError, Result};
pub use request::{OutputFrame, RenderOutcome, RenderRequest, RequestHandle, RequestState};
pub use session::{Admission, RenderGate, RenderResult, RenderSession, SessionConfig};
