//! Render context: output size, quality and the output frame pool.

use cutline_core::{memory_budget, FramePool, PooledFrame, Size};
use cutline_effects::Sampling;
use std::sync::Arc;

/// Output settings shared by every request rendered under them.
///
/// Swapped as a whole by [`RenderSession::reconfigure`](crate::RenderSession::reconfigure);
/// requests never see a partially updated context.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub width: u32,
    pub height: u32,
    /// Bilinear resampling when set, nearest-neighbour otherwise
    pub high_quality: bool,
    pool: Arc<FramePool>,
}

impl RenderContext {
    /// Context with its own output pool.
    pub fn new(width: u32, height: u32, high_quality: bool) -> Self {
        Self::with_pool(
            width,
            height,
            high_quality,
            FramePool::new(memory_budget::OUTPUT_POOL_SIZE),
        )
    }

    pub fn with_pool(width: u32, height: u32, high_quality: bool, pool: Arc<FramePool>) -> Self {
        Self {
            width,
            height,
            high_quality,
            pool,
        }
    }

    #[inline]
    pub fn size(&self) -> Size {
        Size::new(self.width as f64, self.height as f64)
    }

    pub fn sampling(&self) -> Sampling {
        Sampling::for_quality(self.high_quality)
    }

    pub fn pool(&self) -> &Arc<FramePool> {
        &self.pool
    }

    /// Output buffer of the context size, `None` once torn down.
    pub fn new_output_frame(&self) -> Option<PooledFrame> {
        self.pool.acquire(self.width, self.height)
    }

    /// Release the pool; later allocations fail.
    pub fn tear_down(&self) {
        self.pool.close();
    }

    pub fn is_torn_down(&self) -> bool {
        self.pool.is_closed()
    }
}
