//! Frame buffer types for decoded and composed video frames in CPU memory.
//!
//! Frames are 8-bit RGBA with straight (non-premultiplied) alpha. Rows are
//! padded to a 64-byte stride.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Weak};
use tracing::debug;

use crate::error::{CoreError, Result};
use crate::geometry::Size;

const BYTES_PER_PIXEL: usize = 4;

/// An RGBA8 video frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Bytes per row (includes padding)
    pub stride: usize,
    /// Raw pixel data, `stride * height` bytes
    pub data: Vec<u8>,
}

impl FrameBuffer {
    /// Create a zeroed (transparent black) frame.
    pub fn new(width: u32, height: u32) -> Self {
        // Align stride to 64 bytes for SIMD friendliness
        let min_stride = width as usize * BYTES_PER_PIXEL;
        let stride = (min_stride + 63) & !63;
        Self {
            width,
            height,
            stride,
            data: vec![0u8; stride * height as usize],
        }
    }

    /// Build a frame from tightly packed RGBA8 bytes.
    pub fn from_rgba8(width: u32, height: u32, pixels: &[u8]) -> Result<Self> {
        let row_len = width as usize * BYTES_PER_PIXEL;
        if pixels.len() != row_len * height as usize {
            return Err(CoreError::InvalidParameter(format!(
                "expected {} bytes for {}x{} RGBA8, got {}",
                row_len * height as usize,
                width,
                height,
                pixels.len()
            )));
        }
        let mut frame = Self::new(width, height);
        if row_len > 0 {
            for (y, src) in pixels.chunks_exact(row_len).enumerate() {
                frame.row_mut(y as u32).copy_from_slice(src);
            }
        }
        Ok(frame)
    }

    /// A frame filled with one color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let mut frame = Self::new(width, height);
        frame.fill(rgba);
        frame
    }

    /// Create a test pattern frame (color bars).
    pub fn test_pattern(width: u32, height: u32) -> Self {
        const BARS: [[u8; 4]; 8] = [
            [255, 255, 255, 255], // White
            [255, 255, 0, 255],   // Yellow
            [0, 255, 255, 255],   // Cyan
            [0, 255, 0, 255],     // Green
            [255, 0, 255, 255],   // Magenta
            [255, 0, 0, 255],     // Red
            [0, 0, 255, 255],     // Blue
            [0, 0, 0, 255],       // Black
        ];
        let mut frame = Self::new(width, height);
        for y in 0..height {
            let row = frame.row_mut(y);
            for x in 0..width {
                let bar = (x * 8 / width.max(1)) as usize;
                let i = x as usize * BYTES_PER_PIXEL;
                row[i..i + 4].copy_from_slice(&BARS[bar.min(7)]);
            }
        }
        frame
    }

    /// Frame dimensions as a [`Size`].
    #[inline]
    pub fn size(&self) -> Size {
        Size::new(self.width as f64, self.height as f64)
    }

    /// Get a row of pixel data (without padding).
    #[inline]
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.width as usize * BYTES_PER_PIXEL]
    }

    /// Get a mutable row of pixel data (without padding).
    #[inline]
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.stride;
        let end = start + self.width as usize * BYTES_PER_PIXEL;
        &mut self.data[start..end]
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = y as usize * self.stride + x as usize * BYTES_PER_PIXEL;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let i = y as usize * self.stride + x as usize * BYTES_PER_PIXEL;
        self.data[i..i + 4].copy_from_slice(&rgba);
    }

    /// Overwrite every pixel with `rgba`.
    pub fn fill(&mut self, rgba: [u8; 4]) {
        for y in 0..self.height {
            for px in self.row_mut(y).chunks_exact_mut(BYTES_PER_PIXEL) {
                px.copy_from_slice(&rgba);
            }
        }
    }

    /// Copy pixels from a frame of identical dimensions.
    pub fn copy_from(&mut self, other: &FrameBuffer) -> Result<()> {
        if self.width != other.width || self.height != other.height {
            return Err(CoreError::InvalidParameter(format!(
                "cannot copy {}x{} frame into {}x{}",
                other.width, other.height, self.width, self.height
            )));
        }
        for y in 0..self.height {
            self.row_mut(y).copy_from_slice(other.row(y));
        }
        Ok(())
    }

    /// Tightly packed RGBA8 copy of the pixels (no row padding).
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for y in 0..self.height {
            out.extend_from_slice(self.row(y));
        }
        out
    }

    /// Total memory usage of this frame in bytes.
    pub fn memory_size(&self) -> usize {
        self.data.len()
    }
}

/// Arc-wrapped frame buffer for shared ownership.
pub type SharedFrameBuffer = Arc<FrameBuffer>;

/// Key for pooled frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct FrameKey {
    width: u32,
    height: u32,
}

/// Pool counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Buffers created from scratch.
    pub allocated: u64,
    /// Buffers handed out from the free list.
    pub reused: u64,
    /// Buffers currently handed out and not yet returned.
    pub outstanding: usize,
    /// Buffers sitting in the free list.
    pub retained_frames: usize,
    /// Bytes sitting in the free list.
    pub retained_bytes: usize,
}

#[derive(Default)]
struct PoolState {
    free: HashMap<FrameKey, Vec<FrameBuffer>>,
    closed: bool,
    stats: PoolStats,
}

/// Pool of reusable output frame buffers keyed by dimensions.
///
/// A closed pool refuses to hand out buffers; acquisition then yields `None`.
pub struct FramePool {
    state: Mutex<PoolState>,
    /// Maximum bytes retained in the free list.
    max_memory: usize,
}

impl FramePool {
    /// Create a new pool with the given retention budget.
    pub fn new(max_memory: usize) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(PoolState::default()),
            max_memory,
        })
    }

    /// Acquire a buffer from the pool or allocate a new one.
    ///
    /// Recycled buffers keep their previous contents; callers overwrite them.
    pub fn acquire(self: &Arc<Self>, width: u32, height: u32) -> Option<PooledFrame> {
        let key = FrameKey { width, height };
        let mut state = self.state.lock();
        if state.closed {
            return None;
        }

        let recycled = state.free.get_mut(&key).and_then(Vec::pop);
        let buffer = match recycled {
            Some(buffer) => {
                state.stats.reused += 1;
                state.stats.retained_frames -= 1;
                state.stats.retained_bytes -= buffer.memory_size();
                buffer
            }
            None => {
                state.stats.allocated += 1;
                FrameBuffer::new(width, height)
            }
        };
        state.stats.outstanding += 1;

        Some(PooledFrame {
            buffer: Some(buffer),
            pool: Arc::downgrade(self),
        })
    }

    /// Return a buffer to the pool for reuse.
    fn release(&self, buffer: FrameBuffer) {
        let mut state = self.state.lock();
        state.stats.outstanding = state.stats.outstanding.saturating_sub(1);

        let mem = buffer.memory_size();
        // Over budget or closed: let the buffer drop
        if state.closed || state.stats.retained_bytes + mem > self.max_memory {
            return;
        }

        let key = FrameKey {
            width: buffer.width,
            height: buffer.height,
        };
        state.stats.retained_frames += 1;
        state.stats.retained_bytes += mem;
        state.free.entry(key).or_default().push(buffer);
    }

    fn forget(&self) {
        let mut state = self.state.lock();
        state.stats.outstanding = state.stats.outstanding.saturating_sub(1);
    }

    /// Stop handing out buffers and drop the free list.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.free.clear();
        state.stats.retained_frames = 0;
        state.stats.retained_bytes = 0;
        debug!(outstanding = state.stats.outstanding, "frame pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn stats(&self) -> PoolStats {
        self.state.lock().stats
    }
}

impl std::fmt::Debug for FramePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("FramePool")
            .field("max_memory", &self.max_memory)
            .field("closed", &state.closed)
            .field("stats", &state.stats)
            .finish()
    }
}

/// A frame buffer on loan from a [`FramePool`]; returns itself on drop.
pub struct PooledFrame {
    buffer: Option<FrameBuffer>,
    pool: Weak<FramePool>,
}

impl PooledFrame {
    /// Detach the buffer from its pool.
    pub fn into_inner(mut self) -> FrameBuffer {
        let buffer = self.buffer.take().unwrap_or_else(|| FrameBuffer::new(0, 0));
        if let Some(pool) = self.pool.upgrade() {
            pool.forget();
        }
        buffer
    }
}

impl Deref for PooledFrame {
    type Target = FrameBuffer;

    fn deref(&self) -> &FrameBuffer {
        // Only `into_inner` and `drop` take the buffer, both consume `self`
        self.buffer.as_ref().unwrap_or(&EMPTY_FRAME)
    }
}

impl DerefMut for PooledFrame {
    fn deref_mut(&mut self) -> &mut FrameBuffer {
        self.buffer.get_or_insert_with(|| FrameBuffer::new(0, 0))
    }
}

impl Drop for PooledFrame {
    fn drop(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            match self.pool.upgrade() {
                Some(pool) => pool.release(buffer),
                None => drop(buffer),
            }
        }
    }
}

impl std::fmt::Debug for PooledFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

static EMPTY_FRAME: FrameBuffer = FrameBuffer {
    width: 0,
    height: 0,
    stride: 0,
    data: Vec::new(),
};
