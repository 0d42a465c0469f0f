//! Floating point working image.
//!
//! Pixels are premultiplied RGBA stored as [`Vec4`] in `[0, 1]`, row-major
//! with row 0 at the top. Frame buffers (straight-alpha RGBA8) convert in and
//! out at the edges of the compositing pipeline.

use cutline_core::{Color, FrameBuffer, Rect, Size};
use glam::Vec4;
use rayon::prelude::*;

use crate::error::{EffectError, Result};

/// A premultiplied RGBA float image.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    width: u32,
    height: u32,
    pixels: Vec<Vec4>,
}

impl Image {
    /// Fully transparent image.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Vec4::ZERO; width as usize * height as usize],
        }
    }

    /// Image of `extent` filled with `color`.
    pub fn solid(color: Color, width: u32, height: u32) -> Self {
        let px = Vec4::from_array(color.premultiply().to_array());
        Self {
            width,
            height,
            pixels: vec![px; width as usize * height as usize],
        }
    }

    /// Convert a straight-alpha RGBA8 frame.
    pub fn from_frame(frame: &FrameBuffer) -> Self {
        let mut pixels = Vec::with_capacity(frame.width as usize * frame.height as usize);
        for y in 0..frame.height {
            pixels.extend(frame.row(y).chunks_exact(4).map(|px| {
                let a = px[3] as f32 / 255.0;
                Vec4::new(
                    px[0] as f32 / 255.0 * a,
                    px[1] as f32 / 255.0 * a,
                    px[2] as f32 / 255.0 * a,
                    a,
                )
            }));
        }
        Self {
            width: frame.width,
            height: frame.height,
            pixels,
        }
    }

    /// Write into a frame of identical dimensions, un-premultiplying.
    pub fn write_into(&self, frame: &mut FrameBuffer) -> Result<()> {
        if (frame.width, frame.height) != (self.width, self.height) {
            return Err(EffectError::DimensionMismatch {
                expected: (self.width, self.height),
                found: (frame.width, frame.height),
            });
        }
        self.fill_rows(frame);
        Ok(())
    }

    /// New RGBA8 frame with this image's content.
    pub fn to_frame(&self) -> FrameBuffer {
        let mut frame = FrameBuffer::new(self.width, self.height);
        self.fill_rows(&mut frame);
        frame
    }

    /// Caller guarantees `frame` has this image's dimensions.
    fn fill_rows(&self, frame: &mut FrameBuffer) {
        let width = self.width as usize;
        for (y, src) in (0..self.height).zip(self.pixels.chunks_exact(width.max(1))) {
            for (dst, px) in frame.row_mut(y).chunks_exact_mut(4).zip(src) {
                dst.copy_from_slice(&to_straight_rgba8(*px));
            }
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn size(&self) -> Size {
        Size::new(self.width as f64, self.height as f64)
    }

    /// Bounds in pixel space.
    pub fn extent(&self) -> Rect {
        Rect::from_size(self.size())
    }

    pub fn pixels(&self) -> &[Vec4] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [Vec4] {
        &mut self.pixels
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Vec4 {
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, px: Vec4) {
        let w = self.width as usize;
        self.pixels[y as usize * w + x as usize] = px;
    }

    /// Pixel at signed coordinates, transparent outside the image.
    #[inline]
    pub(crate) fn pixel_or_clear(&self, x: i64, y: i64) -> Vec4 {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            Vec4::ZERO
        } else {
            self.pixels[y as usize * self.width as usize + x as usize]
        }
    }

    /// Straight-alpha color of one pixel.
    pub fn color_at(&self, x: u32, y: u32) -> Color {
        let [r, g, b, a] = to_straight(self.pixel(x, y)).to_array();
        Color::new(r, g, b, a)
    }

    /// Copy of the region `rect` (pixel aligned, rounded outward).
    ///
    /// Parts of `rect` outside the image come back transparent.
    pub fn crop(&self, rect: Rect) -> Image {
        let x0 = rect.x.floor() as i64;
        let y0 = rect.y.floor() as i64;
        let x1 = (rect.x + rect.width).ceil() as i64;
        let y1 = (rect.y + rect.height).ceil() as i64;
        let w = (x1 - x0).max(0) as u32;
        let h = (y1 - y0).max(0) as u32;

        let mut out = Image::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let px = self.pixel_or_clear(x0 + x as i64, y0 + y as i64);
                out.set_pixel(x, y, px);
            }
        }
        out
    }

    /// Scale alpha uniformly; straight color is preserved.
    pub fn set_alpha(&self, alpha: f32) -> Image {
        let alpha = alpha.clamp(0.0, 1.0);
        self.map_pixels(|px| px * alpha)
    }

    /// Color channels forced to black, alpha kept.
    pub fn crushed_to_black(&self) -> Image {
        self.map_pixels(|px| Vec4::new(0.0, 0.0, 0.0, px.w))
    }

    /// Luminance-only copy (Rec. 709 weights).
    pub fn grayscale(&self) -> Image {
        self.map_pixels(|px| {
            let l = 0.2126 * px.x + 0.7152 * px.y + 0.0722 * px.z;
            Vec4::new(l, l, l, px.w)
        })
    }

    /// Mirror top to bottom.
    pub fn flip_vertical(&self) -> Image {
        let w = self.width as usize;
        let pixels = self
            .pixels
            .chunks_exact(w.max(1))
            .rev()
            .flatten()
            .copied()
            .collect();
        Image {
            width: self.width,
            height: self.height,
            pixels,
        }
    }

    /// Apply `f` to every pixel in parallel.
    pub fn map_pixels(&self, f: impl Fn(Vec4) -> Vec4 + Sync) -> Image {
        Image {
            width: self.width,
            height: self.height,
            pixels: self.pixels.par_iter().map(|px| f(*px)).collect(),
        }
    }

    /// Bilinear sample at continuous pixel coordinates, where pixel `(x, y)`
    /// has its center at `(x + 0.5, y + 0.5)`. Transparent outside.
    pub fn sample_bilinear(&self, x: f64, y: f64) -> Vec4 {
        let fx = x - 0.5;
        let fy = y - 0.5;
        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = (fx - x0) as f32;
        let ty = (fy - y0) as f32;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let top = self
            .pixel_or_clear(x0, y0)
            .lerp(self.pixel_or_clear(x0 + 1, y0), tx);
        let bottom = self
            .pixel_or_clear(x0, y0 + 1)
            .lerp(self.pixel_or_clear(x0 + 1, y0 + 1), tx);
        top.lerp(bottom, ty)
    }

    /// Nearest-neighbour sample, same coordinate convention as
    /// [`sample_bilinear`](Self::sample_bilinear).
    pub fn sample_nearest(&self, x: f64, y: f64) -> Vec4 {
        self.pixel_or_clear(x.floor() as i64, y.floor() as i64)
    }

    pub(crate) fn check_same_size(&self, other: &Image) -> Result<()> {
        if (self.width, self.height) != (other.width, other.height) {
            return Err(EffectError::DimensionMismatch {
                expected: (self.width, self.height),
                found: (other.width, other.height),
            });
        }
        Ok(())
    }
}

#[inline]
pub(crate) fn to_straight(px: Vec4) -> Vec4 {
    if px.w <= 0.0 {
        Vec4::ZERO
    } else {
        (px.truncate() / px.w).extend(px.w)
    }
}

#[inline]
fn to_straight_rgba8(px: Vec4) -> [u8; 4] {
    let [r, g, b, a] = to_straight(px).to_array();
    Color::new(r, g, b, a).to_rgba8()
}
