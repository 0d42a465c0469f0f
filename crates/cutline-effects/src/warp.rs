//! Affine placement of an image onto a canvas.

use cutline_core::{Rect, Size, Transform2D, Vec2};
use glam::Vec4;
use rayon::prelude::*;
use tracing::trace;

use crate::blend::BlendMode;
use crate::image::Image;

/// Resampling filter used when warping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sampling {
    Nearest,
    #[default]
    Bilinear,
}

impl Sampling {
    /// Bilinear for high quality rendering, nearest otherwise.
    pub fn for_quality(high_quality: bool) -> Self {
        if high_quality {
            Self::Bilinear
        } else {
            Self::Nearest
        }
    }
}

/// Pixel-space transform that aspect-fits `source` into `frame` and then
/// applies the UV `placement` about the frame center.
pub fn fitted_transform(source: Size, frame: Size, placement: Transform2D) -> Transform2D {
    source
        .aspect_fit_transform(frame)
        .then(placement.to_pixel_space_from_local(frame))
}

/// Bounding box of `rect` after `transform`.
fn transformed_bounds(rect: Rect, transform: Transform2D) -> Rect {
    let corners = [
        Vec2::new(rect.x, rect.y),
        Vec2::new(rect.x + rect.width, rect.y),
        Vec2::new(rect.x, rect.y + rect.height),
        Vec2::new(rect.x + rect.width, rect.y + rect.height),
    ]
    .map(|p| transform.transform_point(p));

    let min = corners.iter().fold(Vec2::splat(f64::INFINITY), |a, p| a.min(*p));
    let max = corners.iter().fold(Vec2::splat(f64::NEG_INFINITY), |a, p| a.max(*p));
    Rect::new(min.x, min.y, max.x - min.x, max.y - min.y)
}

/// Draw `image` transformed by `transform` onto `canvas` with `mode`.
///
/// Modes that keep the backdrop under a clear foreground only touch canvas
/// pixels inside the transformed bounds; the others blend a transparent
/// foreground over the rest of the canvas. A degenerate transform (zero
/// scale) places no image pixels.
pub fn draw_transformed(
    canvas: &mut Image,
    image: &Image,
    transform: Transform2D,
    mode: BlendMode,
    sampling: Sampling,
) {
    let inverse = transform.inverse();
    if inverse.is_none() {
        trace!("degenerate transform, no image pixels placed");
    }
    let width = canvas.width() as usize;
    let height = canvas.height() as usize;

    let (x0, x1, y0, y1) = if mode.keeps_backdrop() {
        let Some(inverse) = inverse else {
            return;
        };
        let bounds = transformed_bounds(image.extent(), transform);
        let Some(area) = bounds.intersection(canvas.extent()) else {
            return;
        };
        (
            area.x.floor().max(0.0) as usize,
            ((area.x + area.width).ceil() as usize).min(width),
            area.y.floor().max(0.0) as usize,
            ((area.y + area.height).ceil() as usize).min(height),
        )
    } else {
        (0, width, 0, height)
    };

    canvas
        .pixels_mut()
        .par_chunks_mut(width.max(1))
        .enumerate()
        .skip(y0)
        .take(y1.saturating_sub(y0))
        .for_each(|(y, row)| {
            for (x, dst) in row.iter_mut().enumerate().take(x1).skip(x0) {
                let src = match inverse {
                    Some(inverse) => {
                        let p = inverse.transform_point(Vec2::new(x as f64 + 0.5, y as f64 + 0.5));
                        match sampling {
                            Sampling::Bilinear => image.sample_bilinear(p.x, p.y),
                            Sampling::Nearest => image.sample_nearest(p.x, p.y),
                        }
                    }
                    None => Vec4::ZERO,
                };
                *dst = mode.blend_pixel(src, *dst);
            }
        });
}

/// `image` warped onto a transparent canvas of `size`.
pub fn transformed(image: &Image, transform: Transform2D, size: Size, sampling: Sampling) -> Image {
    let mut canvas = Image::new(size.width.max(0.0) as u32, size.height.max(0.0) as u32);
    draw_transformed(&mut canvas, image, transform, BlendMode::SourceOver, sampling);
    canvas
}

/// Aspect-fit `image` into `canvas`, apply the UV `placement`, and blend it.
pub fn draw_fitted(
    canvas: &mut Image,
    image: &Image,
    placement: Transform2D,
    mode: BlendMode,
    sampling: Sampling,
) {
    let transform = fitted_transform(image.size(), canvas.size(), placement);
    draw_transformed(canvas, image, transform, mode, sampling);
}

/// True when every pixel of `image` is transparent.
pub fn is_clear(image: &Image) -> bool {
    image.pixels().iter().all(|p| *p == Vec4::ZERO)
}
