//! Gaussian blur and drop shadow.

use glam::Vec4;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::blend::{blend_into, BlendMode};
use crate::error::{EffectError, Result};
use crate::image::Image;

/// Kernel reach in multiples of sigma.
const KERNEL_SIGMAS: f32 = 3.0;

/// Soft black shadow behind an image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShadowStyle {
    /// Blur sigma in pixels
    pub radius: f32,
    pub opacity: f32,
}

impl Default for ShadowStyle {
    fn default() -> Self {
        Self {
            radius: 30.0,
            opacity: 1.0,
        }
    }
}

/// Filter run over a whole composited frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FrameFilter {
    #[default]
    None,
    Grayscale,
    /// Gaussian blur, sigma in output pixels
    Blur { sigma: f32 },
}

impl FrameFilter {
    /// True when applying the filter would leave every pixel as it is.
    pub fn is_identity(self) -> bool {
        match self {
            Self::None => true,
            Self::Grayscale => false,
            Self::Blur { sigma } => sigma == 0.0,
        }
    }

    pub fn apply(self, image: &Image) -> Result<Image> {
        match self {
            Self::None => Ok(image.clone()),
            Self::Grayscale => Ok(image.grayscale()),
            Self::Blur { sigma } => gaussian_blur(image, sigma),
        }
    }
}

/// Pixels the blur reaches beyond the source on each side.
pub fn blur_margin(sigma: f32) -> u32 {
    if sigma <= 0.0 || !sigma.is_finite() {
        0
    } else {
        (sigma * KERNEL_SIGMAS).ceil() as u32
    }
}

fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let r = blur_margin(sigma) as i32;
    let denom = 2.0 * sigma * sigma;
    let mut weights: Vec<f32> = (-r..=r)
        .map(|i| (-(i * i) as f32 / denom).exp())
        .collect();
    let sum: f32 = weights.iter().sum();
    for w in &mut weights {
        *w /= sum;
    }
    weights
}

/// Gaussian blur with the edges clamp-extended, keeping the original extent.
///
/// Sampling past an edge repeats the edge pixel, so borders neither shrink
/// nor darken. A non-positive sigma returns an unchanged copy.
pub fn gaussian_blur(image: &Image, sigma: f32) -> Result<Image> {
    if !sigma.is_finite() || sigma < 0.0 {
        return Err(EffectError::InvalidParameter(format!(
            "blur sigma must be finite and >= 0, got {sigma}"
        )));
    }
    if sigma == 0.0 || image.width() == 0 || image.height() == 0 {
        return Ok(image.clone());
    }

    let kernel = gaussian_kernel(sigma);
    let tmp = horizontal_pass(image, &kernel);
    Ok(vertical_pass(&tmp, &kernel))
}

fn horizontal_pass(src: &Image, k: &[f32]) -> Image {
    let radius = (k.len() / 2) as i64;
    let w = src.width() as usize;
    let max_x = src.width() as i64 - 1;
    let mut out = Image::new(src.width(), src.height());

    out.pixels_mut()
        .par_chunks_mut(w)
        .enumerate()
        .for_each(|(y, row)| {
            let src_row = &src.pixels()[y * w..(y + 1) * w];
            for (x, dst) in row.iter_mut().enumerate() {
                let mut acc = Vec4::ZERO;
                for (ki, &kw) in k.iter().enumerate() {
                    let sx = (x as i64 + ki as i64 - radius).clamp(0, max_x);
                    acc += src_row[sx as usize] * kw;
                }
                *dst = acc;
            }
        });
    out
}

fn vertical_pass(src: &Image, k: &[f32]) -> Image {
    let radius = (k.len() / 2) as i64;
    let w = src.width() as usize;
    let max_y = src.height() as i64 - 1;
    let mut out = Image::new(src.width(), src.height());

    out.pixels_mut()
        .par_chunks_mut(w)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, dst) in row.iter_mut().enumerate() {
                let mut acc = Vec4::ZERO;
                for (ki, &kw) in k.iter().enumerate() {
                    let sy = (y as i64 + ki as i64 - radius).clamp(0, max_y);
                    acc += src.pixels()[sy as usize * w + x] * kw;
                }
                *dst = acc;
            }
        });
    out
}

/// Image with a blurred black shadow composited underneath.
///
/// The result grows by the blur reach on every side so the shadow is not
/// clipped; the original sits centered on top.
pub fn drop_shadow(image: &Image, style: ShadowStyle) -> Result<Image> {
    let margin = blur_margin(style.radius);
    let w = image.width() + margin * 2;
    let h = image.height() + margin * 2;

    // Transparent padding instead of clamping: the shadow fades out
    let mut padded = Image::new(w, h);
    for y in 0..image.height() {
        for x in 0..image.width() {
            padded.set_pixel(x + margin, y + margin, image.pixel(x, y));
        }
    }

    let mut shadow = blur_transparent_edges(&padded, style.radius)
        .set_alpha(style.opacity)
        .crushed_to_black();
    blend_into(&mut shadow, &padded, BlendMode::SourceOver)?;
    Ok(shadow)
}

/// Blur of an image already padded with transparency. Clamping at the border
/// then only ever repeats transparent pixels.
fn blur_transparent_edges(padded: &Image, sigma: f32) -> Image {
    if sigma <= 0.0 || !sigma.is_finite() {
        return padded.clone();
    }
    let kernel = gaussian_kernel(sigma);
    vertical_pass(&horizontal_pass(padded, &kernel), &kernel)
}
