//! Blend mode definitions and their per-pixel implementations.
//!
//! Every mode is a pure function of a foreground (source) and background
//! (backdrop) pixel. Separable and non-separable blend modes follow the
//! W3C compositing model; `Add`, `Max`, `Min` and `MultiplyCompose` operate
//! directly on premultiplied components.

use glam::{Vec3, Vec4};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::image::{to_straight, Image};

/// Blend mode for compositing a foreground over a background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlendMode {
    // ── Porter-Duff ─────────────────────────────
    #[default]
    SourceOver,
    Add,
    Max,
    Min,
    MultiplyCompose,

    // ── Darken group ────────────────────────────
    Darken,
    MultiplyBlend,
    ColorBurn,
    LinearBurn,

    // ── Lighten group ───────────────────────────
    Lighten,
    Screen,
    ColorDodge,
    LinearDodge,

    // ── Contrast group ──────────────────────────
    Overlay,
    SoftLight,
    HardLight,
    PinLight,

    // ── Inversion group ─────────────────────────
    Difference,
    Exclusion,
    Divide,

    // ── Component group ─────────────────────────
    Hue,
    Saturation,
    Color,
    Luminosity,
}

impl BlendMode {
    /// All blend modes in display order.
    pub const ALL: [BlendMode; 24] = [
        Self::SourceOver,
        Self::Add,
        Self::Max,
        Self::Min,
        Self::MultiplyCompose,
        Self::Darken,
        Self::MultiplyBlend,
        Self::ColorBurn,
        Self::LinearBurn,
        Self::Lighten,
        Self::Screen,
        Self::ColorDodge,
        Self::LinearDodge,
        Self::Overlay,
        Self::SoftLight,
        Self::HardLight,
        Self::PinLight,
        Self::Difference,
        Self::Exclusion,
        Self::Divide,
        Self::Hue,
        Self::Saturation,
        Self::Color,
        Self::Luminosity,
    ];

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Self::SourceOver => "Source Over",
            Self::Add => "Add",
            Self::Max => "Maximum",
            Self::Min => "Minimum",
            Self::MultiplyCompose => "Multiply (Compose)",
            Self::Darken => "Darken",
            Self::MultiplyBlend => "Multiply",
            Self::ColorBurn => "Color Burn",
            Self::LinearBurn => "Linear Burn",
            Self::Lighten => "Lighten",
            Self::Screen => "Screen",
            Self::ColorDodge => "Color Dodge",
            Self::LinearDodge => "Linear Dodge",
            Self::Overlay => "Overlay",
            Self::SoftLight => "Soft Light",
            Self::HardLight => "Hard Light",
            Self::PinLight => "Pin Light",
            Self::Difference => "Difference",
            Self::Exclusion => "Exclusion",
            Self::Divide => "Divide",
            Self::Hue => "Hue",
            Self::Saturation => "Saturation",
            Self::Color => "Color",
            Self::Luminosity => "Luminosity",
        }
    }

    /// True when a transparent foreground leaves the background unchanged.
    ///
    /// `Min` and `MultiplyCompose` clear the background wherever the
    /// foreground is clear, so they must visit every pixel of a canvas.
    pub fn keeps_backdrop(self) -> bool {
        !matches!(self, Self::Min | Self::MultiplyCompose)
    }

    /// Composite one premultiplied foreground pixel over a background pixel.
    pub fn blend_pixel(self, fg: Vec4, bg: Vec4) -> Vec4 {
        match self {
            Self::SourceOver => fg + bg * (1.0 - fg.w),
            Self::Add => (fg + bg).min(Vec4::ONE),
            Self::Max => fg.max(bg),
            Self::Min => fg.min(bg),
            Self::MultiplyCompose => fg * bg,
            _ => self.mix(fg, bg),
        }
    }

    /// General W3C composite with a blend function `B(Cb, Cs)`:
    /// `co = cs(1 - ab) + cb(1 - as) + as*ab*B`.
    fn mix(self, fg: Vec4, bg: Vec4) -> Vec4 {
        let (sa, ba) = (fg.w, bg.w);
        if sa <= 0.0 {
            return bg;
        }
        if ba <= 0.0 {
            return fg;
        }
        let cs = to_straight(fg).truncate();
        let cb = to_straight(bg).truncate();
        let blended = self.blend_color(cb, cs);

        let rgb = fg.truncate() * (1.0 - ba) + bg.truncate() * (1.0 - sa) + blended * (sa * ba);
        let alpha = sa + ba * (1.0 - sa);
        rgb.extend(alpha).clamp(Vec4::ZERO, Vec4::ONE)
    }

    fn blend_color(self, cb: Vec3, cs: Vec3) -> Vec3 {
        match self {
            Self::Hue => set_lum(set_sat(cs, sat(cb)), lum(cb)),
            Self::Saturation => set_lum(set_sat(cb, sat(cs)), lum(cb)),
            Self::Color => set_lum(cs, lum(cb)),
            Self::Luminosity => set_lum(cb, lum(cs)),
            _ => Vec3::new(
                self.blend_channel(cb.x, cs.x),
                self.blend_channel(cb.y, cs.y),
                self.blend_channel(cb.z, cs.z),
            ),
        }
    }

    fn blend_channel(self, cb: f32, cs: f32) -> f32 {
        match self {
            Self::Darken => cb.min(cs),
            Self::MultiplyBlend => cb * cs,
            Self::ColorBurn => {
                if cb >= 1.0 {
                    1.0
                } else if cs <= 0.0 {
                    0.0
                } else {
                    1.0 - ((1.0 - cb) / cs).min(1.0)
                }
            }
            Self::LinearBurn => (cb + cs - 1.0).max(0.0),
            Self::Lighten => cb.max(cs),
            Self::Screen => screen(cb, cs),
            Self::ColorDodge => {
                if cb <= 0.0 {
                    0.0
                } else if cs >= 1.0 {
                    1.0
                } else {
                    (cb / (1.0 - cs)).min(1.0)
                }
            }
            Self::LinearDodge => (cb + cs).min(1.0),
            Self::Overlay => hard_light(cs, cb),
            Self::SoftLight => soft_light(cb, cs),
            Self::HardLight => hard_light(cb, cs),
            Self::PinLight => {
                if cs <= 0.5 {
                    cb.min(2.0 * cs)
                } else {
                    cb.max(2.0 * cs - 1.0)
                }
            }
            Self::Difference => (cb - cs).abs(),
            Self::Exclusion => cb + cs - 2.0 * cb * cs,
            Self::Divide => {
                if cs <= 0.0 {
                    if cb > 0.0 {
                        1.0
                    } else {
                        0.0
                    }
                } else {
                    (cb / cs).min(1.0)
                }
            }
            // Component and Porter-Duff modes never reach the channel path
            _ => cs,
        }
    }
}

#[inline]
fn screen(cb: f32, cs: f32) -> f32 {
    cb + cs - cb * cs
}

#[inline]
fn hard_light(cb: f32, cs: f32) -> f32 {
    if cs <= 0.5 {
        cb * 2.0 * cs
    } else {
        screen(cb, 2.0 * cs - 1.0)
    }
}

fn soft_light(cb: f32, cs: f32) -> f32 {
    if cs <= 0.5 {
        cb - (1.0 - 2.0 * cs) * cb * (1.0 - cb)
    } else {
        let d = if cb <= 0.25 {
            ((16.0 * cb - 12.0) * cb + 4.0) * cb
        } else {
            cb.sqrt()
        };
        cb + (2.0 * cs - 1.0) * (d - cb)
    }
}

#[inline]
fn lum(c: Vec3) -> f32 {
    0.3 * c.x + 0.59 * c.y + 0.11 * c.z
}

fn clip_color(c: Vec3) -> Vec3 {
    let l = lum(c);
    let n = c.min_element();
    let x = c.max_element();
    let mut c = c;
    if n < 0.0 {
        c = Vec3::splat(l) + (c - Vec3::splat(l)) * l / (l - n);
    }
    if x > 1.0 {
        c = Vec3::splat(l) + (c - Vec3::splat(l)) * (1.0 - l) / (x - l);
    }
    c
}

fn set_lum(c: Vec3, l: f32) -> Vec3 {
    clip_color(c + Vec3::splat(l - lum(c)))
}

#[inline]
fn sat(c: Vec3) -> f32 {
    c.max_element() - c.min_element()
}

fn set_sat(c: Vec3, s: f32) -> Vec3 {
    let max = c.max_element();
    let min = c.min_element();
    if max <= min {
        return Vec3::ZERO;
    }
    // Stretch the mid channel proportionally, pin max to s and min to 0
    (c - Vec3::splat(min)) * (s / (max - min))
}

/// Composite `fg` over `bg` into a new image.
pub fn blend(fg: &Image, bg: &Image, mode: BlendMode) -> Result<Image> {
    let mut out = bg.clone();
    blend_into(&mut out, fg, mode)?;
    Ok(out)
}

/// Composite `fg` over `canvas` in place.
pub fn blend_into(canvas: &mut Image, fg: &Image, mode: BlendMode) -> Result<()> {
    canvas.check_same_size(fg)?;
    canvas
        .pixels_mut()
        .par_iter_mut()
        .zip(fg.pixels().par_iter())
        .for_each(|(bg, fg)| *bg = mode.blend_pixel(*fg, *bg));
    Ok(())
}
