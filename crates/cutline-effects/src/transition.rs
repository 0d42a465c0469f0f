//! Animated styling of the incoming image during a transition.

use cutline_core::{EasingCurve, Transform2D};
use serde::{Deserialize, Serialize};

use crate::blend::BlendMode;
use crate::error::Result;
use crate::filter::gaussian_blur;
use crate::image::Image;

/// How the incoming track animates in.
///
/// Progress runs through `easing` first; the eased value then drives every
/// parameter, so they all change monotonically with time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionStyle {
    pub easing: EasingCurve,
    /// Blend mode used to lay the incoming image over the outgoing one
    pub blend_mode: BlendMode,
    /// Rotation at the start of the transition, in radians
    pub max_rotation: f64,
    /// Blur sigma at the start of the transition, in pixels
    pub max_blur_sigma: f32,
    /// Grow from zero to full size
    pub zoom: bool,
    /// Fade alpha from zero to one
    pub fade: bool,
}

impl Default for TransitionStyle {
    fn default() -> Self {
        Self {
            easing: EasingCurve::Smoothstep,
            blend_mode: BlendMode::SourceOver,
            max_rotation: std::f64::consts::FRAC_PI_4,
            max_blur_sigma: 30.0,
            zoom: true,
            fade: true,
        }
    }
}

/// Concrete parameters at one instant of a transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionParams {
    /// Eased progress in `[0, 1]`
    pub eased: f64,
    pub scale: f64,
    pub rotation: f64,
    pub alpha: f32,
    pub blur_sigma: f32,
}

impl TransitionStyle {
    /// Parameters for raw `progress` (clamped to `[0, 1]`).
    pub fn params_at(&self, progress: f64) -> TransitionParams {
        let eased = self.easing.apply(progress);
        let remaining = 1.0 - eased;
        TransitionParams {
            eased,
            scale: if self.zoom { eased } else { 1.0 },
            rotation: self.max_rotation * remaining,
            alpha: if self.fade { eased as f32 } else { 1.0 },
            blur_sigma: self.max_blur_sigma.max(0.0) * remaining as f32,
        }
    }
}

impl TransitionParams {
    /// UV placement of the incoming image.
    pub fn placement(&self) -> Transform2D {
        Transform2D::UV_IDENTITY
            .setting_scale(self.scale, self.scale)
            .setting_rotation(self.rotation)
    }

    /// Apply blur and alpha to the incoming image (before placement).
    pub fn style_image(&self, image: &Image) -> Result<Image> {
        let blurred = if self.blur_sigma > 0.0 {
            gaussian_blur(image, self.blur_sigma)?
        } else {
            image.clone()
        };
        Ok(if self.alpha < 1.0 {
            blurred.set_alpha(self.alpha)
        } else {
            blurred
        })
    }
}
