//! Cutline Effects - CPU image compositing
//!
//! Provides the blend mode library, gaussian blur and drop shadow,
//! affine placement onto a canvas, and transition styling. All operations
//! work on premultiplied float [`Image`]s and are parallelised with rayon.

pub mod blend;
pub mod error;
pub mod filter;
pub mod image;
pub mod transition;
pub mod warp;

pub use blend::{blend, blend_into, BlendMode};
pub use error::{EffectError, Result};
pub use filter::{drop_shadow, gaussian_blur, FrameFilter, ShadowStyle};
pub use image::Image;
pub use transition::{TransitionParams, TransitionStyle};
pub use warp::{draw_fitted, draw_transformed, fitted_transform, transformed, Sampling};
