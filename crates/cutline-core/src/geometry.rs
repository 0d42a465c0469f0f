//! Geometric primitives for 2D placement.
//!
//! Placement of an image inside an output frame is expressed in a normalized
//! "UV" space: `(0.5, 0.5)` is the frame center and `1.0` spans the full frame
//! dimension, so a placement survives output resolution changes. Pixel space
//! is y-down with the origin at the top-left corner.

use glam::{DAffine2, DMat2, DVec2};
use serde::{Deserialize, Serialize};

/// 2D vector (f64).
pub type Vec2 = DVec2;

/// Width/height pair in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[inline]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero (or negative).
    #[inline]
    pub fn is_empty(self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Center point of a frame of this size.
    #[inline]
    pub fn center(self) -> Vec2 {
        Vec2::new(self.width * 0.5, self.height * 0.5)
    }

    /// Transform that scales `self` uniformly to fit inside `target`,
    /// centered, letterboxing the unused axis.
    pub fn aspect_fit_transform(self, target: Size) -> Transform2D {
        if self.is_empty() {
            return Transform2D::scale(0.0, 0.0);
        }
        let x_scale = target.width / self.width;
        let y_scale = target.height / self.height;
        if x_scale == 1.0 && y_scale == 1.0 {
            return Transform2D::IDENTITY;
        }
        if x_scale < y_scale {
            let offset = (target.height - self.height * x_scale) * 0.5;
            Transform2D::scale(x_scale, x_scale).then(Transform2D::translate(0.0, offset))
        } else {
            let offset = (target.width - self.width * y_scale) * 0.5;
            Transform2D::scale(y_scale, y_scale).then(Transform2D::translate(offset, 0.0))
        }
    }
}

/// Axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Create a new rectangle.
    #[inline]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle at the origin with the given size.
    #[inline]
    pub fn from_size(size: Size) -> Self {
        Self::new(0.0, 0.0, size.width, size.height)
    }

    /// Center point.
    #[inline]
    pub fn center(self) -> Vec2 {
        Vec2::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    #[inline]
    pub fn size(self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Check if a point is inside the rectangle.
    #[inline]
    pub fn contains(self, point: Vec2) -> bool {
        point.x >= self.x
            && point.x < self.x + self.width
            && point.y >= self.y
            && point.y < self.y + self.height
    }

    /// Compute intersection with another rectangle.
    pub fn intersection(self, other: Self) -> Option<Self> {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);

        if x1 < x2 && y1 < y2 {
            Some(Self::new(x1, y1, x2 - x1, y2 - y1))
        } else {
            None
        }
    }

    /// Translation that moves this rectangle's center onto `other`'s center.
    pub fn transform_for_centering_in(self, other: Self) -> Transform2D {
        let offset = other.center() - self.center();
        Transform2D::translate(offset.x, offset.y)
    }
}

/// 2D affine transform with the six coefficients `(a, b, c, d, tx, ty)`.
///
/// A point maps as `x' = a*x + c*y + tx`, `y' = b*x + d*y + ty`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform2D {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Transform2D {
    /// Identity transform.
    pub const IDENTITY: Self = Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

    /// Identity placement in UV space: unit scale, no rotation, centered.
    pub const UV_IDENTITY: Self = Self::new(1.0, 0.0, 0.0, 1.0, 0.5, 0.5);

    #[inline]
    pub const fn new(a: f64, b: f64, c: f64, d: f64, tx: f64, ty: f64) -> Self {
        Self { a, b, c, d, tx, ty }
    }

    /// Create a translation transform.
    #[inline]
    pub fn translate(x: f64, y: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, x, y)
    }

    /// Create a scale transform.
    #[inline]
    pub fn scale(x: f64, y: f64) -> Self {
        Self::new(x, 0.0, 0.0, y, 0.0, 0.0)
    }

    /// Create a rotation transform (radians).
    #[inline]
    pub fn rotate(angle: f64) -> Self {
        Self::from_affine(DAffine2::from_angle(angle))
    }

    /// Compose rotation, then scale, then translation.
    pub fn from_parts(translation: Vec2, scale_x: f64, scale_y: f64, rotation: f64) -> Self {
        Self::rotate(rotation)
            .then(Self::scale(scale_x, scale_y))
            .then(Self::translate(translation.x, translation.y))
    }

    #[inline]
    pub fn from_affine(affine: DAffine2) -> Self {
        let m = affine.matrix2;
        Self::new(
            m.x_axis.x,
            m.x_axis.y,
            m.y_axis.x,
            m.y_axis.y,
            affine.translation.x,
            affine.translation.y,
        )
    }

    #[inline]
    pub fn to_affine(self) -> DAffine2 {
        DAffine2 {
            matrix2: DMat2::from_cols(Vec2::new(self.a, self.b), Vec2::new(self.c, self.d)),
            translation: Vec2::new(self.tx, self.ty),
        }
    }

    /// `self` followed by `other`.
    #[inline]
    pub fn then(self, other: Self) -> Self {
        Self::from_affine(other.to_affine() * self.to_affine())
    }

    /// Translate by `(x, y)` before applying `self`.
    #[inline]
    pub fn translated_by(self, x: f64, y: f64) -> Self {
        Self::translate(x, y).then(self)
    }

    /// Rotate by `angle` before applying `self`.
    #[inline]
    pub fn rotated_by(self, angle: f64) -> Self {
        Self::rotate(angle).then(self)
    }

    /// Scale by `(x, y)` before applying `self`.
    #[inline]
    pub fn scaled_by(self, x: f64, y: f64) -> Self {
        Self::scale(x, y).then(self)
    }

    /// Horizontal scale factor, `sqrt(a² + c²)`.
    #[inline]
    pub fn scale_x(self) -> f64 {
        (self.a * self.a + self.c * self.c).sqrt()
    }

    /// Vertical scale factor, `sqrt(b² + d²)`.
    #[inline]
    pub fn scale_y(self) -> f64 {
        (self.b * self.b + self.d * self.d).sqrt()
    }

    /// Rotation in radians, `atan2(b, a)`.
    #[inline]
    pub fn rotation(self) -> f64 {
        self.b.atan2(self.a)
    }

    #[inline]
    pub fn translation(self) -> Vec2 {
        Vec2::new(self.tx, self.ty)
    }

    #[inline]
    pub fn determinant(self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    /// Transform a point.
    #[inline]
    pub fn transform_point(self, point: Vec2) -> Vec2 {
        Vec2::new(
            self.a * point.x + self.c * point.y + self.tx,
            self.b * point.x + self.d * point.y + self.ty,
        )
    }

    /// Inverse transform, `None` for degenerate (e.g. zero-scale) transforms.
    pub fn inverse(self) -> Option<Self> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        Some(Self::from_affine(self.to_affine().inverse()))
    }

    /// Convert a pixel-space placement (translation in pixels relative to the
    /// frame center) into UV space.
    pub fn to_normalized(self, frame: Size) -> Self {
        Self {
            tx: self.tx / frame.width + 0.5,
            ty: self.ty / frame.height + 0.5,
            ..self
        }
    }

    /// Inverse of [`Transform2D::to_normalized`].
    pub fn to_local(self, frame: Size) -> Self {
        Self {
            tx: frame.width * (self.tx - 0.5),
            ty: frame.height * (self.ty - 0.5),
            ..self
        }
    }

    /// Pixel-space transform for an image already laid out in frame
    /// coordinates, given `self` as a UV placement.
    ///
    /// Scale and rotation pivot on the frame center; the UV origin then
    /// offsets the result from the center.
    pub fn to_pixel_space_from_local(self, frame: Size) -> Self {
        let center = frame.center();
        Self::IDENTITY
            .translated_by(center.x, center.y)
            .translated_by((self.tx - 0.5) * frame.width, (self.ty - 0.5) * frame.height)
            .rotated_by(self.rotation())
            .scaled_by(self.scale_x(), self.scale_y())
            .translated_by(-center.x, -center.y)
    }

    /// Same transform with the translation replaced.
    pub fn setting_origin(self, point: Vec2) -> Self {
        Self {
            tx: point.x,
            ty: point.y,
            ..self
        }
    }

    /// Same translation and rotation with the scale replaced.
    pub fn setting_scale(self, x: f64, y: f64) -> Self {
        Self::from_parts(self.translation(), x, y, self.rotation())
    }

    /// Same translation and scale with the rotation replaced.
    pub fn setting_rotation(self, angle: f64) -> Self {
        Self::from_parts(self.translation(), self.scale_x(), self.scale_y(), angle)
    }

    /// Component-wise comparison within `epsilon`.
    pub fn approx_eq(self, other: Self, epsilon: f64) -> bool {
        (self.a - other.a).abs() <= epsilon
            && (self.b - other.b).abs() <= epsilon
            && (self.c - other.c).abs() <= epsilon
            && (self.d - other.d).abs() <= epsilon
            && (self.tx - other.tx).abs() <= epsilon
            && (self.ty - other.ty).abs() <= epsilon
    }
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}
