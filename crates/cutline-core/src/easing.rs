//! Easing curves for transition progress.
//!
//! All curves map `[0, 1]` onto `[0, 1]`, are monotonic and pin the endpoints.

use serde::{Deserialize, Serialize};

/// Cubic Bézier control points `(x1, y1, x2, y2)` for a curve from (0,0) to (1,1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CubicBezier {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl CubicBezier {
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    fn bezier(t: f64, p1: f64, p2: f64) -> f64 {
        let mt = 1.0 - t;
        3.0 * mt * mt * t * p1 + 3.0 * mt * t * t * p2 + t * t * t
    }

    fn bezier_dt(t: f64, p1: f64, p2: f64) -> f64 {
        let mt = 1.0 - t;
        3.0 * mt * mt * p1 + 6.0 * mt * t * (p2 - p1) + 3.0 * t * t * (1.0 - p2)
    }

    /// Solve the curve for `x` (Newton-Raphson on the x polynomial) and return y.
    pub fn evaluate(&self, x: f64) -> f64 {
        if x <= 0.0 {
            return 0.0;
        }
        if x >= 1.0 {
            return 1.0;
        }

        let mut t = x;
        for _ in 0..8 {
            let err = Self::bezier(t, self.x1, self.x2) - x;
            if err.abs() < 1e-10 {
                break;
            }
            let slope = Self::bezier_dt(t, self.x1, self.x2);
            if slope.abs() < 1e-12 {
                break;
            }
            t = (t - err / slope).clamp(0.0, 1.0);
        }
        Self::bezier(t, self.y1, self.y2)
    }

    pub const EASE_IN_OUT: Self = Self::new(0.42, 0.0, 0.58, 1.0);
}

/// How normalized progress is shaped before it drives an animation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum EasingCurve {
    Linear,
    /// Hermite smoothstep, `3t² - 2t³`.
    #[default]
    Smoothstep,
    Bezier(CubicBezier),
}

impl EasingCurve {
    /// Clamp `t` to `[0, 1]` and apply the curve.
    pub fn apply(self, t: f64) -> f64 {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match self {
            Self::Linear => t,
            Self::Smoothstep => t * t * (3.0 - 2.0 * t),
            Self::Bezier(curve) => curve.evaluate(t),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_are_pinned() {
        for curve in [
            EasingCurve::Linear,
            EasingCurve::Smoothstep,
            EasingCurve::Bezier(CubicBezier::EASE_IN_OUT),
        ] {
            assert_eq!(curve.apply(0.0), 0.0);
            assert_eq!(curve.apply(1.0), 1.0);
            assert_eq!(curve.apply(-3.0), 0.0);
            assert_eq!(curve.apply(7.0), 1.0);
        }
    }

    #[test]
    fn test_smoothstep_is_monotonic() {
        let mut prev = 0.0;
        for i in 1..=100 {
            let y = EasingCurve::Smoothstep.apply(i as f64 / 100.0);
            assert!(y >= prev);
            prev = y;
        }
        assert_eq!(EasingCurve::Smoothstep.apply(0.5), 0.5);
    }

    #[test]
    fn test_bezier_ease_in_out_starts_slow() {
        let early = EasingCurve::Bezier(CubicBezier::EASE_IN_OUT).apply(0.1);
        assert!(early < 0.1);
    }

    #[test]
    fn test_nan_progress_is_zero() {
        assert_eq!(EasingCurve::Linear.apply(f64::NAN), 0.0);
    }
}
