//! Time representation for frame-accurate editing
//!
//! Uses rational numbers to avoid floating-point accumulation errors.
//! All time values are represented as numerator/denominator pairs; a
//! "timescale" is the denominator a value is expressed in when it has to be
//! quantised (e.g. 600 ticks per second for a composition).

use num_rational::Rational64;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::error::{CoreError, Result};

/// Exact time in seconds, or a duration, depending on context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RationalTime {
    value: Rational64,
}

impl RationalTime {
    /// `numerator / denominator` seconds, reduced.
    ///
    /// # Panics
    ///
    /// Panics if `denominator` is zero. Use [`try_new`](Self::try_new) for
    /// untrusted input.
    #[inline]
    pub fn new(numerator: i64, denominator: i64) -> Self {
        Self {
            value: Rational64::new(numerator, denominator),
        }
    }

    /// Checked constructor; rejects a zero denominator.
    pub fn try_new(numerator: i64, denominator: i64) -> Result<Self> {
        if denominator == 0 {
            return Err(CoreError::InvalidParameter(format!(
                "time {numerator}/0 has a zero denominator"
            )));
        }
        Ok(Self::new(numerator, denominator))
    }

    /// Whole seconds.
    #[inline]
    pub fn seconds(seconds: i64) -> Self {
        Self::new(seconds, 1)
    }

    /// Start time of frame `frames` at `rate`.
    ///
    /// # Panics
    ///
    /// Panics on a zero frame rate; see [`try_from_frames`](Self::try_from_frames).
    #[inline]
    pub fn from_frames(frames: i64, rate: FrameRate) -> Self {
        Self {
            value: Rational64::new(frames * rate.denominator as i64, rate.numerator as i64),
        }
    }

    /// Checked [`from_frames`](Self::from_frames); rejects a rate with a
    /// zero numerator or denominator.
    pub fn try_from_frames(frames: i64, rate: FrameRate) -> Result<Self> {
        if !rate.is_valid() {
            return Err(CoreError::InvalidParameter(format!(
                "frame rate {}/{} is not positive",
                rate.numerator, rate.denominator
            )));
        }
        Ok(Self::from_frames(frames, rate))
    }

    #[inline]
    pub fn to_seconds_f64(self) -> f64 {
        *self.value.numer() as f64 / *self.value.denom() as f64
    }

    /// Index of the frame containing this time at `rate`.
    #[inline]
    pub fn to_frames(self, rate: FrameRate) -> i64 {
        (self.value * Rational64::new(rate.numerator as i64, rate.denominator as i64))
            .floor()
            .to_integer()
    }

    /// Reduced numerator.
    #[inline]
    pub fn numer(self) -> i64 {
        *self.value.numer()
    }

    /// Reduced denominator.
    #[inline]
    pub fn denom(self) -> i64 {
        *self.value.denom()
    }

    pub const ZERO: Self = Self {
        value: Rational64::new_raw(0, 1),
    };

    #[inline]
    pub fn is_zero(self) -> bool {
        *self.value.numer() == 0
    }

    /// True for strictly negative values.
    #[inline]
    pub fn is_negative(self) -> bool {
        *self.value.numer() < 0
    }

    /// Magnitude, for comparing rounding errors.
    #[inline]
    pub fn abs(self) -> Self {
        if self.is_negative() {
            -self
        } else {
            self
        }
    }

    /// Number of `timescale` ticks in this value, if it is exactly representable.
    pub fn ticks(self, timescale: i64) -> Option<i64> {
        let scaled = self.value * Rational64::from_integer(timescale);
        scaled.is_integer().then(|| scaled.to_integer())
    }

    /// Re-express this value on `timescale`, rounding to the nearest tick.
    ///
    /// Fails with [`CoreError::Precision`] when the rounding error exceeds
    /// `epsilon`. An `epsilon` of zero only accepts lossless rescales.
    pub fn rescaled(self, timescale: i64, epsilon: RationalTime) -> Result<Self> {
        if timescale <= 0 {
            return Err(CoreError::InvalidParameter(format!(
                "timescale must be positive, got {timescale}"
            )));
        }
        let scaled = self.value * Rational64::from_integer(timescale);
        let ticks = scaled.round().to_integer();
        let rescaled = Self::new(ticks, timescale);
        let error = (rescaled - self).abs();
        if error > epsilon {
            return Err(CoreError::Precision {
                value: self,
                timescale,
                error,
            });
        }
        Ok(rescaled)
    }

    /// Multiply by a floating point factor, quantised to `timescale`.
    ///
    /// Used for speed changes where the factor comes from user input.
    pub fn scaled_by(self, factor: f64, timescale: i64) -> Self {
        let ticks = (self.to_seconds_f64() * factor * timescale as f64).round() as i64;
        Self::new(ticks, timescale.max(1))
    }
}

impl Default for RationalTime {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Add for RationalTime {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            value: self.value + rhs.value,
        }
    }
}

impl Sub for RationalTime {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            value: self.value - rhs.value,
        }
    }
}

impl Neg for RationalTime {
    type Output = Self;
    fn neg(self) -> Self {
        Self { value: -self.value }
    }
}

impl Mul<i64> for RationalTime {
    type Output = Self;
    fn mul(self, rhs: i64) -> Self {
        Self {
            value: self.value * rhs,
        }
    }
}

impl Div<i64> for RationalTime {
    type Output = Self;
    fn div(self, rhs: i64) -> Self {
        Self {
            value: self.value / rhs,
        }
    }
}

impl fmt::Display for RationalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.to_seconds_f64())
    }
}

/// Frame rate as a rational number (e.g., 24000/1001 for 23.976 fps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRate {
    /// Numerator (e.g., 24000)
    pub numerator: u32,
    /// Denominator (e.g., 1001)
    pub denominator: u32,
}

impl FrameRate {
    /// Create a new frame rate.
    #[inline]
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Both terms non-zero.
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.numerator > 0 && self.denominator > 0
    }

    /// Convert to frames per second as f64.
    #[inline]
    pub fn to_fps_f64(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    /// Common frame rates
    pub const FPS_23_976: Self = Self::new(24000, 1001);
    pub const FPS_24: Self = Self::new(24, 1);
    pub const FPS_25: Self = Self::new(25, 1);
    pub const FPS_29_97: Self = Self::new(30000, 1001);
    pub const FPS_30: Self = Self::new(30, 1);
    pub const FPS_60: Self = Self::new(60, 1);
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::FPS_30
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fps = self.to_fps_f64();
        if (fps - fps.round()).abs() < 0.001 {
            write!(f, "{} fps", fps.round() as u32)
        } else {
            write!(f, "{:.3} fps", fps)
        }
    }
}

/// A time range with inclusive start and exclusive end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start time (inclusive)
    pub start: RationalTime,
    /// Duration of the range, never negative
    pub duration: RationalTime,
}

impl TimeRange {
    /// Create a new time range from start and duration.
    #[inline]
    pub fn new(start: RationalTime, duration: RationalTime) -> Self {
        debug_assert!(!duration.is_negative(), "negative range duration {duration}");
        Self { start, duration }
    }

    /// Checked constructor; rejects negative durations.
    pub fn try_new(start: RationalTime, duration: RationalTime) -> Result<Self> {
        if duration.is_negative() {
            return Err(CoreError::InvalidParameter(format!(
                "time range duration must be >= 0, got {duration}"
            )));
        }
        Ok(Self { start, duration })
    }

    /// Create a time range from start and end times.
    #[inline]
    pub fn from_start_end(start: RationalTime, end: RationalTime) -> Self {
        Self::new(start, end - start)
    }

    /// End time (exclusive).
    #[inline]
    pub fn end(self) -> RationalTime {
        self.start + self.duration
    }

    /// True when the range covers no time at all.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.duration.is_zero()
    }

    /// Check if a time is within this range.
    #[inline]
    pub fn contains(self, time: RationalTime) -> bool {
        time >= self.start && time < self.end()
    }

    /// True when `other` lies completely inside this range.
    pub fn contains_range(self, other: Self) -> bool {
        other.start >= self.start && other.end() <= self.end()
    }

    /// Check if two ranges overlap.
    pub fn overlaps(self, other: Self) -> bool {
        self.start < other.end() && other.start < self.end()
    }

    /// Compute the intersection of two ranges, if any.
    pub fn intersection(self, other: Self) -> Option<Self> {
        if !self.overlaps(other) {
            return None;
        }
        let start = self.start.max(other.start);
        let end = self.end().min(other.end());
        Some(Self::from_start_end(start, end))
    }

    /// Position of `time` inside the range as a fraction (0 at start, 1 at end).
    ///
    /// Not clamped. Empty ranges report 1.0 for any time at or past the start.
    pub fn fraction_of(self, time: RationalTime) -> f64 {
        if self.duration.is_zero() {
            return if time >= self.start { 1.0 } else { 0.0 };
        }
        (time - self.start).to_seconds_f64() / self.duration.to_seconds_f64()
    }

    /// Same range moved by `offset`.
    #[inline]
    pub fn shifted(self, offset: RationalTime) -> Self {
        Self::new(self.start + offset, self.duration)
    }

    /// Empty range starting at zero.
    pub const EMPTY: Self = Self {
        start: RationalTime::ZERO,
        duration: RationalTime::ZERO,
    };
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end())
    }
}
