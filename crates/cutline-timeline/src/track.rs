//! Tracks and the segments placed on them.

use cutline_core::{RationalTime, TimeRange};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::asset::AssetTrack;

/// Kind of media a track carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    Video,
    Audio,
}

/// Track identifier, unique within a composition.
///
/// Identifiers are handed out in creation order, so a lower id means an
/// older track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackId(pub u32);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A slice of a source track placed on a destination track.
///
/// The destination duration differs from the source duration only after a
/// time scale (speed change).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Source media track
    pub source: AssetTrack,
    /// Range read from the source
    pub source_range: TimeRange,
    /// Where the slice sits on the destination timeline
    pub destination: TimeRange,
}

impl Segment {
    /// Unscaled segment starting at `at`.
    pub fn new(source: AssetTrack, source_range: TimeRange, at: RationalTime) -> Self {
        Self {
            source,
            destination: TimeRange::new(at, source_range.duration),
            source_range,
        }
    }

    #[inline]
    pub fn destination_start(&self) -> RationalTime {
        self.destination.start
    }

    #[inline]
    pub fn destination_end(&self) -> RationalTime {
        self.destination.end()
    }

    /// True when playback speed differs from the source.
    pub fn is_scaled(&self) -> bool {
        self.destination.duration != self.source_range.duration
    }

    /// Map a destination time onto the source track.
    ///
    /// Scaled segments map linearly; the result is clamped to the source range.
    pub fn source_time_at(&self, time: RationalTime) -> RationalTime {
        let offset = time - self.destination.start;
        let mapped = if self.is_scaled() {
            let fraction = self.destination.fraction_of(time);
            let ticks = (fraction * self.source_range.duration.to_seconds_f64() * 1_000_000.0)
                .round() as i64;
            RationalTime::new(ticks, 1_000_000)
        } else {
            offset
        };
        let clamped = mapped.max(RationalTime::ZERO).min(self.source_range.duration);
        self.source_range.start + clamped
    }
}

/// Ordered segments of one media kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub kind: MediaKind,
    /// Segments in non-decreasing destination start order. They may overlap.
    segments: Vec<Segment>,
}

impl Track {
    pub fn new(id: TrackId, kind: MediaKind) -> Self {
        Self {
            id,
            kind,
            segments: Vec::new(),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Latest destination end over all segments.
    pub fn duration(&self) -> RationalTime {
        self.segments
            .iter()
            .map(Segment::destination_end)
            .max()
            .unwrap_or(RationalTime::ZERO)
    }

    /// Span from the earliest segment start to the track duration.
    pub fn time_range(&self) -> TimeRange {
        match self.segments.first() {
            Some(first) => TimeRange::from_start_end(first.destination_start(), self.duration()),
            None => TimeRange::EMPTY,
        }
    }

    /// Segment covering `time`. The later segment wins where two overlap.
    pub fn segment_at(&self, time: RationalTime) -> Option<&Segment> {
        self.segments
            .iter()
            .rev()
            .find(|s| s.destination.contains(time))
    }

    /// Insert keeping start order; equal starts keep insertion order.
    pub(crate) fn insert(&mut self, segment: Segment) {
        let index = self
            .segments
            .partition_point(|s| s.destination_start() <= segment.destination_start());
        self.segments.insert(index, segment);
    }

    pub(crate) fn segments_mut(&mut self) -> &mut [Segment] {
        &mut self.segments
    }
}
