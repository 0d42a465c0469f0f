//! Multi-track composition sharing one time origin.

use cutline_core::{RationalTime, TimeRange};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::debug;

use crate::asset::AssetTrack;
use crate::error::{Result, ValidationError};
use crate::track::{MediaKind, Segment, Track, TrackId};

/// Timing configuration of a composition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Ticks per second every inserted time is expressed in
    pub timescale: i64,
    /// Largest rounding error tolerated when rescaling; zero means lossless
    pub rescale_epsilon: RationalTime,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            timescale: 600,
            rescale_epsilon: RationalTime::ZERO,
        }
    }
}

/// A set of tracks laid out on a shared timeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Composition {
    config: TimelineConfig,
    tracks: Vec<Track>,
    next_track_id: u32,
    #[serde(skip)]
    duration_cache: OnceLock<RationalTime>,
}

impl Composition {
    pub fn new(config: TimelineConfig) -> Self {
        Self {
            config,
            tracks: Vec::new(),
            next_track_id: 1,
            duration_cache: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    /// Add an empty track with a fresh identifier.
    pub fn add_track(&mut self, kind: MediaKind) -> TrackId {
        let mut id = TrackId(self.next_track_id.max(1));
        while self.track(id).is_some() {
            id = TrackId(id.0 + 1);
        }
        self.next_track_id = id.0 + 1;
        self.tracks.push(Track::new(id, kind));
        self.invalidate();
        debug!(track = %id, ?kind, "track added");
        id
    }

    /// Add an empty track with a caller-chosen identifier.
    pub fn add_track_with_id(&mut self, id: TrackId, kind: MediaKind) -> Result<TrackId> {
        if self.track(id).is_some() {
            return Err(ValidationError::DuplicateTrack(id));
        }
        self.tracks.push(Track::new(id, kind));
        self.next_track_id = self.next_track_id.max(id.0 + 1);
        self.invalidate();
        Ok(id)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    /// Tracks of one media kind in creation order.
    pub fn tracks_of(&self, kind: MediaKind) -> impl Iterator<Item = &Track> {
        self.tracks.iter().filter(move |t| t.kind == kind)
    }

    /// Place `source_range` of `source` on track `track_id` starting at `at`.
    ///
    /// All three times are rescaled to the composition timescale first.
    pub fn append_segment(
        &mut self,
        track_id: TrackId,
        source: &AssetTrack,
        source_range: TimeRange,
        at: RationalTime,
    ) -> Result<()> {
        let kind = self
            .track(track_id)
            .ok_or(ValidationError::UnknownTrack(track_id))?
            .kind;
        if kind != source.kind {
            return Err(ValidationError::MediaKindMismatch {
                track: track_id,
                expected: kind,
                found: source.kind,
            });
        }
        if source_range.duration.is_negative() {
            return Err(ValidationError::NegativeDuration(source_range.duration));
        }
        if !source.time_range.contains_range(source_range) {
            return Err(ValidationError::OutOfRange {
                range: source_range,
                available: source.time_range,
            });
        }

        let start = self.rescale(source_range.start)?;
        let duration = self.rescale(source_range.duration)?;
        let at = self.rescale(at)?;
        let segment = Segment::new(source.clone(), TimeRange::new(start, duration), at);

        self.track_mut(track_id)?.insert(segment);
        self.invalidate();
        Ok(())
    }

    /// Re-time the segments of a track that lie inside `range` so the range
    /// lasts `factor` times as long.
    ///
    /// Segments starting at or after the end of `range` move by the change in
    /// length; segments before it keep their place.
    pub fn scale_time_range(&mut self, track_id: TrackId, range: TimeRange, factor: f64) -> Result<()> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(ValidationError::InvalidSpeed(factor));
        }
        let timescale = self.config.timescale;
        let new_length = range.duration.scaled_by(factor, timescale);
        let shift = new_length - range.duration;

        let track = self.track_mut(track_id)?;
        for segment in track.segments_mut() {
            if range.contains_range(segment.destination) {
                let offset = segment.destination.start - range.start;
                segment.destination = TimeRange::new(
                    range.start + offset.scaled_by(factor, timescale),
                    segment.destination.duration.scaled_by(factor, timescale),
                );
            } else if segment.destination.start >= range.end() {
                segment.destination = segment.destination.shifted(shift);
            }
        }
        self.invalidate();
        debug!(track = %track_id, %range, factor, "time range scaled");
        Ok(())
    }

    /// Latest end over all tracks. Cached until the next mutation.
    pub fn duration(&self) -> RationalTime {
        *self.duration_cache.get_or_init(|| {
            self.tracks
                .iter()
                .map(Track::duration)
                .max()
                .unwrap_or(RationalTime::ZERO)
        })
    }

    pub fn time_range(&self) -> TimeRange {
        TimeRange::new(RationalTime::ZERO, self.duration().max(RationalTime::ZERO))
    }

    /// Every segment covering `time`, by track order.
    pub fn segments_at(&self, time: RationalTime) -> Vec<(TrackId, &Segment)> {
        self.tracks
            .iter()
            .filter_map(|t| t.segment_at(time).map(|s| (t.id, s)))
            .collect()
    }

    fn track_mut(&mut self, id: TrackId) -> Result<&mut Track> {
        self.tracks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(ValidationError::UnknownTrack(id))
    }

    fn rescale(&self, value: RationalTime) -> Result<RationalTime> {
        let timescale = self.config.timescale;
        value
            .rescaled(timescale, self.config.rescale_epsilon)
            .map_err(|source| ValidationError::InvalidTimescale {
                value,
                timescale,
                source,
            })
    }

    fn invalidate(&mut self) {
        self.duration_cache = OnceLock::new();
    }
}
