//! Volume automation for audio tracks.
//!
//! Only ramp descriptors live here; sample mixing belongs to the audio mixer.

use cutline_core::{RationalTime, TimeRange};
use serde::{Deserialize, Serialize};

use crate::track::TrackId;

/// Linear gain change over a time range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeRamp {
    pub track: TrackId,
    pub time_range: TimeRange,
    pub start_volume: f32,
    pub end_volume: f32,
}

impl VolumeRamp {
    /// 0 → 1 over `time_range`.
    pub fn fade_in(track: TrackId, time_range: TimeRange) -> Self {
        Self {
            track,
            time_range,
            start_volume: 0.0,
            end_volume: 1.0,
        }
    }

    /// 1 → 0 over `time_range`.
    pub fn fade_out(track: TrackId, time_range: TimeRange) -> Self {
        Self {
            track,
            time_range,
            start_volume: 1.0,
            end_volume: 0.0,
        }
    }

    /// Gain at `time`, or `None` outside the ramp.
    ///
    /// Never extrapolates beyond the start and end volumes.
    pub fn volume_at(&self, time: RationalTime) -> Option<f32> {
        if !self.time_range.contains(time) {
            return None;
        }
        let t = self.time_range.fraction_of(time).clamp(0.0, 1.0) as f32;
        Some(self.start_volume + (self.end_volume - self.start_volume) * t)
    }
}

/// Volume ramps for every audio track of a composition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioMix {
    ramps: Vec<VolumeRamp>,
}

impl AudioMix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, ramp: VolumeRamp) {
        self.ramps.push(ramp);
    }

    pub fn extend(&mut self, other: AudioMix) {
        self.ramps.extend(other.ramps);
    }

    pub fn ramps(&self) -> &[VolumeRamp] {
        &self.ramps
    }

    /// Ramps of one track in emission order.
    pub fn ramps_for(&self, track: TrackId) -> impl Iterator<Item = &VolumeRamp> {
        self.ramps.iter().filter(move |r| r.track == track)
    }

    pub fn is_empty(&self) -> bool {
        self.ramps.is_empty()
    }

    /// Combined gain of `track` at `time`: the product of every covering ramp,
    /// 1.0 where none applies.
    pub fn volume_at(&self, track: TrackId, time: RationalTime) -> f32 {
        self.ramps_for(track)
            .filter_map(|r| r.volume_at(time))
            .product()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: i64) -> RationalTime {
        RationalTime::seconds(s)
    }

    #[test]
    fn test_ramp_interpolates_linearly() {
        let ramp = VolumeRamp::fade_in(TrackId(1), TimeRange::new(secs(2), secs(2)));
        assert_eq!(ramp.volume_at(secs(2)), Some(0.0));
        assert_eq!(ramp.volume_at(secs(3)), Some(0.5));
        assert_eq!(ramp.volume_at(secs(4)), None);
        assert_eq!(ramp.volume_at(secs(1)), None);
    }

    #[test]
    fn test_mix_multiplies_overlapping_ramps() {
        let track = TrackId(3);
        let mut mix = AudioMix::new();
        mix.push(VolumeRamp::fade_in(track, TimeRange::new(secs(0), secs(4))));
        mix.push(VolumeRamp::fade_out(track, TimeRange::new(secs(2), secs(2))));

        assert_eq!(mix.volume_at(track, secs(1)), 0.25);
        // 0.75 * 0.5
        assert_eq!(mix.volume_at(track, secs(3)), 0.375);
        assert_eq!(mix.volume_at(track, secs(10)), 1.0);
        assert_eq!(mix.volume_at(TrackId(9), secs(1)), 1.0);
    }
}
