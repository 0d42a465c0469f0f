//! Sequencing algorithms that lay assets out on a composition.
//!
//! Every operation is all-or-nothing: it works on a staged copy of the
//! composition and only commits when every asset was placed.

use cutline_core::{RationalTime, TimeRange};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::asset::Asset;
use crate::audio::{AudioMix, VolumeRamp};
use crate::composition::{Composition, TimelineConfig};
use crate::error::{Result, ValidationError};
use crate::instruction::InstructionSet;
use crate::track::{MediaKind, TrackId};

/// A finished timeline: tracks, render instructions and audio automation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Timeline {
    pub composition: Composition,
    pub instructions: InstructionSet,
    pub audio_mix: AudioMix,
}

impl Timeline {
    pub fn duration(&self) -> RationalTime {
        self.composition.duration()
    }
}

/// Where one asset landed in an overlapped chain.
#[derive(Debug, Clone, Copy)]
struct Placement {
    track: TrackId,
    range: TimeRange,
    /// Overlap with the previous placement, zero for the first
    lead_in: RationalTime,
}

/// Builds a [`Timeline`] step by step.
#[derive(Debug, Clone, Default)]
pub struct TimelineBuilder {
    composition: Composition,
    audio_mix: AudioMix,
}

impl TimelineBuilder {
    pub fn new(config: TimelineConfig) -> Self {
        Self {
            composition: Composition::new(config),
            audio_mix: AudioMix::new(),
        }
    }

    pub fn composition(&self) -> &Composition {
        &self.composition
    }

    pub fn audio_mix(&self) -> &AudioMix {
        &self.audio_mix
    }

    /// Append each asset's video track back to back on one new track.
    pub fn concatenate(&mut self, assets: &[Asset]) -> Result<TrackId> {
        let mut staged = self.composition.clone();
        let track = staged.add_track(MediaKind::Video);

        for asset in assets {
            let Some(source) = asset.first_track(MediaKind::Video) else {
                debug!(asset = %asset.name, "no video track, skipped");
                continue;
            };
            let at = track_end(&staged, track);
            staged.append_segment(track, source, source.time_range, at)?;
        }

        self.composition = staged;
        info!(%track, assets = assets.len(), duration = %self.composition.duration(), "assets concatenated");
        Ok(track)
    }

    /// Like [`concatenate`](Self::concatenate), then re-time each inserted
    /// range by `scale` (`1 / speed`).
    pub fn concatenate_scaled(&mut self, assets: &[Asset], scale: f64) -> Result<TrackId> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(ValidationError::InvalidSpeed(scale));
        }
        let mut staged = self.composition.clone();
        let track = staged.add_track(MediaKind::Video);

        for asset in assets {
            let Some(source) = asset.first_track(MediaKind::Video) else {
                debug!(asset = %asset.name, "no video track, skipped");
                continue;
            };
            let at = track_end(&staged, track);
            staged.append_segment(track, source, source.time_range, at)?;
            let inserted = TimeRange::from_start_end(at, track_end(&staged, track));
            staged.scale_time_range(track, inserted, scale)?;
        }

        self.composition = staged;
        info!(%track, scale, duration = %self.composition.duration(), "assets concatenated with scale");
        Ok(track)
    }

    /// Put each asset on its own new video track, overlapping the previous
    /// one by `overlap`.
    ///
    /// The overlap is clamped so it never exceeds the incoming asset or the
    /// part of the previous asset not already used by its own transition.
    pub fn concatenate_with_transitions(
        &mut self,
        assets: &[Asset],
        overlap: RationalTime,
    ) -> Result<Vec<TrackId>> {
        let mut staged = self.composition.clone();
        let placements = place_chain(&mut staged, assets, MediaKind::Video, overlap)?;

        self.composition = staged;
        info!(
            tracks = placements.len(),
            %overlap,
            duration = %self.composition.duration(),
            "assets laid out with transitions"
        );
        Ok(placements.iter().map(|p| p.track).collect())
    }

    /// Put each asset's audio on its own new track, back to back.
    pub fn layout_audio(&mut self, assets: &[Asset]) -> Result<Vec<TrackId>> {
        let mut staged = self.composition.clone();
        let placements = place_chain(&mut staged, assets, MediaKind::Audio, RationalTime::ZERO)?;

        self.composition = staged;
        info!(tracks = placements.len(), "audio laid out");
        Ok(placements.iter().map(|p| p.track).collect())
    }

    /// Put each asset's audio on its own new track overlapping the previous
    /// by `overlap`, with a fade-in and fade-out ramp per segment.
    ///
    /// Inner ramps last exactly as long as the (clamped) overlap with the
    /// neighbour; the first fade-in and last fade-out last
    /// `min(overlap, segment duration)`. Empty ramps are not emitted.
    pub fn layout_audio_crossfade(
        &mut self,
        assets: &[Asset],
        overlap: RationalTime,
    ) -> Result<Vec<TrackId>> {
        let mut staged = self.composition.clone();
        let placements = place_chain(&mut staged, assets, MediaKind::Audio, overlap)?;

        let mut mix = AudioMix::new();
        for (i, placement) in placements.iter().enumerate() {
            let edge = overlap.min(placement.range.duration);
            let fade_in = if i == 0 { edge } else { placement.lead_in };
            let fade_out = placements.get(i + 1).map_or(edge, |next| next.lead_in);

            if !fade_in.is_zero() {
                mix.push(VolumeRamp::fade_in(
                    placement.track,
                    TimeRange::new(placement.range.start, fade_in),
                ));
            }
            if !fade_out.is_zero() {
                mix.push(VolumeRamp::fade_out(
                    placement.track,
                    TimeRange::new(placement.range.end() - fade_out, fade_out),
                ));
            }
        }

        self.composition = staged;
        info!(tracks = placements.len(), ramps = mix.ramps().len(), %overlap, "audio laid out with crossfades");
        self.audio_mix.extend(mix);
        Ok(placements.iter().map(|p| p.track).collect())
    }

    /// Finish the timeline and derive its render instructions.
    pub fn build(self) -> Timeline {
        let instructions = InstructionSet::from_composition(&self.composition);
        Timeline {
            composition: self.composition,
            instructions,
            audio_mix: self.audio_mix,
        }
    }
}

fn track_end(composition: &Composition, track: TrackId) -> RationalTime {
    composition
        .track(track)
        .map_or(RationalTime::ZERO, |t| t.duration())
}

/// Place the first `kind` track of each asset on a new track, each starting
/// `overlap` before the end of the previous one.
fn place_chain(
    composition: &mut Composition,
    assets: &[Asset],
    kind: MediaKind,
    overlap: RationalTime,
) -> Result<Vec<Placement>> {
    if overlap.is_negative() {
        return Err(ValidationError::NegativeOverlap(overlap));
    }

    let mut placements: Vec<Placement> = Vec::with_capacity(assets.len());
    for asset in assets {
        let Some(source) = asset.first_track(kind) else {
            debug!(asset = %asset.name, ?kind, "no matching track, skipped");
            continue;
        };

        let (start, lead_in) = match placements.last() {
            None => (RationalTime::ZERO, RationalTime::ZERO),
            Some(prev) => {
                let available = prev.range.duration - prev.lead_in;
                let lead_in = overlap.min(available).min(source.duration());
                if lead_in < overlap {
                    warn!(asset = %asset.name, requested = %overlap, clamped = %lead_in, "overlap clamped");
                }
                (prev.range.end() - lead_in, lead_in)
            }
        };

        let track = composition.add_track(kind);
        composition.append_segment(track, source, source.time_range, start)?;
        let range = composition
            .track(track)
            .and_then(|t| t.segments().last())
            .map(|s| s.destination)
            .ok_or(ValidationError::UnknownTrack(track))?;

        placements.push(Placement {
            track,
            range,
            lead_in,
        });
    }
    Ok(placements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutline_core::Size;

    fn secs(s: i64) -> RationalTime {
        RationalTime::seconds(s)
    }

    fn video(seconds: i64) -> Asset {
        Asset::new(format!("video-{seconds}s")).with_video(secs(seconds), Size::new(64.0, 36.0))
    }

    fn audio(seconds: i64) -> Asset {
        Asset::new(format!("audio-{seconds}s")).with_audio(secs(seconds))
    }

    #[test]
    fn test_concatenate_has_no_gaps() {
        let mut builder = TimelineBuilder::default();
        let track = builder.concatenate(&[video(3), video(4), video(2)]).unwrap();

        let segs = builder.composition().track(track).unwrap().segments();
        let starts: Vec<RationalTime> = segs.iter().map(|s| s.destination_start()).collect();
        assert_eq!(starts, vec![secs(0), secs(3), secs(7)]);
        assert_eq!(builder.composition().duration(), secs(9));
    }

    #[test]
    fn test_concatenate_skips_assets_without_video() {
        let mut builder = TimelineBuilder::default();
        let track = builder.concatenate(&[video(3), audio(5), video(1)]).unwrap();
        assert_eq!(builder.composition().track(track).unwrap().segments().len(), 2);
    }

    #[test]
    fn test_concatenate_scaled() {
        let mut builder = TimelineBuilder::default();
        let track = builder.concatenate_scaled(&[video(3), video(4)], 0.5).unwrap();

        let segs = builder.composition().track(track).unwrap().segments();
        assert_eq!(segs[0].destination, TimeRange::new(secs(0), RationalTime::new(3, 2)));
        assert_eq!(segs[1].destination, TimeRange::new(RationalTime::new(3, 2), secs(2)));
        assert_eq!(segs[1].source_range.duration, secs(4));

        assert!(matches!(
            builder.concatenate_scaled(&[video(1)], f64::NAN),
            Err(ValidationError::InvalidSpeed(_))
        ));
    }

    #[test]
    fn test_transition_scenario() {
        let mut builder = TimelineBuilder::default();
        let tracks = builder
            .concatenate_with_transitions(&[video(3), video(4)], secs(2))
            .unwrap();
        let timeline = builder.build();

        assert_eq!(tracks.len(), 2);
        assert_eq!(timeline.duration(), secs(5));

        let spans: Vec<(TimeRange, Vec<TrackId>)> = timeline
            .instructions
            .iter()
            .map(|i| (i.time_range, i.required_tracks.to_vec()))
            .collect();
        assert_eq!(
            spans,
            vec![
                (TimeRange::from_start_end(secs(0), secs(1)), vec![tracks[0]]),
                (TimeRange::from_start_end(secs(1), secs(3)), vec![tracks[0], tracks[1]]),
                (TimeRange::from_start_end(secs(3), secs(5)), vec![tracks[1]]),
            ]
        );
    }

    #[test]
    fn test_transition_overlap_is_clamped() {
        let mut builder = TimelineBuilder::default();
        builder
            .concatenate_with_transitions(&[video(5), video(1), video(5)], secs(2))
            .unwrap();
        let timeline = builder.build();

        let transitions: Vec<TimeRange> = timeline.instructions.transitions().map(|i| i.time_range).collect();
        // The 1s middle asset limits the first overlap; nothing is left for the second
        assert_eq!(transitions, vec![TimeRange::from_start_end(secs(4), secs(5))]);
        assert_eq!(timeline.duration(), secs(10));
        assert!(timeline.instructions.iter().all(|i| !i.time_range.duration.is_negative()));
    }

    #[test]
    fn test_negative_overlap_rejected_without_partial_result() {
        let mut builder = TimelineBuilder::default();
        let err = builder
            .concatenate_with_transitions(&[video(3), video(4)], secs(-1))
            .unwrap_err();
        assert!(matches!(err, ValidationError::NegativeOverlap(_)));
        assert!(builder.composition().tracks().is_empty());
    }

    #[test]
    fn test_audio_crossfade_ramps() {
        let mut builder = TimelineBuilder::default();
        let overlap = RationalTime::new(3, 2);
        let tracks = builder
            .layout_audio_crossfade(&[audio(4), audio(5)], overlap)
            .unwrap();

        let second = builder.composition().track(tracks[1]).unwrap();
        assert_eq!(second.segments()[0].destination_start(), RationalTime::new(5, 2));

        let mix = builder.audio_mix();
        let ramps: Vec<&VolumeRamp> = mix.ramps_for(tracks[1]).collect();
        assert_eq!(ramps.len(), 2);
        assert_eq!(ramps[0].time_range, TimeRange::new(RationalTime::new(5, 2), overlap));
        assert_eq!((ramps[0].start_volume, ramps[0].end_volume), (0.0, 1.0));
        assert_eq!(
            ramps[1].time_range,
            TimeRange::new(RationalTime::new(15, 2) - overlap, overlap)
        );
        assert_eq!((ramps[1].start_volume, ramps[1].end_volume), (1.0, 0.0));

        // First segment fades out exactly where the second fades in
        let first_out = mix.ramps_for(tracks[0]).last().unwrap();
        assert_eq!(first_out.time_range, ramps[0].time_range);
    }

    #[test]
    fn test_plain_audio_layout() {
        let mut builder = TimelineBuilder::default();
        let tracks = builder.layout_audio(&[audio(2), audio(3)]).unwrap();

        assert_eq!(tracks.len(), 2);
        assert!(builder.audio_mix().is_empty());
        assert_eq!(builder.composition().duration(), secs(5));
    }

    #[test]
    fn test_audio_does_not_add_instructions() {
        let mut builder = TimelineBuilder::default();
        builder.concatenate(&[video(2)]).unwrap();
        builder.layout_audio_crossfade(&[audio(6)], secs(1)).unwrap();
        let timeline = builder.build();

        assert_eq!(timeline.instructions.len(), 1);
        assert_eq!(timeline.duration(), secs(6));
    }
}
