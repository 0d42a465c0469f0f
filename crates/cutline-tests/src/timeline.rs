//! Integration tests for timeline building.
//!
//! Exercises the builder, instruction generation, audio ramps and timeline
//! documents together.

use cutline_core::{RationalTime, Size, TimeRange};
use cutline_timeline::{
    Asset, MediaKind, Timeline, TimelineBuilder, TimelineConfig, TimelineDocument, TrackId,
};

// ── Helpers ────────────────────────────────────────────────────

fn secs(s: i64) -> RationalTime {
    RationalTime::seconds(s)
}

fn clip(name: &str, seconds: i64) -> Asset {
    Asset::new(name)
        .with_video(secs(seconds), Size::new(1920.0, 1080.0))
        .with_audio(secs(seconds))
}

fn transition_timeline(durations: &[i64], overlap: i64) -> (Timeline, Vec<TrackId>) {
    let assets: Vec<Asset> = durations
        .iter()
        .enumerate()
        .map(|(i, d)| clip(&format!("clip-{i}"), *d))
        .collect();
    let mut builder = TimelineBuilder::new(TimelineConfig::default());
    let tracks = builder
        .concatenate_with_transitions(&assets, secs(overlap))
        .unwrap();
    (builder.build(), tracks)
}

/// Instruction spans must tile the timeline exactly.
fn assert_full_coverage(timeline: &Timeline) {
    let mut cursor = RationalTime::ZERO;
    for instruction in timeline.instructions.iter() {
        assert_eq!(instruction.time_range.start, cursor, "gap or overlap at {cursor}");
        assert!(!instruction.time_range.is_empty());
        cursor = instruction.time_range.end();
    }
    assert_eq!(cursor, timeline.duration());
}

// ── Transitional concatenation ─────────────────────────────────

#[test]
fn three_and_four_seconds_with_two_second_overlap() {
    let (timeline, tracks) = transition_timeline(&[3, 4], 2);
    assert_eq!(timeline.duration(), secs(5));
    assert_eq!(tracks.len(), 2);

    let spans: Vec<_> = timeline.instructions.iter().collect();
    assert_eq!(spans.len(), 3);

    assert_eq!(spans[0].time_range, TimeRange::from_start_end(secs(0), secs(1)));
    assert_eq!(spans[0].passthrough, Some(tracks[0]));

    assert_eq!(spans[1].time_range, TimeRange::from_start_end(secs(1), secs(3)));
    assert!(spans[1].is_transition());
    assert_eq!(spans[1].background_track(), Some(tracks[0]));
    assert_eq!(spans[1].foreground_track(), Some(tracks[1]));

    assert_eq!(spans[2].time_range, TimeRange::from_start_end(secs(3), secs(5)));
    assert_eq!(spans[2].passthrough, Some(tracks[1]));
}

#[test]
fn many_clips_alternate_passthrough_and_transition() {
    let (timeline, tracks) = transition_timeline(&[4, 4, 4, 4], 1);
    assert_eq!(tracks.len(), 4);
    assert_eq!(timeline.duration(), secs(13));
    assert_eq!(timeline.instructions.transitions().count(), 3);
    assert_eq!(timeline.instructions.passthroughs().count(), 4);
    for transition in timeline.instructions.transitions() {
        assert_eq!(transition.time_range.duration, secs(1));
    }
    assert_full_coverage(&timeline);
}

#[test]
fn overlap_longer_than_clip_is_clamped() {
    let (timeline, _) = transition_timeline(&[5, 2, 5], 3);
    for transition in timeline.instructions.transitions() {
        assert!(transition.time_range.duration <= secs(2));
    }
    assert_full_coverage(&timeline);
}

#[test]
fn every_time_has_an_instruction() {
    let (timeline, _) = transition_timeline(&[3, 4, 2], 1);
    let mut t = RationalTime::ZERO;
    let step = RationalTime::new(1, 30);
    while t < timeline.duration() {
        let instruction = timeline.instructions.instruction_at(t).unwrap();
        assert!(instruction.time_range.contains(t));
        t = t + step;
    }
    assert!(timeline.instructions.instruction_at(timeline.duration()).is_none());
}

// ── Audio ──────────────────────────────────────────────────────

#[test]
fn audio_crossfade_matches_video_transitions() {
    let assets = [clip("a", 3), clip("b", 4), clip("c", 3)];
    let mut builder = TimelineBuilder::new(TimelineConfig::default());
    let video = builder
        .concatenate_with_transitions(&assets, secs(1))
        .unwrap();
    let audio = builder.layout_audio_crossfade(&assets, secs(1)).unwrap();
    let timeline = builder.build();

    assert_eq!(video.len(), audio.len());
    for (v, a) in video.iter().zip(&audio) {
        let v_range = timeline.composition.track(*v).unwrap().time_range();
        let a_range = timeline.composition.track(*a).unwrap().time_range();
        assert_eq!(v_range, a_range);
        assert_eq!(timeline.composition.track(*a).unwrap().kind, MediaKind::Audio);
    }

    // Middle track: silent at its start, full in its body, silent at its end
    let middle = audio[1];
    assert_eq!(timeline.audio_mix.volume_at(middle, secs(2)), 0.0);
    assert_eq!(timeline.audio_mix.volume_at(middle, RationalTime::new(7, 2)), 1.0);
    let ending = timeline.audio_mix.volume_at(middle, RationalTime::new(11, 2));
    assert!(ending > 0.0 && ending < 1.0);
}

#[test]
fn audio_ramps_never_exceed_unit_range() {
    let assets = [clip("a", 2), clip("b", 6), clip("c", 1)];
    let mut builder = TimelineBuilder::new(TimelineConfig::default());
    let tracks = builder.layout_audio_crossfade(&assets, secs(2)).unwrap();
    let timeline = builder.build();

    for track in tracks {
        let range = timeline.composition.track(track).unwrap().time_range();
        let mut t = range.start;
        while t < range.end() {
            let v = timeline.audio_mix.volume_at(track, t);
            assert!((0.0..=1.0).contains(&v), "volume {v} at {t}");
            t = t + RationalTime::new(1, 10);
        }
    }
}

// ── Documents ──────────────────────────────────────────────────

#[test]
fn document_round_trip_preserves_timeline() {
    let (timeline, _) = transition_timeline(&[3, 4], 1);
    let json = TimelineDocument::new(timeline.clone()).to_json().unwrap();
    let restored = TimelineDocument::from_json(&json).unwrap().into_timeline();

    assert_eq!(restored.duration(), timeline.duration());
    assert_eq!(restored.instructions, timeline.instructions);
    assert_eq!(restored.composition.tracks(), timeline.composition.tracks());
}

#[test]
fn document_file_round_trip() {
    let (timeline, _) = transition_timeline(&[2, 2], 1);
    let path = std::env::temp_dir().join(format!("cutline-doc-{}.json", std::process::id()));
    TimelineDocument::new(timeline.clone())
        .save_to_file(&path)
        .unwrap();
    let loaded = TimelineDocument::load_from_file(&path).unwrap().into_timeline();
    let _ = std::fs::remove_file(&path);
    assert_eq!(loaded.instructions, timeline.instructions);
}
