//! Property-based tests across the timeline and effects crates.

use cutline_core::{Color, RationalTime, Size, Transform2D, Vec2};
use cutline_effects::{blend, BlendMode, Image};
use cutline_timeline::{Asset, TimelineBuilder, TimelineConfig};
use glam::Vec4;
use proptest::prelude::*;

fn video(seconds: i64) -> Asset {
    Asset::new(format!("{seconds}s")).with_video(RationalTime::seconds(seconds), Size::new(64.0, 36.0))
}

fn unit() -> impl Strategy<Value = f32> {
    0.0f32..=1.0
}

// =============================================================================
// Sequencing
// =============================================================================

proptest! {
    /// Back-to-back concatenation has no gaps and sums durations.
    #[test]
    fn concatenation_sums_durations(durations in prop::collection::vec(1i64..20, 1..8)) {
        let assets: Vec<Asset> = durations.iter().map(|d| video(*d)).collect();
        let mut builder = TimelineBuilder::new(TimelineConfig::default());
        let track_id = builder.concatenate(&assets).unwrap();
        let timeline = builder.build();
        let track = timeline.composition.track(track_id).unwrap();

        let total: i64 = durations.iter().sum();
        prop_assert_eq!(track.duration(), RationalTime::seconds(total));

        let mut cursor = RationalTime::ZERO;
        for segment in track.segments() {
            prop_assert_eq!(segment.destination_start(), cursor);
            prop_assert_eq!(segment.destination.duration, segment.source_range.duration);
            cursor = segment.destination_end();
        }
    }

    /// Scaled concatenation stretches every segment by the same factor.
    #[test]
    fn scaled_concatenation_multiplies_durations(
        durations in prop::collection::vec(1i64..10, 1..5),
        scale in prop::sample::select(vec![0.5f64, 1.5, 2.0, 3.0]),
    ) {
        let assets: Vec<Asset> = durations.iter().map(|d| video(*d)).collect();
        let mut builder = TimelineBuilder::new(TimelineConfig::default());
        let track_id = builder.concatenate_scaled(&assets, scale).unwrap();
        let timeline = builder.build();
        let track = timeline.composition.track(track_id).unwrap();

        let mut cursor = RationalTime::ZERO;
        for (segment, d) in track.segments().iter().zip(&durations) {
            let expected = *d as f64 * scale;
            prop_assert!((segment.destination.duration.to_seconds_f64() - expected).abs() < 1e-9);
            prop_assert_eq!(segment.destination_start(), cursor);
            cursor = segment.destination_end();
        }
    }

    /// N clips give N-1 transitions no longer than the requested overlap.
    #[test]
    fn transitions_between_each_pair(
        durations in prop::collection::vec(2i64..10, 2..6),
        overlap in 1i64..3,
    ) {
        let assets: Vec<Asset> = durations.iter().map(|d| video(*d)).collect();
        let mut builder = TimelineBuilder::new(TimelineConfig::default());
        let tracks = builder
            .concatenate_with_transitions(&assets, RationalTime::seconds(overlap))
            .unwrap();
        let timeline = builder.build();

        prop_assert_eq!(tracks.len(), durations.len());
        prop_assert_eq!(timeline.instructions.transitions().count(), durations.len() - 1);
        for transition in timeline.instructions.transitions() {
            prop_assert!(transition.time_range.duration <= RationalTime::seconds(overlap));
            prop_assert!(!transition.time_range.is_empty());
        }
    }
}

// =============================================================================
// Transform math
// =============================================================================

proptest! {
    /// Normalizing then localizing returns the original placement.
    #[test]
    fn normalized_round_trip(
        tx in -500.0f64..500.0,
        ty in -500.0f64..500.0,
        sx in 0.1f64..4.0,
        angle in -3.0f64..3.0,
        w in 1.0f64..4000.0,
        h in 1.0f64..4000.0,
    ) {
        let frame = Size::new(w, h);
        let t = Transform2D::from_parts(Vec2::new(tx, ty), sx, sx, angle);
        let back = t.to_normalized(frame).to_local(frame);
        prop_assert!(back.approx_eq(t, 1e-6));
    }

    /// A transform followed by its inverse maps points back.
    #[test]
    fn inverse_round_trip(
        x in -100.0f64..100.0,
        y in -100.0f64..100.0,
        sx in 0.1f64..4.0,
        sy in 0.1f64..4.0,
        angle in -3.0f64..3.0,
    ) {
        let t = Transform2D::from_parts(Vec2::new(3.0, -7.0), sx, sy, angle);
        let inverse = t.inverse().unwrap();
        let p = Vec2::new(x, y);
        let q = inverse.transform_point(t.transform_point(p));
        prop_assert!((q - p).length() < 1e-6);
    }
}

// =============================================================================
// Blending
// =============================================================================

proptest! {
    /// An opaque foreground replaces the background under source-over.
    #[test]
    fn source_over_opaque_is_identity(
        r in unit(), g in unit(), b in unit(),
        br in unit(), bg in unit(), bb in unit(), ba in unit(),
    ) {
        let fg = Image::solid(Color::new(r, g, b, 1.0), 3, 2);
        let back = Image::solid(Color::new(br, bg, bb, ba), 3, 2);
        let out = blend(&fg, &back, BlendMode::SourceOver).unwrap();
        prop_assert_eq!(out, fg);
    }

    /// Every mode stays inside the unit cube for premultiplied inputs.
    #[test]
    fn blend_modes_stay_in_range(
        r in unit(), g in unit(), b in unit(), a in unit(),
        br in unit(), bg in unit(), bb in unit(), ba in unit(),
    ) {
        let fg = Vec4::new(r * a, g * a, b * a, a);
        let back = Vec4::new(br * ba, bg * ba, bb * ba, ba);
        for mode in BlendMode::ALL {
            let px = mode.blend_pixel(fg, back);
            prop_assert!(px.min_element() >= -1e-5, "{} gave {:?}", mode.name(), px);
            prop_assert!(px.max_element() <= 1.0 + 1e-5, "{} gave {:?}", mode.name(), px);
        }
    }
}
