//! End-to-end rendering: timeline -> requests -> session -> frames.

use cutline_core::{FrameBuffer, FramePool, RationalTime, SharedFrameBuffer, Size};
use cutline_render::{
    CompositorConfig, FrameCompositor, RenderContext, RenderError, RenderOutcome, RenderRequest,
    RenderSession, RequestState, SessionConfig,
};
use cutline_timeline::{Asset, AssetId, AssetTrack, FrameSource, Timeline, TimelineBuilder, TimelineConfig};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

// ── Helpers ────────────────────────────────────────────────────

const WIDTH: u32 = 32;
const HEIGHT: u32 = 18;

/// One solid colour per asset; assets without a colour have no frames.
struct PaletteSource {
    colors: HashMap<AssetId, [u8; 4]>,
    size: (u32, u32),
}

impl PaletteSource {
    fn new(colors: HashMap<AssetId, [u8; 4]>) -> Self {
        Self {
            colors,
            size: (WIDTH, HEIGHT),
        }
    }
}

impl FrameSource for PaletteSource {
    fn frame_at(&self, track: &AssetTrack, _time: RationalTime) -> Option<SharedFrameBuffer> {
        let rgba = *self.colors.get(&track.asset)?;
        let (w, h) = self.size;
        Some(Arc::new(FrameBuffer::solid(w, h, rgba)))
    }
}

const RED: [u8; 4] = [255, 0, 0, 255];
const GREEN: [u8; 4] = [0, 255, 0, 255];
const WHITE: [u8; 4] = [255, 255, 255, 255];

/// Two 2s clips crossing over during [1s, 2s).
fn two_clip_timeline() -> (Timeline, Asset, Asset) {
    let size = Size::new(WIDTH as f64, HEIGHT as f64);
    let a = Asset::new("red").with_video(RationalTime::seconds(2), size);
    let b = Asset::new("green").with_video(RationalTime::seconds(2), size);

    let mut builder = TimelineBuilder::new(TimelineConfig::default());
    builder
        .concatenate_with_transitions(&[a.clone(), b.clone()], RationalTime::seconds(1))
        .unwrap();
    (builder.build(), a, b)
}

fn fixture() -> (Timeline, PaletteSource) {
    let (timeline, a, b) = two_clip_timeline();
    let source = PaletteSource::new(HashMap::from([(a.id, RED), (b.id, GREEN)]));
    (timeline, source)
}

fn frame_times(timeline: &Timeline, per_second: i64) -> Vec<RationalTime> {
    let total = timeline.duration().to_seconds_f64() as i64 * per_second;
    (0..total).map(|n| RationalTime::new(n, per_second)).collect()
}

fn compositor() -> FrameCompositor {
    FrameCompositor::new(CompositorConfig::default()).unwrap()
}

// ── Tests ──────────────────────────────────────────────────────

#[test]
fn session_output_matches_direct_compositing() {
    let (timeline, source) = fixture();
    let times = frame_times(&timeline, 8);
    let requests: Vec<RenderRequest> = times
        .iter()
        .map(|t| RenderRequest::gather(&timeline, *t, &source).unwrap())
        .collect();

    let direct = compositor();
    let context = RenderContext::new(WIDTH, HEIGHT, true);
    let expected: Vec<Vec<u8>> = requests
        .iter()
        .map(|r| direct.render(r, &context).unwrap().to_rgba8())
        .collect();

    let session = RenderSession::new(
        compositor(),
        Some(RenderContext::new(WIDTH, HEIGHT, true)),
        SessionConfig::with_workers(3),
    )
    .unwrap();
    for request in requests {
        session.submit(request).unwrap();
    }
    for (i, bytes) in expected.iter().enumerate() {
        let result = session.recv().unwrap();
        assert_eq!(result.sequence, i as u64);
        assert_eq!(result.requested_time, times[i]);
        let frame = result.outcome.into_frame().unwrap();
        assert_eq!(&frame.to_rgba8(), bytes, "frame {i} differs");
    }
}

#[test]
fn passthrough_spans_show_their_clip() {
    let (timeline, source) = fixture();
    let ctx = RenderContext::new(WIDTH, HEIGHT, true);
    let compositor = compositor();

    let first = RenderRequest::gather(&timeline, RationalTime::new(1, 2), &source).unwrap();
    let frame = compositor.render(&first, &ctx).unwrap();
    assert_eq!(frame.pixel(WIDTH / 2, HEIGHT / 2), RED);

    let last = RenderRequest::gather(&timeline, RationalTime::new(5, 2), &source).unwrap();
    let frame = compositor.render(&last, &ctx).unwrap();
    assert_eq!(frame.pixel(WIDTH / 2, HEIGHT / 2), GREEN);
}

#[test]
fn transition_frames_move_towards_incoming_clip() {
    let (timeline, source) = fixture();
    let ctx = RenderContext::new(WIDTH, HEIGHT, true);
    let compositor = compositor();

    let green_at = |t: RationalTime| {
        let request = RenderRequest::gather(&timeline, t, &source).unwrap();
        assert!(request.instruction.is_transition());
        let frame = compositor.render(&request, &ctx).unwrap();
        frame.pixel(WIDTH / 2, HEIGHT / 2)[1]
    };

    let early = green_at(RationalTime::new(9, 8));
    let late = green_at(RationalTime::new(15, 8));
    assert!(late > early, "{late} <= {early}");
}

#[test]
fn cancelled_burst_leaves_pool_untouched() {
    let (timeline, source) = fixture();
    let pool = FramePool::new(64 * 1024 * 1024);
    let session = RenderSession::new(
        compositor(),
        Some(RenderContext::with_pool(WIDTH, HEIGHT, true, Arc::clone(&pool))),
        SessionConfig::with_workers(2),
    )
    .unwrap();

    session.cancel_all();
    let handles: Vec<_> = frame_times(&timeline, 4)
        .into_iter()
        .map(|t| session.submit(RenderRequest::gather(&timeline, t, &source).unwrap()).unwrap())
        .collect();
    for _ in &handles {
        assert!(matches!(session.recv().unwrap().outcome, RenderOutcome::Cancelled));
    }
    assert!(handles.iter().all(|h| h.state() == RequestState::Cancelled));
    assert_eq!(pool.stats().allocated, 0);
}

#[test]
fn removing_the_context_fails_later_requests() {
    let (timeline, source) = fixture();
    let session = RenderSession::new(
        compositor(),
        Some(RenderContext::new(WIDTH, HEIGHT, false)),
        SessionConfig::with_workers(1),
    )
    .unwrap();

    let previous = session.reconfigure(None).unwrap();
    previous.tear_down();

    let request = RenderRequest::gather(&timeline, RationalTime::ZERO, &source).unwrap();
    let handle = session.submit(request).unwrap();
    let result = session.recv().unwrap();
    assert!(matches!(
        result.outcome,
        RenderOutcome::Failed(RenderError::MissingPixelBuffer)
    ));
    assert_eq!(handle.state(), RequestState::Failed);
}

#[test]
fn transition_with_missing_incoming_frame_shows_outgoing() {
    let (timeline, red, _) = two_clip_timeline();
    let source = PaletteSource::new(HashMap::from([(red.id, RED)]));
    let ctx = RenderContext::new(WIDTH, HEIGHT, true);

    let request = RenderRequest::gather(&timeline, RationalTime::new(3, 2), &source).unwrap();
    assert!(request.instruction.is_transition());
    assert_eq!(request.sources.len(), 1);

    let frame = compositor().render(&request, &ctx).unwrap();
    assert_eq!(frame.pixel(WIDTH / 2, HEIGHT / 2), RED);
    assert_eq!(frame.pixel(0, 0), RED);
}

#[test]
fn transition_with_missing_outgoing_frame_keeps_background() {
    let (timeline, _, green) = two_clip_timeline();
    let source = PaletteSource::new(HashMap::from([(green.id, GREEN)]));
    let ctx = RenderContext::new(WIDTH, HEIGHT, true);

    let request = RenderRequest::gather(&timeline, RationalTime::new(3, 2), &source).unwrap();
    let frame = compositor().render(&request, &ctx).unwrap();
    // Incoming clip is still scaled down, so the corner shows the background
    assert_eq!(frame.pixel(0, 0), WHITE);
    let [r, g, _, _] = frame.pixel(WIDTH / 2, HEIGHT / 2);
    assert!(g > 0 && r < 255);
}

#[test]
fn reconfigure_cancels_requests_still_queued() {
    let (timeline, source) = fixture();
    let config = SessionConfig {
        queue_capacity: 32,
        ..SessionConfig::with_workers(1)
    };
    // Large blurred transition frames keep the single worker busy
    let session = RenderSession::new(
        compositor(),
        Some(RenderContext::new(320, 320, true)),
        config,
    )
    .unwrap();

    let handles: Vec<_> = (0..16)
        .map(|n| {
            let t = RationalTime::new(32 + n, 32);
            session
                .submit(RenderRequest::gather(&timeline, t, &source).unwrap())
                .unwrap()
        })
        .collect();
    session.reconfigure(Some(RenderContext::new(WIDTH, HEIGHT, true)));

    let mut cancelled = 0;
    let mut last = None;
    for handle in &handles {
        let result = session.recv().unwrap();
        assert_eq!(result.sequence, handle.sequence());
        match &result.outcome {
            RenderOutcome::Finished(frame) => assert_eq!(frame.width, 320),
            RenderOutcome::Cancelled => cancelled += 1,
            RenderOutcome::Failed(e) => panic!("unexpected failure: {e}"),
        }
        last = Some(result.outcome.state());
    }
    assert!(cancelled > 0);
    assert_eq!(last, Some(RequestState::Cancelled));
    assert_eq!(handles.last().map(|h| h.state()), Some(RequestState::Cancelled));

    // Requests submitted after the swap render at the new size
    session
        .submit(RenderRequest::gather(&timeline, RationalTime::ZERO, &source).unwrap())
        .unwrap();
    let frame = session.recv().unwrap().outcome.into_frame().unwrap();
    assert_eq!((frame.width, frame.height), (WIDTH, HEIGHT));
}

#[test]
fn session_keeps_serving_after_a_failure() {
    let (timeline, source) = fixture();
    let session = RenderSession::new(compositor(), None, SessionConfig::with_workers(2)).unwrap();
    let request = || RenderRequest::gather(&timeline, RationalTime::new(1, 2), &source).unwrap();

    let failed = session.submit(request()).unwrap();
    assert!(matches!(
        session.recv().unwrap().outcome,
        RenderOutcome::Failed(RenderError::MissingPixelBuffer)
    ));
    assert_eq!(failed.state(), RequestState::Failed);

    session.reconfigure(Some(RenderContext::new(WIDTH, HEIGHT, true)));
    let next = session.submit(request()).unwrap();
    let result = session.recv().unwrap();
    assert_eq!(result.sequence, failed.sequence() + 1);
    let frame = result.outcome.into_frame().unwrap();
    assert_eq!(frame.pixel(WIDTH / 2, HEIGHT / 2), RED);
    assert_eq!(next.state(), RequestState::Finished);
}

#[test]
fn large_sources_into_small_output_stay_cheap() {
    let (timeline, mut source) = fixture();
    source.size = (640, 360);
    let ctx = RenderContext::new(WIDTH, HEIGHT, true);
    let compositor = compositor();

    let request = RenderRequest::gather(&timeline, RationalTime::new(9, 8), &source).unwrap();
    assert!(request.instruction.is_transition());

    let started = Instant::now();
    let frame = compositor.render(&request, &ctx).unwrap();
    let elapsed = started.elapsed();
    assert_eq!((frame.width, frame.height), (WIDTH, HEIGHT));
    assert_eq!(frame.pixel(0, 0), RED);
    assert!(elapsed < Duration::from_secs(5), "took {elapsed:?}");
}
