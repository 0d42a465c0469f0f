//! Render requests, their outcomes, and per-request state tracking.

use cutline_core::{PooledFrame, RationalTime, SharedFrameBuffer};
use cutline_timeline::{FrameSource, RenderInstruction, Timeline, TrackId};
use smallvec::SmallVec;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tracing::trace;

use crate::error::RenderError;

/// Composited output; returns its buffer to the context pool on drop.
pub type OutputFrame = PooledFrame;

/// Everything needed to composite one output frame.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub time: RationalTime,
    pub instruction: RenderInstruction,
    /// Source frame per track. Tracks listed by the instruction but missing
    /// here are composited as absent.
    pub sources: SmallVec<[(TrackId, SharedFrameBuffer); 2]>,
}

impl RenderRequest {
    pub fn new(time: RationalTime, instruction: RenderInstruction) -> Self {
        Self {
            time,
            instruction,
            sources: SmallVec::new(),
        }
    }

    pub fn with_source(mut self, track: TrackId, frame: SharedFrameBuffer) -> Self {
        self.sources.push((track, frame));
        self
    }

    pub fn source_frame(&self, track: TrackId) -> Option<&SharedFrameBuffer> {
        self.sources
            .iter()
            .find(|(id, _)| *id == track)
            .map(|(_, frame)| frame)
    }

    /// Build the request for `time`, pulling each required track's frame
    /// from `source` at the matching source time.
    ///
    /// Returns `None` when no instruction covers `time`.
    pub fn gather(
        timeline: &Timeline,
        time: RationalTime,
        source: &dyn FrameSource,
    ) -> Option<Self> {
        let instruction = timeline.instructions.instruction_at(time)?.clone();
        let mut request = Self::new(time, instruction);

        for &track_id in &request.instruction.required_tracks {
            let segment = timeline
                .composition
                .track(track_id)
                .and_then(|track| track.segment_at(time));
            let Some(segment) = segment else {
                trace!(track = %track_id, "no segment at {time}");
                continue;
            };
            match source.frame_at(&segment.source, segment.source_time_at(time)) {
                Some(frame) => request.sources.push((track_id, frame)),
                None => trace!(track = %track_id, "source has no frame at {time}"),
            }
        }
        Some(request)
    }
}

/// Terminal result of one request.
#[derive(Debug)]
pub enum RenderOutcome {
    Finished(OutputFrame),
    Cancelled,
    Failed(RenderError),
}

impl RenderOutcome {
    pub fn state(&self) -> RequestState {
        match self {
            Self::Finished(_) => RequestState::Finished,
            Self::Cancelled => RequestState::Cancelled,
            Self::Failed(_) => RequestState::Failed,
        }
    }

    pub fn frame(&self) -> Option<&OutputFrame> {
        match self {
            Self::Finished(frame) => Some(frame),
            _ => None,
        }
    }

    pub fn into_frame(self) -> Option<OutputFrame> {
        match self {
            Self::Finished(frame) => Some(frame),
            _ => None,
        }
    }
}

/// Lifecycle of a request: `Idle -> Rendering -> Finished | Failed`, or
/// `Idle -> Cancelled` when cancelled before it started. Every failure,
/// including a missing render context, passes through `Rendering`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RequestState {
    Idle = 0,
    Rendering = 1,
    Finished = 2,
    Cancelled = 3,
    Failed = 4,
}

impl RequestState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Rendering,
            2 => Self::Finished,
            3 => Self::Cancelled,
            4 => Self::Failed,
            _ => Self::Idle,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled | Self::Failed)
    }

    /// Whether `next` directly follows `self` in the lifecycle.
    pub fn can_advance_to(self, next: RequestState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Rendering | Self::Cancelled)
                | (Self::Rendering, Self::Finished | Self::Failed)
        )
    }
}

/// Shared state cell written by the worker, read through [`RequestHandle`].
#[derive(Debug, Clone, Default)]
pub(crate) struct StateCell(Arc<AtomicU8>);

impl StateCell {
    /// Move to `next` if the lifecycle allows it from the current state.
    pub(crate) fn advance(&self, next: RequestState) -> bool {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                RequestState::from_u8(current)
                    .can_advance_to(next)
                    .then_some(next as u8)
            })
            .is_ok()
    }

    pub(crate) fn get(&self) -> RequestState {
        RequestState::from_u8(self.0.load(Ordering::Acquire))
    }
}

/// Caller's view of a submitted request.
#[derive(Debug, Clone)]
pub struct RequestHandle {
    sequence: u64,
    time: RationalTime,
    state: StateCell,
}

impl RequestHandle {
    pub(crate) fn new(sequence: u64, time: RationalTime, state: StateCell) -> Self {
        Self {
            sequence,
            time,
            state,
        }
    }

    /// Submission order; results are delivered in this order.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn requested_time(&self) -> RationalTime {
        self.time
    }

    pub fn state(&self) -> RequestState {
        self.state.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutline_core::{FrameBuffer, Size, TimeRange};
    use cutline_timeline::{Asset, AssetTrack, TimelineBuilder, TimelineConfig};

    fn secs(s: i64) -> RationalTime {
        RationalTime::new(s, 1)
    }

    /// Frame whose red channel encodes the source second.
    struct SecondsSource;

    impl FrameSource for SecondsSource {
        fn frame_at(&self, _track: &AssetTrack, time: RationalTime) -> Option<SharedFrameBuffer> {
            let s = time.to_seconds_f64().floor() as u8;
            Some(Arc::new(FrameBuffer::solid(2, 2, [s, 0, 0, 255])))
        }
    }

    struct EmptySource;

    impl FrameSource for EmptySource {
        fn frame_at(&self, _: &AssetTrack, _: RationalTime) -> Option<SharedFrameBuffer> {
            None
        }
    }

    fn transition_timeline() -> Timeline {
        let size = Size::new(2.0, 2.0);
        let assets = [
            Asset::new("a").with_video(secs(3), size),
            Asset::new("b").with_video(secs(4), size),
        ];
        let mut builder = TimelineBuilder::new(TimelineConfig::default());
        builder
            .concatenate_with_transitions(&assets, secs(1))
            .unwrap();
        builder.build()
    }

    #[test]
    fn test_gather_transition_maps_source_times() {
        let timeline = transition_timeline();
        // 2.5s is inside the [2, 3) transition; b started at 2s on the timeline
        let time = RationalTime::new(5, 2);
        let request = RenderRequest::gather(&timeline, time, &SecondsSource).unwrap();

        assert!(request.instruction.is_transition());
        assert_eq!(request.sources.len(), 2);
        let bg = request.instruction.background_track().unwrap();
        let fg = request.instruction.foreground_track().unwrap();
        assert_eq!(request.source_frame(bg).unwrap().pixel(0, 0)[0], 2);
        assert_eq!(request.source_frame(fg).unwrap().pixel(0, 0)[0], 0);
    }

    #[test]
    fn test_gather_outside_timeline() {
        let timeline = transition_timeline();
        assert!(RenderRequest::gather(&timeline, secs(60), &SecondsSource).is_none());
    }

    #[test]
    fn test_gather_missing_frames_leaves_sources_empty() {
        let timeline = transition_timeline();
        let request = RenderRequest::gather(&timeline, secs(1), &EmptySource).unwrap();
        assert!(request.sources.is_empty());
        assert_eq!(request.instruction.required_tracks.len(), 1);
    }

    #[test]
    fn test_state_cell_round_trip() {
        let cell = StateCell::default();
        let handle = RequestHandle::new(7, secs(1), cell.clone());
        assert_eq!(handle.state(), RequestState::Idle);
        assert!(cell.advance(RequestState::Rendering));
        assert_eq!(handle.state(), RequestState::Rendering);
        assert!(!handle.state().is_terminal());
        assert!(cell.advance(RequestState::Failed));
        assert!(handle.state().is_terminal());
        assert_eq!(handle.sequence(), 7);
    }

    #[test]
    fn test_failure_must_pass_through_rendering() {
        use RequestState::*;
        assert!(!Idle.can_advance_to(Failed));
        assert!(!Idle.can_advance_to(Finished));
        assert!(!Rendering.can_advance_to(Cancelled));
        assert!(!Finished.can_advance_to(Rendering));
        assert!(Idle.can_advance_to(Cancelled));

        let cell = StateCell::default();
        assert!(!cell.advance(Failed));
        assert_eq!(cell.get(), Idle);
        assert!(cell.advance(Cancelled));
        assert!(!cell.advance(Rendering));
        assert_eq!(cell.get(), Cancelled);
    }

    #[test]
    fn test_manual_request() {
        let instruction = RenderInstruction::passthrough(
            TimeRange::new(secs(0), secs(1)),
            TrackId(1),
        );
        let frame = Arc::new(FrameBuffer::new(2, 2));
        let request = RenderRequest::new(secs(0), instruction).with_source(TrackId(1), frame);
        assert!(request.source_frame(TrackId(1)).is_some());
        assert!(request.source_frame(TrackId(2)).is_none());
    }
}
