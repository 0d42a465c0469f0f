//! Render instructions: which tracks contribute to each span of the timeline.

use cutline_core::{RationalTime, TimeRange};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::debug;

use crate::composition::Composition;
use crate::track::{MediaKind, TrackId};

/// Directive for every output frame inside `time_range`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderInstruction {
    pub time_range: TimeRange,
    /// Contributing tracks, oldest first
    pub required_tracks: SmallVec<[TrackId; 2]>,
    /// Set when a single track can be shown unmodified
    pub passthrough: Option<TrackId>,
}

impl RenderInstruction {
    /// A span showing one track as-is.
    pub fn passthrough(time_range: TimeRange, track: TrackId) -> Self {
        Self {
            time_range,
            required_tracks: SmallVec::from_slice(&[track]),
            passthrough: Some(track),
        }
    }

    /// A span blending `tracks` (oldest first).
    pub fn transition(time_range: TimeRange, tracks: &[TrackId]) -> Self {
        Self {
            time_range,
            required_tracks: SmallVec::from_slice(tracks),
            passthrough: None,
        }
    }

    pub fn is_transition(&self) -> bool {
        self.required_tracks.len() > 1
    }

    /// Track drawn first (bottom of the stack).
    pub fn background_track(&self) -> Option<TrackId> {
        self.required_tracks.first().copied()
    }

    /// Track animated in during a transition.
    pub fn foreground_track(&self) -> Option<TrackId> {
        if self.is_transition() {
            self.required_tracks.last().copied()
        } else {
            None
        }
    }

    /// Progress through the span at `time`, clamped to `[0, 1]`.
    pub fn progress(&self, time: RationalTime) -> f64 {
        self.time_range.fraction_of(time).clamp(0.0, 1.0)
    }
}

/// Time-ordered, non-overlapping render instructions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionSet {
    instructions: Vec<RenderInstruction>,
}

impl InstructionSet {
    /// Derive instructions by sweeping every video segment of `composition`.
    ///
    /// Each elementary span between segment boundaries becomes a passthrough
    /// when one track is active and a transition when several are. Spans with
    /// no active track are skipped, and adjacent spans with the same tracks
    /// are merged.
    pub fn from_composition(composition: &Composition) -> Self {
        let mut tracks: Vec<_> = composition.tracks_of(MediaKind::Video).collect();
        tracks.sort_by_key(|t| t.id);

        let mut bounds: Vec<RationalTime> = tracks
            .iter()
            .flat_map(|t| t.segments())
            .filter(|s| !s.destination.is_empty())
            .flat_map(|s| [s.destination_start(), s.destination_end()])
            .collect();
        bounds.sort();
        bounds.dedup();

        let mut instructions: Vec<RenderInstruction> = Vec::new();
        for pair in bounds.windows(2) {
            let span = TimeRange::from_start_end(pair[0], pair[1]);
            let active: SmallVec<[TrackId; 2]> = tracks
                .iter()
                .filter(|t| t.segment_at(span.start).is_some())
                .map(|t| t.id)
                .collect();

            let instruction = match active.as_slice() {
                [] => continue,
                [only] => RenderInstruction::passthrough(span, *only),
                many => RenderInstruction::transition(span, many),
            };

            match instructions.last_mut() {
                Some(prev)
                    if prev.time_range.end() == span.start
                        && prev.required_tracks == instruction.required_tracks =>
                {
                    prev.time_range = TimeRange::from_start_end(prev.time_range.start, span.end());
                }
                _ => instructions.push(instruction),
            }
        }

        debug!(count = instructions.len(), "render instructions built");
        Self { instructions }
    }

    /// Wrap hand-built instructions, ordering them by start time.
    pub fn from_instructions(mut instructions: Vec<RenderInstruction>) -> Self {
        instructions.sort_by_key(|i| i.time_range.start);
        Self { instructions }
    }

    /// Instruction covering `time`.
    pub fn instruction_at(&self, time: RationalTime) -> Option<&RenderInstruction> {
        let index = self
            .instructions
            .partition_point(|i| i.time_range.end() <= time);
        self.instructions
            .get(index)
            .filter(|i| i.time_range.contains(time))
    }

    pub fn iter(&self) -> impl Iterator<Item = &RenderInstruction> {
        self.instructions.iter()
    }

    pub fn as_slice(&self) -> &[RenderInstruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn transitions(&self) -> impl Iterator<Item = &RenderInstruction> {
        self.instructions.iter().filter(|i| i.is_transition())
    }

    pub fn passthroughs(&self) -> impl Iterator<Item = &RenderInstruction> {
        self.instructions.iter().filter(|i| !i.is_transition())
    }
}
