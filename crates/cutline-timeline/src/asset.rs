//! Asset references handed in by the asset loader.
//!
//! Loading and decoding happen elsewhere. The timeline only reads the media
//! kind and time range of each track; frame sampling goes through
//! [`FrameSource`].

use cutline_core::{RationalTime, SharedFrameBuffer, Size, TimeRange};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::track::MediaKind;

/// Stable identifier of a loaded asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId(pub Uuid);

impl AssetId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AssetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One track inside an asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetTrack {
    /// Owning asset
    pub asset: AssetId,
    /// Index of the track within the asset
    pub index: u32,
    /// Media kind
    pub kind: MediaKind,
    /// Available media range, usually starting at zero
    pub time_range: TimeRange,
    /// Frame size for video tracks
    pub natural_size: Option<Size>,
}

impl AssetTrack {
    /// Intrinsic duration of the track.
    #[inline]
    pub fn duration(&self) -> RationalTime {
        self.time_range.duration
    }
}

/// A loaded media asset. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub name: String,
    pub tracks: Vec<AssetTrack>,
}

impl Asset {
    /// Create an asset with no tracks.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: AssetId::new(),
            name: name.into(),
            tracks: Vec::new(),
        }
    }

    /// Add a video track starting at zero.
    pub fn with_video(mut self, duration: RationalTime, size: Size) -> Self {
        self.push_track(MediaKind::Video, duration, Some(size));
        self
    }

    /// Add an audio track starting at zero.
    pub fn with_audio(mut self, duration: RationalTime) -> Self {
        self.push_track(MediaKind::Audio, duration, None);
        self
    }

    fn push_track(&mut self, kind: MediaKind, duration: RationalTime, natural_size: Option<Size>) {
        self.tracks.push(AssetTrack {
            asset: self.id,
            index: self.tracks.len() as u32,
            kind,
            time_range: TimeRange::new(RationalTime::ZERO, duration),
            natural_size,
        });
    }

    /// Tracks of one media kind, in asset order.
    pub fn tracks_of(&self, kind: MediaKind) -> impl Iterator<Item = &AssetTrack> {
        self.tracks.iter().filter(move |t| t.kind == kind)
    }

    /// First track of the given kind.
    pub fn first_track(&self, kind: MediaKind) -> Option<&AssetTrack> {
        self.tracks_of(kind).next()
    }

    /// Longest track duration.
    pub fn duration(&self) -> RationalTime {
        self.tracks
            .iter()
            .map(|t| t.time_range.end())
            .max()
            .unwrap_or(RationalTime::ZERO)
    }
}

/// Frame sampling capability of the asset loader.
///
/// Implementations must be safe to call from render worker threads.
pub trait FrameSource: Send + Sync {
    /// Decoded frame of `track` at source time `time`, if one is available.
    fn frame_at(&self, track: &AssetTrack, time: RationalTime) -> Option<SharedFrameBuffer>;
}
