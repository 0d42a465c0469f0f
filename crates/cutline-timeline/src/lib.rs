//! Cutline Timeline - Timeline data model and builder
//!
//! Implements the timeline side of the engine:
//! - Assets, tracks and segments laid out on a composition
//! - Sequencing: concatenation, scaled concatenation, overlapped transitions
//! - Audio layout with crossfade volume ramps
//! - Render instructions consumed by the frame compositor
//! - Versioned JSON timeline documents

pub mod asset;
pub mod audio;
pub mod builder;
pub mod composition;
pub mod document;
pub mod error;
pub mod instruction;
pub mod track;

pub use asset::{Asset, AssetId, AssetTrack, FrameSource};
pub use audio::{AudioMix, VolumeRamp};
pub use builder::{Timeline, TimelineBuilder};
pub use composition::{Composition, TimelineConfig};
pub use document::TimelineDocument;
pub use error::{Result, ValidationError};
pub use instruction::{InstructionSet, RenderInstruction};
pub use track::{MediaKind, Segment, Track, TrackId};
