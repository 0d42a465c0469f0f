//! Timeline documents: the JSON hand-off to an exporter.
//!
//! Files carry a format version. Only the current version is accepted;
//! anything else is rejected before the body is parsed.

use serde::{Deserialize, Serialize};

use crate::audio::AudioMix;
use crate::builder::Timeline;
use crate::composition::Composition;
use crate::error::{Result, ValidationError};
use crate::instruction::InstructionSet;

/// Format version written and accepted by this build.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineDocument {
    pub version: u32,
    pub composition: Composition,
    pub instructions: InstructionSet,
    pub audio_mix: AudioMix,
    /// Crate version of the writer, informational only
    pub app_version: String,
}

#[derive(Deserialize)]
struct VersionProbe {
    version: Option<u32>,
}

impl TimelineDocument {
    pub fn new(timeline: Timeline) -> Self {
        Self {
            version: FORMAT_VERSION,
            composition: timeline.composition,
            instructions: timeline.instructions,
            audio_mix: timeline.audio_mix,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn into_timeline(self) -> Timeline {
        Timeline {
            composition: self.composition,
            instructions: self.instructions,
            audio_mix: self.audio_mix,
        }
    }

    /// Serialize to JSON bytes.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| {
            ValidationError::Serialization(format!("Failed to serialize timeline: {}", e))
        })
    }

    /// Parse JSON bytes, rejecting documents of another format version.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let probe: VersionProbe = serde_json::from_slice(data)
            .map_err(|e| ValidationError::Serialization(format!("Invalid JSON: {e}")))?;
        match probe.version {
            Some(FORMAT_VERSION) => {}
            Some(found) => {
                return Err(ValidationError::Serialization(format!(
                    "unsupported timeline format version {found}, expected {FORMAT_VERSION}"
                )))
            }
            None => {
                return Err(ValidationError::Serialization(
                    "timeline document has no format version".into(),
                ))
            }
        }
        serde_json::from_slice(data)
            .map_err(|e| ValidationError::Serialization(format!("Failed to parse timeline: {e}")))
    }

    pub fn save_to_file(&self, path: &std::path::Path) -> Result<()> {
        let data = self.to_json()?;
        std::fs::write(path, data)?;
        Ok(())
    }

    pub fn load_from_file(path: &std::path::Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_json(&data)
    }
}
