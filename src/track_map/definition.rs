// Per-track section boundaries and map reference

use std::collections::HashSet;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use super::projection::MapReference;
use crate::analysis::SectionBoundary;
use crate::errors::TrackLensError;

/// Everything known about a track ahead of analysing laps on it
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TrackDefinition {
    /// Unique track identifier, matches `SessionInfo::track_id`
    pub track_id: String,
    /// Human-readable track name (e.g., "Silverstone GP")
    #[serde(default)]
    pub track_name: Option<String>,
    /// Section delimiters in lap order. Empty means sections are detected from a lap.
    #[serde(default)]
    pub sections: Vec<SectionBoundary>,
    /// Background the map is fitted to
    #[serde(default)]
    pub map_reference: Option<MapReference>,
}

impl TrackDefinition {
    pub fn new(track_id: impl Into<String>) -> Self {
        Self {
            track_id: track_id.into(),
            track_name: None,
            sections: Vec::new(),
            map_reference: None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.track_name.as_deref().unwrap_or(&self.track_id)
    }

    /// Section ids are unique and every range is non-empty
    pub fn validate(&self) -> Result<(), TrackLensError> {
        let mut ids = HashSet::new();
        for section in &self.sections {
            if !ids.insert(section.section_id) {
                return Err(TrackLensError::TrackDefinitionValidationError {
                    reason: format!("Duplicate section id: {}", section.section_id),
                });
            }
            if section.start_index >= section.end_index {
                return Err(TrackLensError::TrackDefinitionValidationError {
                    reason: format!(
                        "Section {} starts at {} but ends at {}",
                        section.section_id, section.start_index, section.end_index
                    ),
                });
            }
        }
        if let Some(MapReference::Image { width, height }) = self.map_reference
            && (width == 0 || height == 0)
        {
            return Err(TrackLensError::TrackDefinitionValidationError {
                reason: format!("Map image has no area: {}x{}", width, height),
            });
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, TrackLensError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TrackLensError::TrackDefinitionIOError { source: e })?;
        let definition: TrackDefinition = serde_json::from_str(&content)
            .map_err(|e| TrackLensError::TrackDefinitionParseError { source: e })?;
        definition.validate()?;
        info!(
            "Loaded track {} with {} sections",
            definition.display_name(),
            definition.sections.len()
        );
        Ok(definition)
    }
}
