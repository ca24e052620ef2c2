// Analysis configuration shared by the CLI, the record tracker and the track viewer

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::errors::TrackLensError;

const CONFIG_DIR_NAME: &str = "tracklens";
const CONFIG_FILE_NAME: &str = "config.json";

pub const DEFAULT_RESAMPLE_POINTS: usize = 100;
pub const DEFAULT_HIT_RADIUS_PX: f32 = 50.0;
pub const DEFAULT_TIER_EXCELLENT: f32 = 1.02;
pub const DEFAULT_TIER_GOOD: f32 = 1.05;
pub const DEFAULT_MAX_COMPARE_ENTRIES: usize = 2;
pub const DEFAULT_PADDING_PX: f32 = 20.0;

/// Tunable parameters for comparisons, tier classification and track map rendering
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Number of intervals the resampler divides a lap into (output has one more point)
    pub resample_points: usize,
    /// Picker hit radius at native resolution, scaled by the surface pixel ratio
    pub hit_radius_px: f32,
    /// Upper (exclusive) ratio bound of the "excellent" tier
    pub tier_excellent: f32,
    /// Upper (exclusive) ratio bound of the "good" tier
    pub tier_good: f32,
    /// Maximum number of traces overlaid by the comparator
    pub max_compare_entries: usize,
    /// Padding between the drawing surface border and the track map
    pub padding_px: f32,
    /// Whether data points follow the background rotation of portrait map images
    pub rotate_data_points: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            resample_points: DEFAULT_RESAMPLE_POINTS,
            hit_radius_px: DEFAULT_HIT_RADIUS_PX,
            tier_excellent: DEFAULT_TIER_EXCELLENT,
            tier_good: DEFAULT_TIER_GOOD,
            max_compare_entries: DEFAULT_MAX_COMPARE_ENTRIES,
            padding_px: DEFAULT_PADDING_PX,
            rotate_data_points: false,
        }
    }
}

impl AnalysisConfig {
    /// Loads the config file from the user config directory, `None` when absent or unreadable
    pub fn from_local_file() -> Option<Self> {
        let config_path = dirs::config_dir()?
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME);
        Self::from_path(&config_path)
    }

    pub fn from_path(config_path: &std::path::Path) -> Option<Self> {
        if !config_path.exists() {
            debug!("No config file at {:?}, using defaults", config_path);
            return None;
        }

        let file = match std::fs::File::open(config_path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not open config file {:?}: {}", config_path, e);
                return None;
            }
        };
        match serde_json::from_reader(file) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!("Could not parse config file {:?}: {}", config_path, e);
                None
            }
        }
    }

    pub fn save(&self) -> Result<(), TrackLensError> {
        let config_path = dirs::config_dir()
            .ok_or(TrackLensError::NoConfigDir)?
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME);
        self.save_to(&config_path)
    }

    pub fn save_to(&self, config_path: &std::path::Path) -> Result<(), TrackLensError> {
        if let Some(parent) = config_path.parent()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| TrackLensError::ConfigIOError { source: e })?;
        }

        let file = std::fs::File::create(config_path)
            .map_err(|e| TrackLensError::ConfigIOError { source: e })?;
        serde_json::to_writer_pretty(file, self)
            .map_err(|e| TrackLensError::ConfigSerializeError { source: e })
    }
}
