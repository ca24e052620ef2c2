// Library interface for tracklens
// This allows integration tests and benches to access internal modules

pub mod analysis;
pub mod config;
pub mod errors;
pub mod telemetry;
pub mod track_map;
pub mod ui;

// Re-export commonly used types
pub use analysis::{AlignedDataset, PerformanceTier, SectionRecordStore, compare};
pub use config::AnalysisConfig;
pub use errors::TrackLensError;
pub use telemetry::{Lap, PositionDataQuality, Session, SessionInfo, TelemetrySample};
pub use track_map::{DrawRect, PointPicker, TrackDefinition};
