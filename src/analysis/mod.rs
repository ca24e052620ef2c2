// Lap analysis: resampling, section statistics, zones, records, comparisons and history

pub mod comparator;
pub mod consistency;
pub mod history;
pub mod pipeline;
pub mod records;
pub mod resampler;
pub mod sections;
pub mod zones;

pub use comparator::{
    AlignedDataset, CompareEntry, RequestToken, RequestTracker, compare,
    compare_best_and_most_recent, compare_sessions,
};
pub use consistency::{ConsistencyReport, consistency_report};
pub use history::{HistoryReport, SessionHistory, history_report};
pub use pipeline::{LapAnalysis, TrackBoundaries, record_sessions, resolve_boundaries};
pub use records::{
    LapCompletion, LapOutcome, PerformanceTier, RecordQueueHandle, RecordUpdateQueue,
    SectionRecord, SectionRecordStore, SectionResult, TierThresholds,
};
pub use resampler::{ResampledPoint, resample, resample_with_quality};
pub use sections::{
    Section, SectionBoundary, SectionKind, TurnDirection, detect_boundaries, segment_lap,
};
pub use zones::{Zone, ZoneKind, find_zones, lap_zones};
