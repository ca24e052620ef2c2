// Alignment of labeled telemetry traces onto one shared resampled grid

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;
use serde::{Deserialize, Serialize};

use super::resampler::{ResampledPoint, resample_with_quality};
use crate::telemetry::{Lap, PositionDataQuality, Session, TelemetrySample};

pub const BEST_LABEL: &str = "best";
pub const MOST_RECENT_LABEL: &str = "most recent";

/// A labeled trace to overlay
#[derive(Clone, Debug)]
pub struct CompareEntry<'a> {
    pub label: String,
    pub samples: &'a [TelemetrySample],
    pub quality: PositionDataQuality,
}

impl<'a> CompareEntry<'a> {
    pub fn new(label: impl Into<String>, samples: &'a [TelemetrySample]) -> Self {
        Self {
            label: label.into(),
            samples,
            quality: PositionDataQuality::classify(samples),
        }
    }

    pub fn from_lap(label: impl Into<String>, lap: &'a Lap) -> Self {
        Self {
            label: label.into(),
            samples: lap.samples(),
            quality: lap.position_quality(),
        }
    }
}

/// A trace resampled onto the shared grid
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AlignedDataset {
    pub label: String,
    /// Lap number the trace came from, when it came from a session lap
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lap_number: Option<u32>,
    pub points: Vec<ResampledPoint>,
}

/// Resamples at most `max_entries` entries to the same `target_count` so every
/// dataset has `target_count + 1` points aligned by normalized progress.
pub fn compare(
    entries: &[CompareEntry<'_>],
    max_entries: usize,
    target_count: usize,
) -> Vec<AlignedDataset> {
    if entries.len() > max_entries {
        debug!(
            "Comparing first {} of {} entries",
            max_entries,
            entries.len()
        );
    }
    entries
        .iter()
        .take(max_entries)
        .map(|entry| AlignedDataset {
            label: entry.label.clone(),
            lap_number: None,
            points: resample_with_quality(entry.samples, entry.quality, target_count),
        })
        .collect()
}

/// Overlays the best lap of a session (first) with its most recent lap (second).
/// When both are the same lap the resampled buffer is reused for the second entry.
pub fn compare_best_and_most_recent(session: &Session, target_count: usize) -> Vec<AlignedDataset> {
    let (Some(best), Some(most_recent)) = (session.best_lap(), session.most_recent_lap()) else {
        debug!(
            "Session {} has no complete laps to compare",
            session.info.session_id
        );
        return Vec::new();
    };

    let best_dataset = dataset_for_lap(BEST_LABEL, best, target_count);
    let most_recent_dataset = if std::ptr::eq(best, most_recent) {
        AlignedDataset {
            label: MOST_RECENT_LABEL.to_string(),
            ..best_dataset.clone()
        }
    } else {
        dataset_for_lap(MOST_RECENT_LABEL, most_recent, target_count)
    };
    vec![best_dataset, most_recent_dataset]
}

/// Overlays the best laps of up to `max_entries` sessions, labeled by session
pub fn compare_sessions(
    sessions: &[Session],
    max_entries: usize,
    target_count: usize,
) -> Vec<AlignedDataset> {
    let entries: Vec<(String, &Lap)> = sessions
        .iter()
        .filter_map(|session| {
            session.best_lap().map(|lap| {
                (
                    format!("session {} ({:.3}s)", session.info.session_id, lap.lap_time),
                    lap,
                )
            })
        })
        .collect();
    let compare_entries: Vec<CompareEntry<'_>> = entries
        .iter()
        .map(|(label, lap)| CompareEntry::from_lap(label.clone(), lap))
        .collect();

    compare(&compare_entries, max_entries, target_count)
        .into_iter()
        .zip(entries.iter())
        .map(|(dataset, (_, lap))| AlignedDataset {
            lap_number: Some(lap.lap_number),
            ..dataset
        })
        .collect()
}

fn dataset_for_lap(label: &str, lap: &Lap, target_count: usize) -> AlignedDataset {
    AlignedDataset {
        label: label.to_string(),
        lap_number: Some(lap.lap_number),
        points: resample_with_quality(lap.samples(), lap.position_quality(), target_count),
    }
}

/// Token identifying one comparison or render request
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestToken(u64);

/// Issues request tokens so results of superseded requests can be dropped
#[derive(Clone, Debug, Default)]
pub struct RequestTracker {
    latest: Arc<AtomicU64>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new request, superseding every earlier one
    pub fn begin(&self) -> RequestToken {
        RequestToken(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.latest.load(Ordering::SeqCst) == token.0
    }

    /// Hands back `result` only when its request has not been superseded
    pub fn accept<T>(&self, token: RequestToken, result: T) -> Option<T> {
        if self.is_current(token) {
            Some(result)
        } else {
            debug!("Dropping stale result for request {:?}", token);
            None
        }
    }
}
