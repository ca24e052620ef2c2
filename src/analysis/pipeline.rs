// Runs recorded laps through section segmentation and the record queue

use std::collections::BTreeMap;

use itertools::Itertools;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::records::{LapCompletion, LapOutcome, RecordQueueHandle};
use super::sections::{SectionBoundary, detect_boundaries, segment_lap};
use super::zones::{Zone, lap_zones};
use crate::errors::TrackLensError;
use crate::telemetry::{LapRef, Session};
use crate::track_map::TrackDefinition;

/// Section outcome of one recorded lap
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LapAnalysis {
    pub track_id: String,
    pub lap: LapRef,
    pub lap_time: f32,
    pub is_valid: bool,
    pub outcome: LapOutcome,
    pub zones: Vec<Zone>,
}

/// Section boundaries keyed by track id
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackBoundaries(BTreeMap<String, Vec<SectionBoundary>>);

impl TrackBoundaries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, track_id: impl Into<String>, boundaries: Vec<SectionBoundary>) {
        self.0.insert(track_id.into(), boundaries);
    }

    /// Empty for a track without boundaries
    pub fn for_track(&self, track_id: &str) -> &[SectionBoundary] {
        self.0.get(track_id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn track_ids(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<(S, Vec<SectionBoundary>)> for TrackBoundaries {
    fn from_iter<I: IntoIterator<Item = (S, Vec<SectionBoundary>)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(id, b)| (id.into(), b)).collect())
    }
}

/// Resolves the boundaries of every track in `sessions`. The track definition applies
/// only to sessions on its own track; other tracks are detected on their fastest lap.
pub fn resolve_boundaries(
    sessions: &[Session],
    track: Option<&TrackDefinition>,
) -> TrackBoundaries {
    if let Some(track) = track
        && !sessions.iter().any(|s| s.info.track_id == track.track_id)
    {
        warn!(
            "Track definition {} matches none of the loaded sessions",
            track.track_id
        );
    }

    sessions
        .iter()
        .map(|s| s.info.track_id.as_str())
        .unique()
        .map(|track_id| {
            let boundaries = match track {
                Some(track) if track.track_id == track_id && !track.sections.is_empty() => {
                    track.sections.clone()
                }
                _ => detect_track_boundaries(sessions, track_id),
            };
            (track_id, boundaries)
        })
        .collect()
}

fn detect_track_boundaries(sessions: &[Session], track_id: &str) -> Vec<SectionBoundary> {
    let reference = sessions
        .iter()
        .filter(|s| s.info.track_id == track_id)
        .filter_map(|s| s.best_lap())
        .min_by(|a, b| {
            a.lap_time
                .partial_cmp(&b.lap_time)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    match reference {
        Some(lap) => {
            let boundaries = detect_boundaries(lap.samples());
            info!(
                "Detected {} sections on {} lap {} ({:.3}s)",
                boundaries.len(),
                track_id,
                lap.lap_number,
                lap.lap_time
            );
            boundaries
        }
        None => Vec::new(),
    }
}

/// Submits every complete lap in arrival order, segmented with its own track's
/// boundaries, and collects the outcomes
pub fn record_sessions(
    sessions: &[Session],
    boundaries: &TrackBoundaries,
    queue: &RecordQueueHandle,
) -> Result<Vec<LapAnalysis>, TrackLensError> {
    let mut analyses = Vec::new();
    for session in sessions {
        let track_boundaries = boundaries.for_track(&session.info.track_id);
        for lap in session.laps.iter().filter(|l| l.is_complete()) {
            let lap_ref = session.lap_ref(lap);
            let sections = segment_lap(lap.samples(), track_boundaries);
            debug!(
                "Session {} lap {}: {} sections",
                session.info.session_id,
                lap.lap_number,
                sections.len()
            );
            let outcome = queue.submit(LapCompletion {
                track_id: session.info.track_id.clone(),
                lap: lap_ref,
                lap_time: lap.lap_time,
                sector_times: lap.sector_times,
                sections,
            })?;
            analyses.push(LapAnalysis {
                track_id: session.info.track_id.clone(),
                lap: lap_ref,
                lap_time: lap.lap_time,
                is_valid: lap.is_valid,
                outcome,
                zones: lap_zones(lap.samples()),
            });
        }
    }
    Ok(analyses)
}
