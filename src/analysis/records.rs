// Best time records per (track, section) and performance tier classification

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::sections::{Section, SectionKind};
use crate::config::AnalysisConfig;
use crate::errors::TrackLensError;
use crate::telemetry::LapRef;

/// Qualitative bucket of a section time relative to the record
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceTier {
    /// No record existed for the section
    First,
    Record,
    Excellent,
    Good,
    NeedsImprovement,
}

impl PerformanceTier {
    pub fn label(&self) -> &'static str {
        match self {
            PerformanceTier::First => "first",
            PerformanceTier::Record => "record",
            PerformanceTier::Excellent => "excellent",
            PerformanceTier::Good => "good",
            PerformanceTier::NeedsImprovement => "needs improvement",
        }
    }
}

/// Ratio bounds separating the tiers
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TierThresholds {
    /// Ratios below this (and above 1.0) are excellent
    pub excellent: f32,
    /// Ratios below this (and at least `excellent`) are good
    pub good: f32,
}

impl Default for TierThresholds {
    fn default() -> Self {
        AnalysisConfig::default().into()
    }
}

impl From<AnalysisConfig> for TierThresholds {
    fn from(config: AnalysisConfig) -> Self {
        Self {
            excellent: config.tier_excellent,
            good: config.tier_good,
        }
    }
}

impl From<&AnalysisConfig> for TierThresholds {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            excellent: config.tier_excellent,
            good: config.tier_good,
        }
    }
}

impl TierThresholds {
    /// Tier of `ratio = section time / record time`
    pub fn classify_ratio(&self, ratio: f32) -> PerformanceTier {
        if ratio <= 1.0 {
            PerformanceTier::Record
        } else if ratio < self.excellent {
            PerformanceTier::Excellent
        } else if ratio < self.good {
            PerformanceTier::Good
        } else {
            PerformanceTier::NeedsImprovement
        }
    }

    /// Tier of `time` against an optional existing record
    pub fn classify(&self, time: f32, record: Option<&SectionRecord>) -> PerformanceTier {
        match record {
            None => PerformanceTier::First,
            Some(record) if record.best_time <= 0. => {
                if time <= record.best_time {
                    PerformanceTier::Record
                } else {
                    PerformanceTier::NeedsImprovement
                }
            }
            Some(record) => self.classify_ratio(time / record.best_time),
        }
    }
}

/// Best known time for one section of one track
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SectionRecord {
    pub section_id: u32,
    #[serde(rename = "type")]
    pub kind: SectionKind,
    pub best_time: f32,
    pub best_avg_speed: f32,
    pub best_max_speed: f32,
    /// Lap that set the record
    pub lap: LapRef,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RecordOutcome {
    /// The section had no record yet
    First,
    /// The time strictly beat the previous record
    Improved { previous_best: f32 },
    /// The record stands (ties included)
    Kept,
}

impl RecordOutcome {
    pub fn is_new_record(&self) -> bool {
        !matches!(self, RecordOutcome::Kept)
    }
}

/// Section statistics of a lap together with how they compare to the record
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SectionResult {
    pub section: Section,
    pub tier: PerformanceTier,
    /// Seconds over (positive) or under the record that existed before this lap
    pub delta_to_record: Option<f32>,
    pub new_record: bool,
}

/// Best lap and sector times of a track
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct PersonalRecords {
    pub best_lap_time: Option<f32>,
    pub best_lap: Option<LapRef>,
    pub best_sector_times: [Option<f32>; 3],
}

/// Which personal records a lap improved
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct PersonalRecordsBroken {
    pub lap: bool,
    /// 1-based sector numbers
    pub sectors: Vec<u8>,
}

/// Outcome of recording one completed lap
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct LapOutcome {
    pub sections: Vec<SectionResult>,
    pub personal_records: PersonalRecordsBroken,
}

/// Record table owned by a single writer. At most one record exists per (track, section).
#[derive(Debug, Default, Clone)]
pub struct SectionRecordStore {
    section_records: HashMap<(String, u32), SectionRecord>,
    personal_records: HashMap<String, PersonalRecords>,
}

/// Replaces `current` when `candidate` strictly beats it
fn improve(current: &mut Option<f32>, candidate: f32) -> bool {
    if candidate <= 0. {
        return false;
    }
    match current {
        Some(best) if candidate >= *best => false,
        _ => {
            *current = Some(candidate);
            true
        }
    }
}

impl SectionRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with records loaded from elsewhere; later duplicates are ignored
    pub fn with_records(track_id: &str, records: impl IntoIterator<Item = SectionRecord>) -> Self {
        let mut store = Self::new();
        for record in records {
            let key = (track_id.to_string(), record.section_id);
            if store.section_records.contains_key(&key) {
                warn!(
                    "Ignoring duplicate record for section {} of {}",
                    record.section_id, track_id
                );
                continue;
            }
            store.section_records.insert(key, record);
        }
        store
    }

    pub fn get(&self, track_id: &str, section_id: u32) -> Option<&SectionRecord> {
        self.section_records
            .get(&(track_id.to_string(), section_id))
    }

    /// Records of a track ordered by section id
    pub fn records_for_track(&self, track_id: &str) -> Vec<SectionRecord> {
        let mut records: Vec<SectionRecord> = self
            .section_records
            .iter()
            .filter(|((track, _), _)| track == track_id)
            .map(|(_, record)| record.clone())
            .collect();
        records.sort_by_key(|r| r.section_id);
        records
    }

    pub fn personal_records(&self, track_id: &str) -> Option<&PersonalRecords> {
        self.personal_records.get(track_id)
    }

    /// Replaces the record only when `section.time` strictly improves it
    pub fn compare_and_update(
        &mut self,
        track_id: &str,
        section: &Section,
        lap: LapRef,
    ) -> RecordOutcome {
        let key = (track_id.to_string(), section.section_id);
        let candidate = SectionRecord {
            section_id: section.section_id,
            kind: section.kind,
            best_time: section.time,
            best_avg_speed: section.avg_speed,
            best_max_speed: section.max_speed,
            lap,
        };

        match self.section_records.get_mut(&key) {
            None => {
                debug!(
                    "First record for section {} of {}: {:.3}s",
                    section.section_id, track_id, section.time
                );
                self.section_records.insert(key, candidate);
                RecordOutcome::First
            }
            Some(current) if section.time < current.best_time => {
                let previous_best = current.best_time;
                info!(
                    "Section {} ({:?}) record on {}: {:.3}s (was {:.3}s)",
                    section.section_id, section.kind, track_id, section.time, previous_best
                );
                *current = candidate;
                RecordOutcome::Improved { previous_best }
            }
            Some(_) => RecordOutcome::Kept,
        }
    }

    /// Classifies every section of a lap against the existing records, then updates them
    pub fn apply_sections(
        &mut self,
        track_id: &str,
        lap: LapRef,
        sections: &[Section],
        thresholds: TierThresholds,
    ) -> Vec<SectionResult> {
        sections
            .iter()
            .map(|section| {
                let existing = self.get(track_id, section.section_id);
                let tier = thresholds.classify(section.time, existing);
                let delta_to_record = existing.map(|r| section.time - r.best_time);
                let outcome = self.compare_and_update(track_id, section, lap);
                SectionResult {
                    section: section.clone(),
                    tier,
                    delta_to_record,
                    new_record: outcome.is_new_record(),
                }
            })
            .collect()
    }

    /// Updates best lap and sector times with the same strict improvement rule
    pub fn update_personal_records(
        &mut self,
        track_id: &str,
        lap: LapRef,
        lap_time: f32,
        sector_times: [Option<f32>; 3],
    ) -> PersonalRecordsBroken {
        let records = self
            .personal_records
            .entry(track_id.to_string())
            .or_default();
        let mut broken = PersonalRecordsBroken::default();

        if improve(&mut records.best_lap_time, lap_time) {
            records.best_lap = Some(lap);
            broken.lap = true;
        }
        for (i, sector_time) in sector_times.iter().enumerate() {
            if let Some(time) = sector_time
                && improve(&mut records.best_sector_times[i], *time)
            {
                broken.sectors.push(i as u8 + 1);
            }
        }

        if broken.lap || !broken.sectors.is_empty() {
            info!(
                "New personal records on {}: lap={} sectors={:?}",
                track_id, broken.lap, broken.sectors
            );
        }
        broken
    }
}

/// A lap completion event routed through the record queue
#[derive(Clone, Debug)]
pub struct LapCompletion {
    pub track_id: String,
    pub lap: LapRef,
    pub lap_time: f32,
    pub sector_times: [Option<f32>; 3],
    pub sections: Vec<Section>,
}

enum RecordCommand {
    Complete(LapCompletion, Sender<LapOutcome>),
    Snapshot(String, Sender<Vec<SectionRecord>>),
}

/// Cloneable submission side of a `RecordUpdateQueue`
#[derive(Clone)]
pub struct RecordQueueHandle {
    sender: Sender<RecordCommand>,
}

impl RecordQueueHandle {
    /// Submits a completed lap and waits for its outcome. Completions are applied
    /// one at a time in arrival order.
    pub fn submit(&self, completion: LapCompletion) -> Result<LapOutcome, TrackLensError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.sender
            .send(RecordCommand::Complete(completion, reply_tx))
            .map_err(|_| TrackLensError::RecordQueueClosed)?;
        reply_rx
            .recv()
            .map_err(|_| TrackLensError::RecordQueueClosed)
    }

    /// Current records of a track, consistent with every completion submitted before
    pub fn snapshot(&self, track_id: &str) -> Result<Vec<SectionRecord>, TrackLensError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.sender
            .send(RecordCommand::Snapshot(track_id.to_string(), reply_tx))
            .map_err(|_| TrackLensError::RecordQueueClosed)?;
        reply_rx
            .recv()
            .map_err(|_| TrackLensError::RecordQueueClosed)
    }
}

/// Serializes record updates by giving a worker thread sole ownership of the store
pub struct RecordUpdateQueue {
    handle: RecordQueueHandle,
    worker: JoinHandle<SectionRecordStore>,
}

impl RecordUpdateQueue {
    pub fn spawn(store: SectionRecordStore, thresholds: TierThresholds) -> Self {
        let (sender, receiver) = mpsc::channel::<RecordCommand>();
        let worker = thread::spawn(move || run_record_worker(store, thresholds, receiver));
        Self {
            handle: RecordQueueHandle { sender },
            worker,
        }
    }

    pub fn handle(&self) -> RecordQueueHandle {
        self.handle.clone()
    }

    pub fn submit(&self, completion: LapCompletion) -> Result<LapOutcome, TrackLensError> {
        self.handle.submit(completion)
    }

    /// Stops accepting work once every outstanding handle is dropped and returns the store
    pub fn shutdown(self) -> Result<SectionRecordStore, TrackLensError> {
        drop(self.handle);
        self.worker
            .join()
            .map_err(|_| TrackLensError::RecordQueueClosed)
    }
}

/// Returns false when the requester stopped waiting for the reply
fn send_reply<T>(reply: Sender<T>, value: T, what: &str) -> bool {
    if reply.send(value).is_err() {
        warn!("{} dropped, requester is gone", what);
        return false;
    }
    true
}

fn run_record_worker(
    mut store: SectionRecordStore,
    thresholds: TierThresholds,
    receiver: Receiver<RecordCommand>,
) -> SectionRecordStore {
    for command in receiver {
        match command {
            RecordCommand::Complete(completion, reply) => {
                let sections = store.apply_sections(
                    &completion.track_id,
                    completion.lap,
                    &completion.sections,
                    thresholds,
                );
                let personal_records = store.update_personal_records(
                    &completion.track_id,
                    completion.lap,
                    completion.lap_time,
                    completion.sector_times,
                );
                send_reply(
                    reply,
                    LapOutcome {
                        sections,
                        personal_records,
                    },
                    &format!("Lap outcome for {:?}", completion.lap),
                );
            }
            RecordCommand::Snapshot(track_id, reply) => {
                let records = store.records_for_track(&track_id);
                send_reply(reply, records, &format!("Record snapshot of {}", track_id));
            }
        }
    }
    debug!("Record update queue drained");
    store
}
