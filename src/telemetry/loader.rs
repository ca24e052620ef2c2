use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::{Lap, Session, SessionInfo, TelemetrySample};
use crate::errors::TrackLensError;

/// Telemetry sample tagged with the lap it belongs to
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SampleRecord {
    pub lap_number: u32,
    #[serde(flatten)]
    pub sample: TelemetrySample,
}

/// Closes a lap with its timing
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LapCompletedRecord {
    pub lap_number: u32,
    pub lap_time: f32,
    #[serde(default)]
    pub sector_times: [Option<f32>; 3],
    #[serde(default = "default_valid")]
    pub is_valid: bool,
}

fn default_valid() -> bool {
    true
}

/// One line of a recorded telemetry file
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum TelemetryRecord {
    SessionStart(SessionInfo),
    Sample(SampleRecord),
    LapCompleted(LapCompletedRecord),
}

#[derive(Default)]
struct SessionBuilder {
    sessions: Vec<Session>,
    current: Option<Session>,
    lap_number: Option<u32>,
    samples: Vec<TelemetrySample>,
}

impl SessionBuilder {
    fn session(&mut self) -> &mut Session {
        self.current.get_or_insert_with(Session::default)
    }

    /// Pending samples without a completion record become an incomplete lap
    fn flush_incomplete_lap(&mut self) {
        if let Some(lap_number) = self.lap_number.take()
            && !self.samples.is_empty()
        {
            warn!("Lap {} ended without timing, keeping it as incomplete", lap_number);
            let samples = std::mem::take(&mut self.samples);
            self.session()
                .laps
                .push(Lap::new(lap_number, 0., [None; 3], false, samples));
        }
        self.samples.clear();
    }

    fn push(&mut self, record: TelemetryRecord) {
        match record {
            TelemetryRecord::SessionStart(info) => {
                self.flush_incomplete_lap();
                if let Some(session) = self.current.take() {
                    self.sessions.push(session);
                }
                self.current = Some(Session {
                    info,
                    laps: Vec::new(),
                });
            }
            TelemetryRecord::Sample(SampleRecord { lap_number, sample }) => {
                if self.lap_number.is_some_and(|current| current != lap_number) {
                    self.flush_incomplete_lap();
                }
                self.lap_number = Some(lap_number);
                self.samples.push(sample);
            }
            TelemetryRecord::LapCompleted(completed) => {
                if self
                    .lap_number
                    .is_some_and(|current| current != completed.lap_number)
                {
                    self.flush_incomplete_lap();
                }
                self.lap_number = None;
                let samples = std::mem::take(&mut self.samples);
                self.session().laps.push(Lap::new(
                    completed.lap_number,
                    completed.lap_time,
                    completed.sector_times,
                    completed.is_valid,
                    samples,
                ));
            }
        }
    }

    fn finish(mut self) -> Vec<Session> {
        self.flush_incomplete_lap();
        if let Some(session) = self.current.take() {
            self.sessions.push(session);
        }
        self.sessions
    }
}

/// Groups a stream of records into sessions and laps in arrival order
pub fn sessions_from_records(records: impl IntoIterator<Item = TelemetryRecord>) -> Vec<Session> {
    let mut builder = SessionBuilder::default();
    for record in records {
        builder.push(record);
    }
    builder.finish()
}

/// Loads every session of a JSON Lines telemetry file
pub fn load_sessions_jsonl(source_file: &Path) -> Result<Vec<Session>, TrackLensError> {
    if !source_file.exists() {
        return Err(TrackLensError::InvalidTelemetryFile {
            path: format!("{:?}", source_file),
        });
    }

    let records = serde_jsonlines::json_lines(source_file)
        .map_err(|e| TrackLensError::TelemetryLoaderError { source: e })?
        .collect::<Result<Vec<TelemetryRecord>, std::io::Error>>()
        .map_err(|e| TrackLensError::TelemetryLoaderError { source: e })?;

    let sessions = sessions_from_records(records);
    if sessions.is_empty() {
        return Err(TrackLensError::EmptyTelemetryFile {
            path: format!("{:?}", source_file),
        });
    }

    info!(
        "Loaded {:?}, found {} sessions with a total of {} laps",
        source_file,
        sessions.len(),
        sessions.iter().map(|s| s.laps.len()).sum::<usize>()
    );
    Ok(sessions)
}

/// Writes sessions back as JSON Lines, the format `load_sessions_jsonl` reads
pub fn write_sessions_jsonl(target_file: &Path, sessions: &[Session]) -> Result<(), TrackLensError> {
    let mut records = Vec::new();
    for session in sessions {
        records.push(TelemetryRecord::SessionStart(session.info.clone()));
        for lap in &session.laps {
            records.extend(lap.samples().iter().map(|sample| {
                TelemetryRecord::Sample(SampleRecord {
                    lap_number: lap.lap_number,
                    sample: sample.clone(),
                })
            }));
            if lap.is_complete() {
                records.push(TelemetryRecord::LapCompleted(LapCompletedRecord {
                    lap_number: lap.lap_number,
                    lap_time: lap.lap_time,
                    sector_times: lap.sector_times,
                    is_valid: lap.is_valid,
                }));
            }
        }
    }
    serde_jsonlines::write_json_lines(target_file, &records)
        .map_err(|e| TrackLensError::WriterError { source: e })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{PositionDataQuality, SessionType};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sample(lap_number: u32, position: f32) -> TelemetryRecord {
        TelemetryRecord::Sample(SampleRecord {
            lap_number,
            sample: TelemetrySample {
                normalized_position: Some(position),
                ..Default::default()
            },
        })
    }

    fn completed(lap_number: u32, lap_time: f32) -> TelemetryRecord {
        TelemetryRecord::LapCompleted(LapCompletedRecord {
            lap_number,
            lap_time,
            sector_times: [None; 3],
            is_valid: true,
        })
    }

    #[test]
    fn test_records_group_into_sessions_and_laps() {
        let sessions = sessions_from_records(vec![
            TelemetryRecord::SessionStart(SessionInfo {
                session_id: 1,
                track_id: "spa".to_string(),
                ..Default::default()
            }),
            sample(0, 0.0),
            sample(0, 0.5),
            completed(0, 120.0),
            sample(1, 0.0),
            sample(1, 0.2),
            TelemetryRecord::SessionStart(SessionInfo {
                session_id: 2,
                ..Default::default()
            }),
            sample(0, 0.1),
            sample(0, 0.9),
            completed(0, 118.0),
        ]);

        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].laps.len(), 2);
        assert_eq!(sessions[0].laps[0].lap_time, 120.0);
        assert_eq!(sessions[0].laps[0].samples().len(), 2);
        assert_eq!(
            sessions[0].laps[0].position_quality(),
            PositionDataQuality::Usable
        );
        assert!(!sessions[0].laps[1].is_complete());
        assert_eq!(sessions[1].info.session_id, 2);
        assert_eq!(sessions[1].laps.len(), 1);
    }

    #[test]
    fn test_samples_without_session_start_get_default_session() {
        let sessions = sessions_from_records(vec![sample(3, 0.0), sample(3, 1.0), completed(3, 90.0)]);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].info.track_id, "Unknown");
        assert_eq!(sessions[0].laps[0].lap_number, 3);
    }

    #[test]
    fn test_load_jsonl_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"SessionStart":{{"session_id":4,"track_id":"monza","car_id":"gt3","session_type":"Race"}}}}"#
        )
        .unwrap();
        writeln!(
            file,
            r#"{{"Sample":{{"lap_number":1,"time_offset":0.0,"normalized_position":0.0,"speed_mps":50.0,"throttle":1.0,"brake":0.0}}}}"#
        )
        .unwrap();
        writeln!(
            file,
            r#"{{"Sample":{{"lap_number":1,"time_offset":0.1,"normalized_position":0.01,"speed_mps":51.0,"throttle":1.0,"brake":0.0,"is_on_track":false}}}}"#
        )
        .unwrap();
        writeln!(
            file,
            r#"{{"LapCompleted":{{"lap_number":1,"lap_time":105.2,"sector_times":[35.0,34.0,36.2],"is_valid":false}}}}"#
        )
        .unwrap();
        file.flush().unwrap();

        let sessions = load_sessions_jsonl(file.path()).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].info.session_type, SessionType::Race);
        let lap = &sessions[0].laps[0];
        assert!(!lap.is_valid);
        assert_eq!(lap.sector_times, [Some(35.0), Some(34.0), Some(36.2)]);
        assert!(lap.samples()[0].is_on_track);
        assert!(!lap.samples()[1].is_on_track);
    }

    #[test]
    fn test_write_then_load_preserves_laps() {
        let sessions = sessions_from_records(vec![sample(1, 0.0), sample(1, 1.0), completed(1, 90.0)]);
        let file = NamedTempFile::new().unwrap();
        write_sessions_jsonl(file.path(), &sessions).unwrap();

        let loaded = load_sessions_jsonl(file.path()).unwrap();
        assert_eq!(loaded[0].laps.len(), 1);
        assert_eq!(loaded[0].laps[0].lap_time, 90.0);
    }

    #[test]
    fn test_missing_and_malformed_files() {
        assert!(matches!(
            load_sessions_jsonl(Path::new("/definitely/not/here.jsonl")),
            Err(TrackLensError::InvalidTelemetryFile { .. })
        ));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not json").unwrap();
        file.flush().unwrap();
        assert!(matches!(
            load_sessions_jsonl(file.path()),
            Err(TrackLensError::TelemetryLoaderError { .. })
        ));

        let empty = NamedTempFile::new().unwrap();
        assert!(matches!(
            load_sessions_jsonl(empty.path()),
            Err(TrackLensError::EmptyTelemetryFile { .. })
        ));
    }
}
