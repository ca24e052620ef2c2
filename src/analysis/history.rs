// Session history of one track: race pace, off-tracks and the best session

use log::debug;
use serde::{Deserialize, Serialize};

use crate::telemetry::{Lap, Session, SessionType};

pub const DEFAULT_HISTORY_SESSIONS: usize = 3;
/// Sessions with fewer complete laps are not part of the history
pub const MIN_HISTORY_LAPS: usize = 3;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PacePoint {
    pub lap_number: u32,
    pub lap_time: f32,
    pub is_valid: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionHistory {
    pub session_id: u64,
    pub start_time_ms: u64,
    pub session_type: SessionType,
    pub best_lap_time: Option<f32>,
    /// Complete laps only
    pub total_laps: usize,
    pub valid_laps: usize,
    /// Complete laps invalidated by leaving the track
    pub off_track_laps: usize,
    /// Mean sample speed over the complete laps
    pub avg_speed_mps: Option<f32>,
    /// Every complete lap in lap order
    pub race_pace: Vec<PacePoint>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HistoryReport {
    pub track_id: String,
    /// Oldest session first
    pub sessions: Vec<SessionHistory>,
    /// Session with the lowest best lap time
    pub best_session: Option<u64>,
}

/// History of the last `max_sessions` sessions on `track_id` with at least
/// `MIN_HISTORY_LAPS` complete laps. `None` when no session qualifies.
pub fn history_report(
    sessions: &[Session],
    track_id: &str,
    max_sessions: usize,
) -> Option<HistoryReport> {
    let qualifying: Vec<&Session> = sessions
        .iter()
        .filter(|s| s.info.track_id == track_id)
        .filter(|s| s.laps.iter().filter(|l| l.is_complete()).count() >= MIN_HISTORY_LAPS)
        .collect();
    if qualifying.is_empty() {
        debug!("No session on {} has {} complete laps", track_id, MIN_HISTORY_LAPS);
        return None;
    }

    let skip = qualifying.len().saturating_sub(max_sessions);
    let history: Vec<SessionHistory> = qualifying
        .into_iter()
        .skip(skip)
        .map(session_history)
        .collect();

    let best_session = history
        .iter()
        .filter_map(|h| h.best_lap_time.map(|t| (h.session_id, t)))
        .fold(None, |best: Option<(u64, f32)>, (id, time)| match best {
            Some((_, best_time)) if best_time <= time => best,
            _ => Some((id, time)),
        })
        .map(|(id, _)| id);

    Some(HistoryReport {
        track_id: track_id.to_string(),
        sessions: history,
        best_session,
    })
}

fn session_history(session: &Session) -> SessionHistory {
    let mut complete: Vec<&Lap> = session.laps.iter().filter(|l| l.is_complete()).collect();
    complete.sort_by_key(|l| l.lap_number);

    let valid_laps = complete.iter().filter(|l| l.is_valid).count();
    let lap_speeds: Vec<f32> = complete
        .iter()
        .filter(|l| !l.samples().is_empty())
        .map(|l| l.samples().iter().map(|s| s.speed_mps).sum::<f32>() / l.samples().len() as f32)
        .collect();
    let avg_speed_mps = if lap_speeds.is_empty() {
        None
    } else {
        Some(lap_speeds.iter().sum::<f32>() / lap_speeds.len() as f32)
    };

    SessionHistory {
        session_id: session.info.session_id,
        start_time_ms: session.info.start_time_ms,
        session_type: session.info.session_type,
        best_lap_time: session.best_lap().map(|l| l.lap_time),
        total_laps: complete.len(),
        valid_laps,
        off_track_laps: complete.len() - valid_laps,
        avg_speed_mps,
        race_pace: complete
            .iter()
            .map(|l| PacePoint {
                lap_number: l.lap_number,
                lap_time: l.lap_time,
                is_valid: l.is_valid,
            })
            .collect(),
    }
}
