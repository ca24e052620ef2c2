// Lap time consistency over the most recent laps of a session

use serde::{Deserialize, Serialize};

use crate::telemetry::Session;

pub const DEFAULT_CONSISTENCY_LAPS: usize = 3;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LapSummary {
    pub lap_number: u32,
    pub lap_time: f32,
    pub sector_times: [Option<f32>; 3],
    pub is_valid: bool,
    pub is_best: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ConsistencyReport {
    /// Newest lap first
    pub laps: Vec<LapSummary>,
    pub mean_lap_time: f32,
    /// Population standard deviation of the lap times
    pub std_dev: f32,
    /// `(1 - std_dev / mean) * 100`, 100 for a single lap
    pub consistency_score: f32,
    pub best_lap_time: Option<f32>,
}

/// Consistency of the last `lap_count` complete laps, `None` without complete laps
pub fn consistency_report(session: &Session, lap_count: usize) -> Option<ConsistencyReport> {
    let laps = session.last_completed_laps(lap_count);
    if laps.is_empty() {
        return None;
    }

    let best_valid = laps
        .iter()
        .filter(|l| l.is_valid)
        .min_by(|a, b| {
            a.lap_time
                .partial_cmp(&b.lap_time)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|l| l.lap_number);

    let times: Vec<f32> = laps.iter().map(|l| l.lap_time).collect();
    let mean = times.iter().sum::<f32>() / times.len() as f32;
    let (std_dev, consistency_score) = if times.len() > 1 {
        let variance = times.iter().map(|t| (t - mean).powi(2)).sum::<f32>() / times.len() as f32;
        let std_dev = variance.sqrt();
        let score = if mean > 0. {
            (1. - std_dev / mean) * 100.
        } else {
            0.
        };
        (std_dev, score)
    } else {
        (0., 100.)
    };

    Some(ConsistencyReport {
        laps: laps
            .iter()
            .map(|l| LapSummary {
                lap_number: l.lap_number,
                lap_time: l.lap_time,
                sector_times: l.sector_times,
                is_valid: l.is_valid,
                is_best: Some(l.lap_number) == best_valid,
            })
            .collect(),
        mean_lap_time: mean,
        std_dev,
        consistency_score,
        best_lap_time: laps
            .iter()
            .find(|l| Some(l.lap_number) == best_valid)
            .map(|l| l.lap_time),
    })
}
