pub mod loader;
pub mod position;

use serde::{Deserialize, Serialize};

pub use position::{PositionDataQuality, TrackLayout};

/// One recorded telemetry sample. Samples of a lap are ordered by `time_offset`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TelemetrySample {
    /// Seconds elapsed since the lap started
    pub time_offset: f32,
    /// Fractional progress around the circuit (0.0-1.0), when the simulator reports it
    #[serde(default)]
    pub normalized_position: Option<f32>,
    /// World X coordinate (meters)
    #[serde(default)]
    pub world_x: Option<f32>,
    /// World Z coordinate (meters)
    #[serde(default)]
    pub world_z: Option<f32>,
    /// Vehicle speed in m/s
    pub speed_mps: f32,
    /// Throttle use. 0=off throttle to 1=full throttle
    pub throttle: f32,
    /// Brake use. 0=brake released to 1=max pedal force
    pub brake: f32,
    /// Steering wheel angle (rad)
    #[serde(default)]
    pub steering_angle: f32,
    /// Lateral acceleration in g
    #[serde(default)]
    pub lateral_g: Option<f32>,
    /// Longitudinal acceleration in g, negative under braking
    #[serde(default)]
    pub longitudinal_g: Option<f32>,
    /// Whether the car had enough wheels on the racing surface
    #[serde(default = "default_on_track")]
    pub is_on_track: bool,
}

fn default_on_track() -> bool {
    true
}

impl Default for TelemetrySample {
    fn default() -> Self {
        Self {
            time_offset: 0.,
            normalized_position: None,
            world_x: None,
            world_z: None,
            speed_mps: 0.,
            throttle: 0.,
            brake: 0.,
            steering_angle: 0.,
            lateral_g: None,
            longitudinal_g: None,
            is_on_track: true,
        }
    }
}

/// Identifies a lap across sessions, used as the owner of section records
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct LapRef {
    pub session_id: u64,
    pub lap_number: u32,
}

/// A completed lap. The position capability of its samples is resolved once here.
#[derive(Clone, Debug)]
pub struct Lap {
    pub lap_number: u32,
    /// Lap time in seconds, 0 for an incomplete lap
    pub lap_time: f32,
    pub sector_times: [Option<f32>; 3],
    pub is_valid: bool,
    samples: Vec<TelemetrySample>,
    position_quality: PositionDataQuality,
}

impl Lap {
    pub fn new(
        lap_number: u32,
        lap_time: f32,
        sector_times: [Option<f32>; 3],
        is_valid: bool,
        samples: Vec<TelemetrySample>,
    ) -> Self {
        let position_quality = PositionDataQuality::classify(&samples);
        Self {
            lap_number,
            lap_time,
            sector_times,
            is_valid,
            samples,
            position_quality,
        }
    }

    pub fn samples(&self) -> &[TelemetrySample] {
        &self.samples
    }

    pub fn position_quality(&self) -> PositionDataQuality {
        self.position_quality
    }

    /// A lap with a recorded lap time
    pub fn is_complete(&self) -> bool {
        self.lap_time > 0.
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum SessionType {
    Practice,
    Qualifying,
    Race,
    Hotlap,
    #[default]
    Unknown,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionInfo {
    pub session_id: u64,
    pub track_id: String,
    pub car_id: String,
    /// Session start as milliseconds since the unix epoch
    #[serde(default)]
    pub start_time_ms: u64,
    #[serde(default)]
    pub session_type: SessionType,
}

impl Default for SessionInfo {
    fn default() -> Self {
        Self {
            session_id: 0,
            track_id: "Unknown".to_string(),
            car_id: "Unknown".to_string(),
            start_time_ms: 0,
            session_type: SessionType::Unknown,
        }
    }
}

#[derive(Default, Clone, Debug)]
pub struct Session {
    pub info: SessionInfo,
    pub laps: Vec<Lap>,
}

impl Session {
    pub fn lap_ref(&self, lap: &Lap) -> LapRef {
        LapRef {
            session_id: self.info.session_id,
            lap_number: lap.lap_number,
        }
    }

    /// Fastest valid complete lap, falling back to the fastest complete lap
    pub fn best_lap(&self) -> Option<&Lap> {
        let fastest = |valid_only: bool| {
            self.laps
                .iter()
                .filter(|l| l.is_complete() && (!valid_only || l.is_valid))
                .min_by(|a, b| {
                    a.lap_time
                        .partial_cmp(&b.lap_time)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
        };
        fastest(true).or_else(|| fastest(false))
    }

    /// Last complete lap in chronological order
    pub fn most_recent_lap(&self) -> Option<&Lap> {
        self.laps.iter().rev().find(|l| l.is_complete())
    }

    /// Up to `n` most recent complete laps, newest first
    pub fn last_completed_laps(&self, n: usize) -> Vec<&Lap> {
        self.laps
            .iter()
            .rev()
            .filter(|l| l.is_complete())
            .take(n)
            .collect()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{lap, lap_samples};
    use super::*;

    fn session_with(laps: Vec<Lap>) -> Session {
        Session {
            info: SessionInfo {
                session_id: 7,
                ..Default::default()
            },
            laps,
        }
    }

    #[test]
    fn test_lap_resolves_position_quality_once() {
        let lap = lap(1, 90.0, lap_samples(10, |_| 30.));
        assert_eq!(lap.position_quality(), PositionDataQuality::Usable);

        let no_position = Lap::new(
            2,
            90.0,
            [None; 3],
            true,
            vec![TelemetrySample::default(); 5],
        );
        assert_eq!(no_position.position_quality(), PositionDataQuality::Missing);
    }

    #[test]
    fn test_best_lap_prefers_valid_laps() {
        let mut invalid_fast = lap(1, 80.0, lap_samples(3, |_| 1.));
        invalid_fast.is_valid = false;
        let session = session_with(vec![
            invalid_fast,
            lap(2, 85.0, lap_samples(3, |_| 1.)),
            lap(3, 84.0, lap_samples(3, |_| 1.)),
        ]);
        assert_eq!(session.best_lap().unwrap().lap_number, 3);
    }

    #[test]
    fn test_best_lap_falls_back_to_invalid_laps() {
        let mut only = lap(1, 80.0, lap_samples(3, |_| 1.));
        only.is_valid = false;
        let session = session_with(vec![only]);
        assert_eq!(session.best_lap().unwrap().lap_number, 1);
    }

    #[test]
    fn test_most_recent_lap_skips_incomplete_laps() {
        let session = session_with(vec![
            lap(1, 85.0, lap_samples(3, |_| 1.)),
            lap(2, 86.0, lap_samples(3, |_| 1.)),
            lap(3, 0.0, lap_samples(3, |_| 1.)),
        ]);
        assert_eq!(session.most_recent_lap().unwrap().lap_number, 2);
        let recent = session.last_completed_laps(5);
        assert_eq!(
            recent.iter().map(|l| l.lap_number).collect::<Vec<_>>(),
            vec![2, 1]
        );
        assert_eq!(
            session.lap_ref(recent[0]),
            LapRef {
                session_id: 7,
                lap_number: 2
            }
        );
    }
}
