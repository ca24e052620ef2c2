// Braking and full throttle zones of a lap

use serde::{Deserialize, Serialize};

use crate::telemetry::TelemetrySample;
use crate::track_map::Point2D;

/// Brake pedal above which a sample is part of a braking zone
pub const BRAKE_ZONE_THRESHOLD: f32 = 0.5;
/// Throttle above which a sample is part of a full throttle zone
pub const THROTTLE_ZONE_THRESHOLD: f32 = 0.8;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    Braking,
    FullThrottle,
}

impl ZoneKind {
    fn threshold(self) -> f32 {
        match self {
            ZoneKind::Braking => BRAKE_ZONE_THRESHOLD,
            ZoneKind::FullThrottle => THROTTLE_ZONE_THRESHOLD,
        }
    }

    fn pedal(self, sample: &TelemetrySample) -> f32 {
        match self {
            ZoneKind::Braking => sample.brake,
            ZoneKind::FullThrottle => sample.throttle,
        }
    }
}

/// A run of consecutive samples with the pedal above its zone threshold
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Zone {
    /// 1-based, numbered per kind in lap order
    pub zone_id: u32,
    pub kind: ZoneKind,
    pub start_index: usize,
    pub end_index: usize,
    /// Track progress of the first sample, when the simulator reports it
    pub start_progress: Option<f32>,
    /// World x/z of the first sample
    pub start_world: Option<Point2D>,
    /// Seconds between the first and last sample of the zone
    pub duration: f32,
    /// Highest pedal value inside the zone
    pub peak: f32,
}

/// Zones of one kind in lap order
pub fn find_zones(samples: &[TelemetrySample], kind: ZoneKind) -> Vec<Zone> {
    let threshold = kind.threshold();
    let mut zones = Vec::new();
    let mut start: Option<usize> = None;

    for (i, sample) in samples.iter().enumerate() {
        let inside = kind.pedal(sample) > threshold;
        match (inside, start) {
            (true, None) => start = Some(i),
            (false, Some(first)) => {
                zones.push(zone(samples, kind, zones.len(), first, i - 1));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(first) = start {
        zones.push(zone(samples, kind, zones.len(), first, samples.len() - 1));
    }
    zones
}

/// Braking zones followed by full throttle zones
pub fn lap_zones(samples: &[TelemetrySample]) -> Vec<Zone> {
    let mut zones = find_zones(samples, ZoneKind::Braking);
    zones.extend(find_zones(samples, ZoneKind::FullThrottle));
    zones
}

fn zone(samples: &[TelemetrySample], kind: ZoneKind, index: usize, start: usize, end: usize) -> Zone {
    let first = &samples[start];
    let peak = samples[start..=end]
        .iter()
        .map(|s| kind.pedal(s))
        .fold(f32::MIN, f32::max);
    Zone {
        zone_id: index as u32 + 1,
        kind,
        start_index: start,
        end_index: end,
        start_progress: first.normalized_position,
        start_world: first.world_x.zip(first.world_z).map(|(x, z)| Point2D::new(x, z)),
        duration: samples[end].time_offset - first.time_offset,
        peak,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pedal_samples(brake: &[f32], throttle: &[f32]) -> Vec<TelemetrySample> {
        brake
            .iter()
            .zip(throttle)
            .enumerate()
            .map(|(i, (brake, throttle))| TelemetrySample {
                time_offset: i as f32 * 0.5,
                normalized_position: Some(i as f32 / 10.),
                world_x: Some(i as f32),
                world_z: Some(-(i as f32)),
                brake: *brake,
                throttle: *throttle,
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_braking_zones() {
        let samples = pedal_samples(
            &[0., 0.6, 0.9, 0.5, 0., 0.7, 0.],
            &[1., 0., 0., 0., 0.2, 0., 0.9],
        );
        let zones = find_zones(&samples, ZoneKind::Braking);
        assert_eq!(zones.len(), 2);

        // 0.5 is not above the threshold
        assert_eq!((zones[0].start_index, zones[0].end_index), (1, 2));
        assert_eq!(zones[0].zone_id, 1);
        assert_eq!(zones[0].duration, 0.5);
        assert_eq!(zones[0].peak, 0.9);
        assert_eq!(zones[0].start_progress, Some(0.1));
        assert_eq!(zones[0].start_world, Some(Point2D::new(1., -1.)));

        assert_eq!((zones[1].zone_id, zones[1].start_index), (2, 5));
        assert_eq!(zones[1].duration, 0.);
    }

    #[test]
    fn test_throttle_zone_open_at_lap_end() {
        let samples = pedal_samples(&[0.; 5], &[0.9, 0.5, 0.85, 1., 1.]);
        let zones = find_zones(&samples, ZoneKind::FullThrottle);
        assert_eq!(zones.len(), 2);
        assert_eq!((zones[1].start_index, zones[1].end_index), (2, 4));
        assert_eq!(zones[1].duration, 1.);
        assert_eq!(zones[1].peak, 1.);
    }

    #[test]
    fn test_lap_zones_orders_braking_first() {
        let samples = pedal_samples(&[0., 0.8, 0.], &[0.9, 0., 0.]);
        let kinds: Vec<ZoneKind> = lap_zones(&samples).iter().map(|z| z.kind).collect();
        assert_eq!(kinds, vec![ZoneKind::Braking, ZoneKind::FullThrottle]);
        assert!(lap_zones(&[]).is_empty());
    }
}
