// Resampling of variable length laps onto a fixed, progress aligned grid

use log::warn;
use serde::{Deserialize, Serialize};

use crate::telemetry::{
    PositionDataQuality, TelemetrySample,
    position::{fallback_source_index, grid_progress},
};

/// One point of a resampled lap. Never persisted.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ResampledPoint {
    /// Grid position of this point (slot / target_count)
    pub progress: f32,
    /// Position of the matched sample, or the grid position when positions are unusable
    pub normalized_position: f32,
    pub speed_mps: f32,
    pub throttle: f32,
    pub brake: f32,
    /// Index of the matched sample, `None` for the empty-input fallback
    pub source_index: Option<usize>,
}

impl ResampledPoint {
    fn empty(progress: f32) -> Self {
        Self {
            progress,
            normalized_position: progress,
            speed_mps: 0.,
            throttle: 0.,
            brake: 0.,
            source_index: None,
        }
    }

    fn from_sample(progress: f32, normalized_position: f32, index: usize, sample: &TelemetrySample) -> Self {
        Self {
            progress,
            normalized_position,
            speed_mps: sample.speed_mps,
            throttle: sample.throttle,
            brake: sample.brake,
            source_index: Some(index),
        }
    }
}

/// Resamples `samples` into `target_count + 1` points covering progress 0..=1.
/// Classifies position data first; see `resample_with_quality`.
pub fn resample(samples: &[TelemetrySample], target_count: usize) -> Vec<ResampledPoint> {
    resample_with_quality(samples, PositionDataQuality::classify(samples), target_count)
}

/// Resamples with an already resolved position quality.
///
/// * Empty input yields zero valued points on the grid.
/// * Unusable positions fall back to index spacing over the input.
/// * Usable positions pick, for every grid position, the sample whose position is
///   closest, scanning the whole lap so resets and glitches cannot derail the match.
///   Ties resolve to the lowest index.
///
/// Matched samples are copied verbatim, never interpolated.
pub fn resample_with_quality(
    samples: &[TelemetrySample],
    quality: PositionDataQuality,
    target_count: usize,
) -> Vec<ResampledPoint> {
    let slots = 0..=target_count;

    if samples.is_empty() {
        return slots
            .map(|slot| ResampledPoint::empty(grid_progress(slot, target_count)))
            .collect();
    }

    if !quality.is_usable() {
        warn!(
            "Position data {:?} for {} samples, resampling by index",
            quality,
            samples.len()
        );
        return slots
            .map(|slot| {
                let progress = grid_progress(slot, target_count);
                let index = fallback_source_index(slot, target_count, samples.len());
                ResampledPoint::from_sample(progress, progress, index, &samples[index])
            })
            .collect();
    }

    slots
        .map(|slot| {
            let progress = grid_progress(slot, target_count);
            let (index, position) = nearest_by_position(samples, progress);
            ResampledPoint::from_sample(progress, position, index, &samples[index])
        })
        .collect()
}

/// Index and position of the first sample minimizing |position - target|
fn nearest_by_position(samples: &[TelemetrySample], target: f32) -> (usize, f32) {
    let mut best_index = 0;
    let mut best_position = 0.;
    let mut best_distance = f32::INFINITY;
    for (i, sample) in samples.iter().enumerate() {
        let Some(position) = sample.normalized_position else {
            continue;
        };
        let distance = (position - target).abs();
        if distance < best_distance {
            best_distance = distance;
            best_index = i;
            best_position = position;
        }
    }
    (best_index, best_position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::test_support::lap_samples;
    use proptest::prelude::*;

    fn sample_at(position: Option<f32>, speed: f32) -> TelemetrySample {
        TelemetrySample {
            normalized_position: position,
            speed_mps: speed,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_input_yields_zero_grid() {
        let points = resample(&[], 4);
        assert_eq!(points.len(), 5);
        for (i, point) in points.iter().enumerate() {
            assert_eq!(point.progress, i as f32 / 4.);
            assert_eq!(point.normalized_position, i as f32 / 4.);
            assert_eq!(point.speed_mps, 0.);
            assert_eq!(point.source_index, None);
        }
    }

    #[test]
    fn test_single_sample_fills_every_point() {
        let sample = sample_at(Some(0.4), 42.);
        let points = resample(std::slice::from_ref(&sample), 10);
        assert_eq!(points.len(), 11);
        assert!(points.iter().all(|p| p.speed_mps == 42. && p.source_index == Some(0)));
    }

    #[test]
    fn test_position_based_picks_nearest_sample() {
        let samples = vec![
            sample_at(Some(0.0), 10.),
            sample_at(Some(0.3), 20.),
            sample_at(Some(0.55), 30.),
            sample_at(Some(1.0), 40.),
        ];
        let points = resample(&samples, 2);
        let speeds: Vec<f32> = points.iter().map(|p| p.speed_mps).collect();
        assert_eq!(speeds, vec![10., 30., 40.]);
        assert_eq!(points[1].normalized_position, 0.55);
        assert_eq!(points[1].progress, 0.5);
    }

    #[test]
    fn test_position_based_survives_reset_glitch() {
        let samples = vec![
            sample_at(Some(0.0), 10.),
            sample_at(Some(0.5), 20.),
            sample_at(Some(0.0), 99.),
            sample_at(Some(1.0), 40.),
        ];
        let points = resample(&samples, 2);
        // ties resolve to the first sample found
        assert_eq!(points[0].source_index, Some(0));
        assert_eq!(points[1].source_index, Some(1));
        assert_eq!(points[2].source_index, Some(3));
    }

    #[test]
    fn test_missing_positions_fall_back_to_index() {
        let mut samples = lap_samples(11, |i| i as f32);
        samples[3].normalized_position = None;
        let points = resample(&samples, 5);
        let indices: Vec<usize> = points.iter().map(|p| p.source_index.unwrap()).collect();
        assert_eq!(indices, vec![0, 2, 4, 6, 8, 10]);
        assert_eq!(points[2].normalized_position, 0.4);
    }

    #[test]
    fn test_constant_positions_fall_back_to_index() {
        let samples: Vec<TelemetrySample> = (0..5).map(|i| sample_at(Some(0.7), i as f32)).collect();
        let points = resample(&samples, 2);
        let indices: Vec<usize> = points.iter().map(|p| p.source_index.unwrap()).collect();
        assert_eq!(indices, vec![0, 2, 4]);
    }

    #[test]
    fn test_endpoints_match_extreme_positions() {
        let samples: Vec<TelemetrySample> = (0..50)
            .map(|i| sample_at(Some(0.1 + i as f32 * 0.016), i as f32))
            .collect();
        let points = resample(&samples, 20);
        let min = samples.iter().filter_map(|s| s.normalized_position).fold(f32::INFINITY, f32::min);
        let max = samples.iter().filter_map(|s| s.normalized_position).fold(f32::NEG_INFINITY, f32::max);
        assert_eq!(points[0].normalized_position, min);
        assert_eq!(points[20].normalized_position, max);
    }

    #[test]
    fn test_zero_target_count_yields_single_point() {
        let samples = lap_samples(10, |_| 5.);
        let points = resample(&samples, 0);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].source_index, Some(0));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_output_length_is_target_plus_one(
            positions in proptest::collection::vec(proptest::option::of(0.0f32..=1.0), 0..300),
            target in 0usize..250,
        ) {
            let samples: Vec<TelemetrySample> = positions
                .iter()
                .enumerate()
                .map(|(i, p)| sample_at(*p, i as f32))
                .collect();
            let first = resample(&samples, target);
            prop_assert_eq!(first.len(), target + 1);
            prop_assert_eq!(first, resample(&samples, target));
        }
    }
}
