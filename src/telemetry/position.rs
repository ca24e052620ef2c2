// Position normalization: maps raw samples to lap progress or to 2-D track map coordinates

use log::debug;

use super::TelemetrySample;
use crate::track_map::projection::{BoundingBox, Point2D};

/// Positions whose spread is within this tolerance are treated as constant
pub const CONSTANT_POSITION_TOLERANCE: f32 = 1e-4;

/// Whether a lap's `normalized_position` values can drive position-based algorithms
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PositionDataQuality {
    /// Present on every sample and not constant
    Usable,
    /// Present but every value lies within `CONSTANT_POSITION_TOLERANCE`
    Constant,
    /// Absent on at least one sample, or no samples at all
    Missing,
}

impl PositionDataQuality {
    pub fn classify(samples: &[TelemetrySample]) -> Self {
        if samples.is_empty() {
            return PositionDataQuality::Missing;
        }

        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for sample in samples {
            match sample.normalized_position {
                Some(position) if position.is_finite() => {
                    min = min.min(position);
                    max = max.max(position);
                }
                _ => return PositionDataQuality::Missing,
            }
        }

        if max - min <= CONSTANT_POSITION_TOLERANCE {
            PositionDataQuality::Constant
        } else {
            PositionDataQuality::Usable
        }
    }

    pub fn is_usable(&self) -> bool {
        matches!(self, PositionDataQuality::Usable)
    }
}

/// Source index for output slot `slot` of `target_count` intervals over `len` samples.
/// Equivalent to `floor(slot / target_count * (len - 1))` without float rounding.
pub fn fallback_source_index(slot: usize, target_count: usize, len: usize) -> usize {
    if len == 0 || target_count == 0 {
        return 0;
    }
    (slot * (len - 1)) / target_count
}

/// Progress of the `slot`-th grid point in a grid of `target_count` intervals
pub fn grid_progress(slot: usize, target_count: usize) -> f32 {
    if target_count == 0 {
        0.
    } else {
        slot as f32 / target_count as f32
    }
}

/// Track outline normalized into the unit square of its world bounding box
#[derive(Debug, Clone)]
pub struct TrackLayout {
    /// Normalized (x, z) points, one per sample carrying world coordinates
    pub points: Vec<Point2D>,
    /// Index in the source lap of every entry in `points`
    pub sample_indices: Vec<usize>,
    /// World bounding box the points were normalized against
    pub bounds: BoundingBox,
}

impl TrackLayout {
    /// Builds the layout from the world x/z coordinates of a lap.
    /// An axis without extent maps to 0.5. Returns `None` when no sample has coordinates.
    pub fn from_samples(samples: &[TelemetrySample]) -> Option<Self> {
        let mut bounds = BoundingBox::new();
        let mut world = Vec::new();
        let mut sample_indices = Vec::new();
        for (i, sample) in samples.iter().enumerate() {
            if let (Some(x), Some(z)) = (sample.world_x, sample.world_z)
                && x.is_finite()
                && z.is_finite()
            {
                let point = Point2D::new(x, z);
                bounds.update(point);
                world.push(point);
                sample_indices.push(i);
            }
        }

        if world.is_empty() {
            debug!("No world coordinates in {} samples", samples.len());
            return None;
        }

        let points = world.iter().map(|p| bounds.normalize(*p)).collect();
        Some(Self {
            points,
            sample_indices,
            bounds,
        })
    }

    /// Normalized point for the sample at `sample_index`, if it carried coordinates
    pub fn point_for_sample(&self, sample_index: usize) -> Option<Point2D> {
        self.sample_indices
            .binary_search(&sample_index)
            .ok()
            .map(|i| self.points[i])
    }

    /// Normalized point of the sample nearest to `sample_index` that carried coordinates
    pub fn nearest_point_for_sample(&self, sample_index: usize) -> Option<Point2D> {
        match self.sample_indices.binary_search(&sample_index) {
            Ok(i) => Some(self.points[i]),
            Err(i) => {
                let before = i.checked_sub(1);
                let after = (i < self.sample_indices.len()).then_some(i);
                match (before, after) {
                    (Some(b), Some(a)) => {
                        let db = sample_index - self.sample_indices[b];
                        let da = self.sample_indices[a] - sample_index;
                        Some(if da < db { self.points[a] } else { self.points[b] })
                    }
                    (Some(b), None) => Some(self.points[b]),
                    (None, Some(a)) => Some(self.points[a]),
                    (None, None) => None,
                }
            }
        }
    }
}
