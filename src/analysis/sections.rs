// Per-lap section statistics and automatic section boundary detection

use itertools::Itertools;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::telemetry::TelemetrySample;

/// Lateral acceleration above which a sample belongs to a corner
const CORNER_LATERAL_G: f32 = 0.15;
/// Steering angle above which a sample belongs to a corner
const CORNER_STEERING_DEG: f32 = 5.0;
/// Runs shorter than this are folded into their neighbour
const MIN_SECTION_SAMPLES: usize = 5;
/// Straights shorter than this between two same-direction corners belong to the corner
const MAX_CORNER_INTERRUPTION_SAMPLES: usize = 15;
/// Corners shorter than this between two straights belong to the straight
const MAX_STRAIGHT_INTERRUPTION_SAMPLES: usize = 10;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Straight,
    Corner,
}

/// Externally supplied section delimiters, in sample indices of the lap
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SectionBoundary {
    pub section_id: u32,
    #[serde(rename = "type")]
    pub kind: SectionKind,
    pub start_index: usize,
    pub end_index: usize,
}

/// Statistics of one section of one lap
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Section {
    pub section_id: u32,
    #[serde(rename = "type")]
    pub kind: SectionKind,
    /// Turn direction of a corner, from the dominant sign of its lateral acceleration
    pub direction: Option<TurnDirection>,
    pub start_index: usize,
    pub end_index: usize,
    /// Speed at `start_index`
    pub entry_speed: f32,
    /// Speed at `end_index`
    pub exit_speed: f32,
    pub avg_speed: f32,
    pub min_speed: f32,
    pub max_speed: f32,
    /// Seconds elapsed between `start_index` and `end_index`
    pub time: f32,
    /// Mean and peak of the absolute g forces, samples without data count as 0
    pub avg_g_lateral: f32,
    pub max_g_lateral: f32,
    pub avg_g_longitudinal: f32,
    pub max_g_longitudinal: f32,
    /// Every sample of the section was on track
    pub is_valid: bool,
}

impl SectionBoundary {
    fn fits(&self, sample_count: usize) -> bool {
        self.start_index < self.end_index && self.end_index < sample_count
    }
}

/// Computes section statistics for one lap. Boundaries outside the sample range are skipped.
pub fn segment_lap(samples: &[TelemetrySample], boundaries: &[SectionBoundary]) -> Vec<Section> {
    boundaries
        .iter()
        .filter_map(|boundary| {
            if !boundary.fits(samples.len()) {
                warn!(
                    "Skipping section {}: range {}..={} does not fit {} samples",
                    boundary.section_id,
                    boundary.start_index,
                    boundary.end_index,
                    samples.len()
                );
                return None;
            }
            Some(section_stats(samples, boundary))
        })
        .collect()
}

fn section_stats(samples: &[TelemetrySample], boundary: &SectionBoundary) -> Section {
    let range = &samples[boundary.start_index..=boundary.end_index];
    let first = &range[0];
    let last = &range[range.len() - 1];

    let (min_speed, max_speed) = range
        .iter()
        .map(|s| s.speed_mps)
        .minmax_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .into_option()
        .unwrap_or((first.speed_mps, first.speed_mps));
    let avg_speed = range.iter().map(|s| s.speed_mps).sum::<f32>() / range.len() as f32;
    let (avg_g_lateral, max_g_lateral) = abs_mean_max(range.iter().map(|s| s.lateral_g));
    let (avg_g_longitudinal, max_g_longitudinal) =
        abs_mean_max(range.iter().map(|s| s.longitudinal_g));

    let direction = match boundary.kind {
        SectionKind::Corner => {
            let lateral: f32 = range.iter().filter_map(|s| s.lateral_g).sum();
            if lateral > 0. {
                Some(TurnDirection::Right)
            } else if lateral < 0. {
                Some(TurnDirection::Left)
            } else {
                None
            }
        }
        SectionKind::Straight => None,
    };

    Section {
        section_id: boundary.section_id,
        kind: boundary.kind,
        direction,
        start_index: boundary.start_index,
        end_index: boundary.end_index,
        entry_speed: first.speed_mps,
        exit_speed: last.speed_mps,
        avg_speed,
        min_speed,
        max_speed,
        time: last.time_offset - first.time_offset,
        avg_g_lateral,
        max_g_lateral,
        avg_g_longitudinal,
        max_g_longitudinal,
        is_valid: range.iter().all(|s| s.is_on_track),
    }
}

fn abs_mean_max(values: impl Iterator<Item = Option<f32>>) -> (f32, f32) {
    let (count, sum, max) = values
        .map(|v| v.unwrap_or(0.).abs())
        .fold((0usize, 0f32, 0f32), |(count, sum, max), v| {
            (count + 1, sum + v, max.max(v))
        });
    if count == 0 {
        (0., 0.)
    } else {
        (sum / count as f32, max)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TurnDirection {
    Left,
    Right,
}

#[derive(Clone, Copy, Debug)]
struct Run {
    kind: SectionKind,
    direction: Option<TurnDirection>,
    start: usize,
    end: usize,
}

impl Run {
    fn len(&self) -> usize {
        self.end - self.start + 1
    }
}

fn classify_sample(sample: &TelemetrySample) -> (SectionKind, Option<TurnDirection>) {
    let lateral_g = sample.lateral_g.unwrap_or(0.);
    let steering_deg = sample.steering_angle.to_degrees().abs();
    if lateral_g.abs() > CORNER_LATERAL_G || steering_deg > CORNER_STEERING_DEG {
        let direction = if lateral_g > 0. {
            TurnDirection::Right
        } else {
            TurnDirection::Left
        };
        (SectionKind::Corner, Some(direction))
    } else {
        (SectionKind::Straight, None)
    }
}

/// Derives straight/corner boundaries from a reference lap when a track has none supplied.
/// Section ids are 1-based in lap order and the sections cover the whole lap.
pub fn detect_boundaries(samples: &[TelemetrySample]) -> Vec<SectionBoundary> {
    if samples.len() < 2 {
        return Vec::new();
    }

    let mut runs: Vec<Run> = Vec::new();
    let (kind, direction) = classify_sample(&samples[0]);
    let mut current = Run {
        kind,
        direction,
        start: 0,
        end: 0,
    };

    for (i, sample) in samples.iter().enumerate().skip(1) {
        let (kind, direction) = classify_sample(sample);
        if kind == current.kind {
            let direction_changed = kind == SectionKind::Corner && direction != current.direction;
            if direction_changed {
                runs.push(current);
                current = Run {
                    kind,
                    direction,
                    start: i,
                    end: i,
                };
            } else {
                current.end = i;
            }
        } else if current.len() >= MIN_SECTION_SAMPLES {
            runs.push(current);
            current = Run {
                kind,
                direction,
                start: i,
                end: i,
            };
        } else if let Some(previous) = runs.last_mut() {
            previous.end = current.end;
            current = Run {
                kind,
                direction,
                start: i,
                end: i,
            };
        } else {
            // leading noise becomes part of the first real run
            current = Run {
                kind,
                direction,
                start: current.start,
                end: i,
            };
        }
    }

    if current.len() >= MIN_SECTION_SAMPLES || runs.is_empty() {
        runs.push(current);
    } else if let Some(previous) = runs.last_mut() {
        previous.end = current.end;
    }

    let merged = merge_runs(&fold_single_samples(runs));
    debug!(
        "Detected {} sections over {} samples",
        merged.len(),
        samples.len()
    );

    merged
        .into_iter()
        .enumerate()
        .map(|(i, run)| SectionBoundary {
            section_id: i as u32 + 1,
            kind: run.kind,
            start_index: run.start,
            end_index: run.end,
        })
        .collect()
}

/// A direction flip lasting one sample leaves a run that cannot form a section on its own.
/// It joins the preceding run, or the following one at the start of the lap.
fn fold_single_samples(runs: Vec<Run>) -> Vec<Run> {
    let mut folded: Vec<Run> = Vec::with_capacity(runs.len());
    for run in runs {
        if run.len() == 1
            && let Some(previous) = folded.last_mut()
        {
            previous.end = run.end;
        } else {
            folded.push(run);
        }
    }
    if folded.len() > 1 && folded[0].len() == 1 {
        let leading = folded.remove(0);
        folded[0].start = leading.start;
    }
    folded
}

/// Folds interruptions back into the surrounding section: a short straight between two
/// corners of the same direction, or a short corner between two straights.
fn merge_runs(runs: &[Run]) -> Vec<Run> {
    let Some(first) = runs.first() else {
        return Vec::new();
    };

    let mut merged = Vec::new();
    let mut cluster = *first;
    for (i, next) in runs.iter().enumerate().skip(1) {
        let following = runs.get(i + 1);
        let should_merge = if next.kind == cluster.kind && next.direction == cluster.direction {
            true
        } else if cluster.kind == SectionKind::Corner && next.kind == SectionKind::Straight {
            next.len() < MAX_CORNER_INTERRUPTION_SAMPLES
                && following.is_some_and(|f| {
                    f.kind == SectionKind::Corner && f.direction == cluster.direction
                })
        } else if cluster.kind == SectionKind::Straight && next.kind == SectionKind::Corner {
            next.len() < MAX_STRAIGHT_INTERRUPTION_SAMPLES
                && following.is_some_and(|f| f.kind == SectionKind::Straight)
        } else {
            false
        };

        if should_merge {
            cluster.end = next.end;
        } else {
            merged.push(cluster);
            cluster = *next;
        }
    }
    merged.push(cluster);
    merged
}
