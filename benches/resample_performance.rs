use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::time::Duration;
use tracklens::analysis::{compare, detect_boundaries, resample, segment_lap, CompareEntry};
use tracklens::telemetry::TelemetrySample;

fn create_lap(count: usize) -> Vec<TelemetrySample> {
    (0..count)
        .map(|i| {
            let progress = i as f32 / (count - 1) as f32;
            TelemetrySample {
                time_offset: i as f32 / 60., // 60Hz
                normalized_position: Some(progress),
                speed_mps: 50. + 20. * (progress * 30.).sin(),
                throttle: 0.8,
                brake: 0.1,
                steering_angle: 0.15 * (progress * 30.).sin(),
                lateral_g: Some(0.8 * (progress * 30.).sin()),
                ..Default::default()
            }
        })
        .collect()
}

fn bench_resample(c: &mut Criterion) {
    let mut group = c.benchmark_group("resample");

    let lap = create_lap(10_000);

    for target_count in [20, 100, 200] {
        group.bench_function(format!("resample_10k_to_{}", target_count), |b| {
            b.iter(|| black_box(resample(black_box(&lap), target_count)));
        });
    }

    let mut no_positions = lap.clone();
    for sample in &mut no_positions {
        sample.normalized_position = None;
    }
    group.bench_function("resample_10k_index_fallback", |b| {
        b.iter(|| black_box(resample(black_box(&no_positions), 100)));
    });

    group.finish();
}

fn bench_compare(c: &mut Criterion) {
    let mut group = c.benchmark_group("compare");

    let best = create_lap(10_000);
    let recent = create_lap(9_500);

    group.bench_function("compare_two_10k_laps", |b| {
        b.iter(|| {
            let entries = [
                CompareEntry::new("best", &best),
                CompareEntry::new("most recent", &recent),
            ];
            black_box(compare(&entries, 2, 100))
        });
    });

    group.finish();
}

fn bench_sections(c: &mut Criterion) {
    let mut group = c.benchmark_group("sections");

    let lap = create_lap(10_000);
    let boundaries = detect_boundaries(&lap);

    group.bench_function("detect_boundaries_10k", |b| {
        b.iter(|| black_box(detect_boundaries(black_box(&lap))));
    });

    group.bench_function("segment_lap_10k", |b| {
        b.iter(|| black_box(segment_lap(black_box(&lap), &boundaries)));
    });

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(10))
        .sample_size(100);
    targets = bench_resample, bench_compare, bench_sections
}
criterion_main!(benches);
