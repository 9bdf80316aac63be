use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use load_forecaster::forecast::{parse_timestamp, FeatureExtractor};
use load_forecaster::simulation::{lagged_samples, WorkloadSimulator, WorkloadSimulatorConfig};

fn bench_request_extraction(c: &mut Criterion) {
    let extractor = FeatureExtractor::default();
    let Ok(ts) = parse_timestamp("2024-01-07T14:30:00") else {
        return;
    };

    let mut group = c.benchmark_group("extract");
    for len in [0usize, 24, 168] {
        let history: Vec<f64> = (0..len).map(|i| 500.0 + i as f64).collect();
        group.bench_with_input(BenchmarkId::from_parameter(len), &history, |b, history| {
            b.iter(|| extractor.extract(black_box(ts), black_box(750.0), black_box(history)))
        });
    }
    group.finish();
}

fn bench_training_rows(c: &mut Criterion) {
    let series = WorkloadSimulator::new(WorkloadSimulatorConfig {
        months: 1,
        ..Default::default()
    })
    .generate();

    c.bench_function("lagged_samples_1_month", |b| {
        b.iter(|| lagged_samples(black_box(&series)))
    });
}

criterion_group!(benches, bench_request_extraction, bench_training_rows);
criterion_main!(benches);
