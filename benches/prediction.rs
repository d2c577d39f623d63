//! Prediction benchmarks.
//!
//! - batch prediction vs in-place prediction across batch sizes
//! - single-row latency
//! - block sizes and sequential vs parallel evaluation
//!
//! HTML reports are generated in `target/criterion/`.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use treeboost::inference::Predictor;
use treeboost::testing::{StumpGrower, random_dense_f32, regression_dataset};
use treeboost::{
    Booster, Config, Dataset, Parallelism, PredictionKind, TrainParams, Trainer, WatchList,
};

const N_FEATURES: usize = 16;

// =============================================================================
// Benchmark Data Setup
// =============================================================================

fn trained_model(n_rounds: u32) -> Booster {
    let dtrain = regression_dataset(2_000, N_FEATURES, 42);
    let params = TrainParams::builder().n_rounds(n_rounds).build().unwrap();
    let mut booster = Booster::new(Config::new().with("eta", 0.1)).unwrap();
    Trainer::new(StumpGrower, params)
        .train(&mut booster, &dtrain, &WatchList::new(), None)
        .expect("benchmark model trains");
    booster
}

fn input(n_rows: usize) -> Vec<f32> {
    random_dense_f32(n_rows, N_FEATURES, 7, 0.0, 1.0)
}

// =============================================================================
// Benchmark Groups
// =============================================================================

fn bench_batch_sizes(c: &mut Criterion) {
    let model = trained_model(200);
    let mut group = c.benchmark_group("batch_size");

    for batch_size in [1usize, 10, 100, 1_000, 10_000] {
        let data = input(batch_size);
        let dataset = Dataset::from_dense(data.clone(), batch_size, N_FEATURES, f32::NAN).unwrap();

        group.throughput(Throughput::Elements(batch_size as u64));
        group.bench_with_input(BenchmarkId::new("predict", batch_size), &dataset, |b, ds| {
            b.iter(|| black_box(model.predict(black_box(ds), PredictionKind::Transformed)));
        });
        group.bench_with_input(BenchmarkId::new("inplace", batch_size), &data, |b, data| {
            b.iter(|| {
                black_box(model.inplace_predict(
                    black_box(data),
                    batch_size,
                    N_FEATURES,
                    f32::NAN,
                    PredictionKind::Transformed,
                ))
            });
        });
    }

    group.finish();
}

fn bench_single_row(c: &mut Criterion) {
    let model = trained_model(200);
    let row = input(1);

    c.bench_function("single_row/inplace", |b| {
        b.iter(|| {
            black_box(model.inplace_predict(
                black_box(&row),
                1,
                N_FEATURES,
                f32::NAN,
                PredictionKind::Transformed,
            ))
        });
    });
}

fn bench_block_sizes(c: &mut Criterion) {
    let model = trained_model(200);
    let n_rows = 10_000;
    let data = input(n_rows);
    let mut group = c.benchmark_group("block_size");
    group.throughput(Throughput::Elements(n_rows as u64));

    for block_size in [16usize, 64, 256, 100_000] {
        let predictor = Predictor::new(model.forest()).with_block_size(block_size);
        for parallelism in [Parallelism::Sequential, Parallelism::Parallel] {
            let id = format!("{block_size}/{parallelism:?}");
            group.bench_function(BenchmarkId::new("margins", id), |b| {
                b.iter(|| {
                    black_box(predictor.predict_margins(
                        black_box(&data),
                        n_rows,
                        N_FEATURES,
                        parallelism,
                    ))
                });
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_batch_sizes, bench_single_row, bench_block_sizes);
criterion_main!(benches);
