//! Batch vs in-place prediction and concurrent determinism.

use std::sync::Arc;

use ndarray::{Array2, s};
use rand::prelude::*;
use rayon::prelude::*;

use treeboost::testing::{
    StumpGrower, multiclass_dataset, random_dense_with_missing, regression_dataset,
};
use treeboost::{
    BoostError, Booster, Config, Dataset, PredictionKind, TrainParams, Trainer, WatchList,
};

fn trained(objective: &str, n_features: usize) -> (Booster, Dataset) {
    let base = regression_dataset(300, n_features, 3);
    let labels: Vec<f32> = match objective {
        "binary:logistic" => base
            .labels()
            .unwrap()
            .iter()
            .map(|&y| if y > 0.0 { 1.0 } else { 0.0 })
            .collect(),
        _ => base.labels().unwrap().to_vec(),
    };
    let dtrain = Dataset::new(base.features().to_owned())
        .with_labels(labels)
        .unwrap();

    let params = TrainParams::builder().n_rounds(15).build().unwrap();
    let trainer = Trainer::new(StumpGrower, params);
    let mut booster = Booster::new(
        Config::new()
            .with("objective", objective)
            .with("eta", 0.4)
            .with("min_child_weight", 0.0),
    )
    .unwrap();
    trainer
        .train(&mut booster, &dtrain, &WatchList::new(), None)
        .unwrap();

    let data = random_dense_with_missing(64, n_features, 99, 0.1);
    let test = Dataset::from_dense(data, 64, n_features, f32::NAN).unwrap();
    (booster, test)
}

#[test]
fn batch_and_inplace_agree_exactly() {
    for objective in ["reg:squarederror", "binary:logistic"] {
        let (booster, test) = trained(objective, 4);
        for kind in [PredictionKind::Margin, PredictionKind::Transformed] {
            let batch = booster.predict(&test, kind).unwrap();
            for row in 0..test.n_rows() {
                let single = booster
                    .inplace_predict(test.row_buffer(row), 1, 4, f32::NAN, kind)
                    .unwrap();
                assert_eq!(single.shape(), &[1, 1]);
                assert_eq!(
                    single[[0, 0]].to_bits(),
                    batch[[row, 0]].to_bits(),
                    "row {row}"
                );
            }

            let all = booster
                .inplace_predict(test.as_slice(), test.n_rows(), 4, f32::NAN, kind)
                .unwrap();
            assert_eq!(all, batch);
        }
    }
}

#[test]
fn missing_sentinel_routes_like_nan() {
    let (booster, test) = trained("reg:squarederror", 3);
    let expected = booster.predict(&test, PredictionKind::Margin).unwrap();

    let sentinel = -999.0;
    let buffer: Vec<f32> = test
        .as_slice()
        .iter()
        .map(|&x| if x.is_nan() { sentinel } else { x })
        .collect();
    let got = booster
        .inplace_predict(&buffer, test.n_rows(), 3, sentinel, PredictionKind::Margin)
        .unwrap();
    assert_eq!(got, expected);
}

#[test]
fn feature_count_mismatch_is_dimension_error() {
    let (booster, _) = trained("reg:squarederror", 3);
    let err = booster
        .inplace_predict(&[0.1, 0.2], 1, 2, f32::NAN, PredictionKind::Transformed)
        .unwrap_err();
    assert!(matches!(
        err,
        BoostError::Dimension {
            expected: 3,
            actual: 2,
            ..
        }
    ));

    let wrong = Dataset::new(Array2::zeros((2, 5)));
    assert!(matches!(
        booster.predict(&wrong, PredictionKind::Transformed),
        Err(BoostError::Dimension { .. })
    ));

    // Buffer shorter than n_rows * n_features.
    let err = booster
        .inplace_predict(&[0.1, 0.2], 1, 3, f32::NAN, PredictionKind::Transformed)
        .unwrap_err();
    assert!(matches!(
        err,
        BoostError::Dimension {
            expected: 3,
            actual: 2,
            ..
        }
    ));
}

#[test]
fn concurrent_threads_match_batch() {
    let (booster, test) = trained("binary:logistic", 4);
    let expected = booster.predict(&test, PredictionKind::Transformed).unwrap();

    std::thread::scope(|scope| {
        for t in 0..20u64 {
            let (booster, test, expected) = (&booster, &test, &expected);
            scope.spawn(move || {
                let mut rng = StdRng::seed_from_u64(t);
                for _ in 0..100 {
                    let row = rng.gen_range(0..test.n_rows());
                    let got = booster
                        .inplace_predict(
                            test.row_buffer(row),
                            1,
                            4,
                            f32::NAN,
                            PredictionKind::Transformed,
                        )
                        .unwrap();
                    assert_eq!(got[[0, 0]].to_bits(), expected[[row, 0]].to_bits());
                }
            });
        }
    });
}

#[test]
fn worker_pool_tasks_match_batch() {
    let (booster, test) = trained("reg:squarederror", 4);
    let booster = Arc::new(booster);
    let test = Arc::new(test);
    let expected = booster.predict(&test, PredictionKind::Transformed).unwrap();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(5)
        .build()
        .unwrap();
    let results: Vec<Vec<(usize, f32)>> = pool.install(|| {
        (0..20u64)
            .into_par_iter()
            .map(|task| {
                let mut rng = StdRng::seed_from_u64(1000 + task);
                (0..100)
                    .map(|_| {
                        let row = rng.gen_range(0..test.n_rows());
                        let single =
                            Dataset::new(test.features().slice(s![row..row + 1, ..]).to_owned());
                        let got = booster
                            .predict(&single, PredictionKind::Transformed)
                            .unwrap();
                        (row, got[[0, 0]])
                    })
                    .collect()
            })
            .collect()
    });

    assert_eq!(results.len(), 20);
    for (row, value) in results.into_iter().flatten() {
        assert_eq!(value.to_bits(), expected[[row, 0]].to_bits());
    }
}

#[test]
fn multiclass_outputs_sum_to_one() {
    let dtrain = multiclass_dataset(200, 3, 3, 5);
    let params = TrainParams::builder().n_rounds(5).build().unwrap();
    let mut booster = Booster::new(
        Config::new()
            .with("objective", "multi:softprob")
            .with("num_class", 3)
            .with("min_child_weight", 0.0),
    )
    .unwrap();
    Trainer::new(StumpGrower, params)
        .train(&mut booster, &dtrain, &WatchList::new(), None)
        .unwrap();
    assert_eq!(booster.n_trees(), 15);
    assert_eq!(booster.boosted_rounds(), 5);

    let probs = booster
        .predict(&dtrain, PredictionKind::Transformed)
        .unwrap();
    assert_eq!(probs.ncols(), 3);
    for row in probs.rows() {
        approx::assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-5);
    }
}
