//! Training loop control: rounds, watch-list evaluation, early stopping.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use ndarray::{Array2, array};
use rstest::rstest;

use treeboost::repr::Tree;
use treeboost::testing::{StumpGrower, binary_dataset, regression_dataset, split_indices};
use treeboost::training::{CustomMetric, EvalMetric, GrowError};
use treeboost::{
    BoostError, Booster, ConfigError, Config, Dataset, TrainParams, Trainer, WatchList,
    cross_validate, should_early_stop,
};

/// A metric whose value grows by one on every call, so the first call is
/// the best one for a minimized metric.
fn increasing_metric() -> Arc<dyn EvalMetric> {
    let counter = AtomicUsize::new(0);
    Arc::new(CustomMetric::new("increasing", move |_, _| {
        (counter.fetch_add(1, Ordering::SeqCst) + 1) as f64
    }))
}

fn leaf_grower() -> impl Fn(&Booster, &Dataset, &Config) -> Result<Vec<Tree>, GrowError> + Send + Sync
{
    |_: &Booster, _: &Dataset, _: &Config| Ok(vec![Tree::leaf(0.1, 1.0)])
}

#[rstest]
#[case(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0], 10, None)]
#[case(&[5.0, 4.0, 3.0, 2.0, 1.0, 2.0, 3.0, 4.0, 5.0, 1.0, 0.5], 5, Some(9))]
fn should_stop_over_histories(
    #[case] history: &[f64],
    #[case] patience: u32,
    #[case] first_stop: Option<u32>,
) {
    // Track the best round of a minimized metric and ask at every round.
    let mut best = 0;
    let mut stops = Vec::new();
    for (round, &value) in history.iter().enumerate() {
        if value < history[best] {
            best = round;
        }
        if should_early_stop(patience, round as u32, best as u32) {
            stops.push(round as u32);
        }
    }
    match first_stop {
        // Ever-increasing history: only the last round qualifies.
        None => assert_eq!(stops, vec![10]),
        Some(r) => assert_eq!(stops.first().copied(), Some(r)),
    }
}

#[test]
fn early_stopping_fills_metric_buffer_until_stop() {
    let dtrain = regression_dataset(40, 2, 1);
    let dtest = regression_dataset(20, 2, 2);
    let watches = WatchList::new().with("train", &dtrain).with("test", &dtest);

    let params = TrainParams::builder()
        .n_rounds(10)
        .early_stopping_rounds(2)
        .metrics(vec![increasing_metric()])
        .build()
        .unwrap();
    let trainer = Trainer::new(leaf_grower(), params);
    let mut booster =
        Booster::new(Config::new().with("maximize_evaluation_metrics", "false")).unwrap();

    let mut metrics = Array2::<f32>::zeros((2, 10));
    let summary = trainer
        .train(&mut booster, &dtrain, &watches, Some(metrics.view_mut()))
        .unwrap();

    // Test scores 2, 4, 6: best at round 0, stop at round 2.
    assert!(summary.stopped_early);
    assert_eq!(summary.rounds_run, 3);
    assert_eq!(booster.version(), 3);
    assert_eq!(summary.best_round, Some(0));
    assert_eq!(metrics.row(0).to_vec()[..3], [1.0, 3.0, 5.0]);
    assert_eq!(metrics.row(1).to_vec()[..3], [2.0, 4.0, 6.0]);
    for round in 3..10 {
        assert_eq!(metrics[[0, round]], 0.0);
        assert_eq!(metrics[[1, round]], 0.0);
    }
    assert_eq!(booster.get_attr("best_iteration"), Some("0"));
    assert_eq!(booster.get_attr("best_score"), Some("2"));
}

#[test]
fn maximized_metric_never_stops_while_improving() {
    let dtrain = regression_dataset(30, 2, 5);
    let watches = WatchList::new().with("train", &dtrain);
    let counter = AtomicUsize::new(0);
    let metric = CustomMetric::new("up", move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst) as f64
    })
    .with_higher_is_better(true);

    let params = TrainParams::builder()
        .n_rounds(8)
        .early_stopping_rounds(1)
        .metrics(vec![Arc::new(metric) as Arc<dyn EvalMetric>])
        .build()
        .unwrap();
    let mut booster = Booster::new(Config::new()).unwrap();
    let summary = Trainer::new(leaf_grower(), params)
        .train(&mut booster, &dtrain, &watches, None)
        .unwrap();

    assert!(!summary.stopped_early);
    assert_eq!(summary.rounds_run, 8);
    assert_eq!(summary.best_round, Some(7));
}

#[test]
fn nan_metric_at_first_round_does_not_freeze_best_round() {
    let dtrain = regression_dataset(30, 2, 5);
    let watches = WatchList::new().with("train", &dtrain);
    let counter = AtomicUsize::new(0);
    let metric = CustomMetric::new("late", move |_, _| {
        match counter.fetch_add(1, Ordering::SeqCst) {
            0 => f64::NAN,
            call => 10.0 - call as f64,
        }
    });

    let params = TrainParams::builder()
        .n_rounds(6)
        .early_stopping_rounds(2)
        .metrics(vec![Arc::new(metric) as Arc<dyn EvalMetric>])
        .build()
        .unwrap();
    let mut booster = Booster::new(Config::new()).unwrap();
    let mut metrics = Array2::<f32>::zeros((1, 6));
    let summary = Trainer::new(leaf_grower(), params)
        .train(&mut booster, &dtrain, &watches, Some(metrics.view_mut()))
        .unwrap();

    assert!(!summary.stopped_early);
    assert_eq!(summary.rounds_run, 6);
    assert_eq!(summary.best_round, Some(5));
    assert_eq!(summary.best_score, Some(5.0));
    assert!(metrics[[0, 0]].is_nan());
    assert_eq!(booster.get_attr("best_iteration"), Some("5"));
}

#[test]
fn only_last_watch_drives_early_stopping() {
    let dtrain = regression_dataset(30, 2, 5);
    let dtest = regression_dataset(30, 2, 6);
    let watches = WatchList::new().with("train", &dtrain).with("test", &dtest);

    // "train" (first) always improves; "test" (last) never does.
    let counter = AtomicUsize::new(0);
    let metric: Arc<dyn EvalMetric> = Arc::new(CustomMetric::new("split", move |_, _| {
        let call = counter.fetch_add(1, Ordering::SeqCst);
        if call % 2 == 0 { -(call as f64) } else { 1.0 }
    }));
    let params = TrainParams::builder()
        .n_rounds(20)
        .early_stopping_rounds(3)
        .metrics(vec![metric])
        .build()
        .unwrap();
    let mut booster = Booster::new(Config::new()).unwrap();
    let summary = Trainer::new(leaf_grower(), params)
        .train(&mut booster, &dtrain, &watches, None)
        .unwrap();

    assert!(summary.stopped_early);
    assert_eq!(summary.rounds_run, 4);
    assert_eq!(summary.history.get("train").unwrap().len(), 4);
}

#[test]
fn early_stopping_without_watch_list_is_configuration_error() {
    let dtrain = regression_dataset(10, 2, 0);
    let params = TrainParams::builder()
        .n_rounds(5)
        .early_stopping_rounds(2)
        .build()
        .unwrap();
    let mut booster = Booster::new(Config::new()).unwrap();
    let err = Trainer::new(StumpGrower, params)
        .train(&mut booster, &dtrain, &WatchList::new(), None)
        .unwrap_err();
    assert!(matches!(
        err,
        BoostError::Configuration(ConfigError::EarlyStoppingWithoutWatchList)
    ));
    assert_eq!(booster.version(), 0);
}

#[test]
fn unknown_metric_and_objective_are_configuration_errors() {
    assert!(matches!(
        Booster::new(Config::new().with("objective", "reg:nonsense")),
        Err(BoostError::Configuration(ConfigError::UnknownObjective(_)))
    ));

    let dtrain = regression_dataset(10, 2, 0);
    let mut booster = Booster::new(Config::new().with("eval_metric", "nope")).unwrap();
    let err = Trainer::new(StumpGrower, TrainParams::default())
        .train(&mut booster, &dtrain, &WatchList::new().with("train", &dtrain), None)
        .unwrap_err();
    assert!(matches!(
        err,
        BoostError::Configuration(ConfigError::UnknownMetric(_))
    ));
}

#[test]
fn feature_count_changes_are_dimension_errors() {
    let dtrain = regression_dataset(20, 3, 0);
    let narrow = regression_dataset(20, 2, 1);
    let mut booster = Booster::new(Config::new()).unwrap();
    let trainer = Trainer::new(
        StumpGrower,
        TrainParams::builder().n_rounds(2).build().unwrap(),
    );

    let err = trainer
        .train(&mut booster, &dtrain, &WatchList::new().with("narrow", &narrow), None)
        .unwrap_err();
    assert!(matches!(err, BoostError::Dimension { expected: 3, actual: 2, .. }));

    trainer
        .train(&mut booster, &dtrain, &WatchList::new(), None)
        .unwrap();
    let err = trainer
        .train(&mut booster, &narrow, &WatchList::new(), None)
        .unwrap_err();
    assert!(matches!(err, BoostError::Dimension { .. }));
}

#[test]
fn grow_failure_aborts_without_committing() {
    let dtrain = regression_dataset(20, 2, 0);
    let grower = |model: &Booster, _: &Dataset, _: &Config| -> Result<Vec<Tree>, GrowError> {
        if model.version() == 2 {
            Err("histogram build failed".into())
        } else {
            Ok(vec![Tree::leaf(0.5, 1.0)])
        }
    };
    let params = TrainParams::builder().n_rounds(5).build().unwrap();
    let mut booster = Booster::new(Config::new()).unwrap();
    let err = Trainer::new(grower, params)
        .train(&mut booster, &dtrain, &WatchList::new(), None)
        .unwrap_err();

    assert!(matches!(err, BoostError::Grow { round: 2, .. }));
    assert!(err.to_string().contains("histogram build failed"));
    assert_eq!(booster.version(), 2);
    assert_eq!(booster.n_trees(), 2);
}

#[test]
fn invalid_grown_tree_is_rejected() {
    let dtrain = regression_dataset(20, 2, 0);
    // Splits on feature 7 of a 2-feature dataset.
    let grower = |_: &Booster, _: &Dataset, _: &Config| -> Result<Vec<Tree>, GrowError> {
        let mut b = treeboost::repr::TreeBuilder::new();
        let root = b.split(7, 0.5, true, 1.0, 2.0);
        let (l, r) = (b.leaf(0.0, 1.0), b.leaf(1.0, 1.0));
        b.set_children(root, l, r);
        Ok(vec![b.build()?])
    };
    let mut booster = Booster::new(Config::new()).unwrap();
    let err = Trainer::new(grower, TrainParams::default())
        .train(&mut booster, &dtrain, &WatchList::new(), None)
        .unwrap_err();
    assert!(matches!(err, BoostError::Grow { round: 0, .. }));
    assert_eq!(booster.n_trees(), 0);
}

#[test]
fn builtin_metrics_and_eval_log() {
    let data = binary_dataset(300, 3, 8);
    let (train_idx, valid_idx) = split_indices(300, 0.25, 8);
    let dtrain = data.select_rows(&train_idx);
    let dvalid = data.select_rows(&valid_idx);

    let config = Config::new()
        .with("objective", "binary:logistic")
        .with("eval_metric", "error,logloss")
        .with("eta", 0.5)
        .with("min_child_weight", 0.0);
    let mut booster = Booster::new(config).unwrap();
    let params = TrainParams::builder()
        .n_rounds(10)
        .early_stopping_rounds(3)
        .build()
        .unwrap();
    let summary = Trainer::new(StumpGrower, params)
        .train(
            &mut booster,
            &dtrain,
            &WatchList::new().with("train", &dtrain).with("valid", &dvalid),
            None,
        )
        .unwrap();

    let log = summary.eval_log();
    assert!(log[0].starts_with("[0]\ttrain-error:"));
    assert!(log[0].contains("\tvalid-logloss:"));
    let valid = summary.history.get("valid").unwrap();
    assert!(valid.last().unwrap() < &valid[0]);
    assert!(booster.get_attr("best_iteration").is_some());
}

#[test]
fn resumed_training_continues_round_numbering() {
    let dtrain = regression_dataset(50, 2, 4);
    let watches = WatchList::new().with("train", &dtrain);
    let mut booster = Booster::new(Config::new()).unwrap();

    let first = Trainer::new(StumpGrower, TrainParams::builder().n_rounds(2).build().unwrap())
        .train(&mut booster, &dtrain, &watches, None)
        .unwrap();
    let second = Trainer::new(StumpGrower, TrainParams::builder().n_rounds(4).build().unwrap())
        .train(&mut booster, &dtrain, &watches, None)
        .unwrap();

    assert_eq!(first.rounds_run, 2);
    assert_eq!(second.rounds_run, 2);
    assert!(second.eval_log()[0].starts_with("[2]"));
    assert_eq!(booster.version(), 4);
}

#[test]
fn cross_validation_reports_every_round() {
    let dtrain = regression_dataset(60, 3, 9);
    let trainer = Trainer::new(StumpGrower, TrainParams::builder().n_rounds(4).build().unwrap());
    let lines = cross_validate(&dtrain, 3, 42, &trainer, &Config::new()).unwrap();

    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("[0]\ttrain-rmse:"));
    assert!(lines[3].contains("\ttest-rmse:"));
    assert!(lines[1].contains('+'));

    // Same seed, same folds.
    assert_eq!(
        lines,
        cross_validate(&dtrain, 3, 42, &trainer, &Config::new()).unwrap()
    );

    assert!(matches!(
        cross_validate(&dtrain, 1, 42, &trainer, &Config::new()),
        Err(BoostError::Configuration(_))
    ));
    let tiny = Dataset::new(array![[0.0f32], [1.0]]).with_labels(vec![0.0, 1.0]).unwrap();
    assert!(matches!(
        cross_validate(&tiny, 3, 0, &trainer, &Config::new()),
        Err(BoostError::Configuration(_))
    ));
}
