//! Feature importance naming and failure cases.

use rstest::rstest;

use treeboost::testing::{StumpGrower, regression_dataset};
use treeboost::{BoostError, Booster, Config, ImportanceType, TrainParams, Trainer, WatchList};

const N_FEATURES: usize = 5;

fn trained() -> Booster {
    let dtrain = regression_dataset(200, N_FEATURES, 17);
    let params = TrainParams::builder().n_rounds(25).build().unwrap();
    let mut booster = Booster::new(Config::new().with("eta", 0.3)).unwrap();
    Trainer::new(StumpGrower, params)
        .train(&mut booster, &dtrain, &WatchList::new(), None)
        .unwrap();
    booster
}

fn prefixed_names() -> Vec<String> {
    (0..N_FEATURES).map(|i| format!("feature_{i}")).collect()
}

#[rstest]
fn supplied_names_prefix_every_key(
    #[values(
        ImportanceType::Weight,
        ImportanceType::Gain,
        ImportanceType::TotalGain,
        ImportanceType::Cover,
        ImportanceType::TotalCover
    )]
    kind: ImportanceType,
) {
    let booster = trained();
    let names = prefixed_names();
    let scores = booster.feature_importance(kind, Some(&names)).unwrap();

    assert!(!scores.is_empty());
    for (name, value) in &scores {
        assert!(name.starts_with("feature_"), "{name}");
        assert!(*value > 0.0);
    }
}

#[test]
fn positional_names_by_default() {
    let scores = trained().get_score(ImportanceType::Weight).unwrap();
    assert!(scores.keys().all(|k| k.starts_with('f')));

    let total: f64 = scores.values().sum();
    assert_eq!(total, 25.0);
}

#[test]
fn stored_feature_names_are_used() {
    let mut booster = trained();
    booster.set_feature_names(prefixed_names()).unwrap();
    let scores = booster.get_score(ImportanceType::TotalGain).unwrap();
    assert!(scores.keys().all(|k| k.starts_with("feature_")));
}

#[test]
fn mean_statistics_divide_totals_by_weight() {
    let booster = trained();
    let weight = booster.get_score(ImportanceType::Weight).unwrap();
    let gain = booster.get_score(ImportanceType::Gain).unwrap();
    let total_gain = booster.get_score(ImportanceType::TotalGain).unwrap();
    let cover = booster.get_score(ImportanceType::Cover).unwrap();
    let total_cover = booster.get_score(ImportanceType::TotalCover).unwrap();

    for (name, w) in &weight {
        approx::assert_relative_eq!(gain[name] * w, total_gain[name], max_relative = 1e-9);
        approx::assert_relative_eq!(cover[name] * w, total_cover[name], max_relative = 1e-9);
    }
}

#[test]
fn short_name_list_is_index_error() {
    let booster = trained();
    let used_max = booster
        .get_score(ImportanceType::Weight)
        .unwrap()
        .keys()
        .map(|k| k[1..].parse::<usize>().unwrap())
        .max()
        .unwrap();

    let short: Vec<String> = (0..used_max).map(|i| format!("feature_{i}")).collect();
    let err = booster
        .feature_importance(ImportanceType::Gain, Some(&short))
        .unwrap_err();
    assert!(matches!(err, BoostError::Index { .. }));
}

#[test]
fn empty_model_has_no_scores() {
    let booster = Booster::new(Config::new()).unwrap();
    assert!(booster.get_score(ImportanceType::Weight).unwrap().is_empty());
}
