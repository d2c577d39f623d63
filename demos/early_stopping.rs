//! Train with a validation watch-list and early stopping, then save, reload
//! and resume.
//!
//! ```bash
//! RUST_LOG=info cargo run --example early_stopping
//! ```

use tracing_subscriber::EnvFilter;

use treeboost::testing::{StumpGrower, binary_dataset, split_indices};
use treeboost::{
    Booster, Config, ImportanceType, PredictionKind, TrainParams, Trainer, Verbosity, WatchList,
};

fn main() -> treeboost::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let data = binary_dataset(2_000, 6, 1);
    let (train_idx, valid_idx) = split_indices(data.n_rows(), 0.2, 1);
    let dtrain = data.select_rows(&train_idx);
    let dvalid = data.select_rows(&valid_idx);

    let config = Config::new()
        .with("objective", "binary:logistic")
        .with("eval_metric", "error,logloss")
        .with("eta", 0.3);
    let mut booster = Booster::new(config)?;
    booster.set_feature_names((0..6).map(|i| format!("x{i}")).collect())?;

    let params = TrainParams::builder()
        .n_rounds(200)
        .early_stopping_rounds(10)
        .verbosity(Verbosity::Info)
        .build()?;
    let trainer = Trainer::new(StumpGrower, params);
    let watches = WatchList::new().with("train", &dtrain).with("valid", &dvalid);
    let summary = trainer.train(&mut booster, &dtrain, &watches, None)?;

    println!(
        "stopped_early={} rounds={} best_iteration={:?} best_score={:?}",
        summary.stopped_early,
        booster.version(),
        booster.get_attr("best_iteration"),
        booster.get_attr("best_score"),
    );

    for (name, gain) in booster.get_score(ImportanceType::TotalGain)? {
        println!("{name}: {gain:.4}");
    }

    // Persist, reload and keep training from the saved round counter.
    let path = std::env::temp_dir().join("treeboost-early-stopping.tbst");
    booster.save(&path)?;
    let mut resumed = Booster::load(&path)?;
    let more = TrainParams::builder()
        .n_rounds(resumed.version() + 5)
        .verbosity(Verbosity::Info)
        .build()?;
    Trainer::new(StumpGrower, more).train(&mut resumed, &dtrain, &watches, None)?;

    let probs = resumed.predict(&dvalid, PredictionKind::Transformed)?;
    println!("resumed to {} rounds; first probability {:.4}", resumed.version(), probs[[0, 0]]);
    Ok(())
}
