//! Deterministic reference grow collaborator.

use crate::data::Dataset;
use crate::model::{Booster, Config};
use crate::repr::{Tree, TreeBuilder};
use crate::training::{GradPair, GrowError, PredictionKind, TreeGrower};

/// Grows one depth-one tree (a stump) per output group.
///
/// Gradients come from the model's objective at the current margins. The
/// split maximizes the second-order gain
/// `G_L²/(H_L+λ) + G_R²/(H_R+λ) - G²/(H+λ)`, with missing values sent to
/// whichever side scores higher. Reads `eta` (0.3), `lambda` (1.0) and
/// `min_child_weight` (1.0) from the configuration on every call.
///
/// The output depends only on the model, the data and the configuration,
/// so two runs over the same inputs produce identical trees.
#[derive(Debug, Clone, Copy, Default)]
pub struct StumpGrower;

#[derive(Debug, Clone, Copy)]
struct StumpParams {
    eta: f64,
    lambda: f64,
    min_child_weight: f64,
}

impl StumpParams {
    fn from_config(config: &Config) -> Result<Self, GrowError> {
        Ok(Self {
            eta: config.get_f64("eta")?.unwrap_or(0.3),
            lambda: config.get_f64("lambda")?.unwrap_or(1.0),
            min_child_weight: config.get_f64("min_child_weight")?.unwrap_or(1.0),
        })
    }

    fn score(&self, g: f64, h: f64) -> f64 {
        g * g / (h + self.lambda)
    }

    fn leaf(&self, g: f64, h: f64) -> f32 {
        (-self.eta * g / (h + self.lambda)) as f32
    }
}

#[derive(Debug, Clone, Copy)]
struct Split {
    feature: u32,
    threshold: f32,
    default_left: bool,
    gain: f64,
    left: (f64, f64),
    right: (f64, f64),
}

impl TreeGrower for StumpGrower {
    fn grow(&self, model: &Booster, train: &Dataset, config: &Config) -> Result<Vec<Tree>, GrowError> {
        let params = StumpParams::from_config(config)?;
        let labels = train.labels().ok_or("training data has no labels")?;
        let margins = model.predict(train, PredictionKind::Margin)?;

        (0..model.n_groups())
            .map(|group| {
                let grads = model
                    .objective()
                    .gradients(margins.view(), labels, train.weights(), group);
                grow_stump(train, &grads, &params)
            })
            .collect()
    }
}

fn grow_stump(train: &Dataset, grads: &[GradPair], params: &StumpParams) -> Result<Tree, GrowError> {
    let (g, h) = grads.iter().fold((0.0f64, 0.0f64), |(g, h), p| {
        (g + f64::from(p.grad), h + f64::from(p.hess))
    });
    let parent = params.score(g, h);

    let mut best: Option<Split> = None;
    for feature in 0..train.n_features() {
        if let Some(split) = best_split(train, feature, grads, (g, h), parent, params) {
            if best.is_none_or(|b| split.gain > b.gain) {
                best = Some(split);
            }
        }
    }

    let Some(split) = best else {
        return Ok(Tree::leaf(params.leaf(g, h), h as f32));
    };

    let mut b = TreeBuilder::new();
    let root = b.split(
        split.feature,
        split.threshold,
        split.default_left,
        split.gain as f32,
        h as f32,
    );
    let left = b.leaf(params.leaf(split.left.0, split.left.1), split.left.1 as f32);
    let right = b.leaf(params.leaf(split.right.0, split.right.1), split.right.1 as f32);
    b.set_children(root, left, right);
    Ok(b.build()?)
}

fn best_split(
    train: &Dataset,
    feature: usize,
    grads: &[GradPair],
    total: (f64, f64),
    parent: f64,
    params: &StumpParams,
) -> Option<Split> {
    let features = train.features();
    let column = features.column(feature);
    let mut order: Vec<usize> = (0..train.n_rows())
        .filter(|&i| !column[i].is_nan())
        .collect();
    order.sort_by(|&a, &b| column[a].total_cmp(&column[b]).then(a.cmp(&b)));

    let (present_g, present_h) = order.iter().fold((0.0, 0.0), |(g, h), &i| {
        (g + f64::from(grads[i].grad), h + f64::from(grads[i].hess))
    });
    let (miss_g, miss_h) = (total.0 - present_g, total.1 - present_h);

    let mut best: Option<Split> = None;
    let (mut gl, mut hl) = (0.0f64, 0.0f64);
    for w in 0..order.len().saturating_sub(1) {
        let i = order[w];
        gl += f64::from(grads[i].grad);
        hl += f64::from(grads[i].hess);

        let next = column[order[w + 1]];
        if column[i] == next {
            continue;
        }
        let (gr, hr) = (present_g - gl, present_h - hl);

        for default_left in [true, false] {
            let (l, r) = if default_left {
                ((gl + miss_g, hl + miss_h), (gr, hr))
            } else {
                ((gl, hl), (gr + miss_g, hr + miss_h))
            };
            if l.1 < params.min_child_weight || r.1 < params.min_child_weight {
                continue;
            }
            let gain = params.score(l.0, l.1) + params.score(r.0, r.1) - parent;
            if gain > 1e-12 && best.is_none_or(|b| gain > b.gain) {
                best = Some(Split {
                    feature: feature as u32,
                    // Values strictly below the next distinct value go left.
                    threshold: next,
                    default_left,
                    gain,
                    left: l,
                    right: r,
                });
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::{TrainParams, Trainer, WatchList};
    use ndarray::array;

    #[test]
    fn splits_on_informative_feature() {
        let ds = Dataset::new(array![[0.0f32, 5.0], [0.1, 5.0], [0.9, 5.0], [1.0, 5.0]])
            .with_labels(vec![0.0, 0.0, 1.0, 1.0])
            .unwrap();
        let config = Config::new().with("base_score", 0.5).with("min_child_weight", 0.0);
        let mut booster = Booster::new(config.clone()).unwrap();
        booster.bind_features(2).unwrap();

        let trees = StumpGrower.grow(&booster, &ds, &config).unwrap();
        assert_eq!(trees.len(), 1);
        let tree = &trees[0];
        assert!(!tree.is_leaf(0));
        assert_eq!(tree.split_index(0), 0);
        assert_eq!(tree.split_threshold(0), 0.9);
        assert!(tree.predict_row(&[0.0, 5.0]) < 0.0);
        assert!(tree.predict_row(&[1.0, 5.0]) > 0.0);
    }

    #[test]
    fn missing_values_follow_the_better_side() {
        let ds = Dataset::new(array![[0.0f32], [0.1], [f32::NAN], [0.9], [1.0]])
            .with_labels(vec![0.0, 0.0, 1.0, 1.0, 1.0])
            .unwrap();
        let config = Config::new().with("base_score", 0.5).with("min_child_weight", 0.0);
        let mut booster = Booster::new(config.clone()).unwrap();
        booster.bind_features(1).unwrap();

        let tree = &StumpGrower.grow(&booster, &ds, &config).unwrap()[0];
        assert!(!tree.is_leaf(0));
        assert_eq!(tree.split_index(0), 0);
        assert!(tree.predict_row(&[0.0]) < 0.0);
        assert!(tree.predict_row(&[f32::NAN]) > 0.0);
    }

    #[test]
    fn constant_features_give_a_leaf() {
        let ds = Dataset::new(array![[1.0f32], [1.0]])
            .with_labels(vec![2.0, 4.0])
            .unwrap();
        let config = Config::new().with("base_score", 0.0).with("eta", 1.0).with("lambda", 0.0);
        let booster = Booster::new(config.clone()).unwrap();
        let trees = StumpGrower.grow(&booster, &ds, &config).unwrap();
        assert!(trees[0].is_leaf(0));
        assert_eq!(trees[0].leaf_value(0), 3.0);
    }

    #[test]
    fn unlabeled_data_fails() {
        let ds = Dataset::new(array![[1.0f32]]);
        let booster = Booster::new(Config::new()).unwrap();
        assert!(StumpGrower.grow(&booster, &ds, booster.config()).is_err());
    }

    #[test]
    fn training_reduces_error() {
        let ds = crate::testing::regression_dataset(200, 3, 11);
        let params = TrainParams::builder().n_rounds(20).build().unwrap();
        let trainer = Trainer::new(StumpGrower, params);
        let mut booster = Booster::new(Config::new().with("eta", 0.5)).unwrap();
        let summary = trainer
            .train(&mut booster, &ds, &WatchList::new().with("train", &ds), None)
            .unwrap();
        let rmse = summary.history.get("train").unwrap();
        assert!(rmse[19] < rmse[0]);
    }
}
