//! Service layer turning a labelled vessel frame into a fitted model.

use std::time::Instant;

use tracing::{info, warn};

use crate::common::error::{FleetError, FleetResult};
use crate::common::ids::SimpleHash;
use crate::data::domain::{FeatureSchema, Label, VesselFrame, VesselRecord};

use super::domain::{FittedModel, ModelId, TrainConfig};
use super::encoder::{FeatureEncoder, Transform};
use super::forest::{DecisionTree, Forest, TrainingSet};

/// Inverse-frequency weights `n / (2 * n_class)` for `[unlabeled, shadow]`.
pub fn balanced_class_weight(counts: [usize; 2]) -> [f64; 2] {
    let total = (counts[0] + counts[1]) as f64;
    let weight = |n: usize| {
        if n == 0 {
            0.0
        } else {
            total / (2.0 * n as f64)
        }
    };
    [weight(counts[0]), weight(counts[1])]
}

/// Fit preprocessing and the forest on confirmed positives plus unlabeled rows.
///
/// Unlabeled rows are treated as negatives even though some of them are
/// likely undiscovered shadow vessels.
pub fn train(frame: &VesselFrame, schema: &FeatureSchema, cfg: &TrainConfig) -> FleetResult<FittedModel> {
    cfg.validate()?;
    if schema.is_empty() {
        return Err(FleetError::training("feature list is empty"));
    }
    frame.require(schema)?;

    let counts = [frame.count_label(Label::Unlabeled), frame.count_label(Label::Shadow)];
    if counts[1] == 0 {
        return Err(FleetError::training("no confirmed shadow vessels in training data"));
    }
    if counts[0] == 0 {
        return Err(FleetError::training("no unlabeled vessels in training data"));
    }

    let start = Instant::now();
    let encoder = FeatureEncoder::fit(schema, &frame.records);
    for (spec, transform) in schema.specs().iter().zip(encoder.transforms()) {
        if transform.observed() == 0 {
            warn!(feature = %spec.name, "feature has no observed values");
        } else if let Transform::Categorical { categories, .. } = transform {
            info!(feature = %spec.name, categories = categories.len(), "categorical vocabulary");
        }
    }
    if encoder.usable_features() == 0 {
        return Err(FleetError::training(format!(
            "none of the features [{}] has an observed value",
            schema.names().join(", ")
        )));
    }

    let columns = encoder.encode_columns(&frame.records);
    let labels: Vec<u8> = frame.records.iter().map(|r| r.is_shadow).collect();
    let class_weight = balanced_class_weight(counts);
    let data = TrainingSet {
        columns: &columns,
        labels: &labels,
        class_weight,
    };
    let forest = Forest::fit(&data, cfg.tree_params(encoder.width()), cfg.n_trees, cfg.seed);
    if forest.oob_rows() == 0 {
        warn!("no row was out-of-bag; oob score is reported as 0");
    }

    let id = fingerprint(schema, cfg, &frame.records);
    info!(
        model_id = %id,
        shadow = counts[1],
        unlabeled = counts[0],
        encoded_columns = encoder.width(),
        trees = cfg.n_trees,
        deepest_tree = forest.trees().iter().map(DecisionTree::depth).max().unwrap_or(0),
        oob_score = forest.oob_score(),
        dur_ms = start.elapsed().as_millis() as u64,
        "trained forest"
    );

    Ok(FittedModel {
        id,
        config: cfg.clone(),
        encoder,
        forest,
        class_counts: counts,
        class_weight,
    })
}

fn fingerprint(schema: &FeatureSchema, cfg: &TrainConfig, records: &[VesselRecord]) -> ModelId {
    let mut hasher = SimpleHash::new();
    for spec in schema.specs() {
        hasher.update_str(&spec.name);
        hasher.update_str(&format!("{:?}", spec.kind));
    }
    hasher.update_str(&format!("{cfg:?}"));
    for record in records {
        hasher.update_str(&record.imo);
        hasher.update(&[record.is_shadow]);
    }
    ModelId::new(format!("sf-{}", hasher.finish_hex()))
}
