//! Domain types for model training and persistence.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::common::error::{FleetError, FleetResult};
use crate::data::domain::{FeatureSchema, VesselRecord};

use super::encoder::FeatureEncoder;
use super::forest::{Forest, MaxFeatures, TreeParams};

/// Fingerprint of a trained model.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ModelId(String);

impl ModelId {
    /// Construct a model identifier from a string slice.
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self(value.into())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ensemble hyper-parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            n_trees: 300,
            max_depth: 12,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            seed: 42,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> FleetResult<()> {
        if self.n_trees == 0 {
            return Err(FleetError::config("n_trees must be at least 1"));
        }
        if self.max_depth == 0 {
            return Err(FleetError::config("max_depth must be at least 1"));
        }
        if self.min_samples_split < 2 {
            return Err(FleetError::config("min_samples_split must be at least 2"));
        }
        if self.min_samples_leaf == 0 {
            return Err(FleetError::config("min_samples_leaf must be at least 1"));
        }
        Ok(())
    }

    pub(crate) fn tree_params(&self, n_features: usize) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            max_features: self.max_features.resolve(n_features),
        }
    }
}

/// Everything produced by one training run.
///
/// Created once by [`super::service::train`] and read-only afterwards; a new
/// training run yields a new value. Safe to share across threads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    pub(crate) id: ModelId,
    pub(crate) config: TrainConfig,
    pub(crate) encoder: FeatureEncoder,
    pub(crate) forest: Forest,
    /// `[unlabeled, shadow]` row counts seen at fit time.
    pub(crate) class_counts: [usize; 2],
    /// `[unlabeled, shadow]` inverse-frequency weights.
    pub(crate) class_weight: [f64; 2],
}

impl FittedModel {
    /// Fingerprint of schema, config and training rows.
    pub fn id(&self) -> &ModelId {
        &self.id
    }

    /// Hyper-parameters the forest was grown with.
    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Feature list frozen at fit time.
    pub fn schema(&self) -> &FeatureSchema {
        self.encoder.schema()
    }

    /// Frozen imputation and encoding parameters.
    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    /// Fitted tree ensemble.
    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    /// `[unlabeled, shadow]` row counts seen at fit time.
    pub fn class_counts(&self) -> [usize; 2] {
        self.class_counts
    }

    /// `[unlabeled, shadow]` inverse-frequency weights.
    pub fn class_weight(&self) -> [f64; 2] {
        self.class_weight
    }

    /// Out-of-bag accuracy recorded at fit time.
    pub fn oob_score(&self) -> f64 {
        self.forest.oob_score()
    }

    /// Reject any feature list other than the one the model was trained on.
    pub fn ensure_schema(&self, schema: &FeatureSchema) -> FleetResult<()> {
        if schema == self.schema() {
            Ok(())
        } else {
            Err(FleetError::mismatch(format!(
                "model {} was trained on [{}] but was called with [{}]",
                self.id,
                self.schema().names().join(", "),
                schema.names().join(", ")
            )))
        }
    }

    /// Probability that `record` is a shadow-fleet vessel.
    pub fn probability(&self, record: &VesselRecord) -> f64 {
        self.forest.predict_proba(&self.encoder.encode_row(record))
    }
}

/// Repository contract for fitted models.
pub trait ModelRepo {
    /// Store the model and return where it landed.
    fn put_model(&self, model: &FittedModel) -> FleetResult<PathBuf>;
    fn get_model(&self, id: &ModelId) -> FleetResult<FittedModel>;
}
