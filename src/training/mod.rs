//! Training domain: preprocessing, the bagged forest and model persistence.

pub mod domain;
pub mod encoder;
pub mod forest;
pub mod repo_fs;
pub mod service;

pub use domain::{FittedModel, ModelId, ModelRepo, TrainConfig};
pub use encoder::{EncodedColumn, FeatureEncoder};
pub use forest::MaxFeatures;
