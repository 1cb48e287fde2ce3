//! Domain primitives for model self-assessment and its exported form.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::error::FleetResult;

/// Scalar quality figures for one training run.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    /// Share of confirmed positives the model classifies as positive.
    ///
    /// In-sample recall: the confirmed set was part of training, so this is
    /// an optimistic figure and not an estimate of real-world recall.
    pub sensitivity: f64,
    /// Accuracy of each row judged only by trees that did not draw it.
    pub oob_score: f64,
}

/// Importance mass attributed to one schema feature.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    #[serde(rename = "Variable")]
    pub feature: String,
    #[serde(rename = "Importance")]
    pub importance: f64,
}

/// Everything the evaluator produces.
#[derive(Clone, Debug, PartialEq)]
pub struct EvalReport {
    pub metrics: EvaluationMetrics,
    pub importances: Vec<FeatureImportance>,
}

/// Flat key-value document written for reporting tooling. Keys never change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricsDocument {
    pub sensitivity: f64,
    pub oob_score: f64,
    pub model_id: String,
    pub n_trees: usize,
    pub positives: usize,
    pub unlabeled: usize,
    pub candidates: usize,
}

/// Repository contract for evaluation artefacts.
pub trait MetricsRepo {
    fn put_metrics(&self, path: &Path, doc: &MetricsDocument) -> FleetResult<()>;
    fn put_importances(&self, path: &Path, importances: &[FeatureImportance]) -> FleetResult<()>;
}
