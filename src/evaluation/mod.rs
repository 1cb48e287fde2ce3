//! Evaluation domain: model self-assessment and the metrics exporter.

pub mod domain;
pub mod repo_fs;
pub mod service;

pub use domain::{EvalReport, EvaluationMetrics, FeatureImportance, MetricsDocument, MetricsRepo};
