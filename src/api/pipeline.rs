//! End-to-end batch pipeline: load, normalise, train, score, evaluate, export.
//!
//! Stages run strictly in sequence; each one needs the complete output of the
//! previous one. The only parallel work happens inside forest training.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::info;

use crate::common::config::AppCfg;
use crate::common::error::FleetResult;
use crate::data::domain::{Label, VesselRepo};
use crate::data::repo_fs::FsVesselRepo;
use crate::data::service::{normalize, prepare, NormalizeReport};
use crate::evaluation::domain::{EvalReport, MetricsDocument, MetricsRepo};
use crate::evaluation::repo_fs::FsMetricsRepo;
use crate::evaluation::service::evaluate;
use crate::inference::service::{score, select_candidates};
use crate::training::domain::{ModelId, ModelRepo};
use crate::training::repo_fs::FsModelRepo;
use crate::training::service::train;

/// Summary of a full pipeline run.
#[derive(Clone, Debug)]
pub struct PipelineReport {
    pub model_id: ModelId,
    pub model_path: PathBuf,
    pub shadow: NormalizeReport,
    pub unknown: NormalizeReport,
    pub evaluation: EvalReport,
    pub scored: usize,
    pub candidates: usize,
}

/// Summary of scoring a file with a stored model.
#[derive(Clone, Debug)]
pub struct ScoreReport {
    pub model_id: ModelId,
    pub input: NormalizeReport,
    pub candidates: usize,
}

/// Train on the configured files and write scores, metrics and importances.
pub fn run(cfg: &AppCfg) -> FleetResult<PipelineReport> {
    let start = Instant::now();
    let vessels = FsVesselRepo::new();

    info!(shadow = %cfg.shadow_file.display(), unknown = %cfg.unknown_file.display(), "loading input");
    let (shadow, shadow_report) = normalize(
        &vessels.load_raw(&cfg.shadow_file)?,
        Label::Shadow,
        cfg.reference_year,
    );
    let (unknown, unknown_report) = normalize(
        &vessels.load_raw(&cfg.unknown_file)?,
        Label::Unlabeled,
        cfg.reference_year,
    );
    let prepared = prepare(shadow, unknown);
    info!(
        shadow = prepared.positives.len(),
        unknown = prepared.unlabeled.len(),
        "merged training data"
    );

    let model = train(&prepared.training, &cfg.features, &cfg.train_config())?;
    let model_path = FsModelRepo::new(cfg.models_dir()).put_model(&model)?;
    info!(
        path = %model_path.display(),
        class_counts = ?model.class_counts(),
        class_weight = ?model.class_weight(),
        "stored model"
    );

    let scored = score(&model, &cfg.features, &prepared.unlabeled)?;
    let scored_count = scored.len();
    let candidates = select_candidates(scored, cfg.threshold);
    vessels.write_scored(&cfg.output_file, &candidates)?;
    info!(
        path = %cfg.output_file.display(),
        candidates = candidates.len(),
        threshold = ?cfg.threshold,
        "wrote scored vessels"
    );

    let evaluation = evaluate(&model, &cfg.features, &prepared.positives)?;
    let metrics = FsMetricsRepo::new();
    let doc = MetricsDocument {
        sensitivity: evaluation.metrics.sensitivity,
        oob_score: evaluation.metrics.oob_score,
        model_id: model.id().to_string(),
        n_trees: model.config().n_trees,
        positives: prepared.positives.len(),
        unlabeled: prepared.unlabeled.len(),
        candidates: candidates.len(),
    };
    metrics.put_metrics(&cfg.metrics_file, &doc)?;
    metrics.put_importances(&cfg.importance_file, &evaluation.importances)?;
    info!(
        metrics = %cfg.metrics_file.display(),
        importances = %cfg.importance_file.display(),
        dur_ms = start.elapsed().as_millis() as u64,
        "pipeline finished"
    );

    Ok(PipelineReport {
        model_id: model.id().clone(),
        model_path,
        shadow: shadow_report,
        unknown: unknown_report,
        evaluation,
        scored: scored_count,
        candidates: candidates.len(),
    })
}

/// Score `input` with a stored model, using the feature list it was trained on.
pub fn score_file(
    model_path: &Path,
    input: &Path,
    output: &Path,
    threshold: Option<f64>,
    reference_year: i32,
) -> FleetResult<ScoreReport> {
    let model = FsModelRepo::load_path(model_path)?;
    let vessels = FsVesselRepo::new();
    let (frame, input_report) = normalize(&vessels.load_raw(input)?, Label::Unlabeled, reference_year);

    let scored = score(&model, model.schema(), &frame)?;
    let candidates = select_candidates(scored, threshold);
    vessels.write_scored(output, &candidates)?;
    info!(
        model_id = %model.id(),
        path = %output.display(),
        candidates = candidates.len(),
        "wrote scored vessels"
    );

    Ok(ScoreReport {
        model_id: model.id().clone(),
        input: input_report,
        candidates: candidates.len(),
    })
}
