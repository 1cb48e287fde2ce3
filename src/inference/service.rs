//! Scoring of the unlabeled population with a fitted model.

use std::time::Instant;

use tracing::info;

use crate::common::error::FleetResult;
use crate::data::domain::{FeatureSchema, VesselFrame, VesselRecord};
use crate::training::domain::FittedModel;

/// Annotate every record with `shadow_probability`, preserving input order.
///
/// `schema` must be the exact feature list the model was trained on, and the
/// frame must carry every one of those columns.
pub fn score(model: &FittedModel, schema: &FeatureSchema, frame: &VesselFrame) -> FleetResult<Vec<VesselRecord>> {
    model.ensure_schema(schema)?;
    frame.require(schema)?;

    let start = Instant::now();
    let scored: Vec<VesselRecord> = frame
        .records
        .iter()
        .map(|record| {
            let mut record = record.clone();
            record.shadow_probability = Some(model.probability(&record));
            record
        })
        .collect();

    info!(
        model_id = %model.id(),
        rows = scored.len(),
        dur_ms = start.elapsed().as_millis() as u64,
        "scored vessels"
    );
    Ok(scored)
}

/// Keep rows with probability `>= threshold` (all rows when `None`) and sort
/// them by descending probability. Equal probabilities keep input order.
pub fn select_candidates(records: Vec<VesselRecord>, threshold: Option<f64>) -> Vec<VesselRecord> {
    let probability = |r: &VesselRecord| r.shadow_probability.unwrap_or(0.0);
    let mut kept: Vec<VesselRecord> = records
        .into_iter()
        .filter(|r| threshold.map_or(true, |t| probability(r) >= t))
        .collect();
    kept.sort_by(|a, b| probability(b).total_cmp(&probability(a)));
    kept
}
