//! Evaluation services: in-sample sensitivity, out-of-bag accuracy and
//! feature importance folded back onto schema features.

use tracing::info;

use crate::common::error::{FleetError, FleetResult};
use crate::data::domain::{FeatureSchema, VesselFrame};
use crate::inference::service::score;
use crate::training::domain::FittedModel;

use super::domain::{EvalReport, EvaluationMetrics, FeatureImportance};

/// Probability above which a vessel counts as classified positive.
pub const DECISION_BOUNDARY: f64 = 0.5;

/// Fraction of `positives` the model classifies as shadow vessels.
///
/// Callers pass the confirmed-positive training rows, so this is recall on
/// known examples rather than an out-of-sample estimate.
pub fn sensitivity(model: &FittedModel, schema: &FeatureSchema, positives: &VesselFrame) -> FleetResult<f64> {
    if positives.is_empty() {
        return Err(FleetError::training("no confirmed positives to evaluate"));
    }
    let scored = score(model, schema, positives)?;
    let hits = scored
        .iter()
        .filter(|r| r.shadow_probability.unwrap_or(0.0) > DECISION_BOUNDARY)
        .count();
    Ok(hits as f64 / scored.len() as f64)
}

/// Sum encoded-column importances per schema feature.
///
/// Uses the encoder's column-to-feature mapping, so indicator columns such as
/// `Flag=Gabon` and `Flag=Panama` collapse into one `Flag` entry. Sorted by
/// descending importance; ties keep schema order.
pub fn feature_importance(model: &FittedModel) -> Vec<FeatureImportance> {
    let schema = model.schema();
    let mut totals = vec![0.0; schema.len()];
    for (column, value) in model.encoder().columns().iter().zip(model.forest().importances()) {
        totals[column.base] += value;
    }

    let mut out: Vec<FeatureImportance> = schema
        .specs()
        .iter()
        .zip(totals)
        .map(|(spec, importance)| FeatureImportance {
            feature: spec.name.clone(),
            importance,
        })
        .collect();
    out.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    out
}

/// Run every self-assessment for a freshly trained model.
pub fn evaluate(model: &FittedModel, schema: &FeatureSchema, positives: &VesselFrame) -> FleetResult<EvalReport> {
    let metrics = EvaluationMetrics {
        sensitivity: sensitivity(model, schema, positives)?,
        oob_score: model.oob_score(),
    };
    let importances = feature_importance(model);

    info!(
        model_id = %model.id(),
        sensitivity = metrics.sensitivity,
        oob_score = metrics.oob_score,
        top_feature = importances.first().map(|f| f.feature.as_str()).unwrap_or("-"),
        "evaluated model"
    );
    Ok(EvalReport {
        metrics,
        importances,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::domain::{Label, VesselRecord};
    use crate::training::domain::TrainConfig;
    use crate::training::service::train;

    fn vessel(imo: &str, label: Label, flag: &str, vessel_type: &str, gt: f64) -> VesselRecord {
        let mut r = VesselRecord::new(imo, label);
        r.flag = Some(flag.into());
        r.vessel_type = Some(vessel_type.into());
        r.gt = Some(gt);
        r
    }

    fn setup() -> (FittedModel, FeatureSchema, VesselFrame) {
        let positives = vec![
            vessel("s1", Label::Shadow, "Gabon", "Tanker", 60_000.0),
            vessel("s2", Label::Shadow, "Gabon", "Tanker", 62_000.0),
            vessel("s3", Label::Shadow, "Cameroon", "Tanker", 58_000.0),
        ];
        let flags = ["Malta", "Panama", "Liberia", "Norway", "Greece", "Cyprus"];
        let mut records = positives.clone();
        for (i, flag) in flags.iter().cycle().take(12).enumerate() {
            records.push(vessel(&format!("u{i}"), Label::Unlabeled, flag, "Cargo", 2_000.0 * (i + 1) as f64));
        }
        let schema = FeatureSchema::parse("Type:categorical,Flag:categorical,GT:numeric").unwrap();
        let cfg = TrainConfig { n_trees: 60, ..TrainConfig::default() };
        let model = train(&VesselFrame::complete(records), &schema, &cfg).unwrap();
        (model, schema, VesselFrame::complete(positives))
    }

    #[test]
    fn importance_mass_is_conserved() {
        let (model, _, _) = setup();
        let folded = feature_importance(&model);
        assert_eq!(folded.len(), 3);
        let raw: f64 = model.forest().importances().iter().sum();
        let total: f64 = folded.iter().map(|f| f.importance).sum();
        assert!((raw - total).abs() < 1e-9);
        assert!(folded.windows(2).all(|w| w[0].importance >= w[1].importance));
    }

    #[test]
    fn importance_uses_base_feature_names() {
        let (model, _, _) = setup();
        let mut names: Vec<String> = feature_importance(&model).into_iter().map(|f| f.feature).collect();
        names.sort();
        assert_eq!(names, vec!["Flag", "GT", "Type"]);
    }

    #[test]
    fn separable_positives_are_recovered() {
        let (model, schema, positives) = setup();
        let report = evaluate(&model, &schema, &positives).unwrap();
        assert!(report.metrics.sensitivity >= 0.66);
        assert!((0.0..=1.0).contains(&report.metrics.oob_score));
    }

    #[test]
    fn empty_positive_set_is_rejected() {
        let (model, schema, _) = setup();
        let empty = VesselFrame::complete(Vec::new());
        assert!(sensitivity(&model, &schema, &empty).is_err());
    }
}
