//! Runtime configuration loaded from environment and an optional `.env` file.

use std::env;
use std::path::PathBuf;

use crate::common::error::{FleetError, FleetResult};
use crate::data::domain::FeatureSchema;
use crate::training::domain::TrainConfig;

pub const DEFAULT_FEATURES: &str =
    "Type:categorical,Flag:categorical,Age:numeric,GT:numeric,DWT:numeric,Length:numeric,Width:numeric";

/// Snapshot of configuration values consumed by the core.
#[derive(Clone, Debug)]
pub struct AppCfg {
    pub data_root: PathBuf,
    pub shadow_file: PathBuf,
    pub unknown_file: PathBuf,
    pub output_file: PathBuf,
    pub metrics_file: PathBuf,
    pub importance_file: PathBuf,
    pub threshold: Option<f64>,
    pub features: FeatureSchema,
    pub n_trees: usize,
    pub max_depth: usize,
    pub seed: u64,
    pub reference_year: i32,
    pub log_level: String,
    pub log_json: bool,
}

impl AppCfg {
    /// Create a configuration snapshot from the process environment, after
    /// merging a `.env` file from the working directory when one exists.
    pub fn load() -> FleetResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a snapshot from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> FleetResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str, default: &str| -> String {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let threshold = match lookup("SHADOWFLEET_THRESHOLD").map(|v| v.trim().to_string()) {
            Some(raw) if !raw.is_empty() => Some(parse_threshold(&raw)?),
            _ => None,
        };

        let n_trees: usize = parse_key("SHADOWFLEET_TREES", &text("SHADOWFLEET_TREES", "300"))?;
        if n_trees == 0 {
            return Err(FleetError::config("SHADOWFLEET_TREES must be at least 1"));
        }
        let max_depth: usize =
            parse_key("SHADOWFLEET_MAX_DEPTH", &text("SHADOWFLEET_MAX_DEPTH", "12"))?;
        if max_depth == 0 {
            return Err(FleetError::config("SHADOWFLEET_MAX_DEPTH must be at least 1"));
        }

        let features = FeatureSchema::parse(&text("SHADOWFLEET_FEATURES", DEFAULT_FEATURES))?;

        Ok(Self {
            data_root: PathBuf::from(text("SHADOWFLEET_DATA_ROOT", "./data")),
            shadow_file: PathBuf::from(text(
                "SHADOWFLEET_SHADOW_FILE",
                "vessel_data/shadow_vessels.csv",
            )),
            unknown_file: PathBuf::from(text(
                "SHADOWFLEET_UNKNOWN_FILE",
                "vessel_data/unknown_vessels.csv",
            )),
            output_file: PathBuf::from(text("SHADOWFLEET_OUTPUT_FILE", "suspect_vessels.csv")),
            metrics_file: PathBuf::from(text("SHADOWFLEET_METRICS_FILE", "metrics.json")),
            importance_file: PathBuf::from(text(
                "SHADOWFLEET_IMPORTANCE_FILE",
                "feature_importance.csv",
            )),
            threshold,
            features,
            n_trees,
            max_depth,
            seed: parse_key("SHADOWFLEET_SEED", &text("SHADOWFLEET_SEED", "42"))?,
            reference_year: parse_key(
                "SHADOWFLEET_REFERENCE_YEAR",
                &text("SHADOWFLEET_REFERENCE_YEAR", "2025"),
            )?,
            log_level: text("SHADOWFLEET_LOG_LEVEL", "info"),
            log_json: parse_key("SHADOWFLEET_LOG_JSON", &text("SHADOWFLEET_LOG_JSON", "false"))?,
        })
    }

    /// Forest hyper-parameters derived from this snapshot.
    pub fn train_config(&self) -> TrainConfig {
        TrainConfig {
            n_trees: self.n_trees,
            max_depth: self.max_depth,
            seed: self.seed,
            ..TrainConfig::default()
        }
    }

    /// Directory that holds persisted models.
    pub fn models_dir(&self) -> PathBuf {
        self.data_root.join("models")
    }
}

/// Parse a probability threshold, rejecting values outside `[0, 1]`.
pub fn parse_threshold(raw: &str) -> FleetResult<f64> {
    let value: f64 = parse_key("SHADOWFLEET_THRESHOLD", raw)?;
    if !(0.0..=1.0).contains(&value) {
        return Err(FleetError::config(format!(
            "threshold {value} is outside [0, 1]"
        )));
    }
    Ok(value)
}

fn parse_key<T: std::str::FromStr>(key: &str, raw: &str) -> FleetResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| FleetError::config(format!("{key}: cannot parse {raw:?}")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::data::domain::FeatureKind;

    fn cfg_from(pairs: &[(&str, &str)]) -> FleetResult<AppCfg> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppCfg::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_match_documented_values() {
        let cfg = cfg_from(&[]).unwrap();
        assert_eq!(cfg.n_trees, 300);
        assert_eq!(cfg.max_depth, 12);
        assert_eq!(cfg.seed, 42);
        assert_eq!(cfg.reference_year, 2025);
        assert_eq!(cfg.threshold, None);
        assert_eq!(cfg.features.len(), 7);
        assert_eq!(cfg.features.specs()[1].name, "Flag");
        assert_eq!(cfg.features.specs()[1].kind, FeatureKind::Categorical);
        assert!(!cfg.log_json);
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = cfg_from(&[
            ("SHADOWFLEET_THRESHOLD", "0.8"),
            ("SHADOWFLEET_TREES", "25"),
            ("SHADOWFLEET_FEATURES", "Flag:categorical, DWT:numeric"),
        ])
        .unwrap();
        assert_eq!(cfg.threshold, Some(0.8));
        assert_eq!(cfg.train_config().n_trees, 25);
        assert_eq!(cfg.features.names(), vec!["Flag", "DWT"]);
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert!(matches!(
            cfg_from(&[("SHADOWFLEET_THRESHOLD", "1.5")]),
            Err(FleetError::Config(_))
        ));
        assert!(matches!(
            cfg_from(&[("SHADOWFLEET_TREES", "many")]),
            Err(FleetError::Config(_))
        ));
        assert!(matches!(
            cfg_from(&[("SHADOWFLEET_TREES", "0")]),
            Err(FleetError::Config(_))
        ));
        assert!(matches!(
            cfg_from(&[("SHADOWFLEET_FEATURES", "Owner:categorical")]),
            Err(FleetError::Schema(_))
        ));
    }
}
