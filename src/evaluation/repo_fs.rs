//! Metrics exporter: JSON metrics document and CSV importance table.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use crate::common::error::FleetResult;

use super::domain::{FeatureImportance, MetricsDocument, MetricsRepo};

/// Importance table columns read by the dashboard.
pub const IMPORTANCE_HEADER: [&str; 2] = ["Variable", "Importance"];

#[derive(Default)]
pub struct FsMetricsRepo;

impl FsMetricsRepo {
    pub fn new() -> Self {
        Self
    }
}

fn ensure_parent(path: &Path) -> FleetResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

impl MetricsRepo for FsMetricsRepo {
    fn put_metrics(&self, path: &Path, doc: &MetricsDocument) -> FleetResult<()> {
        ensure_parent(path)?;
        let mut file = File::create(path)?;
        serde_json::to_writer_pretty(&mut file, doc)?;
        file.write_all(b"\n")?;
        Ok(())
    }

    fn put_importances(&self, path: &Path, importances: &[FeatureImportance]) -> FleetResult<()> {
        ensure_parent(path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)?;
        writer.write_record(IMPORTANCE_HEADER)?;
        for row in importances {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}
