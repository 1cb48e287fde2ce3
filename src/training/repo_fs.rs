//! Filesystem repository for fitted models.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::common::error::FleetResult;

use super::domain::{FittedModel, ModelId, ModelRepo};

/// Stores each model as `<root>/<model_id>/model.json`.
pub struct FsModelRepo {
    root: PathBuf,
}

impl FsModelRepo {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn artefact_path(&self, id: &ModelId) -> PathBuf {
        self.root.join(id.as_str()).join("model.json")
    }

    /// Load a model from an explicit file path.
    pub fn load_path(path: &Path) -> FleetResult<FittedModel> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

impl ModelRepo for FsModelRepo {
    fn put_model(&self, model: &FittedModel) -> FleetResult<PathBuf> {
        let path = self.artefact_path(model.id());
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer(&mut writer, model)?;
        writer.flush()?;
        info!(model_id = %model.id(), path = %path.display(), "stored model");
        Ok(path)
    }

    fn get_model(&self, id: &ModelId) -> FleetResult<FittedModel> {
        Self::load_path(&self.artefact_path(id))
    }
}
