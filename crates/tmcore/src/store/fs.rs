use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use super::document::{encode, keep_package, write_atomic, ModelDocument, FORMAT};
use super::ModelStore;
use crate::dirty::DirtyFlag;
use crate::error::{Result, TmError};
use crate::model::ThreatModel;

/// One JSON document per model in a directory.
pub struct FileStore {
    root: PathBuf,
    dirty: DirtyFlag,
    cache_snapshots: bool,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dirty: DirtyFlag::global(),
            cache_snapshots: true,
        }
    }

    /// Flag that loaded models are bound to.
    pub fn with_dirty_flag(mut self, dirty: DirtyFlag) -> Self {
        self.dirty = dirty;
        self
    }

    pub fn with_cache_snapshots(mut self, cache_snapshots: bool) -> Self {
        self.cache_snapshots = cache_snapshots;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the document for model `id`, whether or not it exists.
    pub fn path_of(&self, id: Uuid) -> PathBuf {
        self.root.join(format!("model-{}.json", id))
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root)?;
        }
        Ok(())
    }
}

impl ModelStore for FileStore {
    fn save(&mut self, model: &ThreatModel) -> Result<()> {
        self.ensure_dir()?;
        let path = self.path_of(model.id());

        let package = if path.is_file() {
            keep_package(fs::read_to_string(&path).map_err(TmError::from))
        } else {
            Default::default()
        };
        let json = encode(FORMAT, model, &package, Utc::now(), self.cache_snapshots)?;
        write_atomic(&path, &json)?;
        model.dirty().reset();

        info!(model = %model.id(), path = %path.display(), "model saved");
        Ok(())
    }

    fn load(&self, id: Uuid) -> Result<ThreatModel> {
        let path = self.path_of(id);
        if !path.is_file() {
            return Err(TmError::NotFound(id));
        }
        debug!(path = %path.display(), "loading model");
        Ok(ModelDocument::read(&path, self.dirty.clone())?.into_model())
    }

    fn list(&self) -> Result<Vec<Uuid>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let id = path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| name.strip_prefix("model-"))
                .and_then(|rest| rest.strip_suffix(".json"))
                .and_then(|uuid| Uuid::parse_str(uuid).ok());
            if let Some(id) = id {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn delete(&mut self, id: Uuid) -> Result<()> {
        let path = self.path_of(id);
        if !path.is_file() {
            return Err(TmError::NotFound(id));
        }
        fs::remove_file(path)?;
        Ok(())
    }
}
