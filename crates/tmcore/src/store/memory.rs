use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use super::document::{encode, keep_package, FORMAT, ModelDocument};
use super::ModelStore;
use crate::dirty::DirtyFlag;
use crate::error::{Result, TmError};
use crate::model::ThreatModel;

/// In-memory store for testing.
///
/// Documents are kept encoded so a load goes through the same deserialization
/// and rebinding as a file.
pub struct InMemoryStore {
    documents: HashMap<Uuid, String>,
    dirty: DirtyFlag,
    cache_snapshots: bool,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            documents: HashMap::new(),
            dirty: DirtyFlag::global(),
            cache_snapshots: true,
        }
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
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

    /// The stored document text, if any.
    pub fn raw(&self, id: Uuid) -> Option<&str> {
        self.documents.get(&id).map(String::as_str)
    }

    /// Stores a pre-encoded document, as a host importing a file would.
    pub fn insert_raw(&mut self, id: Uuid, json: String) {
        self.documents.insert(id, json);
    }
}

impl ModelStore for InMemoryStore {
    fn save(&mut self, model: &ThreatModel) -> Result<()> {
        let package = match self.documents.get(&model.id()) {
            Some(existing) => keep_package(Ok(existing.clone())),
            None => Default::default(),
        };
        let json = encode(FORMAT, model, &package, Utc::now(), self.cache_snapshots)?;
        self.documents.insert(model.id(), json);
        model.dirty().reset();
        Ok(())
    }

    fn load(&self, id: Uuid) -> Result<ThreatModel> {
        let json = self.documents.get(&id).ok_or(TmError::NotFound(id))?;
        Ok(ModelDocument::from_json(json, self.dirty.clone())?.into_model())
    }

    fn list(&self) -> Result<Vec<Uuid>> {
        let mut ids: Vec<Uuid> = self.documents.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }

    fn delete(&mut self, id: Uuid) -> Result<()> {
        self.documents
            .remove(&id)
            .map(|_| ())
            .ok_or(TmError::NotFound(id))
    }
}
