//! # Persistence
//!
//! Models are stored as JSON [`ModelDocument`]s: a format tag, the save time,
//! the host's opaque [`PackageInfo`] and the model itself.
//!
//! ## Lifecycle
//!
//! - **Save** writes the document and resets the model's dirty flag. The
//!   package metadata of an already stored document is kept.
//! - **Load** rebuilds the model's index, binds every object to the store's
//!   dirty flag and resets that flag.
//!
//! List snapshots (`cachedList`) are a best-effort cache. With
//! `cache_snapshots` off they are left out of saved documents; the in-memory
//! model keeps them.
//!
//! ## Backends
//!
//! - [`FileStore`]: one `model-<uuid>.json` per model in a directory, written
//!   atomically (temp file, then rename).
//! - [`InMemoryStore`]: documents held as strings, for tests.

mod document;
mod fs;
mod memory;

pub use document::{EncryptionDetails, ModelDocument, PackageInfo, FORMAT};
pub use fs::FileStore;
pub use memory::InMemoryStore;

use uuid::Uuid;

use crate::error::Result;
use crate::model::ThreatModel;

/// Storage for whole models, keyed by model id.
pub trait ModelStore {
    /// Stores the model and resets its dirty flag.
    fn save(&mut self, model: &ThreatModel) -> Result<()>;

    /// Fails with [`TmError::NotFound`](crate::error::TmError::NotFound) for
    /// unknown ids.
    fn load(&self, id: Uuid) -> Result<ThreatModel>;

    /// Ids of the stored models, sorted.
    fn list(&self) -> Result<Vec<Uuid>>;

    fn delete(&mut self, id: Uuid) -> Result<()>;
}
