//! The on-disk envelope of a model.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::dirty::DirtyFlag;
use crate::error::{Result, TmError};
use crate::model::ThreatModel;

/// Format tag written into every document.
pub const FORMAT: &str = "tmcore/1";

/// How the package was protected by the host. Carried through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionDetails {
    pub algo: String,
    pub hash: String,
    pub salt: String,
}

/// Opaque packaging metadata owned by the host application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption: Option<EncryptionDetails>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDocument {
    pub format: String,
    pub saved_at: DateTime<Utc>,
    #[serde(default)]
    pub package: PackageInfo,
    pub model: ThreatModel,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentRef<'a> {
    format: &'a str,
    saved_at: DateTime<Utc>,
    package: &'a PackageInfo,
    model: &'a ThreatModel,
}

#[derive(Deserialize)]
struct PackageOnly {
    #[serde(default)]
    package: PackageInfo,
}

impl ModelDocument {
    pub fn new(model: ThreatModel) -> Self {
        Self {
            format: FORMAT.to_string(),
            saved_at: Utc::now(),
            package: PackageInfo::default(),
            model,
        }
    }

    /// Parses a document and binds its model to `dirty`, which is reset.
    ///
    /// Fails with [`TmError::Validation`] if a stored property value does not
    /// match the variant of its property type.
    pub fn from_json(json: &str, dirty: DirtyFlag) -> Result<Self> {
        let mut doc: ModelDocument = serde_json::from_str(json)?;
        if doc.format != FORMAT {
            return Err(TmError::Validation(format!(
                "unsupported document format '{}'",
                doc.format
            )));
        }
        doc.model.rebind(dirty.clone());
        doc.model.validate()?;
        dirty.reset();
        Ok(doc)
    }

    pub fn to_json(&self, cache_snapshots: bool) -> Result<String> {
        encode(
            &self.format,
            &self.model,
            &self.package,
            self.saved_at,
            cache_snapshots,
        )
    }

    pub fn read(path: &Path, dirty: DirtyFlag) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json, dirty)
    }

    /// Stamps the save time, writes the document atomically and resets the
    /// model's dirty flag.
    pub fn write(&mut self, path: &Path, cache_snapshots: bool) -> Result<()> {
        self.saved_at = Utc::now();
        write_atomic(path, &self.to_json(cache_snapshots)?)?;
        self.model.dirty().reset();
        info!(model = %self.model.id(), path = %path.display(), "model saved");
        Ok(())
    }

    pub fn into_model(self) -> ThreatModel {
        self.model
    }
}

pub(crate) fn encode(
    format: &str,
    model: &ThreatModel,
    package: &PackageInfo,
    saved_at: DateTime<Utc>,
    cache_snapshots: bool,
) -> Result<String> {
    let stripped;
    let model = if cache_snapshots {
        model
    } else {
        let mut copy = model.clone();
        copy.drop_list_snapshots();
        stripped = copy;
        &stripped
    };
    let doc = DocumentRef {
        format,
        saved_at,
        package,
        model,
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

/// Package metadata of an encoded document, without binding its model.
pub(crate) fn package_of(json: &str) -> Result<PackageInfo> {
    let only: PackageOnly = serde_json::from_str(json)?;
    Ok(only.package)
}

/// Package metadata to carry over from the document being replaced.
///
/// An unreadable document yields the default so it can still be overwritten.
pub(crate) fn keep_package(existing: Result<String>) -> PackageInfo {
    match existing.and_then(|json| package_of(&json)) {
        Ok(package) => package,
        Err(e) => {
            warn!(error = %e, "existing document unreadable, package metadata reset");
            PackageInfo::default()
        }
    }
}

/// Writes to a temporary file next to `path`, then renames it over `path`.
/// The temporary file is removed if either step fails.
pub(crate) fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let tmp = dir.join(format!(".model-{}.tmp", Uuid::new_v4()));
    let written = fs::write(&tmp, content).and_then(|()| fs::rename(&tmp, path));
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}
