//! # Configuration
//!
//! Settings are managed by [`confique`] and resolved in priority order:
//!
//! 1. **Environment variables**: `TMCORE_LOG_LEVEL`, `TMCORE_LOG_JSON`.
//! 2. **Config file**: a TOML file given explicitly (the CLI's `--config`).
//! 3. **Compiled defaults**: `#[config(default = ...)]`.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `logging.level` | `info` | Log level for the `tmcore` target |
//! | `logging.json` | `false` | Emit JSON log lines |
//! | `lists.cache_snapshots` | `true` | Persist the last resolved list of list-backed types |
//! | `generation.skip_existing` | `true` | Never raise a second event of the same threat type on one identity |

use std::path::Path;

use confique::Config;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TmError};

#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct CoreConfig {
    #[config(nested)]
    pub logging: LoggingConfig,

    #[config(nested)]
    pub lists: ListsConfig,

    #[config(nested)]
    pub generation: GenerationConfig,
}

#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Level for the `tmcore` target, used when `RUST_LOG` is unset.
    #[config(env = "TMCORE_LOG_LEVEL", default = "info")]
    pub level: String,

    #[config(env = "TMCORE_LOG_JSON", default = false)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ListsConfig {
    /// When false, cached lists are dropped before a model is saved.
    #[config(default = true)]
    pub cache_snapshots: bool,
}

impl Default for ListsConfig {
    fn default() -> Self {
        Self {
            cache_snapshots: true,
        }
    }
}

#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GenerationConfig {
    #[config(default = true)]
    pub skip_existing: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            skip_existing: true,
        }
    }
}

impl CoreConfig {
    /// Loads the configuration from the environment, then `path` if given,
    /// then compiled defaults.
    ///
    /// A `path` that does not exist is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = CoreConfig::builder().env();
        if let Some(path) = path {
            if !path.is_file() {
                return Err(TmError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            builder = builder.file(path);
        }
        builder.load().map_err(|e| TmError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn default_values() {
        let config = CoreConfig::default();
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
        assert!(config.lists.cache_snapshots);
        assert!(config.generation.skip_existing);
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tmcore.toml");
        fs::write(
            &path,
            "[lists]\ncache_snapshots = false\n\n[generation]\nskip_existing = false\n",
        )
        .unwrap();

        let config = CoreConfig::load(Some(&path)).unwrap();
        assert!(!config.lists.cache_snapshots);
        assert!(!config.generation.skip_existing);
        assert!(!config.logging.json);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let err = CoreConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, TmError::Config(_)));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[lists]\ncache_snapshots = \"sometimes\"\n").unwrap();
        assert!(matches!(CoreConfig::load(Some(&path)), Err(TmError::Config(_))));
    }

    #[test]
    fn serializes_to_toml_shaped_json() {
        let json = serde_json::to_value(CoreConfig::default()).unwrap();
        assert_eq!(json["lists"]["cache_snapshots"], true);
        assert_eq!(json["logging"]["level"], "info");
    }
}
