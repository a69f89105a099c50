// Rust guideline compliant 2026-10-17

//! JSON file adapter for the `ModelStore` port.
//!
//! The artifact lives at one fixed path and is overwritten on every save;
//! there is no versioning. Writes go to a sibling temp file first and are
//! renamed into place so a crash never leaves a truncated artifact. Loaded
//! models are validated before they are handed out.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use classifier::{KnnModel, ModelStore, ModelStoreError};

/// `ModelStore` adapter persisting the model as pretty-printed JSON.
#[derive(Debug, Clone)]
pub struct JsonModelStore {
    path: PathBuf,
}

impl JsonModelStore {
    /// Create a store for the artifact at `path`. Nothing is touched on disk.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the artifact.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ModelStore for JsonModelStore {
    fn load(&self) -> Result<Option<KnnModel>, ModelStoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ModelStoreError::Io {
                    reason: format!("{}: {e}", self.path.display()),
                });
            }
        };
        let model: KnnModel =
            serde_json::from_slice(&bytes).map_err(|e| ModelStoreError::Corrupt {
                reason: format!("{}: {e}", self.path.display()),
            })?;
        model.validate()?;
        tracing::debug!("model_store.load: path={}", self.path.display());
        Ok(Some(model))
    }

    fn save(&self, model: &KnnModel) -> Result<(), ModelStoreError> {
        let io = |e: std::io::Error| ModelStoreError::Io {
            reason: format!("{}: {e}", self.path.display()),
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io)?;
        }
        let json = serde_json::to_vec_pretty(model).map_err(|e| ModelStoreError::Io {
            reason: format!("serialize: {e}"),
        })?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(io)?;
        fs::rename(&tmp, &self.path).map_err(io)?;
        tracing::info!("model_store.save: path={}", self.path.display());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
