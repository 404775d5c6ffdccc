use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::constants::store::RAW_EXTENSION;
use crate::errors::IngestError;
use crate::store::{atomic_write, source_path};

/// Verbatim JSON payloads at `{root}/{source}/{identifier}.json`.
#[derive(Clone, Debug)]
pub struct RawStore {
    root: PathBuf,
}

impl RawStore {
    /// Store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic location of a payload.
    pub fn path_for(&self, source: &str, identifier: &str) -> PathBuf {
        source_path(&self.root, source, identifier, RAW_EXTENSION)
    }

    /// Pretty-print `payload` to its path, replacing any previous content.
    pub fn save_raw(
        &self,
        source: &str,
        identifier: &str,
        payload: &Value,
    ) -> Result<PathBuf, IngestError> {
        let path = self.path_for(source, identifier);
        let mut body = serde_json::to_vec_pretty(payload)?;
        body.push(b'\n');
        atomic_write(&path, &body)?;
        Ok(path)
    }

    /// Read a payload back.
    pub fn load_raw(&self, source: &str, identifier: &str) -> Result<Value, IngestError> {
        let path = self.path_for(source, identifier);
        let body = fs::read(&path)?;
        Ok(serde_json::from_slice(&body)?)
    }
}
