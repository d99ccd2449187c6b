//! File-based state backend: one JSON object, one key per field.
//!
//! Storage location: `~/.citeweave/state.json` unless configured otherwise.
//!
//! Values are loaded into memory on creation and the whole document is
//! rewritten on every mutation, so the file always reflects the last
//! completed write.

use async_trait::async_trait;
use citeweave_core::error::StateError;
use citeweave_core::state::StateStore;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// A state store backed by a single JSON file.
pub struct FileStateStore {
    path: PathBuf,
    values: Arc<RwLock<Map<String, Value>>>,
}

impl FileStateStore {
    /// Open the store at `path`.
    ///
    /// A missing file starts empty (created on first write). A file that is
    /// not a JSON object is logged and ignored; it is overwritten by the next
    /// write.
    pub fn new(path: PathBuf) -> Self {
        let values = Self::load_from_disk(&path);
        debug!(path = %path.display(), keys = values.len(), "File state store loaded");
        Self {
            path,
            values: Arc::new(RwLock::new(values)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_disk(path: &Path) -> Map<String, Value> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Map::new(),
        };

        if content.trim().is_empty() {
            return Map::new();
        }

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                warn!(path = %path.display(), "State file is not a JSON object, starting empty");
                Map::new()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupted state file, starting empty");
                Map::new()
            }
        }
    }

    /// Write the whole document to disk.
    fn flush(&self, values: &Map<String, Value>) -> Result<(), StateError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StateError::Storage(format!("Failed to create state directory: {e}"))
            })?;
        }

        let content = serde_json::to_string_pretty(values)
            .map_err(|e| StateError::Storage(format!("Failed to serialize state: {e}")))?;

        std::fs::write(&self.path, content)
            .map_err(|e| StateError::Storage(format!("Failed to write state file: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn load(&self, key: &str) -> Result<Option<Value>, StateError> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn save(&self, key: &str, value: Value) -> Result<(), StateError> {
        let mut values = self.values.write().await;
        values.insert(key.to_string(), value);
        self.flush(&values)
    }

    async fn remove(&self, key: &str) -> Result<(), StateError> {
        let mut values = self.values.write().await;
        if values.remove(key).is_some() {
            self.flush(&values)?;
        }
        Ok(())
    }
}
