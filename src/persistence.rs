//! Keyed drawing storage.
//!
//! The editor only needs `load` and `save` by drawing id; how drawings are
//! laid out on disk or in memory belongs to each [`DrawingStore`].

use crate::document::{CanvasSize, Document, DrawingMetadata, LayerList};
use crate::id_generator::generate_drawing_id;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during persistence operations
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to serialize drawing: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored drawing {id} is corrupt: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("Invalid drawing id {0:?}")]
    InvalidId(String),
}

/// Result type for persistence operations
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Everything persisted for one drawing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingData {
    pub layers: LayerList,
    #[serde(default)]
    pub metadata: DrawingMetadata,
    #[serde(default)]
    pub size: CanvasSize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived_from_post_id: Option<String>,
}

impl DrawingData {
    pub fn from_document(doc: &Document) -> Self {
        Self {
            layers: doc.snapshot(),
            metadata: doc.metadata(),
            size: doc.size(),
            derived_from_post_id: None,
        }
    }

    pub fn into_document(self, id: &str) -> Document {
        Document::from_parts(id, self.layers, self.size, self.metadata)
    }
}

/// On-disk shapes, newest first. The layers-only form is a bare array of
/// this crate's layers, read with default metadata and size.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredDrawing {
    Full(DrawingData),
    LayersOnly(LayerList),
}

impl From<StoredDrawing> for DrawingData {
    fn from(stored: StoredDrawing) -> Self {
        match stored {
            StoredDrawing::Full(data) => data,
            StoredDrawing::LayersOnly(layers) => DrawingData {
                layers,
                metadata: DrawingMetadata::regular(),
                size: CanvasSize::default(),
                derived_from_post_id: None,
            },
        }
    }
}

/// Decodes one stored drawing. An empty layer list counts as absent.
fn decode_stored(id: &str, value: serde_json::Value) -> PersistenceResult<Option<DrawingData>> {
    let stored: StoredDrawing = serde_json::from_value(value).map_err(|err| PersistenceError::Corrupt {
        id: id.to_string(),
        reason: err.to_string(),
    })?;
    let data = DrawingData::from(stored);
    if data.layers.is_empty() {
        log::warn!("Stored drawing {id} has no layers, ignoring it");
        return Ok(None);
    }
    Ok(Some(data))
}

pub trait DrawingStore: Send + Sync {
    /// `Ok(None)` when nothing usable is stored under `id`.
    fn load(&self, id: &str) -> PersistenceResult<Option<DrawingData>>;

    fn save(&self, id: &str, data: &DrawingData) -> PersistenceResult<()>;
}

/// Saves `data` under a freshly generated id and returns the id.
pub fn create_draft_drawing(store: &dyn DrawingStore, data: &DrawingData) -> PersistenceResult<String> {
    let id = generate_drawing_id();
    store.save(&id, data)?;
    log::info!("Created draft drawing {id}");
    Ok(id)
}

/// Key-value store where every drawing lives in one JSON object under a
/// single key, like browser local storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    storage_key: String,
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new(storage_key: &str) -> Self {
        Self {
            storage_key: storage_key.to_string(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// The raw shared blob.
    pub fn raw(&self) -> Option<String> {
        self.entries.lock().get(&self.storage_key).cloned()
    }

    /// Overwrites the raw shared blob.
    pub fn set_raw(&self, blob: &str) {
        self.entries.lock().insert(self.storage_key.clone(), blob.to_string());
    }
}

impl DrawingStore for MemoryStore {
    fn load(&self, id: &str) -> PersistenceResult<Option<DrawingData>> {
        let Some(blob) = self.raw() else {
            return Ok(None);
        };
        let mut all: HashMap<String, serde_json::Value> =
            serde_json::from_str(&blob).map_err(|err| PersistenceError::Corrupt {
                id: self.storage_key.clone(),
                reason: err.to_string(),
            })?;
        match all.remove(id) {
            Some(value) => decode_stored(id, value),
            None => Ok(None),
        }
    }

    fn save(&self, id: &str, data: &DrawingData) -> PersistenceResult<()> {
        let mut entries = self.entries.lock();
        let mut all: HashMap<String, serde_json::Value> = match entries.get(&self.storage_key) {
            Some(blob) => serde_json::from_str(blob).unwrap_or_else(|err| {
                log::error!("Resetting corrupt storage {}: {err}", self.storage_key);
                HashMap::new()
            }),
            None => HashMap::new(),
        };
        all.insert(id.to_string(), serde_json::to_value(data)?);
        entries.insert(self.storage_key.clone(), serde_json::to_string(&all)?);
        Ok(())
    }
}

/// One pretty-printed `<id>.json` file per drawing.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> PersistenceResult<PathBuf> {
        if id.is_empty() || id.contains(['/', '\\']) || id.contains("..") {
            return Err(PersistenceError::InvalidId(id.to_string()));
        }
        Ok(self.dir.join(format!("{id}.json")))
    }
}

impl DrawingStore for FileStore {
    fn load(&self, id: &str) -> PersistenceResult<Option<DrawingData>> {
        let path = self.path_for(id)?;
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let value = serde_json::from_str(&json).map_err(|err| PersistenceError::Corrupt {
            id: id.to_string(),
            reason: err.to_string(),
        })?;
        decode_stored(id, value)
    }

    fn save(&self, id: &str, data: &DrawingData) -> PersistenceResult<()> {
        let path = self.path_for(id)?;
        fs::create_dir_all(&self.dir)?;
        fs::write(&path, serde_json::to_string_pretty(data)?)?;
        log::debug!("Wrote {}", path.display());
        Ok(())
    }
}
