//! Persistence backends for the placement document.
//!
//! Saves are synchronous and replace the whole document; the caller
//! invokes [`PlacementBackend::save`] at the end of every mutation.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::document::PlacementDocument;
use crate::error::{StateError, StateResult};

/// Where placement state is written.
pub trait PlacementBackend: Send + Sync {
    /// Replace the stored document.
    fn save(&self, doc: &PlacementDocument) -> StateResult<()>;

    /// Read the stored document, or `None` if nothing was saved yet.
    fn load(&self) -> StateResult<Option<PlacementDocument>>;

    /// Short description for logs.
    fn describe(&self) -> String;
}

/// Ephemeral backend that keeps the last saved document in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    doc: Mutex<Option<PlacementDocument>>,
    saves: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a document already stored.
    pub fn with_document(doc: PlacementDocument) -> Self {
        Self {
            doc: Mutex::new(Some(doc)),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Copy of the last saved document.
    pub fn document(&self) -> Option<PlacementDocument> {
        self.doc.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl PlacementBackend for MemoryBackend {
    fn save(&self, doc: &PlacementDocument) -> StateResult<()> {
        *self.doc.lock().unwrap_or_else(PoisonError::into_inner) = Some(doc.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn load(&self) -> StateResult<Option<PlacementDocument>> {
        Ok(self.document())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// YAML placement document on disk.
///
/// Writes go to a sibling temp file which is then renamed over the
/// target, so a reader never sees a half-written document.
#[derive(Debug, Clone)]
pub struct YamlFileBackend {
    path: PathBuf,
}

impl YamlFileBackend {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> StateError {
        StateError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl PlacementBackend for YamlFileBackend {
    fn save(&self, doc: &PlacementDocument) -> StateResult<()> {
        let yaml = serde_yaml::to_string(doc).map_err(|e| StateError::Serialize(e.to_string()))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, yaml).map_err(|e| self.io_err(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))?;
        debug!(path = ?self.path, machines = doc.placements.len(), "placement document saved");
        Ok(())
    }

    fn load(&self) -> StateResult<Option<PlacementDocument>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path).map_err(|e| self.io_err(e))?;
        if content.trim().is_empty() {
            return Ok(None);
        }
        let doc: PlacementDocument =
            serde_yaml::from_str(&content).map_err(|e| StateError::Deserialize(e.to_string()))?;
        debug!(path = ?self.path, machines = doc.placements.len(), "placement document loaded");
        Ok(Some(doc))
    }

    fn describe(&self) -> String {
        format!("yaml:{}", self.path.display())
    }
}
