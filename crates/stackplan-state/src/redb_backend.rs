//! RedbBackend — placement document stored in an embedded redb database.
//!
//! Each machine's [`MachinePlacement`] is JSON-serialized into its own row
//! of the [`PLACEMENTS`] table. A save rewrites the whole table inside one
//! write transaction, so readers see either the old or the new document.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use crate::backend::PlacementBackend;
use crate::document::{MachinePlacement, PlacementDocument};
use crate::error::{StateError, StateResult};
use crate::tables::PLACEMENTS;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe placement backend backed by redb.
#[derive(Clone)]
pub struct RedbBackend {
    db: Arc<Database>,
    label: String,
}

impl RedbBackend {
    /// Open (or create) a persistent database at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let backend = Self {
            db: Arc::new(db),
            label: format!("redb:{}", path.display()),
        };
        backend.ensure_tables()?;
        debug!(?path, "placement database opened");
        Ok(backend)
    }

    /// Create an ephemeral in-memory database (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let db = Database::builder()
            .create_with_backend(redb::backends::InMemoryBackend::new())
            .map_err(map_err!(Open))?;
        let backend = Self {
            db: Arc::new(db),
            label: "redb:memory".to_string(),
        };
        backend.ensure_tables()?;
        debug!("in-memory placement database opened");
        Ok(backend)
    }

    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(PLACEMENTS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Read the record for a single machine.
    pub fn get_machine(&self, machine: &str) -> StateResult<Option<MachinePlacement>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(PLACEMENTS).map_err(map_err!(Table))?;
        match table.get(machine).map_err(map_err!(Read))? {
            Some(guard) => {
                let placement: MachinePlacement =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(placement))
            }
            None => Ok(None),
        }
    }
}

impl PlacementBackend for RedbBackend {
    fn save(&self, doc: &PlacementDocument) -> StateResult<()> {
        let mut rows = Vec::with_capacity(doc.placements.len());
        for (machine, placement) in &doc.placements {
            let value = serde_json::to_vec(placement).map_err(map_err!(Serialize))?;
            rows.push((machine.as_str(), value));
        }

        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(PLACEMENTS).map_err(map_err!(Table))?;
            let mut stale = Vec::new();
            for entry in table.iter().map_err(map_err!(Read))? {
                let (key, _) = entry.map_err(map_err!(Read))?;
                let key = key.value().to_string();
                if !doc.placements.contains_key(&key) {
                    stale.push(key);
                }
            }
            for key in &stale {
                table.remove(key.as_str()).map_err(map_err!(Write))?;
            }
            for (machine, value) in &rows {
                table
                    .insert(*machine, value.as_slice())
                    .map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(machines = rows.len(), "placement document stored");
        Ok(())
    }

    fn load(&self) -> StateResult<Option<PlacementDocument>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(PLACEMENTS).map_err(map_err!(Table))?;
        let mut doc = PlacementDocument::default();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            let placement: MachinePlacement =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            doc.placements.insert(key.value().to_string(), placement);
        }
        if doc.is_empty() {
            return Ok(None);
        }
        Ok(Some(doc))
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}
