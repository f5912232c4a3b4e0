//! Machine inventory collaborators.
//!
//! The provisioner is an external system; placement only needs "list the
//! machines" plus a way to drop cached results when the inventory changes.

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use tracing::{debug, info};

use crate::error::{CoreError, CoreResult};
use crate::machine::{Machine, MachineRecord};

/// Source of real machines for placement.
pub trait MachineInventory: Send + Sync {
    /// Current machines, including ones that are not placeable.
    fn machines(&self) -> CoreResult<Vec<Machine>>;

    /// Drop any cached listing so the next call re-reads the source.
    fn invalidate(&self);
}

/// A fixed machine list.
#[derive(Debug, Clone, Default)]
pub struct StaticInventory {
    machines: Vec<Machine>,
}

impl StaticInventory {
    pub fn new(machines: Vec<Machine>) -> Self {
        Self { machines }
    }

    pub fn from_records(records: Vec<MachineRecord>) -> Self {
        Self::new(records.into_iter().map(Machine::real).collect())
    }
}

impl MachineInventory for StaticInventory {
    fn machines(&self) -> CoreResult<Vec<Machine>> {
        Ok(self.machines.clone())
    }

    fn invalidate(&self) {}
}

/// Inventory read from a JSON array of [`MachineRecord`]s, cached until
/// [`MachineInventory::invalidate`] is called.
#[derive(Debug)]
pub struct FileInventory {
    path: PathBuf,
    cache: RwLock<Option<Vec<Machine>>>,
}

impl FileInventory {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            cache: RwLock::new(None),
        }
    }

    fn read_file(&self) -> CoreResult<Vec<Machine>> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| CoreError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        let records: Vec<MachineRecord> =
            serde_json::from_str(&content).map_err(|e| CoreError::Inventory(e.to_string()))?;
        info!(path = ?self.path, count = records.len(), "machine inventory loaded");
        Ok(records.into_iter().map(Machine::real).collect())
    }
}

impl MachineInventory for FileInventory {
    fn machines(&self) -> CoreResult<Vec<Machine>> {
        if let Some(cached) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Ok(cached.clone());
        }
        let machines = self.read_file()?;
        *self.cache.write().unwrap_or_else(PoisonError::into_inner) = Some(machines.clone());
        Ok(machines)
    }

    fn invalidate(&self) {
        debug!(path = ?self.path, "machine inventory cache invalidated");
        *self.cache.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::MachineStatus;

    const TWO_MACHINES: &str = r#"[
        {"instance_id": "m-1", "hostname": "node1", "status": "ready",
         "arch": "amd64", "cpu_cores": 4, "mem": 8192, "storage": 102400},
        {"instance_id": "m-2", "status": "commissioning",
         "arch": "amd64", "cpu_cores": 2, "mem": 2048, "storage": 51200,
         "power_type": "ipmi"}
    ]"#;

    #[test]
    fn static_inventory_returns_its_list() {
        let inv = StaticInventory::new(vec![Machine::placeholder("p", "p", Default::default())]);
        assert_eq!(inv.machines().unwrap().len(), 1);
    }

    #[test]
    fn file_inventory_parses_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("machines.json");
        std::fs::write(&path, TWO_MACHINES).unwrap();

        let inv = FileInventory::new(&path);
        let machines = inv.machines().unwrap();
        assert_eq!(machines.len(), 2);
        assert_eq!(machines[0].hostname, "node1");
        assert_eq!(machines[1].hostname, "m-2");
        assert_eq!(machines[1].status(), Some(MachineStatus::Commissioning));
    }

    #[test]
    fn file_inventory_caches_until_invalidated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("machines.json");
        std::fs::write(&path, TWO_MACHINES).unwrap();

        let inv = FileInventory::new(&path);
        assert_eq!(inv.machines().unwrap().len(), 2);

        std::fs::write(&path, "[]").unwrap();
        assert_eq!(inv.machines().unwrap().len(), 2, "cached listing should be served");

        inv.invalidate();
        assert!(inv.machines().unwrap().is_empty());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let inv = FileInventory::new(Path::new("/nonexistent/machines.json"));
        assert!(matches!(inv.machines(), Err(CoreError::Io { .. })));
    }

    #[test]
    fn malformed_file_is_an_inventory_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("machines.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            FileInventory::new(&path).machines(),
            Err(CoreError::Inventory(_))
        ));
    }
}
