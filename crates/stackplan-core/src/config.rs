//! stackplan.toml configuration parser.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::kind::PlacementKind;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StackplanConfig {
    #[serde(default)]
    pub placement: PlacementConfig,
    pub inventory: Option<InventoryConfig>,
    pub catalog: Option<CatalogConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlacementConfig {
    pub state_file: Option<PathBuf>,
    pub backend: Option<BackendKind>,
    pub storage_backend: Option<StorageBackend>,
    pub controller_kind: Option<PlacementKind>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub path: PathBuf,
}

/// Where placement state is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    Yaml,
    Redb,
    Memory,
}

/// Storage backend chosen by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    None,
    Ceph,
    Swift,
}

impl StorageBackend {
    /// Charms that become required when this backend is selected.
    pub fn required_charms(&self) -> &'static [&'static str] {
        match self {
            StorageBackend::None => &[],
            StorageBackend::Ceph => &["ceph"],
            StorageBackend::Swift => &["swift-proxy", "swift-storage"],
        }
    }
}

impl StackplanConfig {
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> CoreResult<Self> {
        toml::from_str(content).map_err(|e| CoreError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> CoreResult<String> {
        toml::to_string_pretty(self).map_err(|e| CoreError::Config(e.to_string()))
    }

    pub fn state_file(&self) -> PathBuf {
        self.placement
            .state_file
            .clone()
            .unwrap_or_else(|| PathBuf::from("placement.yaml"))
    }

    pub fn backend(&self) -> BackendKind {
        self.placement.backend.unwrap_or_default()
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.placement.storage_backend.unwrap_or_default()
    }

    pub fn controller_kind(&self) -> PlacementKind {
        self.placement.controller_kind.unwrap_or(PlacementKind::Lxc)
    }

    /// Scaffold a config for a provisioner-backed install.
    pub fn scaffold(inventory: Option<&Path>) -> Self {
        StackplanConfig {
            placement: PlacementConfig {
                state_file: Some(PathBuf::from("placement.yaml")),
                backend: Some(BackendKind::Yaml),
                storage_backend: Some(StorageBackend::None),
                controller_kind: Some(PlacementKind::Lxc),
            },
            inventory: inventory.map(|p| InventoryConfig {
                path: p.to_path_buf(),
            }),
            catalog: None,
        }
    }
}
