//! stackplan-core — data model shared by every stackplan crate.
//!
//! Nothing in here mutates shared state. Machines, charm descriptors and
//! constraint checks are plain values; the assignment relation lives in
//! `stackplan-state` and the orchestration in `stackplan-placement`.
//!
//! # Components
//!
//! - **`machine`** — real and placeholder placement targets
//! - **`constraints`** — hardware constraint maps and the matcher
//! - **`size`** — human-readable size parsing (`"2G"` → 2048 MB)
//! - **`charm`** — service descriptors and the catalog
//! - **`inventory`** — machine inventory collaborators
//! - **`config`** — `stackplan.toml` parsing

pub mod charm;
pub mod config;
pub mod constraints;
pub mod error;
pub mod inventory;
pub mod kind;
pub mod machine;
pub mod size;

pub use charm::{Catalog, ServiceDescriptor};
pub use config::{BackendKind, StackplanConfig, StorageBackend};
pub use constraints::{ConstraintValue, Constraints, HwKey, satisfies};
pub use error::{CoreError, CoreResult};
pub use inventory::{FileInventory, MachineInventory, StaticInventory};
pub use kind::PlacementKind;
pub use machine::{HwAttr, Machine, MachineId, MachineRecord, MachineSource, MachineStatus};
pub use size::{human_to_mb, mb_to_human};
