//! stackplan-state — the assignment relation and its persistence.
//!
//! [`AssignmentStore`] holds two relations of identical shape, machine →
//! placement kind → descriptors: the *pending* assignments and the
//! *deployed* commitments. Both are plain values with no interior
//! locking; the placement controller wraps them and writes every change
//! through a [`PlacementBackend`].
//!
//! # Backends
//!
//! - [`YamlFileBackend`] — the human-readable placement document
//! - [`RedbBackend`] — one record per machine in an embedded redb table
//! - [`MemoryBackend`] — ephemeral, for tests and dry runs

pub mod assignments;
pub mod backend;
pub mod document;
pub mod error;
pub mod redb_backend;
pub mod tables;

pub use assignments::{AssignmentMap, AssignmentStore};
pub use backend::{MemoryBackend, PlacementBackend, YamlFileBackend};
pub use document::{LoadReport, MachinePlacement, PlacementDocument};
pub use error::{StateError, StateResult};
pub use redb_backend::RedbBackend;
