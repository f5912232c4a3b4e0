//! The persisted placement document.
//!
//! ```yaml
//! placements:
//!   <machine-instance-id>:
//!     constraints: { mem: 4G }        # placeholders only
//!     assignments:
//!       LXC: [keystone, glance]
//!     deployments:
//!       BareMetal: [nova-compute]
//! ```
//!
//! Kinds and charm names are kept as plain strings here so that a
//! document written by a newer catalog still loads; resolution against
//! the catalog happens in [`AssignmentStore::from_document`](crate::AssignmentStore::from_document).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use stackplan_core::Constraints;

/// Whole-session placement state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlacementDocument {
    #[serde(default)]
    pub placements: BTreeMap<String, MachinePlacement>,
}

/// Everything recorded for one machine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachinePlacement {
    /// Display name of a placeholder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Present only for placeholder machines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Constraints>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub assignments: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub deployments: BTreeMap<String, Vec<String>>,
}

impl PlacementDocument {
    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }
}

impl MachinePlacement {
    pub fn is_placeholder(&self) -> bool {
        self.constraints.is_some()
    }
}

/// Entries dropped while rebuilding state from a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// `(machine, charm)` pairs naming charms the catalog does not know.
    pub unknown_charms: Vec<(String, String)>,
    /// `(machine, kind)` pairs naming unrecognised placement kinds.
    pub unknown_kinds: Vec<(String, String)>,
    /// `(machine, charm)` pairs naming extra slots of single-unit charms.
    pub duplicate_units: Vec<(String, String)>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.unknown_charms.is_empty() && self.unknown_kinds.is_empty() && self.duplicate_units.is_empty()
    }

    /// One line per dropped entry, for user-facing display.
    pub fn messages(&self) -> Vec<String> {
        let charms = self
            .unknown_charms
            .iter()
            .map(|(m, c)| format!("machine {m}: unknown charm '{c}' dropped"));
        let kinds = self
            .unknown_kinds
            .iter()
            .map(|(m, k)| format!("machine {m}: unknown placement kind '{k}' dropped"));
        let duplicates = self
            .duplicate_units
            .iter()
            .map(|(m, c)| format!("machine {m}: single-unit charm '{c}' already placed, dropped"));
        charms.chain(kinds).chain(duplicates).collect()
    }
}
