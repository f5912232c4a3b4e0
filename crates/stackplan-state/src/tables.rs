//! redb table definitions for the placement store.
//!
//! Keys are machine instance ids; values are JSON-serialized
//! [`MachinePlacement`](crate::document::MachinePlacement) records.

use redb::TableDefinition;

/// Per-machine placement records keyed by `{instance_id}`.
pub const PLACEMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("placements");
