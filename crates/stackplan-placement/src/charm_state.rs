//! Per-charm placement state.
//!
//! A charm is REQUIRED when something placed (or core) depends on it, or
//! when it is core itself; CONFLICTED when something placed conflicts
//! with it; OPTIONAL otherwise. Unit counts then adjust the result: a
//! partially placed charm is REQUIRED until its quota is met, and a
//! charm whose quota is met is OPTIONAL.
//!
//! The state is recomputed on every query. Conflicts are checked in both
//! directions, dependencies only from the other charm to this one. The
//! quota rule demotes even a core charm once it is fully placed.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use stackplan_core::{ServiceDescriptor, StorageBackend};
use stackplan_state::AssignmentStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CharmState {
    Required,
    Conflicted,
    Optional,
}

impl fmt::Display for CharmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CharmState::Required => "REQUIRED",
            CharmState::Conflicted => "CONFLICTED",
            CharmState::Optional => "OPTIONAL",
        })
    }
}

/// A charm's state plus the charms that caused it.
#[derive(Debug, Clone, PartialEq)]
pub struct CharmStatus {
    pub state: CharmState,
    /// Placed or required charms that conflict with this one.
    pub conflicting: Vec<Arc<ServiceDescriptor>>,
    /// Placed or required charms that depend on this one.
    pub depending: Vec<Arc<ServiceDescriptor>>,
    /// Assigned plus deployed units.
    pub placed_units: usize,
}

/// Whether `descriptor` is required regardless of what is placed.
pub fn is_intrinsically_required(descriptor: &ServiceDescriptor, backend: StorageBackend) -> bool {
    descriptor.is_core || backend.required_charms().contains(&descriptor.name.as_str())
}

/// Derive the state of `target` against the current store.
///
/// `catalog` is every available descriptor; its order decides the order of
/// the reason lists.
pub fn compute_charm_state(
    target: &ServiceDescriptor,
    catalog: &[Arc<ServiceDescriptor>],
    store: &AssignmentStore,
    backend: StorageBackend,
) -> CharmStatus {
    let mut state = CharmState::Optional;
    let mut conflicting = Vec::new();
    let mut depending = Vec::new();

    let placed_or_required = catalog.iter().filter(|d| {
        store.placed_count(&d.name) > 0 || is_intrinsically_required(d, backend)
    });

    for other in placed_or_required {
        if other.name == target.name {
            continue;
        }
        if other.conflicts_with_name(&target.name) || target.conflicts_with_name(&other.name) {
            state = CharmState::Conflicted;
            conflicting.push(other.clone());
        }
        if other.depends_on_name(&target.name) {
            if state != CharmState::Conflicted {
                state = CharmState::Required;
            }
            depending.push(other.clone());
        }
    }

    if is_intrinsically_required(target, backend) {
        state = CharmState::Required;
    }

    let required_units = target.required_units as usize;
    let placed_units = store.placed_count(&target.name);
    match state {
        CharmState::Optional if placed_units > 0 && placed_units < required_units => {
            state = CharmState::Required;
        }
        CharmState::Required if placed_units >= required_units => {
            state = CharmState::Optional;
        }
        _ => {}
    }

    CharmStatus {
        state,
        conflicting,
        depending,
        placed_units,
    }
}
