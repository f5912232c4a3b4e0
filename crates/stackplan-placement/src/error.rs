//! Placement error types.

use thiserror::Error;

/// Errors surfaced by the placement controller.
///
/// Planning shortfalls are not errors; see
/// [`AutoplaceOutcome`](crate::AutoplaceOutcome).
#[derive(Debug, Error)]
pub enum PlacementError {
    #[error("no machine inventory configured; cannot generate a default plan")]
    NoInventory,

    #[error("unknown charm: {0}")]
    UnknownCharm(String),

    #[error("inventory error: {0}")]
    Inventory(#[from] stackplan_core::CoreError),

    #[error("state store error: {0}")]
    State(#[from] stackplan_state::StateError),
}

pub type PlacementResult<T> = Result<T, PlacementError>;
