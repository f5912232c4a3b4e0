//! stackplan-placement — decides which services go on which machines.
//!
//! This crate does NOT talk to the provisioner or the deployment driver.
//! It consumes a machine inventory and a charm catalog, keeps the
//! assignment relation consistent, and answers two questions: "is this
//! plan deployable" and "what would a sensible default plan look like".
//!
//! # Components
//!
//! - **`charm_state`** — required / conflicted / optional derivation
//! - **`plan`** — pure default-plan generators (multi-node and single-host)
//! - **`controller`** — the shared, write-through [`PlacementController`]

pub mod charm_state;
pub mod controller;
pub mod error;
pub mod plan;

pub use charm_state::{CharmState, CharmStatus, compute_charm_state, is_intrinsically_required};
pub use controller::{AutoplaceOutcome, ControllerSettings, DEFAULT_MACHINE_ID, PlacementController, PlacementSnapshot};
pub use error::{PlacementError, PlacementResult};
pub use plan::{AssignmentPlan, CONTROLLER_MACHINE_ID, plan_defaults, plan_single};
