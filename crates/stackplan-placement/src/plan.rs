//! Default plan generators.
//!
//! Both generators are pure: they read descriptors and machines and return
//! an [`AssignmentPlan`] without touching any controller state. Callers
//! commit a plan with
//! [`PlacementController::set_all_assignments`](crate::PlacementController::set_all_assignments).
//!
//! Isolated descriptors consume one whole machine per unit and are placed
//! first. Everything else is co-located on a single controller machine.

use std::sync::Arc;

use stackplan_core::{Constraints, ConstraintValue, Machine, PlacementKind, ServiceDescriptor};
use stackplan_state::AssignmentMap;
use tracing::{debug, info, warn};

/// Id of the controller placeholder created by [`plan_single`].
pub const CONTROLLER_MACHINE_ID: &str = "controller";

/// Memory given to the single-host controller placeholder.
const CONTROLLER_MEM: &str = "6G";
/// Root disk given to the single-host controller placeholder.
const CONTROLLER_ROOT_DISK: &str = "20G";

/// A generated plan, not yet applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentPlan {
    /// Placeholder machines the plan needs created.
    pub machines: Vec<Machine>,
    pub assignments: AssignmentMap,
}

impl AssignmentPlan {
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Machine ids holding `name`, one entry per unit.
    pub fn machines_for(&self, name: &str) -> Vec<String> {
        self.assignments
            .for_descriptor(name)
            .into_values()
            .flatten()
            .collect()
    }
}

/// Units a plan gives `descriptor`. A single-unit charm never gets more
/// than one slot, whatever its quota says.
fn planned_units(descriptor: &ServiceDescriptor) -> u32 {
    if descriptor.allow_multi_units {
        descriptor.required_units
    } else {
        descriptor.required_units.min(1)
    }
}

/// Plan `descriptors` across existing `machines`.
///
/// Each isolated descriptor takes the first unused machine satisfying its
/// constraints, once per required unit, under [`PlacementKind::BareMetal`].
/// The remaining descriptors share one controller machine under
/// `controller_kind`: the first unused machine satisfying all of their
/// constraints, or failing that the first unused machine, with any
/// descriptor it cannot hold left out. Subordinates are skipped.
pub fn plan_defaults(
    descriptors: &[Arc<ServiceDescriptor>],
    machines: &[Machine],
    controller_kind: PlacementKind,
) -> AssignmentPlan {
    let mut pool: Vec<&Machine> = machines.iter().collect();
    let mut assignments = AssignmentMap::new();

    let (isolated, colocated): (Vec<_>, Vec<_>) = descriptors
        .iter()
        .filter(|d| !d.subordinate)
        .partition(|d| d.isolate);

    for &descriptor in &isolated {
        for unit in 1..=planned_units(descriptor) {
            let Some(pos) = pool.iter().position(|m| m.satisfies(&descriptor.constraints).0) else {
                warn!(
                    charm = %descriptor.name,
                    unit,
                    required = descriptor.required_units,
                    "no free machine satisfies isolated charm"
                );
                break;
            };
            let machine = pool.remove(pos);
            debug!(machine = %machine.instance_id, charm = %descriptor.name, unit, "isolated unit planned");
            assignments.insert(&machine.instance_id, PlacementKind::BareMetal, Arc::clone(descriptor));
        }
    }

    if !colocated.is_empty() {
        let fits_all = |m: &&Machine| colocated.iter().all(|d| m.satisfies(&d.constraints).0);
        let controller = pool.iter().copied().find(fits_all).or_else(|| pool.first().copied());
        match controller {
            Some(machine) => {
                for &descriptor in &colocated {
                    let (ok, failed) = machine.satisfies(&descriptor.constraints);
                    if !ok {
                        warn!(
                            machine = %machine.instance_id,
                            charm = %descriptor.name,
                            ?failed,
                            "controller machine does not satisfy charm, leaving it unplaced"
                        );
                        continue;
                    }
                    assignments.insert(&machine.instance_id, controller_kind, Arc::clone(descriptor));
                }
                debug!(machine = %machine.instance_id, kind = %controller_kind, "controller machine chosen");
            }
            None => {
                warn!(count = colocated.len(), "no machine left for co-located charms");
            }
        }
    }

    info!(
        machines = assignments.machines().count(),
        charms = assignments.descriptors().len(),
        "default plan generated"
    );
    AssignmentPlan {
        machines: Vec::new(),
        assignments,
    }
}

/// Plan `descriptors` onto placeholders for a single host with `host_cpus`
/// cores.
///
/// One `controller` placeholder gets half the host's cores (at least one)
/// and holds every non-isolated descriptor under `controller_kind`. Each
/// isolated unit gets its own `<charm>-machine-<n>` placeholder carrying
/// the descriptor's constraints and sits on it as
/// [`PlacementKind::BareMetal`], which on a single host means a VM.
pub fn plan_single(
    descriptors: &[Arc<ServiceDescriptor>],
    host_cpus: usize,
    controller_kind: PlacementKind,
) -> AssignmentPlan {
    let mut plan = AssignmentPlan::default();

    let cores = (host_cpus / 2).max(1) as u64;
    let mut controller_constraints = Constraints::new();
    controller_constraints.insert("cpu-cores".to_string(), ConstraintValue::Number(cores));
    controller_constraints.insert("mem".to_string(), CONTROLLER_MEM.into());
    controller_constraints.insert("root-disk".to_string(), CONTROLLER_ROOT_DISK.into());
    plan.machines.push(Machine::placeholder(
        CONTROLLER_MACHINE_ID,
        CONTROLLER_MACHINE_ID,
        controller_constraints,
    ));

    for descriptor in descriptors.iter().filter(|d| !d.subordinate) {
        if !descriptor.isolate {
            plan.assignments
                .insert(CONTROLLER_MACHINE_ID, controller_kind, Arc::clone(descriptor));
            continue;
        }
        for n in 1..=planned_units(descriptor) {
            let id = format!("{}-machine-{n}", descriptor.name);
            let name = format!("machine {n} for {}", descriptor.label());
            plan.machines
                .push(Machine::placeholder(&id, &name, descriptor.constraints.clone()));
            plan.assignments
                .insert(&id, PlacementKind::BareMetal, Arc::clone(descriptor));
        }
    }

    info!(
        host_cpus,
        controller_cores = cores,
        placeholders = plan.machines.len(),
        "single-host plan generated"
    );
    plan
}
