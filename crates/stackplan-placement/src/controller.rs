//! PlacementController — the shared handle over the assignment store.
//!
//! One controller is created per session and handed to every caller (UI
//! callbacks, deployment threads, the CLI). Reads take a shared lock and
//! see a consistent state. A mutation runs on a copy of the state, the
//! copy is persisted, and only then does it replace the live state; a
//! failed write leaves the live state untouched and returns the error.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use serde::Serialize;
use stackplan_core::{
    Catalog, Constraints, Machine, MachineId, MachineInventory, PlacementKind, ServiceDescriptor,
    StackplanConfig, StorageBackend,
};
use stackplan_state::{AssignmentMap, AssignmentStore, LoadReport, PlacementBackend};
use tracing::{debug, info, warn};

use crate::charm_state::{CharmState, CharmStatus, compute_charm_state, is_intrinsically_required};
use crate::error::{PlacementError, PlacementResult};
use crate::plan::{AssignmentPlan, plan_defaults, plan_single};

/// Id of the always-present placeholder for unspecified placements.
pub const DEFAULT_MACHINE_ID: &str = "_default";

/// Operator choices the controller reads but never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ControllerSettings {
    pub storage_backend: StorageBackend,
    /// Kind used for services co-located on the controller machine.
    pub controller_kind: PlacementKind,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            storage_backend: StorageBackend::None,
            controller_kind: PlacementKind::Lxc,
        }
    }
}

impl ControllerSettings {
    pub fn from_config(config: &StackplanConfig) -> Self {
        Self {
            storage_backend: config.storage_backend(),
            controller_kind: config.controller_kind(),
        }
    }
}

/// Result of [`PlacementController::autoplace_unplaced_services`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AutoplaceOutcome {
    pub success: bool,
    pub message: String,
}

/// Immutable copy of the controller state.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementSnapshot {
    pub store: AssignmentStore,
    pub placeholders: Vec<Machine>,
}

#[derive(Debug, Clone)]
struct Inner {
    store: AssignmentStore,
    placeholders: Vec<Machine>,
}

impl Inner {
    fn new() -> Self {
        Self {
            store: AssignmentStore::new(),
            placeholders: vec![default_placeholder()],
        }
    }

    fn upsert_placeholder(&mut self, machine: Machine) {
        match self
            .placeholders
            .iter_mut()
            .find(|m| m.instance_id == machine.instance_id)
        {
            Some(existing) => *existing = machine,
            None => self.placeholders.push(machine),
        }
    }

    /// Placeholders written to the document. `_default` is implicit.
    fn persisted_placeholders(&self) -> Vec<Machine> {
        self.placeholders
            .iter()
            .filter(|m| m.instance_id != DEFAULT_MACHINE_ID)
            .cloned()
            .collect()
    }
}

fn default_placeholder() -> Machine {
    Machine::placeholder(DEFAULT_MACHINE_ID, "Default", Constraints::new())
}

/// Placement decisions for one installation.
pub struct PlacementController {
    catalog: Arc<Catalog>,
    inventory: Option<Arc<dyn MachineInventory>>,
    backend: Arc<dyn PlacementBackend>,
    settings: ControllerSettings,
    inner: RwLock<Inner>,
}

impl PlacementController {
    /// Create a controller with empty state. Call [`load`](Self::load) to
    /// pick up a saved document.
    pub fn new(
        catalog: Arc<Catalog>,
        backend: Arc<dyn PlacementBackend>,
        settings: ControllerSettings,
    ) -> Self {
        debug!(backend = %backend.describe(), charms = catalog.len(), "placement controller created");
        Self {
            catalog,
            inventory: None,
            backend,
            settings,
            inner: RwLock::new(Inner::new()),
        }
    }

    /// Attach a provisioner inventory.
    pub fn with_inventory(mut self, inventory: Arc<dyn MachineInventory>) -> Self {
        self.inventory = Some(inventory);
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn settings(&self) -> ControllerSettings {
        self.settings
    }

    pub fn has_inventory(&self) -> bool {
        self.inventory.is_some()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` to a copy of the state, persist it, then publish it.
    fn mutate<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> PlacementResult<R> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = guard.clone();
        let out = f(&mut next);
        let doc = next.store.to_document(&next.persisted_placeholders());
        self.backend.save(&doc)?;
        *guard = next;
        Ok(out)
    }

    fn resolve(&self, name: &str) -> PlacementResult<Arc<ServiceDescriptor>> {
        self.catalog
            .get(name)
            .cloned()
            .ok_or_else(|| PlacementError::UnknownCharm(name.to_string()))
    }

    // ── Machines ────────────────────────────────────────────────

    /// Placeable inventory machines, plus placeholders if asked.
    pub fn machines(&self, include_placeholders: bool) -> PlacementResult<Vec<Machine>> {
        let mut machines: Vec<Machine> = match &self.inventory {
            Some(inventory) => inventory
                .machines()?
                .into_iter()
                .filter(Machine::is_placeable)
                .collect(),
            None => Vec::new(),
        };
        if include_placeholders {
            machines.extend(self.read().placeholders.iter().cloned());
        }
        Ok(machines)
    }

    /// Known machines with at least one pending assignment.
    pub fn machines_pending(&self) -> PlacementResult<Vec<Machine>> {
        let pending: BTreeSet<MachineId> = self.read().store.machines_with_assignments().into_iter().collect();
        Ok(self
            .machines(true)?
            .into_iter()
            .filter(|m| pending.contains(&m.instance_id))
            .collect())
    }

    pub fn machine(&self, id: &str) -> PlacementResult<Option<Machine>> {
        Ok(self.machines(true)?.into_iter().find(|m| m.instance_id == id))
    }

    /// Add a placeholder machine, replacing one with the same id.
    pub fn add_placeholder(&self, machine: Machine) -> PlacementResult<()> {
        debug!(machine = %machine.instance_id, "placeholder added");
        self.mutate(|inner| inner.upsert_placeholder(machine))
    }

    pub fn placeholders(&self) -> Vec<Machine> {
        self.read().placeholders.clone()
    }

    /// Drop the inventory's cached listing.
    pub fn refresh_inventory(&self) {
        if let Some(inventory) = &self.inventory {
            inventory.invalidate();
            debug!("machine inventory invalidated");
        }
    }

    // ── Assignment mutations ────────────────────────────────────

    pub fn assign(&self, machine: &str, charm: &str, kind: PlacementKind) -> PlacementResult<()> {
        let descriptor = self.resolve(charm)?;
        self.mutate(|inner| inner.store.assign(machine, descriptor, kind))
    }

    /// Remove one unit of `charm` from `machine`. Returns whether one was there.
    pub fn remove_assignment(&self, machine: &str, charm: &str) -> PlacementResult<bool> {
        self.mutate(|inner| inner.store.remove_one(machine, charm))
    }

    /// Drop all pending assignments on `machine`.
    pub fn clear_assignments(&self, machine: &str) -> PlacementResult<bool> {
        self.mutate(|inner| inner.store.clear(machine))
    }

    pub fn clear_all_assignments(&self) -> PlacementResult<()> {
        self.mutate(|inner| inner.store.clear_all())
    }

    /// Promote one pending unit to deployed.
    ///
    /// A unit that is not pending is logged and reported as `Ok(false)`;
    /// the deployment driver retries.
    pub fn mark_deployed(&self, machine: &str, charm: &str, kind: PlacementKind) -> PlacementResult<bool> {
        let descriptor = self.resolve(charm)?;
        self.mutate(|inner| inner.store.mark_deployed(machine, descriptor, kind))
    }

    /// Commit a generated plan: add its placeholders and replace every
    /// pending assignment. Deployments are kept.
    pub fn set_all_assignments(&self, plan: AssignmentPlan) -> PlacementResult<()> {
        let AssignmentPlan { machines, assignments } = plan;
        info!(
            placeholders = machines.len(),
            machines = assignments.machines().count(),
            "committing assignment plan"
        );
        self.mutate(|inner| {
            for machine in machines {
                inner.upsert_placeholder(machine);
            }
            inner.store.set_all_assignments(assignments);
        })
    }

    // ── Assignment queries ──────────────────────────────────────

    pub fn assignments(&self) -> AssignmentMap {
        self.read().store.assignments().clone()
    }

    pub fn deployments(&self) -> AssignmentMap {
        self.read().store.deployments().clone()
    }

    pub fn assignments_for_machine(&self, machine: &str) -> BTreeMap<PlacementKind, Vec<Arc<ServiceDescriptor>>> {
        self.read().store.assignments_for_machine(machine)
    }

    pub fn deployments_for_machine(&self, machine: &str) -> BTreeMap<PlacementKind, Vec<Arc<ServiceDescriptor>>> {
        self.read().store.deployments_for_machine(machine)
    }

    pub fn assignments_for_descriptor(&self, charm: &str) -> BTreeMap<PlacementKind, Vec<MachineId>> {
        self.read().store.assignments_for_descriptor(charm)
    }

    pub fn deployments_for_descriptor(&self, charm: &str) -> BTreeMap<PlacementKind, Vec<MachineId>> {
        self.read().store.deployments_for_descriptor(charm)
    }

    /// Distinct descriptors with a pending assignment.
    pub fn assigned_descriptors(&self) -> Vec<Arc<ServiceDescriptor>> {
        self.read().store.assignments().descriptors()
    }

    pub fn is_assigned(&self, charm: &str) -> bool {
        self.read().store.assignment_count(charm) > 0
    }

    pub fn is_deployed(&self, charm: &str) -> bool {
        self.read().store.deployment_count(charm) > 0
    }

    /// Distinct machines holding a pending unit of `charm`.
    pub fn machine_count_for(&self, charm: &str) -> usize {
        self.read()
            .store
            .assignments_for_descriptor(charm)
            .into_values()
            .flatten()
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Placeable descriptors with nothing assigned or deployed.
    pub fn unassigned_undeployed(&self) -> Vec<Arc<ServiceDescriptor>> {
        let inner = self.read();
        self.catalog
            .placeable_descriptors()
            .into_iter()
            .filter(|d| inner.store.placed_count(&d.name) == 0)
            .collect()
    }

    /// Whether `charm` is required regardless of what is placed.
    pub fn service_is_core(&self, charm: &str) -> bool {
        self.catalog
            .get(charm)
            .is_some_and(|d| is_intrinsically_required(d, self.settings.storage_backend))
    }

    // ── Charm state ─────────────────────────────────────────────

    pub fn charm_state(&self, charm: &str) -> PlacementResult<CharmStatus> {
        let descriptor = self.resolve(charm)?;
        let inner = self.read();
        Ok(self.state_of(&descriptor, &inner.store))
    }

    fn state_of(&self, descriptor: &ServiceDescriptor, store: &AssignmentStore) -> CharmStatus {
        compute_charm_state(
            descriptor,
            &self.catalog.all_descriptors(),
            store,
            self.settings.storage_backend,
        )
    }

    /// Placeable descriptors currently in the REQUIRED state.
    fn required_descriptors(&self, store: &AssignmentStore) -> Vec<Arc<ServiceDescriptor>> {
        self.catalog
            .placeable_descriptors()
            .into_iter()
            .filter(|d| self.state_of(d, store).state == CharmState::Required)
            .collect()
    }

    fn unplaced_required_in(&self, store: &AssignmentStore) -> Vec<Arc<ServiceDescriptor>> {
        self.required_descriptors(store)
            .into_iter()
            .filter(|d| store.placed_count(&d.name) == 0)
            .collect()
    }

    /// REQUIRED descriptors with no unit assigned or deployed.
    pub fn unplaced_required(&self) -> Vec<Arc<ServiceDescriptor>> {
        self.unplaced_required_in(&self.read().store)
    }

    /// True when no REQUIRED descriptor is entirely unplaced.
    pub fn can_deploy(&self) -> bool {
        let unplaced = self.unplaced_required();
        if !unplaced.is_empty() {
            debug!(
                unplaced = ?unplaced.iter().map(|d| d.name.as_str()).collect::<Vec<_>>(),
                "deploy blocked"
            );
        }
        unplaced.is_empty()
    }

    // ── Automatic placement ─────────────────────────────────────

    /// Put each unplaced REQUIRED descriptor on its own empty machine.
    ///
    /// Candidates are machines with no assignments or deployments, taken
    /// first-fit and consumed one per descriptor under
    /// [`PlacementKind::Default`]. Whatever fits is committed; a shortfall
    /// is reported by name in the outcome.
    pub fn autoplace_unplaced_services(&self) -> PlacementResult<AutoplaceOutcome> {
        let machines = self.machines(true)?;
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        let unplaced = self.unplaced_required_in(&guard.store);
        if unplaced.is_empty() {
            return Ok(AutoplaceOutcome {
                success: true,
                message: "all required services are placed".to_string(),
            });
        }

        let mut pool: Vec<Machine> = machines
            .into_iter()
            .filter(|m| m.instance_id != DEFAULT_MACHINE_ID)
            .filter(|m| {
                !guard.store.assignments().has_machine(&m.instance_id)
                    && !guard.store.deployments().has_machine(&m.instance_id)
            })
            .collect();

        let mut next = guard.clone();
        let mut shortfall = Vec::new();
        for descriptor in unplaced {
            match pool.iter().position(|m| m.satisfies(&descriptor.constraints).0) {
                Some(pos) => {
                    let machine = pool.remove(pos);
                    info!(machine = %machine.instance_id, charm = %descriptor.name, "autoplaced");
                    next.store.assign(&machine.instance_id, descriptor, PlacementKind::Default);
                }
                None => {
                    warn!(charm = %descriptor.name, "no empty machine satisfies required charm");
                    shortfall.push(descriptor.name.clone());
                }
            }
        }

        let doc = next.store.to_document(&next.persisted_placeholders());
        self.backend.save(&doc)?;
        *guard = next;

        if shortfall.is_empty() {
            return Ok(AutoplaceOutcome {
                success: true,
                message: "all required services were placed".to_string(),
            });
        }
        Ok(AutoplaceOutcome {
            success: false,
            message: format!(
                "not enough empty machines for required services: {}; add machines or place them manually",
                shortfall.join(", ")
            ),
        })
    }

    /// Generate (but do not apply) a default plan.
    ///
    /// `descriptors` defaults to every REQUIRED descriptor and `machines`
    /// to the inventory's placeable machines. With neither machines nor an
    /// inventory this is [`PlacementError::NoInventory`].
    pub fn gen_defaults(
        &self,
        descriptors: Option<&[Arc<ServiceDescriptor>]>,
        machines: Option<Vec<Machine>>,
    ) -> PlacementResult<AssignmentPlan> {
        let machines = match machines {
            Some(machines) => machines,
            None => {
                if self.inventory.is_none() {
                    return Err(PlacementError::NoInventory);
                }
                self.machines(false)?
            }
        };
        let machines: Vec<Machine> = machines
            .into_iter()
            .filter(|m| m.instance_id != DEFAULT_MACHINE_ID && m.is_placeable())
            .collect();

        let descriptors = match descriptors {
            Some(descriptors) => descriptors.to_vec(),
            None => self.required_descriptors(&self.read().store),
        };
        Ok(plan_defaults(&descriptors, &machines, self.settings.controller_kind))
    }

    /// Generate (but do not apply) a single-host plan sized for this host.
    pub fn gen_single(&self) -> AssignmentPlan {
        let cpus = std::thread::available_parallelism().map_or(1, |n| n.get());
        self.gen_single_for_host(cpus)
    }

    pub fn gen_single_for_host(&self, host_cpus: usize) -> AssignmentPlan {
        let descriptors = self.required_descriptors(&self.read().store);
        plan_single(&descriptors, host_cpus, self.settings.controller_kind)
    }

    // ── Persistence ─────────────────────────────────────────────

    /// Write the current state.
    pub fn save(&self) -> PlacementResult<()> {
        let inner = self.read();
        self.backend
            .save(&inner.store.to_document(&inner.persisted_placeholders()))?;
        Ok(())
    }

    /// Replace the live state with the saved document, if any.
    ///
    /// Entries naming unknown charms or kinds are dropped and listed in
    /// the returned report. With nothing saved the state is left as is.
    pub fn load(&self) -> PlacementResult<LoadReport> {
        let Some(doc) = self.backend.load()? else {
            info!(backend = %self.backend.describe(), "no saved placement state");
            return Ok(LoadReport::default());
        };

        let (store, placeholders, report) =
            AssignmentStore::from_document(&doc, |name| self.catalog.get(name).cloned());

        let mut inner = Inner {
            store,
            placeholders: vec![default_placeholder()],
        };
        for machine in placeholders {
            inner.upsert_placeholder(machine);
        }

        info!(
            backend = %self.backend.describe(),
            machines = doc.placements.len(),
            placeholders = inner.placeholders.len() - 1,
            dropped = report.unknown_charms.len() + report.unknown_kinds.len() + report.duplicate_units.len(),
            "placement state loaded"
        );
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = inner;
        Ok(report)
    }

    pub fn snapshot(&self) -> PlacementSnapshot {
        let inner = self.read();
        PlacementSnapshot {
            store: inner.store.clone(),
            placeholders: inner.placeholders.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackplan_core::{MachineRecord, MachineStatus, StaticInventory};
    use stackplan_state::{MemoryBackend, PlacementDocument, StateError, StateResult};

    struct FailingBackend;

    impl PlacementBackend for FailingBackend {
        fn save(&self, _doc: &PlacementDocument) -> StateResult<()> {
            Err(StateError::Write("disk full".to_string()))
        }

        fn load(&self) -> StateResult<Option<PlacementDocument>> {
            Ok(None)
        }

        fn describe(&self) -> String {
            "failing".to_string()
        }
    }

    fn record(id: &str, mem: u64, status: MachineStatus) -> MachineRecord {
        MachineRecord {
            instance_id: id.to_string(),
            hostname: format!("{id}.maas"),
            status,
            arch: "amd64".to_string(),
            cpu_cores: 4,
            mem,
            storage: 100_000,
            power_type: None,
        }
    }

    fn test_catalog() -> Arc<Catalog> {
        Arc::new(
            Catalog::new(vec![
                ServiceDescriptor::new("keystone", "Keystone").core(),
                ServiceDescriptor::new("nova-compute", "Nova Compute")
                    .core()
                    .isolated()
                    .multi_unit()
                    .constraint("mem", 4096u64),
                ServiceDescriptor::new("glance", "Glance"),
                ServiceDescriptor::new("ntp", "NTP").subordinate(),
            ])
            .unwrap(),
        )
    }

    fn make_controller(backend: Arc<dyn PlacementBackend>) -> PlacementController {
        PlacementController::new(test_catalog(), backend, ControllerSettings::default())
    }

    fn with_machines(controller: PlacementController, records: Vec<MachineRecord>) -> PlacementController {
        controller.with_inventory(Arc::new(StaticInventory::from_records(records)))
    }

    #[test]
    fn default_placeholder_is_always_present() {
        let controller = make_controller(Arc::new(MemoryBackend::new()));
        let ids: Vec<_> = controller.placeholders().into_iter().map(|m| m.instance_id).collect();
        assert_eq!(ids, vec![DEFAULT_MACHINE_ID]);
        assert!(controller.machines(false).unwrap().is_empty());
        assert!(controller.machine(DEFAULT_MACHINE_ID).unwrap().is_some());
    }

    #[test]
    fn unknown_charm_is_rejected() {
        let controller = make_controller(Arc::new(MemoryBackend::new()));
        let err = controller.assign("m1", "no-such-charm", PlacementKind::Lxc).unwrap_err();
        assert!(matches!(err, PlacementError::UnknownCharm(name) if name == "no-such-charm"));
        assert!(controller.charm_state("no-such-charm").is_err());
    }

    #[test]
    fn every_mutation_is_written_through() {
        let backend = Arc::new(MemoryBackend::new());
        let controller = make_controller(backend.clone());

        controller.assign("m1", "keystone", PlacementKind::Lxc).unwrap();
        controller.assign("m1", "glance", PlacementKind::Lxc).unwrap();
        controller.remove_assignment("m1", "glance").unwrap();
        controller.mark_deployed("m1", "keystone", PlacementKind::Lxc).unwrap();
        controller.clear_all_assignments().unwrap();

        assert_eq!(backend.save_count(), 5);
        let doc = backend.document().unwrap();
        assert_eq!(doc.placements["m1"].deployments["LXC"], vec!["keystone"]);
    }

    #[test]
    fn failed_save_leaves_state_untouched() {
        let controller = make_controller(Arc::new(FailingBackend));
        let err = controller.assign("m1", "keystone", PlacementKind::Lxc).unwrap_err();
        assert!(matches!(err, PlacementError::State(StateError::Write(_))));
        assert!(!controller.is_assigned("keystone"));
        assert!(controller.assignments().is_empty());
    }

    #[test]
    fn machines_hide_unplaceable_inventory() {
        let controller = with_machines(
            make_controller(Arc::new(MemoryBackend::new())),
            vec![
                record("m1", 8192, MachineStatus::Ready),
                record("m2", 8192, MachineStatus::Commissioning),
            ],
        );
        let ids: Vec<_> = controller.machines(false).unwrap().into_iter().map(|m| m.instance_id).collect();
        assert_eq!(ids, vec!["m1"]);
        assert_eq!(controller.machines(true).unwrap().len(), 2);
    }

    #[test]
    fn machines_pending_lists_assigned_machines() {
        let controller = with_machines(
            make_controller(Arc::new(MemoryBackend::new())),
            vec![record("m1", 8192, MachineStatus::Ready), record("m2", 8192, MachineStatus::Ready)],
        );
        controller.assign("m2", "glance", PlacementKind::Lxc).unwrap();
        let pending: Vec<_> = controller.machines_pending().unwrap().into_iter().map(|m| m.instance_id).collect();
        assert_eq!(pending, vec!["m2"]);
        assert_eq!(controller.machine_count_for("glance"), 1);
    }

    #[test]
    fn can_deploy_tracks_required_charms() {
        let controller = make_controller(Arc::new(MemoryBackend::new()));
        assert!(!controller.can_deploy());
        let unplaced: Vec<_> = controller.unplaced_required().iter().map(|d| d.name.clone()).collect();
        assert_eq!(unplaced, vec!["keystone", "nova-compute"]);

        controller.assign("m1", "keystone", PlacementKind::Lxc).unwrap();
        controller.assign("m2", "nova-compute", PlacementKind::BareMetal).unwrap();
        assert!(controller.can_deploy());
    }

    #[test]
    fn gen_defaults_without_inventory_is_an_error() {
        let controller = make_controller(Arc::new(MemoryBackend::new()));
        assert!(matches!(
            controller.gen_defaults(None, None),
            Err(PlacementError::NoInventory)
        ));
        // Explicit machines need no inventory.
        let plan = controller
            .gen_defaults(None, Some(vec![Machine::real(record("m1", 8192, MachineStatus::Ready))]))
            .unwrap();
        assert!(!plan.is_empty());
    }

    #[test]
    fn gen_defaults_does_not_mutate() {
        let backend = Arc::new(MemoryBackend::new());
        let controller = with_machines(
            make_controller(backend.clone()),
            vec![record("m1", 8192, MachineStatus::Ready), record("m2", 2048, MachineStatus::Ready)],
        );
        let plan = controller.gen_defaults(None, None).unwrap();
        assert!(!plan.is_empty());
        assert!(controller.assignments().is_empty());
        assert_eq!(backend.save_count(), 0);

        controller.set_all_assignments(plan).unwrap();
        assert!(controller.is_assigned("nova-compute"));
        assert!(controller.can_deploy());
    }

    #[test]
    fn gen_single_commits_placeholders() {
        let controller = make_controller(Arc::new(MemoryBackend::new()));
        let plan = controller.gen_single_for_host(8);
        controller.set_all_assignments(plan).unwrap();

        let ids: Vec<_> = controller.placeholders().into_iter().map(|m| m.instance_id).collect();
        assert_eq!(ids, vec![DEFAULT_MACHINE_ID, "controller", "nova-compute-machine-1"]);
        assert!(controller.assignments_for_machine("controller")[&PlacementKind::Lxc]
            .iter()
            .any(|d| d.name == "keystone"));
        assert!(controller.can_deploy());
    }

    #[test]
    fn autoplace_reports_shortfall_by_name() {
        let controller = with_machines(
            make_controller(Arc::new(MemoryBackend::new())),
            vec![record("m1", 2048, MachineStatus::Ready)],
        );
        let outcome = controller.autoplace_unplaced_services().unwrap();
        assert!(!outcome.success);
        assert!(outcome.message.contains("nova-compute"), "{}", outcome.message);
        assert!(controller.is_assigned("keystone"), "partial placement is kept");
        assert_eq!(controller.assignments_for_descriptor("keystone")[&PlacementKind::Default], vec!["m1"]);
    }

    #[test]
    fn autoplace_skips_used_machines() {
        let controller = with_machines(
            make_controller(Arc::new(MemoryBackend::new())),
            vec![
                record("m1", 8192, MachineStatus::Ready),
                record("m2", 8192, MachineStatus::Ready),
                record("m3", 8192, MachineStatus::Ready),
            ],
        );
        controller.assign("m1", "glance", PlacementKind::Lxc).unwrap();

        let outcome = controller.autoplace_unplaced_services().unwrap();
        assert!(outcome.success, "{}", outcome.message);
        assert!(!controller.assignments_for_machine("m1").contains_key(&PlacementKind::Default));
        assert!(controller.can_deploy());

        let outcome = controller.autoplace_unplaced_services().unwrap();
        assert!(outcome.success);
    }

    #[test]
    fn load_with_nothing_saved_keeps_state() {
        let controller = make_controller(Arc::new(MemoryBackend::new()));
        let report = controller.load().unwrap();
        assert!(report.is_clean());
        assert_eq!(controller.placeholders().len(), 1);
    }

    #[test]
    fn default_placeholder_is_not_persisted() {
        let backend = Arc::new(MemoryBackend::new());
        let controller = make_controller(backend.clone());
        controller.assign(DEFAULT_MACHINE_ID, "glance", PlacementKind::Default).unwrap();

        let doc = backend.document().unwrap();
        assert!(doc.placements[DEFAULT_MACHINE_ID].constraints.is_none());

        let reloaded = make_controller(backend);
        reloaded.load().unwrap();
        assert_eq!(reloaded.placeholders().len(), 1);
        assert!(reloaded.is_assigned("glance"));
    }

    #[test]
    fn storage_backend_marks_services_core() {
        let catalog = Arc::new(
            Catalog::new(vec![ServiceDescriptor::new("ceph", "Ceph").units(3).multi_unit()]).unwrap(),
        );
        let settings = ControllerSettings {
            storage_backend: StorageBackend::Ceph,
            ..Default::default()
        };
        let controller = PlacementController::new(catalog, Arc::new(MemoryBackend::new()), settings);
        assert!(controller.service_is_core("ceph"));
        assert!(!controller.service_is_core("no-such-charm"));
        assert_eq!(controller.charm_state("ceph").unwrap().state, CharmState::Required);
    }
}
