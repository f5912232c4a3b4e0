//! Assignment relation: machine → placement kind → descriptors.
//!
//! Lookups never create entries. Removing the last descriptor from a slot
//! removes the slot, and removing the last slot removes the machine, so
//! "does this machine have assignments" is always a plain key check.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use stackplan_core::{Machine, MachineId, PlacementKind, ServiceDescriptor};
use tracing::{debug, warn};

use crate::document::{LoadReport, PlacementDocument};

type Slots = BTreeMap<PlacementKind, Vec<Arc<ServiceDescriptor>>>;

/// Two-level map of machine → kind → descriptors. Duplicates are allowed;
/// uniqueness for single-unit charms is enforced by [`AssignmentStore`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentMap {
    slots: BTreeMap<MachineId, Slots>,
}

impl AssignmentMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, machine: &str, kind: PlacementKind, descriptor: Arc<ServiceDescriptor>) {
        self.slots
            .entry(machine.to_string())
            .or_default()
            .entry(kind)
            .or_default()
            .push(descriptor);
    }

    /// Remove one occurrence of `name` from `(machine, kind)`.
    pub fn remove_one(&mut self, machine: &str, kind: PlacementKind, name: &str) -> bool {
        let Some(slots) = self.slots.get_mut(machine) else {
            return false;
        };
        let Some(list) = slots.get_mut(&kind) else {
            return false;
        };
        let Some(pos) = list.iter().position(|d| d.name == name) else {
            return false;
        };
        list.remove(pos);
        if list.is_empty() {
            slots.remove(&kind);
        }
        if slots.is_empty() {
            self.slots.remove(machine);
        }
        true
    }

    /// Remove every occurrence of `name` anywhere. Returns how many were removed.
    pub fn remove_all_of(&mut self, name: &str) -> usize {
        let mut removed = 0;
        self.slots.retain(|_, slots| {
            slots.retain(|_, list| {
                let before = list.len();
                list.retain(|d| d.name != name);
                removed += before - list.len();
                !list.is_empty()
            });
            !slots.is_empty()
        });
        removed
    }

    /// Drop every slot on `machine`. Returns whether anything was there.
    pub fn clear_machine(&mut self, machine: &str) -> bool {
        self.slots.remove(machine).is_some()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn has_machine(&self, machine: &str) -> bool {
        self.slots.contains_key(machine)
    }

    /// Whether `name` sits anywhere on `machine`.
    pub fn contains(&self, machine: &str, name: &str) -> bool {
        self.slots
            .get(machine)
            .is_some_and(|slots| slots.values().flatten().any(|d| d.name == name))
    }

    /// Kinds on `machine` holding at least one `name`, in kind order.
    pub fn kinds_containing(&self, machine: &str, name: &str) -> Vec<PlacementKind> {
        self.slots
            .get(machine)
            .map(|slots| {
                slots
                    .iter()
                    .filter(|(_, list)| list.iter().any(|d| d.name == name))
                    .map(|(kind, _)| *kind)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Total units of `name` across all machines and kinds.
    pub fn count(&self, name: &str) -> usize {
        self.iter()
            .flat_map(|(_, _, list)| list.iter())
            .filter(|d| d.name == name)
            .count()
    }

    pub fn for_machine(&self, machine: &str) -> Slots {
        self.slots.get(machine).cloned().unwrap_or_default()
    }

    /// Kind → machines holding `name`. A machine appears once per unit.
    pub fn for_descriptor(&self, name: &str) -> BTreeMap<PlacementKind, Vec<MachineId>> {
        let mut out: BTreeMap<PlacementKind, Vec<MachineId>> = BTreeMap::new();
        for (machine, kind, list) in self.iter() {
            for _ in list.iter().filter(|d| d.name == name) {
                out.entry(kind).or_default().push(machine.clone());
            }
        }
        out
    }

    pub fn machines(&self) -> impl Iterator<Item = &MachineId> {
        self.slots.keys()
    }

    /// Distinct descriptors present, in first-seen order.
    pub fn descriptors(&self) -> Vec<Arc<ServiceDescriptor>> {
        let mut seen = BTreeSet::new();
        self.iter()
            .flat_map(|(_, _, list)| list.iter())
            .filter(|d| seen.insert(d.name.clone()))
            .cloned()
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MachineId, PlacementKind, &Vec<Arc<ServiceDescriptor>>)> {
        self.slots
            .iter()
            .flat_map(|(machine, slots)| slots.iter().map(move |(kind, list)| (machine, *kind, list)))
    }
}

/// Pending assignments plus deployed commitments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentStore {
    assignments: AssignmentMap,
    deployments: AssignmentMap,
}

impl AssignmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place one unit of `descriptor` on `(machine, kind)`.
    ///
    /// A single-unit descriptor is first removed from wherever it was.
    pub fn assign(&mut self, machine: &str, descriptor: Arc<ServiceDescriptor>, kind: PlacementKind) {
        if !descriptor.allow_multi_units {
            let moved = self.assignments.remove_all_of(&descriptor.name);
            if moved > 0 {
                debug!(charm = %descriptor.name, moved, "removed previous placement of single-unit charm");
            }
        }
        debug!(%machine, charm = %descriptor.name, %kind, "assigned");
        self.assignments.insert(machine, kind, descriptor);
    }

    /// Remove one unit of `name` from `machine`, preferring the default kind.
    pub fn remove_one(&mut self, machine: &str, name: &str) -> bool {
        if self.assignments.remove_one(machine, PlacementKind::Default, name) {
            debug!(%machine, charm = %name, "removed default assignment");
            return true;
        }
        let Some(kind) = self.assignments.kinds_containing(machine, name).first().copied() else {
            debug!(%machine, charm = %name, "nothing to remove");
            return false;
        };
        let removed = self.assignments.remove_one(machine, kind, name);
        debug!(%machine, charm = %name, %kind, "removed assignment");
        removed
    }

    /// Drop all pending assignments on `machine`.
    pub fn clear(&mut self, machine: &str) -> bool {
        let cleared = self.assignments.clear_machine(machine);
        debug!(%machine, cleared, "cleared machine assignments");
        cleared
    }

    pub fn clear_all(&mut self) {
        self.assignments.clear();
    }

    pub fn clear_deployments(&mut self) {
        self.deployments.clear();
    }

    /// Replace every pending assignment with `map`.
    ///
    /// A single-unit charm keeps only its first slot; any further slot is
    /// dropped with a warning.
    pub fn set_all_assignments(&mut self, map: AssignmentMap) {
        let mut kept = AssignmentMap::new();
        for (machine, kind, list) in map.iter() {
            for descriptor in list {
                if !descriptor.allow_multi_units && kept.count(&descriptor.name) > 0 {
                    warn!(%machine, charm = %descriptor.name, %kind, "single-unit charm already placed, dropping extra slot");
                    continue;
                }
                kept.insert(machine, kind, Arc::clone(descriptor));
            }
        }
        self.assignments = kept;
    }

    /// Promote one pending unit to deployed.
    ///
    /// Returns `false`, with a warning, if that unit is not pending; the
    /// deployment driver is expected to retry.
    pub fn mark_deployed(&mut self, machine: &str, descriptor: Arc<ServiceDescriptor>, kind: PlacementKind) -> bool {
        if !self.assignments.remove_one(machine, kind, &descriptor.name) {
            warn!(%machine, charm = %descriptor.name, %kind, "mark deployed: no such pending assignment");
            return false;
        }
        debug!(%machine, charm = %descriptor.name, %kind, "marked deployed");
        self.deployments.insert(machine, kind, descriptor);
        true
    }

    pub fn assignments(&self) -> &AssignmentMap {
        &self.assignments
    }

    pub fn deployments(&self) -> &AssignmentMap {
        &self.deployments
    }

    pub fn assignments_for_machine(&self, machine: &str) -> Slots {
        self.assignments.for_machine(machine)
    }

    pub fn deployments_for_machine(&self, machine: &str) -> Slots {
        self.deployments.for_machine(machine)
    }

    pub fn assignments_for_descriptor(&self, name: &str) -> BTreeMap<PlacementKind, Vec<MachineId>> {
        self.assignments.for_descriptor(name)
    }

    pub fn deployments_for_descriptor(&self, name: &str) -> BTreeMap<PlacementKind, Vec<MachineId>> {
        self.deployments.for_descriptor(name)
    }

    pub fn assignment_count(&self, name: &str) -> usize {
        self.assignments.count(name)
    }

    pub fn deployment_count(&self, name: &str) -> usize {
        self.deployments.count(name)
    }

    /// Assigned plus deployed units.
    pub fn placed_count(&self, name: &str) -> usize {
        self.assignment_count(name) + self.deployment_count(name)
    }

    pub fn is_assigned_to(&self, machine: &str, name: &str) -> bool {
        self.assignments.contains(machine, name)
    }

    pub fn is_deployed_to(&self, machine: &str, name: &str) -> bool {
        self.deployments.contains(machine, name)
    }

    /// Machines with at least one pending assignment.
    pub fn machines_with_assignments(&self) -> Vec<MachineId> {
        self.assignments.machines().cloned().collect()
    }

    /// Serialize both relations plus the given placeholders.
    pub fn to_document(&self, placeholders: &[Machine]) -> PlacementDocument {
        let mut doc = PlacementDocument::default();
        for machine in placeholders {
            let entry = doc.placements.entry(machine.instance_id.clone()).or_default();
            entry.name = Some(machine.hostname.clone());
            entry.constraints = machine.placeholder_constraints().cloned();
        }
        for (machine, kind, list) in self.assignments.iter() {
            let entry = doc.placements.entry(machine.clone()).or_default();
            entry
                .assignments
                .insert(kind.to_string(), list.iter().map(|d| d.name.clone()).collect());
        }
        for (machine, kind, list) in self.deployments.iter() {
            let entry = doc.placements.entry(machine.clone()).or_default();
            entry
                .deployments
                .insert(kind.to_string(), list.iter().map(|d| d.name.clone()).collect());
        }
        doc
    }

    /// Rebuild state from a document.
    ///
    /// `resolve` maps a charm name to its descriptor. Unknown charms and
    /// unknown kinds are dropped with a warning and listed in the report.
    /// So is every slot after the first of a single-unit charm.
    pub fn from_document<F>(doc: &PlacementDocument, resolve: F) -> (Self, Vec<Machine>, LoadReport)
    where
        F: Fn(&str) -> Option<Arc<ServiceDescriptor>>,
    {
        let mut store = AssignmentStore::new();
        let mut placeholders = Vec::new();
        let mut report = LoadReport::default();

        for (machine, placement) in &doc.placements {
            if let Some(constraints) = &placement.constraints {
                let name = placement.name.as_deref().unwrap_or(machine);
                placeholders.push(Machine::placeholder(machine, name, constraints.clone()));
            }
            load_relation(machine, &placement.assignments, &resolve, &mut store.assignments, &mut report);
            load_relation(machine, &placement.deployments, &resolve, &mut store.deployments, &mut report);
        }

        (store, placeholders, report)
    }
}

fn load_relation<F>(
    machine: &str,
    section: &BTreeMap<String, Vec<String>>,
    resolve: &F,
    into: &mut AssignmentMap,
    report: &mut LoadReport,
) where
    F: Fn(&str) -> Option<Arc<ServiceDescriptor>>,
{
    for (kind_name, names) in section {
        let Ok(kind) = kind_name.parse::<PlacementKind>() else {
            warn!(%machine, kind = %kind_name, "unknown placement kind in saved state, dropping");
            report.unknown_kinds.push((machine.to_string(), kind_name.clone()));
            continue;
        };
        for name in names {
            match resolve(name) {
                Some(descriptor) if !descriptor.allow_multi_units && into.count(name) > 0 => {
                    warn!(%machine, charm = %name, %kind, "single-unit charm listed twice in saved state, dropping");
                    report.duplicate_units.push((machine.to_string(), name.clone()));
                }
                Some(descriptor) => into.insert(machine, kind, descriptor),
                None => {
                    warn!(%machine, charm = %name, "unknown charm in saved state, dropping");
                    report.unknown_charms.push((machine.to_string(), name.clone()));
                }
            }
        }
    }
}
