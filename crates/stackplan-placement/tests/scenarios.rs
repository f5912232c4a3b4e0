//! End-to-end placement scenarios against a controller.
//!
//! Covers the worked scenarios for defaults, quota transitions, conflicts
//! and tolerant loading, plus the store properties that must hold for any
//! sequence of calls.

use std::sync::Arc;

use stackplan_core::{
    Catalog, ConstraintValue, Constraints, Machine, MachineRecord, MachineStatus, PlacementKind,
    ServiceDescriptor, StaticInventory,
};
use stackplan_placement::*;
use stackplan_state::{MemoryBackend, PlacementBackend, RedbBackend, YamlFileBackend};

fn make_record(id: &str, mem: u64) -> MachineRecord {
    MachineRecord {
        instance_id: id.to_string(),
        hostname: id.to_string(),
        status: MachineStatus::Ready,
        arch: "amd64".to_string(),
        cpu_cores: 8,
        mem,
        storage: 200_000,
        power_type: Some("ipmi".to_string()),
    }
}

fn make_controller(descriptors: Vec<ServiceDescriptor>) -> PlacementController {
    let catalog = Arc::new(Catalog::new(descriptors).unwrap());
    PlacementController::new(catalog, Arc::new(MemoryBackend::new()), ControllerSettings::default())
}

fn controller_on(
    descriptors: Vec<ServiceDescriptor>,
    backend: Arc<dyn PlacementBackend>,
) -> PlacementController {
    let catalog = Arc::new(Catalog::new(descriptors).unwrap());
    PlacementController::new(catalog, backend, ControllerSettings::default())
}

fn openstack_subset() -> Vec<ServiceDescriptor> {
    vec![
        ServiceDescriptor::new("keystone", "Keystone").core(),
        ServiceDescriptor::new("glance", "Glance").depends_on(&["keystone"]),
        ServiceDescriptor::new("nova-compute", "Nova Compute")
            .core()
            .isolated()
            .multi_unit()
            .constraint("mem", 4096u64),
        ServiceDescriptor::new("ceph", "Ceph").multi_unit().units(3),
    ]
}

fn placed_slots(controller: &PlacementController, charm: &str) -> usize {
    controller
        .assignments()
        .iter()
        .filter(|(_, _, list)| list.iter().any(|d| d.name == charm))
        .count()
}

// ── Worked scenarios ────────────────────────────────────────────

#[test]
fn defaults_put_isolated_charm_on_only_machine_that_fits() {
    let controller = make_controller(vec![
        ServiceDescriptor::new("keystone", "Keystone").core(),
        ServiceDescriptor::new("nova-compute", "Nova Compute")
            .core()
            .isolated()
            .constraint("mem", 4096u64),
    ])
    .with_inventory(Arc::new(StaticInventory::from_records(vec![
        make_record("M1", 8192),
        make_record("M2", 2048),
    ])));

    let plan = controller.gen_defaults(None, None).unwrap();

    assert_eq!(plan.machines_for("nova-compute"), vec!["M1"]);
    assert_eq!(plan.machines_for("keystone"), vec!["M2"]);
    assert!(controller.assignments().is_empty(), "generation must not mutate");
}

#[test]
fn quota_drives_required_then_optional() {
    let controller = make_controller(openstack_subset());

    let mut states = vec![controller.charm_state("ceph").unwrap().state];
    for _ in 0..3 {
        controller.assign("M1", "ceph", PlacementKind::BareMetal).unwrap();
        states.push(controller.charm_state("ceph").unwrap().state);
    }

    assert_eq!(
        states,
        vec![
            CharmState::Optional,
            CharmState::Required,
            CharmState::Required,
            CharmState::Optional,
        ]
    );
}

#[test]
fn placed_conflict_marks_other_charm_conflicted() {
    let controller = make_controller(vec![
        ServiceDescriptor::new("ceph-radosgw", "Ceph RADOS Gateway"),
        ServiceDescriptor::new("swift-proxy", "Swift Proxy").conflicts_with(&["ceph-radosgw"]),
    ]);
    controller.assign("M1", "swift-proxy", PlacementKind::Lxc).unwrap();

    let status = controller.charm_state("ceph-radosgw").unwrap();
    assert_eq!(status.state, CharmState::Conflicted);
    let names: Vec<_> = status.conflicting.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["swift-proxy"]);

    // A conflict on an optional charm does not block deploying.
    assert!(controller.can_deploy());
}

#[test]
fn conflicted_core_charm_blocks_deploy() {
    let controller = make_controller(vec![
        ServiceDescriptor::new("ceph-radosgw", "Ceph RADOS Gateway").core(),
        ServiceDescriptor::new("swift-proxy", "Swift Proxy").conflicts_with(&["ceph-radosgw"]),
    ]);
    controller.assign("M1", "swift-proxy", PlacementKind::Lxc).unwrap();

    let status = controller.charm_state("ceph-radosgw").unwrap();
    assert_eq!(status.conflicting.len(), 1);
    assert!(!controller.can_deploy());

    controller.assign("M2", "ceph-radosgw", PlacementKind::Lxc).unwrap();
    assert!(controller.can_deploy());
}

#[test]
fn unknown_charm_in_saved_state_is_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("placement.yaml");
    std::fs::write(
        &path,
        r#"
placements:
  M1:
    assignments:
      LXC: [keystone, no-such-charm]
  M2:
    deployments:
      BareMetal: [no-such-charm]
"#,
    )
    .unwrap();

    let controller = controller_on(openstack_subset(), Arc::new(YamlFileBackend::new(&path)));
    let report = controller.load().unwrap();

    assert!(controller.is_assigned("keystone"));
    assert!(!controller.is_assigned("no-such-charm"));
    assert!(!controller.is_deployed("no-such-charm"));
    assert_eq!(report.unknown_charms.len(), 2);
    assert!(report.messages().iter().all(|m| m.contains("no-such-charm")));
}

#[test]
fn unparseable_saved_state_is_a_hard_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("placement.yaml");
    std::fs::write(&path, "placements: 42\n").unwrap();

    let controller = controller_on(openstack_subset(), Arc::new(YamlFileBackend::new(&path)));
    assert!(matches!(controller.load(), Err(PlacementError::State(_))));
}

#[test]
fn single_unit_charm_listed_twice_loads_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("placement.yaml");
    std::fs::write(
        &path,
        r#"
placements:
  M1:
    assignments:
      LXC: [keystone]
  M2:
    assignments:
      LXC: [keystone]
"#,
    )
    .unwrap();

    let controller = controller_on(openstack_subset(), Arc::new(YamlFileBackend::new(&path)));
    let report = controller.load().unwrap();

    assert_eq!(placed_slots(&controller, "keystone"), 1);
    assert_eq!(report.duplicate_units, vec![("M2".to_string(), "keystone".to_string())]);
}

// ── Store properties ────────────────────────────────────────────

#[test]
fn clear_is_idempotent() {
    let controller = make_controller(openstack_subset());
    controller.assign("M1", "keystone", PlacementKind::Lxc).unwrap();
    controller.assign("M2", "glance", PlacementKind::Lxc).unwrap();

    assert!(controller.clear_assignments("M1").unwrap());
    let once = controller.snapshot();
    assert!(!controller.clear_assignments("M1").unwrap());
    assert_eq!(controller.snapshot(), once);
    assert!(!controller.clear_assignments("never-used").unwrap());
    assert_eq!(controller.snapshot(), once);
}

#[test]
fn single_unit_charm_occupies_one_slot() {
    let controller = make_controller(openstack_subset());
    let moves = [
        ("M1", PlacementKind::Lxc),
        ("M2", PlacementKind::Kvm),
        ("M2", PlacementKind::Kvm),
        ("M1", PlacementKind::BareMetal),
        ("M3", PlacementKind::Default),
    ];
    for (machine, kind) in moves {
        controller.assign(machine, "keystone", kind).unwrap();
        assert_eq!(placed_slots(&controller, "keystone"), 1);
    }
    assert!(controller.assignments_for_machine("M3").contains_key(&PlacementKind::Default));

    for machine in ["M1", "M2", "M3"] {
        controller.assign(machine, "ceph", PlacementKind::BareMetal).unwrap();
    }
    assert_eq!(placed_slots(&controller, "ceph"), 3, "multi-unit charms may repeat");
}

#[test]
fn mark_deployed_moves_one_unit() {
    let controller = make_controller(openstack_subset());
    for machine in ["M1", "M2"] {
        controller.assign(machine, "nova-compute", PlacementKind::BareMetal).unwrap();
    }
    let assigned = |c: &PlacementController| {
        c.assignments_for_descriptor("nova-compute").values().map(Vec::len).sum::<usize>()
    };
    let deployed = |c: &PlacementController| {
        c.deployments_for_descriptor("nova-compute").values().map(Vec::len).sum::<usize>()
    };

    assert!(controller.mark_deployed("M1", "nova-compute", PlacementKind::BareMetal).unwrap());
    assert_eq!((assigned(&controller), deployed(&controller)), (1, 1));

    // Retried call for a unit that already moved changes nothing.
    assert!(!controller.mark_deployed("M1", "nova-compute", PlacementKind::BareMetal).unwrap());
    assert_eq!((assigned(&controller), deployed(&controller)), (1, 1));

    assert!(controller.mark_deployed("M2", "nova-compute", PlacementKind::BareMetal).unwrap());
    assert_eq!((assigned(&controller), deployed(&controller)), (0, 2));
    assert!(controller.is_deployed("nova-compute"));
}

#[test]
fn defaults_only_use_satisfying_machines() {
    let descriptors = vec![
        ServiceDescriptor::new("mysql", "MySQL").core().constraint("mem", "4G"),
        ServiceDescriptor::new("keystone", "Keystone").core(),
        ServiceDescriptor::new("ceph", "Ceph")
            .core()
            .isolated()
            .multi_unit()
            .units(2)
            .constraint("root-disk", "150G"),
        ServiceDescriptor::new("nova-compute", "Nova Compute")
            .core()
            .isolated()
            .constraint("cpu-cores", 8u64),
    ];
    let mut small = make_record("small", 2048);
    small.storage = 50_000;
    let records = vec![
        small,
        make_record("a", 16384),
        make_record("b", 4096),
        make_record("c", 8192),
        make_record("d", 1024),
    ];
    let machines: Vec<Machine> = records.iter().cloned().map(Machine::real).collect();
    let controller = make_controller(descriptors)
        .with_inventory(Arc::new(StaticInventory::from_records(records)));

    let plan = controller.gen_defaults(None, None).unwrap();
    assert!(!plan.is_empty());
    for (machine_id, _, list) in plan.assignments.iter() {
        let machine = machines.iter().find(|m| &m.instance_id == machine_id).unwrap();
        for descriptor in list {
            let (ok, failed) = machine.satisfies(&descriptor.constraints);
            assert!(ok, "{} on {machine_id} fails {failed:?}", descriptor.name);
            assert!(failed.is_empty());
        }
    }
}

// ── Persistence ─────────────────────────────────────────────────

fn populate(controller: &PlacementController) {
    let mut constraints = Constraints::new();
    constraints.insert("mem".to_string(), ConstraintValue::Text("6G".to_string()));
    constraints.insert("cpu-cores".to_string(), ConstraintValue::Number(4));
    constraints.insert("arch".to_string(), ConstraintValue::Text("*".to_string()));
    controller
        .add_placeholder(Machine::placeholder("controller", "controller", constraints))
        .unwrap();

    controller.assign("controller", "keystone", PlacementKind::Lxc).unwrap();
    controller.assign("controller", "glance", PlacementKind::Kvm).unwrap();
    controller.assign("M1", "nova-compute", PlacementKind::BareMetal).unwrap();
    controller.assign("M2", "nova-compute", PlacementKind::BareMetal).unwrap();
    controller.assign(DEFAULT_MACHINE_ID, "ceph", PlacementKind::Default).unwrap();
    controller.mark_deployed("M1", "nova-compute", PlacementKind::BareMetal).unwrap();
}

fn assert_round_trip(backend: Arc<dyn PlacementBackend>, reopened: Arc<dyn PlacementBackend>) {
    let first = controller_on(openstack_subset(), backend);
    populate(&first);

    let fresh = controller_on(openstack_subset(), reopened);
    let report = fresh.load().unwrap();
    assert!(report.is_clean(), "{:?}", report.messages());

    let before = first.snapshot();
    let after = fresh.snapshot();
    assert_eq!(after.store, before.store);
    assert_eq!(after.placeholders, before.placeholders);
}

#[test]
fn yaml_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state").join("placement.yaml");
    assert_round_trip(
        Arc::new(YamlFileBackend::new(&path)),
        Arc::new(YamlFileBackend::new(&path)),
    );
}

#[test]
fn redb_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("placement.redb");
    {
        let first = controller_on(openstack_subset(), Arc::new(RedbBackend::open(&path).unwrap()));
        populate(&first);
    }
    let fresh = controller_on(openstack_subset(), Arc::new(RedbBackend::open(&path).unwrap()));
    fresh.load().unwrap();

    assert!(fresh.is_deployed("nova-compute"));
    assert_eq!(fresh.machine_count_for("nova-compute"), 1);
    assert_eq!(fresh.placeholders().len(), 2);
    let controller = fresh.machine("controller").unwrap().unwrap();
    let cons = controller.placeholder_constraints().unwrap();
    assert_eq!(cons["arch"], ConstraintValue::Text("*".to_string()));
}

#[test]
fn memory_round_trip() {
    let backend = Arc::new(MemoryBackend::new());
    assert_round_trip(backend.clone(), backend);
}

#[test]
fn every_mutation_writes_through() {
    let backend = Arc::new(MemoryBackend::new());
    let controller = controller_on(openstack_subset(), backend.clone());

    controller.assign("M1", "keystone", PlacementKind::Lxc).unwrap();
    assert_eq!(backend.save_count(), 1);
    controller.clear_assignments("M1").unwrap();
    assert_eq!(backend.save_count(), 2);

    // Reads never write.
    let _ = controller.charm_state("keystone").unwrap();
    let _ = controller.can_deploy();
    let _ = controller.snapshot();
    assert_eq!(backend.save_count(), 2);
}

#[test]
fn single_host_plan_commits_and_survives_reload() {
    let backend = Arc::new(MemoryBackend::new());
    let controller = controller_on(openstack_subset(), backend.clone());
    let plan = controller.gen_single_for_host(4);
    assert_eq!(plan.machines[0].instance_id, CONTROLLER_MACHINE_ID);
    controller.set_all_assignments(plan).unwrap();
    assert!(controller.can_deploy());

    let fresh = controller_on(openstack_subset(), backend);
    fresh.load().unwrap();
    assert_eq!(fresh.snapshot(), controller.snapshot());
}

#[test]
fn controller_is_shareable_across_threads() {
    let controller = Arc::new(make_controller(openstack_subset()));
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let controller = Arc::clone(&controller);
            std::thread::spawn(move || {
                controller
                    .assign(&format!("M{i}"), "ceph", PlacementKind::BareMetal)
                    .unwrap();
                controller.charm_state("ceph").unwrap()
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(controller.assignments_for_descriptor("ceph")[&PlacementKind::BareMetal].len(), 4);
}

#[test]
fn committed_plans_hold_single_unit_charm_once() {
    let gateway = || {
        ServiceDescriptor::new("neutron-gateway", "Neutron Gateway")
            .core()
            .isolated()
            .units(2)
    };
    let controller = make_controller(vec![gateway()]).with_inventory(Arc::new(
        StaticInventory::from_records(vec![make_record("M1", 8192), make_record("M2", 8192)]),
    ));

    let plan = controller.gen_defaults(None, None).unwrap();
    controller.set_all_assignments(plan).unwrap();
    assert_eq!(placed_slots(&controller, "neutron-gateway"), 1);

    let plan = controller.gen_single_for_host(4);
    controller.set_all_assignments(plan).unwrap();
    assert_eq!(placed_slots(&controller, "neutron-gateway"), 1);
}
