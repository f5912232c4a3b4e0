use std::path::Path;

use stackplan_core::Machine;
use stackplan_placement::PlacementController;

use super::open_controller;

fn describe(controller: &PlacementController, machine: &Machine) -> Vec<String> {
    let mut lines = vec![machine.summary()];
    let sections = [
        ("assigned", controller.assignments_for_machine(&machine.instance_id)),
        ("deployed", controller.deployments_for_machine(&machine.instance_id)),
    ];
    for (label, slots) in sections {
        for (kind, list) in slots {
            let names: Vec<&str> = list.iter().map(|d| d.name.as_str()).collect();
            lines.push(format!("  {label} [{kind}]: {}", names.join(", ")));
        }
    }
    lines
}

pub fn machines(config_path: &Path, filter: Option<&str>) -> anyhow::Result<()> {
    let controller = open_controller(config_path)?;
    let filter = filter.unwrap_or("");
    let mut shown = 0;
    for machine in controller.machines(true)? {
        if !machine.matches_filter(filter) {
            continue;
        }
        shown += 1;
        for line in describe(&controller, &machine) {
            println!("{line}");
        }
    }
    if shown == 0 {
        println!("(no machines match)");
    }
    Ok(())
}
