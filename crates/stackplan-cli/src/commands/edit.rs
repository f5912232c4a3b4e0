use std::path::Path;

use stackplan_core::PlacementKind;

use super::open_controller;

pub fn assign(config_path: &Path, machine: &str, charm: &str, kind: PlacementKind) -> anyhow::Result<()> {
    let controller = open_controller(config_path)?;
    controller.assign(machine, charm, kind)?;
    println!("✓ {charm} → {machine} [{kind}]");
    Ok(())
}

pub fn remove(config_path: &Path, machine: &str, charm: &str) -> anyhow::Result<()> {
    let controller = open_controller(config_path)?;
    if controller.remove_assignment(machine, charm)? {
        println!("✓ removed one {charm} unit from {machine}");
    } else {
        println!("{charm} is not assigned to {machine}");
    }
    Ok(())
}

pub fn clear(config_path: &Path, machine: Option<&str>, all: bool) -> anyhow::Result<()> {
    let controller = open_controller(config_path)?;
    match machine {
        Some(machine) if !all => {
            if controller.clear_assignments(machine)? {
                println!("✓ cleared {machine}");
            } else {
                println!("{machine} has no assignments");
            }
        }
        _ => {
            controller.clear_all_assignments()?;
            println!("✓ cleared all assignments");
        }
    }
    Ok(())
}

pub fn deployed(config_path: &Path, machine: &str, charm: &str, kind: PlacementKind) -> anyhow::Result<()> {
    let controller = open_controller(config_path)?;
    if !controller.mark_deployed(machine, charm, kind)? {
        anyhow::bail!("{charm} has no pending {kind} unit on {machine}");
    }
    println!("✓ {charm} on {machine} marked deployed");
    Ok(())
}
