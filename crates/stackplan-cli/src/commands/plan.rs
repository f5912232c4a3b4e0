use std::path::Path;

use stackplan_placement::{AssignmentPlan, PlacementController};
use tracing::info;

use super::{open_controller, print_plan};

fn finish(controller: &PlacementController, plan: AssignmentPlan, commit: bool) -> anyhow::Result<()> {
    print_plan(&plan);
    if commit {
        controller.set_all_assignments(plan)?;
        info!("plan committed");
        println!("✓ Plan committed");
    } else {
        println!("(dry run; pass --commit to apply)");
    }
    Ok(())
}

pub fn defaults(config_path: &Path, commit: bool) -> anyhow::Result<()> {
    let controller = open_controller(config_path)?;
    let plan = controller.gen_defaults(None, None)?;
    finish(&controller, plan, commit)
}

pub fn single(config_path: &Path, commit: bool, cpus: Option<usize>) -> anyhow::Result<()> {
    let controller = open_controller(config_path)?;
    let plan = match cpus {
        Some(cpus) => controller.gen_single_for_host(cpus),
        None => controller.gen_single(),
    };
    finish(&controller, plan, commit)
}

pub fn autoplace(config_path: &Path) -> anyhow::Result<()> {
    let controller = open_controller(config_path)?;
    let outcome = controller.autoplace_unplaced_services()?;
    if !outcome.success {
        anyhow::bail!("{}", outcome.message);
    }
    println!("✓ {}", outcome.message);
    Ok(())
}
