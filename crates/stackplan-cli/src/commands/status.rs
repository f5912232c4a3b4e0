use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use stackplan_placement::{CharmState, PlacementController};

use super::open_controller;

#[derive(Debug, Serialize)]
struct CharmReport {
    name: String,
    state: CharmState,
    required_units: u32,
    assigned: usize,
    deployed: usize,
    conflicting: Vec<String>,
    depending: Vec<String>,
}

#[derive(Debug, Serialize)]
struct StatusReport {
    can_deploy: bool,
    charms: Vec<CharmReport>,
}

fn unit_count<K, V>(by_kind: BTreeMap<K, Vec<V>>) -> usize {
    by_kind.values().map(Vec::len).sum()
}

fn build_report(controller: &PlacementController) -> anyhow::Result<StatusReport> {
    let mut charms = Vec::new();
    for descriptor in controller.catalog().placeable_descriptors() {
        let status = controller.charm_state(&descriptor.name)?;
        charms.push(CharmReport {
            name: descriptor.name.clone(),
            state: status.state,
            required_units: descriptor.required_units,
            assigned: unit_count(controller.assignments_for_descriptor(&descriptor.name)),
            deployed: unit_count(controller.deployments_for_descriptor(&descriptor.name)),
            conflicting: status.conflicting.iter().map(|d| d.name.clone()).collect(),
            depending: status.depending.iter().map(|d| d.name.clone()).collect(),
        });
    }
    Ok(StatusReport {
        can_deploy: controller.can_deploy(),
        charms,
    })
}

fn format_report(report: &StatusReport) -> String {
    let mut out = String::new();
    for charm in &report.charms {
        out.push_str(&format!(
            "{:<24} {:<10} {}/{} placed, {} deployed",
            charm.name,
            charm.state.to_string(),
            charm.assigned + charm.deployed,
            charm.required_units,
            charm.deployed,
        ));
        if !charm.conflicting.is_empty() {
            out.push_str(&format!("  conflicts: {}", charm.conflicting.join(", ")));
        }
        if !charm.depending.is_empty() {
            out.push_str(&format!("  needed by: {}", charm.depending.join(", ")));
        }
        out.push('\n');
    }
    out.push_str(if report.can_deploy {
        "✓ ready to deploy"
    } else {
        "✗ required services are unplaced"
    });
    out
}

pub fn status(config_path: &Path, format: &str) -> anyhow::Result<()> {
    let controller = open_controller(config_path)?;
    let report = build_report(&controller)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            println!("{}", format_report(&report));
        }
    }

    Ok(())
}
