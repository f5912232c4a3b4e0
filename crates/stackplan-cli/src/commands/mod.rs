pub mod edit;
pub mod init;
pub mod machines;
pub mod plan;
pub mod status;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use stackplan_core::{BackendKind, Catalog, FileInventory, StackplanConfig};
use stackplan_placement::{AssignmentPlan, ControllerSettings, PlacementController};
use stackplan_state::{MemoryBackend, PlacementBackend, RedbBackend, YamlFileBackend};
use tracing::{debug, warn};

/// Read the config, falling back to defaults when the file is absent.
pub fn load_config(path: &Path) -> anyhow::Result<StackplanConfig> {
    if !path.exists() {
        debug!(?path, "no config file, using defaults");
        return Ok(StackplanConfig::default());
    }
    Ok(StackplanConfig::from_file(path)?)
}

/// Where the placement state lives for this config.
fn state_path(config: &StackplanConfig) -> PathBuf {
    match (config.backend(), &config.placement.state_file) {
        (BackendKind::Redb, None) => PathBuf::from("placement.redb"),
        _ => config.state_file(),
    }
}

fn open_backend(config: &StackplanConfig) -> anyhow::Result<Arc<dyn PlacementBackend>> {
    let path = state_path(config);
    let backend: Arc<dyn PlacementBackend> = match config.backend() {
        BackendKind::Yaml => Arc::new(YamlFileBackend::new(&path)),
        BackendKind::Redb => Arc::new(RedbBackend::open(&path)?),
        BackendKind::Memory => Arc::new(MemoryBackend::new()),
    };
    Ok(backend)
}

/// Build a controller from the config at `config_path` and load saved state.
pub fn open_controller(config_path: &Path) -> anyhow::Result<PlacementController> {
    let config = load_config(config_path)?;

    let catalog = match &config.catalog {
        Some(catalog) => Catalog::from_file(&catalog.path)?,
        None => Catalog::builtin(),
    };
    let mut controller = PlacementController::new(
        Arc::new(catalog),
        open_backend(&config)?,
        ControllerSettings::from_config(&config),
    );
    if let Some(inventory) = &config.inventory {
        controller = controller.with_inventory(Arc::new(FileInventory::new(&inventory.path)));
    }

    let report = controller.load()?;
    for message in report.messages() {
        warn!("{message}");
        eprintln!("warning: {message}");
    }
    Ok(controller)
}

/// Print a plan grouped by machine.
pub fn print_plan(plan: &AssignmentPlan) {
    for machine in &plan.machines {
        println!("+ placeholder {}", machine.summary());
    }
    if plan.is_empty() {
        println!("(nothing to place)");
        return;
    }
    for (machine, kind, list) in plan.assignments.iter() {
        let names: Vec<&str> = list.iter().map(|d| d.name.as_str()).collect();
        println!("{machine} [{kind}]: {}", names.join(", "));
    }
}
