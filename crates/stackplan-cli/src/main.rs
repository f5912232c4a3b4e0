use std::path::PathBuf;

use clap::{Parser, Subcommand};
use stackplan_core::PlacementKind;

mod commands;

#[derive(Parser)]
#[command(
    name = "stackplan",
    about = "Stackplan — service placement for multi-node OpenStack installs",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Path to stackplan.toml
    #[arg(short, long, global = true, default_value = "stackplan.toml")]
    config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a stackplan.toml scaffold
    Init {
        /// Machine inventory file to reference (JSON)
        #[arg(short, long)]
        inventory: Option<PathBuf>,
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
    /// Show every service's placement state and whether deploy is possible
    Status {
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Generate a default plan over the machine inventory
    Defaults {
        /// Replace current assignments with the plan
        #[arg(long)]
        commit: bool,
    },
    /// Generate a single-host plan with placeholder machines
    Single {
        /// Replace current assignments with the plan
        #[arg(long)]
        commit: bool,
        /// Host CPU count (default: detected)
        #[arg(long)]
        cpus: Option<usize>,
    },
    /// Place every unplaced required service on an empty machine
    Autoplace,
    /// Assign one unit of a service to a machine
    Assign {
        machine: String,
        charm: String,
        /// Placement kind: baremetal, kvm, lxc or default
        #[arg(short, long, default_value = "lxc", value_parser = parse_kind)]
        kind: PlacementKind,
    },
    /// Remove one unit of a service from a machine
    Remove { machine: String, charm: String },
    /// Clear pending assignments on one machine, or everywhere
    Clear {
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        machine: Option<String>,
        #[arg(long)]
        all: bool,
    },
    /// Record that a pending unit has been deployed
    Deployed {
        machine: String,
        charm: String,
        #[arg(short, long, default_value = "lxc", value_parser = parse_kind)]
        kind: PlacementKind,
    },
    /// List machines and what they hold
    Machines {
        /// Only show machines whose summary contains this text
        #[arg(short, long)]
        filter: Option<String>,
    },
}

fn parse_kind(s: &str) -> Result<PlacementKind, String> {
    s.parse()
}

fn init_tracing(json: bool) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info,stackplan=debug"))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json)?;

    match cli.command {
        Commands::Init { inventory, force } => {
            commands::init::init(&cli.config, inventory.as_deref(), force)
        }
        Commands::Status { format } => commands::status::status(&cli.config, &format),
        Commands::Defaults { commit } => commands::plan::defaults(&cli.config, commit),
        Commands::Single { commit, cpus } => commands::plan::single(&cli.config, commit, cpus),
        Commands::Autoplace => commands::plan::autoplace(&cli.config),
        Commands::Assign {
            machine,
            charm,
            kind,
        } => commands::edit::assign(&cli.config, &machine, &charm, kind),
        Commands::Remove { machine, charm } => commands::edit::remove(&cli.config, &machine, &charm),
        Commands::Clear { machine, all } => {
            commands::edit::clear(&cli.config, machine.as_deref(), all)
        }
        Commands::Deployed {
            machine,
            charm,
            kind,
        } => commands::edit::deployed(&cli.config, &machine, &charm, kind),
        Commands::Machines { filter } => {
            commands::machines::machines(&cli.config, filter.as_deref())
        }
    }
}
