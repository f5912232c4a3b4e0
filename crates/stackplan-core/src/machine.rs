//! Machine model — placement targets.
//!
//! A *real* machine is backed by provisioner inventory and carries actual
//! hardware figures. A *placeholder* stands in when there is no
//! provisioner (single-host installs) or as the default bucket; its
//! "hardware" is exactly the constraint set it was created with, and any
//! attribute it does not mention is a wildcard.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constraints::{ConstraintValue, Constraints, HwKey, satisfies};
use crate::size::{human_to_mb, mb_to_human};

/// Provisioner instance identifier; unique across the machine pool.
pub type MachineId = String;

/// Provisioner lifecycle status of a real machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineStatus {
    Declared,
    Commissioning,
    FailedTests,
    Missing,
    Ready,
    Reserved,
    Allocated,
    Retired,
}

impl MachineStatus {
    /// Whether services may be placed on a machine in this status.
    pub fn is_placeable(&self) -> bool {
        matches!(
            self,
            MachineStatus::Ready | MachineStatus::Reserved | MachineStatus::Allocated
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            MachineStatus::Declared => "declared",
            MachineStatus::Commissioning => "commissioning",
            MachineStatus::FailedTests => "failed tests",
            MachineStatus::Missing => "missing",
            MachineStatus::Ready => "ready",
            MachineStatus::Reserved => "reserved",
            MachineStatus::Allocated => "allocated",
            MachineStatus::Retired => "retired",
        }
    }
}

/// One machine as reported by the provisioner inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineRecord {
    pub instance_id: MachineId,
    #[serde(default)]
    pub hostname: String,
    pub status: MachineStatus,
    pub arch: String,
    pub cpu_cores: u64,
    /// Memory in MB.
    pub mem: u64,
    /// Root storage in MB.
    pub storage: u64,
    #[serde(default)]
    pub power_type: Option<String>,
}

/// Where a machine's hardware figures come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineSource {
    Real(MachineRecord),
    Placeholder { constraints: Constraints },
}

/// A resolved hardware attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HwAttr {
    /// Wildcard (`*`): satisfies anything.
    Any,
    Text(String),
    Amount(u64),
}

/// A placement target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Machine {
    pub instance_id: MachineId,
    pub hostname: String,
    pub source: MachineSource,
}

impl Machine {
    /// Wrap an inventory record.
    pub fn real(record: MachineRecord) -> Self {
        let hostname = if record.hostname.is_empty() {
            record.instance_id.clone()
        } else {
            record.hostname.clone()
        };
        Self {
            instance_id: record.instance_id.clone(),
            hostname,
            source: MachineSource::Real(record),
        }
    }

    /// Create a placeholder whose hardware is the given constraint set.
    pub fn placeholder(instance_id: &str, name: &str, constraints: Constraints) -> Self {
        Self {
            instance_id: instance_id.to_string(),
            hostname: name.to_string(),
            source: MachineSource::Placeholder { constraints },
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.source, MachineSource::Placeholder { .. })
    }

    /// Constraint snapshot persisted for placeholders.
    pub fn placeholder_constraints(&self) -> Option<&Constraints> {
        match &self.source {
            MachineSource::Placeholder { constraints } => Some(constraints),
            MachineSource::Real(_) => None,
        }
    }

    /// Provisioner status; placeholders have none.
    pub fn status(&self) -> Option<MachineStatus> {
        match &self.source {
            MachineSource::Real(record) => Some(record.status),
            MachineSource::Placeholder { .. } => None,
        }
    }

    /// Placeholders are always placeable; real machines depend on status.
    pub fn is_placeable(&self) -> bool {
        self.status().is_none_or(|s| s.is_placeable())
    }

    pub fn power_type(&self) -> Option<&str> {
        match &self.source {
            MachineSource::Real(record) => record.power_type.as_deref(),
            MachineSource::Placeholder { .. } => None,
        }
    }

    /// Resolve one hardware attribute.
    pub fn attribute(&self, key: HwKey) -> HwAttr {
        match &self.source {
            MachineSource::Real(record) => match key {
                HwKey::Arch => HwAttr::Text(record.arch.clone()),
                HwKey::CpuCores => HwAttr::Amount(record.cpu_cores),
                HwKey::Mem => HwAttr::Amount(record.mem),
                HwKey::Storage => HwAttr::Amount(record.storage),
            },
            MachineSource::Placeholder { constraints } => {
                let value = constraints
                    .iter()
                    .find(|(k, _)| HwKey::parse(k) == Some(key))
                    .map(|(_, v)| v);
                placeholder_attribute(key, value)
            }
        }
    }

    pub fn arch(&self) -> HwAttr {
        self.attribute(HwKey::Arch)
    }

    pub fn cpu_cores(&self) -> HwAttr {
        self.attribute(HwKey::CpuCores)
    }

    pub fn mem(&self) -> HwAttr {
        self.attribute(HwKey::Mem)
    }

    pub fn storage(&self) -> HwAttr {
        self.attribute(HwKey::Storage)
    }

    /// See [`satisfies`].
    pub fn satisfies(&self, constraints: &Constraints) -> (bool, Vec<String>) {
        satisfies(self, constraints)
    }

    /// Lower-cased text searched by list filters.
    pub fn filter_label(&self) -> String {
        let status = self.status().map_or("placeholder", |s| s.label());
        format!(
            "{} {} arch:{} cores:{} mem:{} storage:{} {}",
            self.hostname,
            self.instance_id,
            render_attr(&self.arch(), false),
            render_attr(&self.cpu_cores(), false),
            render_attr(&self.mem(), true),
            render_attr(&self.storage(), true),
            status,
        )
        .to_lowercase()
    }

    /// Case-insensitive substring match against [`Machine::filter_label`].
    pub fn matches_filter(&self, filter: &str) -> bool {
        filter.is_empty() || self.filter_label().contains(&filter.to_lowercase())
    }

    /// One-line description for diagnostics.
    pub fn summary(&self) -> String {
        format!(
            "{} ({}): arch={} cores={} mem={} storage={}",
            self.hostname,
            self.instance_id,
            render_attr(&self.arch(), false),
            render_attr(&self.cpu_cores(), false),
            render_attr(&self.mem(), true),
            render_attr(&self.storage(), true),
        )
    }
}

fn placeholder_attribute(key: HwKey, value: Option<&ConstraintValue>) -> HwAttr {
    let Some(value) = value else {
        return HwAttr::Any;
    };
    if value.is_wildcard() {
        return HwAttr::Any;
    }
    match (key, value) {
        (HwKey::Arch, v) => HwAttr::Text(v.to_string()),
        (_, ConstraintValue::Number(n)) => HwAttr::Amount(*n),
        (_, ConstraintValue::Text(s)) => match human_to_mb(s) {
            Ok(mb) => HwAttr::Amount(mb),
            Err(_) => {
                debug!(value = %s, ?key, "unparseable placeholder attribute, treating as wildcard");
                HwAttr::Any
            }
        },
    }
}

fn render_attr(attr: &HwAttr, as_size: bool) -> String {
    match attr {
        HwAttr::Any => "*".to_string(),
        HwAttr::Text(s) => s.clone(),
        HwAttr::Amount(n) if as_size => mb_to_human(*n),
        HwAttr::Amount(n) => n.to_string(),
    }
}
