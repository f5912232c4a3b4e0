//! Placement kinds — how a service occupies a machine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How a service unit occupies its machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PlacementKind {
    /// Directly on the machine.
    #[serde(rename = "BareMetal", alias = "baremetal", alias = "bare_metal")]
    BareMetal,
    /// Inside a virtual machine on the machine.
    #[serde(rename = "KVM", alias = "kvm")]
    Kvm,
    /// Inside a container on the machine.
    #[serde(rename = "LXC", alias = "lxc")]
    Lxc,
    /// No explicit placement; the deployment driver decides.
    #[serde(rename = "Default", alias = "default")]
    Default,
}

impl PlacementKind {
    pub const ALL: [PlacementKind; 4] = [
        PlacementKind::BareMetal,
        PlacementKind::Kvm,
        PlacementKind::Lxc,
        PlacementKind::Default,
    ];

    /// Name used in saved placement documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlacementKind::BareMetal => "BareMetal",
            PlacementKind::Kvm => "KVM",
            PlacementKind::Lxc => "LXC",
            PlacementKind::Default => "Default",
        }
    }
}

impl fmt::Display for PlacementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlacementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "baremetal" => Ok(PlacementKind::BareMetal),
            "kvm" => Ok(PlacementKind::Kvm),
            "lxc" => Ok(PlacementKind::Lxc),
            "default" => Ok(PlacementKind::Default),
            _ => Err(format!("unknown placement kind: {s}")),
        }
    }
}
