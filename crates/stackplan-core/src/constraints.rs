//! Hardware constraints and the constraint matcher.
//!
//! Constraint keys are mapped onto a fixed set of machine attributes.
//! Numeric constraints are minimums; `arch` must match exactly. A
//! wildcard (`*`) on either side always passes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::machine::{HwAttr, Machine};
use crate::size::human_to_mb;

/// Constraint key → required value.
pub type Constraints = BTreeMap<String, ConstraintValue>;

/// A constraint value as written in a catalog or saved document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConstraintValue {
    Number(u64),
    Text(String),
}

impl ConstraintValue {
    pub fn is_wildcard(&self) -> bool {
        matches!(self, ConstraintValue::Text(s) if s.trim() == "*")
    }

    /// Normalize to megabytes (or a plain count for cpu cores).
    pub fn as_amount(&self) -> Option<u64> {
        match self {
            ConstraintValue::Number(n) => Some(*n),
            ConstraintValue::Text(s) => human_to_mb(s).ok(),
        }
    }
}

impl fmt::Display for ConstraintValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintValue::Number(n) => write!(f, "{n}"),
            ConstraintValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for ConstraintValue {
    fn from(n: u64) -> Self {
        ConstraintValue::Number(n)
    }
}

impl From<&str> for ConstraintValue {
    fn from(s: &str) -> Self {
        ConstraintValue::Text(s.to_string())
    }
}

/// Machine attribute a constraint key resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HwKey {
    Arch,
    CpuCores,
    Mem,
    Storage,
}

impl HwKey {
    /// Resolve a constraint key, accepting the common aliases.
    pub fn parse(key: &str) -> Option<Self> {
        match key {
            "arch" => Some(HwKey::Arch),
            "cpu_cores" | "cpu-cores" => Some(HwKey::CpuCores),
            "mem" | "memory" => Some(HwKey::Mem),
            "root-disk" | "root_disk" | "storage" => Some(HwKey::Storage),
            _ => None,
        }
    }
}

/// Check a machine against a constraint set.
///
/// Returns whether every key passed, and the keys that failed.
pub fn satisfies(machine: &Machine, constraints: &Constraints) -> (bool, Vec<String>) {
    let failed: Vec<String> = constraints
        .iter()
        .filter(|(key, value)| !key_satisfied(machine, key, value))
        .map(|(key, _)| key.clone())
        .collect();
    (failed.is_empty(), failed)
}

fn key_satisfied(machine: &Machine, key: &str, wanted: &ConstraintValue) -> bool {
    let Some(hw_key) = HwKey::parse(key) else {
        warn!(%key, machine = %machine.instance_id, "unknown constraint key");
        return false;
    };
    if wanted.is_wildcard() {
        return true;
    }
    match machine.attribute(hw_key) {
        HwAttr::Any => true,
        HwAttr::Text(have) => have == wanted.to_string(),
        HwAttr::Amount(have) => match wanted.as_amount() {
            Some(want) => have >= want,
            None => {
                warn!(%key, value = %wanted, "constraint value is not a size");
                false
            }
        },
    }
}
