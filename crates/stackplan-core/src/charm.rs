//! Service descriptors and the charm catalog.
//!
//! Each deployable OpenStack service is described by a plain
//! [`ServiceDescriptor`] record. The [`Catalog`] is loaded once (either the
//! built-in table or an operator-supplied TOML file) and never changes
//! afterwards.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constraints::{ConstraintValue, Constraints};
use crate::error::{CoreError, CoreResult};

fn one() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

fn default_priority() -> u32 {
    99
}

/// Static description of one deployable service type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    /// Unique charm name, e.g. `nova-compute`.
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    /// Hardware constraints each unit's machine must satisfy.
    #[serde(default)]
    pub constraints: Constraints,
    #[serde(default = "one")]
    pub required_units: u32,
    /// Units must not share a machine with unrelated services.
    #[serde(default)]
    pub isolate: bool,
    /// Attaches to another service's unit instead of a machine.
    #[serde(default)]
    pub subordinate: bool,
    #[serde(default)]
    pub allow_multi_units: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub is_core: bool,
    #[serde(default)]
    pub contrib: bool,
    #[serde(default = "default_true")]
    pub menuable: bool,
    /// Services that must be present for this one to work.
    #[serde(default)]
    pub depends: Vec<String>,
    /// Services that cannot be deployed alongside this one.
    #[serde(default)]
    pub conflicts: Vec<String>,
    /// Ordering hint for the deployment driver. Lower deploys first.
    #[serde(default = "default_priority")]
    pub deploy_priority: u32,
}

impl ServiceDescriptor {
    pub fn new(name: &str, display_name: &str) -> Self {
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            constraints: Constraints::new(),
            required_units: 1,
            isolate: false,
            subordinate: false,
            allow_multi_units: false,
            disabled: false,
            is_core: false,
            contrib: false,
            menuable: true,
            depends: Vec::new(),
            conflicts: Vec::new(),
            deploy_priority: default_priority(),
        }
    }

    pub fn core(mut self) -> Self {
        self.is_core = true;
        self
    }

    pub fn isolated(mut self) -> Self {
        self.isolate = true;
        self
    }

    pub fn multi_unit(mut self) -> Self {
        self.allow_multi_units = true;
        self
    }

    pub fn subordinate(mut self) -> Self {
        self.subordinate = true;
        self.menuable = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn units(mut self, n: u32) -> Self {
        self.required_units = n;
        self
    }

    pub fn priority(mut self, p: u32) -> Self {
        self.deploy_priority = p;
        self
    }

    pub fn constraint(mut self, key: &str, value: impl Into<ConstraintValue>) -> Self {
        self.constraints.insert(key.to_string(), value.into());
        self
    }

    pub fn depends_on(mut self, names: &[&str]) -> Self {
        self.depends.extend(names.iter().map(|n| n.to_string()));
        self
    }

    pub fn conflicts_with(mut self, names: &[&str]) -> Self {
        self.conflicts.extend(names.iter().map(|n| n.to_string()));
        self
    }

    /// Human-facing name, falling back to the charm name.
    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }

    pub fn depends_on_name(&self, name: &str) -> bool {
        self.depends.iter().any(|d| d == name)
    }

    pub fn conflicts_with_name(&self, name: &str) -> bool {
        self.conflicts.iter().any(|c| c == name)
    }
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(rename = "charm", default)]
    charms: Vec<ServiceDescriptor>,
}

/// Immutable registry of service descriptors keyed by name.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    descriptors: Vec<Arc<ServiceDescriptor>>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog, rejecting duplicate names. Insertion order is kept.
    pub fn new(descriptors: Vec<ServiceDescriptor>) -> CoreResult<Self> {
        let mut catalog = Catalog::default();
        for descriptor in descriptors {
            if catalog.index.contains_key(&descriptor.name) {
                return Err(CoreError::DuplicateCharm(descriptor.name));
            }
            catalog
                .index
                .insert(descriptor.name.clone(), catalog.descriptors.len());
            catalog.descriptors.push(Arc::new(descriptor));
        }
        debug!(count = catalog.descriptors.len(), "charm catalog loaded");
        Ok(catalog)
    }

    /// Parse a catalog from `[[charm]]` TOML tables.
    pub fn from_toml_str(content: &str) -> CoreResult<Self> {
        let file: CatalogFile =
            toml::from_str(content).map_err(|e| CoreError::Catalog(e.to_string()))?;
        Self::new(file.charms)
    }

    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Look up an available (non-disabled, non-contrib) descriptor.
    pub fn get(&self, name: &str) -> Option<&Arc<ServiceDescriptor>> {
        self.index
            .get(name)
            .map(|&i| &self.descriptors[i])
            .filter(|d| is_available(d))
    }

    /// Every available descriptor, in catalog order.
    pub fn all_descriptors(&self) -> Vec<Arc<ServiceDescriptor>> {
        self.descriptors
            .iter()
            .filter(|d| is_available(d))
            .cloned()
            .collect()
    }

    /// Available descriptors that occupy machine slots (no subordinates).
    pub fn placeable_descriptors(&self) -> Vec<Arc<ServiceDescriptor>> {
        self.descriptors
            .iter()
            .filter(|d| is_available(d) && !d.subordinate)
            .cloned()
            .collect()
    }

    /// Available descriptors ordered by deploy priority, then name.
    pub fn sorted_by_priority(&self) -> Vec<Arc<ServiceDescriptor>> {
        let mut all = self.all_descriptors();
        all.sort_by(|a, b| {
            a.deploy_priority
                .cmp(&b.deploy_priority)
                .then_with(|| a.name.cmp(&b.name))
        });
        all
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// The stock OpenStack service set.
    pub fn builtin() -> Self {
        let descriptors = vec![
            ServiceDescriptor::new("mysql", "MySQL")
                .core()
                .priority(1)
                .constraint("mem", "2G"),
            ServiceDescriptor::new("rabbitmq-server", "RabbitMQ Server")
                .core()
                .priority(1),
            ServiceDescriptor::new("keystone", "Keystone")
                .core()
                .priority(2)
                .depends_on(&["mysql"]),
            ServiceDescriptor::new("glance", "Glance")
                .core()
                .priority(3)
                .depends_on(&["mysql", "keystone"]),
            ServiceDescriptor::new("nova-cloud-controller", "Nova Cloud Controller")
                .core()
                .priority(3)
                .depends_on(&["mysql", "rabbitmq-server", "keystone", "glance"]),
            ServiceDescriptor::new("neutron-api", "Neutron API")
                .core()
                .priority(3)
                .depends_on(&["mysql", "rabbitmq-server", "keystone"]),
            ServiceDescriptor::new("openstack-dashboard", "OpenStack Dashboard")
                .core()
                .priority(4)
                .depends_on(&["keystone"]),
            ServiceDescriptor::new("nova-compute", "Nova Compute Node")
                .core()
                .isolated()
                .multi_unit()
                .priority(5)
                .constraint("mem", "4G")
                .constraint("root-disk", "40G")
                .depends_on(&["nova-cloud-controller", "glance", "rabbitmq-server"]),
            ServiceDescriptor::new("neutron-gateway", "Neutron Node")
                .core()
                .isolated()
                .priority(5)
                .constraint("mem", "2G")
                .depends_on(&["neutron-api", "rabbitmq-server"]),
            ServiceDescriptor::new("cinder", "Cinder")
                .priority(6)
                .depends_on(&["mysql", "rabbitmq-server", "keystone"]),
            ServiceDescriptor::new("heat", "Heat")
                .priority(6)
                .depends_on(&["mysql", "rabbitmq-server", "keystone"]),
            ServiceDescriptor::new("ceph", "Ceph")
                .isolated()
                .multi_unit()
                .units(3)
                .priority(6)
                .constraint("mem", "2G")
                .constraint("root-disk", "40G"),
            ServiceDescriptor::new("ceph-osd", "Ceph OSD")
                .isolated()
                .multi_unit()
                .priority(7)
                .depends_on(&["ceph"]),
            ServiceDescriptor::new("ceph-radosgw", "Ceph RADOS Gateway")
                .priority(7)
                .depends_on(&["ceph", "keystone"])
                .conflicts_with(&["swift-proxy"]),
            ServiceDescriptor::new("swift-storage", "Swift Storage")
                .isolated()
                .multi_unit()
                .units(3)
                .priority(6)
                .constraint("root-disk", "40G"),
            ServiceDescriptor::new("swift-proxy", "Swift Proxy")
                .priority(7)
                .depends_on(&["swift-storage", "keystone"])
                .conflicts_with(&["ceph-radosgw"]),
            ServiceDescriptor::new("juju-gui", "Juju GUI").priority(8),
            ServiceDescriptor::new("ntp", "NTP").subordinate().priority(8),
            ServiceDescriptor::new("ceilometer", "Ceilometer")
                .disabled()
                .priority(8)
                .depends_on(&["mysql", "rabbitmq-server", "keystone"]),
        ];
        let mut catalog = Catalog::default();
        for descriptor in descriptors {
            catalog
                .index
                .insert(descriptor.name.clone(), catalog.descriptors.len());
            catalog.descriptors.push(Arc::new(descriptor));
        }
        catalog
    }
}

fn is_available(d: &ServiceDescriptor) -> bool {
    !d.disabled && !d.contrib
}
