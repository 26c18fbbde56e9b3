//! ---
//! utr_section: "04-lifecycle-engine"
//! utr_subsection: "module"
//! utr_type: "source"
//! utr_scope: "code"
//! utr_description: "Unit lifecycle engine and collaborator seams."
//! utr_version: "v0.0.0-prealpha"
//! utr_owner: "tbd"
//! ---
use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Named markers a unit toggles on its bound resource.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumIter,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResourceFlag {
    /// The unit is disabled.
    Disabled,
    /// The unit is in the error state.
    Erroring,
    /// The unit finished loading.
    Loaded,
    /// The unit is shown.
    Active,
}

/// Shared handle to an external resource (for instance a UI element) modelled
/// as a set of boolean flags. Clones observe the same flags.
#[derive(Debug, Clone, Default)]
pub struct BoundResource {
    flags: Arc<Mutex<BTreeSet<ResourceFlag>>>,
}

impl BoundResource {
    /// A resource with no flags raised.
    pub fn new() -> Self {
        Self::default()
    }

    /// A resource that starts out with the given flags raised.
    pub fn with_flags(flags: impl IntoIterator<Item = ResourceFlag>) -> Self {
        Self {
            flags: Arc::new(Mutex::new(flags.into_iter().collect())),
        }
    }

    /// Whether `flag` is raised.
    pub fn has(&self, flag: ResourceFlag) -> bool {
        self.flags.lock().contains(&flag)
    }

    /// Raise or clear `flag`.
    pub fn set(&self, flag: ResourceFlag, raised: bool) {
        let mut flags = self.flags.lock();
        if raised {
            flags.insert(flag);
        } else {
            flags.remove(&flag);
        }
    }

    /// Raise `flag`.
    pub fn mark(&self, flag: ResourceFlag) {
        self.set(flag, true);
    }

    /// Clear `flag`.
    pub fn unmark(&self, flag: ResourceFlag) {
        self.set(flag, false);
    }

    /// Currently raised flags in a stable order.
    pub fn flags(&self) -> Vec<ResourceFlag> {
        self.flags.lock().iter().copied().collect()
    }

    /// Whether two handles point at the same resource.
    pub fn same_resource(&self, other: &BoundResource) -> bool {
        Arc::ptr_eq(&self.flags, &other.flags)
    }
}

/// Configuration accepted by a unit at construction.
///
/// `bound_resource` is the only option the engine itself understands; `extra`
/// carries options recognised by derived types and is merged shallowly over
/// the type's option defaults.
#[derive(Debug, Clone, Default)]
pub struct UnitOptions {
    /// Resource the unit marks as it changes state.
    pub bound_resource: Option<BoundResource>,
    /// Every other option, by name.
    pub extra: Map<String, Value>,
}

impl UnitOptions {
    /// Empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `resource`.
    pub fn with_resource(mut self, resource: BoundResource) -> Self {
        self.bound_resource = Some(resource);
        self
    }

    /// Set a named option.
    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }

    /// A named option.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }

    /// Copy of `self` with `extra` laid over `defaults`.
    pub(crate) fn merged_over(&self, defaults: &Map<String, Value>) -> Self {
        let mut extra = defaults.clone();
        extra.extend(self.extra.clone());
        Self {
            bound_resource: self.bound_resource.clone(),
            extra,
        }
    }
}
