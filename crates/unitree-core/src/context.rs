//! ---
//! utr_section: "04-lifecycle-engine"
//! utr_subsection: "module"
//! utr_type: "source"
//! utr_scope: "code"
//! utr_description: "Unit lifecycle engine and collaborator seams."
//! utr_version: "v0.0.0-prealpha"
//! utr_owner: "tbd"
//! ---
//! Contexts handed to members, including explicit calls into the parent type.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::Fault;
use crate::hook::HookOutput;
use crate::loader::ResourceLoader;
use crate::members::{LifecycleMembers, PhaseFn, UnitType};
use crate::resource::{BoundResource, UnitOptions};
use crate::services::UnitServices;
use crate::unit::{Unit, UnitState};

/// Snapshot of the unit a hook runs for.
///
/// Owned and cheap to clone, so deferred hook work can move it into its future.
#[derive(Clone)]
pub struct HookContext {
    owner: Arc<UnitType>,
    unit_type: Arc<UnitType>,
    unit: String,
    options: Arc<UnitOptions>,
    state: UnitState,
    services: UnitServices,
}

impl HookContext {
    pub(crate) fn new(
        owner: Arc<UnitType>,
        unit_type: Arc<UnitType>,
        unit: String,
        options: Arc<UnitOptions>,
        state: UnitState,
        services: UnitServices,
    ) -> Self {
        Self {
            owner,
            unit_type,
            unit,
            options,
            state,
            services,
        }
    }

    fn rebind(&self, owner: Arc<UnitType>) -> Self {
        Self {
            owner,
            ..self.clone()
        }
    }

    /// Key of the unit within its parent, or its type name for roots.
    pub fn unit_key(&self) -> &str {
        &self.unit
    }

    /// Most-derived type of the unit.
    pub fn unit_type(&self) -> &Arc<UnitType> {
        &self.unit_type
    }

    /// Type that defines the member currently running.
    pub fn owner(&self) -> &Arc<UnitType> {
        &self.owner
    }

    /// Merged options of the unit.
    pub fn options(&self) -> &UnitOptions {
        &self.options
    }

    /// A single named option.
    pub fn option(&self, name: &str) -> Option<&Value> {
        self.options.get(name)
    }

    /// Bound resource of the unit, if any.
    pub fn resource(&self) -> Option<&BoundResource> {
        self.options.bound_resource.as_ref()
    }

    /// Unit flags at the moment the hook was invoked.
    pub fn state(&self) -> UnitState {
        self.state
    }

    /// Resource loader for templates, styles and remote data.
    pub fn loader(&self) -> Arc<dyn ResourceLoader> {
        self.services.loader().clone()
    }

    /// Collaborators of the unit.
    pub fn services(&self) -> &UnitServices {
        &self.services
    }

    /// Run the parent type's load member.
    pub fn parent_load(&self, options: Value) -> HookOutput {
        match self.owner.resolve_parent(|m| m.load.clone()) {
            Some(parent) => (parent.member)(self.rebind(parent.owner), options),
            None => HookOutput::ready(),
        }
    }

    /// Run the parent type's show member.
    pub fn parent_show(&self) -> HookOutput {
        self.parent_phase(|m| m.show.clone())
    }

    /// Run the parent type's hide member.
    pub fn parent_hide(&self) -> HookOutput {
        self.parent_phase(|m| m.hide.clone())
    }

    /// Run the parent type's enable member.
    pub fn parent_enable(&self) -> HookOutput {
        self.parent_phase(|m| m.enable.clone())
    }

    /// Run the parent type's disable member.
    pub fn parent_disable(&self) -> HookOutput {
        self.parent_phase(|m| m.disable.clone())
    }

    /// Run the parent type's error member with `fault`.
    pub fn parent_error(&self, fault: Fault) -> HookOutput {
        match self.owner.resolve_parent(|m| m.error.clone()) {
            Some(parent) => (parent.member)(self.rebind(parent.owner), fault),
            None => HookOutput::ready(),
        }
    }

    /// Shape data with the parent type's `transform_data`, or return it unchanged.
    pub fn parent_transform_data(&self, data: Value) -> Value {
        match self.owner.resolve_parent(|m| m.transform_data.clone()) {
            Some(parent) => (parent.member)(&self.rebind(parent.owner), data),
            None => data,
        }
    }

    /// Shape data with the unit's most-derived `transform_data`.
    pub fn transform_data(&self, data: Value) -> Value {
        match self.unit_type.resolve(|m| m.transform_data.clone()) {
            Some(found) => (found.member)(&self.rebind(found.owner), data),
            None => data,
        }
    }

    fn parent_phase(&self, pick: fn(&LifecycleMembers) -> Option<PhaseFn>) -> HookOutput {
        match self.owner.resolve_parent(pick) {
            Some(parent) => (parent.member)(self.rebind(parent.owner)),
            None => HookOutput::ready(),
        }
    }
}

impl fmt::Debug for HookContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookContext")
            .field("unit", &self.unit)
            .field("unit_type", &self.unit_type.name())
            .field("owner", &self.owner.name())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Handle to the parent type's `initialize`, passed to initialisation overrides.
#[derive(Clone)]
pub struct Super {
    owner: Arc<UnitType>,
}

impl Super {
    pub(crate) fn new(owner: Arc<UnitType>) -> Self {
        Self { owner }
    }

    /// Type whose `initialize` received this handle.
    pub fn owner(&self) -> &Arc<UnitType> {
        &self.owner
    }

    /// Run the parent type's initialisation on `unit`.
    pub fn initialize(&self, unit: &mut Unit, options: &UnitOptions) {
        if let Some(parent) = self.owner.resolve_parent(|m| m.initialize.clone()) {
            (parent.member)(unit, options, Super::new(parent.owner));
        }
    }
}

impl fmt::Debug for Super {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Super")
            .field("owner", &self.owner.name())
            .finish()
    }
}

/// Passed to constructor overrides.
#[derive(Clone)]
pub struct ConstructContext {
    target: Arc<UnitType>,
    owner: Arc<UnitType>,
    services: UnitServices,
}

impl ConstructContext {
    pub(crate) fn new(target: Arc<UnitType>, owner: Arc<UnitType>, services: UnitServices) -> Self {
        Self {
            target,
            owner,
            services,
        }
    }

    /// Type being instantiated.
    pub fn target(&self) -> &Arc<UnitType> {
        &self.target
    }

    /// Services the unit is constructed with.
    pub fn services(&self) -> &UnitServices {
        &self.services
    }

    /// Run the parent type's constructor for the same target type.
    pub fn construct_parent(&self, options: UnitOptions) -> Unit {
        match self.owner.resolve_parent(|m| m.construct.clone()) {
            Some(parent) => (parent.member)(
                ConstructContext::new(self.target.clone(), parent.owner, self.services.clone()),
                options,
            ),
            None => Unit::allocate_and_initialize(
                self.target.clone(),
                self.services.clone(),
                options,
            ),
        }
    }
}

impl fmt::Debug for ConstructContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructContext")
            .field("target", &self.target.name())
            .field("owner", &self.owner.name())
            .finish_non_exhaustive()
    }
}
