//! ---
//! utr_section: "03-composition"
//! utr_subsection: "module"
//! utr_type: "source"
//! utr_scope: "code"
//! utr_description: "Unit type composition and member resolution."
//! utr_version: "v0.0.0-prealpha"
//! utr_owner: "tbd"
//! ---
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Members, type-level statics and option defaults layered onto a parent type.
#[derive(Debug, Clone, Default)]
pub struct Overrides<M> {
    /// Name given to the derived type. Falls back to `<parent>::derived`.
    pub name: Option<String>,
    /// Instance members defined by the derived type.
    pub members: M,
    /// Type-level members; these win over the parent's statics.
    pub statics: IndexMap<String, Value>,
    /// Option defaults merged shallowly over the parent's defaults.
    pub default_options: Map<String, Value>,
}

impl<M: Default> Overrides<M> {
    /// Start an override set for a type with the given name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            members: M::default(),
            statics: IndexMap::new(),
            default_options: Map::new(),
        }
    }
}

impl<M> Overrides<M> {
    /// Replace the member table wholesale.
    pub fn with_members(mut self, members: M) -> Self {
        self.members = members;
        self
    }

    /// Edit the member table in place.
    pub fn members_mut(&mut self) -> &mut M {
        &mut self.members
    }

    /// Add or replace a type-level member.
    pub fn with_static(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.statics.insert(name.into(), value.into());
        self
    }

    /// Add or replace an option default.
    pub fn with_default_option(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.default_options.insert(name.into(), value.into());
        self
    }
}
