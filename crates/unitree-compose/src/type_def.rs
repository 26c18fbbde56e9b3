//! ---
//! utr_section: "03-composition"
//! utr_subsection: "module"
//! utr_type: "source"
//! utr_scope: "code"
//! utr_description: "Unit type composition and member resolution."
//! utr_version: "v0.0.0-prealpha"
//! utr_owner: "tbd"
//! ---
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::debug;

use crate::overrides::Overrides;

/// A node in a single-inheritance type chain.
pub struct TypeDef<M> {
    name: String,
    parent: Option<Arc<TypeDef<M>>>,
    members: M,
    statics: IndexMap<String, Value>,
    default_options: Map<String, Value>,
}

/// A member found by [`TypeDef::resolve`] together with the type that defines it.
pub struct Resolved<M, T> {
    /// Type whose own member table supplied `member`.
    pub owner: Arc<TypeDef<M>>,
    /// The member itself.
    pub member: T,
}

impl<M> TypeDef<M> {
    /// Create a root type with no parent.
    pub fn root(name: impl Into<String>, members: M) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            parent: None,
            members,
            statics: IndexMap::new(),
            default_options: Map::new(),
        })
    }

    /// Derive a new type from `self`.
    ///
    /// Statics and option defaults are copied from the parent first and then
    /// overlaid with the supplied ones. Members are not copied: lookups fall
    /// through to the parent at resolution time.
    pub fn extend(self: &Arc<Self>, overrides: impl Into<Overrides<M>>) -> Arc<Self> {
        let overrides = overrides.into();
        let name = overrides
            .name
            .unwrap_or_else(|| format!("{}::derived", self.name));

        let mut statics = self.statics.clone();
        statics.extend(overrides.statics);
        let mut default_options = self.default_options.clone();
        default_options.extend(overrides.default_options);

        debug!(parent = %self.name, derived = %name, statics = statics.len(), "derived unit type");
        Arc::new(Self {
            name,
            parent: Some(self.clone()),
            members: overrides.members,
            statics,
            default_options,
        })
    }

    /// Derive a subtype that overrides nothing.
    pub fn derive(self: &Arc<Self>, name: impl Into<String>) -> Arc<Self>
    where
        M: Default,
    {
        self.extend(Overrides::<M>::named(name))
    }

    /// Type name used in logs and diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Immediate parent type, i.e. the member set an override can call into.
    pub fn parent(&self) -> Option<&Arc<TypeDef<M>>> {
        self.parent.as_ref()
    }

    /// Members defined by this type only.
    pub fn members(&self) -> &M {
        &self.members
    }

    /// Merged type-level members.
    pub fn statics(&self) -> &IndexMap<String, Value> {
        &self.statics
    }

    /// Look up a single type-level member.
    pub fn static_member(&self, name: &str) -> Option<&Value> {
        self.statics.get(name)
    }

    /// Merged option defaults for instances of this type.
    pub fn default_options(&self) -> &Map<String, Value> {
        &self.default_options
    }

    /// Number of ancestors above this type.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut cursor = self.parent.as_ref();
        while let Some(parent) = cursor {
            depth += 1;
            cursor = parent.parent.as_ref();
        }
        depth
    }

    /// Iterate from `self` up to the root.
    pub fn ancestors(self: &Arc<Self>) -> Ancestors<M> {
        Ancestors {
            next: Some(self.clone()),
        }
    }

    /// Find the nearest type, starting at `self`, whose own table defines the member.
    pub fn resolve<T>(self: &Arc<Self>, pick: impl Fn(&M) -> Option<T>) -> Option<Resolved<M, T>> {
        self.ancestors().find_map(|owner| {
            let member = pick(&owner.members)?;
            Some(Resolved { owner, member })
        })
    }

    /// Resolve starting at the parent, skipping `self`'s own table.
    pub fn resolve_parent<T>(&self, pick: impl Fn(&M) -> Option<T>) -> Option<Resolved<M, T>> {
        self.parent.as_ref()?.resolve(pick)
    }

    /// True when `ancestor` is `self` or appears in `self`'s parent chain.
    pub fn is_subtype_of(&self, ancestor: &Arc<TypeDef<M>>) -> bool {
        if std::ptr::eq(self, Arc::as_ptr(ancestor)) {
            return true;
        }
        let mut cursor = self.parent.as_ref();
        while let Some(parent) = cursor {
            if Arc::ptr_eq(parent, ancestor) {
                return true;
            }
            cursor = parent.parent.as_ref();
        }
        false
    }
}

impl<M> fmt::Debug for TypeDef<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDef")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name.as_str()))
            .field("statics", &self.statics)
            .field("default_options", &self.default_options)
            .finish_non_exhaustive()
    }
}

/// Iterator over a type and its ancestors, most-derived first.
pub struct Ancestors<M> {
    next: Option<Arc<TypeDef<M>>>,
}

impl<M> Iterator for Ancestors<M> {
    type Item = Arc<TypeDef<M>>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.next = current.parent.clone();
        Some(current)
    }
}
