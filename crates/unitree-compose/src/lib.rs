//! ---
//! utr_section: "03-composition"
//! utr_subsection: "module"
//! utr_type: "source"
//! utr_scope: "code"
//! utr_description: "Unit type composition and member resolution."
//! utr_version: "v0.0.0-prealpha"
//! utr_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Builds derived types from a base type plus a set of overriding members.
//!
//! A [`TypeDef`] owns only the members it defines itself and keeps an `Arc`
//! to its parent. Lookups walk the chain from the most-derived type upwards
//! and report which type supplied the member, which is what makes explicit
//! parent calls possible. The member table `M` is supplied by the consumer;
//! every field is expected to be an `Option` so "not overridden" falls
//! through to the parent.

pub mod overrides;
pub mod type_def;

pub use overrides::Overrides;
pub use type_def::{Ancestors, Resolved, TypeDef};
