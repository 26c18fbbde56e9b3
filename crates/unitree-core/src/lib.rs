//! ---
//! utr_section: "04-lifecycle-engine"
//! utr_subsection: "module"
//! utr_type: "source"
//! utr_scope: "code"
//! utr_description: "Unit lifecycle engine and collaborator seams."
//! utr_version: "v0.0.0-prealpha"
//! utr_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Lifecycle engine for trees of units: construction, cascaded loading,
//! visibility and enablement toggles, the error pathway and teardown.

pub mod context;
/// Lifecycle errors and the shared fault type.
pub mod error;
pub mod hook;
/// The resource loader seam and its built-in implementations.
pub mod loader;
pub mod members;
/// Bound resources and unit options.
pub mod resource;
/// Collaborators injected into units.
pub mod services;
/// The unit and its lifecycle operations.
pub mod unit;

pub use context::{ConstructContext, HookContext, Super};
pub use error::{Fault, Result, UnitError};
pub use hook::{HookKind, HookOutput, HookResult};
pub use loader::{FetchOptions, InMemoryLoader, LoaderCall, ResourceLoader, UnconfiguredLoader};
pub use members::{base_type, Extension, LifecycleMembers, UnitType};
pub use resource::{BoundResource, ResourceFlag, UnitOptions};
pub use services::UnitServices;
pub use unit::{AdoptedFlags, LoadOutcome, Unit, UnitState};
