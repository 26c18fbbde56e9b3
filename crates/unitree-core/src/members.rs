//! ---
//! utr_section: "04-lifecycle-engine"
//! utr_subsection: "module"
//! utr_type: "source"
//! utr_scope: "code"
//! utr_description: "Unit lifecycle engine and collaborator seams."
//! utr_version: "v0.0.0-prealpha"
//! utr_owner: "tbd"
//! ---
//! The lifecycle member table and the builder used to override it.

use std::sync::Arc;

use once_cell::sync::Lazy;
use serde_json::Value;
use unitree_compose::{Overrides, TypeDef};

use crate::context::{ConstructContext, HookContext, Super};
use crate::error::Fault;
use crate::hook::HookOutput;
use crate::resource::UnitOptions;
use crate::unit::Unit;

/// Constructor override.
pub type ConstructFn = Arc<dyn Fn(ConstructContext, UnitOptions) -> Unit + Send + Sync>;
/// Initialisation override.
pub type InitializeFn = Arc<dyn Fn(&mut Unit, &UnitOptions, Super) + Send + Sync>;
/// Load hook.
pub type LoadFn = Arc<dyn Fn(HookContext, Value) -> HookOutput + Send + Sync>;
/// Show, hide, enable or disable hook.
pub type PhaseFn = Arc<dyn Fn(HookContext) -> HookOutput + Send + Sync>;
/// Error hook.
pub type ErrorFn = Arc<dyn Fn(HookContext, Fault) -> HookOutput + Send + Sync>;
/// Data-shaping member.
pub type TransformFn = Arc<dyn Fn(&HookContext, Value) -> Value + Send + Sync>;

/// A unit type: the lifecycle member table arranged in a single-inheritance chain.
pub type UnitType = TypeDef<LifecycleMembers>;

/// Members a unit type may define. `None` means "inherit from the parent type".
#[derive(Clone, Default)]
pub struct LifecycleMembers {
    /// Builds the instance.
    pub construct: Option<ConstructFn>,
    /// Synchronous set-up run by the constructor.
    pub initialize: Option<InitializeFn>,
    /// `load` hook.
    pub load: Option<LoadFn>,
    /// `show` hook.
    pub show: Option<PhaseFn>,
    /// `hide` hook.
    pub hide: Option<PhaseFn>,
    /// `enable` hook.
    pub enable: Option<PhaseFn>,
    /// `disable` hook.
    pub disable: Option<PhaseFn>,
    /// `error` hook.
    pub error: Option<ErrorFn>,
    /// Shapes fetched data.
    pub transform_data: Option<TransformFn>,
}

impl LifecycleMembers {
    /// Members of the root unit type. Every hook resolves immediately.
    fn base() -> Self {
        let noop: PhaseFn = Arc::new(|_: HookContext| HookOutput::ready());
        Self {
            construct: Some(Arc::new(|ctx: ConstructContext, options: UnitOptions| {
                Unit::allocate_and_initialize(ctx.target().clone(), ctx.services().clone(), options)
            })),
            initialize: Some(Arc::new(|unit: &mut Unit, options: &UnitOptions, _: Super| {
                unit.initialize_base(options)
            })),
            load: Some(Arc::new(|_: HookContext, _: Value| HookOutput::ready())),
            show: Some(noop.clone()),
            hide: Some(noop.clone()),
            enable: Some(noop.clone()),
            disable: Some(noop),
            error: Some(Arc::new(|_: HookContext, _: Fault| HookOutput::ready())),
            transform_data: Some(Arc::new(|_: &HookContext, data: Value| data)),
        }
    }
}

static BASE_TYPE: Lazy<Arc<UnitType>> = Lazy::new(|| TypeDef::root("Unit", LifecycleMembers::base()));

/// The root unit type every other unit type derives from.
pub fn base_type() -> Arc<UnitType> {
    BASE_TYPE.clone()
}

/// Builder for the members, statics and option defaults of a derived unit type.
///
/// ```ignore
/// let panel = base_type().extend(
///     Extension::named("Panel")
///         .on_load(|_ctx, options| {
///             tracing::info!(?options, "panel loading");
///         })
///         .with_static("tag", "section"),
/// );
/// ```
#[derive(Default)]
pub struct Extension {
    overrides: Overrides<LifecycleMembers>,
}

impl Extension {
    /// Start an extension for a type called `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            overrides: Overrides::named(name),
        }
    }

    /// Replace the constructor. Use [`ConstructContext::construct_parent`] to obtain the instance.
    pub fn construct_with<F>(mut self, f: F) -> Self
    where
        F: Fn(ConstructContext, UnitOptions) -> Unit + Send + Sync + 'static,
    {
        self.overrides.members.construct = Some(Arc::new(f));
        self
    }

    /// Replace initialisation. Call [`Super::initialize`] to keep the engine's own set-up.
    pub fn initialize_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Unit, &UnitOptions, Super) + Send + Sync + 'static,
    {
        self.overrides.members.initialize = Some(Arc::new(f));
        self
    }

    /// Override `load`.
    pub fn on_load<F, R>(mut self, f: F) -> Self
    where
        F: Fn(HookContext, Value) -> R + Send + Sync + 'static,
        R: Into<HookOutput>,
    {
        self.overrides.members.load = Some(Arc::new(move |ctx, options| -> HookOutput {
            f(ctx, options).into()
        }));
        self
    }

    /// Override `show`.
    pub fn on_show<F, R>(mut self, f: F) -> Self
    where
        F: Fn(HookContext) -> R + Send + Sync + 'static,
        R: Into<HookOutput>,
    {
        self.overrides.members.show = Some(phase(f));
        self
    }

    /// Override `hide`.
    pub fn on_hide<F, R>(mut self, f: F) -> Self
    where
        F: Fn(HookContext) -> R + Send + Sync + 'static,
        R: Into<HookOutput>,
    {
        self.overrides.members.hide = Some(phase(f));
        self
    }

    /// Override `enable`.
    pub fn on_enable<F, R>(mut self, f: F) -> Self
    where
        F: Fn(HookContext) -> R + Send + Sync + 'static,
        R: Into<HookOutput>,
    {
        self.overrides.members.enable = Some(phase(f));
        self
    }

    /// Override `disable`.
    pub fn on_disable<F, R>(mut self, f: F) -> Self
    where
        F: Fn(HookContext) -> R + Send + Sync + 'static,
        R: Into<HookOutput>,
    {
        self.overrides.members.disable = Some(phase(f));
        self
    }

    /// Override `error`.
    pub fn on_error<F, R>(mut self, f: F) -> Self
    where
        F: Fn(HookContext, Fault) -> R + Send + Sync + 'static,
        R: Into<HookOutput>,
    {
        self.overrides.members.error = Some(Arc::new(move |ctx, fault| -> HookOutput {
            f(ctx, fault).into()
        }));
        self
    }

    /// Override `transform_data`.
    pub fn transform_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&HookContext, Value) -> Value + Send + Sync + 'static,
    {
        self.overrides.members.transform_data = Some(Arc::new(f));
        self
    }

    /// Attach a type-level value, visible to derived types.
    pub fn with_static(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.overrides = self.overrides.with_static(name, value);
        self
    }

    /// Default for an option, merged under constructor options.
    pub fn with_default_option(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.overrides = self.overrides.with_default_option(name, value);
        self
    }
}

fn phase<F, R>(f: F) -> PhaseFn
where
    F: Fn(HookContext) -> R + Send + Sync + 'static,
    R: Into<HookOutput>,
{
    Arc::new(move |ctx| -> HookOutput { f(ctx).into() })
}

impl From<Extension> for Overrides<LifecycleMembers> {
    fn from(extension: Extension) -> Self {
        extension.overrides
    }
}
