//! ---
//! utr_section: "04-lifecycle-engine"
//! utr_subsection: "module"
//! utr_type: "source"
//! utr_scope: "code"
//! utr_description: "Unit lifecycle engine and collaborator seams."
//! utr_version: "v0.0.0-prealpha"
//! utr_owner: "tbd"
//! ---
use std::fmt;
use std::sync::Arc;

use futures::future::{join_all, BoxFuture, FutureExt};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use unitree_logging::{
    log_lifecycle_event, unit_debug, Diagnostic, DiagnosticKind, DiagnosticLevel,
    LifecycleOutcome, LogContext,
};

use crate::context::{ConstructContext, HookContext, Super};
use crate::error::{Fault, Result, UnitError};
use crate::hook::{HookKind, HookOutput, HookResult};
use crate::loader::FetchOptions;
use crate::members::{LifecycleMembers, PhaseFn, UnitType};
use crate::resource::{BoundResource, ResourceFlag, UnitOptions};
use crate::services::UnitServices;

/// The four orthogonal flags of a live unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitState {
    /// The last load completed and no error has happened since.
    pub loaded: bool,
    /// Shown and not hidden since.
    pub shown: bool,
    /// Disabled and not enabled since.
    pub disabled: bool,
    /// Entered the error state at least once.
    pub errored: bool,
}

/// Bound-resource markings found at construction; `destroy()` restores them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdoptedFlags {
    /// The resource carried the disabled marking.
    pub disabled: bool,
    /// The resource carried the erroring marking.
    pub erroring: bool,
}

/// How a call to [`Unit::load`] settled.
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    /// Children and the load hook completed; the unit is now loaded.
    Loaded,
    /// The unit was already loaded; nothing ran.
    AlreadyLoaded,
    /// The load hook failed and the error pathway handled the fault.
    Errored(Fault),
}

impl LoadOutcome {
    /// Whether the unit is loaded once the call returns.
    ///
    /// True for [`LoadOutcome::AlreadyLoaded`] as well, so this does not tell
    /// whether the call itself ran the load.
    pub fn left_unit_loaded(&self) -> bool {
        !matches!(self, LoadOutcome::Errored(_))
    }
}

type PendingHook = (HookKind, BoxFuture<'static, HookResult>);

/// A live, lifecycle-managed instance of a [`UnitType`].
pub struct Unit {
    unit_type: Arc<UnitType>,
    key: String,
    services: UnitServices,
    options: Arc<UnitOptions>,
    loaded: bool,
    shown: bool,
    disabled: bool,
    errored: bool,
    last_error: Option<Fault>,
    children: IndexMap<String, Unit>,
    original: AdoptedFlags,
    // Deferred hook work started while adopting bound-resource state.
    pending: Mutex<Vec<PendingHook>>,
    destroyed: bool,
}

impl Unit {
    /// Construct a unit of `unit_type` with default services.
    pub fn new(unit_type: &Arc<UnitType>, options: UnitOptions) -> Self {
        Self::with_services(unit_type, UnitServices::default(), options)
    }

    /// Construct a unit through the most-derived constructor of `unit_type`.
    pub fn with_services(
        unit_type: &Arc<UnitType>,
        services: UnitServices,
        options: UnitOptions,
    ) -> Self {
        match unit_type.resolve(|m| m.construct.clone()) {
            Some(found) => (found.member)(
                ConstructContext::new(unit_type.clone(), found.owner, services),
                options,
            ),
            None => Self::allocate_and_initialize(unit_type.clone(), services, options),
        }
    }

    pub(crate) fn allocate_and_initialize(
        unit_type: Arc<UnitType>,
        services: UnitServices,
        options: UnitOptions,
    ) -> Self {
        let mut unit = Self {
            key: unit_type.name().to_owned(),
            unit_type,
            services,
            options: Arc::new(UnitOptions::default()),
            loaded: false,
            shown: false,
            disabled: false,
            errored: false,
            last_error: None,
            children: IndexMap::new(),
            original: AdoptedFlags::default(),
            pending: Mutex::new(Vec::new()),
            destroyed: false,
        };
        let initialize = unit.unit_type.resolve(|m| m.initialize.clone());
        match initialize {
            Some(found) => (found.member)(&mut unit, &options, Super::new(found.owner)),
            None => unit.initialize_base(&options),
        }
        unit
    }

    /// The engine's own initialisation: option snapshot, empty children and
    /// adoption of disabled/erroring markings already present on the resource.
    pub(crate) fn initialize_base(&mut self, options: &UnitOptions) {
        self.options = Arc::new(options.merged_over(self.unit_type.default_options()));
        self.children.clear();
        self.original = AdoptedFlags::default();

        let Some(resource) = self.options.bound_resource.clone() else {
            return;
        };
        if resource.has(ResourceFlag::Disabled) {
            self.original.disabled = true;
            let output = self.begin_disable();
            self.defer(HookKind::Disable, output);
        }
        if resource.has(ResourceFlag::Erroring) {
            self.original.erroring = true;
            let fault = self.services.unspecified_fault();
            let output = self.begin_error(fault);
            self.defer(HookKind::Error, output);
        }
        unit_debug!(
            context = self.log_context("initialize"),
            "adopted resource state disabled={} erroring={}",
            self.original.disabled,
            self.original.erroring
        );
    }

    /// Key under the parent, or the type name for a root unit.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The type this unit was constructed from.
    pub fn unit_type(&self) -> &Arc<UnitType> {
        &self.unit_type
    }

    /// Whether the unit's type is `unit_type` or derives from it.
    pub fn is_instance_of(&self, unit_type: &Arc<UnitType>) -> bool {
        self.unit_type.is_subtype_of(unit_type)
    }

    /// Options merged over the type's defaults at initialisation.
    pub fn options(&self) -> &UnitOptions {
        &self.options
    }

    /// A single named option.
    pub fn option(&self, name: &str) -> Option<&Value> {
        self.options.get(name)
    }

    /// The resource this unit marks, if one was given.
    pub fn bound_resource(&self) -> Option<&BoundResource> {
        self.options.bound_resource.as_ref()
    }

    /// Collaborators shared with hooks.
    pub fn services(&self) -> &UnitServices {
        &self.services
    }

    /// Loaded and not errored since.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Shown and not hidden since.
    pub fn is_shown(&self) -> bool {
        self.shown
    }

    /// Disabled and not enabled since.
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Entered the error state at least once.
    pub fn is_errored(&self) -> bool {
        self.errored
    }

    /// `destroy()` has run.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// The fault passed to the most recent error transition.
    pub fn last_error(&self) -> Option<&Fault> {
        self.last_error.as_ref()
    }

    /// Resource markings adopted at construction.
    pub fn original_flags(&self) -> AdoptedFlags {
        self.original
    }

    /// Snapshot of the four lifecycle flags.
    pub fn state(&self) -> UnitState {
        UnitState {
            loaded: self.loaded,
            shown: self.shown,
            disabled: self.disabled,
            errored: self.errored,
        }
    }

    /// Attach `child` under `key`, returning the unit it replaced.
    pub fn add_child(&mut self, key: impl Into<String>, mut child: Unit) -> Option<Unit> {
        let key = key.into();
        child.key = key.clone();
        self.children.insert(key, child)
    }

    /// Builder form of [`Unit::add_child`].
    pub fn with_child(mut self, key: impl Into<String>, child: Unit) -> Self {
        self.add_child(key, child);
        self
    }

    /// Child stored under `key`.
    pub fn child(&self, key: &str) -> Option<&Unit> {
        self.children.get(key)
    }

    /// Mutable access to the child under `key`.
    pub fn child_mut(&mut self, key: &str) -> Option<&mut Unit> {
        self.children.get_mut(key)
    }

    /// Detach a child without destroying it.
    pub fn remove_child(&mut self, key: &str) -> Option<Unit> {
        self.children.shift_remove(key)
    }

    /// Children in insertion order.
    pub fn children(&self) -> impl Iterator<Item = (&str, &Unit)> {
        self.children.iter().map(|(key, unit)| (key.as_str(), unit))
    }

    /// Number of direct children.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Load every child concurrently, then run this unit's load hook.
    ///
    /// A second call after a successful load returns [`LoadOutcome::AlreadyLoaded`]
    /// without running anything. Every child load runs to completion; if any
    /// failed, the first failure in child order is returned and the own hook
    /// does not run. A failing load hook is routed into [`Unit::error`] and reported
    /// as [`LoadOutcome::Errored`]; only a failure of the error hook itself
    /// makes this return `Err`.
    pub fn load(&mut self, options: Value) -> BoxFuture<'_, Result<LoadOutcome>> {
        async move {
            self.prepare().await?;
            if self.loaded {
                log_lifecycle_event(
                    Some(&self.log_context("load")),
                    "unit.load",
                    "already loaded",
                    LifecycleOutcome::Skipped,
                );
                return Ok(LoadOutcome::AlreadyLoaded);
            }

            let results = join_all(self.children.iter_mut().map(|(key, child)| {
                let child_key = key.clone();
                child
                    .load(Value::Null)
                    .map(move |result| (child_key, result))
            }))
            .await;
            let failed = results
                .into_iter()
                .find_map(|(child, result)| result.err().map(|source| (child, source)));
            if let Some((child, source)) = failed {
                return Err(UnitError::ChildLoad {
                    unit: self.key.clone(),
                    child,
                    source: Box::new(source),
                });
            }

            let output = self.invoke_load(options);
            match output.await {
                Ok(_) => {
                    self.loaded = true;
                    if let Some(resource) = self.bound_resource() {
                        resource.mark(ResourceFlag::Loaded);
                    }
                    log_lifecycle_event(
                        Some(&self.log_context("load")),
                        "unit.load",
                        "load completed",
                        LifecycleOutcome::Success,
                    );
                    Ok(LoadOutcome::Loaded)
                }
                Err(err) => {
                    let fault = Fault::from(err);
                    log_lifecycle_event(
                        Some(&self.log_context("load")),
                        "unit.load",
                        &format!("load hook failed: {fault}"),
                        LifecycleOutcome::Fault,
                    );
                    let output = self.begin_error(fault.clone());
                    settle(self.key.clone(), HookKind::Error, output).await?;
                    Ok(LoadOutcome::Errored(fault))
                }
            }
        }
        .boxed()
    }

    /// Run the show hook and mark the resource active.
    pub async fn show(&mut self) -> Result<()> {
        self.prepare().await?;
        if !self.loaded {
            self.warn_before_load(DiagnosticKind::ShowBeforeLoad, "show");
        }
        let output = self.invoke_phase(|m| m.show.clone());
        if let Some(resource) = self.bound_resource() {
            resource.mark(ResourceFlag::Active);
        }
        self.shown = true;
        settle(self.key.clone(), HookKind::Show, output).await
    }

    /// Run the hide hook and clear the resource's active marking.
    pub async fn hide(&mut self) -> Result<()> {
        self.prepare().await?;
        if !self.loaded {
            self.warn_before_load(DiagnosticKind::HideBeforeLoad, "hide");
        }
        let output = self.invoke_phase(|m| m.hide.clone());
        if let Some(resource) = self.bound_resource() {
            resource.unmark(ResourceFlag::Active);
        }
        self.shown = false;
        settle(self.key.clone(), HookKind::Hide, output).await
    }

    /// Clear the disabled marking and run the enable hook.
    pub async fn enable(&mut self) -> Result<()> {
        self.prepare().await?;
        let output = self.begin_enable();
        settle(self.key.clone(), HookKind::Enable, output).await
    }

    /// Raise the disabled marking and run the disable hook.
    pub async fn disable(&mut self) -> Result<()> {
        self.prepare().await?;
        let output = self.begin_disable();
        settle(self.key.clone(), HookKind::Disable, output).await
    }

    /// Enter the error state and run the error hook.
    ///
    /// Without an explicit fault one is synthesised from the configured
    /// default message. Marking, flags and diagnostics happen before the hook runs.
    pub async fn error(&mut self, fault: Option<Fault>) -> Result<()> {
        self.prepare().await?;
        let fault = fault.unwrap_or_else(|| self.services.unspecified_fault());
        let output = self.begin_error(fault);
        settle(self.key.clone(), HookKind::Error, output).await
    }

    /// Fetch remote data through the resource loader.
    pub fn fetch_remote_data<'a>(
        &'a self,
        url: &'a str,
        options: FetchOptions,
    ) -> BoxFuture<'a, anyhow::Result<Value>> {
        self.services.loader().fetch_data(url, options)
    }

    /// Load stylesheets through the resource loader.
    pub fn get_styles<'a>(&'a self, urls: &'a [String]) -> BoxFuture<'a, anyhow::Result<()>> {
        self.services.loader().load_css(urls)
    }

    /// Load a template through the resource loader.
    pub fn get_template<'a>(&'a self, url: &'a str) -> BoxFuture<'a, anyhow::Result<String>> {
        self.services.loader().load_template(url)
    }

    /// Shape externally fetched data. Identity unless a type overrides it.
    pub fn transform_data(&self, data: Value) -> Value {
        match self.unit_type.resolve(|m| m.transform_data.clone()) {
            Some(found) => (found.member)(&self.hook_context(found.owner), data),
            None => data,
        }
    }

    /// Tear down the subtree and restore the resource markings found at construction.
    ///
    /// Further lifecycle calls fail with [`UnitError::Destroyed`]. Calling this
    /// twice is a no-op.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        for child in self.children.values_mut() {
            child.destroy();
        }
        self.children.clear();
        if let Some(resource) = self.bound_resource() {
            resource.set(ResourceFlag::Disabled, self.original.disabled);
            resource.set(ResourceFlag::Erroring, self.original.erroring);
        }
        self.pending.get_mut().clear();
        self.destroyed = true;
        log_lifecycle_event(
            Some(&self.log_context("destroy")),
            "unit.destroy",
            "unit destroyed",
            LifecycleOutcome::Success,
        );
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.destroyed {
            return Err(UnitError::Destroyed {
                unit: self.key.clone(),
            });
        }
        Ok(())
    }

    fn begin_enable(&mut self) -> HookOutput {
        if let Some(resource) = self.bound_resource() {
            resource.unmark(ResourceFlag::Disabled);
        }
        self.disabled = false;
        self.invoke_phase(|m| m.enable.clone())
    }

    fn begin_disable(&mut self) -> HookOutput {
        if let Some(resource) = self.bound_resource() {
            resource.mark(ResourceFlag::Disabled);
        }
        self.disabled = true;
        self.invoke_phase(|m| m.disable.clone())
    }

    fn begin_error(&mut self, fault: Fault) -> HookOutput {
        if let Some(resource) = self.bound_resource() {
            resource.mark(ResourceFlag::Erroring);
        }
        self.errored = true;
        self.loaded = false;
        self.last_error = Some(fault.clone());
        self.services.diagnostics().emit(Diagnostic::new(
            DiagnosticLevel::Error,
            DiagnosticKind::UnitErrored,
            self.key.as_str(),
            self.unit_type.name(),
            fault.to_string(),
        ));
        match self.unit_type.resolve(|m| m.error.clone()) {
            Some(found) => (found.member)(self.hook_context(found.owner), fault),
            None => HookOutput::ready(),
        }
    }

    fn invoke_load(&self, options: Value) -> HookOutput {
        match self.unit_type.resolve(|m| m.load.clone()) {
            Some(found) => (found.member)(self.hook_context(found.owner), options),
            None => HookOutput::ready(),
        }
    }

    fn invoke_phase(&self, pick: fn(&LifecycleMembers) -> Option<PhaseFn>) -> HookOutput {
        match self.unit_type.resolve(pick) {
            Some(found) => (found.member)(self.hook_context(found.owner)),
            None => HookOutput::ready(),
        }
    }

    fn hook_context(&self, owner: Arc<UnitType>) -> HookContext {
        HookContext::new(
            owner,
            self.unit_type.clone(),
            self.key.clone(),
            self.options.clone(),
            self.state(),
            self.services.clone(),
        )
    }

    fn defer(&mut self, hook: HookKind, output: HookOutput) {
        match output {
            HookOutput::Ready(Ok(_)) => {}
            HookOutput::Ready(Err(err)) => self.report_adoption_failure(hook, &err),
            HookOutput::Deferred(fut) => self.pending.get_mut().push((hook, fut)),
        }
    }

    /// Rejects destroyed units and finishes adoption work queued at
    /// construction, so it completes before any later hook runs.
    async fn prepare(&mut self) -> Result<()> {
        self.ensure_alive()?;
        self.settle_pending().await;
        Ok(())
    }

    async fn settle_pending(&mut self) {
        let pending = std::mem::take(self.pending.get_mut());
        for (hook, fut) in pending {
            if let Err(err) = fut.await {
                self.report_adoption_failure(hook, &err);
            }
        }
    }

    fn report_adoption_failure(&self, hook: HookKind, err: &anyhow::Error) {
        self.services.diagnostics().emit(Diagnostic::new(
            DiagnosticLevel::Warning,
            DiagnosticKind::AdoptionHookFailed,
            self.key.as_str(),
            self.unit_type.name(),
            format!("{hook} hook failed while adopting resource state: {err}"),
        ));
    }

    fn warn_before_load(&self, kind: DiagnosticKind, phase: &str) {
        if !self.services.lifecycle().warn_before_load {
            return;
        }
        self.services.diagnostics().emit(Diagnostic::new(
            DiagnosticLevel::Warning,
            kind,
            self.key.as_str(),
            self.unit_type.name(),
            format!("{phase}() called before the unit finished loading"),
        ));
    }

    fn log_context(&self, phase: &'static str) -> LogContext<'_> {
        LogContext::new()
            .with_unit(&self.key)
            .with_unit_type(self.unit_type.name())
            .with_phase(phase)
    }
}

async fn settle(unit: String, hook: HookKind, output: HookOutput) -> Result<()> {
    output
        .await
        .map(|_| ())
        .map_err(|err| UnitError::Hook {
            unit,
            hook,
            source: Fault::from(err),
        })
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unit")
            .field("key", &self.key)
            .field("unit_type", &self.unit_type.name())
            .field("state", &self.state())
            .field("children", &self.children.keys().collect::<Vec<_>>())
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}
