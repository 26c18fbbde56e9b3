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

use unitree_common::config::{FrameworkConfig, LifecycleConfig};
use unitree_logging::{DiagnosticsSink, TracingSink};

use crate::error::Fault;
use crate::loader::{ResourceLoader, UnconfiguredLoader};

/// Collaborators shared by every unit constructed with them.
#[derive(Clone)]
pub struct UnitServices {
    loader: Arc<dyn ResourceLoader>,
    diagnostics: Arc<dyn DiagnosticsSink>,
    lifecycle: Arc<LifecycleConfig>,
}

impl UnitServices {
    /// Services with the given loader and sink and default lifecycle knobs.
    pub fn new(loader: Arc<dyn ResourceLoader>, diagnostics: Arc<dyn DiagnosticsSink>) -> Self {
        Self {
            loader,
            diagnostics,
            lifecycle: Arc::new(LifecycleConfig::default()),
        }
    }

    /// Default collaborators with the lifecycle knobs from `config`.
    pub fn from_config(config: &FrameworkConfig) -> Self {
        Self::default().with_lifecycle(config.lifecycle.clone())
    }

    /// Replace the resource loader.
    pub fn with_loader(mut self, loader: Arc<dyn ResourceLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Replace the diagnostics sink.
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticsSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Replace the lifecycle knobs.
    pub fn with_lifecycle(mut self, lifecycle: LifecycleConfig) -> Self {
        self.lifecycle = Arc::new(lifecycle);
        self
    }

    /// Resource loader.
    pub fn loader(&self) -> &Arc<dyn ResourceLoader> {
        &self.loader
    }

    /// Diagnostics sink.
    pub fn diagnostics(&self) -> &Arc<dyn DiagnosticsSink> {
        &self.diagnostics
    }

    /// Lifecycle knobs.
    pub fn lifecycle(&self) -> &LifecycleConfig {
        &self.lifecycle
    }

    /// Fault used when `error()` is called without one.
    pub(crate) fn unspecified_fault(&self) -> Fault {
        Fault::msg(self.lifecycle.default_error_message.clone())
    }
}

impl Default for UnitServices {
    fn default() -> Self {
        Self::new(Arc::new(UnconfiguredLoader), Arc::new(TracingSink))
    }
}

impl fmt::Debug for UnitServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitServices")
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}
