//! ---
//! utr_section: "02-logging-diagnostics"
//! utr_subsection: "module"
//! utr_type: "source"
//! utr_scope: "code"
//! utr_description: "Structured lifecycle logging and diagnostics sinks."
//! utr_version: "v0.0.0-prealpha"
//! utr_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Structured logging for unit lifecycle transitions plus the injectable
//! diagnostics sinks used to surface misuse warnings.

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

pub mod diagnostics;
pub mod macros;

pub use diagnostics::{
    Diagnostic, DiagnosticKind, DiagnosticLevel, DiagnosticsSink, MemorySink, TracingSink,
};

/// Initialize a baseline tracing subscriber suitable for development and tests.
pub fn init() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(subscriber_fmt::layer())
        .try_init();
}

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Key or name of the unit emitting the event.
    pub unit: Option<&'a str>,
    /// Name of the unit type the instance was constructed from.
    pub unit_type: Option<&'a str>,
    /// Lifecycle phase in progress (`load`, `show`, ...).
    pub phase: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a unit identifier.
    pub fn with_unit(mut self, unit: &'a str) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Attach a unit type name.
    pub fn with_unit_type(mut self, unit_type: &'a str) -> Self {
        self.unit_type = Some(unit_type);
        self
    }

    /// Attach a lifecycle phase.
    pub fn with_phase(mut self, phase: &'a str) -> Self {
        self.phase = Some(phase);
        self
    }
}

/// High-level outcome used when emitting lifecycle log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleOutcome {
    /// The phase completed.
    Success,
    /// The phase was skipped because it had already run.
    Skipped,
    /// The phase failed or was rerouted into the error pathway.
    Fault,
}

impl LifecycleOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            LifecycleOutcome::Success => "success",
            LifecycleOutcome::Skipped => "skipped",
            LifecycleOutcome::Fault => "fault",
        }
    }
}

/// Emit a standardized lifecycle event with an outcome.
pub fn log_lifecycle_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: LifecycleOutcome,
) {
    let ctx = context.cloned().unwrap_or_default();
    match outcome {
        LifecycleOutcome::Fault => tracing::event!(
            Level::ERROR,
            event,
            outcome = outcome.as_str(),
            unit = ctx.unit.unwrap_or(""),
            unit_type = ctx.unit_type.unwrap_or(""),
            phase = ctx.phase.unwrap_or(""),
            message = %message
        ),
        LifecycleOutcome::Skipped => tracing::event!(
            Level::DEBUG,
            event,
            outcome = outcome.as_str(),
            unit = ctx.unit.unwrap_or(""),
            unit_type = ctx.unit_type.unwrap_or(""),
            phase = ctx.phase.unwrap_or(""),
            message = %message
        ),
        LifecycleOutcome::Success => tracing::event!(
            Level::INFO,
            event,
            outcome = outcome.as_str(),
            unit = ctx.unit.unwrap_or(""),
            unit_type = ctx.unit_type.unwrap_or(""),
            phase = ctx.phase.unwrap_or(""),
            message = %message
        ),
    }
}
