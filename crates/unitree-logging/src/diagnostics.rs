//! ---
//! utr_section: "02-logging-diagnostics"
//! utr_subsection: "module"
//! utr_type: "source"
//! utr_scope: "code"
//! utr_description: "Structured lifecycle logging and diagnostics sinks."
//! utr_version: "v0.0.0-prealpha"
//! utr_owner: "tbd"
//! ---
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use crate::LogContext;

/// Severity attached to a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DiagnosticLevel {
    /// Informational notice.
    Info,
    /// Non-fatal misuse; execution continues.
    Warning,
    /// A unit entered its error state.
    Error,
}

/// What a [`Diagnostic`] is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DiagnosticKind {
    /// `show()` ran before the unit finished loading.
    ShowBeforeLoad,
    /// `hide()` ran before the unit finished loading.
    HideBeforeLoad,
    /// The error pathway was entered.
    UnitErrored,
    /// A hook invoked while adopting bound-resource state failed.
    AdoptionHookFailed,
}

/// A single diagnostic emitted by the lifecycle engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Wall-clock time the diagnostic was raised.
    pub at: DateTime<Utc>,
    /// Severity.
    pub level: DiagnosticLevel,
    /// Category.
    pub kind: DiagnosticKind,
    /// Unit key or name.
    pub unit: String,
    /// Unit type name.
    pub unit_type: String,
    /// Human readable description.
    pub message: String,
}

impl Diagnostic {
    /// Build a diagnostic stamped with the current time.
    pub fn new(
        level: DiagnosticLevel,
        kind: DiagnosticKind,
        unit: impl Into<String>,
        unit_type: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            at: Utc::now(),
            level,
            kind,
            unit: unit.into(),
            unit_type: unit_type.into(),
            message: message.into(),
        }
    }
}

/// Destination for diagnostics raised by units.
pub trait DiagnosticsSink: Send + Sync {
    /// Record or forward a diagnostic.
    fn emit(&self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        let ctx = LogContext::new()
            .with_unit(&diagnostic.unit)
            .with_unit_type(&diagnostic.unit_type)
            .with_phase(diagnostic.kind.as_ref());
        match diagnostic.level {
            DiagnosticLevel::Info => crate::unit_info!(context = ctx, "{}", diagnostic.message),
            DiagnosticLevel::Warning => crate::unit_warn!(context = ctx, "{}", diagnostic.message),
            DiagnosticLevel::Error => crate::unit_error!(context = ctx, "{}", diagnostic.message),
        }
    }
}

/// In-memory sink that keeps every diagnostic for later inspection.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<Diagnostic>>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded diagnostics in emission order.
    pub fn records(&self) -> Vec<Diagnostic> {
        self.records.lock().clone()
    }

    /// Number of recorded diagnostics of the given kind.
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.records.lock().iter().filter(|d| d.kind == kind).count()
    }

    /// Drop everything recorded so far.
    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl DiagnosticsSink for MemorySink {
    fn emit(&self, diagnostic: Diagnostic) {
        TracingSink.emit(diagnostic.clone());
        self.records.lock().push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_records_in_order() {
        let sink = MemorySink::new();
        let shared = sink.clone();
        shared.emit(Diagnostic::new(
            DiagnosticLevel::Warning,
            DiagnosticKind::ShowBeforeLoad,
            "sidebar",
            "Panel",
            "show called before load",
        ));
        shared.emit(Diagnostic::new(
            DiagnosticLevel::Error,
            DiagnosticKind::UnitErrored,
            "sidebar",
            "Panel",
            "boom",
        ));

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kind, DiagnosticKind::ShowBeforeLoad);
        assert_eq!(sink.count(DiagnosticKind::UnitErrored), 1);

        sink.clear();
        assert!(sink.records().is_empty());
    }

    #[test]
    fn kinds_render_snake_case() {
        assert_eq!(DiagnosticKind::HideBeforeLoad.to_string(), "hide_before_load");
        assert_eq!(DiagnosticLevel::Warning.as_ref(), "warning");
    }
}
