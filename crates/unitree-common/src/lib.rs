//! ---
//! utr_section: "01-shared-primitives"
//! utr_subsection: "module"
//! utr_type: "source"
//! utr_scope: "code"
//! utr_description: "Shared primitives and utilities for the unit runtime."
//! utr_version: "v0.0.0-prealpha"
//! utr_owner: "tbd"
//! ---
//! Shared primitives for the Unitree workspace.
//! This crate exposes configuration loading and tracing initialisation
//! consumed by the composition and lifecycle crates.

pub mod config;
pub mod logging;

pub use config::{FrameworkConfig, LifecycleConfig, LoadedFrameworkConfig, LoggingConfig};
pub use logging::{init_tracing, resolve_filter, LogFormat};
