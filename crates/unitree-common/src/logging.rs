//! ---
//! utr_section: "01-shared-primitives"
//! utr_subsection: "module"
//! utr_type: "source"
//! utr_scope: "code"
//! utr_description: "Shared primitives and utilities for the unit runtime."
//! utr_version: "v0.0.0-prealpha"
//! utr_owner: "tbd"
//! ---
use std::fs;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "UNITREE_LOG";

static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Output format of the stdout layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    /// One JSON object per event with `unit`, `unit_type` and `phase` at the top level.
    #[default]
    StructuredJson,
    /// Single-line human readable output.
    Pretty,
}

/// Filter for the subscriber: `UNITREE_LOG`, then `RUST_LOG`, then `config.filter`.
///
/// An unparsable environment directive is reported on stderr and skipped.
pub fn resolve_filter(config: &LoggingConfig) -> EnvFilter {
    [LOG_ENV, EnvFilter::DEFAULT_ENV]
        .into_iter()
        .find_map(|var| {
            let directive = std::env::var(var).ok()?;
            match EnvFilter::try_new(&directive) {
                Ok(filter) => Some(filter),
                Err(err) => {
                    eprintln!("ignoring invalid {var} directive `{directive}`: {err}");
                    None
                }
            }
        })
        .unwrap_or_else(|| EnvFilter::new(&config.filter))
}

/// Install the global subscriber for a unit runtime.
///
/// Lifecycle events are written to stdout in `config.format`. With
/// `config.file_output` they are also appended as JSON to a daily rolling file
/// `<file_prefix or runtime>.log` under `config.directory`.
///
/// Returns `false` when a global subscriber was already installed; the call is
/// then a no-op apart from creating the log directory.
pub fn init_tracing(runtime: &str, config: &LoggingConfig) -> Result<bool> {
    let filter = resolve_filter(config);
    let file_writer = file_writer(runtime, config)?;

    let stdout_layer = match config.format {
        LogFormat::StructuredJson => fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_span_list(false)
            .with_target(false)
            .with_timer(UtcTime::rfc_3339())
            .with_writer(std::io::stdout)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .compact()
            .with_target(false)
            .with_timer(UtcTime::rfc_3339())
            .with_writer(std::io::stdout)
            .boxed(),
    };
    let file_layer = file_writer.map(|writer| {
        fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_span_list(false)
            .with_ansi(false)
            .with_timer(UtcTime::rfc_3339())
            .with_writer(writer)
            .boxed()
    });

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .is_ok();
    if installed {
        info!(
            runtime,
            format = ?config.format,
            file_output = config.file_output,
            "unit runtime tracing installed"
        );
    }
    Ok(installed)
}

fn file_writer(runtime: &str, config: &LoggingConfig) -> Result<Option<NonBlocking>> {
    if !config.file_output {
        return Ok(None);
    }
    fs::create_dir_all(&config.directory).with_context(|| {
        format!("failed to create log directory {}", config.directory.display())
    })?;
    let prefix = config.file_prefix.as_deref().unwrap_or(runtime);
    let (writer, guard) =
        tracing_appender::non_blocking(daily(&config.directory, format!("{prefix}.log")));
    // Only the installed subscriber's guard needs to outlive the call.
    let _ = FILE_GUARD.set(guard);
    Ok(Some(writer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_output_is_opt_in() {
        let temp = tempfile::tempdir().expect("tempdir");
        let stdout_only = LoggingConfig {
            directory: temp.path().join("unused"),
            ..LoggingConfig::default()
        };
        assert!(file_writer("unitree-common", &stdout_only).unwrap().is_none());
        assert!(!stdout_only.directory.exists());
    }

    #[test]
    fn init_tracing_installs_once() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = LoggingConfig {
            directory: temp.path().join("logs"),
            format: LogFormat::Pretty,
            file_prefix: Some("unit-test".into()),
            file_output: true,
            ..LoggingConfig::default()
        };
        init_tracing("unitree-common", &config).unwrap();
        assert!(config.directory.is_dir());
        assert!(!init_tracing("unitree-common", &config).unwrap());
    }
}
