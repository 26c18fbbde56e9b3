//! ---
//! utr_section: "02-logging-diagnostics"
//! utr_subsection: "module"
//! utr_type: "source"
//! utr_scope: "code"
//! utr_description: "Structured lifecycle logging and diagnostics sinks."
//! utr_version: "v0.0.0-prealpha"
//! utr_owner: "tbd"
//! ---
/// Emit an informational log enriched with unit context.
#[macro_export]
macro_rules! unit_info {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::INFO,
            unit = ctx.unit.unwrap_or(""),
            unit_type = ctx.unit_type.unwrap_or(""),
            phase = ctx.phase.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        $crate::unit_info!(context = $crate::LogContext::default(), $($arg)+)
    }};
}

/// Emit a debug log enriched with unit context.
#[macro_export]
macro_rules! unit_debug {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::DEBUG,
            unit = ctx.unit.unwrap_or(""),
            unit_type = ctx.unit_type.unwrap_or(""),
            phase = ctx.phase.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        $crate::unit_debug!(context = $crate::LogContext::default(), $($arg)+)
    }};
}

/// Emit a warning enriched with unit context.
#[macro_export]
macro_rules! unit_warn {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::WARN,
            unit = ctx.unit.unwrap_or(""),
            unit_type = ctx.unit_type.unwrap_or(""),
            phase = ctx.phase.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        $crate::unit_warn!(context = $crate::LogContext::default(), $($arg)+)
    }};
}

/// Emit an error log enriched with unit context.
#[macro_export]
macro_rules! unit_error {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::ERROR,
            unit = ctx.unit.unwrap_or(""),
            unit_type = ctx.unit_type.unwrap_or(""),
            phase = ctx.phase.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        $crate::unit_error!(context = $crate::LogContext::default(), $($arg)+)
    }};
}
