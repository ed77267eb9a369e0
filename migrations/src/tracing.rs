//! Tracing hooks for planning and push execution.
//!
//! Enable the `tracing` feature to emit events via the `tracing` crate.
//! These macros no-op when the feature is disabled, avoiding `#[cfg]` boilerplate
//! at every call site.

/// Emit a debug-level event describing a planning step.
///
/// ```ignore
/// trace_plan!("pass", 2, "deferring foreign keys");
/// ```
macro_rules! trace_plan {
    ($step:literal, $value:expr, $msg:literal) => {
        #[cfg(feature = "tracing")]
        tracing::debug!(step = $step, value = %$value, $msg);
        #[cfg(not(feature = "tracing"))]
        let _ = &$value;
    };
}

/// Emit an info-level event for a statement sent to the database.
///
/// ```ignore
/// trace_exec!(position, &sql);
/// ```
macro_rules! trace_exec {
    ($position:expr, $sql:expr) => {
        #[cfg(feature = "tracing")]
        tracing::info!(position = $position, sql = %$sql, "drizzle.push");
        #[cfg(not(feature = "tracing"))]
        let _ = (&$position, &$sql);
    };
}

/// Emit a warn-level event for a skipped or unsupported change.
macro_rules! trace_warn {
    ($msg:expr) => {
        #[cfg(feature = "tracing")]
        tracing::warn!(message = %$msg, "drizzle.migrations");
        #[cfg(not(feature = "tracing"))]
        let _ = &$msg;
    };
}

pub(crate) use {trace_exec, trace_plan, trace_warn};
