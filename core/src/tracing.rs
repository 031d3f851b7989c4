//! Tracing utilities for query and ledger observability.
//!
//! Enable the `tracing` feature to emit events via the `tracing` crate.
//! These macros no-op when the feature is disabled, avoiding `#[cfg]` boilerplate
//! at every call site. The feature is checked in the crate that expands the
//! macro, so downstream crates declare their own `tracing` feature.

/// Emit a debug-level tracing event with the SQL text and parameter count.
///
/// ```ignore
/// tether_trace_query!(&sql_str, params.len());
/// ```
#[macro_export]
macro_rules! tether_trace_query {
    ($sql:expr, $param_count:expr) => {
        #[cfg(feature = "tracing")]
        tracing::debug!(sql = %$sql, params = $param_count, "tether.query");
    };
}

/// Emit a debug-level tracing event for a ledger write (append, purge).
///
/// ```ignore
/// tether_trace_ledger!("append", session_key, 1);
/// ```
#[macro_export]
macro_rules! tether_trace_ledger {
    ($event:literal, $session:expr, $rows:expr) => {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            event = $event,
            session = %$session,
            rows = $rows,
            "tether.ledger"
        );
    };
}
