//! Tracing utilities for trellis resolution, execution and pivot sync.
//!
//! Each macro expands to a `tracing::debug!` event under the `tracing` feature
//! and to nothing without it. Arguments are only evaluated when the
//! feature is on.

/// Emit a debug-level tracing event for a resolved command unit.
///
/// ```ignore
/// trellis_trace_command!(backend, &unit);
/// ```
#[macro_export]
macro_rules! trellis_trace_command {
    ($backend:expr, $command:expr) => {
        #[cfg(feature = "tracing")]
        tracing::debug!(backend = %$backend, command = %$command, "trellis.resolve");
    };
}

/// Emit a debug-level tracing event for a driver operation.
///
/// ```ignore
/// trellis_trace_execute!("memory", "delete", &self.name);
/// trellis_trace_execute!("rusqlite", "select", &sql);
/// ```
#[macro_export]
macro_rules! trellis_trace_execute {
    ($driver:literal, $operation:literal, $detail:expr) => {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            driver = $driver,
            operation = $operation,
            detail = %$detail,
            "trellis.execute"
        );
    };
}

/// Emit a debug-level tracing event summarising a pivot sync.
///
/// ```ignore
/// trellis_trace_sync!(&host, &changes);
/// ```
#[macro_export]
macro_rules! trellis_trace_sync {
    ($host:expr, $changes:expr) => {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            host = %$host,
            attached = $changes.attached.len(),
            detached = $changes.detached.len(),
            updated = $changes.updated.len(),
            "trellis.pivot.sync"
        );
    };
}
