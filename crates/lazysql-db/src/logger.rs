//! Logger abstraction used by the manager and the query façade.

/// Sink for the handful of messages lazysql emits.
pub trait QueryLogger: Send + Sync {
    /// Statement text and other verbose detail.
    fn debug(&self, message: &str);

    /// Lifecycle events and pool statistics.
    fn info(&self, message: &str);

    /// Statement and connection failures.
    fn error(&self, message: &str);
}

/// Forwards every message to `tracing` under the `lazysql` target.
///
/// This is the default logger; without an installed subscriber it emits
/// nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl QueryLogger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!(target: "lazysql", "{message}");
    }

    fn info(&self, message: &str) {
        tracing::info!(target: "lazysql", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "lazysql", "{message}");
    }
}

/// Discards every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl QueryLogger for NoopLogger {
    fn debug(&self, _message: &str) {}

    fn info(&self, _message: &str) {}

    fn error(&self, _message: &str) {}
}
