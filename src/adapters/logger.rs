//! The logging port: generalises the direct `tracing::{debug,info,warn}`
//! call sites the rest of this codebase's ancestor used, so callers that
//! want to capture or suppress output (tests, the doctor's quiet mode)
//! don't have to fight a global subscriber.

pub trait Logger: Send + Sync {
    fn debug(&self, message: &str);
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Routes through the `tracing` macros, same as every other module in
/// this crate that hasn't been handed an explicit logger.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!("{message}");
    }
    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }
    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
    }
    fn error(&self, message: &str) {
        tracing::error!("{message}");
    }
}

/// Discards everything. Used by tests that assert on return values, not
/// on log output.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn debug(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}
