//! Progress channel
//!
//! The pipeline reports status through this trait rather than writing to the
//! terminal directly, so the CLI can render an overwrite-in-place line while
//! tests capture output. `update` replaces the prior status line; `println`
//! and `warn` emit durable lines.

/// Sink for pipeline status updates
pub trait ProgressReporter: Send + Sync {
    /// Replace the current status line (overwrite-in-place convention)
    fn update(&self, message: &str);

    /// Emit a durable line above the status line
    fn println(&self, message: &str);

    /// Emit a durable warning line
    fn warn(&self, message: &str);
}

/// Reporter that discards all output; used by library consumers and tests
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn update(&self, _message: &str) {}
    fn println(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
}
