//! Progress reporting hooks for generation runs

use crate::error::WikismithError;

/// Observability callbacks; implementations must not affect the run
pub trait ProgressTracker: Send + Sync {
    fn start_task(&self, name: &str, total: usize);

    fn update_progress(&self, current: usize, message: &str);

    fn complete_task(&self, message: &str);

    fn set_error(&self, error: &WikismithError);
}

/// Tracker that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProgressTracker;

impl ProgressTracker for NoOpProgressTracker {
    fn start_task(&self, _name: &str, _total: usize) {}

    fn update_progress(&self, _current: usize, _message: &str) {}

    fn complete_task(&self, _message: &str) {}

    fn set_error(&self, _error: &WikismithError) {}
}

/// Tracker that forwards events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgressTracker;

impl ProgressTracker for TracingProgressTracker {
    fn start_task(&self, name: &str, total: usize) {
        tracing::info!(task = name, total, "Task started");
    }

    fn update_progress(&self, current: usize, message: &str) {
        tracing::info!(current, message, "Task progress");
    }

    fn complete_task(&self, message: &str) {
        tracing::info!(message, "Task complete");
    }

    fn set_error(&self, error: &WikismithError) {
        tracing::warn!(error = %error, "Task error");
    }
}
