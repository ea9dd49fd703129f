use crate::session::WorkflowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    Green,
    Orange,
    Red,
}

/// What the user sees of a linking session.
pub trait Notifier: Send + Sync {
    /// Non-blocking alert
    fn alert(&self, message: &str, indicator: Indicator);

    /// Generic error surface for errors that ended a session
    fn error(&self, error: &WorkflowError);

    /// Show a message while a remote call is running. It goes away when the guard is dropped.
    fn progress(&self, message: &str) -> ProgressGuard;
}

#[must_use]
pub struct ProgressGuard {
    on_done: Option<Box<dyn FnOnce() + Send>>,
}

impl ProgressGuard {
    pub fn new(on_done: impl FnOnce() + Send + 'static) -> Self {
        Self {
            on_done: Some(Box::new(on_done)),
        }
    }

    pub fn noop() -> Self {
        Self { on_done: None }
    }
}

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        if let Some(on_done) = self.on_done.take() {
            on_done();
        }
    }
}

/// Discards everything, for sessions nobody is watching
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn alert(&self, _message: &str, _indicator: Indicator) {}

    fn error(&self, _error: &WorkflowError) {}

    fn progress(&self, _message: &str) -> ProgressGuard {
        ProgressGuard::noop()
    }
}
