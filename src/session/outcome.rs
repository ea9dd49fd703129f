use std::error::Error;
use thiserror::Error;

use crate::backend::{AccountBatch, BackendError};
use crate::script::ScriptLoadError;

/// How a session ended without a fatal error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The backend accepted the transaction sync. It runs asynchronously on the backend.
    SyncEnqueued,
    AccountsAdded(AccountBatch),
    /// The consent widget reported an error
    WidgetError(String),
    /// The user left the consent widget
    Aborted,
    FetchFailed,
    SubmitFailed,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::SyncEnqueued | RunOutcome::AccountsAdded(_))
    }
}

/// Errors that end a session before the user gave consent, so there is nothing to clean up.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Failed to start a banking session")]
    AcquireSession(#[source] BackendError),

    #[error("Failed to load the bank consent widget")]
    LoadScript(#[source] ScriptLoadError),

    #[error("Failed to start the transaction sync")]
    SyncTransactions(#[source] BackendError),

    #[error("Session task ended unexpectedly: {0}")]
    Interrupted(String),
}

/// Render an error with all its causes on one line
pub fn error_chain(error: &dyn Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
