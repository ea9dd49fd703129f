use async_trait::async_trait;

use crate::backend::ClientToken;
use crate::script::Script;

mod browser;

pub use browser::BrowserWidget;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidgetOptions {
    /// Show the user the details of the consent they're about to give
    pub unfold_consent_details: bool,
}

/// How the user left the consent widget. Every widget run ends in exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetOutcome {
    Finished,
    Error(String),
    Aborted,
}

/// The third party UI that authenticates the user with their bank and collects consent.
#[async_trait]
pub trait ConsentWidget: Send + Sync {
    /// Start the widget with the launcher script and wait until the user is done with it.
    /// This can take arbitrarily long, there is no timeout.
    async fn run(&self, launcher: &Script, token: &ClientToken, options: WidgetOptions)
        -> WidgetOutcome;
}
