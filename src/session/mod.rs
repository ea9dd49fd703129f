//! The linking session: gets a banking session from the backend, lets the user give
//! consent in the bank's widget and hands the discovered accounts back to the backend.
//! Transaction syncs for already linked accounts skip the widget entirely.

use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::backend::{AccountBatch, Backend, SessionCredential, SessionIdShort};
use crate::context::{BankAccountName, Company, Flow, WorkflowContext};
use crate::notify::{Indicator, Notifier};
use crate::script::ScriptLoader;
use crate::widget::{ConsentWidget, WidgetOptions, WidgetOutcome};

mod outcome;

pub use outcome::{error_chain, RunOutcome, WorkflowError};

const WIDGET_OPTIONS: WidgetOptions = WidgetOptions {
    unfold_consent_details: true,
};

/// Everything a session talks to. Cheap to clone, and sessions running at the same time
/// can share one set of services.
#[derive(Clone)]
pub struct Services {
    pub backend: Arc<dyn Backend>,
    pub widget: Arc<dyn ConsentWidget>,
    pub scripts: Arc<ScriptLoader>,
    pub notifier: Arc<dyn Notifier>,
    /// URL of the consent widget's launcher script
    pub launcher_url: String,
}

pub struct LinkingSession {
    context: WorkflowContext,
    services: Services,
}

/// A session running in the background
pub struct SessionHandle {
    task: JoinHandle<Result<RunOutcome, WorkflowError>>,
    notifier: Arc<dyn Notifier>,
}

impl SessionHandle {
    /// Wait for the session to end. A session task that panicked is reported through the
    /// notifier like any other fatal error.
    pub async fn join(self) -> Result<RunOutcome, WorkflowError> {
        match self.task.await {
            Ok(result) => result,
            Err(join_error) => {
                let err = WorkflowError::Interrupted(join_error.to_string());
                log::error!("{}", error_chain(&err));
                self.notifier.error(&err);
                Err(err)
            }
        }
    }
}

impl LinkingSession {
    pub fn new(context: WorkflowContext, services: Services) -> Self {
        Self { context, services }
    }

    /// Start running the session on the tokio runtime. Fatal errors are logged and shown
    /// through the notifier, they don't need to be handled by the caller.
    pub fn start(self) -> SessionHandle {
        let notifier = Arc::clone(&self.services.notifier);
        let task = tokio::spawn(async move {
            let result = self.run().await;
            if let Err(err) = &result {
                log::error!("{}", error_chain(err));
                self.services.notifier.error(err);
            }
            result
        });
        SessionHandle { task, notifier }
    }

    pub async fn run(&self) -> Result<RunOutcome, WorkflowError> {
        match &self.context {
            WorkflowContext::Sync { account } => self.sync_transactions(account).await,
            WorkflowContext::Linking { company } => self.link_banks(company).await,
        }
    }

    async fn sync_transactions(
        &self,
        account: &BankAccountName,
    ) -> Result<RunOutcome, WorkflowError> {
        log::info!("Enqueueing transaction sync for {account}...");
        {
            let _progress = self
                .services
                .notifier
                .progress("Please wait. Syncing Bank Transactions ...");
            self.services
                .backend
                .sync_transactions(account)
                .await
                .map_err(WorkflowError::SyncTransactions)?;
        }
        log::info!("Enqueueing transaction sync for {account}...done");
        Ok(RunOutcome::SyncEnqueued)
    }

    async fn link_banks(&self, company: &Company) -> Result<RunOutcome, WorkflowError> {
        let session = self.acquire_session(Flow::Accounts).await?;

        let launcher = self
            .services
            .scripts
            .load(&self.services.launcher_url)
            .await
            .map_err(WorkflowError::LoadScript)?;

        log::info!("Waiting for bank consent...");
        match self
            .services
            .widget
            .run(&launcher, &session.client_token, WIDGET_OPTIONS)
            .await
        {
            WidgetOutcome::Finished => log::info!("Waiting for bank consent...done"),
            WidgetOutcome::Error(message) => {
                log::error!("Bank consent widget failed: {message}");
                return Ok(RunOutcome::WidgetError(message));
            }
            WidgetOutcome::Aborted => {
                log::info!("Bank authentication aborted");
                return Ok(RunOutcome::Aborted);
            }
        }

        let Some(batch) = self.fetch_accounts(&session.session_id_short).await else {
            return Ok(RunOutcome::FetchFailed);
        };
        Ok(self.submit_accounts(batch, company).await)
    }

    async fn acquire_session(&self, flow: Flow) -> Result<SessionCredential, WorkflowError> {
        log::info!("Requesting banking session...");
        let _progress = self
            .services
            .notifier
            .progress("Please wait. Redirecting to Bank...");
        let session = self
            .services
            .backend
            .get_client_token(flow)
            .await
            .map_err(WorkflowError::AcquireSession)?;
        log::info!("Requesting banking session...done");
        Ok(session)
    }

    /// The user already gave consent at this point, so failures are reported but don't
    /// end the session with an error.
    async fn fetch_accounts(&self, session_id_short: &SessionIdShort) -> Option<AccountBatch> {
        log::info!("Fetching bank accounts...");
        let result = {
            let _progress = self
                .services
                .notifier
                .progress("Please wait. Fetching Bank Accounts ...");
            self.services
                .backend
                .fetch_accounts_and_bank(session_id_short)
                .await
        };
        match result {
            Ok(batch) => {
                log::info!(
                    "Fetching bank accounts...done, got {} from {}",
                    batch.accounts.len(),
                    batch.bank_name
                );
                Some(batch)
            }
            Err(err) => {
                log::error!("Failed to fetch bank accounts: {}", error_chain(&err));
                self.services
                    .notifier
                    .alert("Failed to fetch Bank Accounts.", Indicator::Orange);
                None
            }
        }
    }

    async fn submit_accounts(&self, batch: AccountBatch, company: &Company) -> RunOutcome {
        log::info!("Adding bank accounts to {company}...");
        let result = {
            let _progress = self.services.notifier.progress("Adding Bank Accounts ...");
            self.services
                .backend
                .add_bank_accounts(&batch.accounts, company, &batch.bank_name)
                .await
        };
        match result {
            Ok(()) => {
                log::info!("Adding bank accounts to {company}...done");
                self.services
                    .notifier
                    .alert("Bank accounts added", Indicator::Green);
                RunOutcome::AccountsAdded(batch)
            }
            Err(err) => {
                log::error!("Failed to add bank accounts: {}", error_chain(&err));
                self.services
                    .notifier
                    .alert("Failed to add Bank Accounts.", Indicator::Orange);
                RunOutcome::SubmitFailed
            }
        }
    }
}
