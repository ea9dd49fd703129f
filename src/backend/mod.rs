use async_trait::async_trait;

use crate::context::{BankAccountName, Company, Flow};

mod accounts;
mod error;
mod http;
mod tokens;

pub use accounts::{AccountBatch, BankAccount};
pub use error::BackendError;
pub use http::HttpBackend;
pub use tokens::{ClientToken, SessionCredential, SessionIdShort};

/// Remote operations of the banking backend. Every call is attempted exactly once.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Open a banking session for the given flow
    async fn get_client_token(&self, flow: Flow) -> Result<SessionCredential, BackendError>;

    /// Accounts and bank name the user consented to in the session
    async fn fetch_accounts_and_bank(
        &self,
        session_id_short: &SessionIdShort,
    ) -> Result<AccountBatch, BackendError>;

    /// Persist accounts for a company
    async fn add_bank_accounts(
        &self,
        accounts: &[BankAccount],
        company: &Company,
        bank_name: &str,
    ) -> Result<(), BackendError>;

    /// Enqueue a transaction sync. The sync itself runs later on the backend.
    async fn sync_transactions(&self, account: &BankAccountName) -> Result<(), BackendError>;
}
