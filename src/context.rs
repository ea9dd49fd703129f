use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use thiserror::Error;

/// Name of the company that newly linked bank accounts get added to.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Company(pub String);

impl Display for Company {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name of an already linked bank account in the host application.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct BankAccountName(pub String);

impl Display for BankAccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The flow a banking session is requested for.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Flow {
    Accounts,
    Transactions,
}

impl Flow {
    pub fn as_str(&self) -> &'static str {
        match self {
            Flow::Accounts => "accounts",
            Flow::Transactions => "transactions",
        }
    }
}

impl Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a linking session works on. Exactly one target, so there is no way to
/// ask for both or neither.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowContext {
    /// Discover the banks of a company and add their accounts
    Linking { company: Company },
    /// Refresh the transactions of one linked account
    Sync { account: BankAccountName },
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    #[error("Select either a company or a bank account, not both")]
    Both,
    #[error("Select a company to link banks for or a bank account to sync")]
    Neither,
}

impl WorkflowContext {
    pub fn linking(company: Company) -> Self {
        WorkflowContext::Linking { company }
    }

    pub fn sync(account: BankAccountName) -> Self {
        WorkflowContext::Sync { account }
    }

    /// Build a context from two independent selections, as a form would hand them over.
    pub fn from_selection(
        company: Option<Company>,
        account: Option<BankAccountName>,
    ) -> Result<Self, ContextError> {
        match (company, account) {
            (Some(company), None) => Ok(Self::linking(company)),
            (None, Some(account)) => Ok(Self::sync(account)),
            (Some(_), Some(_)) => Err(ContextError::Both),
            (None, None) => Err(ContextError::Neither),
        }
    }

    pub fn flow(&self) -> Flow {
        match self {
            WorkflowContext::Linking { .. } => Flow::Accounts,
            WorkflowContext::Sync { .. } => Flow::Transactions,
        }
    }
}
