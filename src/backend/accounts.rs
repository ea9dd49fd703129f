use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A bank account as the backend reports it after consent. The fields are owned by
/// the backend, we only pass them through and peek at a few for display.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct BankAccount(pub Map<String, Value>);

impl BankAccount {
    pub fn id(&self) -> Option<&str> {
        self.field("id").or_else(|| self.field("account_id"))
    }

    pub fn display_name(&self) -> Option<&str> {
        ["alias", "name", "iban"]
            .into_iter()
            .find_map(|key| self.field(key))
            .or_else(|| self.id())
    }

    fn field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }
}

/// Accounts discovered in one consent session, together with the bank they belong to.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AccountBatch {
    pub accounts: Vec<BankAccount>,
    pub bank_name: String,
}
