use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

/// Token the consent widget is started with. It's a secret, so Debug doesn't print it.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct ClientToken(pub String);

impl Debug for ClientToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClientToken([redacted])")
    }
}

/// Short session id that correlates the account fetch with the consent the user gave.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct SessionIdShort(pub String);

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SessionCredential {
    pub client_token: ClientToken,
    pub session_id_short: SessionIdShort,
}
