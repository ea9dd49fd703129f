use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};

use super::{AccountBatch, Backend, BackendError, BankAccount, SessionCredential, SessionIdShort};
use crate::config::BackendConfig;
use crate::context::{BankAccountName, Company, Flow};

const GET_CLIENT_TOKEN: &str = "get_client_token";
const FETCH_ACCOUNTS_AND_BANK: &str = "fetch_accounts_and_bank";
const ADD_BANK_ACCOUNTS: &str = "add_bank_accounts";
const SYNC_TRANSACTIONS: &str = "sync_transactions";

/// Response body of a whitelisted method call
#[derive(Deserialize, Debug)]
struct Envelope {
    message: Option<Value>,
    exc: Option<String>,
}

/// Talks to the backend's RPC endpoints over HTTP.
pub struct HttpBackend {
    client: reqwest::Client,
    config: BackendConfig,
}

impl HttpBackend {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/api/method/{}.{}",
            self.config.base_url.as_str().trim_end_matches('/'),
            self.config.method_prefix,
            method,
        )
    }

    async fn call(&self, method: &'static str, args: Value) -> Result<Envelope, BackendError> {
        log::debug!("Calling {method}...");
        let response = self
            .client
            .post(self.method_url(method))
            .header(AUTHORIZATION, self.config.authorization())
            .json(&args)
            .send()
            .await
            .map_err(|source| BackendError::Transport { method, source })?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|source| BackendError::Transport { method, source })?;

        if !status.is_success() {
            // Error responses usually still carry the envelope with the server side exception
            let message = serde_json::from_slice::<Envelope>(&body)
                .ok()
                .and_then(|envelope| envelope.exc)
                .unwrap_or_else(|| format!("HTTP status {status}"));
            return Err(BackendError::Remote { method, message });
        }

        let envelope: Envelope = serde_json::from_slice(&body)
            .map_err(|source| BackendError::Decode { method, source })?;
        if let Some(exc) = envelope.exc {
            return Err(BackendError::Remote {
                method,
                message: exc,
            });
        }
        log::debug!("Calling {method}...done");
        Ok(envelope)
    }

    async fn call_for<T: DeserializeOwned>(
        &self,
        method: &'static str,
        args: Value,
    ) -> Result<T, BackendError> {
        let message = match self.call(method, args).await?.message {
            None | Some(Value::Null) => return Err(BackendError::MissingPayload { method }),
            Some(message) => message,
        };
        serde_json::from_value(message).map_err(|source| BackendError::Decode { method, source })
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn get_client_token(&self, flow: Flow) -> Result<SessionCredential, BackendError> {
        self.call_for(GET_CLIENT_TOKEN, json!({ "current_flow": flow }))
            .await
    }

    async fn fetch_accounts_and_bank(
        &self,
        session_id_short: &SessionIdShort,
    ) -> Result<AccountBatch, BackendError> {
        self.call_for(
            FETCH_ACCOUNTS_AND_BANK,
            json!({ "session_id_short": session_id_short }),
        )
        .await
    }

    async fn add_bank_accounts(
        &self,
        accounts: &[BankAccount],
        company: &Company,
        bank_name: &str,
    ) -> Result<(), BackendError> {
        self.call(
            ADD_BANK_ACCOUNTS,
            json!({
                "accounts": accounts,
                "company": company,
                "bank_name": bank_name,
            }),
        )
        .await?;
        Ok(())
    }

    async fn sync_transactions(&self, account: &BankAccountName) -> Result<(), BackendError> {
        self.call(SYNC_TRANSACTIONS, json!({ "account": account }))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const PREFIX: &str = "banking.api";

    fn backend(server: &MockServer) -> HttpBackend {
        HttpBackend::new(BackendConfig {
            base_url: server.uri().parse().unwrap(),
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
            method_prefix: PREFIX.to_string(),
        })
    }

    fn method_path(name: &str) -> String {
        format!("/api/method/{PREFIX}.{name}")
    }

    #[tokio::test]
    async fn get_client_token_sends_flow_and_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(method_path(GET_CLIENT_TOKEN)))
            .and(header("authorization", "token key:secret"))
            .and(body_json(json!({"current_flow": "accounts"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": {"client_token": "T", "session_id_short": "S"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let credential = backend(&server)
            .get_client_token(Flow::Accounts)
            .await
            .unwrap();
        assert_eq!("T", credential.client_token.0);
        assert_eq!(SessionIdShort("S".to_string()), credential.session_id_short);
    }

    #[tokio::test]
    async fn fetch_accounts_parses_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(method_path(FETCH_ACCOUNTS_AND_BANK)))
            .and(body_json(json!({"session_id_short": "S"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": {"accounts": [{"id": "A1"}], "bank_name": "Bank X"}
            })))
            .mount(&server)
            .await;

        let batch = backend(&server)
            .fetch_accounts_and_bank(&SessionIdShort("S".to_string()))
            .await
            .unwrap();
        assert_eq!("Bank X", batch.bank_name);
        assert_eq!(1, batch.accounts.len());
        assert_eq!(Some("A1"), batch.accounts[0].id());
    }

    #[tokio::test]
    async fn fetch_accounts_without_message_is_missing_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(method_path(FETCH_ACCOUNTS_AND_BANK)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let err = backend(&server)
            .fetch_accounts_and_bank(&SessionIdShort("S".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BackendError::MissingPayload {
                method: FETCH_ACCOUNTS_AND_BANK
            }
        ));
    }

    #[tokio::test]
    async fn exc_is_remote_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(method_path(FETCH_ACCOUNTS_AND_BANK)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": {"accounts": [], "bank_name": "Bank X"},
                "exc": "Session expired"
            })))
            .mount(&server)
            .await;

        let err = backend(&server)
            .fetch_accounts_and_bank(&SessionIdShort("S".to_string()))
            .await
            .unwrap_err();
        assert_eq!("fetch_accounts_and_bank failed: Session expired", err.to_string());
    }

    #[tokio::test]
    async fn add_bank_accounts_sends_accounts_company_and_bank() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(method_path(ADD_BANK_ACCOUNTS)))
            .and(body_json(json!({
                "accounts": [{"id": "A1"}],
                "company": "C1",
                "bank_name": "Bank X",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let accounts = vec![serde_json::from_value(json!({"id": "A1"})).unwrap()];
        backend(&server)
            .add_bank_accounts(&accounts, &Company("C1".to_string()), "Bank X")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn error_status_uses_exc_when_present() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(method_path(SYNC_TRANSACTIONS)))
            .and(body_json(json!({"account": "A1"})))
            .respond_with(
                ResponseTemplate::new(417).set_body_json(json!({"exc": "No consent for account"})),
            )
            .mount(&server)
            .await;

        let err = backend(&server)
            .sync_transactions(&BankAccountName("A1".to_string()))
            .await
            .unwrap_err();
        assert_eq!("sync_transactions failed: No consent for account", err.to_string());
    }

    #[tokio::test]
    async fn error_status_without_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(method_path(SYNC_TRANSACTIONS)))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = backend(&server)
            .sync_transactions(&BankAccountName("A1".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Remote { method: SYNC_TRANSACTIONS, .. }));
        assert!(err.to_string().contains("502"));
    }

    #[tokio::test]
    async fn garbage_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(method_path(GET_CLIENT_TOKEN)))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
            .mount(&server)
            .await;

        let err = backend(&server)
            .get_client_token(Flow::Transactions)
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Decode { .. }));
    }
}
