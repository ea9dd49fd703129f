use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;

/// An external script, loaded once and then shared by everyone who needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    url: Arc<str>,
    body: Arc<str>,
}

impl Script {
    pub fn new(url: &str, body: &str) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptLoadError {
    #[error("Failed to load script {url}: {message}")]
    Failed { url: String, message: String },

    #[error("Loading script {url} was aborted")]
    Aborted { url: String },
}

/// Where script bodies come from
#[async_trait]
pub trait ScriptSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, ScriptLoadError>;
}

pub struct HttpScriptSource {
    client: reqwest::Client,
}

impl HttpScriptSource {
    /// A fetch that takes longer than `timeout` counts as aborted
    pub fn with_timeout(timeout: Duration) -> reqwest::Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }
}

#[async_trait]
impl ScriptSource for HttpScriptSource {
    async fn fetch(&self, url: &str) -> Result<String, ScriptLoadError> {
        let to_error = |err: reqwest::Error| {
            if err.is_timeout() || err.is_body() {
                ScriptLoadError::Aborted {
                    url: url.to_string(),
                }
            } else {
                ScriptLoadError::Failed {
                    url: url.to_string(),
                    message: err.to_string(),
                }
            }
        };
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(to_error)?;
        response.text().await.map_err(to_error)
    }
}

type Load = Shared<BoxFuture<'static, Result<Script, ScriptLoadError>>>;

/// Loads each script URL at most once per process. Concurrent callers for the same URL
/// wait on the same load. Failed loads are forgotten so a later caller can try again.
pub struct ScriptLoader {
    source: Arc<dyn ScriptSource>,
    loads: Mutex<HashMap<String, Load>>,
}

impl ScriptLoader {
    pub fn new(source: Arc<dyn ScriptSource>) -> Self {
        Self {
            source,
            loads: Mutex::new(HashMap::new()),
        }
    }

    pub async fn load(&self, url: &str) -> Result<Script, ScriptLoadError> {
        let load = self.get_or_start(url);
        let result = load.clone().await;
        if result.is_err() {
            self.forget(url, &load);
        }
        result
    }

    /// True if the script for `url` finished loading successfully
    pub fn is_loaded(&self, url: &str) -> bool {
        self.lock()
            .get(url)
            .and_then(|load| load.peek().map(Result::is_ok))
            .unwrap_or(false)
    }

    fn get_or_start(&self, url: &str) -> Load {
        let mut loads = self.lock();
        if let Some(load) = loads.get(url) {
            log::debug!("Script {url} already requested, reusing it");
            return load.clone();
        }

        let source = Arc::clone(&self.source);
        let owned_url = url.to_string();
        let load = async move {
            log::info!("Loading script {owned_url}...");
            let body = source.fetch(&owned_url).await?;
            log::info!("Loading script {owned_url}...done");
            Ok(Script::new(&owned_url, &body))
        }
        .boxed()
        .shared();
        loads.insert(url.to_string(), load.clone());
        load
    }

    fn forget(&self, url: &str, failed: &Load) {
        let mut loads = self.lock();
        // Another caller may already have replaced the failed load with a new attempt
        if loads.get(url).is_some_and(|load| load.ptr_eq(failed)) {
            loads.remove(url);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Load>> {
        self.loads.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
