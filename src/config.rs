use anyhow::{anyhow, Context, Result};
use reqwest::Url;
use std::fmt::{self, Debug};

use crate::args::ConnectionArgs;

pub const DEFAULT_LAUNCHER_URL: &str =
    "https://x.klarnacdn.net/xs2a/app-launcher/v0/xs2a-app-launcher.js";
pub const DEFAULT_METHOD_PREFIX: &str =
    "banking.klarna_kosma_integration.doctype.klarna_kosma_settings.klarna_kosma_settings";
pub const DEFAULT_LISTEN_PORT: u16 = 8080;

#[derive(Debug, Clone)]
pub struct Config {
    pub backend: BackendConfig,
    pub launcher_url: Url,
    pub listen_port: u16,
}

#[derive(Clone)]
pub struct BackendConfig {
    pub base_url: Url,
    pub api_key: String,
    pub api_secret: String,
    pub method_prefix: String,
}

impl BackendConfig {
    pub fn authorization(&self) -> String {
        format!("token {}:{}", self.api_key, self.api_secret)
    }
}

impl Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key)
            .field("api_secret", &"[redacted]")
            .field("method_prefix", &self.method_prefix)
            .finish()
    }
}

impl Config {
    pub fn from_args(args: &ConnectionArgs) -> Result<Self> {
        let base_url = parse_http_url(&args.backend_url).context("Invalid backend URL")?;
        let launcher_url = parse_http_url(&args.launcher_url).context("Invalid launcher URL")?;
        let method_prefix = args.method_prefix.trim_matches('.').to_string();
        if method_prefix.is_empty() {
            return Err(anyhow!("Method prefix must not be empty"));
        }
        if args.api_key.is_empty() || args.api_secret.is_empty() {
            return Err(anyhow!("API key and secret must not be empty"));
        }
        Ok(Self {
            backend: BackendConfig {
                base_url,
                api_key: args.api_key.clone(),
                api_secret: args.api_secret.clone(),
                method_prefix,
            },
            launcher_url,
            listen_port: args.listen_port,
        })
    }
}

fn parse_http_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).with_context(|| anyhow!("Not a URL: {url}"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(anyhow!("Expected an http(s) URL but got scheme {scheme}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> ConnectionArgs {
        ConnectionArgs {
            backend_url: "https://erp.example.com".to_string(),
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
            method_prefix: DEFAULT_METHOD_PREFIX.to_string(),
            launcher_url: DEFAULT_LAUNCHER_URL.to_string(),
            listen_port: DEFAULT_LISTEN_PORT,
        }
    }

    #[test]
    fn builds_config() {
        let config = Config::from_args(&args()).unwrap();
        assert_eq!("https://erp.example.com/", config.backend.base_url.as_str());
        assert_eq!("token key:secret", config.backend.authorization());
        assert_eq!(DEFAULT_LAUNCHER_URL, config.launcher_url.as_str());
        assert_eq!(8080, config.listen_port);
    }

    #[test]
    fn trims_dots_from_method_prefix() {
        let config = Config::from_args(&ConnectionArgs {
            method_prefix: "banking.api.".to_string(),
            ..args()
        })
        .unwrap();
        assert_eq!("banking.api", config.backend.method_prefix);
    }

    #[test]
    fn rejects_non_http_backend() {
        let err = Config::from_args(&ConnectionArgs {
            backend_url: "ftp://erp.example.com".to_string(),
            ..args()
        })
        .unwrap_err();
        assert_eq!("Invalid backend URL", err.to_string());
    }

    #[test]
    fn rejects_empty_secret() {
        assert!(Config::from_args(&ConnectionArgs {
            api_secret: String::new(),
            ..args()
        })
        .is_err());
    }

    #[test]
    fn debug_hides_secret() {
        let printed = format!("{:?}", Config::from_args(&args()).unwrap());
        assert!(!printed.contains("secret\""));
        assert!(printed.contains("[redacted]"));
    }
}
