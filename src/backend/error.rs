use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Request to {method} failed")]
    Transport {
        method: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} failed: {message}")]
    Remote {
        method: &'static str,
        message: String,
    },

    #[error("{method} returned no data")]
    MissingPayload { method: &'static str },

    #[error("Failed to decode the response of {method}")]
    Decode {
        method: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
