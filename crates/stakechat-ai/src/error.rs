//! Error types for stakechat-ai

use thiserror::Error;

/// Result type alias using stakechat-ai Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the agent API
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned a non-success status without a decodable payload
    #[error("API error: {message} (status: {status})")]
    Api { status: u16, message: String },

    /// Invalid or missing API key
    #[error("Invalid or missing API key")]
    InvalidApiKey,

    /// Unexpected response format
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create an API error from a status code and message
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Whether the request never produced a usable response (network or decoding trouble)
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Http(_) | Error::Json(_) | Error::UnexpectedResponse(_))
    }
}
