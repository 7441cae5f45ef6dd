//! HTTP client for the agent endpoint

use async_trait::async_trait;

use crate::{
    error::{Error, Result},
    types::{AgentRequest, AgentResponse},
};

/// Default agent endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.brianknows.org/api/v0/agent";

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "BRIAN_API_KEY";

/// Environment variable overriding the endpoint
pub const ENDPOINT_ENV: &str = "BRIAN_API_URL";

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "X-Brian-Api-Key";

/// Trait for agent backends
#[async_trait]
pub trait AgentApi: Send + Sync {
    /// Send one prompt (plus history) and decode the reply
    async fn ask(&self, request: &AgentRequest) -> Result<AgentResponse>;
}

/// Agent client speaking JSON over HTTP
pub struct HttpAgentClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpAgentClient {
    /// Create a client for the default endpoint
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.into(),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV).map_err(|_| Error::InvalidApiKey)?;
        let client = Self::new(api_key);
        Ok(match std::env::var(ENDPOINT_ENV) {
            Ok(endpoint) if !endpoint.trim().is_empty() => client.with_endpoint(endpoint),
            _ => client,
        })
    }

    /// Point the client at another endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Use a preconfigured reqwest client (timeouts, proxies)
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AgentApi for HttpAgentClient {
    async fn ask(&self, request: &AgentRequest) -> Result<AgentResponse> {
        if self.api_key.trim().is_empty() {
            return Err(Error::InvalidApiKey);
        }
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(Error::InvalidConfig(format!(
                "agent endpoint must be an http(s) URL, got {:?}",
                self.endpoint
            )));
        }

        tracing::debug!(
            endpoint = %self.endpoint,
            history = request.messages.len(),
            "sending agent request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(Error::InvalidApiKey);
        }

        let text = response.text().await?;
        decode_response(status.as_u16(), &text)
    }
}

/// Decode a response body.
///
/// The agent reports semantic errors with non-2xx codes and a JSON body, so a
/// decodable body is returned as a payload regardless of status.
fn decode_response(status: u16, body: &str) -> Result<AgentResponse> {
    if body.trim().is_empty() {
        return if (200..300).contains(&status) {
            Err(Error::UnexpectedResponse("empty response body".to_string()))
        } else {
            Err(Error::api(status, "empty response body"))
        };
    }

    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => {
            let response = AgentResponse::from_value(value);
            tracing::debug!(status, is_error = response.is_error(), "agent responded");
            Ok(response)
        }
        Err(e) if (200..300).contains(&status) => Err(Error::Json(e)),
        Err(_) => Err(Error::api(status, body.trim())),
    }
}
