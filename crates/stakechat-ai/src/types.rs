//! Wire types for the agent API

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Who authored a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sender {
    #[serde(rename = "user")]
    User,
    /// The agent. Sent as `brian`, which is the name the agent API expects for its own turns.
    #[serde(rename = "brian", alias = "assistant")]
    Assistant,
}

impl Sender {
    /// Short label for display
    pub fn label(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Assistant => "assistant",
        }
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// One entry of the conversation history.
///
/// Turns are immutable once created; the local timestamp is never sent on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    content: String,
    sender: Sender,
    #[serde(skip, default = "now_millis")]
    timestamp: i64,
}

impl ConversationTurn {
    /// Create a turn authored by the user
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(content, Sender::User)
    }

    /// Create a turn authored by the assistant
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(content, Sender::Assistant)
    }

    fn new(content: impl Into<String>, sender: Sender) -> Self {
        Self {
            content: content.into(),
            sender,
            timestamp: now_millis(),
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn sender(&self) -> Sender {
        self.sender
    }

    /// Creation time in milliseconds since the Unix epoch
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

/// Request body for one agent call
#[derive(Debug, Clone, Serialize)]
pub struct AgentRequest {
    pub prompt: String,
    /// Connected wallet address, empty when no wallet is connected
    pub address: String,
    /// History preceding this prompt
    pub messages: Vec<ConversationTurn>,
}

impl AgentRequest {
    pub fn new(
        prompt: impl Into<String>,
        address: impl Into<String>,
        messages: Vec<ConversationTurn>,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            address: address.into(),
            messages,
        }
    }
}

/// Parameters the agent extracted from the prompt
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedParams {
    #[serde(default)]
    pub action: Option<String>,
    /// Amount as sent by the agent: usually a string, occasionally a number
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default)]
    pub token1: Option<String>,
    #[serde(default)]
    pub token2: Option<String>,
    #[serde(default)]
    pub chain: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    /// Any other fields the agent included
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExtractedParams {
    /// The amount as text, whether the agent sent a string or a number
    pub fn amount_text(&self) -> Option<String> {
        match self.amount.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// The primary token symbol, trimmed
    pub fn token(&self) -> Option<&str> {
        self.token1.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// The action, trimmed
    pub fn action(&self) -> Option<&str> {
        self.action.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Accept `extractedParams` as a single object, an array, or null.
fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<ExtractedParams>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<ExtractedParams>),
        One(ExtractedParams),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::Many(list)) => list,
        Some(OneOrMany::One(params)) => vec![params],
    })
}

/// One entry of a successful agent response
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AgentResult {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(rename = "extractedParams", default, deserialize_with = "one_or_many")]
    pub extracted_params: Vec<ExtractedParams>,
}

impl AgentResult {
    /// The result-level action, falling back to the one inside the extracted parameters
    pub fn action(&self) -> Option<&str> {
        self.action
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| self.extracted_params.first().and_then(|p| p.action()))
    }
}

/// Successful agent payload
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AgentSuccess {
    pub result: Vec<AgentResult>,
}

/// Error payload: the agent understood something but refuses or needs more input
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AgentFailure {
    pub error: String,
    #[serde(rename = "extractedParams", default, deserialize_with = "one_or_many")]
    pub extracted_params: Vec<ExtractedParams>,
}

/// A decoded agent response: exactly one of success or error.
///
/// Anything that is neither decodes as [`AgentResponse::Unrecognized`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AgentResponse {
    Failure(AgentFailure),
    Success(AgentSuccess),
    Unrecognized(Value),
}

impl AgentResponse {
    /// Decode from an already-parsed JSON value
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or(AgentResponse::Unrecognized(value))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, AgentResponse::Failure(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sender_wire_names() {
        assert_eq!(serde_json::to_value(Sender::User).unwrap(), json!("user"));
        assert_eq!(serde_json::to_value(Sender::Assistant).unwrap(), json!("brian"));
        let parsed: Sender = serde_json::from_value(json!("assistant")).unwrap();
        assert_eq!(parsed, Sender::Assistant);
    }

    #[test]
    fn test_request_serialization_omits_timestamps() {
        let request = AgentRequest::new(
            "stake 5 AVAX",
            "0xabc",
            vec![ConversationTurn::user("hi"), ConversationTurn::assistant("hello")],
        );
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "prompt": "stake 5 AVAX",
                "address": "0xabc",
                "messages": [
                    {"content": "hi", "sender": "user"},
                    {"content": "hello", "sender": "brian"}
                ]
            })
        );
    }

    #[test]
    fn test_decode_success_with_object_params() {
        let response = AgentResponse::from_value(json!({
            "result": [{
                "answer": "You want to deposit 5 AVAX",
                "action": "deposit",
                "extractedParams": {"action": "deposit", "amount": "5", "token1": "AVAX", "chain": "Avalanche"}
            }]
        }));
        let AgentResponse::Success(success) = response else {
            panic!("expected success, got {:?}", response);
        };
        let first = &success.result[0];
        assert_eq!(first.action(), Some("deposit"));
        assert_eq!(first.extracted_params.len(), 1);
        assert_eq!(first.extracted_params[0].token(), Some("AVAX"));
        assert_eq!(first.extracted_params[0].amount_text().as_deref(), Some("5"));
    }

    #[test]
    fn test_decode_error_with_param_list() {
        let response = AgentResponse::from_value(json!({
            "error": "the tokens in your request are not supported",
            "extractedParams": [{"action": "deposit", "token1": "AIVT", "amount": 100}]
        }));
        let AgentResponse::Failure(failure) = response else {
            panic!("expected failure, got {:?}", response);
        };
        assert!(failure.error.contains("not supported"));
        assert_eq!(failure.extracted_params[0].amount_text().as_deref(), Some("100"));
        assert_eq!(failure.extracted_params[0].action(), Some("deposit"));
    }

    #[test]
    fn test_decode_keeps_unknown_param_fields() {
        let response = AgentResponse::from_value(json!({
            "error": "missing info",
            "extractedParams": [{"action": "claim", "protocol": "aivt-staking"}]
        }));
        let AgentResponse::Failure(failure) = response else {
            panic!("expected failure");
        };
        assert_eq!(
            failure.extracted_params[0].extra.get("protocol"),
            Some(&json!("aivt-staking"))
        );
    }

    #[test]
    fn test_decode_null_params() {
        let response = AgentResponse::from_value(json!({"error": "nope", "extractedParams": null}));
        assert!(response.is_error());
        let AgentResponse::Failure(failure) = response else {
            unreachable!();
        };
        assert!(failure.extracted_params.is_empty());
    }

    #[test]
    fn test_decode_unrecognized() {
        let response = AgentResponse::from_value(json!({"message": "Internal server error"}));
        assert!(matches!(response, AgentResponse::Unrecognized(_)));
        let response = AgentResponse::from_value(json!("plain string"));
        assert!(matches!(response, AgentResponse::Unrecognized(_)));
    }

    #[test]
    fn test_result_action_falls_back_to_params() {
        let result = AgentResult {
            answer: None,
            action: None,
            extracted_params: vec![ExtractedParams {
                action: Some(" withdraw ".into()),
                ..Default::default()
            }],
        };
        assert_eq!(result.action(), Some("withdraw"));
    }
}
