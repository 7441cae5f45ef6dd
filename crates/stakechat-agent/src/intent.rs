//! Maps one agent response to an actionable intent

use std::sync::LazyLock;

use regex::Regex;
use stakechat_ai::{AgentResponse, AgentResult, ExtractedParams};

use crate::contracts::StakingContracts;
use crate::units::Amount;

pub const NO_VALID_RESPONSE: &str = "No valid response was received from the agent.";
pub const NO_ANSWER: &str = "The agent did not provide an answer.";

/// What the orchestrator should execute for one turn
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StakeIntent {
    #[default]
    None,
    /// Approve then stake the fungible token
    StakeToken(Amount),
    /// Payable stake of the native coin
    StakeNative(Amount),
    Withdraw,
    Claim,
}

impl StakeIntent {
    pub fn kind(&self) -> Option<ActionKind> {
        match self {
            StakeIntent::None => None,
            StakeIntent::StakeToken(_) => Some(ActionKind::StakeToken),
            StakeIntent::StakeNative(_) => Some(ActionKind::StakeNative),
            StakeIntent::Withdraw => Some(ActionKind::Withdraw),
            StakeIntent::Claim => Some(ActionKind::Claim),
        }
    }

    pub fn amount(&self) -> Option<&Amount> {
        match self {
            StakeIntent::StakeToken(amount) | StakeIntent::StakeNative(amount) => Some(amount),
            _ => None,
        }
    }
}

/// An intent without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    StakeToken,
    StakeNative,
    Withdraw,
    Claim,
}

impl ActionKind {
    /// The `action` value the agent uses for this kind
    pub fn wire_name(&self) -> &'static str {
        match self {
            ActionKind::StakeToken | ActionKind::StakeNative => "deposit",
            ActionKind::Withdraw => "withdraw",
            ActionKind::Claim => "claim",
        }
    }
}

/// Result of classifying one response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub intent: StakeIntent,
    /// Text to show as the assistant turn
    pub answer: Option<String>,
}

type BuildIntent = fn(&ExtractedParams, &StakingContracts) -> Option<StakeIntent>;

struct ErrorRule {
    pattern: Regex,
    action: &'static str,
    build: BuildIntent,
}

impl ErrorRule {
    fn new(pattern: &str, action: &'static str, build: BuildIntent) -> Self {
        Self {
            pattern: Regex::new(pattern).unwrap(),
            action,
            build,
        }
    }
}

/// Ordered: the first matching rule that yields an intent wins.
static ERROR_RULES: LazyLock<Vec<ErrorRule>> = LazyLock::new(|| {
    vec![
        ErrorRule::new(r"(?is)\btokens\b.*\bnot supported", "deposit", |params, contracts| {
            let token = params.token()?;
            contracts
                .is_stake_token(token)
                .then(|| StakeIntent::StakeToken(parse_amount(params)))
        }),
        ErrorRule::new(r"(?i)withdraw", "withdraw", |_, _| Some(StakeIntent::Withdraw)),
        ErrorRule::new(r"(?i)claim", "claim", |_, _| Some(StakeIntent::Claim)),
    ]
});

fn parse_amount(params: &ExtractedParams) -> Amount {
    params
        .amount_text()
        .map(|raw| Amount::parse_lenient(&raw))
        .unwrap_or_default()
}

/// Classify one agent response.
///
/// `hint` is the kind dispatched on the previous turn; it stands in for the
/// action only when an error rule matches and the payload carries none.
pub fn classify(
    response: &AgentResponse,
    hint: Option<ActionKind>,
    contracts: &StakingContracts,
) -> Classification {
    match response {
        AgentResponse::Failure(failure) => {
            let default_params = ExtractedParams::default();
            let params = failure.extracted_params.first().unwrap_or(&default_params);
            let action = params.action().or(hint.map(|h| h.wire_name()));

            let intent = ERROR_RULES
                .iter()
                .filter(|rule| rule.pattern.is_match(&failure.error))
                .filter(|rule| action.is_some_and(|a| a.eq_ignore_ascii_case(rule.action)))
                .find_map(|rule| (rule.build)(params, contracts));

            match intent {
                Some(intent) => {
                    tracing::debug!(?intent, error = %failure.error, "reclassified agent error");
                    Classification {
                        intent,
                        answer: None,
                    }
                }
                None => Classification {
                    intent: StakeIntent::None,
                    answer: Some(failure.error.clone()),
                },
            }
        }
        AgentResponse::Success(success) => match success.result.first() {
            Some(result) => classify_result(result, contracts),
            None => no_valid_response(),
        },
        AgentResponse::Unrecognized(value) => {
            tracing::debug!(%value, "unrecognized agent payload");
            no_valid_response()
        }
    }
}

fn classify_result(result: &AgentResult, contracts: &StakingContracts) -> Classification {
    let answer = result
        .answer
        .clone()
        .filter(|a| !a.trim().is_empty())
        .unwrap_or_else(|| NO_ANSWER.to_string());

    let params = result.extracted_params.first();
    let is_deposit = result
        .action()
        .is_some_and(|a| a.eq_ignore_ascii_case("deposit"));
    let intent = match params {
        Some(params) if is_deposit && params.token().is_some_and(|t| contracts.is_native_coin(t)) => {
            StakeIntent::StakeNative(parse_amount(params))
        }
        _ => StakeIntent::None,
    };

    Classification {
        intent,
        answer: Some(answer),
    }
}

fn no_valid_response() -> Classification {
    Classification {
        intent: StakeIntent::None,
        answer: Some(NO_VALID_RESPONSE.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(value: serde_json::Value, hint: Option<ActionKind>) -> Classification {
        classify(&AgentResponse::from_value(value), hint, &StakingContracts::default())
    }

    fn amount(s: &str) -> Amount {
        s.parse().unwrap()
    }

    #[test]
    fn test_native_deposit_success() {
        let c = run(
            json!({"result": [{
                "answer": "Depositing 5 AVAX",
                "action": "deposit",
                "extractedParams": {"action": "deposit", "token1": "avax", "amount": "5"}
            }]}),
            None,
        );
        assert_eq!(c.intent, StakeIntent::StakeNative(amount("5")));
        assert_eq!(c.answer.as_deref(), Some("Depositing 5 AVAX"));
    }

    #[test]
    fn test_numeric_amount_is_accepted() {
        let c = run(
            json!({"result": [{
                "answer": "ok",
                "extractedParams": [{"action": "deposit", "token1": "AVAX", "amount": 0.5}]
            }]}),
            None,
        );
        assert_eq!(c.intent, StakeIntent::StakeNative(amount("0.5")));
    }

    #[test]
    fn test_scientific_amounts_are_numeric() {
        let deposit = |amount: serde_json::Value| {
            run(
                json!({"result": [{
                    "answer": "ok",
                    "action": "deposit",
                    "extractedParams": {"action": "deposit", "token1": "AVAX", "amount": amount}
                }]}),
                None,
            )
            .intent
        };
        assert_eq!(deposit(json!(1e-7)), StakeIntent::StakeNative(amount("0.0000001")));
        assert_eq!(deposit(json!("1e3")), StakeIntent::StakeNative(amount("1000")));
        assert_eq!(
            deposit(json!(1e21)),
            StakeIntent::StakeNative(amount("1000000000000000000000"))
        );
    }

    #[test]
    fn test_unsupported_token_error_spanning_lines() {
        let c = run(
            json!({
                "error": "the tokens in your request\nare not supported",
                "extractedParams": [{"action": "deposit", "token1": "AIVT", "amount": "7"}]
            }),
            None,
        );
        assert_eq!(c.intent, StakeIntent::StakeToken(amount("7")));
    }

    #[test]
    fn test_success_for_other_token_is_informational() {
        let c = run(
            json!({"result": [{
                "answer": "Swapping",
                "action": "swap",
                "extractedParams": {"action": "swap", "token1": "AVAX", "amount": "5"}
            }]}),
            None,
        );
        assert_eq!(c.intent, StakeIntent::None);
        assert_eq!(c.answer.as_deref(), Some("Swapping"));
    }

    #[test]
    fn test_unsupported_token_error_becomes_token_stake() {
        let c = run(
            json!({
                "error": "the tokens in your request are not supported",
                "extractedParams": [{"action": "deposit", "token1": "AIVT", "amount": "100"}]
            }),
            None,
        );
        assert_eq!(c.intent, StakeIntent::StakeToken(amount("100")));
        assert_eq!(c.answer, None);
    }

    #[test]
    fn test_unsupported_token_error_for_unknown_token_is_verbatim() {
        let error = "the tokens in your request are not supported";
        let c = run(
            json!({
                "error": error,
                "extractedParams": [{"action": "deposit", "token1": "DOGE", "amount": "1"}]
            }),
            None,
        );
        assert_eq!(c.intent, StakeIntent::None);
        assert_eq!(c.answer.as_deref(), Some(error));
    }

    #[test]
    fn test_withdraw_and_claim_errors() {
        let c = run(
            json!({
                "error": "withdraw is not available on this chain",
                "extractedParams": [{"action": "withdraw"}]
            }),
            None,
        );
        assert_eq!(c.intent, StakeIntent::Withdraw);

        let c = run(
            json!({
                "error": "Claim not supported",
                "extractedParams": {"action": "claim"}
            }),
            None,
        );
        assert_eq!(c.intent, StakeIntent::Claim);
    }

    #[test]
    fn test_pattern_without_matching_action_is_verbatim() {
        let c = run(
            json!({
                "error": "you cannot withdraw yet",
                "extractedParams": [{"action": "deposit", "token1": "AVAX"}]
            }),
            None,
        );
        assert_eq!(c.intent, StakeIntent::None);
        assert_eq!(c.answer.as_deref(), Some("you cannot withdraw yet"));
    }

    #[test]
    fn test_hint_stands_in_for_missing_action() {
        let value = json!({"error": "please confirm your withdraw", "extractedParams": []});
        assert_eq!(run(value.clone(), None).intent, StakeIntent::None);
        assert_eq!(
            run(value.clone(), Some(ActionKind::Withdraw)).intent,
            StakeIntent::Withdraw
        );
        // A hint for another kind does not force a match
        assert_eq!(run(value, Some(ActionKind::Claim)).intent, StakeIntent::None);
    }

    #[test]
    fn test_hint_ignored_when_action_present() {
        let c = run(
            json!({
                "error": "withdraw failed",
                "extractedParams": [{"action": "swap"}]
            }),
            Some(ActionKind::Withdraw),
        );
        assert_eq!(c.intent, StakeIntent::None);
    }

    #[test]
    fn test_non_numeric_amount_becomes_zero() {
        let c = run(
            json!({
                "error": "tokens not supported",
                "extractedParams": [{"action": "deposit", "token1": "AIVT", "amount": "lots"}]
            }),
            None,
        );
        assert_eq!(c.intent, StakeIntent::StakeToken(Amount::zero()));
    }

    #[test]
    fn test_empty_and_unrecognized_payloads() {
        let c = run(json!({"result": []}), None);
        assert_eq!(c.intent, StakeIntent::None);
        assert_eq!(c.answer.as_deref(), Some(NO_VALID_RESPONSE));

        let c = run(json!({"status": 500}), None);
        assert_eq!(c.answer.as_deref(), Some(NO_VALID_RESPONSE));
    }

    #[test]
    fn test_missing_answer_gets_placeholder() {
        let c = run(json!({"result": [{"action": "swap"}]}), None);
        assert_eq!(c.answer.as_deref(), Some(NO_ANSWER));
    }

    #[test]
    fn test_intent_kinds() {
        assert_eq!(StakeIntent::None.kind(), None);
        assert_eq!(StakeIntent::Claim.kind(), Some(ActionKind::Claim));
        assert_eq!(ActionKind::StakeNative.wire_name(), "deposit");
        assert_eq!(StakeIntent::StakeToken(amount("2")).amount(), Some(&amount("2")));
    }
}
