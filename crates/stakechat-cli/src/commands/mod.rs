//! Slash commands for interactive mode

mod history;
mod status;

pub use history::HistoryCommand;
pub use status::StatusCommand;

use stakechat_agent::Orchestrator;

/// Result of executing a slash command
#[derive(Debug, PartialEq, Eq)]
pub enum CommandResult {
    /// Show a message to the user (not sent to the agent)
    Message(String),
    /// Exit the application
    Exit,
    /// Unknown command
    Unknown(String),
}

/// Parse and execute a slash command
pub fn execute_command(input: &str, orchestrator: &Orchestrator) -> Option<CommandResult> {
    let input = input.trim();

    let rest = input.strip_prefix('/')?;
    let command = rest.split_whitespace().next().unwrap_or("").to_lowercase();

    Some(match command.as_str() {
        "help" | "h" | "?" => CommandResult::Message(help_message()),

        "history" => CommandResult::Message(HistoryCommand::render(&orchestrator.turns())),

        "status" | "s" => CommandResult::Message(StatusCommand::execute(orchestrator)),

        "quit" | "exit" | "q" => CommandResult::Exit,

        _ => CommandResult::Unknown(command),
    })
}

fn help_message() -> String {
    r#"Available commands:
  /help, /h, /?        Show this help message
  /history             Show the conversation so far
  /status, /s          Show wallet, pending stake and contract details
  /quit, /exit, /q     Exit stakechat

Anything else is sent to the agent, for example:
  stake 5 AVAX
  stake 100 AIVT
  withdraw my stake
  claim my rewards"#
        .to_string()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use alloy_primitives::Address;
    use stakechat_agent::{OrchestratorConfig, SimulatedWallet};
    use stakechat_ai::HttpAgentClient;
    use std::sync::Arc;

    pub(crate) fn orchestrator() -> Orchestrator {
        Orchestrator::new(
            OrchestratorConfig::default(),
            Arc::new(HttpAgentClient::new("test-key")),
            Arc::new(SimulatedWallet::new(Some(Address::repeat_byte(0x22)))),
        )
    }

    #[test]
    fn test_plain_text_is_not_a_command() {
        assert_eq!(execute_command("stake 5 avax", &orchestrator()), None);
    }

    #[test]
    fn test_aliases() {
        let orchestrator = orchestrator();
        assert_eq!(execute_command("/q", &orchestrator), Some(CommandResult::Exit));
        assert_eq!(execute_command(" /EXIT ", &orchestrator), Some(CommandResult::Exit));
        assert!(matches!(
            execute_command("/?", &orchestrator),
            Some(CommandResult::Message(m)) if m.contains("/history")
        ));
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            execute_command("/frobnicate now", &orchestrator()),
            Some(CommandResult::Unknown("frobnicate".to_string()))
        );
    }
}
