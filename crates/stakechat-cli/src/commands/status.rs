//! /status command - wallet, busy flag, stake flow and contracts

use stakechat_agent::Orchestrator;

pub struct StatusCommand;

impl StatusCommand {
    pub fn execute(orchestrator: &Orchestrator) -> String {
        let config = orchestrator.config();
        let contracts = &config.contracts;

        let mut output = String::from("Session Status\n");
        output.push_str(&"-".repeat(40));
        output.push('\n');

        let wallet = orchestrator
            .wallet_address()
            .map(|a| a.to_string())
            .unwrap_or_else(|| "not connected".to_string());
        output.push_str(&format!("Wallet:     {}\n", wallet));
        output.push_str(&format!(
            "Busy:       {}\n",
            if orchestrator.is_busy() { "yes" } else { "no" }
        ));
        output.push_str(&format!("Stake flow: {}\n", orchestrator.flow()));
        output.push_str(&format!("Messages:   {}\n", orchestrator.turns().len()));
        output.push('\n');

        output.push_str(&format!("Chain id:   {}\n", contracts.chain_id));
        output.push_str(&format!("Staking:    {}\n", contracts.staking));
        output.push_str(&format!(
            "Token:      {} ({})\n",
            contracts.token, contracts.token_symbol
        ));
        output.push_str(&format!(
            "Confirmations: {} (timeout {}s)",
            config.confirmation_depth,
            config.confirmation_timeout.as_secs()
        ));

        output
    }
}
