//! Configuration file support

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use stakechat_agent::{OrchestratorConfig, StakingContracts};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Public Avalanche Fuji C-Chain endpoint
pub const DEFAULT_RPC_URL: &str = "https://api.avax-test.network/ext/bc/C/rpc";

/// Configuration for stakechat
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub agent: AgentSection,
    pub wallet: WalletSection,
    pub contracts: StakingContracts,
    pub confirmations: ConfirmationSection,
}

/// Agent endpoint settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    pub endpoint: Option<String>,
    /// Alternative to the environment variable
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletSection {
    pub rpc_url: Option<String>,
    /// Account to send from; must be unlocked on the node
    pub address: Option<Address>,
    pub poll_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationSection {
    pub depth: u64,
    pub timeout_secs: u64,
}

impl Default for ConfirmationSection {
    fn default() -> Self {
        let defaults = OrchestratorConfig::default();
        Self {
            depth: defaults.confirmation_depth,
            timeout_secs: defaults.confirmation_timeout.as_secs(),
        }
    }
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("stakechat")
    }

    /// Get the default config file path
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load config from `path`, falling back to defaults
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content).unwrap_or_else(|e| {
                eprintln!("Warning: Failed to parse config file: {}", e);
                Self::default()
            }),
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Save config to `path`
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init(path: &Path) -> std::io::Result<()> {
        if path.exists() {
            return Ok(());
        }
        Self::default().save(path)
    }

    /// API key from config, then the environment
    pub fn api_key(&self) -> Option<String> {
        self.agent
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(stakechat_ai::client::API_KEY_ENV).ok())
    }

    /// Endpoint from config, then the environment, then the built-in default
    pub fn endpoint(&self) -> String {
        self.agent
            .endpoint
            .clone()
            .or_else(|| std::env::var(stakechat_ai::client::ENDPOINT_ENV).ok())
            .unwrap_or_else(|| stakechat_ai::client::DEFAULT_ENDPOINT.to_string())
    }

    pub fn agent_timeout(&self) -> Duration {
        Duration::from_secs(self.agent.timeout_secs.unwrap_or(60))
    }

    pub fn rpc_url(&self) -> &str {
        self.wallet.rpc_url.as_deref().unwrap_or(DEFAULT_RPC_URL)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.wallet.poll_interval_ms.unwrap_or(2000))
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            contracts: self.contracts.clone(),
            confirmation_depth: self.confirmations.depth.max(1),
            confirmation_timeout: Duration::from_secs(self.confirmations.timeout_secs),
        }
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# stakechat configuration file
# Place at ~/.config/stakechat/config.toml (Linux) or pass --config <path>

[agent]
# endpoint = "https://api.brianknows.org/api/v0/agent"   # or BRIAN_API_URL
# api_key = "..."                                        # or BRIAN_API_KEY
timeout_secs = 60

[wallet]
# JSON-RPC node that holds the sending account unlocked
rpc_url = "https://api.avax-test.network/ext/bc/C/rpc"
# address = "0x..."
poll_interval_ms = 2000

[contracts]
staking = "0xaa3c15f3f3fc4c9ee723fec9c0aefe727be24134"
token = "0x0aedcab82bb43ce511e42d6ad5bdd58034b7e2ec"
token_symbol = "AIVT"
native_symbol = "AVAX"
chain_id = 43113
decimals = 18

[contracts.entry_points]
native_stake = "AddAvax"
token_stake = "AddToken"
withdraw = "Retiro"
claim = "CobroT"

[confirmations]
# Blocks the approval must be buried under before the stake call
depth = 2
timeout_secs = 300
"#
}
