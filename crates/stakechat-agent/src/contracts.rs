//! On-chain identifiers and contract call construction

use alloy_primitives::{Address, Bytes, U256, address, keccak256};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::units::TOKEN_DECIMALS;

/// Staking contract on Avalanche Fuji
pub const STAKING_CONTRACT: Address = address!("aa3c15f3f3fc4c9ee723fec9c0aefe727be24134");

/// AIVT token contract on Avalanche Fuji
pub const STAKE_TOKEN_CONTRACT: Address = address!("0aedcab82bb43ce511e42d6ad5bdd58034b7e2ec");

/// Avalanche Fuji testnet chain id
pub const FUJI_CHAIN_ID: u64 = 43113;

/// ERC-20 approval entry point
pub const APPROVE_FUNCTION: &str = "approve";

/// Names of the staking contract's entry points
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryPoints {
    /// Payable, no arguments
    pub native_stake: String,
    /// One `uint256` argument
    pub token_stake: String,
    pub withdraw: String,
    pub claim: String,
}

impl Default for EntryPoints {
    fn default() -> Self {
        Self {
            native_stake: "AddAvax".to_string(),
            token_stake: "AddToken".to_string(),
            withdraw: "Retiro".to_string(),
            claim: "CobroT".to_string(),
        }
    }
}

/// The staking deployment the orchestrator talks to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StakingContracts {
    pub staking: Address,
    pub token: Address,
    pub token_symbol: String,
    pub native_symbol: String,
    pub chain_id: u64,
    pub decimals: u8,
    pub entry_points: EntryPoints,
}

impl Default for StakingContracts {
    fn default() -> Self {
        Self {
            staking: STAKING_CONTRACT,
            token: STAKE_TOKEN_CONTRACT,
            token_symbol: "AIVT".to_string(),
            native_symbol: "AVAX".to_string(),
            chain_id: FUJI_CHAIN_ID,
            decimals: TOKEN_DECIMALS,
            entry_points: EntryPoints::default(),
        }
    }
}

impl StakingContracts {
    /// Whether `symbol` names the fungible stake token
    pub fn is_stake_token(&self, symbol: &str) -> bool {
        symbol.trim().eq_ignore_ascii_case(&self.token_symbol)
    }

    /// Whether `symbol` names the chain's native coin
    pub fn is_native_coin(&self, symbol: &str) -> bool {
        symbol.trim().eq_ignore_ascii_case(&self.native_symbol)
    }

    /// Authorize the staking contract to move `units` of the stake token
    pub fn approve(&self, units: U256) -> ContractCall {
        ContractCall::new(self.token, APPROVE_FUNCTION)
            .arg(CallArg::Address(self.staking))
            .arg(CallArg::Uint(units))
    }

    pub fn stake_token(&self, units: U256) -> ContractCall {
        ContractCall::new(self.staking, &self.entry_points.token_stake).arg(CallArg::Uint(units))
    }

    pub fn stake_native(&self, units: U256) -> ContractCall {
        ContractCall::new(self.staking, &self.entry_points.native_stake).with_value(units)
    }

    pub fn withdraw(&self) -> ContractCall {
        ContractCall::new(self.staking, &self.entry_points.withdraw)
    }

    pub fn claim(&self) -> ContractCall {
        ContractCall::new(self.staking, &self.entry_points.claim)
    }
}

/// A static ABI argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallArg {
    Address(Address),
    Uint(U256),
}

impl CallArg {
    fn abi_type(&self) -> &'static str {
        match self {
            CallArg::Address(_) => "address",
            CallArg::Uint(_) => "uint256",
        }
    }

    /// The 32-byte big-endian head word
    fn encode_word(&self) -> [u8; 32] {
        match self {
            CallArg::Address(address) => {
                let mut word = [0u8; 32];
                word[12..].copy_from_slice(address.as_slice());
                word
            }
            CallArg::Uint(value) => value.to_be_bytes::<32>(),
        }
    }
}

impl fmt::Display for CallArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallArg::Address(address) => write!(f, "{address}"),
            CallArg::Uint(value) => write!(f, "{value}"),
        }
    }
}

/// One contract call, ready to be submitted by a wallet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub to: Address,
    pub function: String,
    pub args: Vec<CallArg>,
    /// Native value attached to the call
    pub value: Option<U256>,
}

impl ContractCall {
    pub fn new(to: Address, function: impl Into<String>) -> Self {
        Self {
            to,
            function: function.into(),
            args: Vec::new(),
            value: None,
        }
    }

    pub fn arg(mut self, arg: CallArg) -> Self {
        self.args.push(arg);
        self
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = Some(value);
        self
    }

    /// Canonical signature, e.g. `approve(address,uint256)`
    pub fn signature(&self) -> String {
        let types: Vec<&str> = self.args.iter().map(CallArg::abi_type).collect();
        format!("{}({})", self.function, types.join(","))
    }

    /// First four bytes of the keccak-256 hash of the signature
    pub fn selector(&self) -> [u8; 4] {
        let hash = keccak256(self.signature().as_bytes());
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&hash[..4]);
        selector
    }

    /// ABI-encoded call data
    pub fn calldata(&self) -> Bytes {
        let mut data = Vec::with_capacity(4 + 32 * self.args.len());
        data.extend_from_slice(&self.selector());
        for arg in &self.args {
            data.extend_from_slice(&arg.encode_word());
        }
        Bytes::from(data)
    }
}

impl fmt::Display for ContractCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self.args.iter().map(ToString::to_string).collect();
        write!(f, "{}({}) on {}", self.function, args.join(", "), self.to)?;
        if let Some(value) = self.value {
            write!(f, " with value {value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_erc20_selectors() {
        let contracts = StakingContracts::default();
        let approve = contracts.approve(U256::from(1u8));
        assert_eq!(approve.signature(), "approve(address,uint256)");
        assert_eq!(hex::encode(approve.selector()), "095ea7b3");

        let transfer = ContractCall::new(contracts.token, "transfer")
            .arg(CallArg::Address(contracts.staking))
            .arg(CallArg::Uint(U256::ZERO));
        assert_eq!(hex::encode(transfer.selector()), "a9059cbb");
    }

    #[test]
    fn test_approve_calldata_layout() {
        let contracts = StakingContracts::default();
        let call = contracts.approve(U256::from(0x1234u32));
        let data = call.calldata();
        assert_eq!(data.len(), 4 + 64);
        assert_eq!(&data[..4], &[0x09, 0x5e, 0xa7, 0xb3]);
        assert_eq!(&data[4..16], &[0u8; 12]);
        assert_eq!(&data[16..36], contracts.staking.as_slice());
        assert_eq!(&data[66..68], &[0x12, 0x34]);
        assert_eq!(call.to, contracts.token);
    }

    #[test]
    fn test_zero_argument_entry_points() {
        let contracts = StakingContracts::default();
        let withdraw = contracts.withdraw();
        assert_eq!(withdraw.signature(), "Retiro()");
        assert_eq!(withdraw.calldata().len(), 4);
        assert_eq!(withdraw.to, contracts.staking);
        assert_eq!(contracts.claim().signature(), "CobroT()");
    }

    #[test]
    fn test_native_stake_carries_value() {
        let contracts = StakingContracts::default();
        let call = contracts.stake_native(U256::from(5u8));
        assert_eq!(call.signature(), "AddAvax()");
        assert_eq!(call.value, Some(U256::from(5u8)));
        assert!(call.args.is_empty());
    }

    #[test]
    fn test_token_stake_takes_units() {
        let contracts = StakingContracts::default();
        let call = contracts.stake_token(U256::from(7u8));
        assert_eq!(call.signature(), "AddToken(uint256)");
        assert_eq!(call.args, vec![CallArg::Uint(U256::from(7u8))]);
        assert_eq!(call.value, None);
    }

    #[test]
    fn test_symbol_matching_ignores_case() {
        let contracts = StakingContracts::default();
        assert!(contracts.is_stake_token(" aivt "));
        assert!(contracts.is_native_coin("Avax"));
        assert!(!contracts.is_stake_token("AVAX"));
    }

    #[test]
    fn test_config_defaults_fill_missing_fields() {
        let parsed: StakingContracts = serde_json::from_value(serde_json::json!({
            "token_symbol": "TST",
            "entry_points": {"claim": "Harvest"}
        }))
        .unwrap();
        assert_eq!(parsed.token_symbol, "TST");
        assert_eq!(parsed.staking, STAKING_CONTRACT);
        assert_eq!(parsed.entry_points.claim, "Harvest");
        assert_eq!(parsed.entry_points.withdraw, "Retiro");
    }
}
