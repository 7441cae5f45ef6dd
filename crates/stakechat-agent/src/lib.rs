//! stakechat-agent: Chat-driven staking orchestrator
//!
//! Classifies each agent reply into a staking intent and drives the matching
//! contract calls through a wallet, keeping an append-only conversation log.

pub mod contracts;
pub mod conversation;
pub mod error;
pub mod events;
pub mod flow;
pub mod handle;
pub mod intent;
pub mod orchestrator;
pub mod units;
pub mod wallet;

#[cfg(test)]
mod testing;

pub use contracts::{CallArg, ContractCall, EntryPoints, StakingContracts};
pub use conversation::Conversation;
pub use error::{Error, Result};
pub use events::{SessionEvent, TxKind};
pub use flow::{FlowEvent, PendingApproval, StakeFlow, TransitionError};
pub use handle::SessionHandle;
pub use intent::{ActionKind, Classification, StakeIntent, classify};
pub use orchestrator::{
    AGENT_UNAVAILABLE, DEFAULT_CONFIRMATION_DEPTH, DEFAULT_CONFIRMATION_TIMEOUT, Orchestrator,
    OrchestratorConfig,
};
pub use units::{Amount, AmountError, TOKEN_DECIMALS};
pub use wallet::{RpcWallet, SimulatedWallet, TxHash, TxReceipt, Wallet, WalletError};
