//! Wallet collaborator: submits contract calls and watches for confirmations

pub mod rpc;
pub mod simulated;

use std::time::Duration;

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::contracts::ContractCall;

pub use rpc::RpcWallet;
pub use simulated::SimulatedWallet;

/// Transaction handle
pub type TxHash = B256;

/// Inclusion details of a mined transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    /// False when the transaction reverted
    pub success: bool,
}

/// Errors raised by wallets
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("no wallet connected")]
    NotConnected,

    /// The user (or signer) declined the transaction
    #[error("transaction rejected: {0}")]
    Rejected(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("transaction {0} reverted")]
    Reverted(TxHash),

    #[error("no confirmation after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Capability interface over a connected wallet.
///
/// Chain selection, signing and transport are the implementation's concern.
#[async_trait]
pub trait Wallet: Send + Sync {
    /// The connected account, if any
    fn connected_address(&self) -> Option<Address>;

    /// Sign and broadcast a contract call, returning its hash once accepted
    async fn submit_transaction(&self, call: &ContractCall) -> Result<TxHash, WalletError>;

    /// Resolve once `tx_hash` is buried under `depth` blocks (its own block counts as one).
    ///
    /// A reverted transaction resolves immediately with `success == false`.
    async fn wait_for_confirmations(
        &self,
        tx_hash: TxHash,
        depth: u64,
    ) -> Result<TxReceipt, WalletError>;
}
