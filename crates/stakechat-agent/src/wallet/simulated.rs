//! In-process wallet for dry runs

use std::collections::HashMap;
use std::time::Duration;

use alloy_primitives::{Address, keccak256};
use async_trait::async_trait;
use parking_lot::Mutex;

use super::{TxHash, TxReceipt, Wallet, WalletError};
use crate::contracts::ContractCall;

/// A submitted call and the block it landed in
#[derive(Debug, Clone)]
pub struct SimulatedTx {
    pub tx_hash: TxHash,
    pub call: ContractCall,
    pub block_number: u64,
}

#[derive(Default)]
struct ChainState {
    block_number: u64,
    nonce: u64,
    txs: Vec<SimulatedTx>,
    by_hash: HashMap<TxHash, usize>,
}

/// Wallet that never leaves the process.
///
/// Every submission is mined into the next block; blocks advance every
/// `block_time` while someone waits for confirmations.
pub struct SimulatedWallet {
    address: Option<Address>,
    block_time: Duration,
    chain: Mutex<ChainState>,
}

impl SimulatedWallet {
    /// Wallet sending from `address`; `None` refuses every submission
    pub fn new(address: Option<Address>) -> Self {
        Self {
            address,
            block_time: Duration::from_millis(500),
            chain: Mutex::new(ChainState::default()),
        }
    }

    pub fn with_block_time(mut self, block_time: Duration) -> Self {
        self.block_time = block_time;
        self
    }

    pub fn block_number(&self) -> u64 {
        self.chain.lock().block_number
    }

    /// Everything submitted so far, oldest first
    pub fn transactions(&self) -> Vec<SimulatedTx> {
        self.chain.lock().txs.clone()
    }
}

#[async_trait]
impl Wallet for SimulatedWallet {
    fn connected_address(&self) -> Option<Address> {
        self.address
    }

    async fn submit_transaction(&self, call: &ContractCall) -> Result<TxHash, WalletError> {
        let from = self.connected_address().ok_or(WalletError::NotConnected)?;
        let mut chain = self.chain.lock();
        chain.nonce += 1;
        chain.block_number += 1;

        let mut preimage = Vec::new();
        preimage.extend_from_slice(from.as_slice());
        preimage.extend_from_slice(&chain.nonce.to_be_bytes());
        preimage.extend_from_slice(&call.calldata());
        let tx_hash = keccak256(&preimage);

        let block_number = chain.block_number;
        let index = chain.txs.len();
        chain.txs.push(SimulatedTx {
            tx_hash,
            call: call.clone(),
            block_number,
        });
        chain.by_hash.insert(tx_hash, index);
        tracing::info!(%tx_hash, call = %call, block_number, "simulated transaction mined");
        Ok(tx_hash)
    }

    async fn wait_for_confirmations(
        &self,
        tx_hash: TxHash,
        depth: u64,
    ) -> Result<TxReceipt, WalletError> {
        let included = {
            let chain = self.chain.lock();
            let index = chain
                .by_hash
                .get(&tx_hash)
                .copied()
                .ok_or_else(|| WalletError::Rpc(format!("unknown transaction {tx_hash}")))?;
            chain.txs[index].block_number
        };
        let target = included + depth.saturating_sub(1);
        loop {
            {
                let mut chain = self.chain.lock();
                if chain.block_number >= target {
                    return Ok(TxReceipt {
                        tx_hash,
                        block_number: included,
                        success: true,
                    });
                }
                chain.block_number += 1;
            }
            tokio::time::sleep(self.block_time).await;
        }
    }
}
