//! Mock collaborators for orchestrator tests

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use alloy_primitives::Address;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use stakechat_ai::{AgentApi, AgentRequest, AgentResponse};
use tokio::sync::Notify;

use crate::contracts::ContractCall;
use crate::wallet::{TxHash, TxReceipt, Wallet, WalletError};

/// Agent that replays queued responses and records every request.
#[derive(Default)]
pub struct MockAgent {
    responses: Mutex<VecDeque<stakechat_ai::Result<AgentResponse>>>,
    requests: Mutex<Vec<AgentRequest>>,
}

impl MockAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, value: Value) -> Self {
        self.responses
            .lock()
            .push_back(Ok(AgentResponse::from_value(value)));
        self
    }

    pub fn fail(self, error: stakechat_ai::Error) -> Self {
        self.responses.lock().push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<AgentRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl AgentApi for MockAgent {
    async fn ask(&self, request: &AgentRequest) -> stakechat_ai::Result<AgentResponse> {
        self.requests.lock().push(request.clone());
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(AgentResponse::Unrecognized(Value::Null)))
    }
}

/// Wallet that records calls; confirmations can be held behind a gate.
pub struct MockWallet {
    address: Mutex<Option<Address>>,
    calls: Mutex<Vec<ContractCall>>,
    depths: Mutex<Vec<u64>>,
    failing: Mutex<HashSet<String>>,
    gate: Option<Arc<Notify>>,
    receipt_success: AtomicBool,
    nonce: AtomicU8,
}

impl MockWallet {
    pub fn connected() -> Self {
        Self {
            address: Mutex::new(Some(Address::repeat_byte(0x42))),
            calls: Mutex::new(Vec::new()),
            depths: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            gate: None,
            receipt_success: AtomicBool::new(true),
            nonce: AtomicU8::new(0),
        }
    }

    pub fn disconnected() -> Self {
        let wallet = Self::connected();
        wallet.set_connected(None);
        wallet
    }

    /// Confirmations resolve only after [`MockWallet::release`]
    pub fn held(mut self) -> Self {
        self.gate = Some(Arc::new(Notify::new()));
        self
    }

    /// Let one held confirmation through
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn set_connected(&self, address: Option<Address>) {
        *self.address.lock() = address;
    }

    /// Submissions of `function` fail with a user rejection
    pub fn reject(&self, function: &str) {
        self.failing.lock().insert(function.to_string());
    }

    /// Confirmed receipts report a revert
    pub fn revert_all(&self) {
        self.receipt_success.store(false, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<ContractCall> {
        self.calls.lock().clone()
    }

    /// Depth passed to each confirmation wait, in call order
    pub fn requested_depths(&self) -> Vec<u64> {
        self.depths.lock().clone()
    }

    pub fn functions(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.function.clone()).collect()
    }
}

#[async_trait]
impl Wallet for MockWallet {
    fn connected_address(&self) -> Option<Address> {
        *self.address.lock()
    }

    async fn submit_transaction(&self, call: &ContractCall) -> Result<TxHash, WalletError> {
        if self.connected_address().is_none() {
            return Err(WalletError::NotConnected);
        }
        if self.failing.lock().contains(&call.function) {
            return Err(WalletError::Rejected("User denied transaction signature".into()));
        }
        self.calls.lock().push(call.clone());
        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(TxHash::with_last_byte(nonce))
    }

    async fn wait_for_confirmations(
        &self,
        tx_hash: TxHash,
        depth: u64,
    ) -> Result<TxReceipt, WalletError> {
        self.depths.lock().push(depth);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        Ok(TxReceipt {
            tx_hash,
            block_number: 7,
            success: self.receipt_success.load(Ordering::SeqCst),
        })
    }
}
