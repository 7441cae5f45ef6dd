//! Ethereum JSON-RPC wallet backed by an unlocked node account

use std::str::FromStr;
use std::time::Duration;

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use serde_json::{Value, json};

use super::{TxHash, TxReceipt, Wallet, WalletError};
use crate::contracts::ContractCall;

/// EIP-1193 "user rejected request"
const USER_REJECTED_CODE: i64 = 4001;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Wallet that submits through `eth_sendTransaction` and polls receipts.
///
/// The node signs for `from`, so it must hold that account (a dev node, or a
/// signer proxy in front of a remote node).
pub struct RpcWallet {
    client: reqwest::Client,
    rpc_url: String,
    from: Option<Address>,
    poll_interval: Duration,
}

impl RpcWallet {
    pub fn new(rpc_url: impl Into<String>, from: Option<Address>) -> Self {
        Self {
            client: reqwest::Client::new(),
            rpc_url: rpc_url.into(),
            from,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    pub async fn block_number(&self) -> Result<u64, WalletError> {
        let result = self.rpc_call("eth_blockNumber", json!([])).await?;
        let raw = result
            .as_str()
            .ok_or_else(|| WalletError::Rpc("eth_blockNumber result was missing".to_string()))?;
        parse_hex_u64(raw, "eth_blockNumber")
    }

    /// The receipt, or `None` while the transaction is pending
    pub async fn transaction_receipt(
        &self,
        tx_hash: TxHash,
    ) -> Result<Option<TxReceipt>, WalletError> {
        let result = self
            .rpc_call("eth_getTransactionReceipt", json!([tx_hash.to_string()]))
            .await?;
        decode_receipt(tx_hash, &result)
    }

    async fn rpc_call(&self, method: &str, params: Value) -> Result<Value, WalletError> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });
        tracing::debug!(method, "rpc call");
        let value: Value = self
            .client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if let Some(error) = value.get("error") {
            return Err(error_from_rpc(method, error));
        }
        Ok(value.get("result").cloned().unwrap_or(Value::Null))
    }
}

#[async_trait]
impl Wallet for RpcWallet {
    fn connected_address(&self) -> Option<Address> {
        self.from
    }

    async fn submit_transaction(&self, call: &ContractCall) -> Result<TxHash, WalletError> {
        let from = self.from.ok_or(WalletError::NotConnected)?;
        let mut tx = json!({
            "from": from.to_string(),
            "to": call.to.to_string(),
            "data": format!("0x{}", hex::encode(call.calldata())),
        });
        if let Some(value) = call.value {
            tx["value"] = Value::String(format!("0x{value:x}"));
        }

        let result = self.rpc_call("eth_sendTransaction", json!([tx])).await?;
        let raw = result.as_str().ok_or_else(|| {
            WalletError::Rpc("eth_sendTransaction result was missing".to_string())
        })?;
        let tx_hash = TxHash::from_str(raw)
            .map_err(|e| WalletError::Rpc(format!("invalid transaction hash {raw:?}: {e}")))?;
        tracing::info!(%tx_hash, call = %call, "transaction submitted");
        Ok(tx_hash)
    }

    async fn wait_for_confirmations(
        &self,
        tx_hash: TxHash,
        depth: u64,
    ) -> Result<TxReceipt, WalletError> {
        loop {
            if let Some(receipt) = self.transaction_receipt(tx_hash).await? {
                if !receipt.success {
                    return Ok(receipt);
                }
                let latest = self.block_number().await?;
                if confirmations(latest, receipt.block_number) >= depth {
                    return Ok(receipt);
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// Blocks on top of and including the inclusion block
fn confirmations(latest: u64, included: u64) -> u64 {
    if latest < included {
        0
    } else {
        latest - included + 1
    }
}

fn error_from_rpc(method: &str, error: &Value) -> WalletError {
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    match error.get("code").and_then(Value::as_i64) {
        Some(USER_REJECTED_CODE) => WalletError::Rejected(message),
        _ => WalletError::Rpc(format!("{method} failed: {message}")),
    }
}

fn decode_receipt(tx_hash: TxHash, result: &Value) -> Result<Option<TxReceipt>, WalletError> {
    if result.is_null() {
        return Ok(None);
    }
    let Some(block) = result.get("blockNumber").and_then(Value::as_str) else {
        // Some nodes return a receipt stub before inclusion
        return Ok(None);
    };
    let block_number = parse_hex_u64(block, "blockNumber")?;
    let success = match result.get("status").and_then(Value::as_str) {
        Some(status) => parse_hex_u256(status, "status")? != U256::ZERO,
        // Pre-Byzantium receipts carry no status
        None => true,
    };
    Ok(Some(TxReceipt {
        tx_hash,
        block_number,
        success,
    }))
}

fn strip_hex_prefix<'a>(raw: &'a str, field: &str) -> Result<&'a str, WalletError> {
    let value = raw.trim();
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .ok_or_else(|| WalletError::Rpc(format!("{field} must be 0x-prefixed hex")))
}

fn parse_hex_u64(raw: &str, field: &str) -> Result<u64, WalletError> {
    let digits = strip_hex_prefix(raw, field)?;
    u64::from_str_radix(digits, 16)
        .map_err(|e| WalletError::Rpc(format!("failed to parse {field} as hex u64: {e}")))
}

fn parse_hex_u256(raw: &str, field: &str) -> Result<U256, WalletError> {
    let digits = strip_hex_prefix(raw, field)?;
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 16)
        .map_err(|e| WalletError::Rpc(format!("failed to parse {field} as hex: {e}")))
}
