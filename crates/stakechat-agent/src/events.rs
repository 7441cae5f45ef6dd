//! Session event types

use serde::{Deserialize, Serialize};
use stakechat_ai::ConversationTurn;

use crate::wallet::TxHash;

/// Which contract call a transaction carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    Approve,
    StakeToken,
    StakeNative,
    Withdraw,
    Claim,
}

impl TxKind {
    pub fn label(&self) -> &'static str {
        match self {
            TxKind::Approve => "approval",
            TxKind::StakeToken => "token stake",
            TxKind::StakeNative => "native stake",
            TxKind::Withdraw => "withdrawal",
            TxKind::Claim => "rewards claim",
        }
    }
}

/// Events emitted by the orchestrator; front-ends render from these
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A turn was appended to the history
    TurnAppended { turn: ConversationTurn },

    /// The advisory busy indicator changed
    BusyChanged { busy: bool },

    /// A transaction was accepted by the wallet
    TransactionSubmitted { kind: TxKind, tx_hash: TxHash },

    /// The approval reached the required depth
    ApprovalConfirmed { tx_hash: TxHash, block_number: u64 },

    /// The stake sequence moved to another state
    FlowChanged { state: String },

    /// Something failed; the matching assistant turn carries the user-facing text
    Error { message: String },
}
