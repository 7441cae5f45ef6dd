//! Error types for stakechat-agent

use thiserror::Error;

use crate::flow::TransitionError;
use crate::units::AmountError;
use crate::wallet::WalletError;

/// Result type alias using stakechat-agent Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running a session
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the agent API layer
    #[error(transparent)]
    Ai(#[from] stakechat_ai::Error),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Amount(#[from] AmountError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// The session was torn down
    #[error("session closed")]
    SessionClosed,

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the wallet refused or is missing, as opposed to a chain failure
    pub fn is_wallet_unavailable(&self) -> bool {
        matches!(
            self,
            Error::Wallet(WalletError::NotConnected | WalletError::Rejected(_))
        )
    }
}
