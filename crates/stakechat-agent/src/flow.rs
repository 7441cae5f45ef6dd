//! Stake-token sequence state machine

use alloy_primitives::U256;
use std::fmt;
use thiserror::Error;

use crate::units::Amount;
use crate::wallet::TxHash;

/// An approval waiting to be followed by the stake call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingApproval {
    pub approval_tx: TxHash,
    /// Display form
    pub amount: Amount,
    /// Base units staged for the stake call
    pub amount_units: U256,
}

/// Where the single in-flight approve → stake sequence stands
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StakeFlow {
    #[default]
    Idle,
    /// Approval submitted, not yet confirmed
    AwaitingApproval(PendingApproval),
    /// Approval confirmed, stake call being submitted
    AwaitingStake(PendingApproval),
    /// Stake outcome known, bookkeeping in progress
    Settling,
}

impl StakeFlow {
    pub fn is_idle(&self) -> bool {
        matches!(self, StakeFlow::Idle)
    }

    /// The outstanding, unconfirmed approval
    pub fn pending_approval(&self) -> Option<&PendingApproval> {
        match self {
            StakeFlow::AwaitingApproval(pending) => Some(pending),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StakeFlow::Idle => "idle",
            StakeFlow::AwaitingApproval(_) => "awaiting approval",
            StakeFlow::AwaitingStake(_) => "awaiting stake",
            StakeFlow::Settling => "settling",
        }
    }
}

impl fmt::Display for StakeFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StakeFlow::AwaitingApproval(p) | StakeFlow::AwaitingStake(p) => {
                write!(f, "{} ({} via {})", self.label(), p.amount, p.approval_tx)
            }
            _ => f.write_str(self.label()),
        }
    }
}

/// Inputs that move the sequence forward
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowEvent {
    ApprovalSubmitted(PendingApproval),
    ApprovalConfirmed,
    StakeFinished,
    Settled,
    /// Give up from any non-idle state
    Abandoned,
}

impl FlowEvent {
    fn name(&self) -> &'static str {
        match self {
            FlowEvent::ApprovalSubmitted(_) => "approval_submitted",
            FlowEvent::ApprovalConfirmed => "approval_confirmed",
            FlowEvent::StakeFinished => "stake_finished",
            FlowEvent::Settled => "settled",
            FlowEvent::Abandoned => "abandoned",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid stake flow transition from {from} on {event}")]
pub struct TransitionError {
    pub from: &'static str,
    pub event: &'static str,
}

pub fn transition(current: &StakeFlow, event: FlowEvent) -> Result<StakeFlow, TransitionError> {
    match (current, event) {
        (StakeFlow::Idle, FlowEvent::ApprovalSubmitted(pending)) => {
            Ok(StakeFlow::AwaitingApproval(pending))
        }
        (StakeFlow::AwaitingApproval(pending), FlowEvent::ApprovalConfirmed) => {
            Ok(StakeFlow::AwaitingStake(pending.clone()))
        }
        (StakeFlow::AwaitingStake(_), FlowEvent::StakeFinished) => Ok(StakeFlow::Settling),
        (StakeFlow::Settling, FlowEvent::Settled) => Ok(StakeFlow::Idle),
        (state, FlowEvent::Abandoned) if !state.is_idle() => Ok(StakeFlow::Idle),
        (state, event) => Err(TransitionError {
            from: state.label(),
            event: event.name(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> PendingApproval {
        PendingApproval {
            approval_tx: TxHash::repeat_byte(1),
            amount: "50".parse().unwrap(),
            amount_units: U256::from(50u8),
        }
    }

    #[test]
    fn test_happy_path() {
        let s = transition(&StakeFlow::Idle, FlowEvent::ApprovalSubmitted(pending())).unwrap();
        assert_eq!(s.pending_approval(), Some(&pending()));
        let s = transition(&s, FlowEvent::ApprovalConfirmed).unwrap();
        assert!(matches!(s, StakeFlow::AwaitingStake(_)));
        assert_eq!(s.pending_approval(), None);
        let s = transition(&s, FlowEvent::StakeFinished).unwrap();
        assert_eq!(s, StakeFlow::Settling);
        let s = transition(&s, FlowEvent::Settled).unwrap();
        assert!(s.is_idle());
    }

    #[test]
    fn test_second_approval_is_rejected() {
        let s = StakeFlow::AwaitingApproval(pending());
        let err = transition(&s, FlowEvent::ApprovalSubmitted(pending())).unwrap_err();
        assert_eq!(err.from, "awaiting approval");
        assert_eq!(err.event, "approval_submitted");
    }

    #[test]
    fn test_abandon_from_any_busy_state() {
        for state in [
            StakeFlow::AwaitingApproval(pending()),
            StakeFlow::AwaitingStake(pending()),
            StakeFlow::Settling,
        ] {
            assert_eq!(transition(&state, FlowEvent::Abandoned).unwrap(), StakeFlow::Idle);
        }
        assert!(transition(&StakeFlow::Idle, FlowEvent::Abandoned).is_err());
    }

    #[test]
    fn test_confirmation_out_of_order() {
        assert!(transition(&StakeFlow::Idle, FlowEvent::ApprovalConfirmed).is_err());
        assert!(transition(&StakeFlow::Settling, FlowEvent::StakeFinished).is_err());
    }

    #[test]
    fn test_display_mentions_amount() {
        let text = StakeFlow::AwaitingApproval(pending()).to_string();
        assert!(text.starts_with("awaiting approval (50 via 0x0101"));
    }
}
