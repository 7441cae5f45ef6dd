//! Session orchestration: agent round-trips, intent dispatch and the
//! approve → stake sequence

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::Address;
use stakechat_ai::{AgentApi, AgentRequest, ConversationTurn};
use tokio::sync::broadcast;

use crate::{
    contracts::{ContractCall, StakingContracts},
    error::{Error, Result},
    events::{SessionEvent, TxKind},
    flow::{FlowEvent, PendingApproval, StakeFlow, transition},
    handle::SessionHandle,
    intent::{ActionKind, Classification, StakeIntent, classify},
    units::Amount,
    wallet::{TxHash, Wallet, WalletError},
};

/// Shown when the agent could not be reached or answered garbage
pub const AGENT_UNAVAILABLE: &str = "Could not get a response from the agent. Please try again.";

pub const DEFAULT_CONFIRMATION_DEPTH: u64 = 2;
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(300);

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub contracts: StakingContracts,
    /// Blocks the approval must be buried under before staking
    pub confirmation_depth: u64,
    /// Deadline for the approval confirmation
    pub confirmation_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            contracts: StakingContracts::default(),
            confirmation_depth: DEFAULT_CONFIRMATION_DEPTH,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
        }
    }
}

/// What a successful dispatch left behind
enum Outcome {
    /// Nothing further to do
    Done(String),
    /// Approval accepted; the stake follows once it confirms
    AwaitingApproval(PendingApproval),
}

/// Everything that keeps the session busy
#[derive(Debug, Default)]
struct Activity {
    /// Submissions and dispatches currently running
    in_flight: usize,
    /// Held from approval submission until the stake sequence settles
    stake_reserved: bool,
}

impl Activity {
    fn is_busy(&self) -> bool {
        self.in_flight > 0 || self.stake_reserved
    }
}

struct Inner {
    config: OrchestratorConfig,
    agent: Arc<dyn AgentApi>,
    wallet: Arc<dyn Wallet>,
    flow: Mutex<StakeFlow>,
    last_action: Mutex<Option<ActionKind>>,
    activity: Mutex<Activity>,
    event_tx: broadcast::Sender<SessionEvent>,
    handle: SessionHandle,
}

/// Drives one chat session.
///
/// Cloning is cheap and every clone drives the same session.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        agent: Arc<dyn AgentApi>,
        wallet: Arc<dyn Wallet>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(Inner {
                config,
                agent,
                wallet,
                flow: Mutex::new(StakeFlow::Idle),
                last_action: Mutex::new(None),
                activity: Mutex::new(Activity::default()),
                event_tx,
                handle: SessionHandle::new(),
            }),
        }
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.event_tx.subscribe()
    }

    pub fn handle(&self) -> SessionHandle {
        self.inner.handle.clone()
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.inner.config
    }

    pub fn turns(&self) -> Vec<ConversationTurn> {
        self.inner.handle.turns()
    }

    /// Current stake sequence state
    pub fn flow(&self) -> StakeFlow {
        self.inner.flow.lock().clone()
    }

    pub fn wallet_address(&self) -> Option<Address> {
        self.inner.wallet.connected_address()
    }

    pub fn is_busy(&self) -> bool {
        self.inner.handle.is_busy()
    }

    /// Tear the session down, returning the stake that was still waiting for
    /// its approval, if any. Pending continuations will not run.
    pub fn teardown(&self) -> Option<PendingApproval> {
        let pending = self.inner.flow.lock().pending_approval().cloned();
        self.inner.handle.teardown();
        // The watcher exits without settling, so nothing else frees the slot
        self.inner.update_activity(|a| a.stake_reserved = false);
        if let Some(pending) = &pending {
            tracing::warn!(tx = %pending.approval_tx, "session torn down with a stake pending");
        }
        pending
    }

    /// Send one user prompt to the agent and act on the reply.
    ///
    /// Returns the intent that was dispatched. Failures surface as assistant
    /// turns; only a torn-down session is an error.
    pub async fn submit(&self, prompt: &str) -> Result<StakeIntent> {
        let inner = &self.inner;
        if !inner.handle.is_live() {
            return Err(Error::SessionClosed);
        }
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Ok(StakeIntent::None);
        }
        let _guard = InFlight::enter(inner);

        let address = inner
            .wallet
            .connected_address()
            .map(|a| a.to_string())
            .unwrap_or_default();
        let request = AgentRequest::new(prompt, address, inner.handle.turns());
        inner.append(ConversationTurn::user(prompt));
        tracing::debug!(prompt, history = request.messages.len(), "asking agent");

        let cancel = inner.handle.cancel_token();
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::SessionClosed),
            response = inner.agent.ask(&request) => response,
        };
        let response = match response {
            Ok(response) => response,
            Err(error) => {
                if error.is_transport() {
                    tracing::warn!(%error, "agent unreachable");
                } else {
                    tracing::warn!(%error, "agent call failed");
                }
                inner.append(ConversationTurn::assistant(AGENT_UNAVAILABLE));
                inner.emit(SessionEvent::Error {
                    message: Error::from(error).to_string(),
                });
                return Ok(StakeIntent::None);
            }
        };

        let hint = *inner.last_action.lock();
        let Classification { intent, answer } = classify(&response, hint, &inner.config.contracts);
        tracing::debug!(?intent, ?hint, "classified agent response");
        if let Some(answer) = answer {
            inner.append(ConversationTurn::assistant(answer));
        }
        *inner.last_action.lock() = intent.kind();

        self.dispatch(intent.clone()).await;
        Ok(intent)
    }

    /// Execute an intent against the wallet.
    ///
    /// Appends exactly one assistant turn for any action-bearing intent. A
    /// token stake appends its follow-up turn when the approval settles.
    pub async fn dispatch(&self, intent: StakeIntent) {
        let Some(kind) = intent.kind() else {
            return;
        };
        let inner = &self.inner;
        let _guard = InFlight::enter(inner);

        match self.execute(&intent).await {
            Ok(Outcome::Done(message)) => {
                inner.append(ConversationTurn::assistant(message));
            }
            Ok(Outcome::AwaitingApproval(pending)) => {
                inner.append(ConversationTurn::assistant(format!(
                    "Approval submitted for {} {} (tx {}). Waiting for {} confirmations before staking.",
                    pending.amount,
                    inner.config.contracts.token_symbol,
                    pending.approval_tx,
                    inner.config.confirmation_depth,
                )));
                let this = self.clone();
                tokio::spawn(async move { this.watch_approval(pending).await });
            }
            Err(error) => {
                if error.is_wallet_unavailable() {
                    tracing::info!(?kind, %error, "dispatch refused");
                } else {
                    tracing::warn!(?kind, %error, "dispatch failed");
                }
                inner.fail(failure_text(&intent, &inner.config.contracts, &error));
            }
        }
    }

    async fn execute(&self, intent: &StakeIntent) -> Result<Outcome> {
        let inner = &self.inner;
        let contracts = &inner.config.contracts;

        let units = match intent.amount() {
            Some(amount) => Some(amount.to_stake_units(contracts.decimals)?),
            None => None,
        };
        if inner.wallet.connected_address().is_none() {
            return Err(WalletError::NotConnected.into());
        }

        match (intent, units) {
            (StakeIntent::StakeToken(amount), Some(units)) => {
                let reserved = inner.update_activity(|a| !std::mem::replace(&mut a.stake_reserved, true));
                if !reserved {
                    return Err(Error::Other(
                        "another token stake is still pending, wait for it to finish".to_string(),
                    ));
                }

                let approval = inner.submit_tx(TxKind::Approve, &contracts.approve(units)).await;
                let pending = approval.and_then(|approval_tx| {
                    let pending = PendingApproval {
                        approval_tx,
                        amount: *amount,
                        amount_units: units,
                    };
                    inner.advance(FlowEvent::ApprovalSubmitted(pending.clone()))?;
                    Ok(pending)
                });
                if pending.is_err() {
                    inner.release_stake();
                }
                pending.map(Outcome::AwaitingApproval)
            }
            (StakeIntent::StakeNative(amount), Some(units)) => {
                let tx = inner
                    .submit_tx(TxKind::StakeNative, &contracts.stake_native(units))
                    .await?;
                Ok(Outcome::Done(format!(
                    "Stake of {amount} {} submitted (tx {tx}).",
                    contracts.native_symbol
                )))
            }
            (StakeIntent::Withdraw, _) => {
                let tx = inner.submit_tx(TxKind::Withdraw, &contracts.withdraw()).await?;
                Ok(Outcome::Done(format!("Withdrawal submitted (tx {tx}).")))
            }
            (StakeIntent::Claim, _) => {
                let tx = inner.submit_tx(TxKind::Claim, &contracts.claim()).await?;
                Ok(Outcome::Done(format!("Rewards claim submitted (tx {tx}).")))
            }
            (intent, _) => Err(Error::Other(format!("nothing to execute for {intent:?}"))),
        }
    }

    /// Wait for the approval, then stake. Runs detached from the submission.
    async fn watch_approval(self, pending: PendingApproval) {
        let inner = &self.inner;
        let contracts = &inner.config.contracts;
        let cancel = inner.handle.cancel_token();
        let deadline = inner.config.confirmation_timeout;

        let waited = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::warn!(tx = %pending.approval_tx, "session closed before approval confirmed, stake dropped");
                return;
            }
            waited = tokio::time::timeout(
                deadline,
                inner.wallet.wait_for_confirmations(pending.approval_tx, inner.config.confirmation_depth),
            ) => waited,
        };
        if !inner.handle.is_live() {
            tracing::warn!(tx = %pending.approval_tx, "session closed during confirmation, stake dropped");
            return;
        }

        let receipt = match waited {
            Err(_) => Err(WalletError::Timeout(deadline)),
            Ok(Ok(receipt)) if !receipt.success => Err(WalletError::Reverted(receipt.tx_hash)),
            Ok(result) => result,
        };
        let receipt = match receipt {
            Ok(receipt) => receipt,
            Err(error) => {
                inner.abandon(&pending, error.into());
                return;
            }
        };
        tracing::info!(tx = %receipt.tx_hash, block = receipt.block_number, "approval confirmed");
        inner.emit(SessionEvent::ApprovalConfirmed {
            tx_hash: receipt.tx_hash,
            block_number: receipt.block_number,
        });
        if let Err(error) = inner.advance(FlowEvent::ApprovalConfirmed) {
            inner.abandon(&pending, error);
            return;
        }
        if inner.wallet.connected_address().is_none() {
            inner.abandon(&pending, WalletError::NotConnected.into());
            return;
        }

        let call = contracts.stake_token(pending.amount_units);
        let staked = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::warn!(tx = %pending.approval_tx, "session closed while staking");
                return;
            }
            staked = inner.submit_tx(TxKind::StakeToken, &call) => staked,
        };

        if let Err(error) = inner.advance(FlowEvent::StakeFinished) {
            tracing::warn!(%error, "stake flow out of step");
        }
        match staked {
            Ok(tx) => {
                // Report what the units actually carry once extra digits were floored
                let staked = Amount::from_base_units(pending.amount_units, contracts.decimals)
                    .unwrap_or(pending.amount);
                inner.append(ConversationTurn::assistant(format!(
                    "Staked {staked} {} (tx {tx}).",
                    contracts.token_symbol
                )));
            }
            Err(error) => {
                tracing::warn!(%error, "token stake failed");
                inner.fail(format!(
                    "Approval confirmed, but staking {} {} failed: {error}",
                    pending.amount, contracts.token_symbol
                ));
            }
        }
        if let Err(error) = inner.advance(FlowEvent::Settled) {
            tracing::warn!(%error, "stake flow out of step");
        }
        inner.release_stake();
    }
}

impl Inner {
    fn emit(&self, event: SessionEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Append to history unless the session is closed
    fn append(&self, turn: ConversationTurn) -> bool {
        let appended = self.handle.conversation.lock().push(turn.clone());
        if appended {
            self.emit(SessionEvent::TurnAppended { turn });
        }
        appended
    }

    /// The single assistant turn reporting a failure
    fn fail(&self, message: String) {
        if self.append(ConversationTurn::assistant(message.clone())) {
            self.emit(SessionEvent::Error { message });
        }
    }

    fn advance(&self, event: FlowEvent) -> Result<()> {
        let next = {
            let mut flow = self.flow.lock();
            let next = transition(&flow, event)?;
            *flow = next.clone();
            next
        };
        tracing::debug!(state = %next, "stake flow changed");
        self.emit(SessionEvent::FlowChanged {
            state: next.label().to_string(),
        });
        Ok(())
    }

    fn abandon(&self, pending: &PendingApproval, error: Error) {
        tracing::warn!(tx = %pending.approval_tx, %error, "stake abandoned");
        if let Err(error) = self.advance(FlowEvent::Abandoned) {
            tracing::warn!(%error, "stake flow out of step");
        }
        self.fail(format!(
            "Staking {} {} was not completed: {error}",
            pending.amount, self.config.contracts.token_symbol
        ));
        self.release_stake();
    }

    async fn submit_tx(&self, kind: TxKind, call: &ContractCall) -> Result<TxHash> {
        tracing::debug!(kind = kind.label(), %call, "submitting transaction");
        let tx_hash = self.wallet.submit_transaction(call).await?;
        tracing::info!(kind = kind.label(), %tx_hash, "transaction submitted");
        self.emit(SessionEvent::TransactionSubmitted { kind, tx_hash });
        Ok(tx_hash)
    }

    fn release_stake(&self) {
        self.update_activity(|a| a.stake_reserved = false);
    }

    /// Mutate the activity and publish the resulting busy flag under one lock
    fn update_activity<R>(&self, f: impl FnOnce(&mut Activity) -> R) -> R {
        let mut activity = self.activity.lock();
        let result = f(&mut activity);
        let busy = activity.is_busy();
        if self.handle.set_busy(busy) != busy {
            self.emit(SessionEvent::BusyChanged { busy });
        }
        result
    }
}

/// Marks one submission or dispatch as in flight for its lifetime
struct InFlight<'a>(&'a Inner);

impl<'a> InFlight<'a> {
    fn enter(inner: &'a Inner) -> Self {
        inner.update_activity(|a| a.in_flight += 1);
        Self(inner)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.update_activity(|a| a.in_flight -= 1);
    }
}

fn failure_text(intent: &StakeIntent, contracts: &StakingContracts, error: &Error) -> String {
    match intent {
        StakeIntent::StakeToken(amount) => {
            format!("Could not stake {amount} {}: {error}", contracts.token_symbol)
        }
        StakeIntent::StakeNative(amount) => {
            format!("Could not stake {amount} {}: {error}", contracts.native_symbol)
        }
        StakeIntent::Withdraw => format!("Could not withdraw: {error}"),
        StakeIntent::Claim => format!("Could not claim rewards: {error}"),
        StakeIntent::None => error.to_string(),
    }
}
