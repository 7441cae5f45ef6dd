//! A cloneable handle for observing and tearing down a session.

use parking_lot::Mutex;
use stakechat_ai::ConversationTurn;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::conversation::Conversation;

/// A cloneable handle onto a running session.
///
/// All fields are `Arc`-wrapped, so cloning is cheap.
#[derive(Clone)]
pub struct SessionHandle {
    pub(crate) cancel: CancellationToken,
    pub(crate) conversation: Arc<Mutex<Conversation>>,
    pub(crate) idle_notify: Arc<Notify>,
    pub(crate) busy: Arc<AtomicBool>,
}

impl SessionHandle {
    pub(crate) fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            conversation: Arc::new(Mutex::new(Conversation::default())),
            idle_notify: Arc::new(Notify::new()),
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// End the session.
    ///
    /// The history is closed before the token is cancelled, so a continuation
    /// that wakes up in between still cannot append.
    pub fn teardown(&self) {
        self.conversation.lock().close();
        self.cancel.cancel();
        // Waiters must not hang on a session that will never settle
        self.idle_notify.notify_waiters();
    }

    pub fn is_live(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Token cancelled on teardown
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Snapshot of the history
    pub fn turns(&self) -> Vec<ConversationTurn> {
        self.conversation.lock().turns().to_vec()
    }

    /// Advisory busy indicator
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Returns the previous value
    pub(crate) fn set_busy(&self, busy: bool) -> bool {
        let was = self.busy.swap(busy, Ordering::AcqRel);
        if was && !busy {
            self.idle_notify.notify_waiters();
        }
        was
    }

    /// Wait until nothing is in flight (or the session is torn down).
    pub async fn wait_for_idle(&self) {
        loop {
            let notified = self.idle_notify.notified();
            if !self.is_busy() || !self.is_live() {
                return;
            }
            notified.await;
        }
    }

    /// Wait until idle, with a timeout.
    /// Returns `true` if idle was reached, `false` on timeout.
    pub async fn wait_for_idle_timeout(&self, timeout: std::time::Duration) -> bool {
        if !self.is_busy() {
            return true;
        }
        tokio::time::timeout(timeout, self.wait_for_idle())
            .await
            .is_ok()
    }
}
