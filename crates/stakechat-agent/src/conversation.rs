//! Append-only conversation history

use stakechat_ai::ConversationTurn;

/// Ordered conversation log.
///
/// Insertion order is display and causal order. Once closed (session torn
/// down) further appends are refused.
#[derive(Debug, Default)]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
    closed: bool,
}

impl Conversation {
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// Append a turn. Returns false (and drops the turn) when closed.
    pub fn push(&mut self, turn: ConversationTurn) -> bool {
        if self.closed {
            tracing::debug!(content = turn.content(), "conversation closed, dropping turn");
            return false;
        }
        self.turns.push(turn);
        true
    }

    pub fn close(&mut self) {
        self.closed = true;
    }
}
