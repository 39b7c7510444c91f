use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single message in a two-party thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub text: String,
    pub sent_at: DateTime<Utc>,
    pub is_generated: bool,
}

/// An in-memory snapshot of a conversation: exactly two participants and an
/// append-only, time-ordered message sequence. Everything else the reply
/// pipeline needs (turn count, last inbound message, locale lock,
/// anti-repetition window) is derived from this snapshot, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    pub id: String,
    pub participant_ids: [String; 2],
    pub messages: Vec<Message>,
}

impl ConversationState {
    /// Canonical key for a participant pair: the sorted pair, so the key is
    /// independent of who opened the conversation.
    pub fn conversation_key(a: &str, b: &str) -> String {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        format!("{}:{}", first, second)
    }

    pub fn turn_count(&self) -> usize {
        self.messages.len()
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn has_participant(&self, id: &str) -> bool {
        self.participant_ids.iter().any(|p| p == id)
    }

    /// The other side of the thread from `id`, if `id` is a participant.
    pub fn counterpart_of(&self, id: &str) -> Option<&str> {
        match &self.participant_ids {
            [a, b] if a == id => Some(b.as_str()),
            [a, b] if b == id => Some(a.as_str()),
            _ => None,
        }
    }

    /// The most recent message not sent by `persona_id`, i.e. the message a
    /// reply would be answering.
    pub fn last_inbound(&self, persona_id: &str) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.sender_id != persona_id)
    }

    /// The persona's most recent generated texts, newest first, capped at
    /// `limit`. Feeds the selector's anti-repetition filter.
    pub fn recent_generated_texts(&self, persona_id: &str, limit: usize) -> Vec<&str> {
        self.messages
            .iter()
            .rev()
            .filter(|m| m.is_generated && m.sender_id == persona_id)
            .take(limit)
            .map(|m| m.text.as_str())
            .collect()
    }
}
