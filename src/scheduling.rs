//! When a reply *may* be produced, never what the reply is.
//!
//! A conversation cycles between two derived states for its whole life:
//! AwaitingReply (last message from the other participant) and Settled (last
//! message from the persona, or no messages yet). The policy is pure; the
//! store guard re-checks the same condition atomically at append time.

use chrono::{DateTime, Duration, Utc};

use crate::conversation::ConversationState;

/// Default minimum age of the last inbound message before the poll path may
/// answer it. Distinct from a persona's `reply_delay_bounds`, which only
/// delays when an already-approved reply is surfaced.
pub const MINIMUM_THINKING_DELAY_SECS: u64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyPhase {
    /// The other participant spoke last; a reply is owed.
    AwaitingReply,
    /// The persona spoke last (or nobody has); nothing to do.
    Settled,
}

#[derive(Debug, Clone, Copy)]
pub struct ReplySchedulingPolicy {
    minimum_thinking_delay: Duration,
}

impl ReplySchedulingPolicy {
    pub fn new(minimum_thinking_delay_secs: u64) -> Self {
        Self {
            minimum_thinking_delay: Duration::seconds(minimum_thinking_delay_secs as i64),
        }
    }

    pub fn phase(state: &ConversationState, persona_id: &str) -> ReplyPhase {
        match state.last_message() {
            Some(last) if last.sender_id != persona_id => ReplyPhase::AwaitingReply,
            _ => ReplyPhase::Settled,
        }
    }

    /// Whether a reply may be emitted right now. `forced` bypasses the
    /// thinking delay but never the phase check, which is what keeps the
    /// forced and periodic paths from double-replying.
    pub fn may_reply(
        &self,
        state: &ConversationState,
        persona_id: &str,
        now: DateTime<Utc>,
        forced: bool,
    ) -> bool {
        if Self::phase(state, persona_id) != ReplyPhase::AwaitingReply {
            return false;
        }
        if forced {
            return true;
        }
        match state.last_message() {
            Some(last) => now - last.sent_at >= self.minimum_thinking_delay,
            None => false,
        }
    }
}

impl Default for ReplySchedulingPolicy {
    fn default() -> Self {
        Self::new(MINIMUM_THINKING_DELAY_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Message;
    use chrono::TimeZone;

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn state_ending_with(sender: &str) -> ConversationState {
        ConversationState {
            id: "c-1".to_string(),
            participant_ids: ["bot-1".to_string(), "user-1".to_string()],
            messages: vec![Message {
                id: "m-1".to_string(),
                conversation_id: "c-1".to_string(),
                sender_id: sender.to_string(),
                text: "hello".to_string(),
                sent_at: base_time(),
                is_generated: sender == "bot-1",
            }],
        }
    }

    #[test]
    fn phase_derives_from_last_sender() {
        let awaiting = state_ending_with("user-1");
        assert_eq!(
            ReplySchedulingPolicy::phase(&awaiting, "bot-1"),
            ReplyPhase::AwaitingReply
        );

        let settled = state_ending_with("bot-1");
        assert_eq!(
            ReplySchedulingPolicy::phase(&settled, "bot-1"),
            ReplyPhase::Settled
        );

        let empty = ConversationState {
            id: "c-1".to_string(),
            participant_ids: ["bot-1".to_string(), "user-1".to_string()],
            messages: Vec::new(),
        };
        assert_eq!(
            ReplySchedulingPolicy::phase(&empty, "bot-1"),
            ReplyPhase::Settled
        );
    }

    #[test]
    fn poll_path_waits_out_the_thinking_delay() {
        let policy = ReplySchedulingPolicy::default();
        let state = state_ending_with("user-1");

        let too_soon = base_time() + Duration::seconds(5);
        assert!(!policy.may_reply(&state, "bot-1", too_soon, false));

        let ready = base_time() + Duration::seconds(MINIMUM_THINKING_DELAY_SECS as i64);
        assert!(policy.may_reply(&state, "bot-1", ready, false));
    }

    #[test]
    fn forced_path_bypasses_delay_but_not_phase() {
        let policy = ReplySchedulingPolicy::default();

        let awaiting = state_ending_with("user-1");
        let immediately = base_time();
        assert!(policy.may_reply(&awaiting, "bot-1", immediately, true));

        let settled = state_ending_with("bot-1");
        assert!(!policy.may_reply(&settled, "bot-1", immediately, true));
        assert!(!policy.may_reply(
            &settled,
            "bot-1",
            base_time() + Duration::hours(1),
            false
        ));
    }
}
