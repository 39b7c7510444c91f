//! The two calls this core exposes to its collaborators: compatibility
//! scoring and guarded reply generation.

use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::EngineConfig;
use crate::conversation::Message;
use crate::database::CompanionDatabase;
use crate::matcher::{self, ScoreBreakdown};
use crate::persona::PersonaConfig;
use crate::profile::{AgeCohort, ProfileVector};
use crate::reply::{candidates, selector, LocaleSignalDetector, MessageClassifier};
use crate::scheduling::ReplySchedulingPolicy;

/// Facade wiring the stores, the scheduling policy and the pure reply
/// pipeline together.
///
/// The engine never samples wall time (`now` is always a parameter) and
/// owns a seedable RNG so reply selection can be made deterministic under
/// test with [`ReplyEngine::with_seed`].
pub struct ReplyEngine {
    db: Arc<CompanionDatabase>,
    policy: ReplySchedulingPolicy,
    classifier: MessageClassifier,
    rng: Mutex<StdRng>,
}

impl ReplyEngine {
    pub fn new(db: Arc<CompanionDatabase>, config: &EngineConfig) -> Self {
        Self::build(db, config, StdRng::from_entropy())
    }

    /// Engine with a fixed RNG seed. Selection becomes reproducible; every
    /// other behavior is identical to [`ReplyEngine::new`].
    pub fn with_seed(db: Arc<CompanionDatabase>, config: &EngineConfig, seed: u64) -> Self {
        Self::build(db, config, StdRng::seed_from_u64(seed))
    }

    fn build(db: Arc<CompanionDatabase>, config: &EngineConfig, rng: StdRng) -> Self {
        let detector = LocaleSignalDetector::with_default_lexicons()
            .with_lookback(config.locale_lookback_messages);
        Self {
            db,
            policy: ReplySchedulingPolicy::new(config.minimum_thinking_delay_secs),
            classifier: MessageClassifier::new(detector),
            rng: Mutex::new(rng),
        }
    }

    /// Score two stored profiles against each other. A missing profile
    /// record degrades to an empty vector: it scores zero, it does not
    /// error.
    pub fn compute_compatibility(
        &self,
        profile_a_id: &str,
        profile_b_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ScoreBreakdown> {
        if profile_a_id.trim().is_empty() || profile_b_id.trim().is_empty() {
            bail!("Profile ids must not be blank");
        }
        let a = self.load_profile_or_empty(profile_a_id)?;
        let b = self.load_profile_or_empty(profile_b_id)?;
        Ok(matcher::score(&a, &b, now))
    }

    /// Generate and append a reply if the scheduling policy and the store
    /// guard both allow it. `Ok(None)` means "not now": a duplicate
    /// trigger, a too-fresh message, or a conversation that disappeared
    /// mid-flight. Blank ids and a persona that is not a participant are
    /// caller bugs and fail fast.
    pub fn maybe_generate_reply(
        &self,
        conversation_id: &str,
        persona_id: &str,
        triggering_user_id: &str,
        now: DateTime<Utc>,
        forced: bool,
    ) -> Result<Option<Message>> {
        if conversation_id.trim().is_empty()
            || persona_id.trim().is_empty()
            || triggering_user_id.trim().is_empty()
        {
            bail!("Conversation, persona and user ids must not be blank");
        }

        let Some(state) = self.db.get_conversation(conversation_id)? else {
            // Deleted between trigger and load; an expected no-op.
            tracing::debug!("Conversation {} not found; skipping reply", conversation_id);
            return Ok(None);
        };
        if !state.has_participant(persona_id) {
            bail!(
                "Persona {} is not a participant of {}",
                persona_id,
                conversation_id
            );
        }
        if !state.has_participant(triggering_user_id) {
            bail!(
                "User {} is not a participant of {}",
                triggering_user_id,
                conversation_id
            );
        }

        if !self.policy.may_reply(&state, persona_id, now, forced) {
            return Ok(None);
        }
        let Some(inbound) = state.last_inbound(persona_id) else {
            return Ok(None);
        };

        let persona = self
            .db
            .get_persona(persona_id)?
            .unwrap_or_else(|| PersonaConfig::default_for(persona_id));

        let persona_profile = self.load_profile_or_empty(persona_id)?;
        let user_profile = self.load_profile_or_empty(triggering_user_id)?;
        let mut shared_facts = matcher::shared_value_facts(&persona_profile, &user_profile);
        shared_facts.extend(matcher::shared_content_facts(&persona_profile, &user_profile));

        let classification = self.classifier.classify(&inbound.text, &state);
        let turn_count = state.turn_count();
        let pool = candidates::generate(&classification, &persona, &shared_facts, turn_count);

        let text = {
            let mut rng = self
                .rng
                .lock()
                .map_err(|e| anyhow::anyhow!("Engine RNG poisoned: {}", e))?;
            selector::select(&pool, &classification, &persona, &state, turn_count, &mut *rng)
        };

        let reply = Message {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_string(),
            sender_id: persona_id.to_string(),
            text,
            sent_at: now,
            is_generated: true,
        };

        // The guard re-checks the reply condition atomically at append time;
        // a rejection here is the normal outcome of a concurrent duplicate
        // trigger.
        if !self.db.append_reply_if_unanswered(&reply)? {
            return Ok(None);
        }

        tracing::info!(
            "Persona {} replied in {} (turn {})",
            persona_id,
            conversation_id,
            turn_count + 1
        );
        Ok(Some(reply))
    }

    pub fn database(&self) -> &Arc<CompanionDatabase> {
        &self.db
    }

    fn load_profile_or_empty(&self, id: &str) -> Result<ProfileVector> {
        Ok(self
            .db
            .get_profile(id)?
            .unwrap_or_else(|| ProfileVector::empty(id, AgeCohort::EighteenToTwentyFour)))
    }
}
