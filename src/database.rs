use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::sync::Mutex;

use crate::conversation::{ConversationState, Message};
use crate::persona::PersonaConfig;
use crate::profile::{AgeCohort, EducationLevel, ProfileVector};

/// SQLite-backed Profile Store and Conversation Store.
///
/// The reply engine treats profiles as read-only and conversations as
/// append-only; [`CompanionDatabase::append_reply_if_unanswered`] is the one
/// compare-and-append guard that makes concurrent reply triggers safe.
pub struct CompanionDatabase {
    conn: Mutex<Connection>,
}

impl CompanionDatabase {
    /// Helper to lock the connection
    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Database lock poisoned: {}", e))
    }

    /// Create or open the database
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.ensure_schema()?;
        Ok(db)
    }

    fn ensure_schema(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS profiles (
                id TEXT PRIMARY KEY,
                age_cohort TEXT NOT NULL,
                value_answers TEXT NOT NULL DEFAULT '[]',
                content_answers TEXT NOT NULL DEFAULT '[]',
                education TEXT,
                occupation TEXT,
                lifestyle TEXT NOT NULL DEFAULT '[]',
                social_links TEXT NOT NULL DEFAULT '[]',
                verified INTEGER NOT NULL DEFAULT 0,
                last_active_at TEXT,
                updated_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS personas (
                id TEXT PRIMARY KEY,
                config_json TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                participant_a TEXT NOT NULL,
                participant_b TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                conversation_id TEXT NOT NULL,
                sender_id TEXT NOT NULL,
                content TEXT NOT NULL,
                sent_at TEXT NOT NULL,
                is_generated INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_messages_conversation
                ON messages(conversation_id, sent_at);",
        )?;
        Ok(())
    }

    // ========================================================================
    // Profile store
    // ========================================================================

    pub fn save_profile(&self, profile: &ProfileVector) -> Result<()> {
        if profile.id.trim().is_empty() {
            bail!("Profile id must not be blank");
        }
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO profiles
             (id, age_cohort, value_answers, content_answers, education, occupation,
              lifestyle, social_links, verified, last_active_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                profile.id,
                profile.age_cohort.as_db_str(),
                serde_json::to_string(&profile.value_answers)?,
                serde_json::to_string(&profile.content_answers)?,
                profile.education.map(|e| e.as_db_str()),
                profile.occupation,
                serde_json::to_string(&profile.lifestyle)?,
                serde_json::to_string(&profile.social_links)?,
                profile.verified as i64,
                profile.last_active_at.map(|t| t.to_rfc3339()),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_profile(&self, id: &str) -> Result<Option<ProfileVector>> {
        let conn = self.lock_conn()?;
        let row = conn
            .query_row(
                "SELECT id, age_cohort, value_answers, content_answers, education,
                        occupation, lifestyle, social_links, verified, last_active_at
                 FROM profiles WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, Option<String>>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, String>(7)?,
                        row.get::<_, i64>(8)?,
                        row.get::<_, Option<String>>(9)?,
                    ))
                },
            )
            .optional()?;

        let Some((
            id,
            cohort,
            value_answers,
            content_answers,
            education,
            occupation,
            lifestyle,
            social_links,
            verified,
            last_active_at,
        )) = row
        else {
            return Ok(None);
        };

        Ok(Some(ProfileVector {
            id,
            value_answers: json_or_default(&value_answers, "value_answers"),
            content_answers: json_or_default(&content_answers, "content_answers"),
            age_cohort: AgeCohort::from_db(&cohort),
            education: education.as_deref().and_then(EducationLevel::from_db),
            occupation,
            lifestyle: json_or_default(&lifestyle, "lifestyle"),
            social_links: json_or_default(&social_links, "social_links"),
            verified: verified != 0,
            last_active_at: last_active_at.as_deref().and_then(parse_timestamp),
        }))
    }

    /// Refresh a profile's activity marker (feeds the matcher's recency
    /// bonus).
    pub fn record_profile_activity(&self, id: &str, now: DateTime<Utc>) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "UPDATE profiles SET last_active_at = ?2, updated_at = ?2 WHERE id = ?1",
            params![id, now.to_rfc3339()],
        )?;
        Ok(())
    }

    // ========================================================================
    // Persona store
    // ========================================================================

    pub fn save_persona(&self, persona: &PersonaConfig) -> Result<()> {
        if persona.persona_id.trim().is_empty() {
            bail!("Persona id must not be blank");
        }
        let now = Utc::now().to_rfc3339();
        let config_json =
            serde_json::to_string(persona).context("Failed to serialize persona config")?;
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO personas (id, config_json, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(id) DO UPDATE SET config_json = ?2, updated_at = ?3",
            params![persona.persona_id, config_json, now],
        )?;
        Ok(())
    }

    /// Load a persona's dial settings. A missing or unreadable record is
    /// data absence, not an error; callers get the documented defaults.
    pub fn get_persona(&self, id: &str) -> Result<Option<PersonaConfig>> {
        let conn = self.lock_conn()?;
        let config_json = conn
            .query_row(
                "SELECT config_json FROM personas WHERE id = ?1",
                params![id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(config_json.map(|json| match serde_json::from_str(&json) {
            Ok(persona) => persona,
            Err(e) => {
                tracing::warn!("Unreadable persona config for {}: {}; using defaults", id, e);
                PersonaConfig::default_for(id)
            }
        }))
    }

    /// Materialize a persona record with the documented defaults if one does
    /// not exist yet. Called by the scheduling layer, never by the engine.
    pub fn ensure_persona_exists(&self, id: &str) -> Result<PersonaConfig> {
        if let Some(existing) = self.get_persona(id)? {
            return Ok(existing);
        }
        let persona = PersonaConfig::default_for(id);
        self.save_persona(&persona)?;
        tracing::info!("Created persona {} with default settings", id);
        Ok(persona)
    }

    // ========================================================================
    // Conversation store
    // ========================================================================

    /// Open (or return) the conversation between two participants. The id is
    /// the canonical sorted pair, so the caller order never matters.
    pub fn open_conversation(&self, a: &str, b: &str) -> Result<String> {
        if a.trim().is_empty() || b.trim().is_empty() {
            bail!("Participant ids must not be blank");
        }
        if a == b {
            bail!("A conversation needs two distinct participants");
        }
        let id = ConversationState::conversation_key(a, b);
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO conversations (id, participant_a, participant_b, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![id, first, second, Utc::now().to_rfc3339()],
        )?;
        Ok(id)
    }

    pub fn get_conversation(&self, id: &str) -> Result<Option<ConversationState>> {
        let conn = self.lock_conn()?;
        let participants = conn
            .query_row(
                "SELECT participant_a, participant_b FROM conversations WHERE id = ?1",
                params![id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        let Some((participant_a, participant_b)) = participants else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT id, conversation_id, sender_id, content, sent_at, is_generated
             FROM messages WHERE conversation_id = ?1
             ORDER BY sent_at ASC, rowid ASC",
        )?;
        let messages = stmt
            .query_map(params![id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, i64>(5)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?
            .into_iter()
            .map(
                |(id, conversation_id, sender_id, content, sent_at, is_generated)| Message {
                    id,
                    conversation_id,
                    sender_id,
                    text: content,
                    sent_at: parse_timestamp(&sent_at).unwrap_or_else(Utc::now),
                    is_generated: is_generated != 0,
                },
            )
            .collect();

        Ok(Some(ConversationState {
            id: id.to_string(),
            participant_ids: [participant_a, participant_b],
            messages,
        }))
    }

    /// Append a participant's own message. Sender must be a participant;
    /// anything else is a collaborator bug.
    pub fn append_user_message(
        &self,
        conversation_id: &str,
        sender_id: &str,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<Message> {
        let conn = self.lock_conn()?;
        let participants = conn
            .query_row(
                "SELECT participant_a, participant_b FROM conversations WHERE id = ?1",
                params![conversation_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        let Some((a, b)) = participants else {
            bail!("Unknown conversation {}", conversation_id);
        };
        if sender_id != a && sender_id != b {
            bail!(
                "Sender {} is not a participant of {}",
                sender_id,
                conversation_id
            );
        }

        let message = Message {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_string(),
            sender_id: sender_id.to_string(),
            text: text.to_string(),
            sent_at: now,
            is_generated: false,
        };
        conn.execute(
            "INSERT INTO messages (id, conversation_id, sender_id, content, sent_at, is_generated)
             VALUES (?1, ?2, ?3, ?4, ?5, 0)",
            params![
                message.id,
                message.conversation_id,
                message.sender_id,
                message.text,
                message.sent_at.to_rfc3339(),
            ],
        )?;
        Ok(message)
    }

    /// The compare-and-append guard. Inside one immediate transaction:
    /// the conversation must still exist, the persona must still be a
    /// participant, and the last message must not already be the persona's.
    /// Returns whether the reply was appended; a `false` is a normal no-op.
    pub fn append_reply_if_unanswered(&self, message: &Message) -> Result<bool> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let participants = tx
            .query_row(
                "SELECT participant_a, participant_b FROM conversations WHERE id = ?1",
                params![message.conversation_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        let Some((a, b)) = participants else {
            tracing::debug!(
                "Reply rejected: conversation {} no longer exists",
                message.conversation_id
            );
            return Ok(false);
        };
        if message.sender_id != a && message.sender_id != b {
            tracing::debug!(
                "Reply rejected: {} is not a participant of {}",
                message.sender_id,
                message.conversation_id
            );
            return Ok(false);
        }

        let last_sender = tx
            .query_row(
                "SELECT sender_id FROM messages WHERE conversation_id = ?1
                 ORDER BY sent_at DESC, rowid DESC LIMIT 1",
                params![message.conversation_id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        match last_sender {
            None => {
                // Nothing to answer yet.
                return Ok(false);
            }
            Some(sender) if sender == message.sender_id => {
                tracing::debug!(
                    "Reply rejected: {} already answered in {}",
                    message.sender_id,
                    message.conversation_id
                );
                return Ok(false);
            }
            Some(_) => {}
        }

        tx.execute(
            "INSERT INTO messages (id, conversation_id, sender_id, content, sent_at, is_generated)
             VALUES (?1, ?2, ?3, ?4, ?5, 1)",
            params![
                message.id,
                message.conversation_id,
                message.sender_id,
                message.text,
                message.sent_at.to_rfc3339(),
            ],
        )?;
        tx.commit()?;
        Ok(true)
    }

    pub fn delete_conversation(&self, id: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute("DELETE FROM messages WHERE conversation_id = ?1", params![id])?;
        conn.execute("DELETE FROM conversations WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// All conversation ids a persona participates in, for the poll loop.
    pub fn conversations_for_persona(&self, persona_id: &str) -> Result<Vec<String>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id FROM conversations
             WHERE participant_a = ?1 OR participant_b = ?1
             ORDER BY created_at ASC",
        )?;
        let ids = stmt
            .query_map(params![persona_id], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn json_or_default<T: serde::de::DeserializeOwned + Default>(raw: &str, field: &str) -> T {
    match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Unreadable {} column: {}; using default", field, e);
            T::default()
        }
    }
}
