use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Ordered content gate. Each tier unlocks the flirt pools up to and
/// including its own rank; `None` disables them entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentLevel {
    None,
    Mild,
    Moderate,
    High,
}

impl ContentLevel {
    pub fn rank(self) -> u8 {
        match self {
            ContentLevel::None => 0,
            ContentLevel::Mild => 1,
            ContentLevel::Moderate => 2,
            ContentLevel::High => 3,
        }
    }

    /// Whether this level unlocks pools gated at `tier`.
    pub fn allows(self, tier: ContentLevel) -> bool {
        self.rank() >= tier.rank() && tier != ContentLevel::None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    Short,
    Medium,
    Long,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Formality {
    Casual,
    Formal,
}

/// A bot identity's dial settings. Created once per persona with the
/// defaults below, mutable by the owning user at any time, read-only to the
/// reply engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    pub persona_id: String,
    #[serde(default = "default_display_name")]
    pub display_name: String,
    #[serde(default = "default_content_level")]
    pub content_level: ContentLevel,
    #[serde(default = "default_verbosity")]
    pub verbosity: Verbosity,
    #[serde(default = "default_formality")]
    pub formality: Formality,
    #[serde(default = "default_emoji_enabled")]
    pub emoji_enabled: bool,
    #[serde(default = "default_asks_followups")]
    pub asks_followups: bool,
    /// Optional `[start_hour, end_hour)` window (UTC). Wraparound windows
    /// such as 22..6 are valid.
    #[serde(default)]
    pub active_window: Option<(u8, u8)>,
    /// `[min_secs, max_secs]` artificial delay before a forced reply is
    /// surfaced. Consumed by the scheduler, never by selection.
    #[serde(default = "default_reply_delay_bounds")]
    pub reply_delay_bounds: (u64, u64),
    #[serde(default)]
    pub topic_allowlist: HashSet<String>,
    #[serde(default)]
    pub topic_blocklist: HashSet<String>,
    #[serde(default)]
    pub greeting_override: Option<String>,
}

fn default_display_name() -> String {
    "Alex".to_string()
}

fn default_content_level() -> ContentLevel {
    ContentLevel::Mild
}

fn default_verbosity() -> Verbosity {
    Verbosity::Medium
}

fn default_formality() -> Formality {
    Formality::Casual
}

fn default_emoji_enabled() -> bool {
    true
}

fn default_asks_followups() -> bool {
    true
}

fn default_reply_delay_bounds() -> (u64, u64) {
    (8, 45)
}

impl PersonaConfig {
    /// The documented default configuration for a persona identity. Used
    /// whenever a persona record is absent; data absence is not an error.
    pub fn default_for(persona_id: impl Into<String>) -> Self {
        Self {
            persona_id: persona_id.into(),
            display_name: default_display_name(),
            content_level: default_content_level(),
            verbosity: default_verbosity(),
            formality: default_formality(),
            emoji_enabled: default_emoji_enabled(),
            asks_followups: default_asks_followups(),
            active_window: None,
            reply_delay_bounds: default_reply_delay_bounds(),
            topic_allowlist: HashSet::new(),
            topic_blocklist: HashSet::new(),
            greeting_override: None,
        }
    }

    /// Whether `hour` (0-23) falls inside the active window. Personas
    /// without a window are always active.
    pub fn active_at_hour(&self, hour: u8) -> bool {
        match self.active_window {
            None => true,
            Some((start, end)) if start == end => true,
            Some((start, end)) if start < end => hour >= start && hour < end,
            // Wraparound window, e.g. 22..6.
            Some((start, end)) => hour >= start || hour < end,
        }
    }

    /// Whether the persona will engage a topical pool for `topic`.
    pub fn topic_enabled(&self, topic: &str) -> bool {
        if self.topic_blocklist.contains(topic) {
            return false;
        }
        self.topic_allowlist.is_empty() || self.topic_allowlist.contains(topic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_level_tiers_unlock_progressively() {
        assert!(!ContentLevel::None.allows(ContentLevel::Mild));
        assert!(ContentLevel::Mild.allows(ContentLevel::Mild));
        assert!(!ContentLevel::Mild.allows(ContentLevel::Moderate));
        assert!(ContentLevel::High.allows(ContentLevel::Mild));
        assert!(ContentLevel::High.allows(ContentLevel::High));
        // The gate itself is never a tier to unlock.
        assert!(!ContentLevel::High.allows(ContentLevel::None));
    }

    #[test]
    fn active_window_handles_plain_and_wraparound_ranges() {
        let mut persona = PersonaConfig::default_for("bot-1");
        assert!(persona.active_at_hour(3));

        persona.active_window = Some((9, 17));
        assert!(persona.active_at_hour(9));
        assert!(persona.active_at_hour(16));
        assert!(!persona.active_at_hour(17));
        assert!(!persona.active_at_hour(3));

        persona.active_window = Some((22, 6));
        assert!(persona.active_at_hour(23));
        assert!(persona.active_at_hour(2));
        assert!(!persona.active_at_hour(12));
    }

    #[test]
    fn topic_gating_respects_block_then_allow_lists() {
        let mut persona = PersonaConfig::default_for("bot-1");
        assert!(persona.topic_enabled("music"));

        persona.topic_blocklist.insert("work".to_string());
        assert!(!persona.topic_enabled("work"));

        persona.topic_allowlist.insert("music".to_string());
        assert!(persona.topic_enabled("music"));
        assert!(!persona.topic_enabled("travel"));
    }

    #[test]
    fn persona_json_round_trip_fills_defaults() {
        let parsed: PersonaConfig =
            serde_json::from_str(r#"{"persona_id":"bot-2"}"#).expect("parse minimal persona");
        assert_eq!(parsed.persona_id, "bot-2");
        assert_eq!(parsed.content_level, ContentLevel::Mild);
        assert_eq!(parsed.reply_delay_bounds, (8, 45));
        assert!(parsed.emoji_enabled);
    }
}
