//! Locale signal detection.
//!
//! A conversation is considered "locked" to a secondary locale once any
//! message in the trailing lookback window carries that locale's markers.
//! The lock is derived from the window on every call, never stored,
//! so classification stays a pure function of `(text, state)`.

use serde::{Deserialize, Serialize};

use crate::conversation::ConversationState;

/// How many trailing messages keep a locale lock alive.
pub const LOCALE_LOOKBACK_MESSAGES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locale {
    /// English, the primary locale; never needs markers.
    En,
    /// Russian, detected by Cyrillic script or romanized keywords.
    Ru,
}

impl Locale {
    pub fn as_str(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Ru => "ru",
        }
    }
}

/// Markers for one secondary locale: a set of Unicode script ranges and a
/// whole-word keyword list. Adding a locale to the detector means adding a
/// lexicon, not branching logic.
pub struct LocaleLexicon {
    pub locale: Locale,
    pub script_ranges: &'static [(char, char)],
    pub keywords: &'static [&'static str],
}

impl LocaleLexicon {
    /// Whether `text` carries this lexicon's markers. Keywords match whole
    /// lowercased words only; "da" must not fire inside "data".
    pub fn matches(&self, text: &str) -> bool {
        if text.chars().any(|c| {
            self.script_ranges
                .iter()
                .any(|&(start, end)| c >= start && c <= end)
        }) {
            return true;
        }

        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        self.keywords.iter().any(|keyword| {
            let phrase: Vec<&str> = keyword.split_whitespace().collect();
            match phrase.len() {
                0 => false,
                1 => words.iter().any(|w| w == &phrase[0]),
                // Multi-word keywords match as an in-order phrase.
                _ => words
                    .windows(phrase.len())
                    .any(|window| window == phrase.as_slice()),
            }
        })
    }
}

static RUSSIAN_LEXICON: LocaleLexicon = LocaleLexicon {
    locale: Locale::Ru,
    script_ranges: &[('\u{0400}', '\u{04FF}')],
    keywords: &[
        "privet",
        "zdravstvuy",
        "kak dela",
        "spasibo",
        "poka",
        "khorosho",
        "dobryy den",
        "ochen",
    ],
};

/// Detects which locale a conversation is locked to.
pub struct LocaleSignalDetector {
    lexicons: Vec<&'static LocaleLexicon>,
    lookback: usize,
}

impl LocaleSignalDetector {
    /// Detector with the shipped secondary lexicons and default lookback.
    pub fn with_default_lexicons() -> Self {
        Self {
            lexicons: vec![&RUSSIAN_LEXICON],
            lookback: LOCALE_LOOKBACK_MESSAGES,
        }
    }

    pub fn with_lookback(mut self, lookback: usize) -> Self {
        self.lookback = lookback.max(1);
        self
    }

    /// The secondary locale `text` signals, if any. First matching lexicon
    /// wins.
    pub fn detect(&self, text: &str) -> Option<Locale> {
        self.lexicons
            .iter()
            .find(|lexicon| lexicon.matches(text))
            .map(|lexicon| lexicon.locale)
    }

    /// The locale the conversation is locked to, given the incoming text
    /// and the trailing message window. Recomputed identically every call.
    pub fn locked_locale(&self, incoming: &str, state: &ConversationState) -> Locale {
        if let Some(locale) = self.detect(incoming) {
            return locale;
        }
        let trailing = state
            .messages
            .iter()
            .rev()
            .take(self.lookback)
            .filter_map(|m| self.detect(&m.text))
            .next();
        trailing.unwrap_or(Locale::En)
    }
}

impl Default for LocaleSignalDetector {
    fn default() -> Self {
        Self::with_default_lexicons()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Message;
    use chrono::{TimeZone, Utc};

    fn state_with_texts(texts: &[&str]) -> ConversationState {
        let messages = texts
            .iter()
            .enumerate()
            .map(|(i, text)| Message {
                id: format!("m-{i}"),
                conversation_id: "c-1".to_string(),
                sender_id: if i % 2 == 0 { "user-1" } else { "bot-1" }.to_string(),
                text: text.to_string(),
                sent_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, i as u32, 0).unwrap(),
                is_generated: i % 2 == 1,
            })
            .collect();
        ConversationState {
            id: "c-1".to_string(),
            participant_ids: ["bot-1".to_string(), "user-1".to_string()],
            messages,
        }
    }

    #[test]
    fn cyrillic_script_triggers_detection() {
        let detector = LocaleSignalDetector::with_default_lexicons();
        assert_eq!(detector.detect("Привет, как дела?"), Some(Locale::Ru));
        assert_eq!(detector.detect("hello there"), None);
    }

    #[test]
    fn romanized_keywords_match_whole_words_only() {
        let detector = LocaleSignalDetector::with_default_lexicons();
        assert_eq!(detector.detect("privet!"), Some(Locale::Ru));
        assert_eq!(detector.detect("kak dela my friend"), Some(Locale::Ru));
        // Substrings must not fire: "privet" inside "privateer" or phrase
        // fragments out of order.
        assert_eq!(detector.detect("the privateer sailed"), None);
        assert_eq!(detector.detect("dela kak backwards"), None);
    }

    #[test]
    fn lock_persists_through_lookback_window() {
        let detector = LocaleSignalDetector::with_default_lexicons();
        let state = state_with_texts(&["Привет!", "hey!", "ok"]);
        assert_eq!(detector.locked_locale("and you?", &state), Locale::Ru);

        // Marker too far back: three newer messages push it out.
        let state = state_with_texts(&["Привет!", "hey!", "ok", "cool"]);
        assert_eq!(detector.locked_locale("and you?", &state), Locale::En);
    }

    #[test]
    fn incoming_marker_locks_immediately() {
        let detector = LocaleSignalDetector::with_default_lexicons();
        let state = state_with_texts(&["hi", "hey!"]);
        assert_eq!(detector.locked_locale("кто ты?", &state), Locale::Ru);
        assert_eq!(detector.locked_locale("who are you?", &state), Locale::En);
    }
}
