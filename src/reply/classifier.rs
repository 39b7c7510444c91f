//! Keyword/rule-table message classification.
//!
//! A fixed ordered list of (pattern, tag) rules is evaluated against the
//! lowercased trimmed text; multiple tags may fire. The classifier never
//! mutates anything; it is a pure read of the text plus the trailing
//! message window (for the locale lock).

use std::collections::HashSet;

use regex_lite::Regex;

use crate::conversation::ConversationState;
use crate::reply::locale::{Locale, LocaleSignalDetector};

/// Length buckets over the trimmed inbound text, by character count.
pub const SHORT_MESSAGE_MAX_CHARS: usize = 20;
pub const MEDIUM_MESSAGE_MAX_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LengthBucket {
    Short,
    Medium,
    Long,
}

impl LengthBucket {
    pub fn of(text: &str) -> Self {
        let chars = text.trim().chars().count();
        if chars < SHORT_MESSAGE_MAX_CHARS {
            LengthBucket::Short
        } else if chars < MEDIUM_MESSAGE_MAX_CHARS {
            LengthBucket::Medium
        } else {
            LengthBucket::Long
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticTag {
    Greeting,
    Farewell,
    Question,
    Compliment,
    Romantic,
    Sexual,
}

/// Questions with a canned direct answer, detected by WH-patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectQuestionKind {
    Name,
    Origin,
    HowAreYou,
}

/// Everything the generator needs to know about one inbound message.
#[derive(Debug, Clone)]
pub struct Classification {
    pub tags: HashSet<SemanticTag>,
    pub direct_question: Option<DirectQuestionKind>,
    pub topic: Option<&'static str>,
    pub length: LengthBucket,
    pub locale: Locale,
}

impl Classification {
    pub fn has(&self, tag: SemanticTag) -> bool {
        self.tags.contains(&tag)
    }
}

// ---------------------------------------------------------------------------
// Rule tables
// ---------------------------------------------------------------------------

const GREETING_KEYWORDS: &[&str] = &[
    "hi",
    "hey",
    "heya",
    "hiya",
    "hello",
    "howdy",
    "yo",
    "sup",
    "good morning",
    "good afternoon",
    "good evening",
    "privet",
    "привет",
    "здравствуй",
];

const FAREWELL_KEYWORDS: &[&str] = &[
    "bye",
    "goodbye",
    "goodnight",
    "good night",
    "see you",
    "see ya",
    "talk later",
    "talk to you later",
    "gtg",
    "gotta go",
    "poka",
    "пока",
];

const COMPLIMENT_KEYWORDS: &[&str] = &[
    "beautiful",
    "gorgeous",
    "cute",
    "pretty",
    "handsome",
    "stunning",
    "lovely",
    "amazing",
    "charming",
    "sweet",
    "красивая",
    "красивый",
    "милая",
    "милый",
];

const ROMANTIC_KEYWORDS: &[&str] = &[
    "love",
    "miss you",
    "date",
    "kiss",
    "romantic",
    "romance",
    "crush",
    "butterflies",
    "hold you",
    "люблю",
    "скучаю",
    "поцеловать",
    "целовать",
    "свидание",
];

const SEXUAL_KEYWORDS: &[&str] = &[
    "sexy",
    "hot",
    "naughty",
    "desire",
    "flirt",
    "flirty",
    "tease",
];

/// Topic table: first match by table order wins, at most one topic per
/// message.
pub static TOPIC_KEYWORDS: &[(&str, &[&str])] = &[
    ("music", &["music", "song", "songs", "band", "concert", "playlist", "guitar", "singing"]),
    ("movies", &["movie", "movies", "film", "films", "cinema", "series", "show"]),
    ("books", &["book", "books", "novel", "reading", "author", "poetry"]),
    ("travel", &["travel", "trip", "vacation", "beach", "abroad", "flight", "backpacking"]),
    ("food", &["food", "cook", "cooking", "dinner", "restaurant", "coffee", "baking"]),
    ("family", &["family", "brother", "sister", "parents", "mom", "dad", "kids"]),
    ("pets", &["dog", "dogs", "cat", "cats", "pet", "pets", "puppy", "kitten"]),
    ("sports", &["gym", "workout", "running", "football", "soccer", "yoga", "hiking", "climbing"]),
    ("work", &["work", "job", "career", "office", "studying", "university"]),
];

/// Ordered (keyword table, tag) rules. Order is part of the contract: it is
/// the order tags are reported in traces and the order tests pin down.
const TAG_RULES: &[(&[&str], SemanticTag)] = &[
    (GREETING_KEYWORDS, SemanticTag::Greeting),
    (FAREWELL_KEYWORDS, SemanticTag::Farewell),
    (COMPLIMENT_KEYWORDS, SemanticTag::Compliment),
    (ROMANTIC_KEYWORDS, SemanticTag::Romantic),
    (SEXUAL_KEYWORDS, SemanticTag::Sexual),
];

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

pub struct MessageClassifier {
    direct_rules: Vec<(Regex, DirectQuestionKind)>,
    detector: LocaleSignalDetector,
}

impl MessageClassifier {
    pub fn new(detector: LocaleSignalDetector) -> Self {
        let direct_rules = vec![
            (
                Regex::new(r"(what'?s|what is|whats)\s+(your|ur)\s+name|who are you")
                    .expect("name question pattern"),
                DirectQuestionKind::Name,
            ),
            (
                Regex::new(r"where\s+(are\s+)?(you|u)\s+from|where do (you|u) live")
                    .expect("origin question pattern"),
                DirectQuestionKind::Origin,
            ),
            (
                Regex::new(r"how\s+(are|r)\s+(you|u)\b|how'?s it going|how are things|kak dela|как дела")
                    .expect("how-are-you pattern"),
                DirectQuestionKind::HowAreYou,
            ),
        ];
        Self {
            direct_rules,
            detector,
        }
    }

    /// Classify one inbound message against the conversation's trailing
    /// window.
    pub fn classify(&self, text: &str, state: &ConversationState) -> Classification {
        let trimmed = text.trim();
        let lowered = trimmed.to_lowercase();
        let words = words_of(&lowered);

        let mut tags = HashSet::new();
        for (keywords, tag) in TAG_RULES {
            if keywords.iter().any(|k| has_phrase(&words, k)) {
                tags.insert(*tag);
            }
        }

        if trimmed.contains('?') {
            tags.insert(SemanticTag::Question);
        }

        let direct_question = self
            .direct_rules
            .iter()
            .find(|(pattern, _)| pattern.is_match(&lowered))
            .map(|(_, kind)| *kind);
        if direct_question.is_some() {
            // A WH-pattern is a question even without the punctuation.
            tags.insert(SemanticTag::Question);
        }

        let topic = TOPIC_KEYWORDS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| has_phrase(&words, k)))
            .map(|(topic, _)| *topic);

        Classification {
            tags,
            direct_question,
            topic,
            length: LengthBucket::of(trimmed),
            locale: self.detector.locked_locale(text, state),
        }
    }
}

impl Default for MessageClassifier {
    fn default() -> Self {
        Self::new(LocaleSignalDetector::with_default_lexicons())
    }
}

fn words_of(lowered: &str) -> Vec<&str> {
    lowered
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .collect()
}

fn has_phrase(words: &[&str], keyword: &str) -> bool {
    let phrase: Vec<&str> = keyword.split_whitespace().collect();
    match phrase.len() {
        0 => false,
        1 => words.iter().any(|w| w == &phrase[0]),
        _ => words
            .windows(phrase.len())
            .any(|window| window == phrase.as_slice()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Message;
    use chrono::{TimeZone, Utc};

    fn empty_state() -> ConversationState {
        ConversationState {
            id: "c-1".to_string(),
            participant_ids: ["bot-1".to_string(), "user-1".to_string()],
            messages: Vec::new(),
        }
    }

    fn state_with_history(texts: &[&str]) -> ConversationState {
        let mut state = empty_state();
        state.messages = texts
            .iter()
            .enumerate()
            .map(|(i, text)| Message {
                id: format!("m-{i}"),
                conversation_id: "c-1".to_string(),
                sender_id: "user-1".to_string(),
                text: text.to_string(),
                sent_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, i as u32, 0).unwrap(),
                is_generated: false,
            })
            .collect();
        state
    }

    #[test]
    fn bare_greeting_is_short_and_tagged() {
        let classifier = MessageClassifier::default();
        let c = classifier.classify("hi", &empty_state());
        assert!(c.has(SemanticTag::Greeting));
        assert!(!c.has(SemanticTag::Question));
        assert_eq!(c.length, LengthBucket::Short);
        assert_eq!(c.locale, Locale::En);
    }

    #[test]
    fn name_question_gets_direct_sub_tag() {
        let classifier = MessageClassifier::default();
        let c = classifier.classify("So... what's your name?", &empty_state());
        assert_eq!(c.direct_question, Some(DirectQuestionKind::Name));
        assert!(c.has(SemanticTag::Question));

        // WH-phrasing counts even without the question mark.
        let c = classifier.classify("tell me who are you", &empty_state());
        assert_eq!(c.direct_question, Some(DirectQuestionKind::Name));
        assert!(c.has(SemanticTag::Question));
    }

    #[test]
    fn topic_detection_is_first_match_by_table_order() {
        let classifier = MessageClassifier::default();
        let c = classifier.classify(
            "I spent the whole weekend reading this novel about a touring band",
            &empty_state(),
        );
        // "band" (music) precedes "novel" (books) in table order.
        assert_eq!(c.topic, Some("music"));
        assert_eq!(c.length, LengthBucket::Long);
    }

    #[test]
    fn long_book_message_classifies_topic_and_length() {
        let classifier = MessageClassifier::default();
        let c = classifier.classify(
            "I just finished the most incredible book, could not put it down all week",
            &empty_state(),
        );
        assert_eq!(c.topic, Some("books"));
        assert_eq!(c.length, LengthBucket::Long);
        assert!(!c.has(SemanticTag::Question));
    }

    #[test]
    fn multiple_tags_fire_together() {
        let classifier = MessageClassifier::default();
        let c = classifier.classify("hey gorgeous, want to go on a date?", &empty_state());
        assert!(c.has(SemanticTag::Greeting));
        assert!(c.has(SemanticTag::Compliment));
        assert!(c.has(SemanticTag::Romantic));
        assert!(c.has(SemanticTag::Question));
    }

    #[test]
    fn keywords_do_not_match_inside_other_words() {
        let classifier = MessageClassifier::default();
        let c = classifier.classify("the history class was great", &empty_state());
        assert!(!c.has(SemanticTag::Greeting)); // no "hi" inside "history"
        assert!(c.tags.is_empty());
    }

    #[test]
    fn russian_how_are_you_is_direct_and_locale_locked() {
        let classifier = MessageClassifier::default();
        let c = classifier.classify("Привет, как дела?", &empty_state());
        assert_eq!(c.direct_question, Some(DirectQuestionKind::HowAreYou));
        assert_eq!(c.locale, Locale::Ru);
        assert!(c.has(SemanticTag::Greeting));
    }

    #[test]
    fn locale_lock_carries_over_from_recent_history() {
        let classifier = MessageClassifier::default();
        let state = state_with_history(&["privet", "nice to meet you"]);
        let c = classifier.classify("what do you like doing?", &state);
        assert_eq!(c.locale, Locale::Ru);
    }

    #[test]
    fn length_buckets_split_at_twenty_and_fifty_chars() {
        assert_eq!(LengthBucket::of("0123456789012345678"), LengthBucket::Short);
        assert_eq!(LengthBucket::of("01234567890123456789"), LengthBucket::Medium);
        assert_eq!(LengthBucket::of(&"x".repeat(49)), LengthBucket::Medium);
        assert_eq!(LengthBucket::of(&"x".repeat(50)), LengthBucket::Long);
        // Surrounding whitespace never changes the bucket.
        assert_eq!(LengthBucket::of("   hi   "), LengthBucket::Short);
    }
}
