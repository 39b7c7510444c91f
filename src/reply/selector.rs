//! Reply selection: persona-driven filters over the generated candidates,
//! ending in a guaranteed non-empty string.
//!
//! Selection is randomized by design; the injected RNG keeps production
//! non-deterministic and tests reproducible.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::conversation::ConversationState;
use crate::persona::{ContentLevel, Formality, PersonaConfig, Verbosity};
use crate::reply::candidates::{Candidate, PoolKind};
use crate::reply::classifier::{Classification, SemanticTag};
use crate::reply::locale::Locale;

/// Reply-length buckets (distinct from the classifier's inbound buckets).
pub const REPLY_SHORT_MAX_CHARS: usize = 100;
pub const REPLY_MEDIUM_MAX_CHARS: usize = 200;

/// Probability of choosing the short bucket when both short and medium
/// candidates exist. Keeps the engine from sounding verbose by default.
pub const SHORT_BUCKET_BIAS: f64 = 0.7;

/// Probability of re-drawing from the flirt pools at the highest content
/// tier once romance is signaled or engagement is sustained.
pub const FLIRT_REDRAW_PROBABILITY: f64 = 0.6;

/// Turn count past which engagement alone can trigger the high-tier
/// re-draw.
pub const SUSTAINED_ENGAGEMENT_TURNS: usize = 12;

/// How many of the persona's recent replies the anti-repetition filter
/// remembers.
pub const ANTI_REPEAT_WINDOW: usize = 5;

const NEUTRAL_ACKNOWLEDGEMENT_EN: &str = "Tell me a little more about that.";
const NEUTRAL_ACKNOWLEDGEMENT_RU: &str = "Расскажи мне об этом побольше.";

const FOLLOWUP_FRAGMENTS_EN: &[&str] = &[
    " What about you?",
    " How about your day?",
    " Your turn to share.",
];
const FOLLOWUP_FRAGMENTS_RU: &[&str] = &[" А у тебя как?", " А ты что думаешь?"];

/// Casual → formal word substitutions, applied on word boundaries with the
/// leading capital preserved.
const FORMAL_SUBSTITUTIONS: &[(&str, &str)] = &[
    ("hey", "hello"),
    ("hi", "hello"),
    ("yeah", "yes"),
    ("yep", "yes"),
    ("gonna", "going to"),
    ("wanna", "want to"),
    ("gotta", "have to"),
    ("btw", "by the way"),
    ("okay", "all right"),
    ("ok", "all right"),
    ("can't", "cannot"),
    ("don't", "do not"),
    ("won't", "will not"),
    ("i'm", "i am"),
    ("i've", "i have"),
    ("you're", "you are"),
    ("you'd", "you would"),
    ("what's", "what is"),
    ("that's", "that is"),
    ("it's", "it is"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReplyLength {
    Short,
    Medium,
    Long,
}

fn reply_bucket(text: &str) -> ReplyLength {
    let chars = text.chars().count();
    if chars < REPLY_SHORT_MAX_CHARS {
        ReplyLength::Short
    } else if chars <= REPLY_MEDIUM_MAX_CHARS {
        ReplyLength::Medium
    } else {
        ReplyLength::Long
    }
}

/// Pick one reply from the candidate list. Never returns an empty or
/// whitespace-only string.
pub fn select(
    candidates: &[Candidate],
    classification: &Classification,
    persona: &PersonaConfig,
    state: &ConversationState,
    turn_count: usize,
    rng: &mut impl Rng,
) -> String {
    let locale = classification.locale;

    let mut pool: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| !c.text.trim().is_empty())
        .collect();

    // Anti-repetition: avoid echoing a recent reply, unless that would
    // leave nothing to say.
    let recent = state.recent_generated_texts(&persona.persona_id, ANTI_REPEAT_WINDOW);
    let fresh: Vec<&Candidate> = pool
        .iter()
        .copied()
        .filter(|c| !recent.contains(&c.text.as_str()))
        .collect();
    if !fresh.is_empty() {
        pool = fresh;
    }

    // The universal fallback only speaks when nothing else activated.
    let non_fallback: Vec<&Candidate> = pool
        .iter()
        .copied()
        .filter(|c| c.pool != PoolKind::Fallback)
        .collect();
    if !non_fallback.is_empty() {
        pool = non_fallback;
    }

    // Direct questions get direct answers.
    let direct: Vec<&Candidate> = pool
        .iter()
        .copied()
        .filter(|c| c.pool == PoolKind::DirectAnswer)
        .collect();
    if !direct.is_empty() {
        pool = direct;
    }

    let mut chosen = match pick_with_length_bias(&pool, rng) {
        Some(candidate) => candidate.clone(),
        None => return neutral_acknowledgement(locale).to_string(),
    };

    // Highest content tier: prefer the flirt pools once romance is signaled
    // or the conversation has real momentum. Intentionally probabilistic.
    if persona.content_level == ContentLevel::High {
        let signaled = classification.has(SemanticTag::Romantic)
            || classification.has(SemanticTag::Sexual)
            || turn_count > SUSTAINED_ENGAGEMENT_TURNS;
        if signaled && rng.gen::<f64>() < FLIRT_REDRAW_PROBABILITY {
            let flirt: Vec<&Candidate> = candidates
                .iter()
                .filter(|c| c.pool == PoolKind::Flirt && !c.text.trim().is_empty())
                .collect();
            if let Some(redrawn) = flirt.choose(rng) {
                chosen = (*redrawn).clone();
            }
        }
    }

    let mut text = chosen.text.clone();

    // Long-verbosity personas tack a follow-up question onto short replies.
    if persona.verbosity == Verbosity::Long
        && persona.asks_followups
        && reply_bucket(&text) == ReplyLength::Short
        && !text.contains('?')
    {
        let fragments = match chosen.locale {
            Locale::En => FOLLOWUP_FRAGMENTS_EN,
            Locale::Ru => FOLLOWUP_FRAGMENTS_RU,
        };
        if let Some(fragment) = fragments.choose(rng) {
            text.push_str(fragment);
        }
    }

    if persona.formality == Formality::Formal {
        text = formalize(&text);
    }

    if !persona.emoji_enabled {
        text = strip_emoji(&text);
    }

    let cleaned = text.trim();
    if cleaned.is_empty() || cleaned.chars().all(|c| !c.is_alphanumeric()) {
        return neutral_acknowledgement(locale).to_string();
    }
    cleaned.to_string()
}

fn neutral_acknowledgement(locale: Locale) -> &'static str {
    match locale {
        Locale::En => NEUTRAL_ACKNOWLEDGEMENT_EN,
        Locale::Ru => NEUTRAL_ACKNOWLEDGEMENT_RU,
    }
}

fn pick_with_length_bias<'a>(
    pool: &[&'a Candidate],
    rng: &mut impl Rng,
) -> Option<&'a Candidate> {
    if pool.is_empty() {
        return None;
    }
    let short: Vec<&Candidate> = bucketed(pool, ReplyLength::Short);
    let medium: Vec<&Candidate> = bucketed(pool, ReplyLength::Medium);
    let long: Vec<&Candidate> = bucketed(pool, ReplyLength::Long);

    let bucket = if !short.is_empty() && !medium.is_empty() {
        if rng.gen::<f64>() < SHORT_BUCKET_BIAS {
            &short
        } else {
            &medium
        }
    } else if !short.is_empty() {
        &short
    } else if !medium.is_empty() {
        &medium
    } else {
        &long
    };

    bucket.choose(rng).copied()
}

fn bucketed<'a>(pool: &[&'a Candidate], length: ReplyLength) -> Vec<&'a Candidate> {
    pool.iter()
        .copied()
        .filter(|c| reply_bucket(&c.text) == length)
        .collect()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '\''
}

fn capitalize_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Replace whole-word occurrences of `from` (case-insensitive on the first
/// letter) with `to`, preserving a leading capital.
fn replace_word(text: &str, from: &str, to: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let from_chars: Vec<char> = from.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        let end = i + from_chars.len();
        let boundary_before = i == 0 || !is_word_char(chars[i - 1]);
        if boundary_before && end <= chars.len() {
            let matches = chars[i..end]
                .iter()
                .zip(&from_chars)
                .all(|(a, b)| a.to_lowercase().eq(b.to_lowercase()));
            let boundary_after = end == chars.len() || !is_word_char(chars[end]);
            if matches && boundary_after {
                if chars[i].is_uppercase() {
                    out.push_str(&capitalize_first(to));
                } else {
                    out.push_str(to);
                }
                i = end;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }

    out
}

fn formalize(text: &str) -> String {
    let mut result = text.to_string();
    for (from, to) in FORMAL_SUBSTITUTIONS {
        result = replace_word(&result, from, to);
    }
    result
}

/// Strip pictographic emoji and the common ASCII emoticons.
fn strip_emoji(text: &str) -> String {
    const EMOTICONS: &[&str] = &[":)", ";)", ":(", ":D", ":P", "<3"];
    let mut result: String = text
        .chars()
        .filter(|&c| {
            !matches!(c,
                '\u{1F300}'..='\u{1FAFF}'
                | '\u{2600}'..='\u{27BF}'
                | '\u{2764}'
                | '\u{FE0F}'
            )
        })
        .collect();
    for emoticon in EMOTICONS {
        result = result.replace(emoticon, "");
    }
    result.split_whitespace().collect::<Vec<_>>().join(" ")
}
