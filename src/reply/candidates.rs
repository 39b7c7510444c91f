//! Candidate generation: ordered, additive, predicate-gated template pools.
//!
//! Every pool whose activation predicate holds contributes its templates to
//! the combined list; the universal fallback pool is always appended last,
//! so the result is never empty. Pool order encodes priority, and the selector
//! treats earlier pools as more specific.

use crate::persona::{ContentLevel, PersonaConfig};
use crate::reply::classifier::{Classification, DirectQuestionKind, LengthBucket, SemanticTag};
use crate::reply::locale::Locale;

/// Turn thresholds for greeting and rapport pools.
pub const FIRST_CONTACT_MAX_TURNS: usize = 2;
pub const SHARED_FACT_MAX_TURNS: usize = 6;

/// Turn-depth buckets for the engagement pools.
pub const TURN_EARLY_MAX: usize = 4;
pub const TURN_MID_MAX: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolKind {
    DirectAnswer,
    FirstContactGreeting,
    LaterGreeting,
    Topic,
    SharedFact,
    GenericQuestion,
    Engagement,
    LengthMirror,
    ComplimentAck,
    Flirt,
    Fallback,
}

/// One generated reply candidate: the text, which pool produced it, and the
/// language the text is actually written in.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub text: String,
    pub pool: PoolKind,
    pub locale: Locale,
}

// ---------------------------------------------------------------------------
// Template pools
// ---------------------------------------------------------------------------

const DIRECT_NAME_EN: &[&str] = &[
    "I'm {name} :) what about you?",
    "People mostly call me {name}. And you?",
    "{name}! Now you owe me yours.",
];
const DIRECT_NAME_RU: &[&str] = &[
    "Меня зовут {name}. А тебя?",
    "Я {name} :) а как тебя зовут?",
];

const DIRECT_ORIGIN_EN: &[&str] = &[
    "Not too far from you, I think. Where are you from?",
    "A small town you've probably never heard of. You?",
    "I've moved around a lot, honestly. What about you?",
];
const DIRECT_ORIGIN_RU: &[&str] = &[
    "Из небольшого города, о котором ты вряд ли слышал. А ты откуда?",
];

const DIRECT_HOW_ARE_YOU_EN: &[&str] = &[
    "Pretty good today, actually. How about you?",
    "Can't complain! Better now that you wrote.",
    "A little tired, but good. You?",
];
const DIRECT_HOW_ARE_YOU_RU: &[&str] = &[
    "Хорошо, спасибо! А у тебя как дела?",
    "Всё хорошо, а теперь ещё лучше :)",
];

const FIRST_GREETINGS_EN: &[&str] = &[
    "Hey! I was hoping you'd write first :)",
    "Hi there! How's your day going?",
    "Hey :) nice to finally talk to you!",
];
const FIRST_GREETINGS_RU: &[&str] = &[
    "Привет! Приятно познакомиться :)",
    "Привет! Как проходит твой день?",
];

const LATER_GREETINGS_EN: &[&str] = &[
    "Hey, you're back :)",
    "Hi again! I was just thinking about our chat.",
    "Hello hello! Missed me?",
];
const LATER_GREETINGS_RU: &[&str] = &[
    "Привет ещё раз :)",
    "С возвращением! Я скучала.",
];

const TOPIC_TEMPLATES_EN: &[&str] = &[
    "Oh, I could talk about {topic} all day. What got you into it?",
    "You're into {topic} too? Okay, tell me more.",
    "Honestly, {topic} is one of my favorite subjects.",
];

const SHARED_FACT_TEMPLATES_EN: &[&str] = &[
    "Wait, \"{fact}\" was my answer too. Great minds!",
    "I noticed we both picked \"{fact}\". I like that.",
    "We matched on \"{fact}\", that almost never happens.",
];

const GENERIC_QUESTION_EN: &[&str] = &[
    "Good question! Let me think... what would you guess?",
    "Hmm, I'll tell you... but you go first :)",
    "You ask fun questions, I like that.",
];
const GENERIC_QUESTION_RU: &[&str] = &["Хороший вопрос! А ты как думаешь?"];

const ENGAGEMENT_EARLY_EN: &[&str] = &[
    "So tell me something about you that's not in your profile?",
    "What's been the best part of your week so far?",
];
const ENGAGEMENT_MID_EN: &[&str] = &[
    "I feel like we're getting somewhere :) what do you usually do on weekends?",
    "Okay, important question: coffee or tea?",
];
const ENGAGEMENT_LATE_EN: &[&str] = &[
    "Talking to you is becoming a habit, you know that?",
    "You're still my favorite conversation on here.",
];

const MIRROR_SHORT_EN: &[&str] = &["Ha, fair enough :)", "Okay okay :)", "Mm, go on?"];
const MIRROR_MEDIUM_EN: &[&str] = &[
    "I like the way you put that. What else is going on with you?",
    "That's sweet of you to share. Tell me more?",
];
const MIRROR_LONG_EN: &[&str] = &[
    "That's honestly one of the more interesting messages I've gotten on here. I read it twice. So how did it all turn out?",
    "Okay, you clearly have stories. I want the full version of that one, from the beginning.",
];

const COMPLIMENT_ACK_EN: &[&str] = &[
    "You're making me blush over here.",
    "Flattery will get you everywhere :)",
    "That's sweet. You're not so bad yourself.",
];
const COMPLIMENT_ACK_RU: &[&str] = &[
    "Ты заставляешь меня краснеть :)",
    "Спасибо! Ты тоже ничего ;)",
];

const FLIRT_MILD_EN: &[&str] = &[
    "I have to admit, talking to you is the highlight of my evening.",
    "You're kind of charming, you know that?",
];
const FLIRT_MILD_RU: &[&str] = &[
    "Признаюсь, с тобой очень приятно переписываться :)",
    "А ты умеешь делать комплименты.",
];

const FLIRT_MODERATE_EN: &[&str] = &[
    "Careful... keep talking like that and I might actually develop a crush.",
    "I keep smiling at my phone because of you. That's your fault.",
];
const FLIRT_MODERATE_RU: &[&str] = &[
    "Осторожнее, ещё немного — и я начну скучать по тебе.",
    "Из-за тебя я улыбаюсь в телефон. Это твоя вина.",
];

const FLIRT_HIGH_EN: &[&str] = &[
    "If you were here right now, we definitely wouldn't be texting.",
    "I was thinking about you before you even wrote. Dangerous, right?",
];
const FLIRT_HIGH_RU: &[&str] = &[
    "Если бы ты был рядом, мы бы точно не переписывались.",
    "Я думаю о тебе чаще, чем готова признать.",
];

const FALLBACK_EN: &[&str] = &[
    "Tell me more :)",
    "I'm listening!",
    "Go on, I like hearing from you.",
];
const FALLBACK_RU: &[&str] = &["Расскажи мне больше :)", "Я слушаю!"];

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Build the combined candidate list for one inbound message. Never empty.
pub fn generate(
    classification: &Classification,
    persona: &PersonaConfig,
    shared_facts: &[&str],
    turn_count: usize,
) -> Vec<Candidate> {
    let locale = classification.locale;
    let mut out = Vec::new();

    // Direct answers first; they take priority downstream.
    if let Some(kind) = classification.direct_question {
        let (templates, used) = match kind {
            DirectQuestionKind::Name => localized(locale, DIRECT_NAME_EN, DIRECT_NAME_RU),
            DirectQuestionKind::Origin => localized(locale, DIRECT_ORIGIN_EN, DIRECT_ORIGIN_RU),
            DirectQuestionKind::HowAreYou => {
                localized(locale, DIRECT_HOW_ARE_YOU_EN, DIRECT_HOW_ARE_YOU_RU)
            }
        };
        push_substituted(
            &mut out,
            PoolKind::DirectAnswer,
            used,
            templates,
            "{name}",
            &persona.display_name,
        );
    }

    if classification.has(SemanticTag::Greeting) {
        if turn_count <= FIRST_CONTACT_MAX_TURNS {
            if let Some(override_text) = persona
                .greeting_override
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
            {
                out.push(Candidate {
                    text: override_text.to_string(),
                    pool: PoolKind::FirstContactGreeting,
                    locale,
                });
            }
            let (templates, used) = localized(locale, FIRST_GREETINGS_EN, FIRST_GREETINGS_RU);
            push_plain(&mut out, PoolKind::FirstContactGreeting, used, templates);
        } else {
            let (templates, used) = localized(locale, LATER_GREETINGS_EN, LATER_GREETINGS_RU);
            push_plain(&mut out, PoolKind::LaterGreeting, used, templates);
        }
    }

    let mut topical_added = false;
    if let Some(topic) = classification.topic {
        if persona.topic_enabled(topic) {
            push_substituted(
                &mut out,
                PoolKind::Topic,
                Locale::En,
                TOPIC_TEMPLATES_EN,
                "{topic}",
                topic,
            );
            topical_added = true;
        }
    }

    if let Some(first_fact) = shared_facts.first() {
        if turn_count <= SHARED_FACT_MAX_TURNS {
            push_substituted(
                &mut out,
                PoolKind::SharedFact,
                Locale::En,
                SHARED_FACT_TEMPLATES_EN,
                "{fact}",
                first_fact,
            );
        }
    }

    if classification.has(SemanticTag::Question)
        && classification.direct_question.is_none()
        && !topical_added
    {
        let (templates, used) = localized(locale, GENERIC_QUESTION_EN, GENERIC_QUESTION_RU);
        push_plain(&mut out, PoolKind::GenericQuestion, used, templates);
    }

    // First-contact turns belong to greetings and rapport; engagement
    // framing starts after them.
    if persona.asks_followups && turn_count > FIRST_CONTACT_MAX_TURNS {
        let templates = if turn_count <= TURN_EARLY_MAX {
            ENGAGEMENT_EARLY_EN
        } else if turn_count <= TURN_MID_MAX {
            ENGAGEMENT_MID_EN
        } else {
            ENGAGEMENT_LATE_EN
        };
        // Engagement framing ships in the primary locale only; skip it under
        // a locale lock rather than mix languages.
        if locale == Locale::En {
            push_plain(&mut out, PoolKind::Engagement, Locale::En, templates);
        }
    }

    if classification.has(SemanticTag::Compliment) {
        let (templates, used) = localized(locale, COMPLIMENT_ACK_EN, COMPLIMENT_ACK_RU);
        push_plain(&mut out, PoolKind::ComplimentAck, used, templates);
    }

    let wants_flirt = classification.has(SemanticTag::Romantic)
        || classification.has(SemanticTag::Sexual);
    if wants_flirt && persona.content_level != ContentLevel::None {
        for (tier, en, ru) in [
            (ContentLevel::Mild, FLIRT_MILD_EN, FLIRT_MILD_RU),
            (ContentLevel::Moderate, FLIRT_MODERATE_EN, FLIRT_MODERATE_RU),
            (ContentLevel::High, FLIRT_HIGH_EN, FLIRT_HIGH_RU),
        ] {
            if persona.content_level.allows(tier) {
                let (templates, used) = localized(locale, en, ru);
                push_plain(&mut out, PoolKind::Flirt, used, templates);
            }
        }
    }

    // Length mirroring only when nothing content-driven activated.
    if out.is_empty() {
        let templates = match classification.length {
            LengthBucket::Short => MIRROR_SHORT_EN,
            LengthBucket::Medium => MIRROR_MEDIUM_EN,
            LengthBucket::Long => MIRROR_LONG_EN,
        };
        if locale == Locale::En {
            push_plain(&mut out, PoolKind::LengthMirror, Locale::En, templates);
        }
    }

    // Universal fallback, always last, lowest priority.
    let (templates, used) = localized(locale, FALLBACK_EN, FALLBACK_RU);
    push_plain(&mut out, PoolKind::Fallback, used, templates);

    out
}

/// Pick the locale-parallel template slice when one exists, falling back to
/// the primary-locale pool otherwise. Returns the slice plus the language it
/// is actually written in.
fn localized(
    locale: Locale,
    en: &'static [&'static str],
    ru: &'static [&'static str],
) -> (&'static [&'static str], Locale) {
    match locale {
        Locale::En => (en, Locale::En),
        Locale::Ru if !ru.is_empty() => (ru, Locale::Ru),
        Locale::Ru => (en, Locale::En),
    }
}

fn push_plain(out: &mut Vec<Candidate>, pool: PoolKind, locale: Locale, templates: &[&str]) {
    for template in templates {
        out.push(Candidate {
            text: (*template).to_string(),
            pool,
            locale,
        });
    }
}

fn push_substituted(
    out: &mut Vec<Candidate>,
    pool: PoolKind,
    locale: Locale,
    templates: &[&str],
    placeholder: &str,
    value: &str,
) {
    for template in templates {
        out.push(Candidate {
            text: template.replace(placeholder, value),
            pool,
            locale,
        });
    }
}
