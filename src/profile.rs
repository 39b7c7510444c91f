use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of value questions in the fixed questionnaire schema.
pub const VALUE_QUESTION_COUNT: usize = 10;

/// Number of cohort-scoped content questions.
pub const CONTENT_QUESTION_COUNT: usize = 5;

/// Value-question indices that encode social energy and recharge preference.
/// The matcher scores these a second time with smaller weights.
pub const ENERGY_QUESTION_INDICES: [usize; 2] = [2, 5];

/// One questionnaire question: a stable key plus its ordered option labels.
/// Option order is meaningful: adjacent indices are treated as compatible
/// answers by the matcher.
pub struct Question {
    pub key: &'static str,
    pub options: &'static [&'static str],
}

/// The fixed value-question schema. Answers are stored as option indices.
pub static VALUE_QUESTIONS: [Question; VALUE_QUESTION_COUNT] = [
    Question {
        key: "weekend_style",
        options: &[
            "Out with friends",
            "A mix of both",
            "A quiet night in",
        ],
    },
    Question {
        key: "daily_rhythm",
        options: &["Early bird", "Somewhere in between", "Night owl"],
    },
    Question {
        key: "social_energy",
        options: &["Big groups", "Small circles", "One-on-one", "Mostly solo"],
    },
    Question {
        key: "planning_style",
        options: &["Detailed planner", "Rough outline", "Go with the flow"],
    },
    Question {
        key: "adventure_level",
        options: &[
            "Homebody",
            "Occasional outings",
            "Frequent traveler",
            "Always on the move",
        ],
    },
    Question {
        key: "recharge_preference",
        options: &["Being around people", "A balance of both", "Time alone"],
    },
    Question {
        key: "texting_pace",
        options: &[
            "Constant texter",
            "A few times a day",
            "When something matters",
        ],
    },
    Question {
        key: "humor_style",
        options: &[
            "Dry and sarcastic",
            "Silly and playful",
            "Observational",
            "Dark",
        ],
    },
    Question {
        key: "conflict_style",
        options: &["Talk it out right away", "Cool off first", "Avoid it"],
    },
    Question {
        key: "long_term_outlook",
        options: &[
            "Taking it slow",
            "Open to something serious",
            "Looking to settle down",
        ],
    },
];

/// Content questions are only comparable inside the same age cohort; labels
/// are shared across cohorts.
pub static CONTENT_QUESTIONS: [Question; CONTENT_QUESTION_COUNT] = [
    Question {
        key: "affection_style",
        options: &[
            "Kind words",
            "Time together",
            "Small gestures",
            "Physical closeness",
        ],
    },
    Question {
        key: "dating_pace",
        options: &["Slow burn", "Steady", "Fast spark"],
    },
    Question {
        key: "flirting_comfort",
        options: &["Subtle", "Playful", "Direct"],
    },
    Question {
        key: "ideal_date",
        options: &[
            "Quiet dinner",
            "Shared adventure",
            "Night out",
            "Staying in",
        ],
    },
    Question {
        key: "openness",
        options: &["Private", "Selective", "Open book"],
    },
];

/// Age cohort partitioning users into comparison pools. Content answers are
/// only compared within the same cohort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeCohort {
    EighteenToTwentyFour,
    TwentyFiveToThirtyFour,
    ThirtyFiveToFortyNine,
    FiftyPlus,
}

impl AgeCohort {
    pub fn as_db_str(self) -> &'static str {
        match self {
            AgeCohort::EighteenToTwentyFour => "18_24",
            AgeCohort::TwentyFiveToThirtyFour => "25_34",
            AgeCohort::ThirtyFiveToFortyNine => "35_49",
            AgeCohort::FiftyPlus => "50_plus",
        }
    }

    pub fn from_db(raw: &str) -> Self {
        match raw.trim() {
            "25_34" => AgeCohort::TwentyFiveToThirtyFour,
            "35_49" => AgeCohort::ThirtyFiveToFortyNine,
            "50_plus" => AgeCohort::FiftyPlus,
            _ => AgeCohort::EighteenToTwentyFour,
        }
    }
}

/// Ordered education levels. Distance between ranks drives the matcher's
/// proximity credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EducationLevel {
    HighSchool,
    SomeCollege,
    Bachelors,
    Masters,
    Doctorate,
}

impl EducationLevel {
    pub fn rank(self) -> u8 {
        match self {
            EducationLevel::HighSchool => 0,
            EducationLevel::SomeCollege => 1,
            EducationLevel::Bachelors => 2,
            EducationLevel::Masters => 3,
            EducationLevel::Doctorate => 4,
        }
    }

    pub fn as_db_str(self) -> &'static str {
        match self {
            EducationLevel::HighSchool => "high_school",
            EducationLevel::SomeCollege => "some_college",
            EducationLevel::Bachelors => "bachelors",
            EducationLevel::Masters => "masters",
            EducationLevel::Doctorate => "doctorate",
        }
    }

    pub fn from_db(raw: &str) -> Option<Self> {
        match raw.trim() {
            "high_school" => Some(EducationLevel::HighSchool),
            "some_college" => Some(EducationLevel::SomeCollege),
            "bachelors" => Some(EducationLevel::Bachelors),
            "masters" => Some(EducationLevel::Masters),
            "doctorate" => Some(EducationLevel::Doctorate),
            _ => None,
        }
    }
}

/// Categorical lifestyle facts. Overlap between two profiles earns match
/// credit, capped by the matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifestyleTag {
    ExercisesDaily,
    ExercisesWeekly,
    RarelyExercises,
    Vegetarian,
    Vegan,
    EatsEverything,
    DrinksSocially,
    DoesNotDrink,
    HasChildren,
    WantsChildren,
    NoChildren,
}

/// External-identity presence flags. Co-presence of the same platform on
/// both profiles earns a small bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocialLink {
    Instagram,
    Spotify,
    Linkedin,
    Twitter,
}

/// Normalized view of a user's questionnaire answers and profile facts.
///
/// Answer vectors may be partially populated; the matcher only compares the
/// overlapping prefix and never errors on absent data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileVector {
    pub id: String,
    pub value_answers: Vec<u8>,
    pub content_answers: Vec<u8>,
    pub age_cohort: AgeCohort,
    #[serde(default)]
    pub education: Option<EducationLevel>,
    #[serde(default)]
    pub occupation: Option<String>,
    #[serde(default)]
    pub lifestyle: HashSet<LifestyleTag>,
    #[serde(default)]
    pub social_links: HashSet<SocialLink>,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub last_active_at: Option<DateTime<Utc>>,
}

impl ProfileVector {
    /// An empty profile for the given identity. Scores zero against
    /// everything until answers are filled in.
    pub fn empty(id: impl Into<String>, age_cohort: AgeCohort) -> Self {
        Self {
            id: id.into(),
            value_answers: Vec::new(),
            content_answers: Vec::new(),
            age_cohort,
            education: None,
            occupation: None,
            lifestyle: HashSet::new(),
            social_links: HashSet::new(),
            verified: false,
            last_active_at: None,
        }
    }

    /// Label for a value answer, if the index names a real option.
    pub fn value_answer_label(question: usize, answer: u8) -> Option<&'static str> {
        VALUE_QUESTIONS
            .get(question)
            .and_then(|q| q.options.get(answer as usize))
            .copied()
    }

    /// Label for a content answer, if the index names a real option.
    pub fn content_answer_label(question: usize, answer: u8) -> Option<&'static str> {
        CONTENT_QUESTIONS
            .get(question)
            .and_then(|q| q.options.get(answer as usize))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_lengths_match_declared_counts() {
        assert_eq!(VALUE_QUESTIONS.len(), VALUE_QUESTION_COUNT);
        assert_eq!(CONTENT_QUESTIONS.len(), CONTENT_QUESTION_COUNT);
        for index in ENERGY_QUESTION_INDICES {
            assert!(index < VALUE_QUESTION_COUNT);
        }
    }

    #[test]
    fn answer_labels_resolve_in_range_and_reject_out_of_range() {
        assert_eq!(
            ProfileVector::value_answer_label(1, 2),
            Some("Night owl")
        );
        assert_eq!(ProfileVector::value_answer_label(1, 9), None);
        assert_eq!(ProfileVector::value_answer_label(99, 0), None);
        assert_eq!(
            ProfileVector::content_answer_label(2, 1),
            Some("Playful")
        );
    }

    #[test]
    fn cohort_db_round_trip_defaults_unknown_to_youngest() {
        for cohort in [
            AgeCohort::EighteenToTwentyFour,
            AgeCohort::TwentyFiveToThirtyFour,
            AgeCohort::ThirtyFiveToFortyNine,
            AgeCohort::FiftyPlus,
        ] {
            assert_eq!(AgeCohort::from_db(cohort.as_db_str()), cohort);
        }
        assert_eq!(
            AgeCohort::from_db("mystery"),
            AgeCohort::EighteenToTwentyFour
        );
    }
}
