//! Multi-factor compatibility scoring between two questionnaire profiles.
//!
//! Pure arithmetic over two [`ProfileVector`]s with no side effects and no
//! error paths; absent data simply contributes zero. All weights are extracted here so
//! they can be calibrated in one place.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::profile::{
    ProfileVector, CONTENT_QUESTION_COUNT, ENERGY_QUESTION_INDICES, VALUE_QUESTION_COUNT,
};

// ---------------------------------------------------------------------------
// Scoring constants
// ---------------------------------------------------------------------------

/// Points per value question answered identically.
pub const VALUE_EXACT_POINTS: f64 = 10.0;

/// Points per value question answered one option apart. Ordinal adjacency is
/// still a compatible answer, not a miss.
pub const VALUE_ADJACENT_POINTS: f64 = 5.0;

/// Points per content question matched exactly, same cohort only.
pub const CONTENT_MATCH_POINTS: f64 = 6.0;

/// Flat content credit when cohorts differ. Cross-cohort matches are valid
/// matches and must not bottom out at zero.
pub const CROSS_COHORT_BASELINE: f64 = 5.0;

/// Points for exact agreement on a social-energy question.
pub const ENERGY_EXACT_POINTS: f64 = 4.0;

/// Points for adjacent agreement on a social-energy question.
pub const ENERGY_ADJACENT_POINTS: f64 = 2.0;

/// Points per shared lifestyle tag, up to [`LIFESTYLE_TAG_CAP`].
pub const LIFESTYLE_TAG_POINTS: f64 = 2.0;
pub const LIFESTYLE_TAG_CAP: usize = 4;

/// Education credit: full at rank distance 0, partial at distance 1.
pub const EDUCATION_EXACT_POINTS: f64 = 5.0;
pub const EDUCATION_ADJACENT_POINTS: f64 = 2.5;

/// Points per social platform present on both profiles, up to
/// [`SOCIAL_LINK_CAP`].
pub const SOCIAL_LINK_POINTS: f64 = 2.0;
pub const SOCIAL_LINK_CAP: usize = 3;

/// Verification bonus: higher when both profiles are verified.
pub const BOTH_VERIFIED_BONUS: f64 = 5.0;
pub const ONE_VERIFIED_BONUS: f64 = 2.0;

/// Activity-recency bonus: higher when both were active inside the short
/// window, lower inside the long window, zero otherwise.
pub const RECENT_ACTIVITY_BONUS: f64 = 4.0;
pub const LAPSED_ACTIVITY_BONUS: f64 = 2.0;
pub const RECENT_ACTIVITY_WINDOW_HOURS: i64 = 24;
pub const LAPSED_ACTIVITY_WINDOW_DAYS: i64 = 7;

/// The maximum achievable raw score. `percentage` is the raw score measured
/// against this ceiling.
pub const MAX_RAW_SCORE: f64 = VALUE_QUESTION_COUNT as f64 * VALUE_EXACT_POINTS
    + CONTENT_QUESTION_COUNT as f64 * CONTENT_MATCH_POINTS
    + ENERGY_QUESTION_INDICES.len() as f64 * ENERGY_EXACT_POINTS
    + LIFESTYLE_TAG_CAP as f64 * LIFESTYLE_TAG_POINTS
    + EDUCATION_EXACT_POINTS
    + SOCIAL_LINK_CAP as f64 * SOCIAL_LINK_POINTS
    + BOTH_VERIFIED_BONUS
    + RECENT_ACTIVITY_BONUS;

/// How many shared facts each extractor surfaces at most.
pub const SHARED_FACT_CAP: usize = 3;

// ---------------------------------------------------------------------------
// Score breakdown
// ---------------------------------------------------------------------------

/// Per-category sub-scores. The five fields reconcile to
/// [`ScoreBreakdown::raw_score`].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ComponentScores {
    pub values: f64,
    pub content: f64,
    pub lifestyle: f64,
    pub education: f64,
    pub social: f64,
}

impl ComponentScores {
    pub fn total(&self) -> f64 {
        self.values + self.content + self.lifestyle + self.education + self.social
    }
}

/// Result of scoring two profiles. Computed on demand and never persisted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub raw_score: f64,
    pub percentage: u8,
    pub components: ComponentScores,
}

impl ScoreBreakdown {
    fn zero() -> Self {
        Self {
            raw_score: 0.0,
            percentage: 0,
            components: ComponentScores::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Score two profiles against each other. Symmetric in `a` and `b`; `now`
/// anchors the activity-recency bonus and is injected so the result is
/// deterministic for fixed inputs.
///
/// Two profiles with no answers at all score exactly zero; unscored matches
/// are never produced.
pub fn score(a: &ProfileVector, b: &ProfileVector, now: DateTime<Utc>) -> ScoreBreakdown {
    if a.value_answers.is_empty()
        && b.value_answers.is_empty()
        && a.content_answers.is_empty()
        && b.content_answers.is_empty()
    {
        return ScoreBreakdown::zero();
    }

    let components = ComponentScores {
        values: values_component(a, b),
        content: content_component(a, b),
        lifestyle: energy_component(a, b) + lifestyle_overlap_component(a, b),
        education: education_component(a, b),
        social: social_link_component(a, b)
            + verification_component(a, b)
            + activity_recency_component(a, b, now),
    };

    let raw_score = components.total();
    let percentage = ((raw_score / MAX_RAW_SCORE * 100.0).min(100.0)).round() as u8;

    ScoreBreakdown {
        raw_score,
        percentage,
        components,
    }
}

fn overlapping_prefix(a: &[u8], b: &[u8], schema_len: usize) -> usize {
    a.len().min(b.len()).min(schema_len)
}

fn values_component(a: &ProfileVector, b: &ProfileVector) -> f64 {
    let prefix = overlapping_prefix(&a.value_answers, &b.value_answers, VALUE_QUESTION_COUNT);
    let mut total = 0.0;
    for i in 0..prefix {
        total += graded_answer_points(
            a.value_answers[i],
            b.value_answers[i],
            VALUE_EXACT_POINTS,
            VALUE_ADJACENT_POINTS,
        );
    }
    total
}

fn content_component(a: &ProfileVector, b: &ProfileVector) -> f64 {
    if a.age_cohort != b.age_cohort {
        return CROSS_COHORT_BASELINE;
    }
    let prefix = overlapping_prefix(&a.content_answers, &b.content_answers, CONTENT_QUESTION_COUNT);
    (0..prefix)
        .filter(|&i| a.content_answers[i] == b.content_answers[i])
        .count() as f64
        * CONTENT_MATCH_POINTS
}

fn energy_component(a: &ProfileVector, b: &ProfileVector) -> f64 {
    let mut total = 0.0;
    for &index in &ENERGY_QUESTION_INDICES {
        let (Some(&ours), Some(&theirs)) = (a.value_answers.get(index), b.value_answers.get(index))
        else {
            continue;
        };
        total += graded_answer_points(ours, theirs, ENERGY_EXACT_POINTS, ENERGY_ADJACENT_POINTS);
    }
    total
}

fn lifestyle_overlap_component(a: &ProfileVector, b: &ProfileVector) -> f64 {
    let shared = a.lifestyle.intersection(&b.lifestyle).count();
    shared.min(LIFESTYLE_TAG_CAP) as f64 * LIFESTYLE_TAG_POINTS
}

fn education_component(a: &ProfileVector, b: &ProfileVector) -> f64 {
    let (Some(ours), Some(theirs)) = (a.education, b.education) else {
        return 0.0;
    };
    match ours.rank().abs_diff(theirs.rank()) {
        0 => EDUCATION_EXACT_POINTS,
        1 => EDUCATION_ADJACENT_POINTS,
        _ => 0.0,
    }
}

fn social_link_component(a: &ProfileVector, b: &ProfileVector) -> f64 {
    let shared = a.social_links.intersection(&b.social_links).count();
    shared.min(SOCIAL_LINK_CAP) as f64 * SOCIAL_LINK_POINTS
}

fn verification_component(a: &ProfileVector, b: &ProfileVector) -> f64 {
    match (a.verified, b.verified) {
        (true, true) => BOTH_VERIFIED_BONUS,
        (true, false) | (false, true) => ONE_VERIFIED_BONUS,
        (false, false) => 0.0,
    }
}

fn activity_recency_component(
    a: &ProfileVector,
    b: &ProfileVector,
    now: DateTime<Utc>,
) -> f64 {
    let (Some(a_seen), Some(b_seen)) = (a.last_active_at, b.last_active_at) else {
        return 0.0;
    };
    let short = Duration::hours(RECENT_ACTIVITY_WINDOW_HOURS);
    let long = Duration::days(LAPSED_ACTIVITY_WINDOW_DAYS);
    let a_age = now - a_seen;
    let b_age = now - b_seen;

    if a_age <= short && b_age <= short {
        RECENT_ACTIVITY_BONUS
    } else if a_age <= long && b_age <= long {
        LAPSED_ACTIVITY_BONUS
    } else {
        0.0
    }
}

fn graded_answer_points(ours: u8, theirs: u8, exact: f64, adjacent: f64) -> f64 {
    match ours.abs_diff(theirs) {
        0 => exact,
        1 => adjacent,
        _ => 0.0,
    }
}

// ---------------------------------------------------------------------------
// Shared facts
// ---------------------------------------------------------------------------

/// Option labels both profiles chose identically across the value questions,
/// in question order, capped at [`SHARED_FACT_CAP`]. Answers outside the
/// schema's option range are skipped, since there is nothing readable to surface.
pub fn shared_value_facts(a: &ProfileVector, b: &ProfileVector) -> Vec<&'static str> {
    let prefix = overlapping_prefix(&a.value_answers, &b.value_answers, VALUE_QUESTION_COUNT);
    let mut facts = Vec::new();
    for i in 0..prefix {
        if facts.len() >= SHARED_FACT_CAP {
            break;
        }
        if a.value_answers[i] != b.value_answers[i] {
            continue;
        }
        if let Some(label) = ProfileVector::value_answer_label(i, a.value_answers[i]) {
            facts.push(label);
        }
    }
    facts
}

/// Same as [`shared_value_facts`] over the content questions. Empty when the
/// cohorts differ, because content answers are not comparable across cohorts.
pub fn shared_content_facts(a: &ProfileVector, b: &ProfileVector) -> Vec<&'static str> {
    if a.age_cohort != b.age_cohort {
        return Vec::new();
    }
    let prefix = overlapping_prefix(&a.content_answers, &b.content_answers, CONTENT_QUESTION_COUNT);
    let mut facts = Vec::new();
    for i in 0..prefix {
        if facts.len() >= SHARED_FACT_CAP {
            break;
        }
        if a.content_answers[i] != b.content_answers[i] {
            continue;
        }
        if let Some(label) = ProfileVector::content_answer_label(i, a.content_answers[i]) {
            facts.push(label);
        }
    }
    facts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{AgeCohort, EducationLevel, LifestyleTag, SocialLink};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn profile(id: &str) -> ProfileVector {
        ProfileVector::empty(id, AgeCohort::TwentyFiveToThirtyFour)
    }

    fn full_profile(id: &str) -> ProfileVector {
        let mut p = profile(id);
        p.value_answers = vec![0, 1, 2, 0, 1, 2, 0, 1, 2, 0];
        p.content_answers = vec![0, 1, 2, 0, 1];
        p.education = Some(EducationLevel::Bachelors);
        p.lifestyle = [
            LifestyleTag::ExercisesWeekly,
            LifestyleTag::DrinksSocially,
            LifestyleTag::NoChildren,
        ]
        .into_iter()
        .collect();
        p.social_links = [SocialLink::Instagram, SocialLink::Spotify]
            .into_iter()
            .collect();
        p.verified = true;
        p.last_active_at = Some(now() - Duration::hours(2));
        p
    }

    #[test]
    fn zero_data_law_scores_exactly_zero() {
        let mut a = profile("a");
        let mut b = profile("b");
        // Even with verification and recency present, no answers means no
        // score.
        a.verified = true;
        b.verified = true;
        a.last_active_at = Some(now());
        b.last_active_at = Some(now());

        let breakdown = score(&a, &b, now());
        assert_eq!(breakdown.percentage, 0);
        assert_eq!(breakdown.raw_score, 0.0);
    }

    #[test]
    fn symmetry_holds_for_asymmetric_data() {
        let mut a = full_profile("a");
        let mut b = full_profile("b");
        b.value_answers = vec![0, 2, 2, 1];
        b.content_answers = vec![0];
        b.education = Some(EducationLevel::Masters);
        b.verified = false;
        a.occupation = Some("nurse".to_string());

        let ab = score(&a, &b, now());
        let ba = score(&b, &a, now());
        assert_eq!(ab.percentage, ba.percentage);
        assert_eq!(ab.raw_score, ba.raw_score);
    }

    #[test]
    fn boundedness_at_full_agreement() {
        let a = full_profile("a");
        let b = full_profile("b");
        let breakdown = score(&a, &b, now());
        assert!(breakdown.percentage <= 100);
        assert!(breakdown.raw_score <= MAX_RAW_SCORE);
    }

    #[test]
    fn monotonicity_in_exactly_equal_value_answers() {
        let mut previous = f64::MIN;
        for equal_count in 0..=VALUE_QUESTION_COUNT {
            let mut a = profile("a");
            let mut b = profile("b");
            // First `equal_count` answers agree; the rest differ by 2 (no
            // credit).
            a.value_answers = (0..VALUE_QUESTION_COUNT).map(|_| 0).collect();
            b.value_answers = (0..VALUE_QUESTION_COUNT)
                .map(|i| if i < equal_count { 0 } else { 2 })
                .collect();
            let raw = score(&a, &b, now()).raw_score;
            assert!(
                raw >= previous,
                "raw score decreased at {equal_count} equal answers"
            );
            previous = raw;
        }
    }

    #[test]
    fn identical_values_only_profiles_hit_the_values_share_of_max() {
        let mut a = profile("a");
        let mut b = profile("b");
        a.value_answers = vec![0, 1, 2, 0, 1, 2, 0, 1, 2, 0];
        b.value_answers = a.value_answers.clone();

        let breakdown = score(&a, &b, now());
        // Ten exact value matches plus the two energy questions scoring
        // again at their smaller weight.
        let expected_raw = VALUE_QUESTION_COUNT as f64 * VALUE_EXACT_POINTS
            + ENERGY_QUESTION_INDICES.len() as f64 * ENERGY_EXACT_POINTS;
        assert_eq!(breakdown.raw_score, expected_raw);
        assert_eq!(
            breakdown.percentage,
            ((expected_raw / MAX_RAW_SCORE * 100.0).round()) as u8
        );
        // Deterministic across repeated calls.
        assert_eq!(score(&a, &b, now()).raw_score, breakdown.raw_score);
    }

    #[test]
    fn adjacent_answers_earn_half_credit() {
        let mut a = profile("a");
        let mut b = profile("b");
        a.value_answers = vec![1];
        b.value_answers = vec![2];
        assert_eq!(score(&a, &b, now()).components.values, VALUE_ADJACENT_POINTS);

        b.value_answers = vec![3];
        assert_eq!(score(&a, &b, now()).components.values, 0.0);
    }

    #[test]
    fn cross_cohort_content_gets_flat_baseline() {
        let mut a = profile("a");
        let mut b = ProfileVector::empty("b", AgeCohort::ThirtyFiveToFortyNine);
        a.content_answers = vec![0, 1, 2];
        b.content_answers = vec![0, 1, 2];

        let breakdown = score(&a, &b, now());
        assert_eq!(breakdown.components.content, CROSS_COHORT_BASELINE);

        // Same cohort, same answers: per-match credit instead.
        b.age_cohort = a.age_cohort;
        let breakdown = score(&a, &b, now());
        assert_eq!(breakdown.components.content, 3.0 * CONTENT_MATCH_POINTS);
    }

    #[test]
    fn components_reconcile_to_raw_score() {
        let a = full_profile("a");
        let mut b = full_profile("b");
        b.value_answers = vec![0, 0, 2, 1, 1, 2, 1, 1, 0, 0];
        let breakdown = score(&a, &b, now());
        assert!((breakdown.components.total() - breakdown.raw_score).abs() < 1e-9);
    }

    #[test]
    fn recency_bonus_tiers_by_window() {
        let mut a = full_profile("a");
        let mut b = full_profile("b");

        a.last_active_at = Some(now() - Duration::hours(3));
        b.last_active_at = Some(now() - Duration::hours(20));
        let recent = score(&a, &b, now());

        b.last_active_at = Some(now() - Duration::days(3));
        let lapsed = score(&a, &b, now());

        b.last_active_at = Some(now() - Duration::days(30));
        let stale = score(&a, &b, now());

        assert_eq!(
            recent.components.social - lapsed.components.social,
            RECENT_ACTIVITY_BONUS - LAPSED_ACTIVITY_BONUS
        );
        assert_eq!(
            lapsed.components.social - stale.components.social,
            LAPSED_ACTIVITY_BONUS
        );
    }

    #[test]
    fn shared_facts_are_ordered_capped_and_readable() {
        let mut a = profile("a");
        let mut b = profile("b");
        a.value_answers = vec![0, 2, 1, 2, 0, 1, 1];
        b.value_answers = vec![0, 2, 1, 0, 0, 1, 1];

        let facts = shared_value_facts(&a, &b);
        assert_eq!(facts.len(), SHARED_FACT_CAP);
        assert_eq!(facts[0], "Out with friends");
        assert_eq!(facts[1], "Night owl");
        assert_eq!(facts[2], "Small circles");
    }

    #[test]
    fn shared_facts_skip_out_of_range_answers() {
        let mut a = profile("a");
        let mut b = profile("b");
        a.value_answers = vec![9, 1];
        b.value_answers = vec![9, 1];
        // Index 9 names no option for question 0; only the second answer is
        // readable.
        assert_eq!(shared_value_facts(&a, &b), vec!["Somewhere in between"]);
    }

    #[test]
    fn shared_content_facts_require_matching_cohort() {
        let mut a = profile("a");
        let mut b = profile("b");
        a.content_answers = vec![3, 1];
        b.content_answers = vec![3, 1];
        assert_eq!(
            shared_content_facts(&a, &b),
            vec!["Physical closeness", "Steady"]
        );

        b.age_cohort = AgeCohort::FiftyPlus;
        assert!(shared_content_facts(&a, &b).is_empty());
    }
}
