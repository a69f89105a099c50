// Rust guideline compliant 2026-10-12

//! Deterministic SAW (Simple Additive Weighting) score and the KNN feature
//! vector, both derived from a recipient's [`Criteria`].
//!
//! Entry points: [`compute_score`], [`vectorize`].

use domain::{Criteria, CriterionKind, FEATURE_COUNT, FEATURE_ORDER};
use serde::Serialize;

// ---------------------------------------------------------------------------
// ScoreCalculator
// ---------------------------------------------------------------------------

/// Weight of DTKS registration in the raw score.
pub const DTKS_WEIGHT: u32 = 10;

/// Highest reachable raw score: DTKS plus one per additive criterion.
pub const MAX_RAW_SCORE: u32 = DTKS_WEIGHT + 6;

/// Factor label recorded when DTKS registration contributes.
pub const DTKS_LABEL: &str = "DTKS";

/// Result of [`compute_score`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    /// Raw weighted sum, clamped at zero.
    pub raw: u32,
    /// `raw / MAX_RAW_SCORE`, rounded to four decimals. Always in `[0, 1]`.
    pub normalized: f64,
    /// Labels of factors that raised the score, DTKS first.
    pub contributing: Vec<&'static str>,
    /// Labels of factors that lowered the score.
    pub reducing: Vec<&'static str>,
}

/// Compute the SAW score of one recipient.
///
/// DTKS adds [`DTKS_WEIGHT`], each additive criterion adds 1, each reducing
/// criterion subtracts 1. The raw sum is clamped at 0 and normalized by
/// [`MAX_RAW_SCORE`].
#[must_use]
pub fn compute_score(criteria: &Criteria) -> ScoreBreakdown {
    let mut raw: i64 = 0;
    let mut contributing = Vec::new();
    let mut reducing = Vec::new();

    if criteria.dtks {
        raw += i64::from(DTKS_WEIGHT);
        contributing.push(DTKS_LABEL);
    }
    for criterion in FEATURE_ORDER {
        if !criteria.is_set(criterion) {
            continue;
        }
        match criterion.kind() {
            CriterionKind::Additive => {
                raw += 1;
                contributing.push(criterion.label());
            }
            CriterionKind::Reducing => {
                raw -= 1;
                reducing.push(criterion.label());
            }
        }
    }

    let raw = u32::try_from(raw.max(0)).unwrap_or(MAX_RAW_SCORE);
    ScoreBreakdown { raw, normalized: normalize(raw), contributing, reducing }
}

fn normalize(raw: u32) -> f64 {
    let ratio = f64::from(raw) / f64::from(MAX_RAW_SCORE);
    (ratio * 10_000.0).round() / 10_000.0
}

// ---------------------------------------------------------------------------
// FeatureVectorizer
// ---------------------------------------------------------------------------

/// Feature vector in [`FEATURE_ORDER`]: `1.0` where the criterion is set,
/// `0.0` otherwise. DTKS is not a feature.
#[must_use]
pub fn vectorize(criteria: &Criteria) -> [f64; FEATURE_COUNT] {
    FEATURE_ORDER.map(|c| if criteria.is_set(c) { 1.0 } else { 0.0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::ADDITIVE_CRITERIA;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    // ------------------------------------------------------------------
    // compute_score
    // ------------------------------------------------------------------

    #[test]
    fn max_raw_score_covers_every_additive_criterion() {
        assert_eq!(MAX_RAW_SCORE as usize, DTKS_WEIGHT as usize + ADDITIVE_CRITERIA.len());
    }

    #[test]
    fn empty_criteria_scores_zero() {
        let s = compute_score(&Criteria::default());
        assert_eq!(s.raw, 0);
        assert!(approx(s.normalized, 0.0));
        assert!(s.contributing.is_empty());
        assert!(s.reducing.is_empty());
    }

    #[test]
    fn dtks_poverty_unemployed_pkh_scores_eleven() {
        let criteria = Criteria {
            dtks: true,
            extreme_poverty: true,
            unemployed: true,
            pkh: true,
            ..Criteria::default()
        };
        let s = compute_score(&criteria);
        assert_eq!(s.raw, 11);
        assert!(approx(s.normalized, 0.6875));
        assert_eq!(s.contributing, vec!["DTKS", "Extreme Poverty", "Unemployed"]);
        assert_eq!(s.reducing, vec!["PKH"]);
    }

    #[test]
    fn all_additive_reaches_one() {
        let criteria = Criteria {
            dtks: true,
            extreme_poverty: true,
            loss_of_livelihood: true,
            unemployed: true,
            disability: true,
            chronic_illness: true,
            single_elderly_household: true,
            ..Criteria::default()
        };
        let s = compute_score(&criteria);
        assert_eq!(s.raw, MAX_RAW_SCORE);
        assert!(approx(s.normalized, 1.0));
    }

    #[test]
    fn reducing_only_clamps_at_zero() {
        let criteria = Criteria {
            pkh: true,
            pre_employment_card: true,
            bst: true,
            other_social_aid: true,
            ..Criteria::default()
        };
        let s = compute_score(&criteria);
        assert_eq!(s.raw, 0);
        assert!(approx(s.normalized, 0.0));
        assert_eq!(s.reducing.len(), 4);
    }

    #[test]
    fn normalized_is_rounded_to_four_decimals() {
        // Every k / 16 is exact at four decimals.
        let one = compute_score(&Criteria { disability: true, ..Criteria::default() });
        assert!(approx(one.normalized, 0.0625));
        let dtks = compute_score(&Criteria { dtks: true, ..Criteria::default() });
        assert!(approx(dtks.normalized, 0.625));
        assert!(approx(normalize(5), 0.3125));
    }

    #[test]
    fn score_is_deterministic() {
        let criteria = Criteria { dtks: true, bst: true, chronic_illness: true, ..Criteria::default() };
        assert_eq!(compute_score(&criteria), compute_score(&criteria));
    }

    #[test]
    fn breakdown_serializes_factor_labels() {
        let s = compute_score(&Criteria { dtks: true, ..Criteria::default() });
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["raw"], 10);
        assert_eq!(json["contributing"][0], "DTKS");
    }

    fn criteria_from_mask(mask: u16) -> Criteria {
        let bit = |n: u16| mask & (1 << n) != 0;
        Criteria {
            dtks: bit(0),
            extreme_poverty: bit(1),
            loss_of_livelihood: bit(2),
            unemployed: bit(3),
            disability: bit(4),
            chronic_illness: bit(5),
            single_elderly_household: bit(6),
            pkh: bit(7),
            pre_employment_card: bit(8),
            bst: bit(9),
            other_social_aid: bit(10),
        }
    }

    #[test]
    fn every_flag_combination_matches_closed_form() {
        for mask in 0..(1_u16 << 11) {
            let c = criteria_from_mask(mask);
            let additive = [
                c.extreme_poverty,
                c.loss_of_livelihood,
                c.unemployed,
                c.disability,
                c.chronic_illness,
                c.single_elderly_household,
            ]
            .iter()
            .filter(|&&f| f)
            .count();
            let reducing =
                [c.pkh, c.pre_employment_card, c.bst, c.other_social_aid].iter().filter(|&&f| f).count();
            let expected_raw = (i32::from(c.dtks) * 10 + i32::try_from(additive).unwrap()
                - i32::try_from(reducing).unwrap())
            .max(0);
            let expected_normalized = (f64::from(expected_raw) / 16.0 * 10_000.0).round() / 10_000.0;

            let s = compute_score(&c);
            assert_eq!(i64::from(s.raw), i64::from(expected_raw), "mask {mask:#013b}");
            assert!(approx(s.normalized, expected_normalized), "mask {mask:#013b}");
            assert!((0.0..=1.0).contains(&s.normalized), "mask {mask:#013b}");
            assert_eq!(s.contributing.len(), additive + usize::from(c.dtks));
            assert_eq!(s.reducing.len(), reducing);
            assert_eq!(vectorize(&c).len(), 10);
        }
    }

    // ------------------------------------------------------------------
    // vectorize
    // ------------------------------------------------------------------

    #[test]
    fn vectorize_follows_feature_order() {
        let criteria = Criteria {
            dtks: true,
            extreme_poverty: true,
            single_elderly_household: true,
            other_social_aid: true,
            ..Criteria::default()
        };
        let v = vectorize(&criteria);
        assert_eq!(v, [1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn vectorize_ignores_dtks() {
        let with = vectorize(&Criteria { dtks: true, ..Criteria::default() });
        assert_eq!(with, [0.0; FEATURE_COUNT]);
    }
}
