use chrono::{Duration, TimeZone};

use super::*;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap()
}

fn tags() -> Vec<String> {
    vec!["culture".to_string(), "food".to_string()]
}

fn inputs<'a>(weights: &'a BTreeMap<String, f64>, tags: &'a [String]) -> ScoreInputs<'a> {
    ScoreInputs {
        total: Decimal::from(850),
        budget: Decimal::from(1000),
        preference_weights: weights,
        candidate_tags: tags,
        season_multiplier: 1.02,
        distance_band: Some(DistanceBand::Medium),
        nonstop_likelihood: 0.72,
        freshness_at: Some(now() - Duration::hours(2)),
        timezone_delta_hours: 6.0,
        travel_time_minutes: 430,
        data_confidence: 0.9,
    }
}

fn weights() -> BTreeMap<String, f64> {
    BTreeMap::from([("culture".to_string(), 2.0), ("beach".to_string(), 1.0)])
}

#[test]
fn composite_uses_fixed_weights() {
    let weights = weights();
    let tags = tags();
    let score = score_package(&inputs(&weights, &tags), now());

    assert!((score.price_score - 100.0).abs() < 1e-9);
    assert!((score.convenience_score - 74.34).abs() < 1e-9);
    assert!((score.quality_score - 66.67).abs() < 1e-9);
    assert!((score.location_score - 93.2).abs() < 1e-9);
    assert!((score.breakdown.safety_fallback - 94.5).abs() < 1e-9);
    assert!((score.breakdown.freshness - 100.0).abs() < 1e-9);
    assert!((score.score - 87.66).abs() < 1e-9);
}

#[test]
fn explanations_follow_dimension_order() {
    let weights = weights();
    let tags = tags();
    let score = score_package(&inputs(&weights, &tags), now());
    assert_eq!(
        score.explanations,
        vec![
            "Estimated total is within budget comfort zone.",
            "Moderate convenience for route timing and duration.",
            "Partial match with your preference profile.",
            "Seasonality is in a moderate band.",
            "High confidence data mix with strong provider coverage.",
            "Price snapshot is very recent.",
        ]
    );
    assert_eq!(score.breakdown.explanations, score.explanations);
    assert_eq!(score.breakdown.weights, ScoreWeights::default());
}

#[test]
fn missing_budget_is_neutral() {
    let weights = weights();
    let tags = tags();
    let mut input = inputs(&weights, &tags);
    input.budget = Decimal::ZERO;
    let score = score_package(&input, now());
    assert!((score.price_score - 55.0).abs() < 1e-9);
    assert_eq!(
        score.explanations[0],
        "Budget not provided, using neutral price-value score."
    );
}

#[test]
fn over_budget_is_penalized() {
    let weights = weights();
    let tags = tags();
    let mut input = inputs(&weights, &tags);
    input.total = Decimal::from(1500);
    let score = score_package(&input, now());
    // |1.5 - 0.85| * 120 = 78
    assert!((score.price_score - 22.0).abs() < 1e-9);
    assert_eq!(score.explanations[0], "Estimated total exceeds your target budget.");
}

#[test]
fn preference_degenerate_cases() {
    let tags = tags();
    let empty = BTreeMap::new();
    let score = score_package(&inputs(&empty, &tags), now());
    assert!((score.quality_score - 62.0).abs() < 1e-9);

    let zeroed = BTreeMap::from([("culture".to_string(), 0.0), ("nightlife".to_string(), -1.0)]);
    let score = score_package(&inputs(&zeroed, &tags), now());
    assert!((score.quality_score - 58.0).abs() < 1e-9);
}

#[test]
fn preference_labels_match_case_insensitively() {
    let tags = vec![" Culture ".to_string()];
    let weights = BTreeMap::from([("CULTURE".to_string(), 1.0)]);
    let score = score_package(&inputs(&weights, &tags), now());
    assert!((score.quality_score - 100.0).abs() < 1e-9);
    assert_eq!(score.explanations[2], "Strong match with your preference profile.");
}

#[test]
fn seasonal_fit_is_floored() {
    let weights = weights();
    let tags = tags();
    let mut input = inputs(&weights, &tags);
    input.season_multiplier = 1.7;
    let score = score_package(&input, now());
    assert!((score.location_score - 20.0).abs() < 1e-9);
    assert_eq!(
        score.explanations[3],
        "Peak-season pressure may raise prices and crowding."
    );
}

#[test]
fn freshness_steps_by_age() {
    let weights = weights();
    let tags = tags();
    let cases = [
        (Some(now() - Duration::hours(30)), 68.0),
        (Some(now() - Duration::hours(100)), 52.0),
        (Some(now() - Duration::hours(200)), 34.0),
        (Some(now() + Duration::hours(3)), 100.0),
        (None, 42.0),
    ];
    for (freshness_at, expected) in cases {
        let mut input = inputs(&weights, &tags);
        input.freshness_at = freshness_at;
        let score = score_package(&input, now());
        assert!(
            (score.breakdown.freshness - expected).abs() < 1e-9,
            "{freshness_at:?} -> {}",
            score.breakdown.freshness
        );
    }
}

#[test]
fn unknown_band_uses_neutral_base() {
    let weights = weights();
    let tags = tags();
    let mut input = inputs(&weights, &tags);
    input.distance_band = None;
    input.nonstop_likelihood = 0.0;
    input.timezone_delta_hours = 0.0;
    input.travel_time_minutes = 0;
    let score = score_package(&input, now());
    // 68 * 0.45 + 100 * 0.2
    assert!((score.convenience_score - 50.6).abs() < 1e-9);
}

#[test]
fn non_finite_inputs_degrade_to_defaults() {
    let weights = weights();
    let tags = tags();
    let mut input = inputs(&weights, &tags);
    input.nonstop_likelihood = f64::NAN;
    input.timezone_delta_hours = f64::INFINITY;
    input.season_multiplier = f64::NAN;
    input.data_confidence = f64::NAN;
    let score = score_package(&input, now());
    assert!(score.score.is_finite());
    assert!((0.0..=100.0).contains(&score.score));
    assert!((score.breakdown.safety_fallback - 86.25).abs() < 1e-9);
    assert!((score.location_score - 96.0).abs() < 1e-9);
}
