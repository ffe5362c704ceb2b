//! Six-dimension package scorer.
//!
//! Each dimension is scored on `[0, 100]` with a short note; the composite is
//! the weighted sum under [`ScoreWeights::default`]. Non-finite inputs fall
//! back to neutral values, so scoring never fails.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use trippilot_core::{DistanceBand, ScoreBreakdown, ScoreWeights};

/// Data confidence assumed when the caller passes a non-finite value.
pub const DEFAULT_DATA_CONFIDENCE: f64 = 0.75;

/// Signals describing one priced combination.
#[derive(Debug, Clone)]
pub struct ScoreInputs<'a> {
    pub total: Decimal,
    pub budget: Decimal,
    pub preference_weights: &'a BTreeMap<String, f64>,
    pub candidate_tags: &'a [String],
    pub season_multiplier: f64,
    pub distance_band: Option<DistanceBand>,
    pub nonstop_likelihood: f64,
    pub freshness_at: Option<DateTime<Utc>>,
    pub timezone_delta_hours: f64,
    pub travel_time_minutes: u32,
    pub data_confidence: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PackageScore {
    pub score: f64,
    pub price_score: f64,
    pub convenience_score: f64,
    /// Preference match.
    pub quality_score: f64,
    /// Seasonal fit.
    pub location_score: f64,
    pub explanations: Vec<String>,
    pub breakdown: ScoreBreakdown,
}

/// Score a combination. `now` anchors the freshness age.
#[must_use]
pub fn score_package(inputs: &ScoreInputs<'_>, now: DateTime<Utc>) -> PackageScore {
    let weights = ScoreWeights::default();

    let (price_value, price_note) = price_value(inputs.total, inputs.budget);
    let (convenience, convenience_note) = convenience(
        inputs.distance_band,
        finite_or(inputs.nonstop_likelihood, 0.0),
        finite_or(inputs.timezone_delta_hours, 0.0).abs(),
        inputs.travel_time_minutes,
    );
    let (preference_match, preference_note) =
        preference_match(inputs.preference_weights, inputs.candidate_tags);
    let (seasonal_fit, seasonal_note) = seasonal_fit(finite_or(inputs.season_multiplier, 1.0));
    let (safety_fallback, safety_note) =
        safety_fallback(finite_or(inputs.data_confidence, DEFAULT_DATA_CONFIDENCE));
    let (freshness, freshness_note) = freshness(inputs.freshness_at, now);

    let composite = price_value * weights.price_value
        + convenience * weights.convenience
        + preference_match * weights.preference_match
        + seasonal_fit * weights.seasonal_fit
        + safety_fallback * weights.safety_fallback
        + freshness * weights.freshness;

    let explanations: Vec<String> = [
        price_note,
        convenience_note,
        preference_note,
        seasonal_note,
        safety_note,
        freshness_note,
    ]
    .into_iter()
    .map(str::to_string)
    .collect();

    let breakdown = ScoreBreakdown {
        price_value: round2(price_value),
        convenience: round2(convenience),
        preference_match: round2(preference_match),
        seasonal_fit: round2(seasonal_fit),
        safety_fallback: round2(safety_fallback),
        freshness: round2(freshness),
        weights,
        explanations: explanations.clone(),
        distance_band: None,
        season_multiplier: None,
        freshness_timestamp: None,
        source: None,
        data_confidence: None,
        family_friendly: None,
        why_ranked: Vec::new(),
    };

    PackageScore {
        score: round2(composite),
        price_score: round2(price_value),
        convenience_score: round2(convenience),
        quality_score: round2(preference_match),
        location_score: round2(seasonal_fit),
        explanations,
        breakdown,
    }
}

fn price_value(total: Decimal, budget: Decimal) -> (f64, &'static str) {
    if budget <= Decimal::ZERO {
        return (55.0, "Budget not provided, using neutral price-value score.");
    }
    let ratio = total
        .checked_div(budget)
        .and_then(|r| r.to_f64())
        .unwrap_or(1.0);
    let score = (100.0 - (ratio - 0.85).abs() * 120.0).clamp(0.0, 100.0);
    let note = if ratio <= 0.9 {
        "Estimated total is within budget comfort zone."
    } else if ratio <= 1.05 {
        "Estimated total is close to your budget target."
    } else {
        "Estimated total exceeds your target budget."
    };
    (round2(score), note)
}

fn convenience(
    band: Option<DistanceBand>,
    nonstop_likelihood: f64,
    timezone_delta_hours: f64,
    travel_time_minutes: u32,
) -> (f64, &'static str) {
    let distance_score = match band {
        Some(DistanceBand::Short) => 92.0,
        Some(DistanceBand::Medium) => 78.0,
        Some(DistanceBand::Long) => 60.0,
        Some(DistanceBand::UltraLong) => 45.0,
        None => 68.0,
    };
    let nonstop_score = nonstop_likelihood.clamp(0.0, 1.0) * 100.0;
    let timezone_penalty = (timezone_delta_hours * 4.5).clamp(0.0, 38.0);
    let redeye_penalty = if travel_time_minutes >= 420 {
        (f64::from(travel_time_minutes - 420) / 18.0).clamp(0.0, 22.0)
    } else {
        0.0
    };

    let raw = distance_score * 0.45 + nonstop_score * 0.35 + (100.0 - timezone_penalty) * 0.2;
    let score = (raw - redeye_penalty).clamp(0.0, 100.0);
    let note = if score >= 80.0 {
        "Convenient route proxy: favorable duration, timezone shift, and nonstop odds."
    } else if score >= 60.0 {
        "Moderate convenience for route timing and duration."
    } else {
        "Long-haul or timezone-heavy route may reduce comfort."
    };
    (round2(score), note)
}

fn preference_match(weights: &BTreeMap<String, f64>, tags: &[String]) -> (f64, &'static str) {
    if weights.is_empty() {
        return (62.0, "No explicit preferences supplied, using balanced defaults.");
    }

    let tags: Vec<String> = tags.iter().map(|t| t.trim().to_lowercase()).collect();
    let mut total_weight = 0.0;
    let mut matched_weight = 0.0;
    for (label, weight) in weights {
        if !weight.is_finite() || *weight <= 0.0 {
            continue;
        }
        total_weight += weight;
        let label = label.trim().to_lowercase();
        if tags.contains(&label) {
            matched_weight += weight;
        }
    }

    if total_weight <= 0.0 {
        return (
            58.0,
            "Preference weights normalized to zero; fallback match score applied.",
        );
    }

    let score = (matched_weight / total_weight * 100.0).clamp(0.0, 100.0);
    let note = if score >= 80.0 {
        "Strong match with your preference profile."
    } else if score >= 55.0 {
        "Partial match with your preference profile."
    } else {
        "Weak preference match for this destination."
    };
    (round2(score), note)
}

fn seasonal_fit(season_multiplier: f64) -> (f64, &'static str) {
    let score = (96.0 - (season_multiplier - 1.0).abs() * 140.0).clamp(20.0, 100.0);
    let note = if season_multiplier >= 1.14 {
        "Peak-season pressure may raise prices and crowding."
    } else if season_multiplier <= 0.92 {
        "Off-season timing likely improves value."
    } else {
        "Seasonality is in a moderate band."
    };
    (round2(score), note)
}

fn safety_fallback(data_confidence: f64) -> (f64, &'static str) {
    let confidence = data_confidence.clamp(0.0, 1.0);
    let score = round2(45.0 + confidence * 55.0);
    let note = if confidence >= 0.8 {
        "High confidence data mix with strong provider coverage."
    } else if confidence >= 0.55 {
        "Mixed live/fallback data confidence."
    } else {
        "Low confidence: fallback-heavy estimates were used."
    };
    (score, note)
}

fn freshness(freshness_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> (f64, &'static str) {
    let Some(at) = freshness_at else {
        return (
            42.0,
            "Freshness timestamp unavailable; conservative freshness score applied.",
        );
    };
    // Future timestamps count as brand new.
    #[allow(clippy::cast_precision_loss)]
    let age_hours = (now - at).num_seconds().max(0) as f64 / 3600.0;
    if age_hours <= 4.0 {
        (100.0, "Price snapshot is very recent.")
    } else if age_hours <= 24.0 {
        (86.0, "Price snapshot is within the last day.")
    } else if age_hours <= 72.0 {
        (68.0, "Price snapshot is a few days old.")
    } else if age_hours <= 168.0 {
        (52.0, "Price snapshot is about a week old.")
    } else {
        (34.0, "Price snapshot is stale and may drift.")
    }
}

fn finite_or(value: f64, default: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        default
    }
}

/// Round to two decimals, half away from zero.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
#[path = "scorer_test.rs"]
mod tests;
