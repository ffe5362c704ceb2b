//! Market-data snapshots for one (origin, destination) pair.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::baselines::{DistanceBand, HotelTier};
use crate::geo::Coordinates;
use crate::money::quantize_money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimateSource {
    /// Prices observed from a live market-data provider.
    #[serde(alias = "travelpayouts")]
    Live,
    /// Deterministic offline baseline.
    Fallback,
}

impl EstimateSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EstimateSource::Live => "live",
            EstimateSource::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for EstimateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything an estimate provider needs to price one destination.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimateRequest {
    pub origin_code: String,
    pub destination_code: String,
    pub destination_city: String,
    pub destination_country: String,
    pub depart_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub travelers: u32,
    pub tier: HotelTier,
    pub tags: Vec<String>,
    pub origin_coords: Option<Coordinates>,
    pub destination_coords: Option<Coordinates>,
    pub nonstop_likelihood: Option<f64>,
    pub preferred_currency: Option<String>,
}

/// Provider-specific extras carried alongside an estimate.
///
/// Item URLs and identifiers let option materialization emit item-level links
/// instead of search fallbacks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EstimatePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flight_item_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flight_offer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotel_item_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotel_property_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotel_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub airline_codes: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Immutable price-range snapshot produced by an estimate provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateEstimate {
    pub provider: String,
    pub source: EstimateSource,
    pub currency: String,
    pub flight_min: Decimal,
    pub flight_max: Decimal,
    pub hotel_nightly_min: Decimal,
    pub hotel_nightly_max: Decimal,
    pub freshness_at: DateTime<Utc>,
    pub distance_km: f64,
    pub distance_band: DistanceBand,
    pub travel_time_minutes: u32,
    pub nonstop_likelihood: f64,
    pub season_multiplier: f64,
    pub tier: HotelTier,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub raw_payload: EstimatePayload,
}

impl CandidateEstimate {
    /// Midpoint of the flight range, cent-quantized.
    #[must_use]
    pub fn flight_mid(&self) -> Decimal {
        quantize_money((self.flight_min + self.flight_max) / Decimal::TWO)
    }

    /// Midpoint of the nightly hotel range, cent-quantized.
    #[must_use]
    pub fn hotel_nightly_mid(&self) -> Decimal {
        quantize_money((self.hotel_nightly_min + self.hotel_nightly_max) / Decimal::TWO)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn estimate() -> CandidateEstimate {
        CandidateEstimate {
            provider: "baseline".to_string(),
            source: EstimateSource::Fallback,
            currency: "USD".to_string(),
            flight_min: Decimal::new(26000, 2),
            flight_max: Decimal::new(68001, 2),
            hotel_nightly_min: Decimal::from(80),
            hotel_nightly_max: Decimal::from(190),
            freshness_at: Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap(),
            distance_km: 5837.0,
            distance_band: DistanceBand::Medium,
            travel_time_minutes: 300,
            nonstop_likelihood: 0.72,
            season_multiplier: 1.0,
            tier: HotelTier::Standard,
            tags: vec!["food".to_string()],
            raw_payload: EstimatePayload::default(),
        }
    }

    #[test]
    fn midpoints_round_half_up() {
        let e = estimate();
        assert_eq!(e.flight_mid(), Decimal::new(47001, 2));
        assert_eq!(e.hotel_nightly_mid(), Decimal::new(13500, 2));
    }

    #[test]
    fn source_accepts_legacy_live_label() {
        let source: EstimateSource = serde_json::from_str(r#""travelpayouts""#).unwrap();
        assert_eq!(source, EstimateSource::Live);
        assert_eq!(
            serde_json::to_string(&EstimateSource::Fallback).unwrap(),
            r#""fallback""#
        );
    }

    #[test]
    fn payload_keeps_unknown_keys() {
        let payload: EstimatePayload = serde_json::from_value(serde_json::json!({
            "hotel_name": "Le Petit",
            "campaign": "spring"
        }))
        .unwrap();
        assert_eq!(payload.hotel_name.as_deref(), Some("Le Petit"));
        assert_eq!(payload.extra["campaign"], "spring");
    }
}
