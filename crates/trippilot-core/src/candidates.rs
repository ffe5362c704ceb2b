//! Destination candidates and their merge-only metadata bag.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::baselines::{DistanceBand, HotelTier};
use crate::estimate::{CandidateEstimate, EstimateSource};
use crate::geo::Coordinates;
use crate::lenient::{lenient_bool, lenient_enum, lenient_f64, lenient_u32};
use crate::money::lenient_money;

/// One airport under consideration as a trip destination for a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationCandidate {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub airport_code: String,
    pub city_name: String,
    pub country_code: String,
    pub coordinates: Option<Coordinates>,
    pub timezone: String,
    /// 1-based position in the ranked list.
    pub rank: u32,
    #[serde(default)]
    pub metadata: CandidateMetadata,
}

/// Heuristic and enrichment outputs attached to a candidate.
///
/// Fields the planner reads are typed; anything else a downstream stage adds
/// is kept verbatim in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateMetadata {
    #[serde(default, deserialize_with = "lenient_enum", skip_serializing_if = "Option::is_none")]
    pub tier: Option<HotelTier>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub nonstop_likelihood: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub airport_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub heuristic_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(default, deserialize_with = "lenient_u32", skip_serializing_if = "Option::is_none")]
    pub estimated_duration_minutes: Option<u32>,
    #[serde(default, deserialize_with = "lenient_enum", skip_serializing_if = "Option::is_none")]
    pub distance_band: Option<DistanceBand>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub season_multiplier: Option<f64>,
    #[serde(default, deserialize_with = "lenient_enum", skip_serializing_if = "Option::is_none")]
    pub signal_source: Option<EstimateSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_freshness_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimate_snapshot: Option<CandidateEstimate>,
    #[serde(default, skip_serializing_if = "CandidateEntities::is_empty")]
    pub entities: CandidateEntities,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CandidateMetadata {
    /// Fold an estimate into the metadata.
    ///
    /// Signal fields are refreshed; heuristic fields set by the ranker
    /// (`tier`, `tags`, `nonstop_likelihood`) are only filled when absent.
    pub fn apply_estimate(&mut self, estimate: &CandidateEstimate) {
        self.distance_band = Some(estimate.distance_band);
        self.season_multiplier = Some(estimate.season_multiplier);
        self.signal_source = Some(estimate.source);
        self.signal_freshness_at = Some(estimate.freshness_at);
        if self.distance_km.is_none() {
            self.distance_km = Some(estimate.distance_km);
        }
        if self.tier.is_none() {
            self.tier = Some(estimate.tier);
        }
        if self.tags.is_empty() {
            self.tags.clone_from(&estimate.tags);
        }
        if self.nonstop_likelihood.is_none() {
            self.nonstop_likelihood = Some(estimate.nonstop_likelihood);
        }
        self.estimate_snapshot = Some(estimate.clone());
    }

    /// Shallow-merge another metadata bag: set fields in `other` win, unset ones
    /// leave the current value alone.
    pub fn merge(&mut self, other: CandidateMetadata) {
        overwrite(&mut self.tier, other.tier);
        overwrite(&mut self.nonstop_likelihood, other.nonstop_likelihood);
        overwrite(&mut self.airport_name, other.airport_name);
        overwrite(&mut self.country, other.country);
        overwrite(&mut self.heuristic_score, other.heuristic_score);
        overwrite(&mut self.distance_km, other.distance_km);
        overwrite(
            &mut self.estimated_duration_minutes,
            other.estimated_duration_minutes,
        );
        overwrite(&mut self.distance_band, other.distance_band);
        overwrite(&mut self.season_multiplier, other.season_multiplier);
        overwrite(&mut self.signal_source, other.signal_source);
        overwrite(&mut self.signal_freshness_at, other.signal_freshness_at);
        overwrite(&mut self.estimate_snapshot, other.estimate_snapshot);
        if !other.tags.is_empty() {
            self.tags = other.tags;
        }
        self.entities.merge(other.entities);
        self.extra.extend(other.extra);
    }

    /// Tags lower-cased and trimmed, empty entries dropped.
    #[must_use]
    pub fn normalized_tags(&self) -> Vec<String> {
        self.tags
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

fn overwrite<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

/// UI alternatives gathered for a candidate by enrichment stages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateEntities {
    #[serde(default)]
    pub flights: Vec<RawEntity>,
    #[serde(default)]
    pub hotels: Vec<RawEntity>,
    #[serde(default)]
    pub tours: Vec<RawEntity>,
    #[serde(default)]
    pub places: Vec<RawEntity>,
}

impl CandidateEntities {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flights.is_empty()
            && self.hotels.is_empty()
            && self.tours.is_empty()
            && self.places.is_empty()
    }

    /// Replace each non-empty list from `other`.
    pub fn merge(&mut self, other: CandidateEntities) {
        if !other.flights.is_empty() {
            self.flights = other.flights;
        }
        if !other.hotels.is_empty() {
            self.hotels = other.hotels;
        }
        if !other.tours.is_empty() {
            self.tours = other.tours;
        }
        if !other.places.is_empty() {
            self.places = other.places;
        }
    }
}

/// Loosely-shaped entity supplied by an enrichment source.
///
/// Every field is optional. Sources disagree on `title`/`name` and
/// `outbound_url`/`link`, so both spellings are kept and resolved on read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEntity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outbound_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool", skip_serializing_if = "Option::is_none")]
    pub fallback_search: Option<bool>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stable_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_money", skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RawEntity {
    /// Trimmed outbound URL (`outbound_url`, then `link`), empty when absent.
    #[must_use]
    pub fn resolved_link(&self) -> &str {
        first_non_blank(self.outbound_url.as_deref(), self.link.as_deref())
    }

    /// Trimmed title (`title`, then `name`), empty when absent.
    #[must_use]
    pub fn display_title(&self) -> &str {
        first_non_blank(self.title.as_deref(), self.name.as_deref())
    }
}

fn first_non_blank<'a>(primary: Option<&'a str>, secondary: Option<&'a str>) -> &'a str {
    [primary, secondary]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::estimate::EstimatePayload;

    fn estimate() -> CandidateEstimate {
        CandidateEstimate {
            provider: "baseline".to_string(),
            source: EstimateSource::Fallback,
            currency: "USD".to_string(),
            flight_min: Decimal::from(300),
            flight_max: Decimal::from(500),
            hotel_nightly_min: Decimal::from(90),
            hotel_nightly_max: Decimal::from(150),
            freshness_at: Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap(),
            distance_km: 5837.0,
            distance_band: DistanceBand::Medium,
            travel_time_minutes: 300,
            nonstop_likelihood: 0.4,
            season_multiplier: 1.15,
            tier: HotelTier::Budget,
            tags: vec!["beach".to_string()],
            raw_payload: EstimatePayload::default(),
        }
    }

    #[test]
    fn apply_estimate_keeps_ranker_fields() {
        let mut meta = CandidateMetadata {
            tier: Some(HotelTier::Premium),
            tags: vec!["museums".to_string()],
            nonstop_likelihood: Some(0.92),
            ..CandidateMetadata::default()
        };
        meta.apply_estimate(&estimate());
        assert_eq!(meta.tier, Some(HotelTier::Premium));
        assert_eq!(meta.tags, vec!["museums"]);
        assert_eq!(meta.nonstop_likelihood, Some(0.92));
        assert_eq!(meta.distance_band, Some(DistanceBand::Medium));
        assert_eq!(meta.signal_source, Some(EstimateSource::Fallback));
        assert!(meta.estimate_snapshot.is_some());
    }

    #[test]
    fn apply_estimate_fills_missing_fields() {
        let mut meta = CandidateMetadata::default();
        meta.apply_estimate(&estimate());
        assert_eq!(meta.tier, Some(HotelTier::Budget));
        assert_eq!(meta.tags, vec!["beach"]);
        assert_eq!(meta.season_multiplier, Some(1.15));
    }

    #[test]
    fn merge_never_clears_existing_values() {
        let mut meta = CandidateMetadata {
            airport_name: Some("Charles de Gaulle".to_string()),
            heuristic_score: Some(85.0),
            ..CandidateMetadata::default()
        };
        meta.extra
            .insert("note".to_string(), serde_json::json!("keep me"));

        let mut update = CandidateMetadata {
            heuristic_score: Some(90.0),
            ..CandidateMetadata::default()
        };
        update
            .extra
            .insert("stage".to_string(), serde_json::json!("hotels"));
        meta.merge(update);

        assert_eq!(meta.airport_name.as_deref(), Some("Charles de Gaulle"));
        assert_eq!(meta.heuristic_score, Some(90.0));
        assert_eq!(meta.extra["note"], "keep me");
        assert_eq!(meta.extra["stage"], "hotels");
    }

    #[test]
    fn metadata_tolerates_malformed_provider_values() {
        let meta: CandidateMetadata = serde_json::from_value(serde_json::json!({
            "tier": "mid-range",
            "tags": ["Food", " beach "],
            "nonstop_likelihood": "0.6",
            "distance_band": "ULTRA_LONG",
            "estimated_duration_minutes": "abc",
            "custom": {"a": 1}
        }))
        .unwrap();
        assert!(meta.tier.is_none());
        assert_eq!(meta.nonstop_likelihood, Some(0.6));
        assert_eq!(meta.distance_band, Some(DistanceBand::UltraLong));
        assert!(meta.estimated_duration_minutes.is_none());
        assert_eq!(meta.normalized_tags(), vec!["food", "beach"]);
        assert_eq!(meta.extra["custom"]["a"], 1);
    }

    #[test]
    fn raw_entity_accepts_aliases() {
        let entity: RawEntity = serde_json::from_value(serde_json::json!({
            "name": "Louvre",
            "link": " https://example.org/louvre ",
            "price": "17",
            "confidence": "0.8"
        }))
        .unwrap();
        assert_eq!(entity.display_title(), "Louvre");
        assert_eq!(entity.resolved_link(), "https://example.org/louvre");
        assert_eq!(entity.price, Some(Decimal::new(1700, 2)));
        assert_eq!(entity.confidence, Some(0.8));
    }
}
