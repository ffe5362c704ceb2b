//! Ranked package records and the pieces they are assembled from.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::baselines::DistanceBand;
use crate::estimate::EstimateSource;
use crate::money::quantize_money;
use crate::options::LinkType;
use crate::CoreError;

/// Comparator used to order priced combinations before deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    Cheapest,
    Fastest,
    FewestStops,
    FamilyFriendly,
    BestHotel,
    BestValue,
    #[default]
    BudgetFirst,
}

impl SortMode {
    pub const ALL: [SortMode; 7] = [
        SortMode::Cheapest,
        SortMode::Fastest,
        SortMode::FewestStops,
        SortMode::FamilyFriendly,
        SortMode::BestHotel,
        SortMode::BestValue,
        SortMode::BudgetFirst,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SortMode::Cheapest => "cheapest",
            SortMode::Fastest => "fastest",
            SortMode::FewestStops => "fewest_stops",
            SortMode::FamilyFriendly => "family_friendly",
            SortMode::BestHotel => "best_hotel",
            SortMode::BestValue => "best_value",
            SortMode::BudgetFirst => "budget_first",
        }
    }
}

impl std::fmt::Display for SortMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SortMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        SortMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == wanted)
            .ok_or_else(|| CoreError::UnknownSortMode(s.to_string()))
    }
}

/// Fixed weights of the six scoring dimensions. They sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub price_value: f64,
    pub convenience: f64,
    pub preference_match: f64,
    pub seasonal_fit: f64,
    pub safety_fallback: f64,
    pub freshness: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            price_value: 0.28,
            convenience: 0.20,
            preference_match: 0.17,
            seasonal_fit: 0.13,
            safety_fallback: 0.12,
            freshness: 0.10,
        }
    }
}

impl ScoreWeights {
    #[must_use]
    pub fn total(&self) -> f64 {
        self.price_value
            + self.convenience
            + self.preference_match
            + self.seasonal_fit
            + self.safety_fallback
            + self.freshness
    }
}

/// Inclusive price band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimateBand {
    pub min: Decimal,
    pub max: Decimal,
}

impl EstimateBand {
    #[must_use]
    pub fn new(min: Decimal, max: Decimal) -> Self {
        Self {
            min: quantize_money(min),
            max: quantize_money(max),
        }
    }

    /// Widen the band just enough that `total` falls inside it.
    #[must_use]
    pub fn clamped_around(self, total: Decimal) -> Self {
        Self {
            min: self.min.min(total),
            max: self.max.max(total),
        }
    }

    #[must_use]
    pub fn contains(&self, value: Decimal) -> bool {
        self.min <= value && value <= self.max
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceComponent {
    pub amount: Decimal,
    pub currency: String,
}

impl PriceComponent {
    #[must_use]
    pub fn new(amount: Decimal, currency: &str) -> Self {
        Self {
            amount: quantize_money(amount),
            currency: currency.to_string(),
        }
    }
}

/// Per-component amounts in the package currency.
///
/// `tours` is always zero: selected tours are reported under
/// `optional_tours` and never counted in `total`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub flight: PriceComponent,
    pub hotel: PriceComponent,
    pub tours: PriceComponent,
    pub optional_tours: PriceComponent,
    pub total: PriceComponent,
}

impl PriceBreakdown {
    /// Flight plus hotel, the only components the committed total includes.
    #[must_use]
    pub fn strict_total(&self) -> Decimal {
        quantize_money(self.flight.amount + self.hotel.amount + self.tours.amount)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentLink {
    pub outbound_url: String,
    pub link_type: LinkType,
    pub fallback_search: bool,
    pub confidence: f64,
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentLinks {
    pub flight: ComponentLink,
    pub hotel: ComponentLink,
    #[serde(default)]
    pub tours: Vec<ComponentLink>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Flight,
    Hotel,
    Tour,
    Place,
}

/// One alternative shown next to a package (selected option or a suggestion).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityPayload {
    pub kind: EntityKind,
    /// Option row id when the entity is a selected component.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub stable_id: String,
    pub title: String,
    pub provider: String,
    pub outbound_url: String,
    pub link_type: LinkType,
    pub fallback_search: bool,
    pub confidence: f64,
    pub rationale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stops: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub airline_codes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub star_rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<String>,
}

impl EntityPayload {
    /// A bare entity with everything beyond identity and link left empty.
    #[must_use]
    pub fn new(kind: EntityKind, title: impl Into<String>, outbound_url: impl Into<String>) -> Self {
        Self {
            kind,
            id: None,
            stable_id: String::new(),
            title: title.into(),
            provider: String::new(),
            outbound_url: outbound_url.into(),
            link_type: LinkType::Search,
            fallback_search: true,
            confidence: 0.5,
            rationale: String::new(),
            price: None,
            currency: String::new(),
            image_url: String::new(),
            description: String::new(),
            stops: None,
            duration_minutes: None,
            airline_codes: Vec::new(),
            star_rating: None,
            guest_rating: None,
            neighborhood: None,
        }
    }

    #[must_use]
    pub fn link(&self) -> ComponentLink {
        ComponentLink {
            outbound_url: self.outbound_url.clone(),
            link_type: self.link_type,
            fallback_search: self.fallback_search,
            confidence: self.confidence,
            rationale: self.rationale.clone(),
        }
    }
}

/// Ranking signals surfaced for quick rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSignals {
    pub duration_minutes: u32,
    pub stops: u32,
    pub hotel_star_rating: f64,
    pub hotel_guest_rating: f64,
    pub hotel_neighborhood: String,
    pub family_friendly_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSummary {
    pub flight: EntityPayload,
    pub hotel: EntityPayload,
    #[serde(default)]
    pub tours: Vec<EntityPayload>,
    pub signals: ComponentSignals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub price_value: f64,
    pub convenience: f64,
    pub preference_match: f64,
    pub seasonal_fit: f64,
    pub safety_fallback: f64,
    pub freshness: f64,
    pub weights: ScoreWeights,
    /// The six dimension notes, in dimension order.
    pub explanations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_band: Option<DistanceBand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season_multiplier: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freshness_timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<EstimateSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_friendly: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub why_ranked: Vec<String>,
}

/// One ranked, fully priced itinerary for a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageOption {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub candidate_id: Uuid,
    pub destination_code: String,
    pub destination_city: String,
    pub flight_option_id: Uuid,
    pub hotel_option_id: Uuid,
    /// At most three ids, in bundle order.
    #[serde(default)]
    pub selected_tour_option_ids: Vec<Uuid>,
    /// Dense, 1-based.
    pub rank: u32,
    pub currency: String,
    /// Flight plus hotel only.
    pub total_price: Decimal,
    pub amount_minor: i64,
    pub estimated_total_min: Decimal,
    pub estimated_total_max: Decimal,
    /// Band as computed from estimates, before widening around the total.
    pub raw_estimated_total: EstimateBand,
    pub estimated_flight: EstimateBand,
    pub estimated_hotel_nightly: EstimateBand,
    pub price_breakdown: PriceBreakdown,
    pub explanations: Vec<String>,
    pub score: f64,
    pub price_score: f64,
    pub convenience_score: f64,
    pub quality_score: f64,
    pub location_score: f64,
    pub family_friendly_score: f64,
    pub data_confidence: f64,
    pub score_breakdown: ScoreBreakdown,
    pub freshness_at: DateTime<Utc>,
    pub last_scored_at: DateTime<Utc>,
    /// SHA-256 hex of the deduplication signature.
    pub content_signature: String,
    pub flight_url: String,
    pub hotel_url: String,
    pub tours_url: String,
    pub component_links: ComponentLinks,
    pub component_summary: ComponentSummary,
    #[serde(default)]
    pub flights: Vec<EntityPayload>,
    #[serde(default)]
    pub hotels: Vec<EntityPayload>,
    #[serde(default)]
    pub tours: Vec<EntityPayload>,
    #[serde(default)]
    pub places: Vec<EntityPayload>,
}

impl PackageOption {
    #[must_use]
    pub fn estimated_total(&self) -> EstimateBand {
        EstimateBand {
            min: self.estimated_total_min,
            max: self.estimated_total_max,
        }
    }
}
