//! Provider-priced flight, hotel and tour offers attached to one candidate.
//!
//! The pricing/link fields every offer shares live in [`OfferCore`], which
//! each option flattens into its own record.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::baselines::DistanceBand;
use crate::geo::Coordinates;
use crate::lenient::{lenient_bool, lenient_enum, lenient_f64, lenient_u32};
use crate::money::{lenient_money, quantize_money, to_minor_units};

/// Link confidence assumed when a provider supplies a non-finite value.
pub const DEFAULT_LINK_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    /// Points at one specific provider offer.
    Item,
    /// Parameterized search fallback.
    #[default]
    Search,
}

impl LinkType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LinkType::Item => "item",
            LinkType::Search => "search",
        }
    }
}

impl std::fmt::Display for LinkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance bag stored with each offer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionProvenance {
    #[serde(default, deserialize_with = "lenient_money", skip_serializing_if = "Option::is_none")]
    pub estimated_min: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_money", skip_serializing_if = "Option::is_none")]
    pub estimated_max: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_money", skip_serializing_if = "Option::is_none")]
    pub nightly_min: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_money", skip_serializing_if = "Option::is_none")]
    pub nightly_max: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_money", skip_serializing_if = "Option::is_none")]
    pub nightly_price: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_money", skip_serializing_if = "Option::is_none")]
    pub total_stay_price: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_u32", skip_serializing_if = "Option::is_none")]
    pub nights: Option<u32>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(default, deserialize_with = "lenient_enum", skip_serializing_if = "Option::is_none")]
    pub distance_band: Option<DistanceBand>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub season_multiplier: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub nonstop_likelihood: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stable_offer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_property_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool", skip_serializing_if = "Option::is_none")]
    pub fallback_search: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Identity, price and outbound-link fields shared by every offer kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferCore {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub candidate_id: Uuid,
    pub provider: String,
    pub currency: String,
    pub total_price: Decimal,
    /// Integer cents; always `round_half_up(total_price * 100)`.
    pub amount_minor: i64,
    #[serde(default)]
    pub deeplink_url: String,
    #[serde(default)]
    pub link_type: LinkType,
    pub link_confidence: f64,
    #[serde(default)]
    pub link_rationale: String,
    #[serde(default)]
    pub raw_payload: OptionProvenance,
    pub last_checked_at: DateTime<Utc>,
}

impl OfferCore {
    /// Build an offer with `total_price` quantized and `amount_minor` derived from it.
    #[must_use]
    pub fn new(
        plan_id: Uuid,
        candidate_id: Uuid,
        provider: impl Into<String>,
        currency: impl Into<String>,
        total_price: Decimal,
        last_checked_at: DateTime<Utc>,
    ) -> Self {
        let total_price = quantize_money(total_price);
        Self {
            id: Uuid::new_v4(),
            plan_id,
            candidate_id,
            provider: provider.into(),
            currency: currency.into(),
            total_price,
            amount_minor: to_minor_units(total_price),
            deeplink_url: String::new(),
            link_type: LinkType::Search,
            link_confidence: DEFAULT_LINK_CONFIDENCE,
            link_rationale: String::new(),
            raw_payload: OptionProvenance::default(),
            last_checked_at,
        }
    }

    /// `amount_minor` still equals the quantized `total_price` in cents.
    #[must_use]
    pub fn minor_units_consistent(&self) -> bool {
        self.amount_minor == to_minor_units(self.total_price)
    }

    /// Explicit provenance flag if present, else "anything that is not an item link".
    #[must_use]
    pub fn fallback_search(&self) -> bool {
        self.raw_payload
            .fallback_search
            .unwrap_or(self.link_type != LinkType::Item)
    }

    /// Link confidence clamped to `[0, 1]`.
    #[must_use]
    pub fn confidence(&self) -> f64 {
        if self.link_confidence.is_finite() {
            self.link_confidence.clamp(0.0, 1.0)
        } else {
            DEFAULT_LINK_CONFIDENCE
        }
    }

    /// Upper-cased currency, or `fallback` when blank.
    #[must_use]
    pub fn currency_or(&self, fallback: &str) -> String {
        let code = self.currency.trim();
        if code.is_empty() {
            fallback.trim().to_ascii_uppercase()
        } else {
            code.to_ascii_uppercase()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightOption {
    #[serde(flatten)]
    pub offer: OfferCore,
    pub external_offer_id: String,
    pub origin_airport: String,
    pub destination_airport: String,
    #[serde(default)]
    pub departure_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub return_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub airline_codes: Vec<String>,
    #[serde(default)]
    pub stops: u32,
    #[serde(default)]
    pub duration_minutes: u32,
    #[serde(default = "default_cabin_class")]
    pub cabin_class: String,
}

fn default_cabin_class() -> String {
    "economy".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelOption {
    #[serde(flatten)]
    pub offer: OfferCore,
    pub external_offer_id: String,
    #[serde(default)]
    pub provider_property_id: String,
    pub name: String,
    #[serde(default)]
    pub star_rating: f64,
    #[serde(default)]
    pub guest_rating: f64,
    #[serde(default)]
    pub neighborhood: String,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub distance_km: Option<f64>,
}

impl HotelOption {
    /// Property id from the column, then provenance, then the offer id.
    #[must_use]
    pub fn stable_property_id(&self) -> String {
        [
            Some(self.provider_property_id.as_str()),
            self.offer.raw_payload.provider_property_id.as_deref(),
            Some(self.external_offer_id.as_str()),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map_or_else(|| self.offer.id.to_string(), str::to_string)
    }
}

impl FlightOption {
    /// Stable offer id from provenance, then the external id, then the row id.
    #[must_use]
    pub fn stable_offer_id(&self) -> String {
        [
            self.offer.raw_payload.stable_offer_id.as_deref(),
            Some(self.external_offer_id.as_str()),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map_or_else(|| self.offer.id.to_string(), str::to_string)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TourOption {
    /// `total_price` is zero and `currency` may be blank for unpriced tours.
    #[serde(flatten)]
    pub offer: OfferCore,
    pub external_product_id: String,
    pub name: String,
}

impl TourOption {
    /// Whether the provider quoted a positive price for this tour.
    #[must_use]
    pub fn has_explicit_price(&self) -> bool {
        self.offer.total_price > Decimal::ZERO
    }
}
