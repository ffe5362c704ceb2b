//! Static pricing baselines: distance bands, hotel tiers, seasonality, and
//! per-country / per-airport destination profiles.
//!
//! Loaded once from YAML and handed to the ranker and estimator as a
//! read-only value. [`PricingBaselines::default`] mirrors the shipped
//! `config/pricing_baselines.yaml` so tests can run without touching disk.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Tags applied when neither the airport nor its country has a profile.
pub const DEFAULT_TAGS: [&str; 2] = ["culture", "food"];

/// Nonstop likelihood applied when no profile supplies one.
pub const DEFAULT_NONSTOP_LIKELIHOOD: f64 = 0.55;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceBand {
    Short,
    Medium,
    Long,
    UltraLong,
}

impl DistanceBand {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DistanceBand::Short => "short",
            DistanceBand::Medium => "medium",
            DistanceBand::Long => "long",
            DistanceBand::UltraLong => "ultra_long",
        }
    }

    /// Parse a band label leniently (case and surrounding whitespace ignored).
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "short" => Some(DistanceBand::Short),
            "medium" => Some(DistanceBand::Medium),
            "long" => Some(DistanceBand::Long),
            "ultra_long" | "ultra-long" => Some(DistanceBand::UltraLong),
            _ => None,
        }
    }

    /// Typical stop count for a materialized flight in this band.
    #[must_use]
    pub fn typical_stops(self) -> u32 {
        match self {
            DistanceBand::Short => 0,
            DistanceBand::Medium | DistanceBand::Long => 1,
            DistanceBand::UltraLong => 2,
        }
    }
}

impl std::fmt::Display for DistanceBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HotelTier {
    Budget,
    #[default]
    Standard,
    Premium,
    Luxury,
}

impl HotelTier {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HotelTier::Budget => "budget",
            HotelTier::Standard => "standard",
            HotelTier::Premium => "premium",
            HotelTier::Luxury => "luxury",
        }
    }

    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "budget" => Some(HotelTier::Budget),
            "standard" => Some(HotelTier::Standard),
            "premium" => Some(HotelTier::Premium),
            "luxury" => Some(HotelTier::Luxury),
            _ => None,
        }
    }
}

impl std::fmt::Display for HotelTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceBandProfile {
    pub band: DistanceBand,
    pub max_km: f64,
    pub flight_min: Decimal,
    pub flight_max: Decimal,
    pub travel_time_hours: f64,
    pub nonstop_likelihood: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelTierProfile {
    pub nightly_min: Decimal,
    pub nightly_max: Decimal,
    pub star_rating: f64,
    pub guest_rating: f64,
}

/// Partial destination profile. Airport overrides usually set only a subset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DestinationProfile {
    #[serde(default)]
    pub tier: Option<HotelTier>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub nonstop_likelihood: Option<f64>,
}

/// Fully resolved tier/tags/nonstop triple for one airport.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProfile {
    pub tier: HotelTier,
    pub tags: Vec<String>,
    pub nonstop_likelihood: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingBaselines {
    pub distance_bands: Vec<DistanceBandProfile>,
    pub hotel_tiers: BTreeMap<HotelTier, HotelTierProfile>,
    /// Keyed by calendar month, 1 through 12.
    #[serde(default)]
    pub season_multipliers: BTreeMap<u32, f64>,
    /// Keyed by ISO-2 country code.
    #[serde(default)]
    pub country_defaults: BTreeMap<String, DestinationProfile>,
    /// Keyed by IATA code.
    #[serde(default)]
    pub airport_overrides: BTreeMap<String, DestinationProfile>,
    /// Units of the keyed currency per one USD.
    #[serde(default)]
    pub fx_rates: BTreeMap<String, Decimal>,
}

impl PricingBaselines {
    /// First band whose `max_km` covers `distance_km`, else the widest band.
    ///
    /// NaN distances resolve to the widest band.
    #[must_use]
    pub fn distance_profile(&self, distance_km: f64) -> DistanceBandProfile {
        self.distance_bands
            .iter()
            .find(|band| distance_km <= band.max_km)
            .or_else(|| self.distance_bands.last())
            .cloned()
            .unwrap_or_else(default_medium_band)
    }

    /// Baseline for `tier`, falling back to `standard` then to built-in numbers.
    #[must_use]
    pub fn tier_profile(&self, tier: HotelTier) -> HotelTierProfile {
        self.hotel_tiers
            .get(&tier)
            .or_else(|| self.hotel_tiers.get(&HotelTier::Standard))
            .cloned()
            .unwrap_or_else(default_standard_tier)
    }

    /// Season multiplier for a calendar month; `1.0` when not configured.
    #[must_use]
    pub fn season_multiplier_for_month(&self, month: u32) -> f64 {
        self.season_multipliers.get(&month).copied().unwrap_or(1.0)
    }

    #[must_use]
    pub fn country_default_profile(&self, country_code: &str) -> Option<&DestinationProfile> {
        self.country_defaults
            .get(&country_code.trim().to_ascii_uppercase())
    }

    #[must_use]
    pub fn airport_override_profile(&self, airport_code: &str) -> Option<&DestinationProfile> {
        self.airport_overrides
            .get(&airport_code.trim().to_ascii_uppercase())
    }

    /// Resolve tier, tags and nonstop likelihood for an airport.
    ///
    /// Each field falls through override, then country default, then the
    /// hardcoded default. Tags are the override's followed by the country's,
    /// de-duplicated with first occurrence winning.
    #[must_use]
    pub fn resolve_profile(&self, airport_code: &str, country_code: &str) -> ResolvedProfile {
        let override_profile = self.airport_override_profile(airport_code);
        let country_profile = self.country_default_profile(country_code);

        let tier = override_profile
            .and_then(|p| p.tier)
            .or_else(|| country_profile.and_then(|p| p.tier))
            .unwrap_or_default();

        let mut seen = HashSet::new();
        let mut tags: Vec<String> = override_profile
            .into_iter()
            .chain(country_profile)
            .flat_map(|p| p.tags.iter())
            .map(|tag| tag.trim().to_lowercase())
            .filter(|tag| !tag.is_empty() && seen.insert(tag.clone()))
            .collect();
        if tags.is_empty() {
            tags = DEFAULT_TAGS.iter().map(|t| (*t).to_string()).collect();
        }

        let nonstop_likelihood = override_profile
            .and_then(|p| p.nonstop_likelihood)
            .or_else(|| country_profile.and_then(|p| p.nonstop_likelihood))
            .filter(|v| v.is_finite() && *v > 0.0)
            .unwrap_or(DEFAULT_NONSTOP_LIKELIHOOD)
            .clamp(0.0, 1.0);

        ResolvedProfile {
            tier,
            tags,
            nonstop_likelihood,
        }
    }

    /// Static rate for `currency` relative to USD, if configured.
    #[must_use]
    pub fn usd_rate(&self, currency: &str) -> Option<Decimal> {
        let code = currency.trim().to_ascii_uppercase();
        if code == "USD" {
            return Some(Decimal::ONE);
        }
        self.fx_rates.get(&code).copied()
    }
}

fn default_medium_band() -> DistanceBandProfile {
    DistanceBandProfile {
        band: DistanceBand::Medium,
        max_km: 6000.0,
        flight_min: Decimal::from(260),
        flight_max: Decimal::from(680),
        travel_time_hours: 5.0,
        nonstop_likelihood: 0.72,
    }
}

fn default_standard_tier() -> HotelTierProfile {
    HotelTierProfile {
        nightly_min: Decimal::from(80),
        nightly_max: Decimal::from(190),
        star_rating: 3.6,
        guest_rating: 8.0,
    }
}

impl Default for PricingBaselines {
    fn default() -> Self {
        let band = |band, max_km: f64, min: i64, max: i64, hours: f64, nonstop: f64| {
            DistanceBandProfile {
                band,
                max_km,
                flight_min: Decimal::from(min),
                flight_max: Decimal::from(max),
                travel_time_hours: hours,
                nonstop_likelihood: nonstop,
            }
        };
        let tier = |min: i64, max: i64, star: f64, guest: f64| HotelTierProfile {
            nightly_min: Decimal::from(min),
            nightly_max: Decimal::from(max),
            star_rating: star,
            guest_rating: guest,
        };
        let profile = |tier: HotelTier, tags: &[&str], nonstop: f64| DestinationProfile {
            tier: Some(tier),
            tags: tags.iter().map(|t| (*t).to_string()).collect(),
            nonstop_likelihood: Some(nonstop),
        };

        let distance_bands = vec![
            band(DistanceBand::Short, 1500.0, 90, 260, 2.0, 0.88),
            band(DistanceBand::Medium, 6000.0, 260, 680, 5.0, 0.72),
            band(DistanceBand::Long, 9500.0, 520, 1150, 10.0, 0.48),
            band(DistanceBand::UltraLong, 20100.0, 780, 1650, 16.0, 0.25),
        ];

        let hotel_tiers = BTreeMap::from([
            (HotelTier::Budget, tier(45, 110, 2.8, 7.4)),
            (HotelTier::Standard, tier(80, 190, 3.6, 8.0)),
            (HotelTier::Premium, tier(150, 320, 4.3, 8.6)),
            (HotelTier::Luxury, tier(280, 650, 4.8, 9.1)),
        ]);

        let season_multipliers = BTreeMap::from([
            (1, 0.88),
            (2, 0.9),
            (3, 0.98),
            (4, 1.02),
            (5, 1.06),
            (6, 1.15),
            (7, 1.22),
            (8, 1.2),
            (9, 1.04),
            (10, 0.98),
            (11, 0.9),
            (12, 1.12),
        ]);

        let country_defaults = BTreeMap::from([
            (
                "FR".to_string(),
                profile(HotelTier::Premium, &["culture", "food", "museums"], 0.7),
            ),
            (
                "GB".to_string(),
                profile(HotelTier::Premium, &["culture", "nightlife", "museums"], 0.75),
            ),
            (
                "ES".to_string(),
                profile(HotelTier::Standard, &["beach", "food", "nightlife"], 0.6),
            ),
            (
                "IT".to_string(),
                profile(HotelTier::Standard, &["culture", "food", "history"], 0.58),
            ),
            (
                "PT".to_string(),
                profile(HotelTier::Budget, &["beach", "food", "family"], 0.52),
            ),
            (
                "MX".to_string(),
                profile(HotelTier::Budget, &["beach", "family", "food"], 0.66),
            ),
            (
                "JP".to_string(),
                profile(HotelTier::Premium, &["culture", "food", "shopping"], 0.45),
            ),
            (
                "US".to_string(),
                profile(HotelTier::Standard, &["shopping", "family", "nightlife"], 0.8),
            ),
        ]);

        let airport_overrides = BTreeMap::from([
            (
                "CDG".to_string(),
                DestinationProfile {
                    tier: Some(HotelTier::Premium),
                    tags: vec!["romance".to_string(), "museums".to_string()],
                    nonstop_likelihood: Some(0.92),
                },
            ),
            (
                "CUN".to_string(),
                DestinationProfile {
                    tier: Some(HotelTier::Standard),
                    tags: vec!["beach".to_string(), "family".to_string(), "resort".to_string()],
                    nonstop_likelihood: Some(0.85),
                },
            ),
            (
                "LIS".to_string(),
                DestinationProfile {
                    tier: None,
                    tags: vec!["nightlife".to_string()],
                    nonstop_likelihood: Some(0.62),
                },
            ),
        ]);

        let fx_rates = BTreeMap::from([
            ("EUR".to_string(), Decimal::new(92, 2)),
            ("GBP".to_string(), Decimal::new(79, 2)),
            ("JPY".to_string(), Decimal::new(14950, 2)),
            ("MXN".to_string(), Decimal::new(1710, 2)),
            ("CAD".to_string(), Decimal::new(136, 2)),
        ]);

        Self {
            distance_bands,
            hotel_tiers,
            season_multipliers,
            country_defaults,
            airport_overrides,
            fx_rates,
        }
    }
}

/// Load and validate pricing baselines from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_baselines(path: &Path) -> Result<PricingBaselines, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let baselines: PricingBaselines = serde_yaml::from_str(&content)?;

    validate_baselines(&baselines)?;

    Ok(baselines)
}

/// Check structural invariants of a baselines table.
///
/// # Errors
///
/// Returns `ConfigError::Validation` describing the first violation found.
pub fn validate_baselines(baselines: &PricingBaselines) -> Result<(), ConfigError> {
    if baselines.distance_bands.is_empty() {
        return Err(ConfigError::Validation(
            "distance_bands must be non-empty".to_string(),
        ));
    }

    let mut previous_max = f64::NEG_INFINITY;
    for band in &baselines.distance_bands {
        if !band.max_km.is_finite() || band.max_km <= previous_max {
            return Err(ConfigError::Validation(format!(
                "distance band '{}' max_km {} must be finite and strictly ascending",
                band.band, band.max_km
            )));
        }
        previous_max = band.max_km;

        if band.flight_min > band.flight_max {
            return Err(ConfigError::Validation(format!(
                "distance band '{}' has flight_min {} above flight_max {}",
                band.band, band.flight_min, band.flight_max
            )));
        }
        if !(0.0..=1.0).contains(&band.nonstop_likelihood) {
            return Err(ConfigError::Validation(format!(
                "distance band '{}' nonstop_likelihood must be within [0, 1]",
                band.band
            )));
        }
    }

    if !baselines.hotel_tiers.contains_key(&HotelTier::Standard) {
        return Err(ConfigError::Validation(
            "hotel_tiers must include 'standard'".to_string(),
        ));
    }
    for (tier, profile) in &baselines.hotel_tiers {
        if profile.nightly_min > profile.nightly_max {
            return Err(ConfigError::Validation(format!(
                "hotel tier '{tier}' has nightly_min {} above nightly_max {}",
                profile.nightly_min, profile.nightly_max
            )));
        }
    }

    for (month, multiplier) in &baselines.season_multipliers {
        if !(1..=12).contains(month) {
            return Err(ConfigError::Validation(format!(
                "season multiplier month {month} must be between 1 and 12"
            )));
        }
        if !multiplier.is_finite() || *multiplier <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "season multiplier for month {month} must be positive"
            )));
        }
    }

    for (currency, rate) in &baselines.fx_rates {
        if rate.is_sign_negative() || rate.is_zero() {
            return Err(ConfigError::Validation(format!(
                "fx rate for '{currency}' must be positive"
            )));
        }
    }

    Ok(())
}
