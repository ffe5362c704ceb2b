//! Destination price estimates: the provider contract and the offline baseline.

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use trippilot_core::geo::distance_km_or;
use trippilot_core::money::quantize_money;
use trippilot_core::{CandidateEstimate, EstimateRequest, EstimateSource, PricingBaselines};

use crate::error::ProviderError;
use crate::fx::{CurrencyConverter, RateTable};

/// Distance assumed by the baseline estimator when coordinates are missing.
pub const FALLBACK_ESTIMATE_DISTANCE_KM: f64 = 2400.0;

/// Provider name recorded on baseline estimates.
pub const BASELINE_PROVIDER: &str = "baseline";

/// Source of price-range snapshots for an (origin, destination) pair.
///
/// Implementations own their retries and timeouts: a call returns either an
/// estimate or a typed error, never hangs.
pub trait EstimateProvider {
    fn name(&self) -> &str;

    /// # Errors
    ///
    /// Returns [`ProviderError`] when the provider has nothing usable for the pair.
    fn estimate(&self, request: &EstimateRequest) -> Result<CandidateEstimate, ProviderError>;
}

/// Deterministic estimator built from the pricing baselines. Never fails.
///
/// Baseline amounts are USD; they are converted to the preferred currency
/// with the baselines' static rates.
#[derive(Debug, Clone)]
pub struct FallbackEstimator<'a> {
    baselines: &'a PricingBaselines,
    rates: RateTable,
    as_of: Option<DateTime<Utc>>,
}

impl<'a> FallbackEstimator<'a> {
    #[must_use]
    pub fn new(baselines: &'a PricingBaselines) -> Self {
        Self {
            baselines,
            rates: RateTable::from_baselines(baselines),
            as_of: None,
        }
    }

    /// Pin the freshness timestamp instead of reading the clock.
    #[must_use]
    pub fn at(mut self, as_of: DateTime<Utc>) -> Self {
        self.as_of = Some(as_of);
        self
    }

    /// Infallible form of [`EstimateProvider::estimate`].
    #[must_use]
    pub fn estimate_baseline(&self, request: &EstimateRequest) -> CandidateEstimate {
        let distance_km = distance_km_or(
            request.origin_coords,
            request.destination_coords,
            FALLBACK_ESTIMATE_DISTANCE_KM,
        );
        let band = self.baselines.distance_profile(distance_km);
        let season_multiplier = self
            .baselines
            .season_multiplier_for_month(request.depart_date.month());
        let season = Decimal::from_f64(season_multiplier).unwrap_or(Decimal::ONE);
        let travelers = request.travelers.max(1);
        let traveler_count = Decimal::from(travelers);

        let traveler_spread =
            Decimal::ONE + Decimal::from(travelers - 1) * Decimal::new(9, 2);
        let flight_min = quantize_money(band.flight_min * season * traveler_count);
        let flight_max = quantize_money(band.flight_max * season * traveler_count * traveler_spread);

        let hotel = self.baselines.tier_profile(request.tier);
        let occupancy =
            Decimal::ONE + Decimal::from(travelers.saturating_sub(2)) * Decimal::new(18, 2);
        let hotel_nightly_min = quantize_money(hotel.nightly_min * season * occupancy);
        let hotel_nightly_max = quantize_money(hotel.nightly_max * season * occupancy);

        let nonstop_likelihood = request
            .nonstop_likelihood
            .filter(|v| v.is_finite())
            .unwrap_or(band.nonstop_likelihood)
            .clamp(0.0, 1.0);

        // Band hours are small positive configuration values.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let travel_minutes = (band.travel_time_hours.max(0.0) * 60.0) as u32;

        let currency = request
            .preferred_currency
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or("USD")
            .to_ascii_uppercase();
        let to_currency = |amount: Decimal| self.rates.convert(amount, "USD", &currency);

        CandidateEstimate {
            provider: BASELINE_PROVIDER.to_string(),
            source: EstimateSource::Fallback,
            flight_min: to_currency(flight_min),
            flight_max: to_currency(flight_max),
            hotel_nightly_min: to_currency(hotel_nightly_min),
            hotel_nightly_max: to_currency(hotel_nightly_max),
            currency,
            freshness_at: self.as_of.unwrap_or_else(Utc::now),
            distance_km,
            distance_band: band.band,
            travel_time_minutes: travel_minutes.max(90),
            nonstop_likelihood,
            season_multiplier,
            tier: request.tier,
            tags: request.tags.clone(),
            raw_payload: trippilot_core::estimate::EstimatePayload::default(),
        }
    }
}

impl EstimateProvider for FallbackEstimator<'_> {
    fn name(&self) -> &str {
        BASELINE_PROVIDER
    }

    fn estimate(&self, request: &EstimateRequest) -> Result<CandidateEstimate, ProviderError> {
        Ok(self.estimate_baseline(request))
    }
}
