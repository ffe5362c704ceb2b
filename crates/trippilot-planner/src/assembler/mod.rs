//! Package assembly.
//!
//! Prices every candidate × flight × hotel × tour-bundle combination in the
//! plan currency, scores it, sorts by the configured mode, drops combinations
//! with a repeated content signature and returns the top packages ranked
//! `1..=K`.

mod bundles;
mod entities;
mod signature;
mod sort;

use std::collections::HashMap;
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use trippilot_core::geo::timezone_delta_hours;
use trippilot_core::money::{quantize_money, to_minor_units};
use trippilot_core::{
    AppConfig, ComponentLinks, ComponentSignals, ComponentSummary, DestinationCandidate,
    DistanceBand, EntityKind, EstimateBand, EstimateSource, FlightOption, HotelOption,
    PackageOption, PlanRequest, PriceBreakdown, PriceComponent, SortMode, TourOption,
};
use uuid::Uuid;

use crate::deeplinks::LinkBuilder;
use crate::error::PlannerError;
use crate::fx::CurrencyConverter;
use crate::scorer::{round2, score_package, PackageScore, ScoreInputs};

use bundles::{tour_bundle_variants, MAX_TOURS_PER_BUNDLE};
use signature::{combination_signature, SignatureTotals};
use sort::SortKey;

const DEFAULT_NONSTOP_LIKELIHOOD: f64 = 0.55;
const MIN_DATA_CONFIDENCE: f64 = 0.25;
const MAX_DATA_CONFIDENCE: f64 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssemblerConfig {
    /// Packages kept after deduplication (K).
    pub max_packages: usize,
    pub flights_per_city: usize,
    pub hotels_per_city: usize,
    pub sort_mode: SortMode,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            max_packages: 10,
            flights_per_city: 3,
            hotels_per_city: 3,
            sort_mode: SortMode::BudgetFirst,
        }
    }
}

impl AssemblerConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_packages: config.max_packages.max(1),
            flights_per_city: config.flights_per_city.max(1),
            hotels_per_city: config.hotels_per_city.max(1),
            sort_mode: config.sort_mode,
        }
    }
}

/// Option rows for one plan, in any order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionPools {
    #[serde(default)]
    pub flights: Vec<FlightOption>,
    #[serde(default)]
    pub hotels: Vec<HotelOption>,
    #[serde(default)]
    pub tours: Vec<TourOption>,
}

impl OptionPools {
    #[must_use]
    pub fn len(&self) -> usize {
        self.flights.len() + self.hotels.len() + self.tours.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything one assembly pass reads.
#[derive(Debug, Clone, Copy)]
pub struct AssemblyRequest<'a> {
    pub plan: &'a PlanRequest,
    /// IANA zone of the origin airport; empty when unknown.
    pub origin_timezone: &'a str,
    pub candidates: &'a [DestinationCandidate],
    pub pools: &'a OptionPools,
}

/// One priced and scored combination, before ranking.
struct Combination<'a> {
    candidate: &'a DestinationCandidate,
    flight: &'a FlightOption,
    hotel: &'a HotelOption,
    tours: Vec<&'a TourOption>,
    exact_flight: Decimal,
    exact_hotel: Decimal,
    optional_tours: Decimal,
    package_total: Decimal,
    estimated_flight: EstimateBand,
    estimated_hotel_nightly: EstimateBand,
    raw_estimated_total: EstimateBand,
    estimated_total: EstimateBand,
    freshness_at: DateTime<Utc>,
    score: PackageScore,
    family_friendly: f64,
    data_confidence: f64,
    signature: String,
}

impl Combination<'_> {
    fn sort_key(&self) -> SortKey<'_> {
        SortKey {
            total: self.package_total,
            score: self.score.score,
            price_score: self.score.price_score,
            quality_score: self.score.quality_score,
            family_friendly: self.family_friendly,
            duration_minutes: self.flight.duration_minutes,
            stops: self.flight.stops,
            signature: &self.signature,
        }
    }
}

/// Per-candidate pools, cheapest first.
#[derive(Default)]
struct CandidatePool<'a> {
    flights: Vec<&'a FlightOption>,
    hotels: Vec<&'a HotelOption>,
    tours: Vec<&'a TourOption>,
}

pub struct PackageAssembler<'a> {
    converter: &'a dyn CurrencyConverter,
    links: LinkBuilder,
    config: AssemblerConfig,
}

impl<'a> PackageAssembler<'a> {
    #[must_use]
    pub fn new(
        converter: &'a dyn CurrencyConverter,
        links: LinkBuilder,
        config: AssemblerConfig,
    ) -> Self {
        Self {
            converter,
            links,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Build the ranked packages for one plan.
    ///
    /// Candidates without at least one flight and one hotel are skipped. An
    /// empty vector means no combination could be formed; it is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError::ForeignOption`] when any option row belongs
    /// to a different plan.
    pub fn assemble(
        &self,
        request: &AssemblyRequest<'_>,
        now: DateTime<Utc>,
    ) -> Result<Vec<PackageOption>, PlannerError> {
        let plan = request.plan;
        check_plan_ownership(plan.id, request.pools)?;
        for (kind, option_id) in minor_unit_mismatches(request.pools) {
            tracing::warn!(
                plan_id = %plan.id,
                kind,
                option_id = %option_id,
                "option amount_minor disagrees with total_price; pricing from total_price"
            );
        }

        let currency = plan.currency();
        let pools = self.group_pools(request.pools);

        let mut combinations = Vec::new();
        for candidate in request.candidates {
            let Some(pool) = pools.get(&candidate.id) else {
                tracing::debug!(
                    plan_id = %plan.id,
                    candidate = %candidate.airport_code,
                    "no options for candidate, skipping"
                );
                continue;
            };
            if pool.flights.is_empty() || pool.hotels.is_empty() {
                tracing::debug!(
                    plan_id = %plan.id,
                    candidate = %candidate.airport_code,
                    flights = pool.flights.len(),
                    hotels = pool.hotels.len(),
                    "candidate lacks flights or hotels, skipping"
                );
                continue;
            }
            self.combine_candidate(request, &currency, candidate, pool, now, &mut combinations);
        }

        if combinations.is_empty() {
            tracing::info!(plan_id = %plan.id, "no package combinations could be formed");
            return Ok(Vec::new());
        }

        let mode = self.config.sort_mode;
        combinations.sort_by(|a, b| sort::compare(mode, &a.sort_key(), &b.sort_key()));

        let total_combinations = combinations.len();
        let mut seen = HashSet::new();
        let selected: Vec<Combination<'_>> = combinations
            .into_iter()
            .filter(|combo| seen.insert(combo.signature.clone()))
            .take(self.config.max_packages.max(1))
            .collect();

        let packages: Vec<PackageOption> = selected
            .into_iter()
            .zip(1_u32..)
            .map(|(combo, rank)| self.build_package(plan, &currency, combo, rank, now))
            .collect();

        tracing::info!(
            plan_id = %plan.id,
            sort_mode = %mode,
            combinations = total_combinations,
            packages = packages.len(),
            "packages assembled"
        );
        Ok(packages)
    }

    fn group_pools<'p>(&self, pools: &'p OptionPools) -> HashMap<Uuid, CandidatePool<'p>> {
        let mut grouped: HashMap<Uuid, CandidatePool<'p>> = HashMap::new();
        for flight in &pools.flights {
            grouped
                .entry(flight.offer.candidate_id)
                .or_default()
                .flights
                .push(flight);
        }
        for hotel in &pools.hotels {
            grouped
                .entry(hotel.offer.candidate_id)
                .or_default()
                .hotels
                .push(hotel);
        }
        for tour in &pools.tours {
            grouped
                .entry(tour.offer.candidate_id)
                .or_default()
                .tours
                .push(tour);
        }

        // Stable sorts keep input order among equal prices.
        for pool in grouped.values_mut() {
            pool.flights.sort_by(|a, b| a.offer.total_price.cmp(&b.offer.total_price));
            pool.flights.truncate(self.config.flights_per_city.max(1));
            pool.hotels.sort_by(|a, b| a.offer.total_price.cmp(&b.offer.total_price));
            pool.hotels.truncate(self.config.hotels_per_city.max(1));
            pool.tours.sort_by(|a, b| a.offer.total_price.cmp(&b.offer.total_price));
        }
        grouped
    }

    #[allow(clippy::too_many_lines)] // one pass per flight x hotel x bundle
    fn combine_candidate<'c>(
        &self,
        request: &AssemblyRequest<'_>,
        currency: &str,
        candidate: &'c DestinationCandidate,
        pool: &CandidatePool<'c>,
        now: DateTime<Utc>,
        out: &mut Vec<Combination<'c>>,
    ) {
        let plan = request.plan;
        let (nights_low, nights_high) = plan.nights_range();
        let selected_nights = Decimal::from(plan.selected_nights());
        let tags = candidate.metadata.normalized_tags();
        let has_family_tag = tags.iter().any(|t| t == "family");
        let timezone_delta = timezone_delta_hours(request.origin_timezone, &candidate.timezone, now);
        let bundles = tour_bundle_variants(&pool.tours);

        for &flight in &pool.flights {
            let flight_currency = flight.offer.currency_or(currency);
            let flight_total = flight.offer.total_price;
            let provenance = &flight.offer.raw_payload;
            let estimated_flight = EstimateBand::new(
                self.convert(
                    provenance.estimated_min.unwrap_or(flight_total),
                    &flight_currency,
                    currency,
                ),
                self.convert(
                    provenance.estimated_max.unwrap_or(flight_total),
                    &flight_currency,
                    currency,
                ),
            );
            let exact_flight = self.convert(flight_total, &flight_currency, currency);

            for &hotel in &pool.hotels {
                let hotel_currency = hotel.offer.currency_or(currency);
                let hotel_total = hotel.offer.total_price;
                let stay = &hotel.offer.raw_payload;
                let estimated_hotel_nightly = EstimateBand::new(
                    self.convert(
                        stay.nightly_min
                            .unwrap_or_else(|| hotel_total / Decimal::from(nights_low)),
                        &hotel_currency,
                        currency,
                    ),
                    self.convert(
                        stay.nightly_max
                            .unwrap_or_else(|| hotel_total / Decimal::from(nights_high)),
                        &hotel_currency,
                        currency,
                    ),
                );
                let base_hotel = stay.total_stay_price.unwrap_or_else(|| {
                    let nightly = stay
                        .nightly_price
                        .unwrap_or_else(|| hotel_total / selected_nights);
                    quantize_money(nightly * selected_nights)
                });
                let exact_hotel = self.convert(base_hotel, &hotel_currency, currency);
                let package_total = quantize_money(exact_flight + exact_hotel);

                let raw_estimated_total = EstimateBand::new(
                    estimated_flight.min + estimated_hotel_nightly.min * Decimal::from(nights_low),
                    estimated_flight.max + estimated_hotel_nightly.max * Decimal::from(nights_high),
                );
                let estimated_total = raw_estimated_total.clamped_around(package_total);

                let distance_band = provenance
                    .distance_band
                    .or(stay.distance_band)
                    .or(candidate.metadata.distance_band)
                    .unwrap_or(DistanceBand::Medium);
                let nonstop_likelihood = provenance
                    .nonstop_likelihood
                    .or(candidate.metadata.nonstop_likelihood)
                    .unwrap_or(DEFAULT_NONSTOP_LIKELIHOOD);
                let season_multiplier = provenance
                    .season_multiplier
                    .or(stay.season_multiplier)
                    .or(candidate.metadata.season_multiplier)
                    .unwrap_or(1.0);
                let source = provenance
                    .data_source
                    .as_deref()
                    .or(stay.data_source.as_deref())
                    .and_then(parse_source)
                    .or(candidate.metadata.signal_source)
                    .unwrap_or(EstimateSource::Fallback);

                let family_friendly = family_friendly_score(hotel, flight, has_family_tag);

                for bundle in &bundles {
                    let optional_tours = quantize_money(
                        bundle
                            .iter()
                            .filter(|t| t.has_explicit_price())
                            .map(|t| {
                                self.convert(
                                    t.offer.total_price,
                                    &t.offer.currency_or(currency),
                                    currency,
                                )
                            })
                            .sum(),
                    );

                    let freshness_at = bundle
                        .iter()
                        .map(|t| t.offer.last_checked_at)
                        .chain([flight.offer.last_checked_at, hotel.offer.last_checked_at])
                        .min()
                        .unwrap_or(now);

                    let confidences: Vec<f64> = [flight.offer.confidence(), hotel.offer.confidence()]
                        .into_iter()
                        .chain(bundle.iter().map(|t| t.offer.confidence()))
                        .collect();
                    #[allow(clippy::cast_precision_loss)]
                    let mean_confidence =
                        confidences.iter().sum::<f64>() / confidences.len() as f64;
                    let data_confidence =
                        mean_confidence.clamp(MIN_DATA_CONFIDENCE, MAX_DATA_CONFIDENCE);

                    let mut score = score_package(
                        &ScoreInputs {
                            total: package_total,
                            budget: plan.total_budget,
                            preference_weights: &plan.preference_weights,
                            candidate_tags: &tags,
                            season_multiplier,
                            distance_band: Some(distance_band),
                            nonstop_likelihood,
                            freshness_at: Some(freshness_at),
                            timezone_delta_hours: timezone_delta,
                            travel_time_minutes: flight.duration_minutes,
                            data_confidence,
                        },
                        now,
                    );
                    let breakdown = &mut score.breakdown;
                    breakdown.distance_band = Some(distance_band);
                    breakdown.season_multiplier = Some(season_multiplier);
                    breakdown.freshness_timestamp = Some(freshness_at);
                    breakdown.source = Some(source);
                    breakdown.data_confidence = Some(round2(data_confidence));
                    breakdown.family_friendly = Some(family_friendly);

                    let signature = combination_signature(
                        candidate,
                        flight,
                        hotel,
                        bundle,
                        SignatureTotals {
                            flight: exact_flight,
                            hotel: exact_hotel,
                            tours: Decimal::ZERO,
                            package: package_total,
                        },
                    );

                    out.push(Combination {
                        candidate,
                        flight,
                        hotel,
                        tours: bundle.clone(),
                        exact_flight,
                        exact_hotel,
                        optional_tours,
                        package_total,
                        estimated_flight,
                        estimated_hotel_nightly,
                        raw_estimated_total,
                        estimated_total,
                        freshness_at,
                        score,
                        family_friendly,
                        data_confidence,
                        signature,
                    });
                }
            }
        }
    }

    fn convert(&self, amount: Decimal, from: &str, to: &str) -> Decimal {
        quantize_money(self.converter.convert(amount, from, to))
    }

    #[allow(clippy::too_many_lines)]
    fn build_package(
        &self,
        plan: &PlanRequest,
        currency: &str,
        combo: Combination<'_>,
        rank: u32,
        now: DateTime<Utc>,
    ) -> PackageOption {
        let candidate = combo.candidate;
        let entities = &candidate.metadata.entities;
        let origin = plan.origin_iata();

        let flight_payload =
            entities::flight_payload(&origin, candidate, combo.flight, currency, self.converter);
        let hotel_payload = entities::hotel_payload(combo.hotel, currency, self.converter);
        let tour_payloads: Vec<_> = combo
            .tours
            .iter()
            .map(|t| entities::tour_payload(t, currency, self.converter))
            .collect();

        let flights = entities::merge_selected_first(
            vec![flight_payload.clone()],
            entities::metadata_alternatives(EntityKind::Flight, &entities.flights, false),
            entities::MAX_FLIGHT_ENTITIES,
        );
        let hotels = entities::merge_selected_first(
            vec![hotel_payload.clone()],
            entities::metadata_alternatives(EntityKind::Hotel, &entities.hotels, false),
            entities::MAX_HOTEL_ENTITIES,
        );
        let alongside_selection = !tour_payloads.is_empty();
        let mut tour_extras =
            entities::metadata_alternatives(EntityKind::Tour, &entities.tours, alongside_selection);
        if tour_extras.is_empty() {
            tour_extras.push(entities::fallback_tour(candidate, plan.id, &self.links));
        }
        let tours = if alongside_selection {
            entities::merge_selected_first(
                tour_payloads.clone(),
                tour_extras,
                entities::MAX_TOUR_ENTITIES,
            )
        } else {
            tour_extras
        };
        let mut places = entities::candidate_places(candidate);
        if places.is_empty() {
            places.push(entities::fallback_place(candidate));
        }

        let tours_url = tours
            .first()
            .map(|t| t.outbound_url.trim().to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| {
                self.links
                    .tour_search(&candidate.city_name, &candidate.country_code, Some(plan.id))
            });

        let price_breakdown = PriceBreakdown {
            flight: PriceComponent::new(combo.exact_flight, currency),
            hotel: PriceComponent::new(combo.exact_hotel, currency),
            tours: PriceComponent::new(Decimal::ZERO, currency),
            optional_tours: PriceComponent::new(combo.optional_tours, currency),
            total: PriceComponent::new(combo.package_total, currency),
        };
        let strict_total = price_breakdown.strict_total();
        let price_breakdown = if strict_total == combo.package_total {
            price_breakdown
        } else {
            tracing::warn!(
                plan_id = %plan.id,
                candidate = %candidate.airport_code,
                rank,
                input_total = %combo.package_total,
                strict_total = %strict_total,
                "package total corrected to strict component sum"
            );
            PriceBreakdown {
                total: PriceComponent::new(strict_total, currency),
                ..price_breakdown
            }
        };
        let estimated_total = combo.estimated_total.clamped_around(strict_total);

        let mut why_ranked = combo.score.explanations.clone();
        why_ranked.push(format!(
            "Flight: {} link ({:.2} confidence).",
            flight_payload.link_type, flight_payload.confidence
        ));
        why_ranked.push(format!(
            "Hotel: {} link ({:.2} confidence).",
            hotel_payload.link_type, hotel_payload.confidence
        ));
        if tour_payloads.is_empty() {
            why_ranked.push(
                "No tours attached; package total includes only selected flight + hotel."
                    .to_string(),
            );
        } else {
            why_ranked.push(format!(
                "{} optional tours attached (not included in package total).",
                tour_payloads.len()
            ));
        }
        let mut score_breakdown = combo.score.breakdown;
        score_breakdown.why_ranked.clone_from(&why_ranked);

        let selected_tours: Vec<_> = tour_payloads
            .into_iter()
            .take(MAX_TOURS_PER_BUNDLE)
            .collect();
        let component_links = ComponentLinks {
            flight: flight_payload.link(),
            hotel: hotel_payload.link(),
            tours: selected_tours.iter().map(|t| t.link()).collect(),
        };
        let component_summary = ComponentSummary {
            signals: ComponentSignals {
                duration_minutes: combo.flight.duration_minutes,
                stops: combo.flight.stops,
                hotel_star_rating: combo.hotel.star_rating,
                hotel_guest_rating: combo.hotel.guest_rating,
                hotel_neighborhood: combo.hotel.neighborhood.clone(),
                family_friendly_score: combo.family_friendly,
            },
            flight: flight_payload.clone(),
            hotel: hotel_payload.clone(),
            tours: selected_tours,
        };

        PackageOption {
            id: Uuid::new_v4(),
            plan_id: plan.id,
            candidate_id: candidate.id,
            destination_code: candidate.airport_code.clone(),
            destination_city: candidate.city_name.clone(),
            flight_option_id: combo.flight.offer.id,
            hotel_option_id: combo.hotel.offer.id,
            selected_tour_option_ids: combo
                .tours
                .iter()
                .take(MAX_TOURS_PER_BUNDLE)
                .map(|t| t.offer.id)
                .collect(),
            rank,
            currency: currency.to_string(),
            total_price: strict_total,
            amount_minor: to_minor_units(strict_total),
            estimated_total_min: estimated_total.min,
            estimated_total_max: estimated_total.max,
            raw_estimated_total: combo.raw_estimated_total,
            estimated_flight: combo.estimated_flight,
            estimated_hotel_nightly: combo.estimated_hotel_nightly,
            price_breakdown,
            explanations: why_ranked,
            score: combo.score.score,
            price_score: combo.score.price_score,
            convenience_score: combo.score.convenience_score,
            quality_score: combo.score.quality_score,
            location_score: combo.score.location_score,
            family_friendly_score: combo.family_friendly,
            data_confidence: combo.data_confidence,
            score_breakdown,
            freshness_at: combo.freshness_at,
            last_scored_at: now,
            content_signature: combo.signature,
            flight_url: flight_payload.outbound_url.clone(),
            hotel_url: hotel_payload.outbound_url.clone(),
            tours_url,
            component_links,
            component_summary,
            flights,
            hotels,
            tours,
            places,
        }
    }
}

fn check_plan_ownership(plan_id: Uuid, pools: &OptionPools) -> Result<(), PlannerError> {
    let rows = pools
        .flights
        .iter()
        .map(|f| ("flight", &f.offer))
        .chain(pools.hotels.iter().map(|h| ("hotel", &h.offer)))
        .chain(pools.tours.iter().map(|t| ("tour", &t.offer)));
    for (kind, offer) in rows {
        if offer.plan_id != plan_id {
            return Err(PlannerError::ForeignOption {
                kind,
                option_id: offer.id,
                option_plan_id: offer.plan_id,
                plan_id,
            });
        }
    }
    Ok(())
}

/// Options whose stored minor units drifted from their decimal total.
fn minor_unit_mismatches(pools: &OptionPools) -> Vec<(&'static str, Uuid)> {
    pools
        .flights
        .iter()
        .map(|f| ("flight", &f.offer))
        .chain(pools.hotels.iter().map(|h| ("hotel", &h.offer)))
        .chain(pools.tours.iter().map(|t| ("tour", &t.offer)))
        .filter(|(_, offer)| !offer.minor_units_consistent())
        .map(|(kind, offer)| (kind, offer.id))
        .collect()
}

fn parse_source(raw: &str) -> Option<EstimateSource> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "live" | "travelpayouts" => Some(EstimateSource::Live),
        "fallback" => Some(EstimateSource::Fallback),
        _ => None,
    }
}

fn family_friendly_score(hotel: &HotelOption, flight: &FlightOption, has_family_tag: bool) -> f64 {
    let guest = if hotel.guest_rating.is_finite() { hotel.guest_rating } else { 0.0 };
    let star = if hotel.star_rating.is_finite() { hotel.star_rating } else { 0.0 };
    let bonus = if has_family_tag { 8.0 } else { 0.0 };
    let raw = 45.0 + guest * 4.0 + star * 2.0 - f64::from(flight.stops) * 10.0 + bonus;
    round2(raw.clamp(0.0, 100.0))
}

#[cfg(test)]
#[path = "assembler_test.rs"]
mod tests;
