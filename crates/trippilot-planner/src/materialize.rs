//! Turn a candidate estimate into one flight option and one hotel option.

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use trippilot_core::estimate::EstimatePayload;
use trippilot_core::money::quantize_money;
use trippilot_core::{
    CandidateEstimate, DestinationCandidate, FlightOption, HotelOption, LinkType, OfferCore,
    OptionProvenance, PlanRequest, PricingBaselines,
};

use crate::deeplinks::{FlightSearch, LinkBuilder, ResolvedLink, Tracking};

const FLIGHT_ITEM_CONFIDENCE: f64 = 0.95;
const FLIGHT_SEARCH_CONFIDENCE: f64 = 0.88;
const HOTEL_ITEM_CONFIDENCE: f64 = 0.9;
const HOTEL_SEARCH_CONFIDENCE: f64 = 0.58;

/// Shortest flight duration ever recorded on an option.
const MIN_FLIGHT_MINUTES: u32 = 90;

#[derive(Debug, Clone, PartialEq)]
pub struct MaterializedOptions {
    pub flight: FlightOption,
    pub hotel: HotelOption,
}

/// Build the flight and hotel options priced from `estimate`.
///
/// Flights are priced at the range midpoint; hotels at the nightly midpoint
/// times the plan's selected nights. Item-level URLs in the estimate payload
/// win over partner search links.
#[must_use]
pub fn materialize_options(
    plan: &PlanRequest,
    candidate: &DestinationCandidate,
    estimate: &CandidateEstimate,
    baselines: &PricingBaselines,
    links: &LinkBuilder,
) -> MaterializedOptions {
    let origin = plan.origin_iata();
    let depart = plan.depart_date;
    let return_date = plan.resolved_return_date();
    let nights = plan.selected_nights();
    let payload = &estimate.raw_payload;
    let destination_label = format!("{}-{}", candidate.city_name, candidate.country_code);

    let flight = build_flight(
        plan,
        candidate,
        estimate,
        links,
        &FlightSearch {
            origin: &origin,
            destination: &candidate.airport_code,
            depart_date: depart,
            return_date: Some(return_date),
            travelers: plan.total_travelers(),
        },
        &destination_label,
    );

    let hotel_search = links.hotel_search_url(
        &candidate.city_name,
        &candidate.country_code,
        depart,
        return_date,
        plan.adults,
    );
    let hotel_link = links.resolve_partner(
        payload.hotel_item_url.as_deref(),
        &hotel_search,
        &Tracking {
            provider: &estimate.provider,
            plan_id: Some(plan.id),
            link_type: Some("hotel"),
            destination: Some(&destination_label),
        },
    );
    let hotel = build_hotel(plan, candidate, estimate, baselines, hotel_link, nights);

    tracing::debug!(
        plan_id = %plan.id,
        candidate = %candidate.airport_code,
        source = %estimate.source,
        flight_option = %flight.offer.id,
        hotel_option = %hotel.offer.id,
        "options materialized from estimate"
    );

    MaterializedOptions { flight, hotel }
}

fn build_flight(
    plan: &PlanRequest,
    candidate: &DestinationCandidate,
    estimate: &CandidateEstimate,
    links: &LinkBuilder,
    search: &FlightSearch<'_>,
    destination_label: &str,
) -> FlightOption {
    let payload = &estimate.raw_payload;
    let search_url = LinkBuilder::flight_search_url(search);
    let link = links.resolve_partner(
        payload.flight_item_url.as_deref(),
        &search_url,
        &Tracking {
            provider: &estimate.provider,
            plan_id: Some(plan.id),
            link_type: Some("flight"),
            destination: Some(destination_label),
        },
    );

    let stable_offer_id = non_blank(payload.flight_offer_id.as_deref()).map_or_else(
        || format!("est:{}-{}:{}", search.origin, candidate.airport_code, search.depart_date),
        str::to_string,
    );

    let mut offer = OfferCore::new(
        plan.id,
        candidate.id,
        estimate.provider.clone(),
        estimate.currency.clone(),
        estimate.flight_mid(),
        estimate.freshness_at,
    );
    let (confidence, rationale) = match link.link_type {
        LinkType::Item => (FLIGHT_ITEM_CONFIDENCE, "Item-level flight offer deeplink."),
        LinkType::Search => (FLIGHT_SEARCH_CONFIDENCE, "Flight search fallback link."),
    };
    apply_link(&mut offer, link, confidence, rationale);
    offer.raw_payload = OptionProvenance {
        estimated_min: Some(estimate.flight_min),
        estimated_max: Some(estimate.flight_max),
        stable_offer_id: Some(stable_offer_id.clone()),
        ..shared_provenance(estimate, offer.link_type)
    };

    FlightOption {
        offer,
        external_offer_id: stable_offer_id,
        origin_airport: search.origin.to_string(),
        destination_airport: candidate.airport_code.clone(),
        departure_at: at_midnight(search.depart_date),
        return_at: search.return_date.and_then(at_midnight),
        airline_codes: airline_codes(payload),
        stops: estimate.distance_band.typical_stops(),
        duration_minutes: estimate.travel_time_minutes.max(MIN_FLIGHT_MINUTES),
        cabin_class: "economy".to_string(),
    }
}

fn build_hotel(
    plan: &PlanRequest,
    candidate: &DestinationCandidate,
    estimate: &CandidateEstimate,
    baselines: &PricingBaselines,
    link: ResolvedLink,
    nights: u32,
) -> HotelOption {
    let payload = &estimate.raw_payload;
    let nightly = estimate.hotel_nightly_mid();
    let total = quantize_money(nightly * Decimal::from(nights));
    let tier = baselines.tier_profile(estimate.tier);

    let property_id = non_blank(payload.hotel_property_id.as_deref()).map_or_else(
        || format!("est:{}:{}", candidate.airport_code, estimate.tier.as_str()),
        str::to_string,
    );
    let name = non_blank(payload.hotel_name.as_deref())
        .map_or_else(|| format!("{} City Center Hotel", candidate.city_name), str::to_string);

    let mut offer = OfferCore::new(
        plan.id,
        candidate.id,
        estimate.provider.clone(),
        estimate.currency.clone(),
        total,
        estimate.freshness_at,
    );
    let (confidence, rationale) = match link.link_type {
        LinkType::Item => (HOTEL_ITEM_CONFIDENCE, "Item-level hotel property deeplink."),
        LinkType::Search => (HOTEL_SEARCH_CONFIDENCE, "Hotel search fallback link."),
    };
    apply_link(&mut offer, link, confidence, rationale);
    offer.raw_payload = OptionProvenance {
        nightly_min: Some(estimate.hotel_nightly_min),
        nightly_max: Some(estimate.hotel_nightly_max),
        nightly_price: Some(nightly),
        total_stay_price: Some(total),
        nights: Some(nights),
        provider_property_id: Some(property_id.clone()),
        ..shared_provenance(estimate, offer.link_type)
    };

    HotelOption {
        offer,
        external_offer_id: property_id.clone(),
        provider_property_id: property_id,
        name,
        star_rating: tier.star_rating,
        guest_rating: tier.guest_rating,
        neighborhood: "City center".to_string(),
        coordinates: candidate.coordinates,
        amenities: candidate.metadata.tags.clone(),
        distance_km: Some(estimate.distance_km),
    }
}

fn shared_provenance(estimate: &CandidateEstimate, link_type: LinkType) -> OptionProvenance {
    OptionProvenance {
        distance_km: Some((estimate.distance_km * 100.0).round() / 100.0),
        distance_band: Some(estimate.distance_band),
        season_multiplier: Some(estimate.season_multiplier),
        nonstop_likelihood: Some(estimate.nonstop_likelihood),
        data_source: Some(estimate.source.as_str().to_string()),
        fallback_search: Some(link_type != LinkType::Item),
        ..OptionProvenance::default()
    }
}

fn apply_link(offer: &mut OfferCore, link: ResolvedLink, confidence: f64, rationale: &str) {
    offer.deeplink_url = link.url;
    offer.link_type = link.link_type;
    offer.link_confidence = confidence;
    offer.link_rationale = rationale.to_string();
}

fn airline_codes(payload: &EstimatePayload) -> Vec<String> {
    payload
        .airline_codes
        .iter()
        .map(|code| code.trim().to_ascii_uppercase())
        .filter(|code| !code.is_empty())
        .collect()
}

fn at_midnight(date: NaiveDate) -> Option<chrono::DateTime<chrono::Utc>> {
    Some(date.and_time(NaiveTime::MIN).and_utc())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
