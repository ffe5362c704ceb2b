//! Entity payloads shown next to a package: the selected components first,
//! then alternatives from candidate metadata or generated fallbacks.

use std::collections::HashSet;

use trippilot_core::{
    DestinationCandidate, EntityKind, EntityPayload, FlightOption, HotelOption, LinkType,
    OfferCore, RawEntity, TourOption,
};
use uuid::Uuid;

use crate::deeplinks::{LinkBuilder, SEARCH_PROVIDER};
use crate::fx::CurrencyConverter;
use crate::scorer::round2;

pub(crate) const MAX_FLIGHT_ENTITIES: usize = 8;
pub(crate) const MAX_HOTEL_ENTITIES: usize = 12;
pub(crate) const MAX_TOUR_ENTITIES: usize = 8;

const EXTRA_CONFIDENCE: f64 = 0.5;
const EXTRA_RATIONALE: &str = "Additional entity from candidate metadata.";
const EXTRA_TOUR_CONFIDENCE: f64 = 0.45;
const EXTRA_TOUR_RATIONALE: &str = "Additional tour candidate metadata.";

/// Defaults applied to metadata entities that leave fields unset.
#[derive(Debug, Clone, Copy)]
struct RawDefaults<'a> {
    provider: &'a str,
    link_type: LinkType,
    confidence: f64,
    rationale: &'a str,
}

fn apply_link_fields(payload: &mut EntityPayload, offer: &OfferCore, default_rationale: &str) {
    payload.id = Some(offer.id);
    payload.provider.clone_from(&offer.provider);
    payload.outbound_url = offer.deeplink_url.trim().to_string();
    payload.link_type = offer.link_type;
    payload.fallback_search = offer.fallback_search();
    payload.confidence = round2(offer.confidence());
    payload.rationale = match offer.link_rationale.trim() {
        "" => default_rationale.to_string(),
        text => text.to_string(),
    };
}

/// Payload for the selected flight, priced in `currency`.
pub(crate) fn flight_payload(
    origin_code: &str,
    candidate: &DestinationCandidate,
    flight: &FlightOption,
    currency: &str,
    converter: &dyn CurrencyConverter,
) -> EntityPayload {
    let title = format!("{origin_code} to {}", candidate.airport_code);
    let mut payload = EntityPayload::new(EntityKind::Flight, title, String::new());
    apply_link_fields(&mut payload, &flight.offer, "Flight deeplink routed to partner.");
    payload.stable_id = flight.stable_offer_id();
    payload.price = Some(converter.convert(
        flight.offer.total_price,
        &flight.offer.currency_or(currency),
        currency,
    ));
    payload.currency = currency.to_string();
    payload.stops = Some(flight.stops);
    payload.duration_minutes = Some(flight.duration_minutes);
    payload.airline_codes.clone_from(&flight.airline_codes);
    payload
}

/// Payload for the selected hotel, priced in `currency`.
pub(crate) fn hotel_payload(
    hotel: &HotelOption,
    currency: &str,
    converter: &dyn CurrencyConverter,
) -> EntityPayload {
    let mut payload = EntityPayload::new(EntityKind::Hotel, hotel.name.clone(), String::new());
    apply_link_fields(&mut payload, &hotel.offer, "Hotel deeplink routed to partner.");
    payload.stable_id = hotel.stable_property_id();
    payload.price = Some(converter.convert(
        hotel.offer.total_price,
        &hotel.offer.currency_or(currency),
        currency,
    ));
    payload.currency = currency.to_string();
    payload.star_rating = Some(hotel.star_rating);
    payload.guest_rating = Some(hotel.guest_rating);
    payload.neighborhood = Some(hotel.neighborhood.clone());
    payload
}

/// Payload for a selected tour. Unpriced tours carry no price or currency.
pub(crate) fn tour_payload(
    tour: &TourOption,
    currency: &str,
    converter: &dyn CurrencyConverter,
) -> EntityPayload {
    let mut payload = EntityPayload::new(EntityKind::Tour, tour.name.clone(), String::new());
    apply_link_fields(&mut payload, &tour.offer, "Tour deeplink routed to partner.");
    payload.stable_id = match tour.external_product_id.trim() {
        "" => tour.offer.id.to_string(),
        id => id.to_string(),
    };
    if tour.has_explicit_price() {
        payload.price = Some(converter.convert(
            tour.offer.total_price,
            &tour.offer.currency_or(currency),
            currency,
        ));
        payload.currency = currency.to_string();
    }
    payload.image_url = tour.offer.raw_payload.image_url.clone().unwrap_or_default();
    payload.description = tour.offer.raw_payload.description.clone().unwrap_or_default();
    payload
}

fn parse_link_type(raw: Option<&str>) -> Option<LinkType> {
    match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("item") => Some(LinkType::Item),
        Some("search") => Some(LinkType::Search),
        _ => None,
    }
}

fn from_raw(kind: EntityKind, raw: &RawEntity, defaults: RawDefaults<'_>) -> EntityPayload {
    let link_type = parse_link_type(raw.link_type.as_deref()).unwrap_or(defaults.link_type);
    let mut payload = EntityPayload::new(kind, raw.display_title(), raw.resolved_link());
    payload.provider = raw
        .provider
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(defaults.provider)
        .to_string();
    payload.link_type = link_type;
    payload.fallback_search = raw.fallback_search.unwrap_or(link_type != LinkType::Item);
    payload.confidence = raw
        .confidence
        .filter(|c| c.is_finite())
        .unwrap_or(defaults.confidence);
    payload.rationale = raw
        .rationale
        .clone()
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| defaults.rationale.to_string());
    payload.stable_id = raw.stable_id.clone().unwrap_or_default();
    payload.price = raw.price;
    payload.currency = raw.currency.clone().unwrap_or_default();
    payload.image_url = raw.image_url.clone().unwrap_or_default();
    payload.description = raw.description.clone().unwrap_or_default();
    payload
}

/// Metadata alternatives for flights, hotels and tours.
pub(crate) fn metadata_alternatives(
    kind: EntityKind,
    raws: &[RawEntity],
    tours_alongside_selection: bool,
) -> Vec<EntityPayload> {
    let (confidence, rationale) = if kind == EntityKind::Tour && tours_alongside_selection {
        (EXTRA_TOUR_CONFIDENCE, EXTRA_TOUR_RATIONALE)
    } else {
        (EXTRA_CONFIDENCE, EXTRA_RATIONALE)
    };
    raws.iter()
        .map(|raw| {
            from_raw(
                kind,
                raw,
                RawDefaults {
                    provider: "",
                    link_type: LinkType::Search,
                    confidence,
                    rationale,
                },
            )
        })
        .collect()
}

/// Selected payloads first, then alternatives whose link was not seen yet,
/// up to `max_items` in total. Payloads without a link are never deduplicated.
pub(crate) fn merge_selected_first(
    selected: Vec<EntityPayload>,
    extras: Vec<EntityPayload>,
    max_items: usize,
) -> Vec<EntityPayload> {
    let mut seen: HashSet<String> = selected
        .iter()
        .map(|p| p.outbound_url.trim().to_string())
        .filter(|link| !link.is_empty())
        .collect();
    let mut merged = selected;
    for extra in extras {
        if merged.len() >= max_items {
            break;
        }
        let link = extra.outbound_url.trim();
        if !link.is_empty() && !seen.insert(link.to_string()) {
            continue;
        }
        merged.push(extra);
    }
    merged
}

/// Tour search entity used when nothing better is known.
pub(crate) fn fallback_tour(
    candidate: &DestinationCandidate,
    plan_id: Uuid,
    links: &LinkBuilder,
) -> EntityPayload {
    let url = links.tour_search(&candidate.city_name, &candidate.country_code, Some(plan_id));
    let mut payload = EntityPayload::new(
        EntityKind::Tour,
        format!("{} tours search", candidate.city_name),
        url,
    );
    payload.provider = SEARCH_PROVIDER.to_string();
    payload.stable_id = format!("search:tour:{}:fallback", candidate.airport_code);
    payload.confidence = 0.35;
    payload.rationale = "No tour items were persisted; using search fallback.".to_string();
    payload.description = "Tour search fallback.".to_string();
    payload
}

fn slug(title: &str) -> String {
    title.to_lowercase().replace(' ', "-")
}

/// Places from candidate metadata. Entries without a title are dropped.
pub(crate) fn candidate_places(candidate: &DestinationCandidate) -> Vec<EntityPayload> {
    candidate
        .metadata
        .entities
        .places
        .iter()
        .filter(|raw| !raw.display_title().is_empty())
        .map(|raw| {
            let provider = raw
                .provider
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .unwrap_or("places");
            let is_search =
                provider == "fallback" || raw.resolved_link().contains("google.com/search");
            let (link_type, confidence, rationale) = if is_search {
                (
                    LinkType::Search,
                    0.4,
                    "Search-link fallback because Wikimedia data was unavailable.",
                )
            } else {
                (LinkType::Item, 0.65, "Wikimedia place item deeplink.")
            };
            let mut payload = from_raw(
                EntityKind::Place,
                raw,
                RawDefaults {
                    provider,
                    link_type,
                    confidence,
                    rationale,
                },
            );
            payload.fallback_search = raw.fallback_search.unwrap_or(is_search);
            if payload.stable_id.trim().is_empty() {
                payload.stable_id = raw
                    .extra
                    .get("pageid")
                    .map_or_else(
                        || slug(&payload.title),
                        |v| v.to_string().trim_matches('"').to_string(),
                    );
            }
            payload
        })
        .collect()
}

/// Generic city-centre search used when no places are known.
pub(crate) fn fallback_place(candidate: &DestinationCandidate) -> EntityPayload {
    let mut payload = EntityPayload::new(
        EntityKind::Place,
        format!("{} city center", candidate.city_name),
        LinkBuilder::place_search(&candidate.city_name),
    );
    payload.provider = "fallback".to_string();
    payload.stable_id = format!("search:place:{}:center", candidate.airport_code);
    payload.confidence = 0.3;
    payload.rationale = "Places source unavailable; using generic search fallback.".to_string();
    payload.description = "Popular area fallback.".to_string();
    payload
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use trippilot_core::{CandidateEntities, CandidateMetadata};

    use super::*;
    use crate::fx::RateTable;

    fn candidate(places: Vec<RawEntity>) -> DestinationCandidate {
        DestinationCandidate {
            id: Uuid::new_v4(),
            plan_id: Uuid::nil(),
            airport_code: "LIS".to_string(),
            city_name: "Lisbon".to_string(),
            country_code: "PT".to_string(),
            coordinates: None,
            timezone: "Europe/Lisbon".to_string(),
            rank: 1,
            metadata: CandidateMetadata {
                entities: CandidateEntities {
                    places,
                    ..CandidateEntities::default()
                },
                ..CandidateMetadata::default()
            },
        }
    }

    fn payload(url: &str) -> EntityPayload {
        EntityPayload::new(EntityKind::Hotel, "x", url)
    }

    #[test]
    fn merge_skips_selected_link_and_caps() {
        let merged = merge_selected_first(
            vec![payload("https://a")],
            vec![payload("https://a"), payload("https://b"), payload(""), payload("https://c")],
            3,
        );
        let urls: Vec<&str> = merged.iter().map(|p| p.outbound_url.as_str()).collect();
        assert_eq!(urls, vec!["https://a", "https://b", ""]);
    }

    #[test]
    fn merge_dedupes_alternatives_against_each_other() {
        let merged = merge_selected_first(
            vec![payload("https://a")],
            vec![
                payload("https://b"),
                payload(" https://b "),
                payload(""),
                payload(""),
                payload("https://c"),
            ],
            8,
        );
        let urls: Vec<&str> = merged.iter().map(|p| p.outbound_url.as_str()).collect();
        assert_eq!(urls, vec!["https://a", "https://b", "", "", "https://c"]);
    }

    #[test]
    fn raw_alternatives_get_defaults() {
        let raws = vec![RawEntity {
            name: Some("Budget stay".to_string()),
            link: Some("https://hotels.example/1".to_string()),
            link_type: Some("ITEM".to_string()),
            ..RawEntity::default()
        }];
        let out = metadata_alternatives(EntityKind::Hotel, &raws, false);
        assert_eq!(out[0].title, "Budget stay");
        assert_eq!(out[0].outbound_url, "https://hotels.example/1");
        assert_eq!(out[0].link_type, LinkType::Item);
        assert!(!out[0].fallback_search);
        assert!((out[0].confidence - 0.5).abs() < f64::EPSILON);
        assert_eq!(out[0].rationale, "Additional entity from candidate metadata.");

        let tours = metadata_alternatives(EntityKind::Tour, &raws, true);
        assert!((tours[0].confidence - 0.45).abs() < f64::EPSILON);
        assert_eq!(tours[0].rationale, "Additional tour candidate metadata.");
    }

    #[test]
    fn places_are_normalized_and_untitled_dropped() {
        let c = candidate(vec![
            RawEntity {
                title: Some("Belem Tower".to_string()),
                outbound_url: Some("https://en.wikipedia.org/wiki/Belem_Tower".to_string()),
                ..RawEntity::default()
            },
            RawEntity {
                title: Some("Alfama".to_string()),
                link: Some("https://www.google.com/search?q=alfama".to_string()),
                ..RawEntity::default()
            },
            RawEntity {
                link: Some("https://nowhere".to_string()),
                ..RawEntity::default()
            },
        ]);
        let places = candidate_places(&c);
        assert_eq!(places.len(), 2);
        assert_eq!(places[0].link_type, LinkType::Item);
        assert_eq!(places[0].provider, "places");
        assert_eq!(places[0].stable_id, "belem-tower");
        assert!((places[0].confidence - 0.65).abs() < f64::EPSILON);
        assert_eq!(places[1].link_type, LinkType::Search);
        assert!(places[1].fallback_search);
        assert!((places[1].confidence - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn fallback_entities_use_search_links() {
        let c = candidate(vec![]);
        let tour = fallback_tour(&c, Uuid::nil(), &LinkBuilder::default());
        assert_eq!(tour.title, "Lisbon tours search");
        assert_eq!(tour.stable_id, "search:tour:LIS:fallback");
        assert!(tour.fallback_search);
        assert!(tour.outbound_url.contains("tp_link_type=tour"));

        let place = fallback_place(&c);
        assert_eq!(place.stable_id, "search:place:LIS:center");
        assert!(place.outbound_url.starts_with("https://www.google.com/search?q=Lisbon"));
    }

    #[test]
    fn unpriced_tour_has_no_price() {
        let tour = TourOption {
            offer: OfferCore::new(
                Uuid::nil(),
                Uuid::nil(),
                "tours",
                "",
                Decimal::ZERO,
                Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap(),
            ),
            external_product_id: String::new(),
            name: "Tram 28".to_string(),
        };
        let out = tour_payload(&tour, "EUR", &RateTable::default());
        assert!(out.price.is_none());
        assert!(out.currency.is_empty());
        assert_eq!(out.stable_id, tour.offer.id.to_string());
        assert_eq!(out.rationale, "Tour deeplink routed to partner.");
    }
}
