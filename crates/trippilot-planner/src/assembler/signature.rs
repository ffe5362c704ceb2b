//! Content signatures used to drop visually identical combinations.

use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use trippilot_core::money::format_money;
use trippilot_core::{DestinationCandidate, FlightOption, HotelOption, TourOption};

use crate::scorer::round2;

/// Priced totals that take part in the signature.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SignatureTotals {
    pub flight: Decimal,
    pub hotel: Decimal,
    pub tours: Decimal,
    pub package: Decimal,
}

fn norm(value: &str) -> String {
    value.trim().to_lowercase()
}

fn flight_signature(flight: &FlightOption) -> String {
    let airlines: Vec<String> = flight
        .airline_codes
        .iter()
        .map(|code| code.to_uppercase())
        .collect();
    [
        norm(&flight.offer.provider),
        norm(&flight.origin_airport),
        norm(&flight.destination_airport),
        format_money(flight.offer.total_price),
        norm(&flight.offer.currency),
        flight.stops.to_string(),
        flight.duration_minutes.to_string(),
        airlines.join(","),
        flight.offer.deeplink_url.trim().to_string(),
        flight
            .offer
            .raw_payload
            .stable_offer_id
            .clone()
            .unwrap_or_default(),
    ]
    .join("\x00")
}

fn hotel_signature(hotel: &HotelOption) -> String {
    let property_id = if hotel.provider_property_id.is_empty() {
        hotel
            .offer
            .raw_payload
            .provider_property_id
            .clone()
            .unwrap_or_default()
    } else {
        hotel.provider_property_id.clone()
    };
    [
        norm(&hotel.offer.provider),
        norm(&hotel.name),
        property_id,
        format_money(hotel.offer.total_price),
        norm(&hotel.offer.currency),
        format!("{:.2}", round2(hotel.star_rating)),
        format!("{:.2}", round2(hotel.guest_rating)),
        norm(&hotel.neighborhood),
        hotel.offer.deeplink_url.trim().to_string(),
    ]
    .join("\x00")
}

fn tour_signature(tour: &TourOption) -> String {
    [
        norm(&tour.offer.provider),
        norm(&tour.name),
        norm(&tour.external_product_id),
        format_money(tour.offer.total_price),
        norm(&tour.offer.currency),
        tour.offer.deeplink_url.trim().to_string(),
    ]
    .join("\x00")
}

/// SHA-256 hex digest over everything a traveller would see in a package.
///
/// Option row ids are deliberately absent: two rows describing the same offer
/// produce the same signature.
pub(crate) fn combination_signature(
    candidate: &DestinationCandidate,
    flight: &FlightOption,
    hotel: &HotelOption,
    tours: &[&TourOption],
    totals: SignatureTotals,
) -> String {
    let tours: Vec<String> = tours.iter().map(|t| tour_signature(t)).collect();
    let input = [
        norm(&candidate.airport_code),
        norm(&candidate.city_name),
        flight_signature(flight),
        hotel_signature(hotel),
        tours.join("\x1f"),
        format_money(totals.flight),
        format_money(totals.hotel),
        format_money(totals.tours),
        format_money(totals.package),
    ]
    .join("\x1e");
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use trippilot_core::{CandidateMetadata, OfferCore};
    use uuid::Uuid;

    use super::*;

    fn offer(price: i64) -> OfferCore {
        OfferCore::new(
            Uuid::nil(),
            Uuid::nil(),
            "Baseline",
            "USD",
            Decimal::from(price),
            Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap(),
        )
    }

    fn candidate() -> DestinationCandidate {
        DestinationCandidate {
            id: Uuid::new_v4(),
            plan_id: Uuid::nil(),
            airport_code: "CDG".to_string(),
            city_name: "Paris".to_string(),
            country_code: "FR".to_string(),
            coordinates: None,
            timezone: "Europe/Paris".to_string(),
            rank: 1,
            metadata: CandidateMetadata::default(),
        }
    }

    fn flight() -> FlightOption {
        FlightOption {
            offer: offer(600),
            external_offer_id: "f-1".to_string(),
            origin_airport: "JFK".to_string(),
            destination_airport: "CDG".to_string(),
            departure_at: None,
            return_at: None,
            airline_codes: vec!["af".to_string()],
            stops: 1,
            duration_minutes: 480,
            cabin_class: "economy".to_string(),
        }
    }

    fn hotel() -> HotelOption {
        HotelOption {
            offer: offer(500),
            external_offer_id: "h-1".to_string(),
            provider_property_id: "p-1".to_string(),
            name: "Hotel".to_string(),
            star_rating: 3.7,
            guest_rating: 8.0,
            neighborhood: "City center".to_string(),
            coordinates: None,
            amenities: vec![],
            distance_km: None,
        }
    }

    fn totals() -> SignatureTotals {
        SignatureTotals {
            flight: Decimal::from(600),
            hotel: Decimal::from(500),
            tours: Decimal::ZERO,
            package: Decimal::from(1100),
        }
    }

    #[test]
    fn row_ids_do_not_affect_signature() {
        let a = flight();
        let mut b = flight();
        b.offer.id = Uuid::new_v4();
        let c = candidate();
        let h = hotel();
        let sig_a = combination_signature(&c, &a, &h, &[], totals());
        let sig_b = combination_signature(&c, &b, &h, &[], totals());
        assert_eq!(sig_a, sig_b);
        assert_eq!(sig_a.len(), 64);
    }

    #[test]
    fn case_and_whitespace_are_normalized() {
        let c = candidate();
        let h = hotel();
        let a = flight();
        let mut b = flight();
        b.offer.provider = "  baseline ".to_string();
        b.offer.currency = "usd".to_string();
        assert_eq!(
            combination_signature(&c, &a, &h, &[], totals()),
            combination_signature(&c, &b, &h, &[], totals())
        );
    }

    #[test]
    fn visible_differences_change_signature() {
        let c = candidate();
        let f = flight();
        let h = hotel();
        let base = combination_signature(&c, &f, &h, &[], totals());

        let mut other_hotel = hotel();
        other_hotel.neighborhood = "Marais".to_string();
        assert_ne!(base, combination_signature(&c, &f, &other_hotel, &[], totals()));

        let tour = TourOption {
            offer: offer(0),
            external_product_id: "t-1".to_string(),
            name: "Louvre".to_string(),
        };
        assert_ne!(base, combination_signature(&c, &f, &h, &[&tour], totals()));
    }
}
