//! Cross-module package assembly scenarios. Pure, no I/O.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use trippilot_core::money::to_minor_units;
use trippilot_core::{
    CandidateMetadata, DestinationCandidate, FlightOption, HotelOption, OfferCore, PackageOption,
    PlanRequest, SearchMode, SortMode, TourOption,
};
use trippilot_planner::{
    AssemblerConfig, AssemblyRequest, LinkBuilder, OptionPools, PackageAssembler, RateTable,
};
use uuid::Uuid;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap()
}

fn plan() -> PlanRequest {
    PlanRequest {
        id: Uuid::new_v4(),
        origin_code: "JFK".to_string(),
        search_mode: SearchMode::Direct,
        destination_codes: vec!["CDG".to_string(), "LIS".to_string()],
        destination_country: None,
        depart_date: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
        return_date: Some(NaiveDate::from_ymd_opt(2026, 6, 6).unwrap()),
        trip_length_min: 3,
        trip_length_max: 7,
        total_budget: Decimal::from(2000),
        adults: 2,
        children: 0,
        search_currency: "USD".to_string(),
        preference_weights: BTreeMap::from([("culture".to_string(), 1.0)]),
        max_duration_minutes: None,
    }
}

fn candidate(plan: &PlanRequest, code: &str, city: &str, country: &str, rank: u32) -> DestinationCandidate {
    DestinationCandidate {
        id: Uuid::new_v4(),
        plan_id: plan.id,
        airport_code: code.to_string(),
        city_name: city.to_string(),
        country_code: country.to_string(),
        coordinates: None,
        timezone: "Europe/Paris".to_string(),
        rank,
        metadata: CandidateMetadata {
            tags: vec!["culture".to_string(), "food".to_string()],
            ..CandidateMetadata::default()
        },
    }
}

fn offer(
    plan: &PlanRequest,
    candidate: &DestinationCandidate,
    price: i64,
    url: &str,
    age_hours: i64,
) -> OfferCore {
    let mut offer = OfferCore::new(
        plan.id,
        candidate.id,
        "baseline",
        "USD",
        Decimal::from(price),
        now() - Duration::hours(age_hours),
    );
    offer.deeplink_url = url.to_string();
    offer.link_confidence = 0.85;
    offer
}

fn flight(plan: &PlanRequest, candidate: &DestinationCandidate, price: i64, age_hours: i64) -> FlightOption {
    FlightOption {
        offer: offer(
            plan,
            candidate,
            price,
            &format!("https://fly.example/{}/{price}", candidate.airport_code),
            age_hours,
        ),
        external_offer_id: format!("{}-{price}", candidate.airport_code),
        origin_airport: "JFK".to_string(),
        destination_airport: candidate.airport_code.clone(),
        departure_at: None,
        return_at: None,
        airline_codes: vec!["XX".to_string()],
        stops: u32::from(price % 2 == 0),
        duration_minutes: 420 + u32::try_from(price / 10).unwrap(),
        cabin_class: "economy".to_string(),
    }
}

fn hotel(plan: &PlanRequest, candidate: &DestinationCandidate, price: i64, age_hours: i64) -> HotelOption {
    HotelOption {
        offer: offer(
            plan,
            candidate,
            price,
            &format!("https://stay.example/{}/{price}", candidate.airport_code),
            age_hours,
        ),
        external_offer_id: format!("h-{price}"),
        provider_property_id: format!("{}-p{price}", candidate.airport_code),
        name: format!("{} Hotel {price}", candidate.city_name),
        star_rating: 3.5,
        guest_rating: 7.9,
        neighborhood: "City center".to_string(),
        coordinates: None,
        amenities: vec![],
        distance_km: None,
    }
}

fn tour(plan: &PlanRequest, candidate: &DestinationCandidate, name: &str, price: i64, age_hours: i64) -> TourOption {
    TourOption {
        offer: offer(
            plan,
            candidate,
            price,
            &format!("https://tours.example/{name}"),
            age_hours,
        ),
        external_product_id: name.to_string(),
        name: name.to_string(),
    }
}

/// Two candidates with 3 flights and 3 hotels each; CDG also has 3 tours.
fn fixture() -> (PlanRequest, Vec<DestinationCandidate>, OptionPools) {
    let plan = plan();
    let cdg = candidate(&plan, "CDG", "Paris", "FR", 1);
    let lis = candidate(&plan, "LIS", "Lisbon", "PT", 2);
    let mut pools = OptionPools::default();
    for (c, flights, hotels) in [
        (&cdg, [300, 400, 500], [400, 600, 800]),
        (&lis, [350, 450, 550], [380, 520, 740]),
    ] {
        for (i, price) in flights.into_iter().enumerate() {
            pools.flights.push(flight(&plan, c, price, 2 + i64::try_from(i).unwrap()));
        }
        for (i, price) in hotels.into_iter().enumerate() {
            pools.hotels.push(hotel(&plan, c, price, 30 * i64::try_from(i + 1).unwrap()));
        }
    }
    pools.tours.push(tour(&plan, &cdg, "louvre", 45, 200));
    pools.tours.push(tour(&plan, &cdg, "seine-cruise", 30, 1));
    pools.tours.push(tour(&plan, &cdg, "versailles", 90, 12));
    (plan, vec![cdg, lis], pools)
}

fn run(
    plan: &PlanRequest,
    candidates: &[DestinationCandidate],
    pools: &OptionPools,
    config: AssemblerConfig,
) -> Vec<PackageOption> {
    let rates = RateTable::default();
    PackageAssembler::new(&rates, LinkBuilder::default(), config)
        .assemble(
            &AssemblyRequest {
                plan,
                origin_timezone: "America/New_York",
                candidates,
                pools,
            },
            now(),
        )
        .unwrap()
}

fn config(sort_mode: SortMode, max_packages: usize) -> AssemblerConfig {
    AssemblerConfig {
        max_packages,
        sort_mode,
        ..AssemblerConfig::default()
    }
}

fn all_checked_at(pools: &OptionPools) -> BTreeMap<Uuid, DateTime<Utc>> {
    pools
        .flights
        .iter()
        .map(|f| &f.offer)
        .chain(pools.hotels.iter().map(|h| &h.offer))
        .chain(pools.tours.iter().map(|t| &t.offer))
        .map(|o| (o.id, o.last_checked_at))
        .collect()
}

#[test]
fn every_package_totals_flight_plus_hotel() {
    let (plan, candidates, pools) = fixture();
    for mode in SortMode::ALL {
        for package in run(&plan, &candidates, &pools, config(mode, 10)) {
            let breakdown = &package.price_breakdown;
            assert_eq!(
                package.total_price,
                breakdown.flight.amount + breakdown.hotel.amount,
                "{mode}: rank {}",
                package.rank
            );
            assert_eq!(breakdown.total.amount, package.total_price);
            assert_eq!(breakdown.tours.amount, Decimal::ZERO);
            assert_eq!(package.amount_minor, to_minor_units(package.total_price));
        }
    }
}

#[test]
fn every_package_sits_inside_its_estimated_band() {
    let (plan, candidates, pools) = fixture();
    for mode in SortMode::ALL {
        for package in run(&plan, &candidates, &pools, config(mode, 10)) {
            assert!(package.estimated_total_min <= package.total_price);
            assert!(package.total_price <= package.estimated_total_max);
        }
    }
}

#[test]
fn freshness_is_minimum_of_selected_components() {
    let (plan, candidates, pools) = fixture();
    let checked = all_checked_at(&pools);
    for package in run(&plan, &candidates, &pools, config(SortMode::BudgetFirst, 10)) {
        let expected = [package.flight_option_id, package.hotel_option_id]
            .iter()
            .chain(&package.selected_tour_option_ids)
            .map(|id| checked[id])
            .min()
            .unwrap();
        assert_eq!(package.freshness_at, expected);
    }
}

#[test]
fn repeated_runs_produce_the_same_signatures_in_the_same_order() {
    let (plan, candidates, pools) = fixture();
    for mode in SortMode::ALL {
        let first = run(&plan, &candidates, &pools, config(mode, 10));
        let second = run(&plan, &candidates, &pools, config(mode, 10));

        let sigs = |packages: &[PackageOption]| -> Vec<(u32, String)> {
            packages
                .iter()
                .map(|p| (p.rank, p.content_signature.clone()))
                .collect()
        };
        assert_eq!(sigs(&first), sigs(&second), "{mode}");

        let unique: HashSet<&str> = first.iter().map(|p| p.content_signature.as_str()).collect();
        assert_eq!(unique.len(), first.len());
    }
}

#[test]
fn duplicate_rows_do_not_produce_duplicate_packages() {
    let (plan, candidates, mut pools) = fixture();
    let copies: Vec<FlightOption> = pools
        .flights
        .iter()
        .cloned()
        .map(|mut f| {
            f.offer.id = Uuid::new_v4();
            f
        })
        .collect();
    pools.flights.extend(copies);
    let with_copies = run(&plan, &candidates, &pools, config(SortMode::Cheapest, 20));
    let unique: HashSet<&str> = with_copies
        .iter()
        .map(|p| p.content_signature.as_str())
        .collect();
    assert_eq!(unique.len(), with_copies.len());
}

#[test]
fn ranks_are_dense_and_capped() {
    let (plan, candidates, pools) = fixture();
    let packages = run(&plan, &candidates, &pools, config(SortMode::BudgetFirst, 7));
    assert_eq!(packages.len(), 7);
    let ranks: Vec<u32> = packages.iter().map(|p| p.rank).collect();
    assert_eq!(ranks, (1..=7).collect::<Vec<u32>>());
}

#[test]
fn cheapest_and_best_value_pick_different_leaders() {
    let (plan, candidates, mut pools) = fixture();
    pools.tours.clear();

    let cheapest = run(&plan, &candidates, &pools, config(SortMode::Cheapest, 10));
    let best_value = run(&plan, &candidates, &pools, config(SortMode::BestValue, 10));

    // 300 + 400 is the lowest total; 1300 is closest to 85% of the 2000 budget.
    assert_eq!(cheapest[0].total_price, Decimal::from(700));
    assert_eq!(best_value[0].total_price, Decimal::from(1300));
    assert_ne!(cheapest[0].content_signature, best_value[0].content_signature);
    assert!(cheapest
        .windows(2)
        .all(|w| w[0].total_price <= w[1].total_price));
}

#[test]
fn three_tours_yield_varied_bundles_in_top_five() {
    let (plan, mut candidates, mut pools) = fixture();
    candidates.truncate(1);
    let cdg = candidates[0].id;
    pools.flights.retain(|f| f.offer.candidate_id == cdg);
    pools.hotels.retain(|h| h.offer.candidate_id == cdg);
    pools.flights.truncate(1);
    pools.hotels.truncate(1);

    let packages = run(&plan, &candidates, &pools, config(SortMode::BudgetFirst, 5));
    assert_eq!(packages.len(), 5);
    let bundles: HashSet<Vec<Uuid>> = packages
        .iter()
        .map(|p| p.selected_tour_option_ids.clone())
        .collect();
    assert!(bundles.len() >= 3);
    assert!(packages
        .iter()
        .all(|p| p.selected_tour_option_ids.len() <= 3));
    // Tours never change the committed total.
    assert!(packages.iter().all(|p| p.total_price == packages[0].total_price));
}

#[test]
fn other_currency_plan_converts_every_component() {
    let (mut plan, mut candidates, mut pools) = fixture();
    let old_id = plan.id;
    plan.search_currency = "EUR".to_string();
    plan.id = Uuid::new_v4();
    for c in &mut candidates {
        c.plan_id = plan.id;
    }
    for offer in pools
        .flights
        .iter_mut()
        .map(|f| &mut f.offer)
        .chain(pools.hotels.iter_mut().map(|h| &mut h.offer))
        .chain(pools.tours.iter_mut().map(|t| &mut t.offer))
    {
        assert_eq!(offer.plan_id, old_id);
        offer.plan_id = plan.id;
    }

    let rates = RateTable::new([("EUR", Decimal::new(92, 2))]);
    let packages = PackageAssembler::new(
        &rates,
        LinkBuilder::default(),
        config(SortMode::Cheapest, 3),
    )
    .assemble(
        &AssemblyRequest {
            plan: &plan,
            origin_timezone: "America/New_York",
            candidates: &candidates,
            pools: &pools,
        },
        now(),
    )
    .unwrap();

    // 300 USD + 400 USD at 0.92
    assert_eq!(packages[0].currency, "EUR");
    assert_eq!(packages[0].total_price, Decimal::from(644));
    assert_eq!(packages[0].price_breakdown.flight.currency, "EUR");
}
