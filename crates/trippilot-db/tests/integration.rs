//! Offline tests for trippilot-db pool configuration and row decoding.
//! These tests do not require a live database connection.

use std::path::PathBuf;

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use trippilot_core::{
    AppConfig, CandidateMetadata, Environment, FlightOption, OfferCore, SortMode,
};
use trippilot_db::{
    decode_option_rows, CandidateRow, DbError, OptionKind, OptionRow, PackageRow, PoolConfig,
};
use uuid::Uuid;

fn app_config(database_url: Option<&str>) -> AppConfig {
    AppConfig {
        database_url: database_url.map(str::to_string),
        env: Environment::Test,
        log_level: "info".to_string(),
        baselines_path: PathBuf::from("./config/pricing_baselines.yaml"),
        airports_path: PathBuf::from("./config/airports.yaml"),
        max_candidates: 8,
        max_packages: 10,
        flights_per_city: 3,
        hotels_per_city: 3,
        sort_mode: SortMode::BudgetFirst,
        affiliate_marker: None,
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
    }
}

fn candidate_row(metadata: serde_json::Value) -> CandidateRow {
    CandidateRow {
        id: Uuid::new_v4(),
        plan_id: Uuid::new_v4(),
        airport_code: "CDG".to_string(),
        city_name: "Paris".to_string(),
        country_code: "FR".to_string(),
        latitude: Some(49.0097),
        longitude: Some(2.5479),
        timezone: "Europe/Paris".to_string(),
        rank: 2,
        metadata,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let pool_config = PoolConfig::from_app_config(&app_config(None));
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[tokio::test]
async fn connect_without_database_url_is_rejected() {
    let err = trippilot_db::connect_pool_from_config(&app_config(None))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::MissingDatabaseUrl));
}

#[test]
fn candidate_row_decodes_into_domain_candidate() {
    let metadata = serde_json::json!({
        "heuristic_score": 71.5,
        "tags": ["culture", "food"],
        "unknown_key": "ignored"
    });
    let row = candidate_row(metadata);
    let plan_id = row.plan_id;

    let candidate = row.into_candidate().unwrap();
    assert_eq!(candidate.plan_id, plan_id);
    assert_eq!(candidate.rank, 2);
    assert_eq!(candidate.airport_code, "CDG");
    let coords = candidate.coordinates.expect("coordinates should decode");
    assert!((coords.latitude - 49.0097).abs() < 1e-9);
    assert_eq!(candidate.metadata.heuristic_score, Some(71.5));
}

#[test]
fn candidate_row_with_missing_axis_has_no_coordinates() {
    let mut row = candidate_row(serde_json::json!({}));
    row.longitude = None;
    let candidate = row.into_candidate().unwrap();
    assert!(candidate.coordinates.is_none());
    assert_eq!(candidate.metadata, CandidateMetadata::default());
}

#[test]
fn candidate_row_with_non_object_metadata_is_a_decode_error() {
    let row = candidate_row(serde_json::json!("not a bag"));
    let err = row.into_candidate().unwrap_err();
    assert!(matches!(
        err,
        DbError::Decode {
            what: "candidate metadata",
            ..
        }
    ));
}

fn flight_row(price: Decimal) -> (FlightOption, OptionRow) {
    let checked = Utc.with_ymd_and_hms(2026, 5, 20, 9, 0, 0).unwrap();
    let offer = OfferCore::new(
        Uuid::new_v4(),
        Uuid::new_v4(),
        "fallback",
        "USD",
        price,
        checked,
    );
    let flight = FlightOption {
        offer: offer.clone(),
        external_offer_id: "fallback:JFK:CDG:2026-06-01".to_string(),
        origin_airport: "JFK".to_string(),
        destination_airport: "CDG".to_string(),
        departure_at: None,
        return_at: None,
        airline_codes: vec![],
        stops: 1,
        duration_minutes: 450,
        cabin_class: "economy".to_string(),
    };

    let row = OptionRow {
        id: offer.id,
        plan_id: offer.plan_id,
        candidate_id: offer.candidate_id,
        kind: OptionKind::Flight.to_string(),
        provider: offer.provider.clone(),
        currency: offer.currency.clone(),
        total_price: offer.total_price,
        amount_minor: offer.amount_minor,
        deeplink_url: offer.deeplink_url.clone(),
        link_type: offer.link_type.to_string(),
        payload: serde_json::to_value(&flight).unwrap(),
        last_checked_at: checked,
        created_at: checked,
    };
    (flight, row)
}

#[test]
fn option_row_payload_decodes_to_option() {
    let (flight, row) = flight_row(Decimal::new(41_250, 2));

    assert!(row.minor_units_consistent());
    let mut drifted = row.clone();
    drifted.amount_minor = 41_200;
    assert!(!drifted.minor_units_consistent());

    let decoded: FlightOption = row.decode().unwrap();
    assert_eq!(decoded, flight);
    assert_eq!(decoded.offer.amount_minor, 41_250);
}

#[test]
fn option_rows_decode_in_order_and_fail_on_wrong_kind() {
    let (cheap, cheap_row) = flight_row(Decimal::from(300));
    let (dear, dear_row) = flight_row(Decimal::from(700));

    let decoded: Vec<FlightOption> =
        decode_option_rows(vec![cheap_row.clone(), dear_row]).unwrap();
    assert_eq!(decoded, vec![cheap, dear]);

    let err = decode_option_rows::<trippilot_core::HotelOption>(vec![cheap_row]).unwrap_err();
    assert!(matches!(
        err,
        DbError::Decode {
            what: "option payload",
            ..
        }
    ));
}

#[test]
fn option_kinds_match_schema_check() {
    let kinds: Vec<&str> = [OptionKind::Flight, OptionKind::Hotel, OptionKind::Tour]
        .into_iter()
        .map(OptionKind::as_str)
        .collect();
    assert_eq!(kinds, vec!["flight", "hotel", "tour"]);
}

#[test]
fn package_row_with_garbage_payload_is_a_decode_error() {
    let now = Utc::now();
    let row = PackageRow {
        id: Uuid::new_v4(),
        plan_id: Uuid::new_v4(),
        candidate_id: Uuid::new_v4(),
        destination_code: "LIS".to_string(),
        rank: 1,
        currency: "USD".to_string(),
        total_price: Decimal::from(900),
        amount_minor: 90_000,
        estimated_total_min: Decimal::from(800),
        estimated_total_max: Decimal::from(1000),
        score: 72.0,
        content_signature: "0".repeat(64),
        payload: serde_json::json!({ "rank": 1 }),
        freshness_at: now,
        last_scored_at: now,
        created_at: now,
    };
    assert!(matches!(
        row.into_package().unwrap_err(),
        DbError::Decode {
            what: "package payload",
            ..
        }
    ));
}
