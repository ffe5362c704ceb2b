use std::path::PathBuf;

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use trippilot_core::{AppConfig, Environment, OfferCore, SortMode, TourOption};
use trippilot_planner::OptionPools;
use uuid::Uuid;

use super::*;
use crate::plan::{assembler_config, load_option_file};

fn app_config() -> AppConfig {
    AppConfig {
        database_url: None,
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
        db_max_connections: 10,
        db_min_connections: 1,
        db_acquire_timeout_secs: 10,
    }
}

#[test]
fn parses_db_ping_command() {
    let cli = Cli::try_parse_from(["trippilot-cli", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli =
        Cli::try_parse_from(["trippilot-cli", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["trippilot-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn parses_plan_candidates() {
    let cli = Cli::try_parse_from(["trippilot-cli", "plan", "candidates", "--plan", "trip.json"])
        .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Plan {
            command: PlanCommands::Candidates { ref plan }
        }) if plan == &PathBuf::from("trip.json")
    ));
}

#[test]
fn plan_packages_defaults() {
    let cli =
        Cli::try_parse_from(["trippilot-cli", "plan", "packages", "--plan", "trip.json"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Plan {
            command: PlanCommands::Packages {
                sort: None,
                max: None,
                persist: false,
                ..
            }
        })
    ));
}

#[test]
fn plan_packages_accepts_sort_aliases() {
    let cli = Cli::try_parse_from([
        "trippilot-cli",
        "plan",
        "packages",
        "--plan",
        "trip.json",
        "--sort",
        "best-value",
        "--max",
        "5",
        "--persist",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Plan {
            command: PlanCommands::Packages {
                sort: Some(SortMode::BestValue),
                max: Some(5),
                persist: true,
                ..
            }
        })
    ));
}

#[test]
fn plan_packages_rejects_unknown_sort() {
    let result = Cli::try_parse_from([
        "trippilot-cli",
        "plan",
        "packages",
        "--plan",
        "trip.json",
        "--sort",
        "scenic",
    ]);
    assert!(result.is_err());
}

#[test]
fn plan_show_requires_a_uuid() {
    assert!(Cli::try_parse_from(["trippilot-cli", "plan", "show", "--id", "nope"]).is_err());

    let id = Uuid::new_v4().to_string();
    let cli = Cli::try_parse_from(["trippilot-cli", "plan", "show", "--id", id.as_str()]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Plan {
            command: PlanCommands::Show { .. }
        })
    ));
}

#[test]
fn assembler_config_applies_overrides() {
    let config = app_config();

    let defaults = assembler_config(&config, None, None);
    assert_eq!(defaults.sort_mode, SortMode::BudgetFirst);
    assert_eq!(defaults.max_packages, 10);

    let overridden = assembler_config(&config, Some(SortMode::Cheapest), Some(0));
    assert_eq!(overridden.sort_mode, SortMode::Cheapest);
    assert_eq!(overridden.max_packages, 1);
}

#[test]
fn parses_plan_rescore_with_overrides() {
    let id = Uuid::new_v4();
    let cli = Cli::try_parse_from([
        "trippilot-cli",
        "plan",
        "rescore",
        "--id",
        id.to_string().as_str(),
        "--sort",
        "cheapest",
        "--max",
        "3",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Plan {
            command: PlanCommands::Rescore {
                id: parsed,
                sort: Some(SortMode::Cheapest),
                max: Some(3),
            }
        }) if parsed == id
    ));
}

#[test]
fn parses_plan_import_options() {
    let id = Uuid::new_v4();
    let cli = Cli::try_parse_from([
        "trippilot-cli",
        "plan",
        "import-options",
        "--id",
        id.to_string().as_str(),
        "--file",
        "options.json",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Plan {
            command: PlanCommands::ImportOptions { ref file, .. }
        }) if file == &PathBuf::from("options.json")
    ));
}

fn tour(plan_id: Uuid) -> TourOption {
    TourOption {
        offer: OfferCore::new(
            plan_id,
            Uuid::new_v4(),
            "tours",
            "EUR",
            Decimal::from(45),
            Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap(),
        ),
        external_product_id: "louvre".to_string(),
        name: "Louvre highlights".to_string(),
    }
}

fn write_option_file(name: &str, pools: &OptionPools) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "trippilot-options-{name}-{}.json",
        std::process::id()
    ));
    std::fs::write(&path, serde_json::to_string(pools).unwrap()).unwrap();
    path
}

#[test]
fn option_file_loads_tours_without_flights_or_hotels() {
    let plan_id = Uuid::new_v4();
    let pools = OptionPools {
        tours: vec![tour(plan_id)],
        ..OptionPools::default()
    };
    let path = write_option_file("tours", &pools);

    let loaded = load_option_file(&path, plan_id).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded, pools);
    assert_eq!(loaded.len(), 1);
}

#[test]
fn option_file_rejects_rows_from_another_plan() {
    let plan_id = Uuid::new_v4();
    let pools = OptionPools {
        tours: vec![tour(plan_id), tour(Uuid::new_v4())],
        ..OptionPools::default()
    };
    let path = write_option_file("foreign", &pools);

    let err = load_option_file(&path, plan_id).unwrap_err();
    std::fs::remove_file(&path).ok();

    assert!(err.to_string().contains("belongs to plan"));
}
