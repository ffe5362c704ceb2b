//! Plan command handlers for the CLI.
//!
//! Plan requests are read from JSON files. Ranking and assembly run fully in
//! memory; the database is only touched by `--persist`, `import-options`,
//! `rescore` and `show`.

use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::Subcommand;
use sqlx::PgPool;
use trippilot_core::{AirportsFile, AppConfig, PlanRequest, PricingBaselines, SortMode};
use trippilot_db::OptionKind;
use trippilot_planner::{
    AssemblerConfig, CandidateRanker, FallbackEstimator, LinkBuilder, OptionPools, PlanOutcome,
    PlanPipeline, RateTable,
};
use uuid::Uuid;

/// Sub-commands available under `plan`.
#[derive(Debug, Subcommand)]
pub enum PlanCommands {
    /// Rank destination candidates for a plan request
    Candidates {
        /// Path to a plan request JSON file
        #[arg(long)]
        plan: PathBuf,
    },
    /// Assemble ranked packages for a plan request
    Packages {
        /// Path to a plan request JSON file
        #[arg(long)]
        plan: PathBuf,
        /// Sort mode (cheapest, fastest, fewest_stops, family_friendly,
        /// best_hotel, best_value, budget_first)
        #[arg(long)]
        sort: Option<SortMode>,
        /// Maximum number of packages to keep
        #[arg(long)]
        max: Option<usize>,
        /// Store the plan, candidates, options and packages in the database
        #[arg(long)]
        persist: bool,
    },
    /// Replace a stored plan's flight, hotel and tour options from a JSON file
    ImportOptions {
        /// Plan id
        #[arg(long)]
        id: Uuid,
        /// Path to a JSON object with `flights`, `hotels` and `tours` arrays
        #[arg(long)]
        file: PathBuf,
    },
    /// Rebuild a stored plan's packages from its stored candidates and options
    Rescore {
        /// Plan id
        #[arg(long)]
        id: Uuid,
        /// Sort mode override
        #[arg(long)]
        sort: Option<SortMode>,
        /// Maximum number of packages to keep
        #[arg(long)]
        max: Option<usize>,
    },
    /// Print a stored plan with its candidates, options and packages
    Show {
        /// Plan id
        #[arg(long)]
        id: Uuid,
    },
}

/// Dispatch a `plan` sub-command.
///
/// # Errors
///
/// Returns an error if the plan file or reference data cannot be loaded, the
/// plan is invalid, or a database operation fails.
pub(crate) async fn run(config: &AppConfig, command: PlanCommands) -> anyhow::Result<()> {
    match command {
        PlanCommands::Candidates { plan } => run_candidates(config, &plan),
        PlanCommands::Packages {
            plan,
            sort,
            max,
            persist,
        } => run_packages(config, &plan, sort, max, persist).await,
        PlanCommands::ImportOptions { id, file } => run_import_options(config, id, &file).await,
        PlanCommands::Rescore { id, sort, max } => run_rescore(config, id, sort, max).await,
        PlanCommands::Show { id } => run_show(config, id).await,
    }
}

struct ReferenceData {
    airports: AirportsFile,
    baselines: PricingBaselines,
}

fn load_reference_data(config: &AppConfig) -> anyhow::Result<ReferenceData> {
    let airports = trippilot_core::load_airports(&config.airports_path)?;
    let baselines = trippilot_core::load_baselines(&config.baselines_path)?;
    tracing::debug!(
        airports = airports.airports.len(),
        baselines = %config.baselines_path.display(),
        "reference data loaded"
    );
    Ok(ReferenceData {
        airports,
        baselines,
    })
}

fn load_plan(path: &Path) -> anyhow::Result<PlanRequest> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read plan file {}: {e}", path.display()))?;
    let plan: PlanRequest = serde_json::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("failed to parse plan file {}: {e}", path.display()))?;
    plan.validate()?;
    Ok(plan)
}

/// Build the assembler settings from config plus command-line overrides.
pub(crate) fn assembler_config(
    config: &AppConfig,
    sort: Option<SortMode>,
    max: Option<usize>,
) -> AssemblerConfig {
    let mut assembler = AssemblerConfig::from_app_config(config);
    if let Some(sort) = sort {
        assembler.sort_mode = sort;
    }
    if let Some(max) = max {
        assembler.max_packages = max.max(1);
    }
    assembler
}

fn run_candidates(config: &AppConfig, plan_path: &Path) -> anyhow::Result<()> {
    let plan = load_plan(plan_path)?;
    let data = load_reference_data(config)?;

    let candidates = CandidateRanker::new(&data.airports, &data.baselines)
        .with_max_candidates(config.max_candidates)
        .rank(&plan, Utc::now())?;

    println!("{}", serde_json::to_string_pretty(&candidates)?);
    Ok(())
}

async fn run_packages(
    config: &AppConfig,
    plan_path: &Path,
    sort: Option<SortMode>,
    max: Option<usize>,
    persist: bool,
) -> anyhow::Result<()> {
    let plan = load_plan(plan_path)?;
    let data = load_reference_data(config)?;

    let provider = FallbackEstimator::new(&data.baselines);
    let rates = RateTable::from_baselines(&data.baselines);
    let outcome = PlanPipeline::new(&data.airports, &data.baselines, &provider, &rates)
        .with_links(LinkBuilder::new(config.affiliate_marker.clone()))
        .with_max_candidates(config.max_candidates)
        .with_assembler_config(assembler_config(config, sort, max))
        .run(&plan, Utc::now())?;

    tracing::info!(
        plan_id = %plan.id,
        candidates = outcome.candidates.len(),
        packages = outcome.packages.len(),
        "plan assembled"
    );

    if persist {
        persist_outcome(config, &plan, &outcome).await?;
    }

    println!("{}", serde_json::to_string_pretty(&outcome.packages)?);
    Ok(())
}

async fn persist_outcome(
    config: &AppConfig,
    plan: &PlanRequest,
    outcome: &PlanOutcome,
) -> anyhow::Result<()> {
    let pool = trippilot_db::connect_pool_from_config(config).await?;
    trippilot_db::run_migrations(&pool).await?;

    trippilot_db::upsert_plan(&pool, plan).await?;
    trippilot_db::replace_plan_candidates(&pool, plan.id, &outcome.ranked).await?;
    for candidate in &outcome.candidates {
        trippilot_db::merge_candidate_metadata(&pool, candidate.id, candidate.metadata.clone())
            .await?;
    }
    let options = trippilot_db::replace_plan_options(
        &pool,
        plan.id,
        &outcome.options.flights,
        &outcome.options.hotels,
        &outcome.options.tours,
    )
    .await?;
    let packages = trippilot_db::replace_plan_packages(&pool, plan.id, &outcome.packages).await?;

    tracing::info!(plan_id = %plan.id, options, packages, "plan persisted");
    Ok(())
}

/// Read an option file and check every row belongs to `plan_id`.
pub(crate) fn load_option_file(path: &Path, plan_id: Uuid) -> anyhow::Result<OptionPools> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read option file {}: {e}", path.display()))?;
    let pools: OptionPools = serde_json::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("failed to parse option file {}: {e}", path.display()))?;

    let offers = pools
        .flights
        .iter()
        .map(|f| &f.offer)
        .chain(pools.hotels.iter().map(|h| &h.offer))
        .chain(pools.tours.iter().map(|t| &t.offer));
    for offer in offers {
        if offer.plan_id != plan_id {
            anyhow::bail!(
                "option {} in {} belongs to plan {}, not {plan_id}",
                offer.id,
                path.display(),
                offer.plan_id
            );
        }
    }
    Ok(pools)
}

async fn load_stored_options(pool: &PgPool, plan_id: Uuid) -> anyhow::Result<OptionPools> {
    Ok(OptionPools {
        flights: trippilot_db::load_plan_options(pool, plan_id, OptionKind::Flight).await?,
        hotels: trippilot_db::load_plan_options(pool, plan_id, OptionKind::Hotel).await?,
        tours: trippilot_db::load_plan_options(pool, plan_id, OptionKind::Tour).await?,
    })
}

async fn run_import_options(config: &AppConfig, plan_id: Uuid, path: &Path) -> anyhow::Result<()> {
    let pools = load_option_file(path, plan_id)?;
    let pool = trippilot_db::connect_pool_from_config(config).await?;
    if trippilot_db::get_plan(&pool, plan_id).await?.is_none() {
        anyhow::bail!("plan '{plan_id}' not found");
    }

    let written = trippilot_db::replace_plan_options(
        &pool,
        plan_id,
        &pools.flights,
        &pools.hotels,
        &pools.tours,
    )
    .await?;
    tracing::info!(plan_id = %plan_id, options = written, "plan options imported");
    println!("imported {written} options");
    Ok(())
}

async fn run_rescore(
    config: &AppConfig,
    plan_id: Uuid,
    sort: Option<SortMode>,
    max: Option<usize>,
) -> anyhow::Result<()> {
    let pool = trippilot_db::connect_pool_from_config(config).await?;
    let Some(plan) = trippilot_db::get_plan(&pool, plan_id).await? else {
        anyhow::bail!("plan '{plan_id}' not found");
    };
    let candidates = trippilot_db::list_plan_candidates(&pool, plan_id).await?;
    let pools = load_stored_options(&pool, plan_id).await?;
    if pools.is_empty() {
        tracing::warn!(plan_id = %plan_id, "plan has no stored options; packages will be cleared");
    }

    let data = load_reference_data(config)?;
    let provider = FallbackEstimator::new(&data.baselines);
    let rates = RateTable::from_baselines(&data.baselines);
    let packages = PlanPipeline::new(&data.airports, &data.baselines, &provider, &rates)
        .with_links(LinkBuilder::new(config.affiliate_marker.clone()))
        .with_assembler_config(assembler_config(config, sort, max))
        .rescore(&plan, &candidates, &pools, Utc::now())?;

    let written = trippilot_db::replace_plan_packages(&pool, plan_id, &packages).await?;
    tracing::info!(
        plan_id = %plan_id,
        candidates = candidates.len(),
        options = pools.len(),
        packages = written,
        "plan rescored"
    );

    println!("{}", serde_json::to_string_pretty(&packages)?);
    Ok(())
}

async fn run_show(config: &AppConfig, plan_id: Uuid) -> anyhow::Result<()> {
    let pool = trippilot_db::connect_pool_from_config(config).await?;
    let Some(plan) = trippilot_db::get_plan(&pool, plan_id).await? else {
        anyhow::bail!("plan '{plan_id}' not found");
    };

    let candidates = trippilot_db::list_plan_candidates(&pool, plan_id).await?;
    let options = load_stored_options(&pool, plan_id).await?;
    let packages = trippilot_db::list_plan_packages(&pool, plan_id).await?;
    if packages.is_empty() {
        tracing::info!(plan_id = %plan_id, "plan has no stored packages");
    }

    let report = serde_json::json!({
        "plan": plan,
        "candidates": candidates,
        "options": options,
        "packages": packages,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
