use crate::app_config::{AppConfig, Environment};
use crate::package::SortMode;
use crate::ConfigError;

/// Upper bound on explore-mode candidates per plan.
pub const MAX_CANDIDATES_LIMIT: usize = 20;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can use a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| invalid(var, e.to_string()))
    };

    let parse_bounded = |var: &str, default: &str, max: usize| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        let value = raw
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if value == 0 || value > max {
            return Err(invalid(var, format!("must be between 1 and {max}, got {value}")));
        }
        Ok(value)
    };

    let database_url = optional("DATABASE_URL");
    let env = parse_environment(&or_default("TRIPPILOT_ENV", "development"))?;
    let log_level = or_default("TRIPPILOT_LOG_LEVEL", "info");
    let baselines_path = PathBuf::from(or_default(
        "TRIPPILOT_BASELINES_PATH",
        "./config/pricing_baselines.yaml",
    ));
    let airports_path = PathBuf::from(or_default(
        "TRIPPILOT_AIRPORTS_PATH",
        "./config/airports.yaml",
    ));

    let max_candidates = parse_bounded("TRIPPILOT_MAX_CANDIDATES", "8", MAX_CANDIDATES_LIMIT)?;
    let max_packages = parse_bounded("TRIPPILOT_MAX_PACKAGES", "10", usize::MAX)?;
    let flights_per_city = parse_bounded("TRIPPILOT_FLIGHTS_PER_CITY", "3", usize::MAX)?;
    let hotels_per_city = parse_bounded("TRIPPILOT_HOTELS_PER_CITY", "3", usize::MAX)?;

    let sort_mode = or_default("TRIPPILOT_SORT_MODE", "budget_first")
        .parse::<SortMode>()
        .map_err(|e| invalid("TRIPPILOT_SORT_MODE", e.to_string()))?;

    let affiliate_marker = optional("TRIPPILOT_AFFILIATE_MARKER");

    let db_max_connections = parse_u32("TRIPPILOT_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("TRIPPILOT_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("TRIPPILOT_DB_ACQUIRE_TIMEOUT_SECS", "10")?;
    if db_min_connections > db_max_connections {
        return Err(invalid(
            "TRIPPILOT_DB_MIN_CONNECTIONS",
            format!(
                "must not exceed TRIPPILOT_DB_MAX_CONNECTIONS ({db_min_connections} > {db_max_connections})"
            ),
        ));
    }

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        baselines_path,
        airports_path,
        max_candidates,
        max_packages,
        flights_per_city,
        hotels_per_city,
        sort_mode,
        affiliate_marker,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Typos such as `producton` are rejected instead of silently running as development.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "production" => Ok(Environment::Production),
        "test" => Ok(Environment::Test),
        other => Err(ConfigError::InvalidEnvVar {
            var: "TRIPPILOT_ENV".to_string(),
            reason: format!("expected development, test, or production; got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
