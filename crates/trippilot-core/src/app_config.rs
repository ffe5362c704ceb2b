use std::path::PathBuf;

use crate::package::SortMode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    /// `None` disables persistence; planning still runs fully in memory.
    pub database_url: Option<String>,
    pub env: Environment,
    pub log_level: String,
    pub baselines_path: PathBuf,
    pub airports_path: PathBuf,
    pub max_candidates: usize,
    pub max_packages: usize,
    pub flights_per_city: usize,
    pub hotels_per_city: usize,
    pub sort_mode: SortMode,
    pub affiliate_marker: Option<String>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("baselines_path", &self.baselines_path)
            .field("airports_path", &self.airports_path)
            .field("max_candidates", &self.max_candidates)
            .field("max_packages", &self.max_packages)
            .field("flights_per_city", &self.flights_per_city)
            .field("hotels_per_city", &self.hotels_per_city)
            .field("sort_mode", &self.sort_mode)
            .field(
                "affiliate_marker",
                &self.affiliate_marker.as_ref().map(|_| "[redacted]"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .finish()
    }
}
