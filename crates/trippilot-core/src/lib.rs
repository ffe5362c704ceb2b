pub mod airports;
pub mod app_config;
pub mod baselines;
pub mod candidates;
pub mod config;
pub mod estimate;
pub mod geo;
pub mod lenient;
pub mod money;
pub mod options;
pub mod package;
pub mod plan;

pub use airports::{load_airports, normalize_iata, Airport, AirportsFile};
pub use app_config::{AppConfig, Environment};
pub use baselines::{
    load_baselines, DestinationProfile, DistanceBand, DistanceBandProfile, HotelTier,
    HotelTierProfile, PricingBaselines,
};
pub use candidates::{CandidateEntities, CandidateMetadata, DestinationCandidate, RawEntity};
pub use config::{load_app_config, load_app_config_from_env};
pub use estimate::{CandidateEstimate, EstimateRequest, EstimateSource};
pub use geo::Coordinates;
pub use options::{FlightOption, HotelOption, LinkType, OfferCore, OptionProvenance, TourOption};
pub use package::{
    ComponentLink, ComponentLinks, ComponentSignals, ComponentSummary, EntityKind, EntityPayload,
    EstimateBand, PackageOption, PriceBreakdown, PriceComponent, ScoreBreakdown, ScoreWeights,
    SortMode,
};
pub use plan::{PlanRequest, SearchMode, MAX_TRIP_NIGHTS};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
    #[error("failed to read config file {path}: {source}")]
    FileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    FileParse(#[from] serde_yaml::Error),
    #[error("config validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid plan: {0}")]
    InvalidPlan(String),
    #[error("unknown sort mode: {0}")]
    UnknownSortMode(String),
}
