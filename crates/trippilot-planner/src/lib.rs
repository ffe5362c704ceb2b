//! Trip planning core: destination ranking, package scoring and package assembly.
//!
//! Everything here is synchronous and free of I/O. Market data, currency
//! conversion and option rows arrive through the [`EstimateProvider`] and
//! [`CurrencyConverter`] contracts or as plain values.

pub mod assembler;
pub mod deeplinks;
pub mod error;
pub mod estimator;
pub mod fx;
pub mod materialize;
pub mod pipeline;
pub mod ranker;
pub mod scorer;

pub use assembler::{AssemblerConfig, AssemblyRequest, OptionPools, PackageAssembler};
pub use deeplinks::LinkBuilder;
pub use error::{PlannerError, ProviderError};
pub use estimator::{EstimateProvider, FallbackEstimator};
pub use fx::{CurrencyConverter, RateTable};
pub use materialize::{materialize_options, MaterializedOptions};
pub use pipeline::{PlanOutcome, PlanPipeline};
pub use ranker::{candidate_score, CandidateRanker, CandidateScore, Endpoint};
pub use scorer::{score_package, PackageScore, ScoreInputs};
