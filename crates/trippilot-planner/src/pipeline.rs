//! Plan pipeline orchestration.

use chrono::{DateTime, Utc};
use serde::Serialize;
use trippilot_core::{
    Airport, AirportsFile, CandidateEstimate, DestinationCandidate, EstimateRequest,
    PackageOption, PlanRequest, PricingBaselines,
};

use crate::assembler::{AssemblerConfig, AssemblyRequest, OptionPools, PackageAssembler};
use crate::deeplinks::LinkBuilder;
use crate::error::PlannerError;
use crate::estimator::{EstimateProvider, FallbackEstimator};
use crate::fx::CurrencyConverter;
use crate::materialize::materialize_options;
use crate::ranker::{CandidateRanker, DEFAULT_MAX_CANDIDATES};

/// Everything one pipeline run produced for a plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanOutcome {
    /// Candidates exactly as the ranker produced them.
    pub ranked: Vec<DestinationCandidate>,
    /// The same candidates with estimate metadata folded in.
    pub candidates: Vec<DestinationCandidate>,
    pub options: OptionPools,
    /// Empty when no candidate had both a flight and a hotel.
    pub packages: Vec<PackageOption>,
}

/// Runs ranking, estimation, option materialization and assembly for one plan.
pub struct PlanPipeline<'a> {
    airports: &'a AirportsFile,
    baselines: &'a PricingBaselines,
    provider: &'a dyn EstimateProvider,
    converter: &'a dyn CurrencyConverter,
    links: LinkBuilder,
    max_candidates: usize,
    assembler: AssemblerConfig,
}

impl<'a> PlanPipeline<'a> {
    #[must_use]
    pub fn new(
        airports: &'a AirportsFile,
        baselines: &'a PricingBaselines,
        provider: &'a dyn EstimateProvider,
        converter: &'a dyn CurrencyConverter,
    ) -> Self {
        Self {
            airports,
            baselines,
            provider,
            converter,
            links: LinkBuilder::default(),
            max_candidates: DEFAULT_MAX_CANDIDATES,
            assembler: AssemblerConfig::default(),
        }
    }

    #[must_use]
    pub fn with_links(mut self, links: LinkBuilder) -> Self {
        self.links = links;
        self
    }

    #[must_use]
    pub fn with_max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = max_candidates;
        self
    }

    #[must_use]
    pub fn with_assembler_config(mut self, config: AssemblerConfig) -> Self {
        self.assembler = config;
        self
    }

    /// Run the full pipeline for one plan.
    ///
    /// 1. Rank destination candidates.
    /// 2. Estimate each candidate with the configured provider. Provider
    ///    failures are logged and replaced by the offline baseline.
    /// 3. Fold the estimate into candidate metadata.
    /// 4. Materialize one flight and one hotel option per candidate.
    /// 5. Assemble, sort, dedupe and rank the packages.
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError`] if the plan is invalid or assembly receives
    /// option rows from another plan.
    pub fn run(&self, plan: &PlanRequest, now: DateTime<Utc>) -> Result<PlanOutcome, PlannerError> {
        let ranker = CandidateRanker::new(self.airports, self.baselines)
            .with_max_candidates(self.max_candidates);
        let ranked = ranker.rank(plan, now)?;
        let mut candidates = ranked.clone();

        let origin = self.airports.get(&plan.origin_iata());
        let fallback = FallbackEstimator::new(self.baselines).at(now);
        let mut options = OptionPools::default();

        for candidate in &mut candidates {
            let request = estimate_request(plan, origin, candidate);
            let estimate = self.estimate(&fallback, &request, plan);
            candidate.metadata.apply_estimate(&estimate);

            let materialized =
                materialize_options(plan, candidate, &estimate, self.baselines, &self.links);
            options.flights.push(materialized.flight);
            options.hotels.push(materialized.hotel);
        }

        let packages = self.assemble(plan, &candidates, &options, now)?;
        if packages.is_empty() {
            tracing::info!(plan_id = %plan.id, candidates = candidates.len(), "plan produced no packages");
        }

        Ok(PlanOutcome {
            ranked,
            candidates,
            options,
            packages,
        })
    }

    /// Rebuild packages from stored candidates and option rows.
    ///
    /// Nothing is ranked or estimated; the option pools are taken as they
    /// are, so tours and extra flights or hotels fed in by other sources take
    /// part in bundling and the Cartesian product.
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError`] if the plan no longer validates or an option
    /// row belongs to another plan.
    pub fn rescore(
        &self,
        plan: &PlanRequest,
        candidates: &[DestinationCandidate],
        pools: &OptionPools,
        now: DateTime<Utc>,
    ) -> Result<Vec<PackageOption>, PlannerError> {
        plan.validate()?;
        tracing::debug!(
            plan_id = %plan.id,
            candidates = candidates.len(),
            flights = pools.flights.len(),
            hotels = pools.hotels.len(),
            tours = pools.tours.len(),
            "rescoring stored options"
        );
        self.assemble(plan, candidates, pools, now)
    }

    fn assemble(
        &self,
        plan: &PlanRequest,
        candidates: &[DestinationCandidate],
        pools: &OptionPools,
        now: DateTime<Utc>,
    ) -> Result<Vec<PackageOption>, PlannerError> {
        let origin = self.airports.get(&plan.origin_iata());
        let assembler = PackageAssembler::new(self.converter, self.links.clone(), self.assembler);
        assembler.assemble(
            &AssemblyRequest {
                plan,
                origin_timezone: origin.map_or("", |a| a.timezone.as_str()),
                candidates,
                pools,
            },
            now,
        )
    }

    fn estimate(
        &self,
        fallback: &FallbackEstimator<'_>,
        request: &EstimateRequest,
        plan: &PlanRequest,
    ) -> CandidateEstimate {
        match self.provider.estimate(request) {
            Ok(estimate) => estimate,
            Err(e) => {
                tracing::warn!(
                    plan_id = %plan.id,
                    candidate = %request.destination_code,
                    provider = self.provider.name(),
                    error = %e,
                    "estimate provider failed, using baseline"
                );
                fallback.estimate_baseline(request)
            }
        }
    }
}

fn estimate_request(
    plan: &PlanRequest,
    origin: Option<&Airport>,
    candidate: &DestinationCandidate,
) -> EstimateRequest {
    EstimateRequest {
        origin_code: plan.origin_iata(),
        destination_code: candidate.airport_code.clone(),
        destination_city: candidate.city_name.clone(),
        destination_country: candidate.country_code.clone(),
        depart_date: plan.depart_date,
        return_date: Some(plan.resolved_return_date()),
        travelers: plan.total_travelers(),
        tier: candidate.metadata.tier.unwrap_or_default(),
        tags: candidate.metadata.tags.clone(),
        origin_coords: origin.and_then(Airport::coordinates),
        destination_coords: candidate.coordinates,
        nonstop_likelihood: candidate.metadata.nonstop_likelihood,
        preferred_currency: Some(plan.currency()),
    }
}
