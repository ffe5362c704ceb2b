//! Destination candidate ranking.
//!
//! Direct plans pass their destination list through; explore plans score
//! every airport in the (optionally country-filtered) pool and keep the top N.

use chrono::{DateTime, Utc};
use trippilot_core::config::MAX_CANDIDATES_LIMIT;
use trippilot_core::geo::{
    distance_km_or, rough_travel_time_minutes, timezone_delta_hours, FALLBACK_DISTANCE_KM,
};
use trippilot_core::{
    Airport, AirportsFile, CandidateMetadata, Coordinates, DestinationCandidate, PlanRequest,
    PricingBaselines, SearchMode,
};
use uuid::Uuid;

use crate::error::PlannerError;

/// Score assigned to destinations that break the duration limit.
pub const REJECTED_SCORE: f64 = -9999.0;

/// Default number of explore-mode candidates.
pub const DEFAULT_MAX_CANDIDATES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateScore {
    pub score: f64,
    pub distance_km: f64,
    pub duration_minutes: u32,
}

impl CandidateScore {
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        self.score < 0.0
    }
}

/// One side of a scored route.
#[derive(Debug, Clone, Copy)]
pub struct Endpoint<'a> {
    pub coords: Option<Coordinates>,
    pub timezone: &'a str,
}

/// Heuristic attractiveness of `destination` from `origin`.
///
/// A `max_duration_minutes` of `Some(0)` means "no limit".
#[must_use]
pub fn candidate_score(
    airport_name: &str,
    origin: Endpoint<'_>,
    destination: Endpoint<'_>,
    max_duration_minutes: Option<u32>,
    now: DateTime<Utc>,
) -> CandidateScore {
    let distance_km = distance_km_or(origin.coords, destination.coords, FALLBACK_DISTANCE_KM);
    let duration_minutes = rough_travel_time_minutes(origin.coords, destination.coords);

    if let Some(limit) = max_duration_minutes.filter(|m| *m > 0) {
        if duration_minutes > limit {
            return CandidateScore {
                score: REJECTED_SCORE,
                distance_km,
                duration_minutes,
            };
        }
    }

    let timezone_delta = timezone_delta_hours(origin.timezone, destination.timezone, now);

    let mut score = 0.0;
    if airport_name.to_lowercase().contains("international") {
        score += 24.0;
    }
    // Medium hauls score highest on purpose.
    score += if distance_km <= 1200.0 {
        16.0
    } else if distance_km <= 3800.0 {
        26.0
    } else if distance_km <= 8500.0 {
        18.0
    } else {
        6.0
    };
    score += if timezone_delta <= 2.0 {
        18.0
    } else if timezone_delta <= 5.0 {
        11.0
    } else {
        4.0
    };
    score += if duration_minutes <= 420 {
        17.0
    } else if duration_minutes <= 720 {
        11.0
    } else {
        5.0
    };

    CandidateScore {
        score,
        distance_km,
        duration_minutes,
    }
}

/// Produces the ranked destination candidates for a plan.
#[derive(Debug, Clone)]
pub struct CandidateRanker<'a> {
    airports: &'a AirportsFile,
    baselines: &'a PricingBaselines,
    max_candidates: usize,
}

impl<'a> CandidateRanker<'a> {
    #[must_use]
    pub fn new(airports: &'a AirportsFile, baselines: &'a PricingBaselines) -> Self {
        Self {
            airports,
            baselines,
            max_candidates: DEFAULT_MAX_CANDIDATES,
        }
    }

    /// Cap on returned candidates, clamped to `1..=20`.
    #[must_use]
    pub fn with_max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = max_candidates.clamp(1, MAX_CANDIDATES_LIMIT);
        self
    }

    /// Rank destinations for `plan`. Ranks are dense and 1-based.
    ///
    /// Direct-mode codes missing from the airport dataset are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError::Core`] when the plan fails validation.
    pub fn rank(
        &self,
        plan: &PlanRequest,
        now: DateTime<Utc>,
    ) -> Result<Vec<DestinationCandidate>, PlannerError> {
        plan.validate()?;

        let origin_code = plan.origin_iata();
        let origin_airport = self.airports.get(&origin_code);
        let origin = Endpoint {
            coords: origin_airport.and_then(Airport::coordinates),
            timezone: origin_airport.map_or("", |a| a.timezone.as_str()),
        };

        let codes = match plan.search_mode {
            SearchMode::Direct => plan
                .direct_destinations()
                .into_iter()
                .filter(|code| *code != origin_code)
                .collect(),
            SearchMode::Explore => self.explore_codes(plan, &origin_code, origin, now),
        };

        let candidates: Vec<DestinationCandidate> = codes
            .iter()
            .filter_map(|code| {
                let airport = self.airports.get(code);
                if airport.is_none() {
                    tracing::debug!(plan_id = %plan.id, candidate = %code, "airport not in dataset, skipping");
                }
                airport
            })
            .take(self.max_candidates)
            .zip(1_u32..)
            .map(|(airport, rank)| self.build_candidate(plan.id, airport, rank, origin, now))
            .collect();

        tracing::info!(
            plan_id = %plan.id,
            mode = ?plan.search_mode,
            count = candidates.len(),
            "destination candidates ranked"
        );
        Ok(candidates)
    }

    fn explore_codes(
        &self,
        plan: &PlanRequest,
        origin_code: &str,
        origin: Endpoint<'_>,
        now: DateTime<Utc>,
    ) -> Vec<String> {
        let country = plan.country_filter();
        let pool: Vec<&Airport> = self
            .airports
            .airports
            .iter()
            .filter(|a| a.iata != origin_code)
            .filter(|a| country.as_deref().map_or(true, |c| a.country_code == c))
            .collect();

        let mut ranked: Vec<(f64, &str)> = pool
            .iter()
            .filter_map(|airport| {
                let coords = airport.coordinates()?;
                let scored = candidate_score(
                    &airport.name,
                    origin,
                    Endpoint {
                        coords: Some(coords),
                        timezone: &airport.timezone,
                    },
                    plan.max_duration_minutes,
                    now,
                );
                (!scored.is_rejected()).then_some((scored.score, airport.iata.as_str()))
            })
            .collect();
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));

        if ranked.is_empty() {
            tracing::info!(
                plan_id = %plan.id,
                pool = pool.len(),
                "no destination passed the heuristic, falling back to alphabetical"
            );
            let mut codes: Vec<String> = pool.iter().map(|a| a.iata.clone()).collect();
            codes.sort();
            codes.truncate(self.max_candidates);
            return codes;
        }

        ranked
            .into_iter()
            .take(self.max_candidates)
            .map(|(_, code)| code.to_string())
            .collect()
    }

    fn build_candidate(
        &self,
        plan_id: Uuid,
        airport: &Airport,
        rank: u32,
        origin: Endpoint<'_>,
        now: DateTime<Utc>,
    ) -> DestinationCandidate {
        let profile = self
            .baselines
            .resolve_profile(&airport.iata, &airport.country_code);
        let coords = airport.coordinates();
        let scored = candidate_score(
            &airport.name,
            origin,
            Endpoint {
                coords,
                timezone: &airport.timezone,
            },
            None,
            now,
        );

        let country_code = match airport.country_code.trim() {
            "" => "XX".to_string(),
            code => code.chars().take(2).collect::<String>().to_ascii_uppercase(),
        };

        DestinationCandidate {
            id: Uuid::new_v4(),
            plan_id,
            airport_code: airport.iata.clone(),
            city_name: airport.city.clone(),
            country_code,
            coordinates: coords,
            timezone: airport.timezone.clone(),
            rank,
            metadata: CandidateMetadata {
                tier: Some(profile.tier),
                tags: profile.tags,
                nonstop_likelihood: Some(profile.nonstop_likelihood),
                airport_name: Some(airport.name.clone()),
                country: Some(airport.country.clone()),
                heuristic_score: Some(round_to(scored.score, 3)),
                distance_km: Some(round_to(scored.distance_km, 2)),
                estimated_duration_minutes: Some(scored.duration_minutes),
                ..CandidateMetadata::default()
            },
        }
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10_f64.powi(places);
    (value * factor).round() / factor
}
