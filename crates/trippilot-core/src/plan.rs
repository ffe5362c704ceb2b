use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::airports::normalize_iata;
use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Plan against an explicit destination list.
    #[default]
    Direct,
    /// Let the ranker pick destinations from the airport pool.
    Explore,
}

/// A traveller's trip request: the input to ranking and package assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub origin_code: String,
    #[serde(default)]
    pub search_mode: SearchMode,
    #[serde(default)]
    pub destination_codes: Vec<String>,
    /// ISO-2 filter for explore mode. `XX` and `**` mean "anywhere".
    #[serde(default)]
    pub destination_country: Option<String>,
    pub depart_date: NaiveDate,
    #[serde(default)]
    pub return_date: Option<NaiveDate>,
    #[serde(default = "default_trip_length_min")]
    pub trip_length_min: u32,
    #[serde(default = "default_trip_length_max")]
    pub trip_length_max: u32,
    pub total_budget: Decimal,
    #[serde(default = "default_adults")]
    pub adults: u32,
    #[serde(default)]
    pub children: u32,
    #[serde(default = "default_currency")]
    pub search_currency: String,
    #[serde(default)]
    pub preference_weights: BTreeMap<String, f64>,
    #[serde(default)]
    pub max_duration_minutes: Option<u32>,
}

/// Longest trip, in nights, a plan may ask for.
pub const MAX_TRIP_NIGHTS: u32 = 365;

fn default_trip_length_min() -> u32 {
    3
}

fn default_trip_length_max() -> u32 {
    7
}

fn default_adults() -> u32 {
    1
}

fn default_currency() -> String {
    "USD".to_string()
}

impl PlanRequest {
    /// Adults plus children, never less than one.
    #[must_use]
    pub fn total_travelers(&self) -> u32 {
        self.adults.saturating_add(self.children).max(1)
    }

    /// `(nights_low, nights_high)` derived from the trip-length bounds.
    #[must_use]
    pub fn nights_range(&self) -> (u32, u32) {
        let low = self.trip_length_min.max(1);
        let high = self.trip_length_max.max(low);
        (low, high)
    }

    /// Return date if given and after departure, else departure plus the mean trip length.
    #[must_use]
    pub fn resolved_return_date(&self) -> NaiveDate {
        match self.return_date {
            Some(ret) if ret > self.depart_date => ret,
            _ => {
                let (low, high) = self.nights_range();
                let average = low + (high - low) / 2;
                self.depart_date
                    .checked_add_signed(Duration::days(i64::from(average)))
                    .or_else(|| {
                        self.depart_date
                            .checked_add_signed(Duration::days(i64::from(low)))
                    })
                    .unwrap_or(self.depart_date)
            }
        }
    }

    /// Nights the hotel is booked for.
    #[must_use]
    pub fn selected_nights(&self) -> u32 {
        let days = (self.resolved_return_date() - self.depart_date).num_days();
        u32::try_from(days).unwrap_or(1).max(1)
    }

    /// Normalized origin code; empty when the stored code is malformed.
    #[must_use]
    pub fn origin_iata(&self) -> String {
        normalize_iata(&self.origin_code).unwrap_or_default()
    }

    /// Upper-cased search currency.
    #[must_use]
    pub fn currency(&self) -> String {
        self.search_currency.trim().to_ascii_uppercase()
    }

    /// Explore-mode country filter, `None` for the wildcard spellings.
    #[must_use]
    pub fn country_filter(&self) -> Option<String> {
        let code = self
            .destination_country
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_ascii_uppercase();
        match code.as_str() {
            "" | "XX" | "**" => None,
            _ => Some(code),
        }
    }

    /// Explicit destinations, normalized and de-duplicated in input order.
    ///
    /// Entries that are not valid IATA codes are dropped.
    #[must_use]
    pub fn direct_destinations(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.destination_codes
            .iter()
            .filter_map(|raw| normalize_iata(raw))
            .filter(|code| seen.insert(code.clone()))
            .collect()
    }

    /// Reject plans that cannot be ranked or priced.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidPlan`] naming the first problem found.
    pub fn validate(&self) -> Result<(), CoreError> {
        let origin = normalize_iata(&self.origin_code).ok_or_else(|| {
            CoreError::InvalidPlan(format!(
                "origin '{}' is not a 3-letter airport code",
                self.origin_code
            ))
        })?;

        let currency = self.currency();
        if currency.len() != 3 || !currency.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(CoreError::InvalidPlan(format!(
                "search currency '{}' is not a 3-letter code",
                self.search_currency
            )));
        }

        if self.total_budget.is_sign_negative() {
            return Err(CoreError::InvalidPlan(
                "total budget must not be negative".to_string(),
            ));
        }

        if self.trip_length_min > self.trip_length_max {
            return Err(CoreError::InvalidPlan(format!(
                "trip_length_min {} exceeds trip_length_max {}",
                self.trip_length_min, self.trip_length_max
            )));
        }

        if self.trip_length_max > MAX_TRIP_NIGHTS {
            return Err(CoreError::InvalidPlan(format!(
                "trip_length_max {} exceeds {MAX_TRIP_NIGHTS} nights",
                self.trip_length_max
            )));
        }

        if let Some(ret) = self.return_date {
            if ret <= self.depart_date {
                return Err(CoreError::InvalidPlan(format!(
                    "return date {ret} must be after depart date {}",
                    self.depart_date
                )));
            }
            if (ret - self.depart_date).num_days() > i64::from(MAX_TRIP_NIGHTS) {
                return Err(CoreError::InvalidPlan(format!(
                    "return date {ret} is more than {MAX_TRIP_NIGHTS} nights after departure"
                )));
            }
        }

        if self.search_mode == SearchMode::Direct {
            let destinations = self.direct_destinations();
            if destinations.is_empty() {
                return Err(CoreError::InvalidPlan(
                    "direct mode requires at least one destination airport".to_string(),
                ));
            }
            if destinations.contains(&origin) {
                return Err(CoreError::InvalidPlan(format!(
                    "destination {origin} is the same as the origin"
                )));
            }
        }

        Ok(())
    }
}
