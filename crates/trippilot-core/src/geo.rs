//! Great-circle distance, timezone offsets, and a rough travel-time model.
//!
//! Nothing in here fails: invalid input degrades to documented defaults.

use chrono::{DateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Travel time assumed when either endpoint has no coordinates.
pub const DEFAULT_TRAVEL_TIME_MINUTES: u32 = 360;

/// Distance assumed when either endpoint has no usable coordinates.
pub const FALLBACK_DISTANCE_KM: f64 = 3200.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Build coordinates, rejecting non-finite or out-of-range values.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let coords = Self {
            latitude,
            longitude,
        };
        coords.is_valid().then_some(coords)
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Great-circle distance in kilometers.
///
/// Callers validate coordinates; NaN in gives NaN out.
#[must_use]
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Distance between two optional points, substituting `default_km` when either
/// side is missing or invalid.
#[must_use]
pub fn distance_km_or(
    origin: Option<Coordinates>,
    destination: Option<Coordinates>,
    default_km: f64,
) -> f64 {
    match (origin, destination) {
        (Some(a), Some(b)) if a.is_valid() && b.is_valid() => {
            haversine_km(a.latitude, a.longitude, b.latitude, b.longitude)
        }
        _ => default_km,
    }
}

/// Current UTC offset in hours for an IANA timezone name.
///
/// Returns `0.0` for empty or unknown identifiers.
#[must_use]
pub fn timezone_offset_hours(tz_name: &str) -> f64 {
    timezone_offset_hours_at(tz_name, Utc::now())
}

/// UTC offset in hours for `tz_name` at instant `at`.
#[must_use]
pub fn timezone_offset_hours_at(tz_name: &str, at: DateTime<Utc>) -> f64 {
    let name = tz_name.trim();
    if name.is_empty() {
        return 0.0;
    }
    let Ok(tz) = name.parse::<Tz>() else {
        return 0.0;
    };
    let seconds = tz
        .offset_from_utc_datetime(&at.naive_utc())
        .fix()
        .local_minus_utc();
    f64::from(seconds) / 3600.0
}

/// Absolute difference between two timezone offsets at `at`.
#[must_use]
pub fn timezone_delta_hours(origin_tz: &str, destination_tz: &str, at: DateTime<Utc>) -> f64 {
    (timezone_offset_hours_at(origin_tz, at) - timezone_offset_hours_at(destination_tz, at)).abs()
}

/// Empirical door-to-gate estimate: fixed overhead plus cruise at ~780 km/h.
///
/// Returns [`DEFAULT_TRAVEL_TIME_MINUTES`] when either side is missing.
#[must_use]
pub fn rough_travel_time_minutes(
    origin: Option<Coordinates>,
    destination: Option<Coordinates>,
) -> u32 {
    let (Some(a), Some(b)) = (origin, destination) else {
        return DEFAULT_TRAVEL_TIME_MINUTES;
    };
    if !a.is_valid() || !b.is_valid() {
        return DEFAULT_TRAVEL_TIME_MINUTES;
    }
    let distance = haversine_km(a.latitude, a.longitude, b.latitude, b.longitude);
    let minutes = (80.0 + distance / 780.0 * 60.0).max(90.0);
    // Bounded by half the Earth's circumference, so the cast cannot overflow.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let truncated = minutes as u32;
    truncated
}
