use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::geo::Coordinates;
use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Airport {
    pub iata: String,
    pub name: String,
    pub city: String,
    pub country: String,
    #[serde(default)]
    pub country_code: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub timezone: String,
}

impl Airport {
    /// Validated coordinates, or `None` when either axis is missing or out of range.
    #[must_use]
    pub fn coordinates(&self) -> Option<Coordinates> {
        Coordinates::new(self.latitude?, self.longitude?)
    }

    /// Human-readable label, e.g. `"CDG - Charles de Gaulle (Paris, France)"`.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!(
            "{} - {} ({}, {})",
            self.iata, self.name, self.city, self.country
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AirportsFile {
    pub airports: Vec<Airport>,
}

impl AirportsFile {
    #[must_use]
    pub fn get(&self, iata: &str) -> Option<&Airport> {
        let code = normalize_iata(iata)?;
        self.airports.iter().find(|a| a.iata == code)
    }
}

/// Trim and upper-case an IATA code, rejecting anything that is not three ASCII letters.
#[must_use]
pub fn normalize_iata(raw: &str) -> Option<String> {
    let code = raw.trim().to_ascii_uppercase();
    (code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase())).then_some(code)
}

/// Load and validate the airport dataset from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_airports(path: &Path) -> Result<AirportsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let mut airports_file: AirportsFile = serde_yaml::from_str(&content)?;

    validate_airports(&mut airports_file)?;

    Ok(airports_file)
}

/// Normalize codes in place and reject malformed or duplicate entries.
fn validate_airports(airports_file: &mut AirportsFile) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for airport in &mut airports_file.airports {
        let Some(code) = normalize_iata(&airport.iata) else {
            return Err(ConfigError::Validation(format!(
                "airport '{}' has invalid IATA code '{}'",
                airport.name, airport.iata
            )));
        };
        if !seen.insert(code.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate airport code: '{code}'"
            )));
        }
        airport.iata = code;
        airport.country_code = airport.country_code.trim().to_ascii_uppercase();

        if airport.latitude.is_some() != airport.longitude.is_some() {
            return Err(ConfigError::Validation(format!(
                "airport '{}' must set both latitude and longitude or neither",
                airport.iata
            )));
        }
    }

    Ok(())
}
