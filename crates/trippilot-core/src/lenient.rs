//! Serde adapters for provider-supplied bags where a bad value should read as
//! "absent" rather than reject the whole record.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

/// Optional float from a number or numeric string; non-finite values become `None`.
///
/// # Errors
///
/// Only fails if the underlying deserializer cannot produce any JSON value.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value_as_f64(raw.as_ref()))
}

/// Optional non-negative integer from a number or numeric string.
///
/// # Errors
///
/// Only fails if the underlying deserializer cannot produce any JSON value.
pub fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value_as_f64(raw.as_ref())
        .filter(|v| *v >= 0.0 && *v <= f64::from(u32::MAX))
        .map(|v| {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let whole = v.round() as u32;
            whole
        }))
}

/// Optional value of any deserializable type (typically a label enum).
///
/// Unknown labels become `None` instead of failing.
///
/// # Errors
///
/// Only fails if the underlying deserializer cannot produce any JSON value.
pub fn lenient_enum<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|v| serde_json::from_value(normalize_label(v)).ok()))
}

/// Optional boolean from a bool, `0`/`1`, or `"true"`/`"false"`.
///
/// # Errors
///
/// Only fails if the underlying deserializer cannot produce any JSON value.
pub fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::Bool(b)) => Some(b),
        Some(serde_json::Value::Number(n)) => n.as_f64().map(|v| v != 0.0),
        Some(serde_json::Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

fn value_as_f64(raw: Option<&serde_json::Value>) -> Option<f64> {
    match raw {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

fn normalize_label(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::String(s) => serde_json::Value::String(s.trim().to_lowercase()),
        other => other,
    }
}
