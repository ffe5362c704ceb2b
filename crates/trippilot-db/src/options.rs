//! Database operations for `plan_options` (flight, hotel and tour offers).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use sqlx::{PgPool, Postgres, Transaction};
use trippilot_core::money::{from_minor_units, quantize_money};
use trippilot_core::{FlightOption, HotelOption, OfferCore, TourOption};
use uuid::Uuid;

use crate::DbError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Flight,
    Hotel,
    Tour,
}

impl OptionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OptionKind::Flight => "flight",
            OptionKind::Hotel => "hotel",
            OptionKind::Tour => "tour",
        }
    }
}

impl std::fmt::Display for OptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row from the `plan_options` table. `payload` holds the whole option.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OptionRow {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub candidate_id: Uuid,
    pub kind: String,
    pub provider: String,
    pub currency: String,
    pub total_price: Decimal,
    pub amount_minor: i64,
    pub deeplink_url: String,
    pub link_type: String,
    pub payload: serde_json::Value,
    pub last_checked_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl OptionRow {
    /// Whether the `amount_minor` column agrees with `total_price`.
    #[must_use]
    pub fn minor_units_consistent(&self) -> bool {
        from_minor_units(self.amount_minor) == quantize_money(self.total_price)
    }

    /// Decode the stored option.
    ///
    /// Rows whose minor units drifted from the decimal price are still
    /// decoded, with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Decode`] if the payload does not match `T`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, DbError> {
        if !self.minor_units_consistent() {
            tracing::warn!(
                option_id = %self.id,
                kind = %self.kind,
                total_price = %self.total_price,
                amount_minor = self.amount_minor,
                "option row amount_minor disagrees with total_price"
            );
        }
        serde_json::from_value(self.payload).map_err(|source| DbError::Decode {
            what: "option payload",
            source,
        })
    }
}

async fn insert_option(
    tx: &mut Transaction<'_, Postgres>,
    kind: OptionKind,
    offer: &OfferCore,
    payload: serde_json::Value,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO plan_options \
             (id, plan_id, candidate_id, kind, provider, currency, total_price, \
              amount_minor, deeplink_url, link_type, payload, last_checked_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11::jsonb, $12)",
    )
    .bind(offer.id)
    .bind(offer.plan_id)
    .bind(offer.candidate_id)
    .bind(kind.as_str())
    .bind(&offer.provider)
    .bind(&offer.currency)
    .bind(offer.total_price)
    .bind(offer.amount_minor)
    .bind(&offer.deeplink_url)
    .bind(offer.link_type.as_str())
    .bind(payload)
    .bind(offer.last_checked_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

fn encode<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, DbError> {
    serde_json::to_value(value).map_err(|source| DbError::Encode {
        what: "option",
        source,
    })
}

/// Replace every option row of a plan in one transaction.
///
/// Returns the number of rows inserted.
///
/// # Errors
///
/// Returns [`DbError::PlanMismatch`] if any option belongs to another plan,
/// or [`DbError::Sqlx`] if any statement fails; nothing is written then.
pub async fn replace_plan_options(
    pool: &PgPool,
    plan_id: Uuid,
    flights: &[FlightOption],
    hotels: &[HotelOption],
    tours: &[TourOption],
) -> Result<usize, DbError> {
    let offers = flights
        .iter()
        .map(|f| &f.offer)
        .chain(hotels.iter().map(|h| &h.offer))
        .chain(tours.iter().map(|t| &t.offer));
    for offer in offers {
        if offer.plan_id != plan_id {
            return Err(DbError::PlanMismatch {
                what: "option",
                expected: plan_id,
                found: offer.plan_id,
            });
        }
    }

    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM plan_options WHERE plan_id = $1")
        .bind(plan_id)
        .execute(&mut *tx)
        .await?;

    for flight in flights {
        insert_option(&mut tx, OptionKind::Flight, &flight.offer, encode(flight)?).await?;
    }
    for hotel in hotels {
        insert_option(&mut tx, OptionKind::Hotel, &hotel.offer, encode(hotel)?).await?;
    }
    for tour in tours {
        insert_option(&mut tx, OptionKind::Tour, &tour.offer, encode(tour)?).await?;
    }

    tx.commit().await?;
    Ok(flights.len() + hotels.len() + tours.len())
}

/// Option rows of one kind for a plan, cheapest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_plan_options(
    pool: &PgPool,
    plan_id: Uuid,
    kind: OptionKind,
) -> Result<Vec<OptionRow>, DbError> {
    let rows = sqlx::query_as::<_, OptionRow>(
        "SELECT id, plan_id, candidate_id, kind, provider, currency, total_price, \
                amount_minor, deeplink_url, link_type, payload, last_checked_at, created_at \
         FROM plan_options \
         WHERE plan_id = $1 AND kind = $2 \
         ORDER BY total_price, id",
    )
    .bind(plan_id)
    .bind(kind.as_str())
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Decode a batch of option rows, keeping their order.
///
/// # Errors
///
/// Returns [`DbError::Decode`] for the first row whose payload does not
/// match `T`.
pub fn decode_option_rows<T: DeserializeOwned>(rows: Vec<OptionRow>) -> Result<Vec<T>, DbError> {
    rows.into_iter().map(OptionRow::decode).collect()
}

/// Decoded options of one kind for a plan, cheapest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::Decode`] if a
/// stored payload does not match `T`.
pub async fn load_plan_options<T: DeserializeOwned>(
    pool: &PgPool,
    plan_id: Uuid,
    kind: OptionKind,
) -> Result<Vec<T>, DbError> {
    let rows = list_plan_options(pool, plan_id, kind).await?;
    tracing::debug!(plan_id = %plan_id, kind = %kind, rows = rows.len(), "plan options loaded");
    decode_option_rows(rows)
}
