//! Database operations for `destination_candidates`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use trippilot_core::{CandidateMetadata, Coordinates, DestinationCandidate};
use uuid::Uuid;

use crate::{rank_from_db, rank_to_db, DbError};

/// A row from the `destination_candidates` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CandidateRow {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub airport_code: String,
    pub city_name: String,
    pub country_code: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timezone: String,
    pub rank: i32,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CandidateRow {
    /// Rebuild the domain candidate.
    ///
    /// Metadata is decoded leniently: malformed provider values inside the bag
    /// become `None` rather than failing the row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Decode`] when `metadata` is not a JSON object.
    pub fn into_candidate(self) -> Result<DestinationCandidate, DbError> {
        let metadata: CandidateMetadata =
            serde_json::from_value(self.metadata).map_err(|source| DbError::Decode {
                what: "candidate metadata",
                source,
            })?;
        let coordinates = match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Coordinates::new(lat, lon),
            _ => None,
        };
        Ok(DestinationCandidate {
            id: self.id,
            plan_id: self.plan_id,
            airport_code: self.airport_code.trim().to_string(),
            city_name: self.city_name,
            country_code: self.country_code.trim().to_string(),
            coordinates,
            timezone: self.timezone,
            rank: rank_from_db(self.rank),
            metadata,
        })
    }
}

fn encode_metadata(metadata: &CandidateMetadata) -> Result<serde_json::Value, DbError> {
    serde_json::to_value(metadata).map_err(|source| DbError::Encode {
        what: "candidate metadata",
        source,
    })
}

/// Replace every candidate of a plan.
///
/// Deletes the plan's existing candidates (cascading to their options and
/// packages) and inserts `candidates` in one transaction. Returns the number
/// of rows inserted.
///
/// # Errors
///
/// Returns [`DbError::PlanMismatch`] if a candidate belongs to another plan,
/// or [`DbError::Sqlx`] if any statement fails; nothing is written then.
pub async fn replace_plan_candidates(
    pool: &PgPool,
    plan_id: Uuid,
    candidates: &[DestinationCandidate],
) -> Result<usize, DbError> {
    if let Some(stray) = candidates.iter().find(|c| c.plan_id != plan_id) {
        return Err(DbError::PlanMismatch {
            what: "candidate",
            expected: plan_id,
            found: stray.plan_id,
        });
    }

    let mut tx = pool.begin().await?;

    let deleted = sqlx::query("DELETE FROM destination_candidates WHERE plan_id = $1")
        .bind(plan_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    for candidate in candidates {
        let metadata = encode_metadata(&candidate.metadata)?;
        sqlx::query(
            "INSERT INTO destination_candidates \
                 (id, plan_id, airport_code, city_name, country_code, \
                  latitude, longitude, timezone, rank, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10::jsonb)",
        )
        .bind(candidate.id)
        .bind(plan_id)
        .bind(&candidate.airport_code)
        .bind(&candidate.city_name)
        .bind(&candidate.country_code)
        .bind(candidate.coordinates.map(|c| c.latitude))
        .bind(candidate.coordinates.map(|c| c.longitude))
        .bind(&candidate.timezone)
        .bind(rank_to_db(candidate.rank))
        .bind(metadata)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::debug!(
        plan_id = %plan_id,
        deleted,
        inserted = candidates.len(),
        "plan candidates replaced"
    );
    Ok(candidates.len())
}

/// Candidates of a plan, ordered by rank.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::Decode`] if a
/// stored metadata bag cannot be read.
pub async fn list_plan_candidates(
    pool: &PgPool,
    plan_id: Uuid,
) -> Result<Vec<DestinationCandidate>, DbError> {
    let rows = sqlx::query_as::<_, CandidateRow>(
        "SELECT id, plan_id, airport_code, city_name, country_code, latitude, longitude, \
                timezone, rank, metadata, created_at, updated_at \
         FROM destination_candidates \
         WHERE plan_id = $1 \
         ORDER BY rank",
    )
    .bind(plan_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(CandidateRow::into_candidate).collect()
}

/// Merge `update` into a stored candidate's metadata.
///
/// Fields set in `update` win; everything else already stored is kept. The
/// row is locked for the read-modify-write. Returns the merged metadata.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the candidate does not exist, or
/// [`DbError::Sqlx`] / [`DbError::Decode`] on query or decoding failure.
pub async fn merge_candidate_metadata(
    pool: &PgPool,
    candidate_id: Uuid,
    update: CandidateMetadata,
) -> Result<CandidateMetadata, DbError> {
    let mut tx = pool.begin().await?;

    let stored: Option<serde_json::Value> = sqlx::query_scalar(
        "SELECT metadata FROM destination_candidates WHERE id = $1 FOR UPDATE",
    )
    .bind(candidate_id)
    .fetch_optional(&mut *tx)
    .await?;
    let stored = stored.ok_or(DbError::NotFound)?;

    let mut metadata: CandidateMetadata =
        serde_json::from_value(stored).map_err(|source| DbError::Decode {
            what: "candidate metadata",
            source,
        })?;
    metadata.merge(update);

    sqlx::query(
        "UPDATE destination_candidates \
         SET metadata = $2::jsonb, updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(candidate_id)
    .bind(encode_metadata(&metadata)?)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(metadata)
}
