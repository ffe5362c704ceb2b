//! Database operations for `package_options`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use trippilot_core::PackageOption;
use uuid::Uuid;

use crate::{rank_to_db, DbError};

/// A row from the `package_options` table.
///
/// The flat columns mirror the fields listings sort and filter on; `payload`
/// holds the complete [`PackageOption`].
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PackageRow {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub candidate_id: Uuid,
    pub destination_code: String,
    pub rank: i32,
    pub currency: String,
    pub total_price: Decimal,
    pub amount_minor: i64,
    pub estimated_total_min: Decimal,
    pub estimated_total_max: Decimal,
    pub score: f64,
    pub content_signature: String,
    pub payload: serde_json::Value,
    pub freshness_at: DateTime<Utc>,
    pub last_scored_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl PackageRow {
    /// Decode the stored package.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Decode`] if the payload no longer parses.
    pub fn into_package(self) -> Result<PackageOption, DbError> {
        serde_json::from_value(self.payload).map_err(|source| DbError::Decode {
            what: "package payload",
            source,
        })
    }
}

/// Atomically replace the visible packages of a plan.
///
/// Deletes the plan's existing packages and inserts `packages` in a single
/// transaction, so readers never see a mix of old and new ranks. Returns the
/// number of packages written; an empty slice clears the plan.
///
/// Callers must not rebuild the same plan concurrently.
///
/// # Errors
///
/// Returns [`DbError::PlanMismatch`] if a package belongs to another plan,
/// [`DbError::Encode`] if a package cannot be serialized, or [`DbError::Sqlx`]
/// if any statement fails. Nothing is written on error.
pub async fn replace_plan_packages(
    pool: &PgPool,
    plan_id: Uuid,
    packages: &[PackageOption],
) -> Result<usize, DbError> {
    if let Some(stray) = packages.iter().find(|p| p.plan_id != plan_id) {
        return Err(DbError::PlanMismatch {
            what: "package",
            expected: plan_id,
            found: stray.plan_id,
        });
    }

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM package_options WHERE plan_id = $1")
        .bind(plan_id)
        .execute(&mut *tx)
        .await?;

    for package in packages {
        let payload = serde_json::to_value(package).map_err(|source| DbError::Encode {
            what: "package",
            source,
        })?;
        sqlx::query(
            "INSERT INTO package_options \
                 (id, plan_id, candidate_id, destination_code, rank, currency, total_price, \
                  amount_minor, estimated_total_min, estimated_total_max, score, \
                  content_signature, payload, freshness_at, last_scored_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13::jsonb, $14, $15)",
        )
        .bind(package.id)
        .bind(plan_id)
        .bind(package.candidate_id)
        .bind(&package.destination_code)
        .bind(rank_to_db(package.rank))
        .bind(&package.currency)
        .bind(package.total_price)
        .bind(package.amount_minor)
        .bind(package.estimated_total_min)
        .bind(package.estimated_total_max)
        .bind(package.score)
        .bind(&package.content_signature)
        .bind(payload)
        .bind(package.freshness_at)
        .bind(package.last_scored_at)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::info!(plan_id = %plan_id, packages = packages.len(), "plan packages replaced");
    Ok(packages.len())
}

/// Packages of a plan ordered by rank.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::Decode`] if a
/// stored package cannot be read.
pub async fn list_plan_packages(
    pool: &PgPool,
    plan_id: Uuid,
) -> Result<Vec<PackageOption>, DbError> {
    let rows = sqlx::query_as::<_, PackageRow>(
        "SELECT id, plan_id, candidate_id, destination_code, rank, currency, total_price, \
                amount_minor, estimated_total_min, estimated_total_max, score, \
                content_signature, payload, freshness_at, last_scored_at, created_at \
         FROM package_options \
         WHERE plan_id = $1 \
         ORDER BY rank",
    )
    .bind(plan_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(PackageRow::into_package).collect()
}
