//! Database operations for `plans`.

use sqlx::PgPool;
use trippilot_core::{PlanRequest, SearchMode};
use uuid::Uuid;

use crate::DbError;

fn search_mode_label(mode: SearchMode) -> &'static str {
    match mode {
        SearchMode::Direct => "direct",
        SearchMode::Explore => "explore",
    }
}

/// Insert or refresh a plan. The full request is kept in `request` so it can
/// be replayed exactly.
///
/// # Errors
///
/// Returns [`DbError::Encode`] if the request cannot be serialized, or
/// [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_plan(pool: &PgPool, plan: &PlanRequest) -> Result<(), DbError> {
    let request = serde_json::to_value(plan).map_err(|source| DbError::Encode {
        what: "plan request",
        source,
    })?;

    sqlx::query(
        "INSERT INTO plans \
             (id, origin_code, search_mode, search_currency, total_budget, \
              depart_date, return_date, request) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8::jsonb) \
         ON CONFLICT (id) DO UPDATE SET \
             origin_code     = EXCLUDED.origin_code, \
             search_mode     = EXCLUDED.search_mode, \
             search_currency = EXCLUDED.search_currency, \
             total_budget    = EXCLUDED.total_budget, \
             depart_date     = EXCLUDED.depart_date, \
             return_date     = EXCLUDED.return_date, \
             request         = EXCLUDED.request, \
             updated_at      = NOW()",
    )
    .bind(plan.id)
    .bind(plan.origin_iata())
    .bind(search_mode_label(plan.search_mode))
    .bind(plan.currency())
    .bind(plan.total_budget)
    .bind(plan.depart_date)
    .bind(plan.return_date)
    .bind(request)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a stored plan request by id.
///
/// # Errors
///
/// Returns [`DbError::Decode`] if the stored request no longer parses, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_plan(pool: &PgPool, plan_id: Uuid) -> Result<Option<PlanRequest>, DbError> {
    let request: Option<serde_json::Value> =
        sqlx::query_scalar("SELECT request FROM plans WHERE id = $1")
            .bind(plan_id)
            .fetch_optional(pool)
            .await?;

    request
        .map(|value| {
            serde_json::from_value(value).map_err(|source| DbError::Decode {
                what: "plan request",
                source,
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_mode_labels_match_schema_check() {
        assert_eq!(search_mode_label(SearchMode::Direct), "direct");
        assert_eq!(search_mode_label(SearchMode::Explore), "explore");
    }
}
