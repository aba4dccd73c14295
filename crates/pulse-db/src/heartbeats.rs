//! Paged reads against the `heartbeats` source table.
//!
//! The source store is read-only for these jobs: rows are fetched once per
//! sync run, aggregated in memory, and never written back.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// One usage row from the source database.
///
/// `user_id` is the Slack-style source identity; `email` is the natural key
/// used to merge records across systems and may be absent or malformed;
/// validation happens in the aggregator, not here.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HeartbeatRow {
    pub user_id: String,
    pub email: Option<String>,
    pub last_heartbeat_at: DateTime<Utc>,
    pub hours: f64,
    pub languages: Option<Vec<String>>,
    pub referral_reason: Option<String>,
}

/// Fetches one page of heartbeat rows, ordered by `id` so LIMIT/OFFSET
/// paging is stable across calls within a run.
///
/// A page shorter than `limit` signals the end of the table.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails. Source query failures are
/// fatal for the run: there is no per-row recovery on the read side.
pub async fn fetch_heartbeat_page(
    pool: &PgPool,
    limit: i64,
    offset: i64,
) -> Result<Vec<HeartbeatRow>, DbError> {
    let rows = sqlx::query_as::<_, HeartbeatRow>(
        "SELECT user_id, email, last_heartbeat_at, hours, languages, referral_reason \
         FROM heartbeats \
         ORDER BY id \
         LIMIT $1 OFFSET $2",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
