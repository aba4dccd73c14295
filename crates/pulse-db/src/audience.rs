//! Writes to the `loops_audience` table for the audience export job.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// One contact parsed from the Loops audience CSV export.
#[derive(Debug, Clone)]
pub struct AudienceRow {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub unsubscribed: bool,
}

/// Inserts or updates one audience contact, keyed by email.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_audience_row(pool: &PgPool, row: &AudienceRow) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO loops_audience \
             (email, first_name, last_name, created_at, updated_at, unsubscribed) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (email) DO UPDATE SET \
             first_name   = EXCLUDED.first_name, \
             last_name    = EXCLUDED.last_name, \
             created_at   = EXCLUDED.created_at, \
             updated_at   = EXCLUDED.updated_at, \
             unsubscribed = EXCLUDED.unsubscribed, \
             synced_at    = NOW()",
    )
    .bind(&row.email)
    .bind(&row.first_name)
    .bind(&row.last_name)
    .bind(row.created_at)
    .bind(row.updated_at)
    .bind(row.unsubscribed)
    .execute(pool)
    .await?;

    Ok(())
}
