//! Loops to database audience sync.
//!
//! Drives the asynchronous Loops export flow, parses the downloaded CSV,
//! and upserts each contact into the local audience table keyed by email.

use std::time::Duration;

use chrono::{DateTime, Utc};
use pulse_core::AppConfig;
use pulse_db::{upsert_audience_row, AudienceRow};
use pulse_loops::ExportClient;
use serde::Deserialize;
use sqlx::PgPool;

use crate::aggregate::normalize_email;
use crate::context::RunSummary;
use crate::SyncError;

/// One row of the Loops audience export CSV. Loops emits camelCase headers
/// and serializes every value as text, booleans included.
#[derive(Debug, Deserialize)]
struct CsvContact {
    #[serde(default)]
    email: String,
    #[serde(rename = "firstName", default)]
    first_name: Option<String>,
    #[serde(rename = "lastName", default)]
    last_name: Option<String>,
    #[serde(rename = "createdAt", default)]
    created_at: Option<String>,
    #[serde(rename = "updatedAt", default)]
    updated_at: Option<String>,
    #[serde(default)]
    unsubscribed: Option<String>,
}

/// Runs the audience sync end to end.
///
/// The export flow itself is fatal when it fails; a malformed CSV row or a
/// failed upsert is tallied and the run continues.
///
/// # Errors
///
/// - [`SyncError::Loops`] if the export cannot be created, polled, signed,
///   or downloaded.
pub async fn run_audience_sync(
    pool: &PgPool,
    config: &AppConfig,
    export: &ExportClient,
) -> Result<RunSummary, SyncError> {
    let mut summary = RunSummary::default();

    let poll_interval = Duration::from_secs(config.export_poll_interval_secs);
    let csv_bytes = export.fetch_audience_export(poll_interval).await?;
    tracing::info!(bytes = csv_bytes.len(), "downloaded audience export");

    let rows = parse_audience_csv(&csv_bytes, &mut summary);
    let checkpoint = config.audience_batch_size.max(1);
    for (index, row) in rows.iter().enumerate() {
        match upsert_audience_row(pool, row).await {
            Ok(()) => summary.add_records_written(1),
            Err(error) => {
                summary.records_failed += 1;
                tracing::warn!(
                    email = %row.email,
                    %error,
                    "audience upsert failed, continuing with the next contact"
                );
            }
        }
        if (index + 1) % checkpoint == 0 {
            tracing::info!(upserted = index + 1, total = rows.len(), "audience sync progress");
        }
    }

    summary.log("audience");
    Ok(summary)
}

/// Parses the export CSV into upsert-ready rows.
///
/// Rows that fail to deserialize or carry an invalid email are skipped and
/// tallied in `records_skipped`; the export's timestamps are kept when they
/// parse as RFC 3339 and dropped otherwise.
fn parse_audience_csv(bytes: &[u8], summary: &mut RunSummary) -> Vec<AudienceRow> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);

    let mut rows = Vec::new();
    for result in reader.deserialize::<CsvContact>() {
        summary.add_records_read(1);
        let contact = match result {
            Ok(contact) => contact,
            Err(error) => {
                summary.records_skipped += 1;
                tracing::warn!(%error, "skipping malformed audience CSV row");
                continue;
            }
        };

        let Some(email) = normalize_email(&contact.email) else {
            summary.records_skipped += 1;
            tracing::warn!(email = %contact.email, "skipping audience row with invalid email");
            continue;
        };

        rows.push(AudienceRow {
            email,
            first_name: non_blank(contact.first_name),
            last_name: non_blank(contact.last_name),
            created_at: contact.created_at.as_deref().and_then(parse_timestamp),
            updated_at: contact.updated_at.as_deref().and_then(parse_timestamp),
            unsubscribed: contact
                .unsubscribed
                .as_deref()
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("true")),
        });
    }
    rows
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn parses_well_formed_export() {
        let csv = b"email,firstName,lastName,createdAt,updatedAt,unsubscribed\n\
            Ada@Example.com,Ada,Lovelace,2026-08-01T10:00:00+00:00,2026-08-02T11:00:00+00:00,false\n\
            grace@example.com,Grace,,,,TRUE\n";

        let mut summary = RunSummary::default();
        let rows = parse_audience_csv(csv, &mut summary);

        assert_eq!(rows.len(), 2);
        assert_eq!(summary.records_read, 2);
        assert_eq!(summary.records_skipped, 0);

        assert_eq!(rows[0].email, "ada@example.com");
        assert_eq!(rows[0].first_name.as_deref(), Some("Ada"));
        assert_eq!(
            rows[0].created_at,
            Some(Utc.with_ymd_and_hms(2026, 8, 1, 10, 0, 0).unwrap())
        );
        assert!(!rows[0].unsubscribed);

        assert_eq!(rows[1].last_name, None);
        assert_eq!(rows[1].created_at, None);
        assert!(rows[1].unsubscribed, "unsubscribed parsing ignores case");
    }

    #[test]
    fn invalid_email_rows_are_skipped_and_counted() {
        let csv = b"email,firstName\nnot-an-email,Bad\nok@example.com,Fine\n";

        let mut summary = RunSummary::default();
        let rows = parse_audience_csv(csv, &mut summary);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].email, "ok@example.com");
        assert_eq!(summary.records_skipped, 1);
    }

    #[test]
    fn unparsable_timestamps_are_dropped_not_fatal() {
        let csv = b"email,createdAt\nada@example.com,yesterday\n";

        let mut summary = RunSummary::default();
        let rows = parse_audience_csv(csv, &mut summary);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].created_at, None);
    }
}
