//! Airtable to Loops contacts sync.
//!
//! Walks every row of the participants table and pushes the denormalized
//! contact attributes to Loops one call at a time, retrying rate limits per
//! the configured policy. One bad contact never aborts the run.

use std::time::Duration;

use pulse_airtable::{AirtableClient, Record};
use pulse_core::AppConfig;
use pulse_loops::{ContactUpdate, LoopsClient, RetryPolicy};

use crate::aggregate::normalize_email;
use crate::context::RunSummary;
use crate::SyncError;

/// Runs the contacts sync end to end.
///
/// Airtable paging failures are fatal; a failed Loops update is tallied in
/// `records_failed` and the run continues.
///
/// # Errors
///
/// Returns [`SyncError::Airtable`] if listing the participants table fails.
pub async fn run_contacts_sync(
    config: &AppConfig,
    airtable: &AirtableClient,
    loops: &LoopsClient,
) -> Result<RunSummary, SyncError> {
    let mut summary = RunSummary::default();
    let policy = RetryPolicy {
        max_attempts: config.loops_retry_max_attempts,
        delay: Duration::from_millis(config.loops_retry_delay_ms),
    };

    let mut offset: Option<String> = None;
    loop {
        let page = airtable
            .list_records(
                &config.airtable_base_id,
                &config.airtable_participants_table,
                offset.as_deref(),
            )
            .await?;
        summary.pages_fetched += 1;
        summary.add_records_read(page.records.len() as u64);

        for record in &page.records {
            let Some(contact) = contact_from_record(record) else {
                summary.records_skipped += 1;
                continue;
            };

            match loops.update_contact_with_retry(policy, &contact).await {
                Ok(()) => summary.add_records_written(1),
                Err(error) => {
                    summary.records_failed += 1;
                    tracing::warn!(
                        email = %contact.email,
                        %error,
                        "Loops contact update failed, continuing with the next contact"
                    );
                }
            }
        }

        match page.offset {
            Some(token) => offset = Some(token),
            None => break,
        }
    }

    summary.log("contacts");
    Ok(summary)
}

/// Builds the Loops payload from a participants-table record.
///
/// Records without a valid email cannot be addressed in Loops and are
/// skipped; every other attribute is optional and omitted when absent.
fn contact_from_record(record: &Record) -> Option<ContactUpdate> {
    let email = record.field_str("email").and_then(normalize_email);
    let Some(email) = email else {
        tracing::warn!(
            record_id = %record.id,
            "skipping participant record with missing or invalid email"
        );
        return None;
    };

    Some(ContactUpdate {
        email,
        first_name: record.field_str("first_name").map(str::to_owned),
        total_hours: record.field_f64("total_hours"),
        last_heartbeat_at: record.field_str("last_heartbeat_at").map(str::to_owned),
        referral_reason: record.field_str("referral_reason").map(str::to_owned),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(fields: serde_json::Value) -> Record {
        serde_json::from_value(json!({ "id": "recTest", "fields": fields }))
            .expect("record should deserialize")
    }

    #[test]
    fn full_record_maps_every_attribute() {
        let contact = contact_from_record(&record(json!({
            "email": "Ada@Example.com",
            "first_name": "Ada",
            "total_hours": 12.5,
            "last_heartbeat_at": "2026-08-01T10:00:00+00:00",
            "referral_reason": "friend",
        })))
        .expect("valid record should map");

        assert_eq!(contact.email, "ada@example.com");
        assert_eq!(contact.first_name.as_deref(), Some("Ada"));
        assert_eq!(contact.total_hours, Some(12.5));
        assert_eq!(
            contact.last_heartbeat_at.as_deref(),
            Some("2026-08-01T10:00:00+00:00")
        );
        assert_eq!(contact.referral_reason.as_deref(), Some("friend"));
    }

    #[test]
    fn missing_or_invalid_email_is_rejected() {
        assert!(contact_from_record(&record(json!({}))).is_none());
        assert!(contact_from_record(&record(json!({ "email": "not-an-email" }))).is_none());
    }

    #[test]
    fn optional_attributes_stay_absent() {
        let contact = contact_from_record(&record(json!({ "email": "a@b.co" })))
            .expect("valid record should map");
        assert!(contact.first_name.is_none());
        assert!(contact.total_hours.is_none());
        assert!(contact.last_heartbeat_at.is_none());
        assert!(contact.referral_reason.is_none());
    }
}
