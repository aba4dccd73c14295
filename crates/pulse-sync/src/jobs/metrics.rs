//! Database to Airtable metrics sync.
//!
//! All source pages are folded into the accumulator first; resolution and
//! batching run once the source is exhausted, so each participant is
//! enqueued exactly once with their complete totals. Enqueuing mid-run
//! would race the batcher's newest-wins rule against later pages that
//! still add hours under an older heartbeat timestamp.

use std::collections::HashSet;

use pulse_airtable::{AirtableClient, UpdateRecord};
use pulse_core::AppConfig;
use pulse_db::{fetch_heartbeat_page, DbError, HeartbeatRow};
use sqlx::PgPool;

use crate::aggregate::{MetricAccumulator, ParticipantMetric};
use crate::batch::{PendingUpdate, UpdateBatcher};
use crate::context::RunSummary;
use crate::fields::metric_fields;
use crate::resolve::resolve_batch;
use crate::SyncError;

/// Paged read access to the heartbeat source.
///
/// The single production implementation is [`PgPool`]; the indirection lets
/// job tests drive the pipeline from fixed in-memory pages.
#[allow(async_fn_in_trait)]
pub trait HeartbeatSource {
    async fn fetch_page(&self, limit: i64, offset: i64) -> Result<Vec<HeartbeatRow>, DbError>;
}

impl HeartbeatSource for PgPool {
    async fn fetch_page(&self, limit: i64, offset: i64) -> Result<Vec<HeartbeatRow>, DbError> {
        fetch_heartbeat_page(self, limit, offset).await
    }
}

/// Runs the metrics sync end to end.
///
/// Source read failures and client construction problems are fatal. Lookup
/// failures, resolution misses, and failed write batches are tallied and
/// the run continues.
///
/// # Errors
///
/// Returns [`SyncError::Db`] if a source page read fails.
pub async fn run_metrics_sync<S: HeartbeatSource>(
    source: &S,
    config: &AppConfig,
    airtable: &AirtableClient,
) -> Result<RunSummary, SyncError> {
    let mut summary = RunSummary::default();
    let mut accumulator = MetricAccumulator::default();

    let page_size = i64::try_from(config.source_page_size).unwrap_or(i64::MAX);
    let mut offset = 0i64;

    // Participants in first-observed order, deduplicated across pages.
    let mut participant_order: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    loop {
        let rows = source.fetch_page(page_size, offset).await?;
        if rows.is_empty() {
            break;
        }
        let page_len = rows.len();
        summary.pages_fetched += 1;
        summary.add_records_read(page_len as u64);
        tracing::debug!(offset, rows = page_len, "fetched heartbeat page");

        for row in &rows {
            match accumulator.observe(row) {
                Some(key) => {
                    if seen.insert(key.clone()) {
                        participant_order.push(key);
                    }
                }
                None => summary.records_skipped += 1,
            }
        }

        if page_len < config.source_page_size {
            break;
        }
        offset += page_len as i64;
    }

    // The source is exhausted: every metric now carries its final totals,
    // so each participant resolves and enqueues exactly once.
    let mut batcher = UpdateBatcher::new(config.update_batch_size);
    for chunk in participant_order.chunks(config.lookup_batch_size) {
        resolve_and_enqueue(
            airtable,
            config,
            &accumulator,
            chunk,
            &mut batcher,
            &mut summary,
        )
        .await;
    }

    let remaining = batcher.take_remaining();
    if !remaining.is_empty() {
        flush_batch(airtable, config, &remaining, &mut summary).await;
    }

    summary.metrics_emitted = accumulator.len() as u64;
    summary.duplicate_identities_dropped = accumulator.duplicate_identities_dropped() as u64;
    summary.log("metrics");
    Ok(summary)
}

/// Looks up one chunk of identities and enqueues the resolved updates,
/// flushing whenever the batcher fills.
///
/// A failed lookup only loses resolution for this chunk: its metrics are
/// counted as misses and the run moves on.
async fn resolve_and_enqueue(
    airtable: &AirtableClient,
    config: &AppConfig,
    accumulator: &MetricAccumulator,
    chunk: &[String],
    batcher: &mut UpdateBatcher,
    summary: &mut RunSummary,
) {
    let metrics: Vec<&ParticipantMetric> =
        chunk.iter().filter_map(|key| accumulator.get(key)).collect();
    if metrics.is_empty() {
        return;
    }

    let slack_ids: Vec<&str> = metrics.iter().map(|m| m.user_id.as_str()).collect();
    let emails: Vec<&str> = metrics.iter().map(|m| m.email.as_str()).collect();

    let records = match airtable
        .lookup_participants(
            &config.airtable_base_id,
            &config.airtable_participants_table,
            &slack_ids,
            &emails,
        )
        .await
    {
        Ok(records) => records,
        Err(error) => {
            tracing::warn!(
                identities = metrics.len(),
                %error,
                "lookup batch failed, counting its metrics as resolution misses"
            );
            summary.add_resolution_misses(metrics.len() as u64);
            return;
        }
    };

    let outcome = resolve_batch(&metrics, &records);
    summary.add_resolution_misses(outcome.misses as u64);

    for resolved in outcome.resolved {
        let pending = PendingUpdate {
            record_id: resolved.record_id,
            fields: metric_fields(&resolved.metric),
            last_heartbeat_at: resolved.metric.last_heartbeat_at,
        };
        if let Some(batch) = batcher.insert(pending) {
            flush_batch(airtable, config, &batch, summary).await;
        }
    }
}

/// Writes one batch. A failed call means the whole batch is treated as not
/// applied; the batcher has already cleared it either way.
async fn flush_batch(
    airtable: &AirtableClient,
    config: &AppConfig,
    batch: &[PendingUpdate],
    summary: &mut RunSummary,
) {
    let records: Vec<UpdateRecord> = batch
        .iter()
        .map(|pending| UpdateRecord {
            id: pending.record_id.clone(),
            fields: pending.fields.clone(),
        })
        .collect();

    match airtable
        .update_records(
            &config.airtable_base_id,
            &config.airtable_participants_table,
            &records,
        )
        .await
    {
        Ok(()) => {
            summary.batches_flushed += 1;
            summary.add_records_written(records.len() as u64);
            tracing::info!(records = records.len(), "flushed update batch");
        }
        Err(error) => {
            summary.batches_failed += 1;
            tracing::warn!(
                records = records.len(),
                %error,
                "update batch failed, treating all of its records as unwritten"
            );
        }
    }
}
