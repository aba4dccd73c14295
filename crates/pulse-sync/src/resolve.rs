//! Identity resolution: mapping aggregated metrics to Airtable record ids.
//!
//! A lookup batch (at most 10 identities) maps to a single Airtable call; this
//! module does the local half, indexing the returned records over both
//! identity dimensions and resolving each metric with `slack_id` taking
//! precedence over `email` when both match.

use std::collections::HashMap;

use pulse_airtable::Record;

use crate::aggregate::{normalize_email, ParticipantMetric};

/// One metric paired with the destination record it resolved to.
#[derive(Debug)]
pub struct ResolvedUpdate {
    pub record_id: String,
    pub metric: ParticipantMetric,
}

/// Result of resolving one lookup batch.
#[derive(Debug, Default)]
pub struct ResolutionOutcome {
    pub resolved: Vec<ResolvedUpdate>,
    /// Metrics with no matching destination record on either dimension.
    pub misses: usize,
}

/// Resolves a batch of metrics against the records a lookup call returned.
///
/// A metric whose email was produced by several source identities only ever
/// resolves through the most-recent identity; the others were discarded
/// during aggregation and are logged here for traceability. A metric with
/// no match on either dimension is a resolution miss: counted, skipped,
/// never an error.
#[must_use]
pub fn resolve_batch(metrics: &[&ParticipantMetric], records: &[Record]) -> ResolutionOutcome {
    let mut by_slack: HashMap<&str, &str> = HashMap::new();
    let mut by_email: HashMap<String, &str> = HashMap::new();
    for record in records {
        if let Some(slack_id) = record.field_str("slack_id") {
            by_slack.entry(slack_id).or_insert(record.id.as_str());
        }
        if let Some(email) = record.field_str("email").and_then(normalize_email) {
            by_email.entry(email).or_insert(record.id.as_str());
        }
    }

    let mut outcome = ResolutionOutcome::default();
    for metric in metrics {
        if metric.identities.len() > 1 {
            tracing::debug!(
                email = %metric.email,
                winner = %metric.user_id,
                dropped = metric.identities.len() - 1,
                "multiple source identities share one email, only the most recent proceeds"
            );
        }

        let record_id = by_slack
            .get(metric.user_id.as_str())
            .copied()
            .or_else(|| by_email.get(&metric.email).copied());

        match record_id {
            Some(id) => outcome.resolved.push(ResolvedUpdate {
                record_id: id.to_owned(),
                metric: (*metric).clone(),
            }),
            None => {
                outcome.misses += 1;
                tracing::warn!(
                    email = %metric.email,
                    user_id = %metric.user_id,
                    "no destination record matches either identity, skipping"
                );
            }
        }
    }
    outcome
}
