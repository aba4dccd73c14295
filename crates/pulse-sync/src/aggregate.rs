//! Reduce-by-key aggregation of heartbeat rows into per-participant metrics.
//!
//! The merge is an explicit comparator-driven fold into a map keyed by
//! normalized email, so the merge rules are unit-testable in isolation:
//! sums accumulate additively, first-wins fields never change once set,
//! most-recent-wins fields follow the latest timestamp with ties keeping
//! the first-observed record.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use pulse_db::HeartbeatRow;

/// Rounds to one decimal place. Applied after every accumulation step so
/// floating-point drift cannot build up across many rows; rounding an
/// already-rounded value is a no-op.
#[must_use]
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Normalizes and validates a natural key.
///
/// Returns the trimmed, lowercased email, or `None` if the value is empty,
/// contains whitespace, has anything other than exactly one `@`, or lacks a
/// dotted domain.
#[must_use]
pub fn normalize_email(raw: &str) -> Option<String> {
    let email = raw.trim().to_ascii_lowercase();
    if email.is_empty() || email.contains(char::is_whitespace) {
        return None;
    }
    let (local, domain) = email.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') || !domain.contains('.') {
        return None;
    }
    Some(email)
}

/// Accumulated metrics for one participant, keyed by normalized email.
#[derive(Debug, Clone)]
pub struct ParticipantMetric {
    pub email: String,
    /// Source identity of the most recent record seen for this email. When
    /// several identities share the email, only this one may produce a
    /// destination update.
    pub user_id: String,
    pub total_hours: f64,
    pub last_heartbeat_at: DateTime<Utc>,
    pub referral_reason: Option<String>,
    pub languages: Vec<String>,
    /// Every distinct source identity observed for this email, in
    /// first-observed order.
    pub identities: Vec<String>,
}

/// Folds heartbeat rows into per-email metrics across one or more source
/// pages. Rows without a valid natural key are dropped with a diagnostic.
#[derive(Debug, Default)]
pub struct MetricAccumulator {
    by_email: HashMap<String, ParticipantMetric>,
}

impl MetricAccumulator {
    /// Merges one row into the accumulator.
    ///
    /// Returns the normalized email the row was folded into, or `None` if
    /// the row was dropped for a missing or invalid email.
    pub fn observe(&mut self, row: &HeartbeatRow) -> Option<String> {
        let raw = row.email.as_deref().unwrap_or_default();
        let Some(key) = normalize_email(raw) else {
            tracing::warn!(
                user_id = %row.user_id,
                email = raw,
                "dropping source row with missing or invalid email"
            );
            return None;
        };

        match self.by_email.entry(key.clone()) {
            Entry::Occupied(mut existing) => merge_row(existing.get_mut(), row),
            Entry::Vacant(slot) => {
                slot.insert(metric_from_row(key.clone(), row));
            }
        }
        Some(key)
    }

    #[must_use]
    pub fn get(&self, email: &str) -> Option<&ParticipantMetric> {
        self.by_email.get(email)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_email.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_email.is_empty()
    }

    /// Total count of source identities discarded because another identity
    /// with a more recent heartbeat shares their email.
    #[must_use]
    pub fn duplicate_identities_dropped(&self) -> usize {
        self.by_email
            .values()
            .map(|m| m.identities.len().saturating_sub(1))
            .sum()
    }
}

fn metric_from_row(email: String, row: &HeartbeatRow) -> ParticipantMetric {
    ParticipantMetric {
        email,
        user_id: row.user_id.clone(),
        total_hours: round1(row.hours),
        last_heartbeat_at: row.last_heartbeat_at,
        referral_reason: non_empty(row.referral_reason.as_deref()),
        languages: merged_languages(&[], row),
        identities: vec![row.user_id.clone()],
    }
}

fn merge_row(metric: &mut ParticipantMetric, row: &HeartbeatRow) {
    metric.total_hours = round1(metric.total_hours + row.hours);

    if !metric.identities.contains(&row.user_id) {
        metric.identities.push(row.user_id.clone());
    }

    // Strictly-greater comparison: equal timestamps keep the record seen
    // first, so feeding rows in any order converges on the same winner.
    if row.last_heartbeat_at > metric.last_heartbeat_at {
        metric.last_heartbeat_at = row.last_heartbeat_at;
        metric.user_id = row.user_id.clone();
    }

    if metric.referral_reason.is_none() {
        metric.referral_reason = non_empty(row.referral_reason.as_deref());
    }

    metric.languages = merged_languages(&metric.languages, row);
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

fn merged_languages(existing: &[String], row: &HeartbeatRow) -> Vec<String> {
    let mut merged: Vec<String> = existing.to_vec();
    for lang in row.languages.iter().flatten() {
        let lang = lang.trim();
        if lang.is_empty() {
            continue;
        }
        if !merged.iter().any(|l| l == lang) {
            merged.push(lang.to_owned());
        }
    }
    merged
}
