//! Field serialization rules for destination writes.
//!
//! Airtable-side convention: a numeric field that is exactly zero is written
//! as null so "no activity" is distinguishable from "zero hours logged", and
//! list fields collapse to a compact comma-joined string or null when
//! nothing survives filtering.

use serde_json::{json, Map, Value};

use crate::aggregate::{round1, ParticipantMetric};

/// Serializes a numeric field, mapping an exactly-zero rounded value to null.
#[must_use]
pub fn number_or_null(value: f64) -> Value {
    let rounded = round1(value);
    if rounded.abs() < f64::EPSILON {
        Value::Null
    } else {
        json!(rounded)
    }
}

/// Serializes an optional text field, mapping blank values to null.
#[must_use]
pub fn text_or_null(value: Option<&str>) -> Value {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => json!(v),
        _ => Value::Null,
    }
}

/// Serializes a list field to a compact comma-joined string, dropping
/// entries that are blank, the literal "null", or separator characters
/// only. An empty filtered list becomes null, not `""` or `[]`.
#[must_use]
pub fn text_list_or_null(items: &[String]) -> Value {
    let filtered: Vec<&str> = items
        .iter()
        .map(String::as_str)
        .map(str::trim)
        .filter(|item| {
            !item.is_empty() && !item.eq_ignore_ascii_case("null") && !is_separator_only(item)
        })
        .collect();

    if filtered.is_empty() {
        Value::Null
    } else {
        json!(filtered.join(", "))
    }
}

fn is_separator_only(value: &str) -> bool {
    value
        .chars()
        .all(|c| matches!(c, ',' | ';') || c.is_whitespace())
}

/// Builds the Airtable field map for one participant metric.
#[must_use]
pub fn metric_fields(metric: &ParticipantMetric) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("total_hours".to_string(), number_or_null(metric.total_hours));
    fields.insert(
        "last_heartbeat_at".to_string(),
        json!(metric.last_heartbeat_at.to_rfc3339()),
    );
    fields.insert(
        "referral_reason".to_string(),
        text_or_null(metric.referral_reason.as_deref()),
    );
    fields.insert(
        "languages".to_string(),
        text_list_or_null(&metric.languages),
    );
    fields
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn zero_number_serializes_as_null_not_zero() {
        assert_eq!(number_or_null(0.0), Value::Null);
        assert_eq!(number_or_null(0.04), Value::Null, "rounds to 0.0");
        assert_eq!(number_or_null(2.5), json!(2.5));
    }

    #[test]
    fn blank_text_serializes_as_null() {
        assert_eq!(text_or_null(None), Value::Null);
        assert_eq!(text_or_null(Some("   ")), Value::Null);
        assert_eq!(text_or_null(Some(" friend ")), json!("friend"));
    }

    #[test]
    fn list_filters_blank_null_and_separator_entries() {
        let items = vec![
            "Rust".to_string(),
            "  ".to_string(),
            "null".to_string(),
            ",".to_string(),
            " ; ".to_string(),
            "Go".to_string(),
        ];
        assert_eq!(text_list_or_null(&items), json!("Rust, Go"));
    }

    #[test]
    fn fully_filtered_list_serializes_as_null() {
        let items = vec![String::new(), ",,".to_string(), "NULL".to_string()];
        assert_eq!(text_list_or_null(&items), Value::Null);
        assert_eq!(text_list_or_null(&[]), Value::Null);
    }

    #[test]
    fn metric_fields_apply_all_rules() {
        let metric = ParticipantMetric {
            email: "a@example.com".to_string(),
            user_id: "U1".to_string(),
            total_hours: 0.0,
            last_heartbeat_at: Utc.with_ymd_and_hms(2026, 8, 1, 10, 0, 0).unwrap(),
            referral_reason: None,
            languages: vec![],
            identities: vec!["U1".to_string()],
        };

        let fields = metric_fields(&metric);
        assert_eq!(fields["total_hours"], Value::Null);
        assert_eq!(fields["referral_reason"], Value::Null);
        assert_eq!(fields["languages"], Value::Null);
        assert_eq!(fields["last_heartbeat_at"], json!("2026-08-01T10:00:00+00:00"));
    }
}
