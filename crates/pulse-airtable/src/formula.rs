//! `filterByFormula` construction for identity lookups.
//!
//! A lookup batch matches any record whose `{slack_id}` OR `{email}` equals
//! one of the batch values. Batching the lookup into a single formula bounds
//! the number of round trips against Airtable's rate limit.

/// Builds the OR-formula matching any of the given Slack ids or emails.
///
/// Returns `FALSE()` for an empty batch so the caller gets an empty result
/// set rather than an unfiltered table scan.
#[must_use]
pub fn build_lookup_formula(slack_ids: &[&str], emails: &[&str]) -> String {
    let mut clauses: Vec<String> = Vec::with_capacity(slack_ids.len() + emails.len());
    for id in slack_ids {
        clauses.push(format!("{{slack_id}}='{}'", escape_value(id)));
    }
    for email in emails {
        clauses.push(format!("{{email}}='{}'", escape_value(email)));
    }

    match clauses.len() {
        0 => "FALSE()".to_string(),
        1 => clauses.remove(0),
        _ => format!("OR({})", clauses.join(",")),
    }
}

/// Escapes single quotes so user-supplied values cannot break out of the
/// formula's string literal.
fn escape_value(value: &str) -> String {
    value.replace('\'', "\\'")
}
