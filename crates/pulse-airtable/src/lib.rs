//! Airtable REST client for the participant table.
//!
//! Covers exactly the two call shapes the sync jobs need: a filtered record
//! lookup (identity resolution) and a bulk PATCH of up to 10 records (batch
//! flush), plus offset-token paging for full-table reads.

mod client;
mod error;
mod formula;
mod types;

pub use client::AirtableClient;
pub use error::AirtableError;
pub use formula::build_lookup_formula;
pub use types::{ListResponse, Record, UpdateRecord};

/// Airtable rejects bulk PATCH payloads with more than this many records.
pub const MAX_RECORDS_PER_WRITE: usize = 10;
