//! Reconciliation core and job orchestration for the participant sync jobs.
//!
//! The pipeline for the database-to-Airtable job is: paged source reads are
//! folded into per-email [`aggregate::ParticipantMetric`]s, resolved to
//! Airtable record ids in lookup batches of 10, accumulated in an
//! [`batch::UpdateBatcher`] that dedupes by record id, and flushed as bulk
//! writes of at most 10 records. Per-record and per-batch failures never
//! abort a run; only source-side failures do.

pub mod aggregate;
pub mod batch;
pub mod context;
pub mod fields;
pub mod jobs;
pub mod resolve;

mod error;

pub use context::RunSummary;
pub use error::SyncError;
