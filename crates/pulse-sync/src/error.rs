use thiserror::Error;

/// Fatal errors that abort a sync run.
///
/// Everything recoverable (bad emails, resolution misses, failed write
/// batches, individual contact failures) is tallied in
/// [`RunSummary`](crate::RunSummary) instead of surfacing here.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("database error: {0}")]
    Db(#[from] pulse_db::DbError),

    #[error("Airtable error: {0}")]
    Airtable(#[from] pulse_airtable::AirtableError),

    #[error("Loops error: {0}")]
    Loops(#[from] pulse_loops::LoopsError),
}
