//! Run-level tallies shared by the sync jobs.

/// Counters accumulated over a single job run.
///
/// The bulk `add_*` helpers saturate so a pathological run degrades to
/// pegged counters instead of a panic; per-item counters increment
/// directly.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub pages_fetched: u64,
    pub records_read: u64,
    pub records_skipped: u64,
    pub metrics_emitted: u64,
    pub resolution_misses: u64,
    pub duplicate_identities_dropped: u64,
    pub batches_flushed: u64,
    pub batches_failed: u64,
    pub records_written: u64,
    pub records_failed: u64,
}

impl RunSummary {
    /// A run succeeds only when every attempted write landed.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.batches_failed == 0 && self.records_failed == 0
    }

    pub fn add_records_read(&mut self, n: u64) {
        self.records_read = self.records_read.saturating_add(n);
    }

    pub fn add_records_written(&mut self, n: u64) {
        self.records_written = self.records_written.saturating_add(n);
    }

    pub fn add_resolution_misses(&mut self, n: u64) {
        self.resolution_misses = self.resolution_misses.saturating_add(n);
    }

    /// Emits the end-of-run summary line.
    pub fn log(&self, job: &str) {
        tracing::info!(
            job,
            pages_fetched = self.pages_fetched,
            records_read = self.records_read,
            records_skipped = self.records_skipped,
            metrics_emitted = self.metrics_emitted,
            resolution_misses = self.resolution_misses,
            duplicate_identities_dropped = self.duplicate_identities_dropped,
            batches_flushed = self.batches_flushed,
            batches_failed = self.batches_failed,
            records_written = self.records_written,
            records_failed = self.records_failed,
            succeeded = self.succeeded(),
            "sync run complete"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_summary_counts_as_success() {
        assert!(RunSummary::default().succeeded());
    }

    #[test]
    fn any_failed_batch_fails_the_run() {
        let summary = RunSummary {
            batches_flushed: 3,
            batches_failed: 1,
            records_written: 30,
            ..RunSummary::default()
        };
        assert!(!summary.succeeded());
    }

    #[test]
    fn any_failed_record_fails_the_run() {
        let summary = RunSummary {
            records_written: 9,
            records_failed: 1,
            ..RunSummary::default()
        };
        assert!(!summary.succeeded());
    }
}
