/// Runtime configuration for the sync jobs, loaded from environment variables.
///
/// Secrets are redacted from the `Debug` output so the config can be logged
/// at startup without leaking credentials.
#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub log_level: String,

    pub airtable_api_key: String,
    pub airtable_base_id: String,
    pub airtable_participants_table: String,

    pub loops_api_key: String,
    /// Session cookie for the Loops export API. Only the `sync audience`
    /// job needs it; the other jobs run fine without it.
    pub loops_session_cookie: Option<String>,

    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,

    pub request_timeout_secs: u64,
    /// Rows fetched per LIMIT/OFFSET page from the source database.
    pub source_page_size: usize,
    /// Identities resolved per Airtable lookup call.
    pub lookup_batch_size: usize,
    /// Pending updates held before a bulk write is issued. Airtable caps
    /// bulk PATCH payloads at 10 records, so this must not exceed 10.
    pub update_batch_size: usize,
    /// Audience rows between progress checkpoints during `sync audience`.
    pub audience_batch_size: usize,

    /// `None` retries rate-limited Loops calls indefinitely.
    pub loops_retry_max_attempts: Option<u32>,
    pub loops_retry_delay_ms: u64,
    pub export_poll_interval_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &"[redacted]")
            .field("log_level", &self.log_level)
            .field("airtable_api_key", &"[redacted]")
            .field("airtable_base_id", &self.airtable_base_id)
            .field(
                "airtable_participants_table",
                &self.airtable_participants_table,
            )
            .field("loops_api_key", &"[redacted]")
            .field(
                "loops_session_cookie",
                &self.loops_session_cookie.as_ref().map(|_| "[redacted]"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("source_page_size", &self.source_page_size)
            .field("lookup_batch_size", &self.lookup_batch_size)
            .field("update_batch_size", &self.update_batch_size)
            .field("audience_batch_size", &self.audience_batch_size)
            .field("loops_retry_max_attempts", &self.loops_retry_max_attempts)
            .field("loops_retry_delay_ms", &self.loops_retry_delay_ms)
            .field("export_poll_interval_secs", &self.export_poll_interval_secs)
            .finish()
    }
}
