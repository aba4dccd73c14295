use thiserror::Error;

/// Errors returned by the Airtable client.
#[derive(Debug, Error)]
pub enum AirtableError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP 429 from Airtable.
    #[error("Airtable rate limit hit")]
    RateLimited,

    /// Any other non-2xx response.
    #[error("unexpected Airtable status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The configured base URL is not parseable.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// More records passed to a bulk write than Airtable accepts per call.
    #[error("bulk write of {0} records exceeds the {max} record limit", max = crate::MAX_RECORDS_PER_WRITE)]
    BatchTooLarge(usize),
}
