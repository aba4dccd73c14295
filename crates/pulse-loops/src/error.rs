use thiserror::Error;

/// Errors returned by the Loops clients.
#[derive(Debug, Error)]
pub enum LoopsError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP 429 from Loops. Transparently retried by
    /// [`retry_on_rate_limit`](crate::retry_on_rate_limit).
    #[error("Loops rate limit hit")]
    RateLimited,

    /// Any other non-2xx response.
    #[error("unexpected Loops status {status}: {body}")]
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

    /// A bounded retry policy ran out of attempts on a rate-limited call.
    #[error("rate-limit retries exhausted after {attempts} attempts")]
    RetryExhausted { attempts: u32 },

    /// Export creation succeeded at the HTTP level but no export id came back.
    #[error("could not initiate Loops export: missing export id")]
    MissingExportId,

    /// Export completed but no presigned download URL came back.
    #[error("could not retrieve presigned download URL for Loops export")]
    MissingDownloadUrl,
}
