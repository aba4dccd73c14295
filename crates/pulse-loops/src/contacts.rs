use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::Serialize;

use crate::error::LoopsError;
use crate::retry::{retry_on_rate_limit, RetryPolicy};

const DEFAULT_BASE_URL: &str = "https://app.loops.so/api/";

/// Denormalized contact attributes pushed to Loops for campaign targeting.
///
/// `None` fields are omitted from the payload entirely, leaving the existing
/// Loops value untouched.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactUpdate {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_heartbeat_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral_reason: Option<String>,
}

/// Client for the Loops contacts API (bearer token auth).
pub struct LoopsClient {
    client: Client,
    api_key: String,
    base_url: Url,
}

impl LoopsClient {
    /// Creates a new client pointed at the production Loops API.
    ///
    /// # Errors
    ///
    /// Returns [`LoopsError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(api_key: &str, timeout_secs: u64) -> Result<Self, LoopsError> {
        Self::with_base_url(api_key, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a new client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`LoopsError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`LoopsError::InvalidBaseUrl`] if
    /// `base_url` is not a valid URL.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, LoopsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("pulse/0.1 (participant-sync)")
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised)
            .map_err(|e| LoopsError::InvalidBaseUrl(format!("'{base_url}': {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url,
        })
    }

    /// Issues a single contact update call without any retry handling.
    ///
    /// # Errors
    ///
    /// - [`LoopsError::RateLimited`] on HTTP 429.
    /// - [`LoopsError::Http`] on network failure.
    /// - [`LoopsError::UnexpectedStatus`] on any other non-2xx response.
    pub async fn update_contact(&self, contact: &ContactUpdate) -> Result<(), LoopsError> {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.extend(["v1", "contacts", "update"]);
        }

        let response = self
            .client
            .put(url)
            .bearer_auth(&self.api_key)
            .json(contact)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(LoopsError::RateLimited);
        }
        let body = response.text().await.unwrap_or_default();
        Err(LoopsError::UnexpectedStatus {
            status: status.as_u16(),
            body,
        })
    }

    /// Updates a contact, retrying rate-limited calls per `policy`.
    ///
    /// # Errors
    ///
    /// Same as [`LoopsClient::update_contact`], except a persistent 429
    /// under a bounded policy becomes [`LoopsError::RetryExhausted`].
    pub async fn update_contact_with_retry(
        &self,
        policy: RetryPolicy,
        contact: &ContactUpdate,
    ) -> Result<(), LoopsError> {
        retry_on_rate_limit(policy, || self.update_contact(contact)).await
    }
}
