use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::Serialize;

use crate::error::AirtableError;
use crate::formula::build_lookup_formula;
use crate::types::{ListResponse, Record, UpdateRecord};

const DEFAULT_BASE_URL: &str = "https://api.airtable.com/";
const LIST_PAGE_SIZE: u32 = 100;

/// Client for the Airtable REST API.
///
/// Use [`AirtableClient::new`] for production or
/// [`AirtableClient::with_base_url`] to point at a mock server in tests.
pub struct AirtableClient {
    client: Client,
    api_key: String,
    base_url: Url,
}

#[derive(Serialize)]
struct BulkUpdateBody<'a> {
    records: &'a [UpdateRecord],
    typecast: bool,
}

impl AirtableClient {
    /// Creates a new client pointed at the production Airtable API.
    ///
    /// # Errors
    ///
    /// Returns [`AirtableError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(api_key: &str, timeout_secs: u64) -> Result<Self, AirtableError> {
        Self::with_base_url(api_key, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a new client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`AirtableError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`AirtableError::InvalidBaseUrl`] if
    /// `base_url` is not a valid URL.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, AirtableError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("pulse/0.1 (participant-sync)")
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised)
            .map_err(|e| AirtableError::InvalidBaseUrl(format!("'{base_url}': {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url,
        })
    }

    /// Looks up participant records whose `slack_id` or `email` matches any
    /// value in the batch. One lookup batch maps to one formula, though
    /// Airtable may still page the response; all pages are drained before
    /// returning.
    ///
    /// # Errors
    ///
    /// - [`AirtableError::RateLimited`] on HTTP 429.
    /// - [`AirtableError::Http`] on network failure.
    /// - [`AirtableError::UnexpectedStatus`] on any other non-2xx response.
    /// - [`AirtableError::Deserialize`] if the response does not match the
    ///   expected shape.
    pub async fn lookup_participants(
        &self,
        base_id: &str,
        table: &str,
        slack_ids: &[&str],
        emails: &[&str],
    ) -> Result<Vec<Record>, AirtableError> {
        let formula = build_lookup_formula(slack_ids, emails);
        let mut records = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let mut url = self.table_url(base_id, table);
            {
                let mut pairs = url.query_pairs_mut();
                pairs.append_pair("filterByFormula", &formula);
                pairs.append_pair("pageSize", &LIST_PAGE_SIZE.to_string());
                if let Some(token) = &offset {
                    pairs.append_pair("offset", token);
                }
            }

            let page: ListResponse = self.get_json(url).await?;
            records.extend(page.records);
            match page.offset {
                Some(token) => offset = Some(token),
                None => break,
            }
        }

        Ok(records)
    }

    /// Fetches one page of records from the table, optionally continuing
    /// from a previous page's offset token.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`AirtableClient::lookup_participants`].
    pub async fn list_records(
        &self,
        base_id: &str,
        table: &str,
        offset: Option<&str>,
    ) -> Result<ListResponse, AirtableError> {
        let mut url = self.table_url(base_id, table);
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("pageSize", &LIST_PAGE_SIZE.to_string());
            if let Some(token) = offset {
                pairs.append_pair("offset", token);
            }
        }

        self.get_json(url).await
    }

    /// Issues one bulk PATCH writing up to 10 records in a single call.
    ///
    /// Airtable does not report which records within a failed call were
    /// applied; callers must treat a failed call as "entire batch not
    /// applied."
    ///
    /// # Errors
    ///
    /// - [`AirtableError::BatchTooLarge`] if more than 10 records are passed.
    /// - [`AirtableError::RateLimited`] on HTTP 429.
    /// - [`AirtableError::Http`] on network failure.
    /// - [`AirtableError::UnexpectedStatus`] on any other non-2xx response.
    pub async fn update_records(
        &self,
        base_id: &str,
        table: &str,
        records: &[UpdateRecord],
    ) -> Result<(), AirtableError> {
        if records.len() > crate::MAX_RECORDS_PER_WRITE {
            return Err(AirtableError::BatchTooLarge(records.len()));
        }

        let url = self.table_url(base_id, table);
        let body = BulkUpdateBody {
            records,
            typecast: true,
        };

        let response = self
            .client
            .patch(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        Self::check_status(response).await?;
        Ok(())
    }

    fn table_url(&self, base_id: &str, table: &str) -> Url {
        let mut url = self.base_url.clone();
        // Both ids come from config, not user input; path_segments_mut only
        // fails on cannot-be-a-base URLs, which with_base_url already rejects.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.extend(["v0", base_id, table]);
        }
        url
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
    ) -> Result<T, AirtableError> {
        let response = self
            .client
            .get(url.clone())
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| AirtableError::Deserialize {
            context: url.to_string(),
            source: e,
        })
    }

    async fn check_status(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, AirtableError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AirtableError::RateLimited);
        }
        let body = response.text().await.unwrap_or_default();
        Err(AirtableError::UnexpectedStatus {
            status: status.as_u16(),
            body,
        })
    }
}
