//! Loops audience export via the session-cookie tRPC API.
//!
//! The export flow is asynchronous on the Loops side: create an export job,
//! poll its status until `Complete`, exchange the export id for a presigned
//! S3 URL, then download the CSV from that URL.

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::error::LoopsError;

const DEFAULT_BASE_URL: &str = "https://app.loops.so/api/";

// tRPC wraps every payload in result.data.json.
#[derive(Deserialize)]
struct TrpcEnvelope<T> {
    result: TrpcResult<T>,
}

#[derive(Deserialize)]
struct TrpcResult<T> {
    data: TrpcData<T>,
}

#[derive(Deserialize)]
struct TrpcData<T> {
    json: T,
}

#[derive(Deserialize)]
struct ExportCreated {
    id: Option<String>,
}

#[derive(Deserialize)]
struct ExportStatus {
    status: Option<String>,
}

#[derive(Deserialize)]
struct SignedUrl {
    #[serde(rename = "presignedUrl")]
    presigned_url: Option<String>,
}

/// Client for the Loops audience export API (session cookie auth).
pub struct ExportClient {
    client: Client,
    session_cookie: String,
    base_url: Url,
}

impl ExportClient {
    /// Creates a new client pointed at the production Loops app.
    ///
    /// # Errors
    ///
    /// Returns [`LoopsError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(session_cookie: &str, timeout_secs: u64) -> Result<Self, LoopsError> {
        Self::with_base_url(session_cookie, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a new client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`LoopsError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`LoopsError::InvalidBaseUrl`] if
    /// `base_url` is not a valid URL.
    pub fn with_base_url(
        session_cookie: &str,
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
            session_cookie: session_cookie.to_owned(),
            base_url,
        })
    }

    /// Runs the full export flow and returns the raw CSV bytes.
    ///
    /// Polls the export status every `poll_interval` until Loops reports
    /// `Complete`. There is no poll cap: an export that never completes
    /// blocks the job until the process is killed, matching the manual
    /// "wait for the download link" flow this replaces.
    ///
    /// # Errors
    ///
    /// - [`LoopsError::MissingExportId`] if export creation returns no id.
    /// - [`LoopsError::MissingDownloadUrl`] if URL signing returns no URL.
    /// - [`LoopsError::Http`] / [`LoopsError::UnexpectedStatus`] /
    ///   [`LoopsError::Deserialize`] on transport or shape failures at any
    ///   step. All are fatal for the audience job.
    pub async fn fetch_audience_export(
        &self,
        poll_interval: Duration,
    ) -> Result<Vec<u8>, LoopsError> {
        tracing::info!("requesting Loops export creation");
        let export_id = self.create_export().await?;
        tracing::info!(export_id = %export_id, "Loops export job created, polling until ready");

        loop {
            tokio::time::sleep(poll_interval).await;
            let status = self.export_status(&export_id).await?;
            tracing::info!(status = status.as_deref().unwrap_or("unknown"), "Loops export status");
            if status.as_deref() == Some("Complete") {
                break;
            }
        }

        tracing::info!("export complete, retrieving presigned download URL");
        let download_url = self.sign_download_url(&export_id).await?;
        self.download(&download_url).await
    }

    async fn create_export(&self) -> Result<String, LoopsError> {
        let url = self.trpc_url("lists.exportContacts");
        let body = json!({ "json": { "filter": null, "mailingListId": "" } });

        let created: TrpcEnvelope<ExportCreated> = self.post_json(url, &body).await?;
        created
            .result
            .data
            .json
            .id
            .ok_or(LoopsError::MissingExportId)
    }

    async fn export_status(&self, export_id: &str) -> Result<Option<String>, LoopsError> {
        let mut url = self.trpc_url("audienceDownload.getAudienceDownload");
        let input = json!({ "json": { "id": export_id } }).to_string();
        url.query_pairs_mut().append_pair("input", &input);

        let status: TrpcEnvelope<ExportStatus> = self.get_json(url).await?;
        Ok(status.result.data.json.status)
    }

    async fn sign_download_url(&self, export_id: &str) -> Result<String, LoopsError> {
        let url = self.trpc_url("audienceDownload.signs3Url");
        let body = json!({ "json": { "id": export_id } });

        let signed: TrpcEnvelope<SignedUrl> = self.post_json(url, &body).await?;
        signed
            .result
            .data
            .json
            .presigned_url
            .ok_or(LoopsError::MissingDownloadUrl)
    }

    async fn download(&self, presigned_url: &str) -> Result<Vec<u8>, LoopsError> {
        tracing::info!("downloading Loops CSV export");
        let response = self.client.get(presigned_url).send().await?;
        let response = Self::check_status(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    fn trpc_url(&self, procedure: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.extend(["trpc", procedure]);
        }
        url
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &serde_json::Value,
    ) -> Result<T, LoopsError> {
        let response = self
            .client
            .post(url.clone())
            .header("cookie", &self.session_cookie)
            .json(body)
            .send()
            .await?;
        Self::parse_json(url, response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, LoopsError> {
        let response = self
            .client
            .get(url.clone())
            .header("cookie", &self.session_cookie)
            .send()
            .await?;
        Self::parse_json(url, response).await
    }

    async fn parse_json<T: DeserializeOwned>(
        url: Url,
        response: reqwest::Response,
    ) -> Result<T, LoopsError> {
        let response = Self::check_status(response).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| LoopsError::Deserialize {
            context: url.to_string(),
            source: e,
        })
    }

    async fn check_status(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, LoopsError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
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
}
