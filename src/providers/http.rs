use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, error};
use reqwest::{Client, Response, StatusCode, header};
use serde::Deserialize;

use crate::cue::SubtitleFormat;
use crate::errors::ProviderError;
use crate::providers::{MatchType, SearchRequest, SearchResult, SubtitleProvider};

/// Client for a JSON subtitle search service
///
/// Endpoints: `GET {base}/search`, `GET <download_url>`, `GET {base}/health`.
#[derive(Debug, Clone)]
pub struct HttpSubtitleProvider {
    /// Provider identifier used in results and errors
    id: String,
    /// Base URL of the service, without trailing slash
    base_url: String,
    /// HTTP client for API requests
    client: Client,
}

/// Search hit as returned on the wire
#[derive(Debug, Deserialize)]
pub struct ApiSubtitle {
    pub id: String,
    pub language: String,
    #[serde(default)]
    pub language_name: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    pub download_url: String,
    pub file_name: String,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub download_count: Option<u64>,
    #[serde(default)]
    pub rating: Option<f32>,
    pub match_score: f32,
    pub match_type: MatchType,
    #[serde(default)]
    pub upload_date: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub hearing_impaired: Option<bool>,
    #[serde(default)]
    pub release_group: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

impl ApiSubtitle {
    /// Attach the provider id and normalise fields
    pub fn into_result(self, provider: &str) -> SearchResult {
        let format = self
            .format
            .as_deref()
            .and_then(SubtitleFormat::from_extension)
            .or_else(|| SubtitleFormat::from_url(&self.file_name))
            .unwrap_or(SubtitleFormat::Srt);

        SearchResult {
            id: self.id,
            provider: provider.to_string(),
            language: self.language,
            language_name: self.language_name,
            format,
            download_url: self.download_url,
            file_name: self.file_name,
            size: self.file_size,
            download_count: self.download_count,
            rating: self.rating,
            match_score: if self.match_score.is_finite() { self.match_score.clamp(0.0, 1.0) } else { 0.0 },
            match_type: self.match_type,
            is_verified: self.is_verified,
            hearing_impaired: self.hearing_impaired.unwrap_or(false),
            upload_date: self.upload_date,
            uploader: self.uploader,
            release_group: self.release_group,
            version: self.version,
        }
    }
}

impl HttpSubtitleProvider {
    /// Create a new provider client
    pub fn new(id: impl Into<String>, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            id: id.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_transport_error(&self, error: reqwest::Error) -> ProviderError {
        if error.is_timeout() {
            ProviderError::Timeout { provider: self.id.clone() }
        } else {
            ProviderError::Network {
                provider: self.id.clone(),
                message: error.to_string(),
            }
        }
    }

    /// Turn non-success statuses into typed errors
    async fn check_status(&self, response: Response) -> Result<Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            return Err(ProviderError::RateLimited {
                provider: self.id.clone(),
                retry_after_secs,
            });
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to get error response text".to_string());
        error!("{} API error ({}): {}", self.id, status, truncate(&error_text, 200));
        Err(ProviderError::Http {
            provider: self.id.clone(),
            status_code: status.as_u16(),
            message: truncate(&error_text, 200),
        })
    }
}

#[async_trait]
impl SubtitleProvider for HttpSubtitleProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>, ProviderError> {
        let url = format!("{}/search", self.base_url);
        debug!("Searching {} for '{}'", self.id, request.title);

        let response = self
            .client
            .get(&url)
            .query(&request.query_params())
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        let response = self.check_status(response).await?;

        let items = response
            .json::<Vec<ApiSubtitle>>()
            .await
            .map_err(|e| ProviderError::InvalidResponse {
                provider: self.id.clone(),
                message: e.to_string(),
            })?;

        Ok(items.into_iter().map(|item| item.into_result(&self.id)).collect())
    }

    async fn download(&self, result: &SearchResult) -> Result<Bytes, ProviderError> {
        let response = self
            .client
            .get(&result.download_url)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        let response = self.check_status(response).await?;
        response.bytes().await.map_err(|e| self.map_transport_error(e))
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        self.check_status(response).await.map(|_| ())
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
