/*!
 * Mock subtitle providers for testing.
 *
 * This module provides a scripted provider that simulates remote behaviors:
 * - `MockSubtitleProvider::working()` - Always returns its canned results
 * - `MockSubtitleProvider::failing()` - Always answers with a 5xx
 * - `MockSubtitleProvider::rate_limited()` - Always answers with a 429
 * - `MockSubtitleProvider::intermittent()` - Fails every Nth call
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::errors::ProviderError;
use crate::providers::{MatchType, SearchRequest, SearchResult, SubtitleProvider};

/// Subtitle body served by `download` unless overridden
pub const DEFAULT_BODY: &str = "1\n00:00:01,000 --> 00:00:03,000\nHello from the mock\n\n2\n00:00:04,000 --> 00:00:06,000\nSecond line\n";

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Always fails with the given 5xx status
    Failing { status_code: u16 },
    /// Never answers within the deadline
    Timeout,
    /// Always answers 429, optionally with Retry-After
    RateLimited { retry_after_secs: Option<u64> },
    /// Fails with a non-retryable 4xx
    ClientError { status_code: u16 },
    /// Fails every Nth call with a 503
    Intermittent { fail_every: usize },
    /// Succeeds after a delay
    Slow { delay_ms: u64 },
}

/// Mock provider with shared call counters
#[derive(Debug, Clone)]
pub struct MockSubtitleProvider {
    id: String,
    behavior: MockBehavior,
    results: Vec<SearchResult>,
    body: Bytes,
    search_count: Arc<AtomicUsize>,
    download_count: Arc<AtomicUsize>,
    probe_count: Arc<AtomicUsize>,
}

impl MockSubtitleProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(id: impl Into<String>, behavior: MockBehavior) -> Self {
        let id = id.into();
        let results = vec![
            SearchResult::new(&id, format!("{}-1", id), "en", MatchType::TitleMatch, 0.8),
        ];
        Self {
            id,
            behavior,
            results,
            body: Bytes::from_static(DEFAULT_BODY.as_bytes()),
            search_count: Arc::new(AtomicUsize::new(0)),
            download_count: Arc::new(AtomicUsize::new(0)),
            probe_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn working(id: impl Into<String>) -> Self {
        Self::new(id, MockBehavior::Working)
    }

    pub fn failing(id: impl Into<String>) -> Self {
        Self::new(id, MockBehavior::Failing { status_code: 500 })
    }

    pub fn rate_limited(id: impl Into<String>, retry_after_secs: Option<u64>) -> Self {
        Self::new(id, MockBehavior::RateLimited { retry_after_secs })
    }

    pub fn intermittent(id: impl Into<String>, fail_every: usize) -> Self {
        Self::new(id, MockBehavior::Intermittent { fail_every: fail_every.max(1) })
    }

    /// Replace the canned search results; the provider id is stamped on each
    pub fn with_results(mut self, results: Vec<SearchResult>) -> Self {
        self.results = results
            .into_iter()
            .map(|mut r| {
                r.provider = self.id.clone();
                r
            })
            .collect();
        self
    }

    /// Replace the downloaded body
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn search_calls(&self) -> usize {
        self.search_count.load(Ordering::SeqCst)
    }

    pub fn download_calls(&self) -> usize {
        self.download_count.load(Ordering::SeqCst)
    }

    pub fn probe_calls(&self) -> usize {
        self.probe_count.load(Ordering::SeqCst)
    }

    /// Resolve the configured behavior for the `count`th call (0-based)
    async fn outcome(&self, count: usize) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Working => Ok(()),
            MockBehavior::Failing { status_code } => Err(ProviderError::Http {
                provider: self.id.clone(),
                status_code,
                message: "Simulated provider failure".to_string(),
            }),
            MockBehavior::Timeout => {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Err(ProviderError::Timeout { provider: self.id.clone() })
            }
            MockBehavior::RateLimited { retry_after_secs } => Err(ProviderError::RateLimited {
                provider: self.id.clone(),
                retry_after_secs,
            }),
            MockBehavior::ClientError { status_code } => Err(ProviderError::Http {
                provider: self.id.clone(),
                status_code,
                message: "Simulated client error".to_string(),
            }),
            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::Http {
                        provider: self.id.clone(),
                        status_code: 503,
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                    })
                } else {
                    Ok(())
                }
            }
            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl SubtitleProvider for MockSubtitleProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>, ProviderError> {
        let count = self.search_count.fetch_add(1, Ordering::SeqCst);
        self.outcome(count).await?;

        Ok(self
            .results
            .iter()
            .filter(|r| request.languages.is_empty() || request.languages.iter().any(|l| l == &r.language))
            .cloned()
            .collect())
    }

    async fn download(&self, _result: &SearchResult) -> Result<Bytes, ProviderError> {
        let count = self.download_count.fetch_add(1, Ordering::SeqCst);
        self.outcome(count).await?;
        Ok(self.body.clone())
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let count = self.probe_count.fetch_add(1, Ordering::SeqCst);
        self.outcome(count).await
    }
}
