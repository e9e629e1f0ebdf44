/*!
 * Multi-provider search and download.
 *
 * The orchestrator fans a search out to every enabled provider at once,
 * wraps each call in a rate-limit check and a bounded retry loop, and
 * merges whatever succeeded. One provider failing never fails the search;
 * callers read `provider_status()` for diagnostics.
 */

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::Serialize;

use crate::app_config::Config;
use crate::cache::SubtitleCache;
use crate::errors::ProviderError;
use crate::language_utils::normalize_languages;
use crate::providers::http::HttpSubtitleProvider;
use crate::providers::{SearchRequest, SearchResult, SubtitleProvider};
use crate::rate_limiter::RateLimiter;

// @const: Consecutive failures after which a provider counts as degraded
pub const DEGRADED_AFTER_FAILURES: u32 = 3;

/// Retry discipline shared by search and download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per call, including the first one
    pub max_attempts: u32,
    /// Attempt N is followed by a pause of `base_delay * N`
    pub base_delay: Duration,
    /// Deadline for a single attempt
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

/// Point-in-time health of one provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderStatus {
    pub provider_id: String,
    pub enabled: bool,
    pub success_count: u64,
    pub failure_count: u64,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
    pub last_checked: Option<DateTime<Utc>>,
}

impl ProviderStatus {
    fn new(provider_id: &str) -> Self {
        Self {
            provider_id: provider_id.to_string(),
            enabled: true,
            success_count: 0,
            failure_count: 0,
            consecutive_failures: 0,
            last_error: None,
            last_checked: None,
        }
    }

    /// Enabled and not failing repeatedly
    pub fn is_healthy(&self) -> bool {
        self.enabled && self.consecutive_failures < DEGRADED_AFTER_FAILURES
    }

    fn record_success(&mut self) {
        self.success_count += 1;
        self.consecutive_failures = 0;
        self.last_checked = Some(Utc::now());
    }

    /// Every failed attempt counts towards degradation, so one exhausted
    /// operation can degrade a provider on its own.
    fn record_failure(&mut self, error: &ProviderError) {
        let attempts = match error {
            ProviderError::Exhausted { attempts, .. } => (*attempts).max(1),
            _ => 1,
        };
        self.failure_count += 1;
        self.consecutive_failures += attempts;
        self.last_error = Some(error.to_string());
        self.last_checked = Some(Utc::now());
    }
}

/// Fans requests out over a set of subtitle providers
#[derive(Debug)]
pub struct ProviderOrchestrator {
    providers: Vec<Arc<dyn SubtitleProvider>>,
    statuses: Mutex<HashMap<String, ProviderStatus>>,
    rate_limiter: Arc<RateLimiter>,
    cache: SubtitleCache<Vec<SearchResult>>,
    retry: RetryPolicy,
}

impl ProviderOrchestrator {
    /// Create an orchestrator with an unlimited rate limiter and default retries
    pub fn new(providers: Vec<Arc<dyn SubtitleProvider>>) -> Self {
        let statuses = providers
            .iter()
            .map(|p| (p.id().to_string(), ProviderStatus::new(p.id())))
            .collect();
        Self {
            providers,
            statuses: Mutex::new(statuses),
            rate_limiter: Arc::new(RateLimiter::new()),
            cache: SubtitleCache::for_search_results(),
            retry: RetryPolicy::default(),
        }
    }

    /// Build HTTP providers, budgets and retry settings from configuration
    pub fn from_config(config: &Config) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new());
        let mut providers: Vec<Arc<dyn SubtitleProvider>> = Vec::with_capacity(config.providers.len());
        for provider_config in &config.providers {
            if let Some(budget) = provider_config.rate_budget() {
                rate_limiter.configure(&provider_config.id, budget);
            }
            providers.push(Arc::new(HttpSubtitleProvider::new(
                &provider_config.id,
                &provider_config.endpoint,
                provider_config.timeout(),
            )));
        }

        let mut cache = SubtitleCache::new(Some(config.search_ttl()));
        cache.set_enabled(config.cache.enabled);

        let attempt_timeout = config
            .providers
            .iter()
            .map(|p| p.timeout())
            .max()
            .unwrap_or(RetryPolicy::default().attempt_timeout);

        let orchestrator = Self::new(providers)
            .with_rate_limiter(rate_limiter)
            .with_cache(cache)
            .with_retry_policy(RetryPolicy {
                max_attempts: config.retry.max_attempts.max(1),
                base_delay: Duration::from_millis(config.retry.base_delay_ms),
                attempt_timeout,
            });

        for provider_config in config.providers.iter().filter(|p| !p.enabled) {
            orchestrator.set_provider_enabled(&provider_config.id, false);
        }
        orchestrator
    }

    pub fn with_rate_limiter(mut self, rate_limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    pub fn with_cache(mut self, cache: SubtitleCache<Vec<SearchResult>>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    pub fn cache(&self) -> &SubtitleCache<Vec<SearchResult>> {
        &self.cache
    }

    /// Ids of every registered provider, in registration order
    pub fn provider_ids(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.id().to_string()).collect()
    }

    fn is_enabled(&self, provider_id: &str) -> bool {
        self.statuses.lock().get(provider_id).is_some_and(|s| s.enabled)
    }

    fn enabled_providers(&self) -> Vec<Arc<dyn SubtitleProvider>> {
        self.providers
            .iter()
            .filter(|p| self.is_enabled(p.id()))
            .cloned()
            .collect()
    }

    fn find_provider(&self, provider_id: &str) -> Option<&Arc<dyn SubtitleProvider>> {
        self.providers.iter().find(|p| p.id() == provider_id)
    }

    /// Enable or disable a provider; returns false for unknown ids
    pub fn set_provider_enabled(&self, provider_id: &str, enabled: bool) -> bool {
        match self.statuses.lock().get_mut(provider_id) {
            Some(status) => {
                status.enabled = enabled;
                info!("Provider {} {}", provider_id, if enabled { "enabled" } else { "disabled" });
                true
            }
            None => false,
        }
    }

    /// Snapshot of every provider's health, no I/O
    pub fn provider_status(&self) -> Vec<ProviderStatus> {
        let statuses = self.statuses.lock();
        self.providers
            .iter()
            .filter_map(|p| statuses.get(p.id()).cloned())
            .collect()
    }

    fn record_outcome<T>(&self, provider_id: &str, outcome: &Result<T, ProviderError>) {
        let mut statuses = self.statuses.lock();
        let Some(status) = statuses.get_mut(provider_id) else {
            return;
        };
        match outcome {
            Ok(_) => status.record_success(),
            Err(e) => {
                status.record_failure(e);
                if !status.is_healthy() {
                    warn!(
                        "Provider {} degraded after {} consecutive failures",
                        provider_id, status.consecutive_failures
                    );
                }
            }
        }
    }

    /// Search every enabled provider concurrently and merge the results.
    ///
    /// Only an invalid request is an error. Provider failures are recorded in
    /// `provider_status()` and leave their results out of the merge.
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>, ProviderError> {
        let enabled = self.enabled_providers();

        if let Err(message) = request.validate() {
            let provider = enabled
                .first()
                .map(|p| p.id().to_string())
                .unwrap_or_else(|| "none".to_string());
            warn!("Rejected search request: {}", message);
            return Err(ProviderError::Validation { provider, message });
        }

        let mut request = request.clone();
        request.languages = normalize_languages(&request.languages);
        let key = request.fingerprint();

        if let Some(cached) = self.cache.get(&key) {
            debug!("Returning {} cached results for '{}'", cached.len(), request.title);
            return Ok(cached);
        }

        if enabled.is_empty() {
            warn!("No enabled subtitle providers");
            return Ok(Vec::new());
        }

        let queries = enabled.iter().map(|provider| self.search_provider(provider, &request));
        let outcomes = join_all(queries).await;

        let mut merged = Vec::new();
        let mut succeeded = 0usize;
        for (provider, outcome) in enabled.iter().zip(outcomes) {
            match outcome {
                Ok(results) => {
                    debug!("{} returned {} results", provider.id(), results.len());
                    succeeded += 1;
                    merged.extend(results);
                }
                Err(e) => warn!("Search failed for {}: {}", provider.id(), e),
            }
        }

        let ranked = rank_results(merged);
        if succeeded > 0 {
            self.cache.put(key, ranked.clone());
        } else {
            warn!("All {} providers failed for '{}'", enabled.len(), request.title);
        }
        info!(
            "Found {} subtitles for '{}' ({}/{} providers answered)",
            ranked.len(),
            request.title,
            succeeded,
            enabled.len()
        );
        Ok(ranked)
    }

    async fn search_provider(
        &self,
        provider: &Arc<dyn SubtitleProvider>,
        request: &SearchRequest,
    ) -> Result<Vec<SearchResult>, ProviderError> {
        let outcome = self
            .with_retries(provider.id(), "search", move || provider.search(request))
            .await;
        self.record_outcome(provider.id(), &outcome);
        outcome
    }

    /// Download the file behind `result` from the provider that found it
    pub async fn download(&self, result: &SearchResult) -> Result<Bytes, ProviderError> {
        let provider = self
            .find_provider(&result.provider)
            .ok_or_else(|| ProviderError::UnknownProvider(result.provider.clone()))?;
        if !self.is_enabled(provider.id()) {
            return Err(ProviderError::Disabled(result.provider.clone()));
        }

        debug!("Downloading {} from {}", result.file_name, provider.id());
        let outcome = self
            .with_retries(provider.id(), "download", move || provider.download(result))
            .await;
        self.record_outcome(provider.id(), &outcome);
        outcome
    }

    /// Download and decode as text, honouring byte order marks
    pub async fn download_text(&self, result: &SearchResult) -> Result<String, ProviderError> {
        let bytes = self.download(result).await?;
        crate::dispatcher::decode(&bytes, "utf-8")
            .map(|(text, _)| text)
            .map_err(|e| ProviderError::InvalidResponse {
                provider: result.provider.clone(),
                message: e.to_string(),
            })
    }

    /// Probe a provider once without retries; any failure means `false`
    pub async fn test_connection(&self, provider_id: &str) -> bool {
        let Some(provider) = self.find_provider(provider_id) else {
            warn!("Cannot test unknown provider {}", provider_id);
            return false;
        };

        let outcome = match tokio::time::timeout(self.retry.attempt_timeout, provider.test_connection()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ProviderError::Timeout { provider: provider_id.to_string() }),
        };
        self.record_outcome(provider_id, &outcome);
        match outcome {
            Ok(()) => true,
            Err(e) => {
                warn!("Connection test failed for {}: {}", provider_id, e);
                false
            }
        }
    }

    /// Run `call` under the rate limiter with bounded retries.
    ///
    /// Transient failures are retried with a linearly growing pause; 429 and
    /// 4xx are returned immediately. A 429 with `Retry-After` also blocks the
    /// provider in the rate limiter.
    async fn with_retries<T, F, Fut>(&self, provider_id: &str, operation: &str, mut call: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            if !self.rate_limiter.try_acquire(provider_id) {
                let wait = self.rate_limiter.time_until_available(provider_id);
                debug!("{} {} deferred by rate limiter ({:?})", provider_id, operation, wait);
                return Err(ProviderError::RateLimited {
                    provider: provider_id.to_string(),
                    retry_after_secs: wait.map(|d| d.as_secs().max(1)),
                });
            }

            attempt += 1;
            let outcome = match tokio::time::timeout(self.retry.attempt_timeout, call()).await {
                Ok(outcome) => outcome,
                Err(_) => Err(ProviderError::Timeout { provider: provider_id.to_string() }),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(ProviderError::RateLimited { provider, retry_after_secs }) => {
                    if let Some(secs) = retry_after_secs {
                        self.rate_limiter.penalize(provider_id, Duration::from_secs(secs));
                    }
                    warn!("{} rate limited {} (retry after {:?}s)", provider, operation, retry_after_secs);
                    return Err(ProviderError::RateLimited { provider, retry_after_secs });
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        "{} {} attempt {}/{} failed: {}. Retrying in {:?}",
                        provider_id, operation, attempt, max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_transient() => {
                    return Err(ProviderError::Exhausted {
                        provider: provider_id.to_string(),
                        attempts: attempt,
                        message: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// De-duplicate by (provider, id) and order best match first
pub fn rank_results(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut seen = HashSet::new();
    let mut unique: Vec<SearchResult> = results
        .into_iter()
        .filter(|r| seen.insert((r.provider.clone(), r.id.clone())))
        .collect();

    unique.sort_by(|a, b| {
        a.match_type
            .rank()
            .cmp(&b.match_type.rank())
            .then_with(|| b.match_score.total_cmp(&a.match_score))
    });
    unique
}
