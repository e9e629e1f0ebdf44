/*!
 * Provider orchestration tests: concurrent search, retries, health and downloads
 */

use std::sync::Arc;
use std::time::{Duration, Instant};

use subcue::dispatcher::SubtitleParserDispatcher;
use subcue::errors::ProviderError;
use subcue::orchestrator::ProviderOrchestrator;
use subcue::providers::mock::{MockBehavior, MockSubtitleProvider};
use subcue::providers::{MatchType, SearchRequest, SearchResult, SubtitleProvider};

use crate::common::{MapFetcher, fast_retry};

fn orchestrator(providers: &[MockSubtitleProvider]) -> ProviderOrchestrator {
    let providers: Vec<Arc<dyn SubtitleProvider>> = providers
        .iter()
        .cloned()
        .map(|p| Arc::new(p) as Arc<dyn SubtitleProvider>)
        .collect();
    ProviderOrchestrator::new(providers).with_retry_policy(fast_retry())
}

fn request(title: &str) -> SearchRequest {
    SearchRequest::movie(title, vec!["en".to_string()])
}

#[tokio::test]
async fn test_search_withOneProviderTimingOut_shouldReturnOtherResults() {
    let slow = MockSubtitleProvider::new("slow", MockBehavior::Slow { delay_ms: 2_000 });
    let fast = MockSubtitleProvider::working("fast");
    let orchestrator = orchestrator(&[slow.clone(), fast.clone()]);

    let started = Instant::now();
    let results = orchestrator.search(&request("Heat")).await.unwrap();

    // Three attempts at 100ms each, never the full provider delay
    assert!(started.elapsed() < Duration::from_millis(1_500));
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].provider, "fast");
    assert_eq!(slow.search_calls(), 3);
    assert_eq!(fast.search_calls(), 1);

    let statuses = orchestrator.provider_status();
    let slow_status = statuses.iter().find(|s| s.provider_id == "slow").unwrap();
    assert_eq!(slow_status.failure_count, 1);
    assert!(!slow_status.is_healthy());
    assert!(slow_status.last_error.as_deref().unwrap().contains("3 attempts"));
    let fast_status = statuses.iter().find(|s| s.provider_id == "fast").unwrap();
    assert_eq!(fast_status.success_count, 1);
    assert!(fast_status.is_healthy());
}

#[tokio::test]
async fn test_search_withSimulatedTimeouts_shouldExhaustRetries() {
    let flaky = MockSubtitleProvider::new("flaky", MockBehavior::Timeout);
    let orchestrator = orchestrator(&[flaky.clone()]);

    let results = orchestrator.search(&request("Heat")).await.unwrap();
    assert!(results.is_empty());
    assert_eq!(flaky.search_calls(), 3);
    // Nothing succeeded, so nothing was cached
    assert!(orchestrator.cache().is_empty());
}

#[tokio::test]
async fn test_search_acrossProviders_shouldRankBestMatchFirst() {
    let title = MockSubtitleProvider::working("title").with_results(vec![
        SearchResult::new("", "t1", "en", MatchType::TitleMatch, 0.95),
    ]);
    let hash = MockSubtitleProvider::working("hash").with_results(vec![
        SearchResult::new("", "h1", "en", MatchType::HashMatch, 0.4),
        SearchResult::new("", "h1", "en", MatchType::HashMatch, 0.4),
        SearchResult::new("", "h2", "en", MatchType::CatalogMatch, 0.7),
    ]);
    let orchestrator = orchestrator(&[title, hash]);

    let results = orchestrator.search(&request("Heat")).await.unwrap();
    let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["h1", "h2", "t1"]);
}

#[tokio::test]
async fn test_search_withRepeatedFailures_shouldMarkProviderDegraded() {
    let broken = MockSubtitleProvider::new("broken", MockBehavior::ClientError { status_code: 403 });
    let orchestrator = orchestrator(&[broken.clone()]);

    for title in ["One", "Two", "Three"] {
        assert!(orchestrator.search(&request(title)).await.unwrap().is_empty());
    }
    // Client errors are never retried
    assert_eq!(broken.search_calls(), 3);

    let status = &orchestrator.provider_status()[0];
    assert_eq!(status.consecutive_failures, 3);
    assert!(!status.is_healthy());
}

#[tokio::test]
async fn test_search_afterRateLimitResponse_shouldNotCallProviderAgain() {
    let limited = MockSubtitleProvider::rate_limited("limited", Some(30));
    let orchestrator = orchestrator(&[limited.clone()]);

    orchestrator.search(&request("Heat")).await.unwrap();
    orchestrator.search(&request("Heat")).await.unwrap();

    assert_eq!(limited.search_calls(), 1);
    let wait = orchestrator.rate_limiter().time_until_available("limited").unwrap();
    assert!(wait > Duration::from_secs(25));
}

#[tokio::test]
async fn test_setProviderEnabled_shouldGateSearchAndDownload() {
    let alpha = MockSubtitleProvider::working("alpha");
    let orchestrator = orchestrator(&[alpha.clone()]);
    assert!(orchestrator.set_provider_enabled("alpha", false));
    assert!(!orchestrator.set_provider_enabled("ghost", false));

    assert!(orchestrator.search(&request("Heat")).await.unwrap().is_empty());
    assert_eq!(alpha.search_calls(), 0);

    let result = SearchResult::new("alpha", "a1", "en", MatchType::TitleMatch, 0.5);
    assert_eq!(
        orchestrator.download(&result).await.unwrap_err(),
        ProviderError::Disabled("alpha".to_string())
    );
}

#[tokio::test]
async fn test_download_thenParse_shouldYieldTrack() {
    let alpha = MockSubtitleProvider::working("alpha");
    let orchestrator = orchestrator(&[alpha.clone()]);
    let results = orchestrator.search(&request("Heat")).await.unwrap();

    let bytes = orchestrator.download(&results[0]).await.unwrap();
    let dispatcher = SubtitleParserDispatcher::new(Arc::new(MapFetcher::new()));
    let track = dispatcher
        .parse_bytes(&bytes, Some(results[0].format), None, None)
        .await
        .unwrap();

    assert_eq!(track.len(), 2);
    assert_eq!(track.cues()[0].text(), "Hello from the mock");
    assert_eq!(alpha.download_calls(), 1);
}

#[tokio::test]
async fn test_testConnection_shouldReportEachProvider() {
    let orchestrator = orchestrator(&[
        MockSubtitleProvider::working("up"),
        MockSubtitleProvider::failing("down"),
    ]);
    assert!(orchestrator.test_connection("up").await);
    assert!(!orchestrator.test_connection("down").await);
    assert!(!orchestrator.test_connection("missing").await);

    let statuses = orchestrator.provider_status();
    assert!(statuses.iter().all(|s| s.last_checked.is_some()));
}
