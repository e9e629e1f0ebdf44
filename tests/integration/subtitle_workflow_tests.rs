/*!
 * End-to-end subtitle workflows through the manager facade
 */

use std::sync::Arc;
use std::time::Duration;

use tokio_test::{assert_err, assert_ok};

use subcue::app_config::Config;
use subcue::cue::AvailableSubtitle;
use subcue::errors::{ErrorKind, ManagerError};
use subcue::manager::{EmbeddedTrackInfo, LoadingState, SubtitleConfig, SubtitleManager};
use subcue::orchestrator::ProviderOrchestrator;
use subcue::providers::mock::MockSubtitleProvider;
use subcue::providers::{SearchRequest, SubtitleProvider};

use crate::common::{
    ASS_SAMPLE, MapFetcher, SRT_SAMPLE, VTT_SAMPLE, create_temp_dir, create_test_file, dispatcher, fast_retry,
    init_logging,
};

const SRT_URL: &str = "https://cdn.test/movie.en.srt";
const VTT_URL: &str = "https://cdn.test/movie.fr.vtt";
const ASS_URL: &str = "https://cdn.test/movie.de.ass";

fn fetcher() -> Arc<MapFetcher> {
    init_logging();
    Arc::new(
        MapFetcher::new()
            .with_body(SRT_URL, SRT_SAMPLE)
            .with_body(VTT_URL, VTT_SAMPLE)
            .with_body(ASS_URL, ASS_SAMPLE)
            .with_delay(Duration::from_millis(10)),
    )
}

#[tokio::test]
async fn test_manager_withLocalFile_shouldLoadThroughHttpFetcher() {
    let dir = create_temp_dir().unwrap();
    let path = create_test_file(dir.path(), "local.srt", SRT_SAMPLE).unwrap();
    let manager = SubtitleManager::from_config(&Config::default());

    let url = path.to_string_lossy().to_string();
    let track = manager
        .load_subtitle(SubtitleConfig::new(&url).auto_select(true))
        .await
        .unwrap();
    assert_eq!(track.len(), 3);
    assert_eq!(manager.selected_subtitle().unwrap().id, url);
}

#[tokio::test]
async fn test_loadSubtitles_withAllFormats_shouldRegisterEach() {
    let fetcher = fetcher();
    let manager = SubtitleManager::new(dispatcher(&fetcher));

    let results = manager
        .load_subtitles(vec![
            SubtitleConfig::new(SRT_URL).with_language("en"),
            SubtitleConfig::new(VTT_URL).with_language("fr"),
            SubtitleConfig::new(ASS_URL).with_language("de"),
        ])
        .await;

    assert!(results.iter().all(Result::is_ok));
    let available = manager.available_subtitles();
    assert_eq!(available.len(), 3);
    assert_eq!(available.iter().filter(|s| s.mime_type == "text/vtt").count(), 1);
    assert_eq!(fetcher.calls(), 3);
}

#[tokio::test]
async fn test_loadSubtitle_concurrentSameUrl_shouldProduceOneConsistentState() {
    let fetcher = fetcher();
    let manager = SubtitleManager::new(dispatcher(&fetcher));
    let mut states = manager.subscribe().unwrap();

    let configs = vec![SubtitleConfig::new(SRT_URL).auto_select(true); 5];
    let results = manager.load_subtitles(configs).await;

    assert!(results.iter().all(Result::is_ok));
    let tracks: Vec<_> = results.into_iter().map(Result::unwrap).collect();
    assert!(tracks.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    assert_eq!(fetcher.calls(), 1);

    let snapshot = states.borrow_and_update().clone();
    assert_eq!(snapshot.available_subtitles.len(), 1);
    assert_eq!(snapshot.selected_subtitle.unwrap().id, SRT_URL);
    assert_eq!(snapshot.loading_state, LoadingState::Success(SRT_URL.to_string()));

    // Already loaded: served from the session cache
    manager.load_subtitle(SubtitleConfig::new(SRT_URL)).await.unwrap();
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn test_playback_withOffsetAndSelection_shouldPublishActiveCues() {
    let fetcher = fetcher();
    let manager = SubtitleManager::new(dispatcher(&fetcher));
    manager.load_subtitle(SubtitleConfig::new(SRT_URL).auto_select(true)).await.unwrap();
    manager.load_subtitle(SubtitleConfig::new(VTT_URL)).await.unwrap();

    let mut cues = manager.subscribe_active_cues().unwrap();
    manager.start_sync();

    manager.update_subtitles_for_position(2_000);
    assert!(cues.has_changed().unwrap());
    assert_eq!(cues.borrow_and_update()[0].text(), "This is a test subtitle.");

    // Same cue again: no notification
    manager.update_subtitles_for_position(2_100);
    assert!(!cues.has_changed().unwrap());

    manager.set_offset(-4_000);
    let shifted = manager.update_subtitles_for_position(2_000).unwrap();
    assert_eq!(shifted[0].text(), "It contains multiple entries.");

    manager.set_offset(0);
    manager.select_subtitle(Some(VTT_URL)).await.unwrap();
    assert_eq!(manager.update_subtitles_for_position(6_000).unwrap()[0].text(), "World");

    manager.stop_sync();
    assert_eq!(manager.update_subtitles_for_position(2_000), None);

    manager.select_subtitle(None).await.unwrap();
    assert!(manager.active_cues().is_empty());
}

#[tokio::test]
async fn test_loadSubtitle_withMissingUrl_shouldRecordErrorAndAllowRetry() {
    init_logging();
    let fetcher = Arc::new(MapFetcher::new());
    let manager = SubtitleManager::new(dispatcher(&fetcher));

    let error = manager
        .load_subtitle(SubtitleConfig::new("https://cdn.test/missing.srt"))
        .await
        .unwrap_err();
    assert!(matches!(error, ManagerError::Load(_)));
    assert!(matches!(manager.loading_state(), LoadingState::Error(_, _)));

    let records = manager.errors_for_url("https://cdn.test/missing.srt");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, ErrorKind::Http);
    assert!(!manager.has_critical_errors());

    assert_err!(manager.retry_subtitle("https://cdn.test/missing.srt").await);
    assert_err!(manager.retry_subtitle("https://cdn.test/missing.srt").await);
    // Three failures in a row
    assert!(manager.has_critical_errors());
}

#[tokio::test]
async fn test_searchAndDownload_shouldRegisterProviderSubtitle() {
    let provider = MockSubtitleProvider::working("alpha");
    let providers: Vec<Arc<dyn SubtitleProvider>> = vec![Arc::new(provider.clone())];
    let orchestrator = Arc::new(ProviderOrchestrator::new(providers).with_retry_policy(fast_retry()));
    let fetcher = Arc::new(MapFetcher::new());
    let manager = SubtitleManager::new(dispatcher(&fetcher)).with_orchestrator(orchestrator);

    let results = manager
        .search(&SearchRequest::movie("Heat", vec!["eng".to_string()]))
        .await
        .unwrap();
    assert_eq!(results.len(), 1);

    let track = assert_ok!(manager.download_and_load(&results[0], true).await);
    assert_eq!(track.len(), 2);
    assert_eq!(fetcher.calls(), 0);
    assert_eq!(provider.download_calls(), 1);

    let selected = manager.selected_subtitle().unwrap();
    assert_eq!(selected.id, results[0].download_url);
    assert_eq!(selected.language.as_deref(), Some("en"));
}

#[tokio::test]
async fn test_removeTrack_duringLoad_shouldDiscardResult() {
    let fetcher = Arc::new(MapFetcher::new().with_body(SRT_URL, SRT_SAMPLE).with_delay(Duration::from_millis(100)));
    let manager = SubtitleManager::new(dispatcher(&fetcher));

    let load = manager.load_subtitle(SubtitleConfig::new(SRT_URL).auto_select(true));
    let remove = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        manager.remove_track(SRT_URL).unwrap()
    };
    let (outcome, removed) = tokio::join!(load, remove);

    assert!(removed);
    assert!(outcome.is_err());
    assert!(manager.available_subtitles().is_empty());
    assert!(manager.selected_subtitle().is_none());
    assert!(manager.track(SRT_URL).is_none());
}

#[tokio::test]
async fn test_dispose_shouldStopNotificationsAndRejectWork() {
    let fetcher = fetcher();
    let manager = SubtitleManager::new(dispatcher(&fetcher));
    manager
        .add_tracks(vec![AvailableSubtitle::external(SRT_URL, Some("en".into()), "English", "application/x-subrip")])
        .await
        .unwrap();
    // Adding to an empty selection loads the track
    assert_eq!(fetcher.calls(), 1);
    let mut cues = manager.subscribe_active_cues().unwrap();

    manager.dispose();

    assert!(cues.changed().await.is_err());
    assert_eq!(
        manager.load_subtitle(SubtitleConfig::new(SRT_URL)).await.unwrap_err(),
        ManagerError::Disposed
    );
    assert_eq!(
        manager.search(&SearchRequest::movie("Heat", vec!["en".to_string()])).await.unwrap_err(),
        ManagerError::Disposed
    );
    assert_eq!(manager.select_subtitle(Some(SRT_URL)).await.unwrap_err(), ManagerError::Disposed);
    assert!(manager.clear_all().is_err());
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn test_loadSubtitle_removedThenReloadedDuringLoad_shouldKeepReload() {
    init_logging();
    let fetcher = Arc::new(MapFetcher::new().with_body(SRT_URL, SRT_SAMPLE).with_delay(Duration::from_millis(100)));
    let manager = SubtitleManager::new(dispatcher(&fetcher));

    let first = manager.load_subtitle(SubtitleConfig::new(SRT_URL).auto_select(true));
    let reload = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        manager.remove_track(SRT_URL).unwrap();
        manager.load_subtitle(SubtitleConfig::new(SRT_URL).auto_select(true)).await
    };
    let (first, reload) = tokio::join!(first, reload);

    assert!(first.is_err());
    assert_eq!(assert_ok!(reload).len(), 3);
    assert_eq!(manager.loading_state(), LoadingState::Success(SRT_URL.to_string()));
    assert_eq!(manager.selected_subtitle().unwrap().id, SRT_URL);
    assert!(manager.track(SRT_URL).is_some());
    assert!(manager.errors_for_url(SRT_URL).is_empty());
    assert!(!manager.has_critical_errors());
}

#[tokio::test]
async fn test_addTracks_withEmbeddedAlreadyPresent_shouldSelectAndPlayExternal() {
    let fetcher = fetcher();
    let manager = SubtitleManager::new(dispatcher(&fetcher));
    manager
        .add_embedded_tracks(2, |i| EmbeddedTrackInfo {
            language: Some("en".to_string()),
            label: format!("Stream {}", i),
            mime_type: "text/vtt".to_string(),
        })
        .unwrap();

    manager
        .add_tracks(vec![AvailableSubtitle::external(VTT_URL, Some("fr".into()), "French", "text/vtt")])
        .await
        .unwrap();

    assert_eq!(manager.selected_subtitle().unwrap().id, VTT_URL);
    manager.start_sync();
    let cues = manager.update_subtitles_for_position(2_000).unwrap();
    assert_eq!(cues.len(), 1);
    assert_eq!(cues[0].text(), "Hello");
}
