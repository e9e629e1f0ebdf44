/*!
 * Subtitle manager facade.
 *
 * Composes the dispatcher, orchestrator, error handler and synchronizer into
 * the API the playback layer talks to. All mutable state lives behind one
 * mutex owned by the manager; observers get the latest value plus change
 * notifications through `tokio::sync::watch` receivers.
 *
 * Loads run as spawned tasks. Two loads of the same URL share one in-flight
 * task, results for URLs removed in the meantime are discarded, and
 * `dispose()` aborts everything that is still running.
 */

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared, join_all};
use log::{debug, info, warn};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::AbortHandle;

use crate::app_config::Config;
use crate::cache::SubtitleCache;
use crate::cue::{AvailableSubtitle, Cue, SubtitleFormat, Track};
use crate::dispatcher::{HttpFetcher, SubtitleParserDispatcher};
use crate::error_handler::{ErrorHandler, ErrorRecord};
use crate::errors::{LoadError, ManagerError};
use crate::orchestrator::ProviderOrchestrator;
use crate::providers::{SearchRequest, SearchResult};
use crate::synchronizer::Synchronizer;

type SharedLoad = Shared<BoxFuture<'static, Result<Arc<Track>, LoadError>>>;

/// One spawned load and the callers waiting on it
struct InFlight {
    /// Tells a reload of the same URL apart from the load it replaced
    generation: u64,
    load: SharedLoad,
    task: AbortHandle,
    waiters: usize,
}

/// How to load one external subtitle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleConfig {
    pub url: String,
    /// Extension or MIME type; detected from the URL or content when absent
    pub format: Option<String>,
    pub language: Option<String>,
    pub label: Option<String>,
    /// Charset label; the dispatcher default applies when absent
    pub encoding: Option<String>,
    /// Select the subtitle once it has loaded
    pub auto_select: bool,
}

impl SubtitleConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            format: None,
            language: None,
            label: None,
            encoding: None,
            auto_select: false,
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    pub fn auto_select(mut self, auto_select: bool) -> Self {
        self.auto_select = auto_select;
        self
    }

    fn to_available(&self) -> AvailableSubtitle {
        let format = self
            .format
            .as_deref()
            .and_then(|f| SubtitleFormat::from_extension(f).or_else(|| SubtitleFormat::from_mime_type(f)))
            .or_else(|| SubtitleFormat::from_url(&self.url));
        let label = self
            .label
            .clone()
            .or_else(|| self.language.clone())
            .unwrap_or_else(|| file_name(&self.url));
        AvailableSubtitle::external(
            &self.url,
            self.language.clone(),
            label,
            format.map_or("text/plain", |f| f.mime_type()),
        )
    }
}

fn file_name(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or(url)
        .to_string()
}

/// Describes an in-stream track for `add_embedded_tracks`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedTrackInfo {
    pub language: Option<String>,
    pub label: String,
    pub mime_type: String,
}

/// Where the most recent load stands
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadingState {
    #[default]
    Idle,
    Loading(String),
    Success(String),
    /// URL and human readable cause
    Error(String, String),
}

/// Snapshot published to `subscribe()` receivers
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ManagerSnapshot {
    pub available_subtitles: Vec<AvailableSubtitle>,
    pub selected_subtitle: Option<AvailableSubtitle>,
    pub loading_state: LoadingState,
}

struct ManagerState {
    available: Vec<AvailableSubtitle>,
    selected: Option<AvailableSubtitle>,
    active_cues: Vec<Cue>,
    loading_state: LoadingState,
    /// Last config used per URL, for retries and lazy loads on selection
    configs: HashMap<String, SubtitleConfig>,
    in_flight: HashMap<String, InFlight>,
    next_generation: u64,
    state_tx: Option<watch::Sender<ManagerSnapshot>>,
    cues_tx: Option<watch::Sender<Vec<Cue>>>,
    disposed: bool,
}

impl ManagerState {
    fn new() -> Self {
        Self {
            available: Vec::new(),
            selected: None,
            active_cues: Vec::new(),
            loading_state: LoadingState::Idle,
            configs: HashMap::new(),
            in_flight: HashMap::new(),
            next_generation: 0,
            state_tx: Some(watch::channel(ManagerSnapshot::default()).0),
            cues_tx: Some(watch::channel(Vec::new()).0),
            disposed: false,
        }
    }

    fn snapshot(&self) -> ManagerSnapshot {
        ManagerSnapshot {
            available_subtitles: self.available.clone(),
            selected_subtitle: self.selected.clone(),
            loading_state: self.loading_state.clone(),
        }
    }

    fn publish(&self) {
        if let Some(tx) = &self.state_tx {
            tx.send_replace(self.snapshot());
        }
    }

    fn set_active_cues(&mut self, cues: Vec<Cue>) {
        if self.active_cues == cues {
            return;
        }
        self.active_cues = cues;
        if let Some(tx) = &self.cues_tx {
            tx.send_replace(self.active_cues.clone());
        }
    }

    fn find(&self, id: &str) -> Option<&AvailableSubtitle> {
        self.available.iter().find(|s| s.id == id)
    }

    fn is_selected(&self, id: &str) -> bool {
        self.selected.as_ref().is_some_and(|s| s.id == id)
    }

    fn abort_load(&mut self, url: &str) {
        if let Some(slot) = self.in_flight.remove(url) {
            slot.task.abort();
        }
    }

    /// Abort every running load, returning how many there were
    fn abort_all(&mut self) -> usize {
        let count = self.in_flight.len();
        for (_, slot) in self.in_flight.drain() {
            slot.task.abort();
        }
        count
    }

    fn owns_slot(&self, url: &str, generation: u64) -> bool {
        self.in_flight.get(url).is_some_and(|slot| slot.generation == generation)
    }
}

/// A caller waiting on an in-flight load.
///
/// Dropping it before the load finishes releases its place; once the last
/// waiter is gone the load is aborted and a `Loading` state for it is reset.
struct LoadWaiter<'a> {
    state: &'a Mutex<ManagerState>,
    url: String,
    generation: u64,
    finished: bool,
}

impl Drop for LoadWaiter<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut state = self.state.lock();
        let remaining = match state.in_flight.get_mut(&self.url) {
            Some(slot) if slot.generation == self.generation => {
                slot.waiters = slot.waiters.saturating_sub(1);
                slot.waiters
            }
            _ => return,
        };
        if remaining > 0 {
            return;
        }

        debug!("Abandoning load of {} with no callers left", self.url);
        state.abort_load(&self.url);
        if state.loading_state == LoadingState::Loading(self.url.clone()) {
            state.loading_state = LoadingState::Idle;
            state.publish();
        }
    }
}

/// Facade over subtitle loading, searching and synchronisation
pub struct SubtitleManager {
    dispatcher: SubtitleParserDispatcher,
    orchestrator: Arc<ProviderOrchestrator>,
    error_handler: Arc<ErrorHandler>,
    tracks: SubtitleCache<Arc<Track>>,
    synchronizer: Mutex<Synchronizer>,
    state: Mutex<ManagerState>,
}

impl fmt::Debug for SubtitleManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SubtitleManager")
            .field("available", &state.available.len())
            .field("loaded", &self.tracks.len())
            .field("in_flight", &state.in_flight.len())
            .field("loading_state", &state.loading_state)
            .field("disposed", &state.disposed)
            .finish()
    }
}

impl SubtitleManager {
    /// Create a manager with no providers and a fresh error handler
    pub fn new(dispatcher: SubtitleParserDispatcher) -> Self {
        Self {
            dispatcher,
            orchestrator: Arc::new(ProviderOrchestrator::new(Vec::new())),
            error_handler: Arc::new(ErrorHandler::new()),
            tracks: SubtitleCache::for_session(),
            synchronizer: Mutex::new(Synchronizer::new()),
            state: Mutex::new(ManagerState::new()),
        }
    }

    /// Wire every component from configuration
    pub fn from_config(config: &Config) -> Self {
        let fetch_timeout = config
            .providers
            .iter()
            .map(|p| p.timeout())
            .max()
            .unwrap_or(Duration::from_secs(30));
        let dispatcher = SubtitleParserDispatcher::new(Arc::new(HttpFetcher::new(fetch_timeout)))
            .with_default_encoding(&config.default_encoding);

        let mut synchronizer = Synchronizer::with_capacity(config.sync.drift_sample_capacity);
        synchronizer.set_offset(config.sync.default_offset_ms);

        Self::new(dispatcher)
            .with_orchestrator(Arc::new(ProviderOrchestrator::from_config(config)))
            .with_synchronizer(synchronizer)
    }

    pub fn with_orchestrator(mut self, orchestrator: Arc<ProviderOrchestrator>) -> Self {
        self.orchestrator = orchestrator;
        self
    }

    pub fn with_error_handler(mut self, error_handler: Arc<ErrorHandler>) -> Self {
        self.error_handler = error_handler;
        self
    }

    pub fn with_synchronizer(mut self, synchronizer: Synchronizer) -> Self {
        self.synchronizer = Mutex::new(synchronizer);
        self
    }

    pub fn orchestrator(&self) -> &Arc<ProviderOrchestrator> {
        &self.orchestrator
    }

    pub fn error_handler(&self) -> &Arc<ErrorHandler> {
        &self.error_handler
    }

    fn ensure_live(&self) -> Result<(), ManagerError> {
        if self.state.lock().disposed {
            Err(ManagerError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Receiver for subtitle list, selection and loading state
    pub fn subscribe(&self) -> Result<watch::Receiver<ManagerSnapshot>, ManagerError> {
        let state = self.state.lock();
        state.state_tx.as_ref().map(watch::Sender::subscribe).ok_or(ManagerError::Disposed)
    }

    /// Receiver for the cues currently on screen
    pub fn subscribe_active_cues(&self) -> Result<watch::Receiver<Vec<Cue>>, ManagerError> {
        let state = self.state.lock();
        state.cues_tx.as_ref().map(watch::Sender::subscribe).ok_or(ManagerError::Disposed)
    }

    pub fn snapshot(&self) -> ManagerSnapshot {
        self.state.lock().snapshot()
    }

    pub fn available_subtitles(&self) -> Vec<AvailableSubtitle> {
        self.state.lock().available.clone()
    }

    pub fn selected_subtitle(&self) -> Option<AvailableSubtitle> {
        self.state.lock().selected.clone()
    }

    pub fn active_cues(&self) -> Vec<Cue> {
        self.state.lock().active_cues.clone()
    }

    pub fn loading_state(&self) -> LoadingState {
        self.state.lock().loading_state.clone()
    }

    /// Parsed track for `url`, if it has been loaded
    pub fn track(&self, url: &str) -> Option<Arc<Track>> {
        self.tracks.get(url)
    }

    pub fn supported_formats(&self) -> Vec<SubtitleFormat> {
        SubtitleParserDispatcher::supported_formats()
    }

    /// Register subtitles.
    ///
    /// When nothing is selected yet, the first newly added external track is
    /// selected and loaded. A failed load leaves the tracks registered and is
    /// returned as the error.
    pub async fn add_tracks(&self, tracks: Vec<AvailableSubtitle>) -> Result<(), ManagerError> {
        let auto_select = {
            let mut state = self.state.lock();
            if state.disposed {
                return Err(ManagerError::Disposed);
            }
            let mut first_external = None;
            for track in tracks {
                if state.find(&track.id).is_some() {
                    continue;
                }
                if first_external.is_none() && !track.is_embedded {
                    first_external = Some(track.id.clone());
                }
                state.available.push(track);
            }
            state.publish();
            first_external.filter(|_| state.selected.is_none())
        };

        if let Some(id) = auto_select {
            debug!("Auto-selecting {}", id);
            self.select_subtitle(Some(&id)).await?;
        }
        Ok(())
    }

    /// Register `count` in-stream tracks described by `info`; nothing is fetched
    pub fn add_embedded_tracks<F>(&self, count: usize, info: F) -> Result<(), ManagerError>
    where
        F: Fn(usize) -> EmbeddedTrackInfo,
    {
        let mut state = self.state.lock();
        if state.disposed {
            return Err(ManagerError::Disposed);
        }
        for index in 0..count {
            let info = info(index);
            let subtitle = AvailableSubtitle::embedded(index, info.language, info.label, info.mime_type);
            if state.find(&subtitle.id).is_none() {
                state.available.push(subtitle);
            }
        }
        state.publish();
        Ok(())
    }

    /// Fetch, parse and register one subtitle
    pub async fn load_subtitle(&self, config: SubtitleConfig) -> Result<Arc<Track>, ManagerError> {
        self.ensure_live()?;
        let outcome = self.run_load(config, true).await;
        self.ensure_live()?;
        outcome.map_err(ManagerError::from)
    }

    /// Load every config concurrently; each result is independent
    pub async fn load_subtitles(&self, configs: Vec<SubtitleConfig>) -> Vec<Result<Arc<Track>, ManagerError>> {
        join_all(configs.into_iter().map(|config| self.load_subtitle(config))).await
    }

    async fn run_load(&self, config: SubtitleConfig, record_errors: bool) -> Result<Arc<Track>, LoadError> {
        let url = config.url.clone();
        let (generation, load) = {
            let mut state = self.state.lock();
            if state.disposed {
                return Err(LoadError::Cancelled);
            }
            if state.find(&url).is_none() {
                state.available.push(config.to_available());
            }
            state.configs.insert(url.clone(), config.clone());

            if let Some(track) = self.tracks.get(&url) {
                debug!("Using cached track for {}", url);
                self.apply_result(&mut state, &config, Ok(track.clone()), record_errors);
                return Ok(track);
            }

            let joined = state.in_flight.get_mut(&url).map(|slot| {
                slot.waiters += 1;
                (slot.generation, slot.load.clone())
            });
            match joined {
                Some(joined) => {
                    debug!("Joining in-flight load of {}", url);
                    joined
                }
                None => {
                    let spawned = self.spawn_load(&mut state, &config);
                    state.loading_state = LoadingState::Loading(url.clone());
                    state.publish();
                    spawned
                }
            }
        };
        let mut waiter = LoadWaiter { state: &self.state, url: url.clone(), generation, finished: false };

        let result = load.await;

        let mut state = self.state.lock();
        waiter.finished = true;
        // The first waiter back applies the result. A missing or newer slot
        // means it was applied already, or the URL was removed or reloaded.
        if state.owns_slot(&url, generation) {
            state.in_flight.remove(&url);
            self.apply_result(&mut state, &config, result.clone(), record_errors);
        } else {
            debug!("Load of {} was superseded", url);
        }
        result
    }

    fn spawn_load(&self, state: &mut ManagerState, config: &SubtitleConfig) -> (u64, SharedLoad) {
        let dispatcher = self.dispatcher.clone();
        let url = config.url.clone();
        let format = config.format.clone();
        let encoding = config.encoding.clone();

        let handle = tokio::spawn(async move {
            dispatcher
                .load(&url, format.as_deref(), encoding.as_deref())
                .await
                .into_result()
                .map(Arc::new)
        });
        let task = handle.abort_handle();

        let load = async move { handle.await.unwrap_or_else(|_| Err(LoadError::Cancelled)) }
            .boxed()
            .shared();
        state.next_generation += 1;
        let generation = state.next_generation;
        state.in_flight.insert(
            config.url.clone(),
            InFlight { generation, load: load.clone(), task, waiters: 1 },
        );
        (generation, load)
    }

    fn apply_result(
        &self,
        state: &mut ManagerState,
        config: &SubtitleConfig,
        result: Result<Arc<Track>, LoadError>,
        record_errors: bool,
    ) {
        let url = &config.url;
        if state.disposed || state.find(url).is_none() {
            debug!("Discarding load result for {}", url);
            return;
        }

        match result {
            Ok(track) => {
                info!("Loaded {} cues from {}", track.len(), url);
                self.tracks.put(url.clone(), track.clone());
                self.error_handler.clear_errors_for_url(url);
                state.loading_state = LoadingState::Success(url.clone());
                if config.auto_select && !state.is_selected(url) {
                    state.selected = state.find(url).cloned();
                    state.set_active_cues(Vec::new());
                }
                if state.is_selected(url) {
                    self.synchronizer.lock().load_track(track);
                }
            }
            Err(error) => {
                if record_errors {
                    match &error {
                        LoadError::Parse(parse_error) => {
                            self.error_handler.handle_parsing_error(url, parse_error);
                        }
                        other => {
                            self.error_handler.handle_error(url, other, "load");
                        }
                    }
                }
                state.loading_state = LoadingState::Error(url.clone(), error.to_string());
            }
        }
        state.publish();
    }

    /// Select by id, or deselect with `None`; external tracks load on demand
    pub async fn select_subtitle(&self, id: Option<&str>) -> Result<(), ManagerError> {
        let to_load = {
            let mut state = self.state.lock();
            if state.disposed {
                return Err(ManagerError::Disposed);
            }

            let subtitle = match id {
                Some(id) => Some(state.find(id).cloned().ok_or_else(|| ManagerError::NotFound(id.to_string()))?),
                None => None,
            };
            state.selected = subtitle.clone();
            state.set_active_cues(Vec::new());

            let mut synchronizer = self.synchronizer.lock();
            let to_load = match subtitle.as_ref().and_then(|s| s.url.clone()) {
                Some(url) => match self.tracks.get(&url) {
                    Some(track) => {
                        synchronizer.load_track(track);
                        None
                    }
                    None => {
                        synchronizer.clear();
                        Some(
                            state
                                .configs
                                .get(&url)
                                .cloned()
                                .unwrap_or_else(|| SubtitleConfig::new(url))
                                .auto_select(false),
                        )
                    }
                },
                // Embedded or nothing: cues come from the player, not from us
                None => {
                    synchronizer.clear();
                    None
                }
            };
            drop(synchronizer);
            state.publish();
            to_load
        };

        if let Some(config) = to_load {
            self.load_subtitle(config).await?;
        }
        Ok(())
    }

    /// Resolve cues for the selected external track and republish them.
    ///
    /// Returns `None` when nothing was consumed: sync stopped, nothing
    /// selected, an embedded track selected, or the manager disposed.
    pub fn update_subtitles_for_position(&self, position_ms: u64) -> Option<Vec<Cue>> {
        {
            let state = self.state.lock();
            if state.disposed || !state.selected.as_ref().is_some_and(|s| !s.is_embedded) {
                return None;
            }
        }

        let cues = self.synchronizer.lock().update_position(position_ms)?;
        self.state.lock().set_active_cues(cues.clone());
        Some(cues)
    }

    /// Forget one subtitle; an in-flight load for it is aborted and discarded
    pub fn remove_track(&self, url: &str) -> Result<bool, ManagerError> {
        let mut state = self.state.lock();
        if state.disposed {
            return Err(ManagerError::Disposed);
        }
        let before = state.available.len();
        state.available.retain(|s| s.id != url && s.url.as_deref() != Some(url));
        let removed = state.available.len() != before;

        state.abort_load(url);
        state.configs.remove(url);
        self.tracks.invalidate(url);

        if state.is_selected(url) {
            state.selected = None;
            state.set_active_cues(Vec::new());
            self.synchronizer.lock().clear();
        }
        state.publish();
        Ok(removed)
    }

    /// Remove every subtitle and reset the loading state
    pub fn clear_all(&self) -> Result<(), ManagerError> {
        let mut state = self.state.lock();
        if state.disposed {
            return Err(ManagerError::Disposed);
        }
        state.abort_all();
        state.available.clear();
        state.configs.clear();
        state.selected = None;
        state.set_active_cues(Vec::new());
        state.loading_state = LoadingState::Idle;
        self.tracks.clear_all();
        self.error_handler.clear_errors();
        self.synchronizer.lock().clear();
        state.publish();
        Ok(())
    }

    /// Load `url` again through the error handler's retry bookkeeping
    pub async fn retry_subtitle(&self, url: &str) -> Result<Arc<Track>, ManagerError> {
        let config = {
            let state = self.state.lock();
            if state.disposed {
                return Err(ManagerError::Disposed);
            }
            state.configs.get(url).cloned().ok_or_else(|| ManagerError::NotFound(url.to_string()))?
        };
        // Retries always refetch
        self.tracks.invalidate(url);

        let outcome = self
            .error_handler
            .retry_url(url, || self.run_load(config, false))
            .await;
        self.ensure_live()?;
        outcome.map_err(ManagerError::from)
    }

    pub fn set_offset(&self, offset_ms: i64) {
        self.synchronizer.lock().set_offset(offset_ms);
    }

    pub fn offset(&self) -> i64 {
        self.synchronizer.lock().offset()
    }

    pub fn start_sync(&self) {
        self.synchronizer.lock().start_synchronization();
    }

    pub fn stop_sync(&self) {
        self.synchronizer.lock().stop_synchronization();
    }

    pub fn errors_for_url(&self, url: &str) -> Vec<ErrorRecord> {
        self.error_handler.errors_for_url(url)
    }

    pub fn has_critical_errors(&self) -> bool {
        self.error_handler.has_critical_errors()
    }

    /// Search every configured provider
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>, ManagerError> {
        self.ensure_live()?;
        let results = self.orchestrator.search(request).await?;
        self.ensure_live()?;
        Ok(results)
    }

    /// Download a search hit, parse it and register it like a loaded URL
    pub async fn download_and_load(&self, result: &SearchResult, auto_select: bool) -> Result<Arc<Track>, ManagerError> {
        self.ensure_live()?;
        let config = SubtitleConfig::new(&result.download_url)
            .with_format(result.format.extension())
            .with_language(&result.language)
            .with_label(result.language_name.clone().unwrap_or_else(|| result.file_name.clone()))
            .auto_select(auto_select);

        {
            let mut state = self.state.lock();
            if state.find(&config.url).is_none() {
                state.available.push(config.to_available());
            }
            state.configs.insert(config.url.clone(), config.clone());
            state.loading_state = LoadingState::Loading(config.url.clone());
            state.publish();
        }

        let bytes = match self.orchestrator.download(result).await {
            Ok(bytes) => bytes,
            Err(e) => {
                self.error_handler.handle_error(&config.url, &e, "download");
                let mut state = self.state.lock();
                if !state.disposed {
                    state.loading_state = LoadingState::Error(config.url.clone(), e.to_string());
                    state.publish();
                }
                return Err(e.into());
            }
        };

        let outcome = self
            .dispatcher
            .parse_bytes(&bytes, Some(result.format), None, None)
            .await
            .map(Arc::new);

        {
            let mut state = self.state.lock();
            self.apply_result(&mut state, &config, outcome.clone(), true);
        }
        self.ensure_live()?;
        outcome.map_err(ManagerError::from)
    }

    /// Abort background work and close every notification channel.
    ///
    /// Idempotent; afterwards every fallible call returns `ManagerError::Disposed`.
    pub fn dispose(&self) {
        let mut state = self.state.lock();
        if state.disposed {
            return;
        }
        state.disposed = true;
        let aborted = state.abort_all();
        state.available.clear();
        state.configs.clear();
        state.selected = None;
        state.active_cues.clear();
        state.loading_state = LoadingState::Idle;
        // Dropping the senders closes every receiver
        state.state_tx = None;
        state.cues_tx = None;

        let mut synchronizer = self.synchronizer.lock();
        synchronizer.stop_synchronization();
        synchronizer.clear();
        self.tracks.clear_all();

        if aborted > 0 {
            warn!("Disposed subtitle manager with {} loads still running", aborted);
        } else {
            debug!("Disposed subtitle manager");
        }
    }
}

impl Drop for SubtitleManager {
    fn drop(&mut self) {
        self.state.get_mut().abort_all();
    }
}
