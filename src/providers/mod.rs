/*!
 * Subtitle provider clients.
 *
 * This module defines the search request/result types and the
 * `SubtitleProvider` trait every remote service implements:
 * - `http`: generic JSON-over-HTTP subtitle service
 * - `mock`: scripted provider used by tests and offline runs
 */

use std::fmt::{self, Debug};

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::cue::SubtitleFormat;
use crate::errors::ProviderError;

pub mod http;
pub mod mock;

/// Kind of content being searched for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Movie,
    Episode,
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Movie => write!(f, "movie"),
            Self::Episode => write!(f, "episode"),
        }
    }
}

/// What the caller knows about the content it needs subtitles for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchRequest {
    pub title: String,
    pub year: Option<u16>,
    pub content_type: ContentType,
    /// OpenSubtitles-style file hash of the video
    pub file_hash: Option<String>,
    /// External catalog id (IMDb)
    pub imdb_id: Option<String>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    /// Requested languages, never empty for a valid request
    pub languages: Vec<String>,
}

impl SearchRequest {
    // @creates: Movie request
    pub fn movie(title: impl Into<String>, languages: Vec<String>) -> Self {
        Self {
            title: title.into(),
            year: None,
            content_type: ContentType::Movie,
            file_hash: None,
            imdb_id: None,
            season: None,
            episode: None,
            languages,
        }
    }

    // @creates: Episode request
    pub fn episode(title: impl Into<String>, season: u32, episode: u32, languages: Vec<String>) -> Self {
        Self {
            content_type: ContentType::Episode,
            season: Some(season),
            episode: Some(episode),
            ..Self::movie(title, languages)
        }
    }

    pub fn with_year(mut self, year: u16) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_file_hash(mut self, hash: impl Into<String>) -> Self {
        self.file_hash = Some(hash.into());
        self
    }

    pub fn with_imdb_id(mut self, imdb_id: impl Into<String>) -> Self {
        self.imdb_id = Some(imdb_id.into());
        self
    }

    /// Check required fields; the error names what is missing
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title must not be blank".to_string());
        }
        if self.languages.iter().all(|l| l.trim().is_empty()) {
            return Err("at least one language is required".to_string());
        }
        Ok(())
    }

    /// Stable cache key for this request
    pub fn fingerprint(&self) -> String {
        let mut languages: Vec<String> = self.languages.iter().map(|l| l.trim().to_lowercase()).collect();
        languages.sort();
        languages.dedup();

        let canonical = format!(
            "{}|{}|{}|{}|{}|{}|{}|{}",
            self.title.trim().to_lowercase(),
            self.year.map(|y| y.to_string()).unwrap_or_default(),
            self.content_type,
            self.file_hash.as_deref().unwrap_or("").to_lowercase(),
            self.imdb_id.as_deref().unwrap_or("").to_lowercase(),
            self.season.map(|s| s.to_string()).unwrap_or_default(),
            self.episode.map(|e| e.to_string()).unwrap_or_default(),
            languages.join(","),
        );

        let digest = Sha256::digest(canonical.as_bytes());
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Query string parameters for the provider search endpoint
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(hash) = &self.file_hash {
            params.push(("hash", hash.clone()));
        }
        if let Some(imdb_id) = &self.imdb_id {
            params.push(("imdb_id", imdb_id.clone()));
        }
        params.push(("title", self.title.trim().to_string()));
        if let Some(year) = self.year {
            params.push(("year", year.to_string()));
        }
        if let Some(season) = self.season {
            params.push(("season", season.to_string()));
        }
        if let Some(episode) = self.episode {
            params.push(("episode", episode.to_string()));
        }
        params.push(("languages", self.languages.join(",")));
        params
    }
}

/// How confidently a result matches the requested content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchType {
    #[serde(alias = "hash", alias = "moviehash")]
    HashMatch,
    #[serde(alias = "imdb", alias = "imdbid", alias = "catalog")]
    CatalogMatch,
    #[serde(alias = "title", alias = "fulltext")]
    TitleMatch,
}

impl MatchType {
    /// Lower is better
    pub fn rank(&self) -> u8 {
        match self {
            Self::HashMatch => 0,
            Self::CatalogMatch => 1,
            Self::TitleMatch => 2,
        }
    }
}

/// One downloadable subtitle found by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub provider: String,
    pub language: String,
    pub language_name: Option<String>,
    pub format: SubtitleFormat,
    pub download_url: String,
    pub file_name: String,
    pub size: Option<u64>,
    pub download_count: Option<u64>,
    pub rating: Option<f32>,
    /// Confidence in `0.0..=1.0`
    pub match_score: f32,
    pub match_type: MatchType,
    pub is_verified: bool,
    pub hearing_impaired: bool,
    pub upload_date: Option<String>,
    pub uploader: Option<String>,
    pub release_group: Option<String>,
    pub version: Option<String>,
}

impl SearchResult {
    /// Minimal result, mostly for tests and mocks
    pub fn new(
        provider: impl Into<String>,
        id: impl Into<String>,
        language: impl Into<String>,
        match_type: MatchType,
        match_score: f32,
    ) -> Self {
        let id = id.into();
        Self {
            download_url: format!("https://subtitles.invalid/download/{}", id),
            file_name: format!("{}.srt", id),
            id,
            provider: provider.into(),
            language: language.into(),
            language_name: None,
            format: SubtitleFormat::Srt,
            size: None,
            download_count: None,
            rating: None,
            match_score: match_score.clamp(0.0, 1.0),
            match_type,
            is_verified: false,
            hearing_impaired: false,
            upload_date: None,
            uploader: None,
            release_group: None,
            version: None,
        }
    }
}

/// Common trait for all subtitle providers
///
/// Implementations perform exactly one attempt per call; retries, rate
/// limiting and health tracking belong to the orchestrator.
#[async_trait]
pub trait SubtitleProvider: Send + Sync + Debug {
    /// Stable provider identifier, e.g. `opensubtitles`
    fn id(&self) -> &str;

    /// Search for subtitles matching `request`
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>, ProviderError>;

    /// Download the raw subtitle file behind `result`
    async fn download(&self, result: &SearchResult) -> Result<Bytes, ProviderError>;

    /// Probe the provider's health endpoint
    async fn test_connection(&self) -> Result<(), ProviderError>;
}
