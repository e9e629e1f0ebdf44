/*!
 * Parser dispatch and remote content loading.
 *
 * The dispatcher picks a parser from a format hint, the URL extension or,
 * as a last resort, by sniffing the fetched content. Byte transport is
 * delegated to a `ContentFetcher`; parsing runs on tokio's blocking pool so
 * callers on the playback thread are never stalled.
 */

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, warn};
use reqwest::Client;
use url::Url;

use crate::cue::{SubtitleFormat, Track};
use crate::errors::{FetchError, LoadError, ParseError};
use crate::parsers;

// @const: Extensions of subtitle formats we know and do not support
const UNSUPPORTED_EXTENSIONS: [&str; 10] = ["sub", "idx", "sup", "smi", "sami", "ttml", "dfxp", "scc", "stl", "lrc"];

/// Raw bytes returned by a fetcher
#[derive(Debug, Clone)]
pub struct FetchedContent {
    pub bytes: Bytes,
    /// `Content-Type` header, when the transport has one
    pub content_type: Option<String>,
}

/// Transport used to retrieve subtitle resources
#[async_trait]
pub trait ContentFetcher: Send + Sync + Debug {
    /// Fetch the resource at `url`
    async fn fetch(&self, url: &str) -> Result<FetchedContent, FetchError>;
}

/// Fetcher for `http(s)://`, `file://` and bare local paths
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            timeout,
        }
    }

    async fn fetch_local(&self, path: std::path::PathBuf) -> Result<FetchedContent, FetchError> {
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| FetchError::Request(format!("Failed to read {}: {}", path.display(), e)))?;
        Ok(FetchedContent { bytes: Bytes::from(bytes), content_type: None })
    }

    async fn fetch_remote(&self, url: &str) -> Result<FetchedContent, FetchError> {
        let response = self.client.get(url).send().await.map_err(|e| self.map_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http { status: status.as_u16(), url: url.to_string() });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(|e| self.map_error(e))?;
        Ok(FetchedContent { bytes, content_type })
    }

    fn map_error(&self, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Request(error.to_string())
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedContent, FetchError> {
        let fetch = async {
            match Url::parse(url) {
                Ok(parsed) if parsed.scheme() == "file" => {
                    let path = parsed
                        .to_file_path()
                        .map_err(|_| FetchError::Request(format!("Invalid file URL: {}", url)))?;
                    self.fetch_local(path).await
                }
                Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => self.fetch_remote(url).await,
                Ok(parsed) => Err(FetchError::Request(format!("Unsupported URL scheme: {}", parsed.scheme()))),
                // No scheme at all: treat it as a path on disk
                Err(url::ParseError::RelativeUrlWithoutBase) => self.fetch_local(url.into()).await,
                Err(e) => Err(FetchError::Request(format!("Invalid URL {}: {}", url, e))),
            }
        };

        tokio::time::timeout(self.timeout, fetch)
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))?
    }
}

/// Result of a dispatcher load
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Success(Track),
    Error(LoadError),
}

impl LoadOutcome {
    pub fn into_result(self) -> Result<Track, LoadError> {
        match self {
            Self::Success(track) => Ok(track),
            Self::Error(error) => Err(error),
        }
    }
}

/// Selects parsers, fetches and decodes subtitle resources
#[derive(Debug, Clone)]
pub struct SubtitleParserDispatcher {
    fetcher: Arc<dyn ContentFetcher>,
    default_encoding: String,
}

impl SubtitleParserDispatcher {
    pub fn new(fetcher: Arc<dyn ContentFetcher>) -> Self {
        Self {
            fetcher,
            default_encoding: "utf-8".to_string(),
        }
    }

    pub fn with_default_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.default_encoding = encoding.into();
        self
    }

    /// Formats this dispatcher can parse
    pub fn supported_formats() -> Vec<SubtitleFormat> {
        SubtitleFormat::ALL.to_vec()
    }

    /// Resolve the parser format before any I/O.
    ///
    /// Returns `Ok(None)` when neither the hint nor the URL say anything and the
    /// content has to be sniffed after fetching.
    pub fn resolve_format(url: &str, hint: Option<&str>) -> Result<Option<SubtitleFormat>, LoadError> {
        if let Some(hint) = hint.map(str::trim).filter(|h| !h.is_empty()) {
            return SubtitleFormat::from_extension(hint)
                .or_else(|| SubtitleFormat::from_mime_type(hint))
                .map(Some)
                .ok_or_else(|| LoadError::UnsupportedFormat(hint.to_string()));
        }

        if let Some(format) = SubtitleFormat::from_url(url) {
            return Ok(Some(format));
        }

        let path = url.split(['?', '#']).next().unwrap_or(url);
        if let Some(ext) = std::path::Path::new(path).extension().and_then(|e| e.to_str()) {
            let ext = ext.to_lowercase();
            if UNSUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
                return Err(LoadError::UnsupportedFormat(ext));
            }
        }
        Ok(None)
    }

    /// Parse already decoded text synchronously
    pub fn parse_content(content: &str, format: SubtitleFormat) -> Result<Track, ParseError> {
        parsers::parse(format, content)
    }

    /// Parse on the blocking pool
    pub async fn parse_in_background(content: String, format: SubtitleFormat) -> Result<Track, LoadError> {
        tokio::task::spawn_blocking(move || parsers::parse(format, &content))
            .await
            .map_err(|_| LoadError::Cancelled)?
            .map_err(LoadError::from)
    }

    /// Decode, detect and parse text that is already in memory
    pub async fn parse_bytes(
        &self,
        bytes: &[u8],
        format: Option<SubtitleFormat>,
        encoding: Option<&str>,
        content_type: Option<&str>,
    ) -> Result<Track, LoadError> {
        let label = encoding
            .map(str::to_string)
            .or_else(|| content_type.and_then(charset_from_content_type))
            .unwrap_or_else(|| self.default_encoding.clone());
        let (text, used_encoding) = decode(bytes, &label)?;

        let format = match format {
            Some(format) => format,
            None => SubtitleFormat::detect(&text)
                .ok_or_else(|| LoadError::UnsupportedFormat("unrecognised subtitle content".to_string()))?,
        };

        let track = Self::parse_in_background(text, format).await?;
        Ok(track.with_encoding(used_encoding))
    }

    /// Fetch `url`, decode it and run the matching parser
    pub async fn load(&self, url: &str, format_hint: Option<&str>, encoding: Option<&str>) -> LoadOutcome {
        let format = match Self::resolve_format(url, format_hint) {
            Ok(format) => format,
            Err(e) => {
                warn!("Rejecting {}: {}", url, e);
                return LoadOutcome::Error(e);
            }
        };

        debug!("Fetching subtitle from {}", url);
        let content = match self.fetcher.fetch(url).await {
            Ok(content) => content,
            Err(e) => return LoadOutcome::Error(LoadError::Fetch(e)),
        };

        match self
            .parse_bytes(&content.bytes, format, encoding, content.content_type.as_deref())
            .await
        {
            Ok(track) => {
                debug!("Parsed {} cues ({}) from {}", track.len(), track.format(), url);
                LoadOutcome::Success(track)
            }
            Err(e) => LoadOutcome::Error(e),
        }
    }
}

fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        (key.trim().eq_ignore_ascii_case("charset")).then(|| value.trim().trim_matches('"').to_string())
    })
}

/// Decode `bytes` using `label`; a byte order mark always wins over the label
pub fn decode(bytes: &[u8], label: &str) -> Result<(String, String), FetchError> {
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return Ok((String::from_utf8_lossy(rest).into_owned(), "utf-8".to_string()));
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        return Ok((decode_utf16(rest, u16::from_le_bytes), "utf-16le".to_string()));
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        return Ok((decode_utf16(rest, u16::from_be_bytes), "utf-16be".to_string()));
    }

    let normalized = label.trim().to_lowercase();
    let text = match normalized.as_str() {
        "utf-8" | "utf8" | "us-ascii" | "ascii" => String::from_utf8_lossy(bytes).into_owned(),
        "utf-16" | "utf-16le" | "utf16le" => decode_utf16(bytes, u16::from_le_bytes),
        "utf-16be" | "utf16be" => decode_utf16(bytes, u16::from_be_bytes),
        // Latin-1 maps each byte onto the code point of the same value;
        // cp1252 only differs in the 0x80-0x9F printable range.
        "iso-8859-1" | "latin1" | "latin-1" | "windows-1252" | "cp1252" => bytes.iter().map(|&b| b as char).collect(),
        _ => return Err(FetchError::UnsupportedEncoding(label.to_string())),
    };
    Ok((text, normalized))
}

fn decode_utf16(bytes: &[u8], to_unit: fn([u8; 2]) -> u16) -> String {
    let units: Vec<u16> = bytes.chunks_exact(2).map(|pair| to_unit([pair[0], pair[1]])).collect();
    String::from_utf16_lossy(&units)
}
