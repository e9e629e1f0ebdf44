/*!
 * Common test utilities for the subcue test suite
 */

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use tempfile::TempDir;

use subcue::dispatcher::{ContentFetcher, FetchedContent, SubtitleParserDispatcher};
use subcue::errors::FetchError;
use subcue::orchestrator::RetryPolicy;

pub const SRT_SAMPLE: &str = "1
00:00:01,000 --> 00:00:04,000
This is a test subtitle.

2
00:00:05,000 --> 00:00:09,000
It contains <i>multiple</i> entries.

3
00:00:08,500 --> 00:00:14,000
For testing purposes.
";

pub const VTT_SAMPLE: &str = "WEBVTT

00:01.000 --> 00:04.000 align:start position:10%
Hello

cue-2
00:00:05.000 --> 00:00:09.000
<v Bob>World</v>
";

pub const ASS_SAMPLE: &str = "[Script Info]
Title: Sample
ScriptType: v4.00+

[V4+ Styles]
Format: Name, Fontname, Fontsize, PrimaryColour
Style: Default,Arial,20,&H00FFFFFF

[Events]
Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text
Dialogue: 0,0:00:01.00,0:00:04.00,Default,,0,0,0,,{\\an8}Top line
Dialogue: 0,0:00:05.00,broken,Default,,0,0,0,,Skipped
Dialogue: 0,0:00:06.00,0:00:09.00,Default,,0,0,0,,Second\\Nline
";

/// Route library logs to the test output once; `RUST_LOG` picks the level
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Retry policy that keeps tests fast
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(1),
        attempt_timeout: Duration::from_millis(100),
    }
}

/// In-memory fetcher serving fixed bodies per URL
#[derive(Debug, Default)]
pub struct MapFetcher {
    bodies: HashMap<String, Bytes>,
    delay: Duration,
    calls: AtomicUsize,
}

impl MapFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, url: &str, body: impl Into<Bytes>) -> Self {
        self.bodies.insert(url.to_string(), body.into());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentFetcher for MapFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedContent, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.bodies
            .get(url)
            .map(|bytes| FetchedContent { bytes: bytes.clone(), content_type: None })
            .ok_or_else(|| FetchError::Http { status: 404, url: url.to_string() })
    }
}

/// Dispatcher over a shared `MapFetcher`
pub fn dispatcher(fetcher: &Arc<MapFetcher>) -> SubtitleParserDispatcher {
    SubtitleParserDispatcher::new(fetcher.clone())
}
