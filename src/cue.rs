/*!
 * Cue model.
 *
 * Immutable value types shared by every other module: a single timed cue,
 * the parsed track that owns them, the subtitle format tag and the
 * descriptor of a subtitle the player can select.
 */

use std::fmt;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

// @const: Loose SRT timing line used for format sniffing
static SRT_SNIFF_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*\d{1,2}:\d{2}:\d{2},\d{3}\s*-->").unwrap()
});

/// Subtitle wire formats understood by the parsers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleFormat {
    /// SubRip
    Srt,
    /// WebVTT
    Vtt,
    /// Advanced SubStation Alpha
    Ass,
    /// SubStation Alpha (v4)
    Ssa,
}

impl SubtitleFormat {
    /// All formats, in the order they are advertised to callers
    pub const ALL: [SubtitleFormat; 4] = [
        SubtitleFormat::Srt,
        SubtitleFormat::Vtt,
        SubtitleFormat::Ass,
        SubtitleFormat::Ssa,
    ];

    // @returns: Canonical file extension without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Srt => "srt",
            Self::Vtt => "vtt",
            Self::Ass => "ass",
            Self::Ssa => "ssa",
        }
    }

    // @returns: MIME type commonly served for the format
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Srt => "application/x-subrip",
            Self::Vtt => "text/vtt",
            Self::Ass | Self::Ssa => "text/x-ssa",
        }
    }

    /// Resolve a format from a file extension (case-insensitive, dot optional)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim().trim_start_matches('.').to_lowercase().as_str() {
            "srt" => Some(Self::Srt),
            "vtt" | "webvtt" => Some(Self::Vtt),
            "ass" => Some(Self::Ass),
            "ssa" => Some(Self::Ssa),
            _ => None,
        }
    }

    /// Resolve a format from a MIME type, ignoring parameters such as charset
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_lowercase();
        match essence.as_str() {
            "application/x-subrip" | "text/srt" | "application/srt" => Some(Self::Srt),
            "text/vtt" => Some(Self::Vtt),
            "text/x-ssa" | "text/x-ass" | "application/x-ass" => Some(Self::Ass),
            _ => None,
        }
    }

    /// Resolve a format from the path component of a URL or file name
    pub fn from_url(url: &str) -> Option<Self> {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Guess the format by looking at the content itself
    pub fn detect(content: &str) -> Option<Self> {
        let trimmed = content.trim_start_matches('\u{feff}').trim_start();
        if trimmed.starts_with("WEBVTT") {
            return Some(Self::Vtt);
        }
        if trimmed.contains("[V4 Styles]") {
            return Some(Self::Ssa);
        }
        if trimmed.contains("[Script Info]") || trimmed.contains("[Events]") {
            return Some(Self::Ass);
        }
        if SRT_SNIFF_REGEX.is_match(trimmed) {
            return Some(Self::Srt);
        }
        None
    }
}

impl fmt::Display for SubtitleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Srt => "SRT",
            Self::Vtt => "VTT",
            Self::Ass => "ASS",
            Self::Ssa => "SSA",
        };
        write!(f, "{}", name)
    }
}

/// Horizontal alignment of a cue box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CueAlignment {
    Start,
    Center,
    End,
    Left,
    Right,
}

impl CueAlignment {
    /// Parse a WebVTT `align:` value
    pub fn from_vtt(value: &str) -> Option<Self> {
        match value {
            "start" => Some(Self::Start),
            "center" | "middle" => Some(Self::Center),
            "end" => Some(Self::End),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    /// Map an ASS numpad alignment (`\an1`..`\an9`) onto a horizontal alignment
    pub fn from_numpad(value: u8) -> Option<Self> {
        match value {
            1 | 4 | 7 => Some(Self::Left),
            2 | 5 | 8 => Some(Self::Center),
            3 | 6 | 9 => Some(Self::Right),
            _ => None,
        }
    }
}

/// Vertical writing direction from WebVTT `vertical:`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalMode {
    /// Right to left columns
    Rl,
    /// Left to right columns
    Lr,
}

/// Optional cue box placement; fractional values are in `0.0..=1.0`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CuePosition {
    pub position: Option<f32>,
    pub line: Option<f32>,
    pub size: Option<f32>,
    pub alignment: Option<CueAlignment>,
    pub vertical: Option<VerticalMode>,
}

impl CuePosition {
    // @returns: True when no placement hint is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A timed span of text shown during playback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    start_ms: u64,
    end_ms: u64,
    text: String,
    placement: CuePosition,
    text_color: Option<u32>,
    background_color: Option<u32>,
    window_color: Option<u32>,
}

impl Cue {
    // @creates: Cue with validated timing and text
    // @returns: None when end <= start or the text is blank
    pub fn new(start_ms: u64, end_ms: u64, text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        if end_ms <= start_ms || text.trim().is_empty() {
            return None;
        }
        Some(Self {
            start_ms,
            end_ms,
            text,
            placement: CuePosition::default(),
            text_color: None,
            background_color: None,
            window_color: None,
        })
    }

    pub fn with_placement(mut self, placement: CuePosition) -> Self {
        self.placement = placement;
        self
    }

    pub fn with_text_color(mut self, argb: Option<u32>) -> Self {
        self.text_color = argb;
        self
    }

    pub fn with_background_color(mut self, argb: Option<u32>) -> Self {
        self.background_color = argb;
        self
    }

    pub fn with_window_color(mut self, argb: Option<u32>) -> Self {
        self.window_color = argb;
        self
    }

    pub fn start_ms(&self) -> u64 {
        self.start_ms
    }

    pub fn end_ms(&self) -> u64 {
        self.end_ms
    }

    pub fn duration_ms(&self) -> u64 {
        self.end_ms - self.start_ms
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn placement(&self) -> &CuePosition {
        &self.placement
    }

    pub fn text_color(&self) -> Option<u32> {
        self.text_color
    }

    pub fn background_color(&self) -> Option<u32> {
        self.background_color
    }

    pub fn window_color(&self) -> Option<u32> {
        self.window_color
    }

    /// Whether the cue is on screen at `position_ms` (both bounds inclusive)
    pub fn contains(&self, position_ms: u64) -> bool {
        self.start_ms <= position_ms && position_ms <= self.end_ms
    }
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} --> {}] {}",
            format_timestamp(self.start_ms),
            format_timestamp(self.end_ms),
            self.text.replace('\n', " / ")
        )
    }
}

/// Format milliseconds as `HH:MM:SS.mmm`
pub fn format_timestamp(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1_000;
    let millis = ms % 1_000;
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
}

/// The ordered cues parsed from one subtitle resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    format: SubtitleFormat,
    language: Option<String>,
    title: Option<String>,
    encoding: String,
    cues: Vec<Cue>,
    max_cue_duration_ms: u64,
}

impl Track {
    /// Build a track; cues are stably sorted by start time here and never again
    pub fn new(format: SubtitleFormat, mut cues: Vec<Cue>) -> Self {
        cues.sort_by_key(|cue| cue.start_ms);
        let max_cue_duration_ms = cues.iter().map(Cue::duration_ms).max().unwrap_or(0);
        Self {
            format,
            language: None,
            title: None,
            encoding: "utf-8".to_string(),
            cues,
            max_cue_duration_ms,
        }
    }

    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    pub fn format(&self) -> SubtitleFormat {
        self.format
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    /// Longest single cue, used to bound overlap scans
    pub fn max_cue_duration_ms(&self) -> u64 {
        self.max_cue_duration_ms
    }

    /// End time of the last cue to finish
    pub fn duration_ms(&self) -> u64 {
        self.cues.iter().map(Cue::end_ms).max().unwrap_or(0)
    }
}

/// A subtitle the user can pick, either fetched from a URL or muxed in the stream
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AvailableSubtitle {
    pub id: String,
    pub language: Option<String>,
    pub label: String,
    pub url: Option<String>,
    pub mime_type: String,
    pub is_embedded: bool,
}

impl AvailableSubtitle {
    // @creates: Descriptor for a remote subtitle; the URL doubles as id
    pub fn external(
        url: impl Into<String>,
        language: Option<String>,
        label: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        let url = url.into();
        Self {
            id: url.clone(),
            language,
            label: label.into(),
            url: Some(url),
            mime_type: mime_type.into(),
            is_embedded: false,
        }
    }

    // @creates: Descriptor for an in-stream track at `index`
    pub fn embedded(index: usize, language: Option<String>, label: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            id: format!("embedded:{}", index),
            language,
            label: label.into(),
            url: None,
            mime_type: mime_type.into(),
            is_embedded: true,
        }
    }

    // @returns: Stream index for embedded tracks
    pub fn embedded_index(&self) -> Option<usize> {
        self.id.strip_prefix("embedded:").and_then(|idx| idx.parse().ok())
    }
}
