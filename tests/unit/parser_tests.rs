/*!
 * Tests for subtitle parsing through the public dispatcher API
 */

use std::sync::Arc;

use subcue::cue::{CueAlignment, SubtitleFormat, Track};
use subcue::dispatcher::SubtitleParserDispatcher;
use subcue::errors::LoadError;
use subcue::parsers::NO_CUES_MESSAGE;

use crate::common::{ASS_SAMPLE, MapFetcher, SRT_SAMPLE, VTT_SAMPLE, dispatcher};

fn assert_well_formed(track: &Track) {
    assert!(!track.is_empty());
    for pair in track.cues().windows(2) {
        assert!(pair[0].start_ms() <= pair[1].start_ms(), "cues out of order");
    }
    for cue in track.cues() {
        assert!(cue.start_ms() < cue.end_ms());
        assert!(!cue.text().trim().is_empty());
    }
}

#[test]
fn test_parseContent_withEverySample_shouldProduceSortedValidCues() {
    for (format, content, expected) in [
        (SubtitleFormat::Srt, SRT_SAMPLE, 3),
        (SubtitleFormat::Vtt, VTT_SAMPLE, 2),
        (SubtitleFormat::Ass, ASS_SAMPLE, 2),
    ] {
        let track = SubtitleParserDispatcher::parse_content(content, format).unwrap();
        assert_eq!(track.len(), expected, "{}", format);
        assert_well_formed(&track);
    }
}

#[test]
fn test_parseContent_srtWithTags_shouldStripMarkup() {
    let track = SubtitleParserDispatcher::parse_content(SRT_SAMPLE, SubtitleFormat::Srt).unwrap();
    assert_eq!(track.cues()[1].text(), "It contains multiple entries.");
}

#[test]
fn test_parseContent_vttWithSettings_shouldKeepPlacement() {
    let track = SubtitleParserDispatcher::parse_content(VTT_SAMPLE, SubtitleFormat::Vtt).unwrap();
    let first = &track.cues()[0];
    assert_eq!(first.placement().alignment, Some(CueAlignment::Start));
    assert!((first.placement().position.unwrap() - 0.1).abs() < 1e-6);
    assert_eq!(track.cues()[1].text(), "World");
}

#[test]
fn test_parseContent_assWithBrokenLine_shouldSkipOnlyThatLine() {
    let track = SubtitleParserDispatcher::parse_content(ASS_SAMPLE, SubtitleFormat::Ass).unwrap();
    assert_eq!(track.title(), Some("Sample"));
    assert_eq!(track.cues()[0].placement().alignment, Some(CueAlignment::Center));
    assert_eq!(track.cues()[1].text(), "Second\nline");
}

#[test]
fn test_parseContent_srtWithOneBrokenBlock_shouldFailWholeParse() {
    let broken = SRT_SAMPLE.replace("00:00:05,000 --> 00:00:09,000", "00:00:05 -> 00:00:09");
    let error = SubtitleParserDispatcher::parse_content(&broken, SubtitleFormat::Srt).unwrap_err();
    assert_eq!(error.format, SubtitleFormat::Srt);
    assert!(error.line_number.is_some());
}

#[test]
fn test_parseContent_withEmptyInput_shouldReportNoCues() {
    for format in SubtitleFormat::ALL {
        let error = SubtitleParserDispatcher::parse_content("  \n\n", format).unwrap_err();
        assert_eq!(error.message, NO_CUES_MESSAGE);
    }
}

#[tokio::test]
async fn test_load_withMimeHint_shouldOverrideExtension() {
    let fetcher = Arc::new(MapFetcher::new().with_body("https://cdn.test/subs.txt", VTT_SAMPLE));
    let track = dispatcher(&fetcher)
        .load("https://cdn.test/subs.txt", Some("text/vtt"), None)
        .await
        .into_result()
        .unwrap();
    assert_eq!(track.format(), SubtitleFormat::Vtt);
}

#[tokio::test]
async fn test_load_withUnknownHint_shouldFailBeforeFetching() {
    let fetcher = Arc::new(MapFetcher::new());
    let error = dispatcher(&fetcher)
        .load("https://cdn.test/a.srt", Some("application/pdf"), None)
        .await
        .into_result()
        .unwrap_err();
    assert!(matches!(error, LoadError::UnsupportedFormat(_)));
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn test_load_withMissingResource_shouldReturnFetchError() {
    let fetcher = Arc::new(MapFetcher::new());
    let error = dispatcher(&fetcher)
        .load("https://cdn.test/a.srt", None, None)
        .await
        .into_result()
        .unwrap_err();
    assert!(matches!(error, LoadError::Fetch(_)));
    assert_eq!(fetcher.calls(), 1);
}

#[test]
fn test_supportedFormats_shouldListAllParsers() {
    let formats = SubtitleParserDispatcher::supported_formats();
    assert!(formats.contains(&SubtitleFormat::Srt));
    assert!(formats.contains(&SubtitleFormat::Vtt));
    assert!(formats.contains(&SubtitleFormat::Ass));
    assert!(formats.contains(&SubtitleFormat::Ssa));
}

#[test]
fn test_parseContent_vttWithHugeHours_shouldRejectTiming() {
    let content = "WEBVTT\n\n99999999999999:00:00.000 --> 99999999999999:00:01.000\nx\n";
    let error = SubtitleParserDispatcher::parse_content(content, SubtitleFormat::Vtt).unwrap_err();
    assert_eq!(error.message, "Invalid timing format");
    assert_eq!(error.line_number, Some(3));
}

#[test]
fn test_parseContent_assWithHugeHours_shouldSkipOnlyThatLine() {
    let content = "[Script Info]\nTitle: Overflow\n\n[Events]\n\
Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n\
Dialogue: 0,99999999999999:00:00.00,99999999999999:00:01.00,Default,,0,0,0,,Too late\n\
Dialogue: 0,0:00:01.00,0:00:02.00,Default,,0,0,0,,Kept\n";
    let track = SubtitleParserDispatcher::parse_content(content, SubtitleFormat::Ass).unwrap();
    assert_eq!(track.len(), 1);
    assert_eq!(track.cues()[0].text(), "Kept");
}

/// xorshift64, enough to spread malformed inputs deterministically
struct Scrambler(u64);

impl Scrambler {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[(self.next() % items.len() as u64) as usize]
    }
}

const FRAGMENTS: &[&str] = &[
    "WEBVTT", "[Script Info]", "[Events]", "[V4+ Styles]", "Format: Layer, Start, End, Text",
    "Format: Start, End, Style, Text", "Dialogue: ", "Comment: ", "Style: Default,Arial,&H00FF00FF",
    "NOTE", "1", "42", "-1", "00:00:01,000", "00:00:02.500", "0:00:03.00", "99:59:59.999",
    "99999999999999999:00:00.000", "18446744073709551615", "-->", "->", " --> ", ",", ".", ":",
    "<i>", "</b>", "{\\an8}", "{\\a6}", "\\N", "&amp;", "text", "position:50%", "line:-3",
    "line:nan%", "size:1e40%", "\u{feff}", "\r\n", "\n", "\n\n", " ", "\t",
];

fn mutations(sample: &str) -> Vec<String> {
    let mut inputs = Vec::new();
    // Every truncation point
    for (idx, _) in sample.char_indices() {
        inputs.push(sample[..idx].to_string());
    }
    let lines: Vec<&str> = sample.lines().collect();
    for skip in 0..lines.len() {
        let mut dropped = lines.clone();
        dropped.remove(skip);
        inputs.push(dropped.join("\n"));

        let mut doubled = lines.clone();
        doubled.insert(skip, lines[skip]);
        inputs.push(doubled.join("\n"));
    }
    for (idx, ch) in sample.char_indices() {
        if ch.is_ascii_digit() {
            inputs.push(format!("{}99999999999999999999{}", &sample[..idx], &sample[idx + 1..]));
            inputs.push(format!("{}0{}", &sample[..idx], &sample[idx + 1..]));
        }
    }
    inputs.push(sample.replace("-->", "->"));
    inputs.push(sample.replace(',', "."));
    inputs.push(sample.replace('.', ","));
    inputs.push(sample.replace('\n', "\r"));
    inputs
}

fn assert_parse_is_safe(format: SubtitleFormat, input: &str) {
    if let Ok(track) = SubtitleParserDispatcher::parse_content(input, format) {
        for pair in track.cues().windows(2) {
            assert!(pair[0].start_ms() <= pair[1].start_ms(), "cues out of order for {:?}", input);
        }
        for cue in track.cues() {
            assert!(cue.start_ms() < cue.end_ms(), "empty interval for {:?}", input);
            assert!(!cue.text().trim().is_empty(), "blank cue for {:?}", input);
        }
    }
}

#[test]
fn test_parseContent_withMutatedSamples_shouldNeverPanicAndKeepCuesValid() {
    for sample in [SRT_SAMPLE, VTT_SAMPLE, ASS_SAMPLE] {
        for input in mutations(sample) {
            for format in SubtitleFormat::ALL {
                assert_parse_is_safe(format, &input);
            }
        }
    }
}

#[test]
fn test_parseContent_withGeneratedGarbage_shouldNeverPanicAndKeepCuesValid() {
    let mut scrambler = Scrambler(0x9E37_79B9_7F4A_7C15);
    for _ in 0..2_000 {
        let length = 1 + scrambler.next() % 40;
        let input: String = (0..length).map(|_| scrambler.pick(FRAGMENTS)).collect();
        for format in SubtitleFormat::ALL {
            assert_parse_is_safe(format, &input);
        }
    }
}
