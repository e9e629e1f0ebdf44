/*!
 * WebVTT parser.
 *
 * Header metadata, `NOTE`, `STYLE` and `REGION` blocks are skipped. Cue
 * settings are normalised into fractions so every format exposes the same
 * placement model.
 */

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use super::{markup, no_cues, split_blocks, Block};
use crate::cue::{Cue, CueAlignment, CuePosition, SubtitleFormat, Track, VerticalMode};
use crate::errors::ParseError;

// @const: Cue timing with optional hour field and trailing settings
static TIMING_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^((?:\d+:)?\d{2}:\d{2}\.\d{3})\s*-->\s*((?:\d+:)?\d{2}:\d{2}\.\d{3})(.*)$").unwrap()
});

/// Number of rows integer `line:` values are measured against
pub const LINE_GRID: f32 = 20.0;

const FORMAT: SubtitleFormat = SubtitleFormat::Vtt;

/// Parse WebVTT text into a track
pub fn parse(content: &str) -> Result<Track, ParseError> {
    let content = markup::normalize_content(content);
    if content.trim().is_empty() {
        return Err(no_cues(FORMAT));
    }

    let first_line = content.split('\n').next().unwrap_or("");
    if !is_signature(first_line) {
        return Err(ParseError::at_line(FORMAT, 1, "Invalid VTT file: missing WEBVTT signature"));
    }

    let mut cues = Vec::new();
    // The first block is the signature plus optional header lines
    for block in split_blocks(&content).into_iter().skip(1) {
        if is_ignored_block(block.lines[0]) {
            continue;
        }
        if let Some(cue) = parse_cue_block(&block)? {
            cues.push(cue);
        }
    }

    if cues.is_empty() {
        return Err(no_cues(FORMAT));
    }
    Ok(Track::new(FORMAT, cues))
}

fn is_signature(line: &str) -> bool {
    match line.strip_prefix("WEBVTT") {
        Some(rest) => rest.is_empty() || rest.starts_with(' ') || rest.starts_with('\t'),
        None => false,
    }
}

fn is_ignored_block(first: &str) -> bool {
    ["NOTE", "STYLE", "REGION"].iter().any(|keyword| {
        first
            .strip_prefix(keyword)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(' ') || rest.starts_with('\t'))
    })
}

fn parse_cue_block(block: &Block<'_>) -> Result<Option<Cue>, ParseError> {
    // An identifier line may precede the timing line
    let timing_idx = match block.lines.get(1) {
        Some(next) if !block.lines[0].contains("-->") && next.contains("-->") => 1,
        _ => 0,
    };
    let timing_line_no = block.first_line + timing_idx;
    let timing = block
        .lines
        .get(timing_idx)
        .ok_or_else(|| ParseError::at_line(FORMAT, block.first_line, "Invalid timing format"))?;

    let caps = TIMING_REGEX
        .captures(timing.trim())
        .ok_or_else(|| ParseError::at_line(FORMAT, timing_line_no, "Invalid timing format"))?;
    let start_ms = parse_timestamp(&caps[1])
        .ok_or_else(|| ParseError::at_line(FORMAT, timing_line_no, "Invalid timing format"))?;
    let end_ms = parse_timestamp(&caps[2])
        .ok_or_else(|| ParseError::at_line(FORMAT, timing_line_no, "Invalid timing format"))?;
    if end_ms <= start_ms {
        return Err(ParseError::at_line(FORMAT, timing_line_no, "End time must be after start time"));
    }

    let text_lines = &block.lines[timing_idx + 1..];
    let text = markup::decode_entities(&markup::strip_markup(&text_lines.join("\n")));
    let placement = parse_settings(&caps[3]);

    match Cue::new(start_ms, end_ms, text) {
        Some(cue) => Ok(Some(cue.with_placement(placement))),
        None => {
            debug!("Skipping VTT cue at line {} with empty text", timing_line_no);
            Ok(None)
        }
    }
}

/// Parse `HH:MM:SS.mmm` or `MM:SS.mmm`
fn parse_timestamp(value: &str) -> Option<u64> {
    let (clock, millis) = value.split_once('.')?;
    let parts: Vec<u64> = clock.split(':').map(|p| p.parse().ok()).collect::<Option<_>>()?;
    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (*h, *m, *s),
        [m, s] => (0, *m, *s),
        _ => return None,
    };
    let millis: u64 = millis.parse().ok()?;
    markup::clock_to_ms(hours, minutes, seconds, millis)
}

fn parse_settings(settings: &str) -> CuePosition {
    let mut placement = CuePosition::default();
    for setting in settings.split_whitespace() {
        let Some((key, value)) = setting.split_once(':') else {
            continue;
        };
        // Drop alignment suffixes like "50%,line-left"
        let value = value.split(',').next().unwrap_or(value);
        match key {
            "position" => placement.position = parse_percentage(value),
            "size" => placement.size = parse_percentage(value),
            "line" => placement.line = parse_line(value),
            "align" => placement.alignment = CueAlignment::from_vtt(value),
            "vertical" => {
                placement.vertical = match value {
                    "rl" => Some(VerticalMode::Rl),
                    "lr" => Some(VerticalMode::Lr),
                    _ => None,
                }
            }
            _ => debug!("Ignoring unknown VTT cue setting '{}'", key),
        }
    }
    placement
}

fn parse_percentage(value: &str) -> Option<f32> {
    let number: f32 = value.strip_suffix('%')?.parse().ok().filter(|n: &f32| n.is_finite())?;
    Some((number / 100.0).clamp(0.0, 1.0))
}

/// `line:` accepts a percentage or a line number on a fixed grid
fn parse_line(value: &str) -> Option<f32> {
    if value.ends_with('%') {
        return parse_percentage(value);
    }
    let line: i32 = value.parse().ok()?;
    let fraction = if line < 0 {
        1.0 + line as f32 / LINE_GRID
    } else {
        line as f32 / LINE_GRID
    };
    Some(fraction.clamp(0.0, 1.0))
}
