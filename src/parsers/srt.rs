/*!
 * SubRip (.srt) parser.
 */

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use super::{markup, no_cues, split_blocks};
use crate::cue::{Cue, SubtitleFormat, Track};
use crate::errors::ParseError;

// @const: SRT timing line, tolerant of missing spaces around the arrow
static TIMING_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,3}):(\d{2}):(\d{2}),(\d{3})\s*-->\s*(\d{1,3}):(\d{2}):(\d{2}),(\d{3})(?:\s.*)?$").unwrap()
});

const FORMAT: SubtitleFormat = SubtitleFormat::Srt;

/// Parse SubRip text into a track
pub fn parse(content: &str) -> Result<Track, ParseError> {
    let content = markup::normalize_content(content);
    let mut cues = Vec::new();

    for block in split_blocks(&content) {
        let line_no = block.first_line;
        if block.lines.len() < 3 {
            return Err(ParseError::at_line(FORMAT, line_no, "Invalid SRT block: must have at least 3 lines"));
        }

        if block.lines[0].trim().parse::<u64>().is_err() {
            return Err(ParseError::at_line(FORMAT, line_no, "Invalid subtitle index"));
        }

        let (start_ms, end_ms) = parse_timing(block.lines[1].trim())
            .ok_or_else(|| ParseError::at_line(FORMAT, line_no + 1, "Invalid timing format"))?;
        if end_ms <= start_ms {
            return Err(ParseError::at_line(FORMAT, line_no + 1, "End time must be after start time"));
        }

        let text = markup::strip_markup(&block.lines[2..].join("\n"));
        match Cue::new(start_ms, end_ms, text) {
            Some(cue) => cues.push(cue),
            None => debug!("Skipping SRT block at line {} with empty text", line_no),
        }
    }

    if cues.is_empty() {
        return Err(no_cues(FORMAT));
    }
    Ok(Track::new(FORMAT, cues))
}

/// Parse a full `start --> end` line into milliseconds
fn parse_timing(line: &str) -> Option<(u64, u64)> {
    let caps = TIMING_REGEX.captures(line)?;
    let field = |i: usize| caps[i].parse::<u64>().ok();
    let start = markup::clock_to_ms(field(1)?, field(2)?, field(3)?, field(4)?)?;
    let end = markup::clock_to_ms(field(5)?, field(6)?, field(7)?, field(8)?)?;
    Some((start, end))
}
