/*!
 * Subtitle format parsers.
 *
 * Each parser is a pure function from raw text to a `Track`. They never panic
 * on malformed input: every failure is a `ParseError` carrying the format and,
 * where known, a 1-based line number.
 *
 * - `srt`: SubRip, any malformed block aborts the parse
 * - `vtt`: WebVTT, any malformed cue aborts the parse
 * - `ass`: ASS/SSA, malformed dialogue lines are skipped one by one
 */

use crate::cue::{SubtitleFormat, Track};
use crate::errors::ParseError;

pub mod ass;
pub mod markup;
pub mod srt;
pub mod vtt;

/// Message used whenever parsing ends with an empty cue list
pub const NO_CUES_MESSAGE: &str = "No valid subtitle cues found";

/// Parse `content` with the parser for `format`
pub fn parse(format: SubtitleFormat, content: &str) -> Result<Track, ParseError> {
    match format {
        SubtitleFormat::Srt => srt::parse(content),
        SubtitleFormat::Vtt => vtt::parse(content),
        SubtitleFormat::Ass | SubtitleFormat::Ssa => ass::parse(content),
    }
}

pub(crate) fn no_cues(format: SubtitleFormat) -> ParseError {
    ParseError::new(format, NO_CUES_MESSAGE)
}

/// A run of consecutive non-blank lines
#[derive(Debug)]
pub(crate) struct Block<'a> {
    /// 1-based line number of the first line in the block
    pub first_line: usize,
    pub lines: Vec<&'a str>,
}

/// Split normalised content into blank-line separated blocks
pub(crate) fn split_blocks(content: &str) -> Vec<Block<'_>> {
    let mut blocks = Vec::new();
    let mut current: Option<Block> = None;

    for (idx, line) in content.split('\n').enumerate() {
        if line.trim().is_empty() {
            if let Some(block) = current.take() {
                blocks.push(block);
            }
            continue;
        }
        current
            .get_or_insert_with(|| Block { first_line: idx + 1, lines: Vec::new() })
            .lines
            .push(line);
    }

    if let Some(block) = current {
        blocks.push(block);
    }
    blocks
}
