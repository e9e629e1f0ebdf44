/*!
 * Inline markup cleanup shared by all parsers.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use crate::cue::CueAlignment;

// @const: ASS override blocks such as {\i1} or {\an8\pos(10,10)}
static ASS_OVERRIDE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\\[^}]*\}").unwrap());

// @const: Any brace block, ASS files also use these as inline comments
static ASS_BRACE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[^}]*\}").unwrap());

// @const: HTML-ish tags (<b>, </i>, <font color=..>, <c.yellow>, <00:00:01.000>)
static HTML_TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?[A-Za-z0-9][^<>]*>").unwrap());

// @const: Alignment override, numpad (\an) or legacy (\a)
static ALIGNMENT_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\(an|a)(\d{1,2})").unwrap());

/// Normalise line endings and drop a leading byte order mark
pub fn normalize_content(content: &str) -> String {
    content
        .trim_start_matches('\u{feff}')
        .replace("\r\n", "\n")
        .replace('\r', "\n")
}

/// Strip inline markup down to plain text, keeping line breaks
pub fn strip_markup(text: &str) -> String {
    let text = ASS_OVERRIDE_REGEX.replace_all(text, "");
    let text = HTML_TAG_REGEX.replace_all(&text, "");
    let text = text
        .replace("\\N", "\n")
        .replace("\\n", "\n")
        .replace("\\h", " ");
    tidy_lines(&text)
}

/// Same as `strip_markup` but also removes `{comment}` blocks
pub fn strip_ass_markup(text: &str) -> String {
    let text = ASS_BRACE_REGEX.replace_all(text, "");
    strip_markup(&text)
}

/// Decode the handful of character references WebVTT allows
pub fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", "\u{a0}")
        .replace("&lrm;", "\u{200e}")
        .replace("&rlm;", "\u{200f}")
        .replace("&amp;", "&")
}

/// Alignment requested through an ASS override tag, if any
pub fn override_alignment(text: &str) -> Option<CueAlignment> {
    let caps = ALIGNMENT_REGEX.captures(text)?;
    let value: u8 = caps[2].parse().ok()?;
    if &caps[1] == "an" {
        return CueAlignment::from_numpad(value);
    }
    // Legacy SSA: 1-3 bottom, +4 top, +8 middle; low bits give the column
    match value & 0b11 {
        1 => Some(CueAlignment::Left),
        2 => Some(CueAlignment::Center),
        3 => Some(CueAlignment::Right),
        _ => None,
    }
}

/// Clock fields to milliseconds; `None` for out-of-range fields or overflow
pub fn clock_to_ms(hours: u64, minutes: u64, seconds: u64, millis: u64) -> Option<u64> {
    if minutes >= 60 || seconds >= 60 || millis >= 1_000 {
        return None;
    }
    hours
        .checked_mul(3_600_000)?
        .checked_add(minutes * 60_000 + seconds * 1_000 + millis)
}

fn tidy_lines(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').map(str::trim_end).collect();
    lines.join("\n").trim().to_string()
}
