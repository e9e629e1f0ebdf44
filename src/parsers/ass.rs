/*!
 * Advanced SubStation Alpha / SubStation Alpha parser.
 *
 * Unlike SRT and WebVTT, a broken `Dialogue:` line only drops that line:
 * bad timestamps, reversed times or dialogue before any `Format:` line are
 * skipped and logged. Only a missing `[Events]` section or an empty result
 * fails the whole parse.
 */

use std::collections::HashMap;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use super::{markup, no_cues};
use crate::cue::{Cue, CuePosition, SubtitleFormat, Track};
use crate::errors::ParseError;

// @const: H:MM:SS.cc timestamp
static TIME_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+):(\d{2}):(\d{2})[.:](\d{2})$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    ScriptInfo,
    Styles,
    Events,
    Other,
}

/// Parser state accumulated while walking the file line by line
struct AssDocument {
    format: SubtitleFormat,
    title: Option<String>,
    language: Option<String>,
    saw_events: bool,
    style_fields: Vec<String>,
    style_colors: HashMap<String, u32>,
    event_fields: Option<Vec<String>>,
    cues: Vec<Cue>,
}

/// Parse ASS or SSA text into a track
pub fn parse(content: &str) -> Result<Track, ParseError> {
    let content = markup::normalize_content(content);
    if content.trim().is_empty() {
        return Err(no_cues(SubtitleFormat::Ass));
    }

    let mut doc = AssDocument {
        format: SubtitleFormat::Ass,
        title: None,
        language: None,
        saw_events: false,
        style_fields: Vec::new(),
        style_colors: HashMap::new(),
        event_fields: None,
        cues: Vec::new(),
    };
    let mut section = Section::Other;

    for (idx, raw_line) in content.split('\n').enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with(';') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            section = doc.enter_section(line);
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim_start();

        match section {
            Section::ScriptInfo => doc.script_info(key.trim(), value),
            Section::Styles => doc.style_line(key.trim(), value),
            Section::Events => doc.event_line(idx + 1, key.trim(), value),
            Section::Other => {}
        }
    }

    if !doc.saw_events {
        return Err(ParseError::new(doc.format, "No [Events] section found"));
    }
    if doc.cues.is_empty() {
        return Err(no_cues(doc.format));
    }

    Ok(Track::new(doc.format, doc.cues)
        .with_title(doc.title)
        .with_language(doc.language))
}

impl AssDocument {
    fn enter_section(&mut self, header: &str) -> Section {
        match header.to_ascii_lowercase().as_str() {
            "[script info]" => Section::ScriptInfo,
            "[v4+ styles]" => {
                self.format = SubtitleFormat::Ass;
                Section::Styles
            }
            "[v4 styles]" => {
                self.format = SubtitleFormat::Ssa;
                Section::Styles
            }
            "[events]" => {
                self.saw_events = true;
                Section::Events
            }
            _ => Section::Other,
        }
    }

    fn script_info(&mut self, key: &str, value: &str) {
        match key {
            "Title" if !value.is_empty() => self.title = Some(value.to_string()),
            "Language" if !value.is_empty() => self.language = Some(value.to_string()),
            _ => {}
        }
    }

    fn style_line(&mut self, key: &str, value: &str) {
        match key {
            "Format" => self.style_fields = split_format(value),
            "Style" => {
                let fields = if self.style_fields.is_empty() { default_style_fields() } else { self.style_fields.clone() };
                let values: Vec<&str> = value.splitn(fields.len(), ',').map(str::trim).collect();
                let lookup = |name: &str| fields.iter().position(|f| f == name).and_then(|i| values.get(i).copied());
                if let (Some(name), Some(color)) = (lookup("name"), lookup("primarycolour")) {
                    if let Some(argb) = parse_color(color) {
                        self.style_colors.insert(name.to_string(), argb);
                    }
                }
            }
            _ => {}
        }
    }

    fn event_line(&mut self, line_no: usize, key: &str, value: &str) {
        match key {
            "Format" => self.event_fields = Some(split_format(value)),
            "Dialogue" => {
                let Some(fields) = self.event_fields.as_ref() else {
                    debug!("Skipping dialogue at line {}: no Format line yet", line_no);
                    return;
                };
                match build_cue(fields, value, &self.style_colors) {
                    Ok(Some(cue)) => self.cues.push(cue),
                    Ok(None) => debug!("Skipping dialogue at line {}: empty text", line_no),
                    Err(reason) => debug!("Skipping dialogue at line {}: {}", line_no, reason),
                }
            }
            // Comment lines and anything else in [Events] carry no cues
            _ => {}
        }
    }
}

fn split_format(value: &str) -> Vec<String> {
    value.split(',').map(|f| f.trim().to_ascii_lowercase()).collect()
}

fn default_style_fields() -> Vec<String> {
    ["name", "fontname", "fontsize", "primarycolour"].iter().map(|s| s.to_string()).collect()
}

fn build_cue(fields: &[String], value: &str, style_colors: &HashMap<String, u32>) -> Result<Option<Cue>, String> {
    // Text is the last field and may itself contain commas
    let values: Vec<&str> = value.splitn(fields.len(), ',').collect();
    let get = |name: &str| fields.iter().position(|f| f == name).and_then(|i| values.get(i).copied());

    let start = get("start").and_then(|v| parse_time(v.trim())).ok_or("invalid start time")?;
    let end = get("end").and_then(|v| parse_time(v.trim())).ok_or("invalid end time")?;
    if end <= start {
        return Err("end time must be after start time".to_string());
    }

    let raw_text = get("text").unwrap_or("");
    let placement = CuePosition {
        alignment: markup::override_alignment(raw_text),
        ..CuePosition::default()
    };
    let text = markup::strip_ass_markup(raw_text);
    let color = get("style").and_then(|style| {
        let style = style.trim();
        style_colors.get(style).or_else(|| style_colors.get(style.trim_start_matches('*'))).copied()
    });

    Ok(Cue::new(start, end, text).map(|cue| cue.with_placement(placement).with_text_color(color)))
}

/// Parse `H:MM:SS.cc` into milliseconds
fn parse_time(value: &str) -> Option<u64> {
    let caps = TIME_REGEX.captures(value)?;
    let hours: u64 = caps[1].parse().ok()?;
    let minutes: u64 = caps[2].parse().ok()?;
    let seconds: u64 = caps[3].parse().ok()?;
    let centis: u64 = caps[4].parse().ok()?;
    markup::clock_to_ms(hours, minutes, seconds, centis * 10)
}

/// Convert an ASS colour (`&HAABBGGRR`, `&HBBGGRR&` or decimal BGR) into ARGB
pub fn parse_color(value: &str) -> Option<u32> {
    let value = value.trim().trim_end_matches('&');
    let raw = if let Some(hex) = value.strip_prefix("&H").or_else(|| value.strip_prefix("&h")) {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        value.parse::<i64>().ok().map(|v| v as u32)?
    };

    let alpha = 0xFF - ((raw >> 24) & 0xFF);
    let blue = (raw >> 16) & 0xFF;
    let green = (raw >> 8) & 0xFF;
    let red = raw & 0xFF;
    Some((alpha << 24) | (red << 16) | (green << 8) | blue)
}
