//! Defensive decoding of analysis output
//!
//! The service answers either with structured records (chapter lists, arrays
//! nested under assorted keys) or with free text that may embed JSON or list
//! `start - end title` lines. Every raw entry decodes to an [`EntryOutcome`]:
//! an accepted segment or a discard with its reason.

use super::timestamp::{coerce_seconds, TimestampError};
use super::Segment;
use regex::Regex;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::OnceLock;

const START_KEYS: &[&str] = &["start_sec", "start", "start_time", "startTime", "start_seconds", "from", "begin"];
const END_KEYS: &[&str] = &["end_sec", "end", "end_time", "endTime", "end_seconds", "to", "finish"];
const TITLE_KEYS: &[&str] = &["chapter_title", "title", "topic", "name", "headline"];
const TITLE_FALLBACK_KEYS: &[&str] = &["chapter_summary", "summary", "description", "text"];
const CONTAINER_KEYS: &[&str] = &["chapters", "segments", "topics", "highlights", "data", "result", "results"];

/// Why a raw entry did not become a segment
#[derive(Debug, Clone, PartialEq)]
pub enum DiscardReason {
    NotARecord,
    MissingField(&'static str),
    InvalidTimestamp {
        field: &'static str,
        error: TimestampError,
    },
    EmptyTitle,
    NonPositiveDuration {
        start: f64,
        end: f64,
    },
    /// Clipped to nothing by the following segment
    Overlapped,
}

impl fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscardReason::NotARecord => write!(f, "entry is not a record"),
            DiscardReason::MissingField(field) => write!(f, "missing {}", field),
            DiscardReason::InvalidTimestamp { field, error } => write!(f, "invalid {}: {}", field, error),
            DiscardReason::EmptyTitle => write!(f, "empty title"),
            DiscardReason::NonPositiveDuration { start, end } => {
                write!(f, "start {} is not before end {}", start, end)
            }
            DiscardReason::Overlapped => write!(f, "fully overlapped by the next segment"),
        }
    }
}

/// Decoding result for one raw entry
#[derive(Debug, Clone, PartialEq)]
pub enum EntryOutcome {
    Accepted(Segment),
    Discarded { index: usize, reason: DiscardReason },
}

/// Shape of a raw analysis result once containers are unwrapped
#[derive(Debug, Clone, PartialEq)]
pub enum RawShape {
    Records(Vec<Value>),
    Text(String),
    Unrecognized,
}

/// Locate the list of entries inside a raw analysis result
pub fn classify(raw: &Value) -> RawShape {
    classify_depth(raw, 0)
}

fn classify_depth(raw: &Value, depth: usize) -> RawShape {
    if depth > 4 {
        return RawShape::Unrecognized;
    }

    match raw {
        Value::Array(items) => RawShape::Records(items.clone()),
        Value::String(text) => match extract_embedded_json(text) {
            Some(embedded) => match classify_depth(&embedded, depth + 1) {
                RawShape::Records(records) if records.iter().any(Value::is_object) => RawShape::Records(records),
                RawShape::Text(inner) => RawShape::Text(inner),
                _ => RawShape::Text(text.clone()),
            },
            None => RawShape::Text(text.clone()),
        },
        Value::Object(map) => {
            for key in CONTAINER_KEYS {
                if let Some(inner) = map.get(*key) {
                    match classify_depth(inner, depth + 1) {
                        RawShape::Unrecognized => continue,
                        shape => return shape,
                    }
                }
            }
            if lookup(map, START_KEYS).is_some() {
                RawShape::Records(vec![raw.clone()])
            } else {
                RawShape::Unrecognized
            }
        }
        _ => RawShape::Unrecognized,
    }
}

/// Pull a JSON array/object out of free text, e.g. a fenced code block
fn extract_embedded_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if value.is_array() || value.is_object() {
            return Some(value);
        }
    }

    let candidates = [('[', ']'), ('{', '}')];
    for (open, close) in candidates {
        if let (Some(start), Some(end)) = (trimmed.find(open), trimmed.rfind(close)) {
            if start < end {
                if let Ok(value) = serde_json::from_str::<Value>(&trimmed[start..=end]) {
                    return Some(value);
                }
            }
        }
    }
    None
}

fn range_line_regex() -> &'static Regex {
    static RANGE_LINE: OnceLock<Regex> = OnceLock::new();
    RANGE_LINE.get_or_init(|| {
        let ts = r"\d{1,2}(?::\d{2}){1,2}(?:[.,]\d+)?";
        let pattern = format!(
            r"^\s*(?:[-*•]\s*|\d+[.)]\s+)?[\[(]?\s*({ts})\s*(?:-|–|—|to)\s*({ts})\s*[\])]?\s*[:\-–—|]?\s*(.*)$"
        );
        Regex::new(&pattern).expect("range line pattern is valid")
    })
}

/// Turn `00:00 - 05:30 Introduction` style lines into records
pub fn records_from_text(text: &str) -> Vec<Value> {
    let re = range_line_regex();
    text.lines()
        .filter_map(|line| {
            let caps = re.captures(line)?;
            let mut record = Map::new();
            record.insert("start".to_string(), Value::String(caps[1].to_string()));
            record.insert("end".to_string(), Value::String(caps[2].to_string()));
            record.insert("title".to_string(), Value::String(caps[3].to_string()));
            Some(Value::Object(record))
        })
        .collect()
}

/// All raw entries of an analysis result, whatever its shape
pub fn raw_entries(raw: &Value) -> Vec<Value> {
    match classify(raw) {
        RawShape::Records(records) => records,
        RawShape::Text(text) => records_from_text(&text),
        RawShape::Unrecognized => Vec::new(),
    }
}

fn lookup<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find(|value| !value.is_null())
}

fn title_text(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| map.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

/// Collapse whitespace, strip decoration and truncate to `max_chars`
pub fn clean_title(raw: &str, max_chars: usize) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let stripped = collapsed.trim_matches(|c: char| c == '"' || c == '*' || c == '#' || c.is_whitespace());

    if stripped.chars().count() <= max_chars {
        return stripped.to_string();
    }
    stripped.chars().take(max_chars).collect::<String>().trim_end().to_string()
}

/// Decode a single raw entry into a segment or a discard
pub fn decode_entry(index: usize, raw: &Value, max_title_chars: usize) -> EntryOutcome {
    let discard = |reason| EntryOutcome::Discarded { index, reason };

    let map = match raw {
        Value::Object(map) => map,
        _ => return discard(DiscardReason::NotARecord),
    };

    let start = match lookup(map, START_KEYS) {
        None => return discard(DiscardReason::MissingField("start")),
        Some(value) => match coerce_seconds(value) {
            Ok(seconds) => seconds,
            Err(error) => return discard(DiscardReason::InvalidTimestamp { field: "start", error }),
        },
    };

    let end = match lookup(map, END_KEYS) {
        None => return discard(DiscardReason::MissingField("end")),
        Some(value) => match coerce_seconds(value) {
            Ok(seconds) => seconds,
            Err(error) => return discard(DiscardReason::InvalidTimestamp { field: "end", error }),
        },
    };

    if start >= end {
        return discard(DiscardReason::NonPositiveDuration { start, end });
    }

    let title = match title_text(map, TITLE_KEYS).or_else(|| title_text(map, TITLE_FALLBACK_KEYS)) {
        Some(text) => clean_title(&text, max_title_chars),
        None => return discard(DiscardReason::MissingField("title")),
    };
    if title.is_empty() {
        return discard(DiscardReason::EmptyTitle);
    }

    EntryOutcome::Accepted(Segment { start, end, title })
}
