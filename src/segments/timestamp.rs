use serde_json::Value;
use std::fmt;

/// Why a timestamp could not be coerced to seconds
#[derive(Debug, Clone, PartialEq)]
pub enum TimestampError {
    Empty,
    Malformed(String),
    Negative(f64),
    NotFinite,
    UnsupportedType(&'static str),
}

impl fmt::Display for TimestampError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampError::Empty => write!(f, "empty timestamp"),
            TimestampError::Malformed(raw) => write!(f, "malformed timestamp '{}'", raw),
            TimestampError::Negative(value) => write!(f, "negative timestamp {}", value),
            TimestampError::NotFinite => write!(f, "non-finite timestamp"),
            TimestampError::UnsupportedType(kind) => write!(f, "timestamp of type {}", kind),
        }
    }
}

/// Parse `"90"`, `"90.5s"`, `"mm:ss"` or `"hh:mm:ss"` (optionally with a
/// fractional part, `.` or `,`) into seconds.
pub fn parse_timestamp(raw: &str) -> Result<f64, TimestampError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TimestampError::Empty);
    }

    let malformed = || TimestampError::Malformed(trimmed.to_string());

    if trimmed.starts_with('-') {
        let value: f64 = trimmed.parse().map_err(|_| malformed())?;
        return Err(TimestampError::Negative(value));
    }

    let normalized = trimmed.replace(',', ".");
    let body = normalized
        .strip_suffix('s')
        .filter(|rest| !rest.contains(':'))
        .unwrap_or(&normalized);

    let parts: Vec<&str> = body.split(':').collect();
    if parts.len() > 3 || parts.iter().any(|p| p.is_empty()) {
        return Err(malformed());
    }

    // every component but the last is a whole number
    let (last, leading) = parts.split_last().ok_or_else(malformed)?;
    let mut total = 0.0;
    for (position, part) in leading.iter().enumerate() {
        if !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let value: u64 = part.parse().map_err(|_| malformed())?;
        if position > 0 && value >= 60 {
            return Err(malformed());
        }
        total = total * 60.0 + value as f64;
    }

    if !last.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return Err(malformed());
    }
    let seconds: f64 = last.parse().map_err(|_| malformed())?;
    if !leading.is_empty() && seconds >= 60.0 {
        return Err(malformed());
    }

    let total = total * 60.0 + seconds;
    if !total.is_finite() {
        return Err(TimestampError::NotFinite);
    }
    Ok(total)
}

/// Coerce a JSON number or timestamp string into seconds
pub fn coerce_seconds(value: &Value) -> Result<f64, TimestampError> {
    match value {
        Value::Number(number) => {
            let seconds = number.as_f64().ok_or(TimestampError::NotFinite)?;
            if !seconds.is_finite() {
                Err(TimestampError::NotFinite)
            } else if seconds < 0.0 {
                Err(TimestampError::Negative(seconds))
            } else {
                Ok(seconds)
            }
        }
        Value::String(text) => parse_timestamp(text),
        Value::Null => Err(TimestampError::Empty),
        Value::Bool(_) => Err(TimestampError::UnsupportedType("bool")),
        Value::Array(_) => Err(TimestampError::UnsupportedType("array")),
        Value::Object(_) => Err(TimestampError::UnsupportedType("object")),
    }
}
