//! Timestamp parsing utilities.
//!
//! Supports `HH:MM:SS`, `HH:MM:SS.mmm`, `MM:SS`, `MM:SS.mmm`, `SS` and `SS.mmm`.
//! Non-finite values (`inf`, `NaN`) are rejected so untrusted input never turns
//! into a bogus number.

use thiserror::Error;

/// Parse a timestamp string to total seconds.
///
/// # Examples
/// ```
/// use vshort_models::timestamp::parse_timestamp;
/// assert_eq!(parse_timestamp("01:30:00").unwrap(), 5400.0);
/// assert_eq!(parse_timestamp("05:30").unwrap(), 330.0);
/// assert_eq!(parse_timestamp("90").unwrap(), 90.0);
/// ```
pub fn parse_timestamp(ts: &str) -> Result<f64, TimestampError> {
    let ts = ts.trim();
    if ts.is_empty() {
        return Err(TimestampError::Empty);
    }

    let parts: Vec<&str> = ts.split(':').collect();
    if parts.len() > 3 {
        return Err(TimestampError::InvalidFormat(ts.to_string()));
    }

    const COMPONENTS: [&str; 3] = ["hours", "minutes", "seconds"];
    let names = &COMPONENTS[3 - parts.len()..];

    let mut total = 0.0;
    for (part, name) in parts.iter().zip(names) {
        let value = parse_component(part, name)?;
        total = total * 60.0 + value;
    }

    Ok(total)
}

fn parse_component(part: &str, name: &'static str) -> Result<f64, TimestampError> {
    let value: f64 = part
        .trim()
        .parse()
        .map_err(|_| TimestampError::InvalidValue(name, part.to_string()))?;
    if !value.is_finite() {
        return Err(TimestampError::InvalidValue(name, part.to_string()));
    }
    if value < 0.0 {
        return Err(TimestampError::Negative);
    }
    Ok(value)
}

/// Format seconds into `HH:MM:SS` or `HH:MM:SS.mmm`.
pub fn format_seconds(total_secs: f64) -> String {
    let total_secs = total_secs.max(0.0);
    let hours = (total_secs / 3600.0).floor() as u32;
    let mins = ((total_secs % 3600.0) / 60.0).floor() as u32;
    let secs = total_secs % 60.0;

    if (secs - secs.floor()).abs() > 0.0001 {
        format!("{:02}:{:02}:{:06.3}", hours, mins, secs)
    } else {
        format!("{:02}:{:02}:{:02}", hours, mins, secs.floor() as u32)
    }
}

/// Timestamp parsing error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimestampError {
    #[error("Timestamp cannot be empty")]
    Empty,

    #[error("Timestamp cannot be negative")]
    Negative,

    #[error("Invalid {0} value: {1}")]
    InvalidValue(&'static str, String),

    #[error("Invalid timestamp format '{0}'. Use HH:MM:SS, MM:SS or SS (optionally .mmm)")]
    InvalidFormat(String),
}
