//! Parsing of the untrusted candidate payload returned by analysis.
//!
//! The model is asked for a JSON list but may wrap it in code fences or
//! prose, and the prose may itself contain brackets. Wrapping is skipped;
//! every field is then type-checked and any bad entry rejects the whole
//! payload.

use serde_json::{Map, Value};
use thiserror::Error;
use vshort_models::{parse_timestamp, CandidateSegment};

/// Keys under which a wrapped object may carry the list.
const LIST_KEYS: [&str; 3] = ["segments", "highlights", "clips"];
const LABEL_KEYS: [&str; 3] = ["label", "title", "hook"];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PayloadError {
    #[error("Payload is empty")]
    Empty,

    #[error("No JSON structure found in payload")]
    NoStructure,

    #[error("Malformed JSON: {0}")]
    Malformed(String),

    #[error("Payload is not a list of segments")]
    NotAList,

    #[error("Entry {index} is not an object")]
    NotAnObject { index: usize },

    #[error("Entry {index} is missing '{field}'")]
    MissingField { index: usize, field: &'static str },

    #[error("Entry {index} has invalid '{field}': {value}")]
    InvalidField {
        index: usize,
        field: &'static str,
        value: String,
    },
}

/// Text between the first pair of code fences, or the whole text.
fn fenced_body(raw: &str) -> &str {
    let text = raw.trim();
    let Some(open) = text.find("```") else {
        return text;
    };
    let after = &text[open + 3..];
    // Skip an info string such as "json" on the opening fence line
    let body = match after.find('\n') {
        Some(nl) if !after[..nl].contains(['[', '{']) => &after[nl + 1..],
        _ => after,
    };
    match body.find("```") {
        Some(close) => &body[..close],
        None => body,
    }
}

/// A list of entries, or an object carrying one under a known key.
fn looks_like_list(value: &Value) -> bool {
    match value {
        Value::Array(items) => !items.is_empty() && items.iter().all(Value::is_object),
        Value::Object(map) => LIST_KEYS.iter().any(|key| map.get(*key).is_some_and(Value::is_array)),
        _ => false,
    }
}

/// Find the JSON value embedded in formatting noise.
///
/// Each opening bracket is tried in turn and a single value is read from
/// there, ignoring whatever follows it. The first list-shaped value wins;
/// failing that, the first value that parsed at all is returned so the
/// shape error can be reported.
fn extract_value(raw: &str) -> Result<Value, PayloadError> {
    let body = fenced_body(raw);
    let mut first_parsed = None;
    let mut last_error = None;

    for (offset, _) in body.match_indices(['[', '{']) {
        let mut values = serde_json::Deserializer::from_str(&body[offset..]).into_iter::<Value>();
        match values.next() {
            Some(Ok(value)) if looks_like_list(&value) => return Ok(value),
            Some(Ok(value)) => {
                first_parsed.get_or_insert(value);
            }
            Some(Err(e)) => last_error = Some(e.to_string()),
            None => {}
        }
    }

    match (first_parsed, last_error) {
        (Some(value), _) => Ok(value),
        (None, Some(error)) => Err(PayloadError::Malformed(error)),
        (None, None) => Err(PayloadError::NoStructure),
    }
}

/// Parse raw analysis text into candidates, failing closed.
pub fn parse_candidates(raw: &str) -> Result<Vec<CandidateSegment>, PayloadError> {
    if raw.trim().is_empty() {
        return Err(PayloadError::Empty);
    }

    let items = match extract_value(raw)? {
        Value::Array(items) => items,
        Value::Object(mut map) => LIST_KEYS
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .ok_or(PayloadError::NotAList)?,
        _ => return Err(PayloadError::NotAList),
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(fields) => parse_entry(index, fields),
            _ => Err(PayloadError::NotAnObject { index }),
        })
        .collect()
}

fn parse_entry(index: usize, fields: &Map<String, Value>) -> Result<CandidateSegment, PayloadError> {
    let start = required_seconds(index, fields, "start", "start_time")?;
    let end = required_seconds(index, fields, "end", "end_time")?;

    let label = match LABEL_KEYS.iter().find_map(|k| fields.get(*k)) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => {
            return Err(PayloadError::InvalidField {
                index,
                field: "label",
                value: other.to_string(),
            })
        }
    };

    let mut candidate = CandidateSegment::new(start, end, label);
    match fields.get("score") {
        None | Some(Value::Null) => {}
        Some(value) => candidate = candidate.with_score(seconds_value(index, "score", value)?),
    }
    Ok(candidate)
}

fn required_seconds(
    index: usize,
    fields: &Map<String, Value>,
    field: &'static str,
    alias: &str,
) -> Result<f64, PayloadError> {
    let value = fields
        .get(field)
        .or_else(|| fields.get(alias))
        .ok_or(PayloadError::MissingField { index, field })?;
    seconds_value(index, field, value)
}

/// Numbers pass through; strings must be a plain number or a timestamp.
fn seconds_value(index: usize, field: &'static str, value: &Value) -> Result<f64, PayloadError> {
    let invalid = || PayloadError::InvalidField {
        index,
        field,
        value: value.to_string(),
    };
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .or_else(|| parse_timestamp(s).ok()),
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_array() {
        let candidates =
            parse_candidates(r#"[{"start": 10, "end": 45.5, "label": "Big reveal"}]"#).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].start, 10.0);
        assert_eq!(candidates[0].end, 45.5);
        assert_eq!(candidates[0].label, "Big reveal");
    }

    #[test]
    fn test_code_fence_and_prose() {
        let raw = "Here are the best moments:\n```json\n[\n  {\"start\": 1, \"end\": 40, \"label\": \"a\"}\n]\n```\nEnjoy!";
        let candidates = parse_candidates(raw).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].label, "a");
    }

    #[test]
    fn test_single_line_fence() {
        let raw = "```json[{\"start\": 1, \"end\": 40}]```";
        assert_eq!(parse_candidates(raw).unwrap().len(), 1);
    }

    #[test]
    fn test_brackets_in_surrounding_prose() {
        let raw = "Sure! Here are the clips [best first]:\n[{\"start\": 1, \"end\": 40, \"label\": \"a\"}]";
        let candidates = parse_candidates(raw).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].label, "a");

        let raw = "[{\"start\": 1, \"end\": 40}] {note: the second one [maybe] is weaker}";
        assert_eq!(parse_candidates(raw).unwrap().len(), 1);

        // A stray citation before the payload does not shadow it
        let raw = "As discussed [1], try these: [{\"start\": 5, \"end\": 50}]";
        assert_eq!(parse_candidates(raw).unwrap()[0].start, 5.0);
    }

    #[test]
    fn test_only_prose_brackets_fails_closed() {
        assert!(matches!(
            parse_candidates("Clips: [none worth keeping] {sorry}"),
            Err(PayloadError::Malformed(_))
        ));
    }

    #[test]
    fn test_wrapped_object() {
        let raw = r#"{"highlights": [{"start_time": "00:01:00", "end_time": "01:45", "title": "t"}]}"#;
        let candidates = parse_candidates(raw).unwrap();
        assert_eq!(candidates[0].start, 60.0);
        assert_eq!(candidates[0].end, 105.0);
        assert_eq!(candidates[0].label, "t");
    }

    #[test]
    fn test_numeric_strings_and_negative() {
        let candidates = parse_candidates(r#"[{"start": "-5", "end": "35", "label": "hi"}]"#).unwrap();
        assert_eq!(candidates[0].start, -5.0);
        assert_eq!(candidates[0].end, 35.0);
    }

    #[test]
    fn test_missing_end_rejects_batch() {
        let err = parse_candidates(r#"[{"start": 1, "end": 40}, {"start": 50}]"#).unwrap_err();
        assert_eq!(err, PayloadError::MissingField { index: 1, field: "end" });
    }

    #[test]
    fn test_garbage_numbers_rejected() {
        assert!(matches!(
            parse_candidates(r#"[{"start": "soon", "end": 40}]"#),
            Err(PayloadError::InvalidField { field: "start", .. })
        ));
        assert!(matches!(
            parse_candidates(r#"[{"start": true, "end": 40}]"#),
            Err(PayloadError::InvalidField { field: "start", .. })
        ));
        assert!(matches!(
            parse_candidates(r#"[{"start": "NaN", "end": 40}]"#),
            Err(PayloadError::InvalidField { field: "start", .. })
        ));
    }

    #[test]
    fn test_non_string_label_rejected() {
        assert!(matches!(
            parse_candidates(r#"[{"start": 1, "end": 40, "label": 12}]"#),
            Err(PayloadError::InvalidField { field: "label", .. })
        ));
    }

    #[test]
    fn test_structural_failures() {
        assert_eq!(parse_candidates("   "), Err(PayloadError::Empty));
        assert_eq!(parse_candidates("no json here"), Err(PayloadError::NoStructure));
        assert!(matches!(parse_candidates("[{\"start\": 1,"), Err(PayloadError::Malformed(_))));
        assert_eq!(parse_candidates(r#"{"other": []}"#), Err(PayloadError::NotAList));
        assert_eq!(parse_candidates("[1, 2]"), Err(PayloadError::NotAnObject { index: 0 }));
    }

    #[test]
    fn test_empty_list_is_ok() {
        assert!(parse_candidates("[]").unwrap().is_empty());
    }
}
