//! WebVTT subtitles → transcript cues → disjoint selection windows.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;
use vshort_models::{parse_timestamp, SegmentLimits, TranscriptCue, TranscriptSpan};

use crate::error::WorkerResult;

fn timing_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^((?:\d+:)?\d{1,2}:\d{2}[.,]\d{3})\s+-->\s+((?:\d+:)?\d{1,2}:\d{2}[.,]\d{3})")
            .unwrap_or_else(|e| unreachable!("static regex: {e}"))
    })
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[^>]+>").unwrap_or_else(|e| unreachable!("static regex: {e}")))
}

fn vtt_seconds(ts: &str) -> Option<f64> {
    parse_timestamp(&ts.replace(',', ".")).ok()
}

/// Parse WebVTT into cues.
///
/// Inline tags are stripped. Auto-generated captions repeat the previous
/// line at the top of each cue; repeated lines are dropped so every word
/// appears once.
pub fn parse_vtt(content: &str) -> Vec<TranscriptCue> {
    let mut cues = Vec::new();
    let mut last_line = String::new();
    let mut current: Option<(f64, f64, Vec<String>)> = None;

    for raw in content.lines() {
        let line = raw.trim();
        if let Some(caps) = timing_pattern().captures(line) {
            flush(&mut current, &mut cues);
            current = match (vtt_seconds(&caps[1]), vtt_seconds(&caps[2])) {
                (Some(start), Some(end)) => Some((start, end, Vec::new())),
                _ => None,
            };
            continue;
        }
        if line.is_empty() {
            flush(&mut current, &mut cues);
            continue;
        }
        let Some((_, _, lines)) = current.as_mut() else {
            // Header, NOTE/STYLE blocks, cue identifiers
            continue;
        };
        let text = tag_pattern().replace_all(line, "");
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.is_empty() || text == last_line {
            continue;
        }
        last_line = text.clone();
        lines.push(text);
    }
    flush(&mut current, &mut cues);

    debug!(cues = cues.len(), "Parsed subtitles");
    cues
}

fn flush(current: &mut Option<(f64, f64, Vec<String>)>, cues: &mut Vec<TranscriptCue>) {
    if let Some((start, end, lines)) = current.take() {
        if !lines.is_empty() && end > start {
            cues.push(TranscriptCue::new(start, end, lines.join(" ")));
        }
    }
}

/// Read and parse a subtitle file.
pub async fn load_vtt(path: &Path) -> WorkerResult<Vec<TranscriptCue>> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(parse_vtt(&content))
}

/// Group cues greedily into disjoint windows lasting `[min, max]` seconds.
///
/// A window grows cue by cue until the next cue would push it past
/// `max_duration`. Windows that end up shorter than `min_duration` are
/// dropped and grouping restarts at the next cue.
pub fn build_windows(cues: &[TranscriptCue], limits: &SegmentLimits) -> Vec<TranscriptSpan> {
    let mut windows = Vec::new();
    let mut begin = 0;

    while begin < cues.len() {
        let start = cues[begin].start;
        let mut end = begin;
        while end + 1 < cues.len() && cues[end + 1].end - start <= limits.max_duration {
            end += 1;
        }

        let span_duration = cues[end].end - start;
        if limits.accepts(span_duration) {
            if let Some(span) = TranscriptSpan::from_cues(&cues[begin..=end]) {
                windows.push(span);
            }
        }
        begin = end + 1;
    }

    windows
}
