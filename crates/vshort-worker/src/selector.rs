//! Heuristic segment selection from transcript spans.

use vshort_models::{CandidateSegment, SegmentLimits, TranscriptSpan};

/// Words of span text used as the on-screen hook.
const LABEL_WORDS: usize = 8;

/// Speech density: words per second, with durations under a second counted
/// as one second.
pub fn span_score(span: &TranscriptSpan) -> f64 {
    span.word_count() as f64 / span.duration().max(1.0)
}

/// Pick the `max_clips` densest eligible spans.
///
/// Spans outside `[min_duration, max_duration]` are dropped, not truncated.
/// Ties keep chronological order, so the output is deterministic.
pub fn select(spans: &[TranscriptSpan], max_clips: usize, limits: &SegmentLimits) -> Vec<CandidateSegment> {
    let mut scored: Vec<(f64, &TranscriptSpan)> = spans
        .iter()
        .filter(|s| s.duration().is_finite() && limits.accepts(s.duration()))
        .map(|s| (span_score(s), s))
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    scored
        .into_iter()
        .take(max_clips)
        .map(|(score, span)| {
            CandidateSegment::new(span.start, span.end, headline(&span.text))
                .with_score(score)
                .with_cues(span.cues.clone())
        })
        .collect()
}

/// Evenly spaced, disjoint windows for sources without a transcript.
///
/// Each window lasts `max_duration` (or the whole source when shorter), in
/// whole seconds, at most `max_segments` of them, with the leftover time
/// spread between them. Sources too short for one window yield nothing.
pub fn fixed_windows(duration: f64, limits: &SegmentLimits) -> Vec<CandidateSegment> {
    if !duration.is_finite() || !limits.max_duration.is_finite() {
        return Vec::new();
    }
    // Whole seconds keep `end - start` exact for the validator's bounds check
    let length = limits.max_duration.min(duration).floor();
    if length <= 0.0 || !limits.accepts(length) {
        return Vec::new();
    }
    let count = ((duration / length).floor() as usize).min(limits.max_segments);
    if count == 0 {
        return Vec::new();
    }
    let gap = (duration - count as f64 * length) / count as f64;

    (0..count)
        .map(|i| {
            let start = (gap / 2.0 + i as f64 * (length + gap)).floor();
            CandidateSegment::new(start, start + length, "")
        })
        .collect()
}

fn headline(text: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut label = words.iter().take(LABEL_WORDS).copied().collect::<Vec<_>>().join(" ");
    if words.len() > LABEL_WORDS {
        label.push('…');
    }
    label
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: f64, end: f64, words: usize) -> TranscriptSpan {
        let text = vec!["word"; words].join(" ");
        TranscriptSpan::new(start, end, text)
    }

    #[test]
    fn test_score() {
        assert_eq!(span_score(&span(0.0, 40.0, 80)), 2.0);
        assert_eq!(span_score(&span(0.0, 0.5, 3)), 3.0);
    }

    #[test]
    fn test_ineligible_spans_dropped() {
        let spans = vec![span(0.0, 20.0, 100), span(30.0, 100.0, 200), span(100.0, 140.0, 10)];
        let picked = select(&spans, 10, &SegmentLimits::default());
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].start, 100.0);
    }

    #[test]
    fn test_top_by_density_with_stable_ties() {
        let spans = vec![
            span(0.0, 40.0, 40),    // 1.0
            span(40.0, 80.0, 120),  // 3.0
            span(80.0, 120.0, 40),  // 1.0
            span(120.0, 160.0, 80), // 2.0
        ];
        let picked = select(&spans, 3, &SegmentLimits::default());
        let starts: Vec<f64> = picked.iter().map(|c| c.start).collect();
        assert_eq!(starts, vec![40.0, 120.0, 0.0]);
        assert_eq!(picked[0].score, Some(3.0));
    }

    #[test]
    fn test_deterministic() {
        let spans: Vec<_> = (0..20)
            .map(|i| span(i as f64 * 45.0, i as f64 * 45.0 + 40.0, 30 + (i * 7) % 11))
            .collect();
        let first = select(&spans, 5, &SegmentLimits::default());
        for _ in 0..5 {
            assert_eq!(select(&spans, 5, &SegmentLimits::default()), first);
        }
    }

    #[test]
    fn test_headline_label() {
        let spans = vec![TranscriptSpan::new(
            0.0,
            40.0,
            "one two three four five six seven eight nine ten",
        )];
        let picked = select(&spans, 1, &SegmentLimits::default());
        assert_eq!(picked[0].label, "one two three four five six seven eight…");
    }

    #[test]
    fn test_fixed_windows_spread_over_source() {
        let windows = fixed_windows(200.0, &SegmentLimits::default());
        assert_eq!(windows.len(), 3);
        for pair in windows.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
        for w in &windows {
            assert!(w.start >= 0.0 && w.end <= 200.0);
            assert_eq!(w.duration(), 60.0);
            assert_eq!(w.start.fract(), 0.0);
        }
        assert_eq!(fixed_windows(200.0, &SegmentLimits::default()), windows);
    }

    #[test]
    fn test_fixed_windows_edges() {
        let limits = SegmentLimits::default();
        let whole = fixed_windows(45.0, &limits);
        assert_eq!(whole.len(), 1);
        assert_eq!((whole[0].start, whole[0].end), (0.0, 45.0));

        assert!(fixed_windows(20.0, &limits).is_empty());
        assert!(fixed_windows(f64::NAN, &limits).is_empty());
        assert_eq!(fixed_windows(10_000.0, &limits).len(), limits.max_segments);
    }
}
