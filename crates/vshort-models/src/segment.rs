//! Segment models: candidates, selected segments and transcript spans.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default minimum clip duration in seconds.
pub const DEFAULT_MIN_DURATION: f64 = 30.0;
/// Default maximum clip duration in seconds.
pub const DEFAULT_MAX_DURATION: f64 = 60.0;
/// Default maximum number of clips per run.
pub const DEFAULT_MAX_SEGMENTS: usize = 10;

/// A timed transcript line, relative to the source video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TranscriptCue {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl TranscriptCue {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// A contiguous run of transcript cues used by the heuristic selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSpan {
    pub start: f64,
    pub end: f64,
    /// Concatenated text of all cues in the span
    pub text: String,
    #[serde(default)]
    pub cues: Vec<TranscriptCue>,
}

impl TranscriptSpan {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
            cues: Vec::new(),
        }
    }

    /// Build a span covering the given cues.
    ///
    /// Returns `None` for an empty slice.
    pub fn from_cues(cues: &[TranscriptCue]) -> Option<Self> {
        let first = cues.first()?;
        let last = cues.last()?;
        let text = cues
            .iter()
            .map(|c| c.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        Some(Self {
            start: first.start,
            end: last.end,
            text,
            cues: cues.to_vec(),
        })
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// A proposed clip range, before validation.
///
/// Comes either from the analysis collaborator or from the heuristic selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CandidateSegment {
    /// Start time in seconds, relative to the source
    pub start: f64,
    /// End time in seconds, relative to the source
    pub end: f64,
    /// On-screen hook / caption text
    #[serde(default)]
    pub label: String,
    /// Ranking score (heuristic mode)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Transcript cues inside the range, for the karaoke overlay
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cues: Vec<TranscriptCue>,
}

impl CandidateSegment {
    pub fn new(start: f64, end: f64, label: impl Into<String>) -> Self {
        Self {
            start,
            end,
            label: label.into(),
            score: None,
            cues: Vec::new(),
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_cues(mut self, cues: Vec<TranscriptCue>) -> Self {
        self.cues = cues;
        self
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Check whether two candidates share any time.
    pub fn overlaps(&self, other: &CandidateSegment) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// A validated segment ready for rendering.
///
/// Invariants hold by construction in the validator:
/// `0 <= start < end <= duration` and `end - start` within the configured limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedSegment {
    /// 1-based position in the final, start-ordered list
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cues: Vec<TranscriptCue>,
}

impl SelectedSegment {
    pub fn from_candidate(index: usize, candidate: CandidateSegment) -> Self {
        Self {
            index,
            start: candidate.start,
            end: candidate.end,
            label: candidate.label,
            score: candidate.score,
            cues: candidate.cues,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Cues shifted to clip-relative time and clipped to the segment range.
    pub fn relative_cues(&self) -> Vec<TranscriptCue> {
        let duration = self.duration();
        self.cues
            .iter()
            .filter(|c| c.end > self.start && c.start < self.end)
            .map(|c| TranscriptCue {
                start: (c.start - self.start).max(0.0),
                end: (c.end - self.start).min(duration),
                text: c.text.clone(),
            })
            .filter(|c| c.end > c.start)
            .collect()
    }
}

impl From<SelectedSegment> for CandidateSegment {
    fn from(segment: SelectedSegment) -> Self {
        Self {
            start: segment.start,
            end: segment.end,
            label: segment.label,
            score: segment.score,
            cues: segment.cues,
        }
    }
}

/// Bounds applied to every selected segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentLimits {
    pub min_duration: f64,
    pub max_duration: f64,
    pub max_segments: usize,
}

impl Default for SegmentLimits {
    fn default() -> Self {
        Self {
            min_duration: DEFAULT_MIN_DURATION,
            max_duration: DEFAULT_MAX_DURATION,
            max_segments: DEFAULT_MAX_SEGMENTS,
        }
    }
}

impl SegmentLimits {
    /// Check whether a duration is within `[min_duration, max_duration]`.
    pub fn accepts(&self, duration: f64) -> bool {
        duration >= self.min_duration && duration <= self.max_duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlaps() {
        let a = CandidateSegment::new(10.0, 40.0, "a");
        let b = CandidateSegment::new(39.0, 80.0, "b");
        let c = CandidateSegment::new(40.0, 80.0, "c");
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c), "touching ranges do not overlap");
    }

    #[test]
    fn test_span_from_cues() {
        let cues = vec![
            TranscriptCue::new(1.0, 3.0, "hello there"),
            TranscriptCue::new(3.0, 5.5, "  general kenobi "),
        ];
        let span = TranscriptSpan::from_cues(&cues).unwrap();
        assert_eq!(span.start, 1.0);
        assert_eq!(span.end, 5.5);
        assert_eq!(span.text, "hello there general kenobi");
        assert_eq!(span.word_count(), 4);
        assert!(TranscriptSpan::from_cues(&[]).is_none());
    }

    #[test]
    fn test_relative_cues() {
        let segment = SelectedSegment::from_candidate(
            1,
            CandidateSegment::new(10.0, 40.0, "x").with_cues(vec![
                TranscriptCue::new(8.0, 12.0, "a"),
                TranscriptCue::new(20.0, 22.0, "b"),
                TranscriptCue::new(39.0, 45.0, "c"),
                TranscriptCue::new(50.0, 52.0, "d"),
            ]),
        );
        let cues = segment.relative_cues();
        assert_eq!(cues.len(), 3);
        assert_eq!(cues[0].start, 0.0);
        assert_eq!(cues[0].end, 2.0);
        assert_eq!(cues[1].start, 10.0);
        assert_eq!(cues[2].end, 30.0);
    }

    #[test]
    fn test_limits_accepts_inclusive() {
        let limits = SegmentLimits::default();
        assert!(limits.accepts(30.0));
        assert!(limits.accepts(60.0));
        assert!(!limits.accepts(29.9));
        assert!(!limits.accepts(60.1));
    }

    #[test]
    fn test_candidate_deserialize_defaults() {
        let c: CandidateSegment = serde_json::from_str(r#"{"start": 1, "end": 2}"#).unwrap();
        assert_eq!(c.label, "");
        assert!(c.score.is_none());
        assert!(c.cues.is_empty());
    }
}
