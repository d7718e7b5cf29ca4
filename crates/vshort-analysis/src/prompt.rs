//! Prompt construction for segment proposals.

use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use vshort_models::SegmentLimits;

/// Shape the model is asked to return, one entry per proposed clip.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SegmentProposal {
    /// Start time in seconds from the beginning of the video
    pub start: f64,
    /// End time in seconds from the beginning of the video
    pub end: f64,
    /// Short, punchy on-screen hook for the clip (max 8 words)
    pub label: String,
}

/// JSON schema of the expected response (an array of proposals).
pub fn response_schema() -> String {
    let schema = schema_for!(Vec<SegmentProposal>);
    serde_json::to_string_pretty(&schema).unwrap_or_else(|_| "[]".to_string())
}

/// Build the analysis prompt for the given limits.
pub fn build_prompt(limits: &SegmentLimits) -> String {
    format!(
        r#"You are an expert short-form video editor.

Watch the attached video and pick the moments most likely to perform well as
vertical shorts (TikTok, YouTube Shorts, Reels).

Rules:
- Return at most {max} segments, best first.
- Every segment must last between {min:.0} and {max_dur:.0} seconds.
- Segments must not overlap.
- Times are seconds from the start of the video (numbers, not strings).
- Each segment starts and ends on a complete sentence.
- The label is a short hook shown on screen, at most 8 words.

Return ONLY a JSON array matching this schema and nothing else:
{schema}
"#,
        max = limits.max_segments,
        min = limits.min_duration,
        max_dur = limits.max_duration,
        schema = response_schema(),
    )
}
