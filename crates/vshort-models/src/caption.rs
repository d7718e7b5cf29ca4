//! Caption track and progress-bar descriptors for rendered clips.

use serde::{Deserialize, Serialize};

use crate::segment::TranscriptCue;

/// One caption line, clip-relative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionCue {
    pub start: f64,
    pub end: f64,
    /// Wrapped, upper-cased lines
    pub lines: Vec<String>,
    /// Karaoke highlight fires at `start + highlight_delay`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight_delay: Option<f64>,
}

impl CaptionCue {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn is_karaoke(&self) -> bool {
        self.highlight_delay.is_some()
    }
}

/// All caption cues burnt into a clip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptionTrack {
    pub cues: Vec<CaptionCue>,
}

impl CaptionTrack {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    /// Static caption lasting the whole clip.
    pub fn static_label(lines: Vec<String>, duration: f64) -> Self {
        if lines.is_empty() {
            return Self::empty();
        }
        Self {
            cues: vec![CaptionCue {
                start: 0.0,
                end: duration,
                lines,
                highlight_delay: None,
            }],
        }
    }

    /// Karaoke track from clip-relative cues, given a wrapping function.
    pub fn karaoke<F>(cues: &[TranscriptCue], delay: f64, mut wrap: F) -> Self
    where
        F: FnMut(&str) -> Vec<String>,
    {
        let cues = cues
            .iter()
            .filter_map(|cue| {
                let lines = wrap(&cue.text);
                if lines.is_empty() {
                    return None;
                }
                Some(CaptionCue {
                    start: cue.start,
                    end: cue.end,
                    lines,
                    highlight_delay: Some(delay),
                })
            })
            .collect();
        Self { cues }
    }
}

/// Geometry of the progress bar overlay.
///
/// The filled width at clip time `t` is `width * clamp(t / duration, 0, 1)`;
/// the renderer evaluates it per frame inside the filter graph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressBar {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Clip duration the fill is normalized against
    pub duration: f64,
}
