//! FFmpeg filter-graph building for vertical clips.
//!
//! A clip graph is a single `-filter_complex`:
//!
//! ```text
//! [0:v] crop 9:16 -> scale -> drawtext (captions) -> overlay (progress bar) [vout]
//! ```
//!
//! Everything here is pure so graphs can be asserted on without running ffmpeg.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vshort_models::ProgressBar;

use crate::error::{MediaError, MediaResult};

/// Smallest usable source dimension in pixels.
pub const MIN_FRAME_DIMENSION: u32 = 16;

/// Average glyph width relative to font size, for wrap estimation.
const GLYPH_WIDTH_RATIO: f64 = 0.6;

/// Output label of every clip graph.
pub const VIDEO_OUT_LABEL: &str = "vout";

// ============================================================================
// Crop geometry
// ============================================================================

/// Center-crop and scale parameters for a 9:16 output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropGeometry {
    pub crop_width: u32,
    pub crop_height: u32,
    pub crop_x: u32,
    pub crop_y: u32,
    pub out_width: u32,
    pub out_height: u32,
}

fn even(v: u32) -> u32 {
    (v - v % 2).max(2)
}

/// Compute a centered 9:16 crop using the shorter source side as height.
///
/// Fails with [`MediaError::DegenerateFrame`] when either dimension is below
/// [`MIN_FRAME_DIMENSION`].
pub fn vertical_crop(src_width: u32, src_height: u32, target_height: u32) -> MediaResult<CropGeometry> {
    if src_width < MIN_FRAME_DIMENSION || src_height < MIN_FRAME_DIMENSION || target_height < MIN_FRAME_DIMENSION {
        return Err(MediaError::DegenerateFrame {
            width: src_width,
            height: src_height,
        });
    }

    let crop_height = even(src_width.min(src_height));
    let crop_width = even((f64::from(crop_height) * 9.0 / 16.0).round() as u32);
    let out_height = even(target_height);
    let out_width = even((f64::from(out_height) * 9.0 / 16.0).round() as u32);

    Ok(CropGeometry {
        crop_width,
        crop_height,
        crop_x: (src_width - crop_width) / 2,
        crop_y: (src_height - crop_height) / 2,
        out_width,
        out_height,
    })
}

/// `crop,scale` chain for the geometry.
pub fn crop_scale_filter(geometry: &CropGeometry) -> String {
    format!(
        "crop={}:{}:{}:{},scale={}:{}:flags=lanczos,setsar=1",
        geometry.crop_width,
        geometry.crop_height,
        geometry.crop_x,
        geometry.crop_y,
        geometry.out_width,
        geometry.out_height
    )
}

// ============================================================================
// Captions
// ============================================================================

/// Caption appearance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionStyle {
    pub font_size: u32,
    /// Maximum text width as a fraction of frame width
    pub width_fraction: f64,
    pub max_lines: usize,
    /// Distance between the text bottom and the frame bottom
    pub bottom_margin: u32,
    pub base_color: String,
    pub highlight_color: String,
    pub border_color: String,
    pub border_width: u32,
    /// Karaoke highlight delay in seconds
    pub highlight_delay: f64,
    /// Optional font file; fontconfig default otherwise
    #[serde(default)]
    pub font_file: Option<PathBuf>,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            font_size: 48,
            width_fraction: 0.9,
            max_lines: 3,
            bottom_margin: 110,
            base_color: "white".to_string(),
            highlight_color: "yellow".to_string(),
            border_color: "black".to_string(),
            border_width: 4,
            highlight_delay: 0.1,
            font_file: None,
        }
    }
}

impl CaptionStyle {
    /// Characters per line that fit in `frame_width`.
    pub fn max_chars(&self, frame_width: u32) -> usize {
        let usable = f64::from(frame_width) * self.width_fraction;
        let glyph = f64::from(self.font_size.max(1)) * GLYPH_WIDTH_RATIO;
        ((usable / glyph).floor() as usize).max(1)
    }
}

/// Normalize and word-wrap caption text.
///
/// Text is upper-cased and control characters become spaces. Words longer
/// than a line are kept whole on their own line. Lines past `max_lines` are
/// dropped. Empty input yields no lines.
pub fn wrap_caption(text: &str, max_chars: usize, max_lines: usize) -> Vec<String> {
    let cleaned: String = text
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .to_uppercase();

    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in cleaned.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines.truncate(max_lines);
    lines
}

/// One `drawtext` pass.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawTextPass {
    pub textfile: PathBuf,
    pub color: String,
    pub start: f64,
    pub end: f64,
}

/// Escape a path for use inside a quoted filter option.
pub fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace(':', "\\:")
}

/// Build one `drawtext` filter (no labels).
pub fn drawtext_filter(pass: &DrawTextPass, style: &CaptionStyle) -> String {
    let mut filter = format!(
        "drawtext=textfile='{}':fontsize={}:fontcolor={}:bordercolor={}:borderw={}:line_spacing=8:\
         x=(w-text_w)/2:y=h-text_h-{}:enable='between(t,{:.3},{:.3})'",
        escape_filter_path(&pass.textfile),
        style.font_size,
        pass.color,
        style.border_color,
        style.border_width,
        style.bottom_margin,
        pass.start,
        pass.end,
    );
    if let Some(font) = &style.font_file {
        filter.push_str(&format!(":fontfile='{}'", escape_filter_path(font)));
    }
    filter
}

// ============================================================================
// Progress bar
// ============================================================================

/// Progress bar appearance and placement relative to the output frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressBarStyle {
    /// Bar width as a fraction of frame width
    pub width_fraction: f64,
    pub height: u32,
    /// Distance between the bar bottom and the frame bottom
    pub bottom_margin: u32,
    pub track_color: String,
    pub fill_color: String,
}

impl Default for ProgressBarStyle {
    fn default() -> Self {
        Self {
            width_fraction: 0.8,
            height: 10,
            bottom_margin: 60,
            track_color: "white@0.35".to_string(),
            fill_color: "yellow".to_string(),
        }
    }
}

impl ProgressBarStyle {
    /// Place the bar in an output frame.
    pub fn place(&self, out_width: u32, out_height: u32, duration: f64) -> ProgressBar {
        let width = even((f64::from(out_width) * self.width_fraction).round() as u32).min(out_width);
        let height = self.height.max(2).min(out_height);
        ProgressBar {
            x: (out_width - width) / 2,
            y: out_height.saturating_sub(height + self.bottom_margin),
            width,
            height,
            duration,
        }
    }
}

/// Progress bar sub-graph producing the `[bar]` label.
///
/// The fill strip is as wide as the track and slides in from the left:
/// its x offset is `-w + w * clip(t / d, 0, 1)`, and the track canvas clips it,
/// so the visible fill equals `width * clamp(t / duration, 0, 1)`.
pub fn progress_bar_graph(bar: &ProgressBar, style: &ProgressBarStyle) -> String {
    let duration = bar.duration.max(0.001);
    format!(
        "color=c={track}:s={w}x{h}:d={d:.3},format=rgba[bartrack];\
         color=c={fill}:s={w}x{h}:d={d:.3},format=rgba[barfill];\
         [bartrack][barfill]overlay=x='-w+w*clip(t/{d:.3},0,1)':y=0:eval=frame[bar]",
        track = style.track_color,
        fill = style.fill_color,
        w = bar.width,
        h = bar.height,
        d = duration,
    )
}

// ============================================================================
// Full clip graph
// ============================================================================

/// Assemble the complete clip graph ending in `[vout]`.
pub fn build_clip_graph(
    geometry: &CropGeometry,
    passes: &[DrawTextPass],
    caption_style: &CaptionStyle,
    bar: &ProgressBar,
    bar_style: &ProgressBarStyle,
) -> String {
    let mut chain = format!("[0:v]{}", crop_scale_filter(geometry));
    for pass in passes {
        chain.push(',');
        chain.push_str(&drawtext_filter(pass, caption_style));
    }
    chain.push_str("[base]");

    format!(
        "{chain};{bar_graph};[base][bar]overlay=x={x}:y={y}:shortest=1[{out}]",
        chain = chain,
        bar_graph = progress_bar_graph(bar, bar_style),
        x = bar.x,
        y = bar.y,
        out = VIDEO_OUT_LABEL,
    )
}
