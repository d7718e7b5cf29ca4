//! Vertical clip rendering.
//!
//! One ffmpeg invocation per clip: input seek, crop/scale to 9:16, caption
//! `drawtext` passes, progress bar overlay, H.264/AAC MP4 with `+faststart`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};
use vshort_models::encoding::DEFAULT_TARGET_HEIGHT;
use vshort_models::{CaptionTrack, EncodingConfig, ProgressBar, SelectedSegment, SourceVideo};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters::{
    build_clip_graph, vertical_crop, wrap_caption, CaptionStyle, CropGeometry, DrawTextPass,
    ProgressBarStyle, VIDEO_OUT_LABEL,
};

/// Renderer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    pub target_height: u32,
    pub encoding: EncodingConfig,
    pub caption: CaptionStyle,
    pub progress_bar: ProgressBarStyle,
    /// Per-clip ffmpeg timeout
    pub timeout_secs: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            target_height: DEFAULT_TARGET_HEIGHT,
            encoding: EncodingConfig::default(),
            caption: CaptionStyle::default(),
            progress_bar: ProgressBarStyle::default(),
            timeout_secs: 600,
        }
    }
}

/// A finished clip on disk.
///
/// Lives in the segment's scratch directory; removing that directory
/// removes the clip.
#[derive(Debug, Clone)]
pub struct RenderedClip {
    pub path: PathBuf,
    pub duration: f64,
    pub captions: CaptionTrack,
    pub progress: ProgressBar,
}

/// Everything needed to render a clip, computed without touching disk.
#[derive(Debug, Clone)]
pub struct ClipPlan {
    pub start: f64,
    pub duration: f64,
    pub geometry: CropGeometry,
    pub captions: CaptionTrack,
    pub progress: ProgressBar,
}

impl ClipPlan {
    /// Plan a clip for `segment` of `source`.
    ///
    /// Transcript cues, when present, produce a karaoke track; otherwise the
    /// segment label becomes a static caption. A blank label yields no caption.
    pub fn new(source: &SourceVideo, segment: &SelectedSegment, config: &RenderConfig) -> MediaResult<Self> {
        let duration = segment.duration();
        if !duration.is_finite() || duration <= 0.0 {
            return Err(MediaError::internal(format!(
                "segment {} has non-positive duration",
                segment.index
            )));
        }

        let geometry = vertical_crop(source.width, source.height, config.target_height)?;
        let style = &config.caption;
        let max_chars = style.max_chars(geometry.out_width);
        let wrap = |text: &str| wrap_caption(text, max_chars, style.max_lines);

        let cues = segment.relative_cues();
        let captions = if cues.is_empty() {
            CaptionTrack::static_label(wrap(&segment.label), duration)
        } else {
            CaptionTrack::karaoke(&cues, style.highlight_delay, wrap)
        };

        let progress = config
            .progress_bar
            .place(geometry.out_width, geometry.out_height, duration);

        Ok(Self {
            start: segment.start,
            duration,
            geometry,
            captions,
            progress,
        })
    }

    /// Drawtext passes, referencing one text file per cue in `scratch_dir`.
    ///
    /// Karaoke cues get a second, highlight-colored pass starting after the
    /// configured delay.
    pub fn drawtext_passes(&self, style: &CaptionStyle, scratch_dir: &Path) -> Vec<DrawTextPass> {
        let mut passes = Vec::new();
        for (i, cue) in self.captions.cues.iter().enumerate() {
            let textfile = caption_file(scratch_dir, i);
            passes.push(DrawTextPass {
                textfile: textfile.clone(),
                color: style.base_color.clone(),
                start: cue.start,
                end: cue.end,
            });
            if let Some(delay) = cue.highlight_delay {
                let start = cue.start + delay;
                if start < cue.end {
                    passes.push(DrawTextPass {
                        textfile,
                        color: style.highlight_color.clone(),
                        start,
                        end: cue.end,
                    });
                }
            }
        }
        passes
    }

    /// Build the ffmpeg command for this plan.
    pub fn command(&self, source: &Path, output: &Path, config: &RenderConfig, scratch_dir: &Path) -> FfmpegCommand {
        let passes = self.drawtext_passes(&config.caption, scratch_dir);
        let graph = build_clip_graph(
            &self.geometry,
            &passes,
            &config.caption,
            &self.progress,
            &config.progress_bar,
        );

        FfmpegCommand::new(source, output)
            .seek(self.start)
            .duration(self.duration)
            .filter_complex(graph)
            .map(format!("[{}]", VIDEO_OUT_LABEL))
            .map("0:a?")
            .output_args(config.encoding.to_ffmpeg_args())
    }
}

fn caption_file(scratch_dir: &Path, index: usize) -> PathBuf {
    scratch_dir.join(format!("caption_{}.txt", index))
}

/// Renders one segment into a clip file.
#[async_trait]
pub trait ClipRenderer: Send + Sync {
    /// Render `segment` into `scratch_dir`.
    ///
    /// The scratch directory belongs to the caller, which removes it after
    /// the delivery attempt.
    async fn render(
        &self,
        source: &SourceVideo,
        segment: &SelectedSegment,
        scratch_dir: &Path,
    ) -> MediaResult<RenderedClip>;
}

/// [`ClipRenderer`] backed by the ffmpeg CLI.
#[derive(Debug, Clone)]
pub struct FfmpegClipRenderer {
    config: RenderConfig,
    runner: FfmpegRunner,
}

impl FfmpegClipRenderer {
    pub fn new(config: RenderConfig) -> Self {
        let runner = FfmpegRunner::new().with_timeout(config.timeout_secs);
        Self { config, runner }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }
}

#[async_trait]
impl ClipRenderer for FfmpegClipRenderer {
    async fn render(
        &self,
        source: &SourceVideo,
        segment: &SelectedSegment,
        scratch_dir: &Path,
    ) -> MediaResult<RenderedClip> {
        let plan = ClipPlan::new(source, segment, &self.config)?;

        tokio::fs::create_dir_all(scratch_dir).await?;
        for (i, cue) in plan.captions.cues.iter().enumerate() {
            tokio::fs::write(caption_file(scratch_dir, i), cue.text()).await?;
        }

        let output = scratch_dir.join(format!("short_{:02}.mp4", segment.index));
        let cmd = plan.command(&source.path, &output, &self.config, scratch_dir);

        debug!(
            segment = segment.index,
            start = plan.start,
            duration = plan.duration,
            captions = plan.captions.len(),
            "Rendering clip"
        );

        let started = Instant::now();
        self.runner.run(&cmd).await?;
        metrics::histogram!("vshort_render_seconds").record(started.elapsed().as_secs_f64());

        if !output.exists() {
            return Err(MediaError::internal("ffmpeg produced no output file"));
        }

        info!(
            segment = segment.index,
            output = %output.display(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Clip rendered"
        );

        Ok(RenderedClip {
            path: output,
            duration: plan.duration,
            captions: plan.captions,
            progress: plan.progress,
        })
    }
}
