//! FFmpeg CLI wrapper and vertical clip renderer.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Progress parsing from `-progress pipe:2`
//! - Filter graphs for 9:16 crops, burnt-in captions and progress bars
//! - The [`ClipRenderer`] used by the delivery sequencer
//! - yt-dlp download of sources and subtitles, ffprobe inspection

pub mod command;
pub mod download;
pub mod error;
pub mod filters;
pub mod probe;
pub mod progress;
pub mod render;

pub use command::{check_ffmpeg, check_ffprobe, check_ytdlp, FfmpegCommand, FfmpegRunner};
pub use download::{classify_ytdlp_output, download_subtitles, download_video};
pub use error::{DownloadFailureKind, MediaError, MediaResult};
pub use filters::{CaptionStyle, CropGeometry, ProgressBarStyle};
pub use probe::{probe_source, probe_video, VideoInfo};
pub use progress::FfmpegProgress;
pub use render::{ClipPlan, ClipRenderer, FfmpegClipRenderer, RenderConfig, RenderedClip};
