//! Pipeline configuration.
//!
//! Built once at startup from the environment and passed down by reference;
//! no component reads the environment on its own.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;
use vshort_analysis::GeminiConfig;
use vshort_media::RenderConfig;
use vshort_messenger::TelegramConfig;
use vshort_models::SegmentLimits;
use vshort_store::StoreBackend;

use crate::error::{WorkerError, WorkerResult};

/// Where candidate segments come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    /// Analysis when configured, otherwise the transcript heuristic
    #[default]
    Auto,
    Ai,
    Heuristic,
}

impl FromStr for SelectionMode {
    type Err = WorkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(SelectionMode::Auto),
            "ai" | "gemini" => Ok(SelectionMode::Ai),
            "heuristic" | "transcript" => Ok(SelectionMode::Heuristic),
            other => Err(WorkerError::config_error(format!(
                "unknown selection mode '{other}' (expected auto, ai or heuristic)"
            ))),
        }
    }
}

/// Run store flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    Memory,
    #[default]
    File,
    Redis,
}

impl FromStr for StoreKind {
    type Err = WorkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(StoreKind::Memory),
            "file" => Ok(StoreKind::File),
            "redis" => Ok(StoreKind::Redis),
            other => Err(WorkerError::config_error(format!(
                "unknown store '{other}' (expected memory, file or redis)"
            ))),
        }
    }
}

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root for per-run scratch directories
    pub work_dir: PathBuf,
    pub limits: SegmentLimits,
    /// Completed sources are skipped for this long
    pub dedup_window: Duration,
    pub selection_mode: SelectionMode,
    /// Largest source accepted for download
    pub max_source_bytes: u64,
    pub render: RenderConfig,
    pub store_kind: StoreKind,
    pub store_path: PathBuf,
    pub redis_url: Option<String>,
    pub telegram: Option<TelegramConfig>,
    /// Chat receiving one-shot run output
    pub chat_id: Option<String>,
    /// Where one-shot runs without a chat keep their clips
    pub output_dir: PathBuf,
    pub gemini: Option<GeminiConfig>,
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let work_dir = PathBuf::from("/tmp/vshort");
        Self {
            store_path: work_dir.join("runs.json"),
            work_dir,
            limits: SegmentLimits::default(),
            dedup_window: Duration::from_secs(24 * 60 * 60),
            selection_mode: SelectionMode::Auto,
            max_source_bytes: 2 * 1024 * 1024 * 1024,
            render: RenderConfig::default(),
            store_kind: StoreKind::File,
            redis_url: None,
            telegram: None,
            chat_id: None,
            output_dir: PathBuf::from("shorts_output"),
            gemini: None,
            metrics_addr: None,
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparsable environment value");
            None
        }
    }
}

/// Byte count for `mb` megabytes, saturating at `u64::MAX`.
fn megabytes(mb: u64) -> u64 {
    mb.saturating_mul(1024 * 1024)
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl PipelineConfig {
    /// Create config from environment variables.
    ///
    /// Unparsable numbers fall back to defaults with a warning; unknown enum
    /// values are errors.
    pub fn from_env() -> WorkerResult<Self> {
        let defaults = Self::default();

        let work_dir = env_nonempty("VSHORT_WORK_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.work_dir);

        let limits = SegmentLimits {
            min_duration: env_parse("VSHORT_MIN_DURATION").unwrap_or(defaults.limits.min_duration),
            max_duration: env_parse("VSHORT_MAX_DURATION").unwrap_or(defaults.limits.max_duration),
            max_segments: env_parse("VSHORT_MAX_SEGMENTS").unwrap_or(defaults.limits.max_segments),
        };

        let mut render = defaults.render;
        if let Some(height) = env_parse("VSHORT_TARGET_HEIGHT") {
            render.target_height = height;
        }

        let selection_mode = match env_nonempty("VSHORT_SELECTION_MODE") {
            Some(raw) => raw.parse()?,
            None => SelectionMode::Auto,
        };
        let store_kind = match env_nonempty("VSHORT_STORE") {
            Some(raw) => raw.parse()?,
            None => StoreKind::File,
        };

        Ok(Self {
            store_path: env_nonempty("VSHORT_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| work_dir.join("runs.json")),
            work_dir,
            limits,
            dedup_window: env_parse("VSHORT_DEDUP_WINDOW_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.dedup_window),
            selection_mode,
            max_source_bytes: env_parse("VSHORT_MAX_SOURCE_MB")
                .map(megabytes)
                .unwrap_or(defaults.max_source_bytes),
            render,
            store_kind,
            redis_url: env_nonempty("REDIS_URL"),
            telegram: TelegramConfig::from_env(),
            chat_id: env_nonempty("TELEGRAM_CHAT_ID"),
            output_dir: env_nonempty("VSHORT_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            gemini: GeminiConfig::from_env(),
            metrics_addr: env_parse("METRICS_ADDR"),
        })
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> WorkerResult<()> {
        let limits = &self.limits;
        if !(limits.min_duration.is_finite() && limits.min_duration > 0.0) {
            return Err(WorkerError::config_error("VSHORT_MIN_DURATION must be positive"));
        }
        if !(limits.max_duration.is_finite() && limits.max_duration >= limits.min_duration) {
            return Err(WorkerError::config_error(
                "VSHORT_MAX_DURATION must be at least VSHORT_MIN_DURATION",
            ));
        }
        if limits.max_segments == 0 {
            return Err(WorkerError::config_error("VSHORT_MAX_SEGMENTS must be at least 1"));
        }
        if self.dedup_window.is_zero() {
            return Err(WorkerError::config_error("VSHORT_DEDUP_WINDOW_SECS must be positive"));
        }
        if self.render.target_height < 16 || self.render.target_height % 2 != 0 {
            return Err(WorkerError::config_error(
                "VSHORT_TARGET_HEIGHT must be an even number of at least 16",
            ));
        }
        if self.selection_mode == SelectionMode::Ai && self.gemini.is_none() {
            return Err(WorkerError::config_error(
                "VSHORT_SELECTION_MODE=ai requires GEMINI_API_KEY",
            ));
        }
        self.store_backend()?;
        Ok(())
    }

    /// Resolve the store selection into a backend.
    pub fn store_backend(&self) -> WorkerResult<StoreBackend> {
        match self.store_kind {
            StoreKind::Memory => Ok(StoreBackend::Memory),
            StoreKind::File => Ok(StoreBackend::File(self.store_path.clone())),
            StoreKind::Redis => self
                .redis_url
                .clone()
                .map(StoreBackend::Redis)
                .ok_or_else(|| WorkerError::config_error("VSHORT_STORE=redis requires REDIS_URL")),
        }
    }

    /// Dedup window in the store's time type.
    pub fn dedup_window_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.dedup_window).unwrap_or_else(|_| chrono::Duration::days(1))
    }

    /// Whether candidates come from the analysis collaborator.
    pub fn uses_analysis(&self) -> bool {
        match self.selection_mode {
            SelectionMode::Ai => true,
            SelectionMode::Heuristic => false,
            SelectionMode::Auto => self.gemini.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.limits.max_segments, 10);
        assert_eq!(config.store_backend().unwrap(), StoreBackend::File("/tmp/vshort/runs.json".into()));
        assert!(!config.uses_analysis());
    }

    #[test]
    fn test_parse_modes() {
        assert_eq!("AI".parse::<SelectionMode>().unwrap(), SelectionMode::Ai);
        assert_eq!(" heuristic ".parse::<SelectionMode>().unwrap(), SelectionMode::Heuristic);
        assert!("random".parse::<SelectionMode>().is_err());
        assert_eq!("redis".parse::<StoreKind>().unwrap(), StoreKind::Redis);
    }

    #[test]
    fn test_validation_failures() {
        let mut config = PipelineConfig::default();
        config.limits.max_duration = 10.0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig {
            selection_mode: SelectionMode::Ai,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        config.gemini = Some(GeminiConfig {
            api_key: "k".into(),
            ..Default::default()
        });
        assert!(config.validate().is_ok());
        assert!(config.uses_analysis());

        let config = PipelineConfig {
            store_kind: StoreKind::Redis,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.render.target_height = 1281;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_source_size_saturates() {
        assert_eq!(megabytes(2048), 2 * 1024 * 1024 * 1024);
        assert_eq!(megabytes(u64::MAX), u64::MAX);
        assert_eq!(megabytes(u64::MAX / 1024), u64::MAX);
    }

    #[test]
    fn test_dedup_window_conversion() {
        let config = PipelineConfig::default();
        assert_eq!(config.dedup_window_chrono(), chrono::Duration::hours(24));
    }
}
