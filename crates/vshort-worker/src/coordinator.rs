//! Run coordinator: one source in, one summary out.
//!
//! Flow per run:
//! 1. Claim the source in the run store (dedup short-circuit)
//! 2. Fetch into a fresh `run-*` scratch directory
//! 3. Propose candidates (analysis or transcript heuristic)
//! 4. Validate into the final segment list
//! 5. Render and deliver each segment in order
//! 6. Record the run if at least one clip was delivered, otherwise release
//!    the claim so a later attempt can retry

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn, Instrument};
use vshort_analysis::{GeminiClient, SegmentAnalyzer};
use vshort_media::{ClipRenderer, FfmpegClipRenderer};
use vshort_messenger::{Messenger, TelegramClient};
use vshort_models::{
    CandidateSegment, RunId, RunRecord, RunSummary, SelectedSegment, SourceRef, TranscriptCue,
};
use vshort_store::{open_store, Claim, RunStore};

use crate::config::PipelineConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::fetch::{FetchedSource, Fetcher, SourceFetcher};
use crate::logging::RunLogger;
use crate::metrics;
use crate::payload::parse_candidates;
use crate::selector::{fixed_windows, select};
use crate::sequencer::{DeliverySequencer, SequenceOutcome};
use crate::transcript::build_windows;
use crate::validator::{validate, Priority};

pub const MSG_STARTED: &str = "⏳ Got it! Analyzing your video, shorts will follow shortly.";
pub const MSG_ALREADY_PROCESSED: &str = "✅ This video was already processed recently.";
pub const MSG_IN_PROGRESS: &str = "⏳ This video is already being processed.";

pub struct RunCoordinator {
    config: Arc<PipelineConfig>,
    store: Arc<dyn RunStore>,
    fetcher: Arc<dyn Fetcher>,
    analyzer: Option<Arc<dyn SegmentAnalyzer>>,
    renderer: Arc<dyn ClipRenderer>,
}

impl RunCoordinator {
    /// Candidates come from the transcript heuristic unless an analyzer is
    /// attached with [`RunCoordinator::with_analyzer`].
    pub fn new(
        config: Arc<PipelineConfig>,
        store: Arc<dyn RunStore>,
        fetcher: Arc<dyn Fetcher>,
        renderer: Arc<dyn ClipRenderer>,
    ) -> Self {
        Self {
            config,
            store,
            fetcher,
            analyzer: None,
            renderer,
        }
    }

    pub fn with_analyzer(mut self, analyzer: Arc<dyn SegmentAnalyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    /// Wire the production collaborators from configuration.
    pub fn from_config(config: PipelineConfig, telegram: Option<Arc<TelegramClient>>) -> WorkerResult<Self> {
        let store = open_store(&config.store_backend()?)?;
        let fetcher = Arc::new(SourceFetcher::new(telegram, config.max_source_bytes));
        let renderer = Arc::new(FfmpegClipRenderer::new(config.render.clone()));

        let analyzer: Option<Arc<dyn SegmentAnalyzer>> = if config.uses_analysis() {
            let gemini = config
                .gemini
                .clone()
                .ok_or_else(|| WorkerError::config_error("analysis selected but GEMINI_API_KEY is unset"))?;
            Some(Arc::new(GeminiClient::new(gemini)?))
        } else {
            None
        };

        info!(
            selection = if analyzer.is_some() { "ai" } else { "heuristic" },
            work_dir = %config.work_dir.display(),
            "Run coordinator ready"
        );

        let mut coordinator = Self::new(Arc::new(config), store, fetcher, renderer);
        coordinator.analyzer = analyzer;
        Ok(coordinator)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process one source end to end. Never fails: every outcome, including
    /// aborts, is reported in the summary and to `messenger`.
    pub async fn process(&self, source: &SourceRef, messenger: Arc<dyn Messenger>) -> RunSummary {
        let run_id = RunId::new();
        let source_id = source.source_key();
        let logger = RunLogger::new(&run_id, &source_id);
        let span = logger.create_span();

        let summary = self
            .process_inner(run_id, source, &source_id, messenger, &logger)
            .instrument(span)
            .await;
        metrics::record_run(summary.outcome.as_str());
        summary
    }

    async fn process_inner(
        &self,
        run_id: RunId,
        source: &SourceRef,
        source_id: &str,
        messenger: Arc<dyn Messenger>,
        logger: &RunLogger,
    ) -> RunSummary {
        let window = self.config.dedup_window_chrono();

        match self.store.claim(source_id, window).await {
            Ok(Claim::Acquired) => {}
            Ok(Claim::AlreadyProcessed(record)) => {
                info!(processed_at = %record.processed_at, "Source already processed, skipping");
                notify(messenger.as_ref(), MSG_ALREADY_PROCESSED).await;
                return RunSummary::skipped(run_id, source_id, "already processed");
            }
            Ok(Claim::InProgress) => {
                info!("Source is being processed by another run, skipping");
                notify(messenger.as_ref(), MSG_IN_PROGRESS).await;
                return RunSummary::skipped(run_id, source_id, "in progress");
            }
            Err(e) => {
                let err = WorkerError::from(e);
                logger.log_error(&err.to_string());
                metrics::record_run_failure(err.stage());
                notify(messenger.as_ref(), &failure_text(&err)).await;
                return RunSummary::aborted(run_id, source_id, err.to_string());
            }
        }

        logger.log_start(&source.to_string());
        notify(messenger.as_ref(), MSG_STARTED).await;

        let (err, results) = match self.execute(source, messenger.clone(), logger).await {
            Ok(SequenceOutcome { report, fatal: None }) if report.delivered() == 0 => (
                WorkerError::NothingDelivered {
                    attempted: report.total(),
                },
                report.results,
            ),
            Ok(SequenceOutcome { report, fatal: None }) => {
                let record = RunRecord::new(source_id, report.total());
                if let Err(e) = self.store.complete(record, window).await {
                    logger.log_warning(&format!("failed to record run: {e}"));
                    self.release(source_id).await;
                }
                logger.log_completion(&report.summary_line());
                return RunSummary::completed(run_id, source_id, report);
            }
            Ok(SequenceOutcome {
                report,
                fatal: Some(fatal),
            }) => (WorkerError::Aborted(fatal), report.results),
            Err(err) => (err, Vec::new()),
        };

        logger.log_error(&err.to_string());
        metrics::record_run_failure(err.stage());
        self.release(source_id).await;
        notify(messenger.as_ref(), &failure_text(&err)).await;

        let mut summary = RunSummary::aborted(run_id, source_id, err.to_string());
        summary.results = results;
        summary
    }

    /// Everything between claim and record, inside the run's scratch directory.
    async fn execute(
        &self,
        source: &SourceRef,
        messenger: Arc<dyn Messenger>,
        logger: &RunLogger,
    ) -> WorkerResult<SequenceOutcome> {
        tokio::fs::create_dir_all(&self.config.work_dir).await?;
        let run_dir = tempfile::Builder::new()
            .prefix("run-")
            .tempdir_in(&self.config.work_dir)?;

        let result = self.execute_in(source, messenger, logger, run_dir.path()).await;

        let path = run_dir.path().to_path_buf();
        match tokio::task::spawn_blocking(move || run_dir.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(path = %path.display(), error = %e, "Failed to remove run directory"),
            Err(e) => warn!(path = %path.display(), error = %e, "Run directory cleanup task failed"),
        }
        result
    }

    async fn execute_in(
        &self,
        source: &SourceRef,
        messenger: Arc<dyn Messenger>,
        logger: &RunLogger,
        run_dir: &Path,
    ) -> WorkerResult<SequenceOutcome> {
        let started = Instant::now();
        let fetched = self.fetcher.fetch(source, run_dir).await?;
        metrics::record_stage_duration("fetch", started.elapsed().as_secs_f64());
        logger.log_progress(&format!(
            "fetched {:.1}s {}x{} source, {} transcript cues",
            fetched.video.duration,
            fetched.video.width,
            fetched.video.height,
            fetched.transcript.len()
        ));

        let segments = self.select_segments(&fetched).await?;
        logger.log_progress(&format!("selected {} segments", segments.len()));

        let sequencer = DeliverySequencer::new(self.renderer.clone(), messenger);
        Ok(sequencer.run(&fetched.video, &segments, run_dir).await)
    }

    async fn select_segments(&self, fetched: &FetchedSource) -> WorkerResult<Vec<SelectedSegment>> {
        let limits = &self.config.limits;

        let (candidates, priority): (Vec<CandidateSegment>, Priority) = match &self.analyzer {
            Some(analyzer) => {
                let started = Instant::now();
                let raw = analyzer.analyze(&fetched.video, limits).await?;
                metrics::record_stage_duration("analysis", started.elapsed().as_secs_f64());
                (parse_candidates(&raw)?, Priority::InputOrder)
            }
            None if fetched.transcript.is_empty() => {
                info!("No transcript, falling back to evenly spaced windows");
                (fixed_windows(fetched.video.duration, limits), Priority::InputOrder)
            }
            None => {
                let windows = build_windows(&fetched.transcript, limits);
                (select(&windows, limits.max_segments, limits), Priority::Score)
            }
        };

        let mut segments = validate(candidates, fetched.video.duration, limits, priority)?;
        attach_cues(&mut segments, &fetched.transcript);
        Ok(segments)
    }

    async fn release(&self, source_id: &str) {
        if let Err(e) = self.store.release(source_id).await {
            warn!(source_id, error = %e, "Failed to release run claim");
        }
    }
}

/// Give segments without cues the transcript lines they overlap.
fn attach_cues(segments: &mut [SelectedSegment], transcript: &[TranscriptCue]) {
    if transcript.is_empty() {
        return;
    }
    for segment in segments.iter_mut().filter(|s| s.cues.is_empty()) {
        segment.cues = transcript
            .iter()
            .filter(|c| c.end > segment.start && c.start < segment.end)
            .cloned()
            .collect();
    }
}

fn failure_text(err: &WorkerError) -> String {
    format!("❌ Could not make shorts: {}.", err.user_message())
}

async fn notify(messenger: &dyn Messenger, text: &str) {
    if let Err(e) = messenger.notify(text).await {
        warn!(error = %e, "Failed to send notification");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{FetchError, FetchErrorKind};
    use crate::testing::{FakeAnalyzer, FakeFetcher, FakeMessenger, FakeRenderer};
    use vshort_analysis::AnalysisError;
    use vshort_media::MediaError;
    use vshort_messenger::DirectoryMessenger;
    use vshort_models::{DeliveryStatus, RunOutcome};
    use vshort_store::MemoryRunStore;

    struct Harness {
        _dir: tempfile::TempDir,
        config: Arc<PipelineConfig>,
        store: Arc<MemoryRunStore>,
        messenger: Arc<FakeMessenger>,
    }

    impl Harness {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let config = PipelineConfig {
                work_dir: dir.path().to_path_buf(),
                ..Default::default()
            };
            Self {
                _dir: dir,
                config: Arc::new(config),
                store: Arc::new(MemoryRunStore::new()),
                messenger: Arc::new(FakeMessenger::default()),
            }
        }

        fn coordinator(&self, fetcher: Arc<FakeFetcher>, renderer: Arc<FakeRenderer>) -> RunCoordinator {
            RunCoordinator::new(self.config.clone(), self.store.clone(), fetcher, renderer)
        }

        async fn run(&self, coordinator: &RunCoordinator, source: &SourceRef) -> RunSummary {
            coordinator.process(source, self.messenger.clone()).await
        }

        fn leftover_run_dirs(&self) -> usize {
            std::fs::read_dir(&self.config.work_dir)
                .unwrap()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_name().to_string_lossy().starts_with("run-"))
                .count()
        }
    }

    fn url() -> SourceRef {
        SourceRef::url("https://example.com/watch?v=abc").unwrap()
    }

    /// 5 s cues of three words each, covering `[0, seconds)`.
    fn transcript(seconds: usize) -> Vec<TranscriptCue> {
        (0..seconds / 5)
            .map(|i| {
                let start = (i * 5) as f64;
                TranscriptCue::new(start, start + 5.0, format!("line {i} words"))
            })
            .collect()
    }

    #[tokio::test]
    async fn test_heuristic_run_completes_and_records() {
        let h = Harness::new();
        let fetcher = Arc::new(FakeFetcher::new(200.0).with_transcript(transcript(200)));
        let renderer = Arc::new(FakeRenderer::default());
        let coordinator = h.coordinator(fetcher.clone(), renderer.clone());

        let summary = h.run(&coordinator, &url()).await;

        assert_eq!(summary.outcome, RunOutcome::Completed { delivered: 3, failed: 0 });
        assert_eq!(summary.results.len(), 3);
        assert_eq!(renderer.rendered(), vec![1, 2, 3]);

        let notifications = h.messenger.notifications();
        assert_eq!(notifications.first().map(String::as_str), Some(MSG_STARTED));
        assert_eq!(
            notifications.last().map(String::as_str),
            Some("Done: 3 of 3 shorts delivered, 0 failed.")
        );

        let record = h.store.get(&url().source_key()).await.unwrap().unwrap();
        assert_eq!(record.segment_count, 3);
        assert_eq!(h.leftover_run_dirs(), 0);
    }

    #[tokio::test]
    async fn test_second_run_in_window_short_circuits() {
        let h = Harness::new();
        let fetcher = Arc::new(FakeFetcher::new(200.0).with_transcript(transcript(200)));
        let renderer = Arc::new(FakeRenderer::default());
        let analyzer = Arc::new(FakeAnalyzer::returning(r#"[{"start": 0, "end": 40, "label": "x"}]"#));
        let coordinator = h
            .coordinator(fetcher.clone(), renderer.clone())
            .with_analyzer(analyzer.clone());

        let first = h.run(&coordinator, &url()).await;
        assert!(!first.is_skipped());

        let second = h.run(&coordinator, &url()).await;
        assert!(second.is_skipped());
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(analyzer.calls(), 1);
        assert_eq!(renderer.rendered(), vec![1]);
        assert_eq!(
            h.messenger.notifications().last().map(String::as_str),
            Some(MSG_ALREADY_PROCESSED)
        );
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts_and_releases_claim() {
        let h = Harness::new();
        let fetcher = Arc::new(FakeFetcher::failing(FetchError::new(
            FetchErrorKind::Unauthorized,
            "Private video",
        )));
        let renderer = Arc::new(FakeRenderer::default());
        let coordinator = h.coordinator(fetcher.clone(), renderer.clone());

        let summary = h.run(&coordinator, &url()).await;
        assert!(summary.is_aborted());
        assert!(renderer.rendered().is_empty());

        let notifications = h.messenger.notifications();
        assert_eq!(notifications.len(), 2);
        assert_eq!(
            notifications[1],
            "❌ Could not make shorts: the video is private or restricted."
        );

        // Nothing recorded, claim gone: the next attempt fetches again
        assert!(h.store.get(&url().source_key()).await.unwrap().is_none());
        let retry = h.run(&coordinator, &url()).await;
        assert!(retry.is_aborted());
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(h.leftover_run_dirs(), 0);
    }

    #[tokio::test]
    async fn test_overlong_candidate_aborts_with_validation_error() {
        let h = Harness::new();
        let fetcher = Arc::new(FakeFetcher::new(120.0));
        let renderer = Arc::new(FakeRenderer::default());
        let analyzer = Arc::new(FakeAnalyzer::returning(r#"[{"start": 0, "end": 70, "label": "too long"}]"#));
        let coordinator = h.coordinator(fetcher, renderer.clone()).with_analyzer(analyzer);

        let summary = h.run(&coordinator, &url()).await;

        match &summary.outcome {
            RunOutcome::Aborted { reason } => assert!(reason.starts_with("Validation failed")),
            other => panic!("expected abort, got {other:?}"),
        }
        assert!(renderer.rendered().is_empty());
        assert_eq!(
            h.messenger.notifications().last().map(String::as_str),
            Some("❌ Could not make shorts: no suitable segments were found.")
        );
    }

    #[tokio::test]
    async fn test_fenced_analysis_payload_gets_transcript_cues() {
        let h = Harness::new();
        let fetcher = Arc::new(FakeFetcher::new(300.0).with_transcript(transcript(300)));
        let renderer = Arc::new(FakeRenderer::default());
        let payload = "Here are the highlights:\n```json\n[\
            {\"start\": \"00:02:00\", \"end\": \"00:02:40\", \"label\": \"second\"},\
            {\"start\": 10, \"end\": 45, \"label\": \"first\"}\
        ]\n```";
        let analyzer = Arc::new(FakeAnalyzer::returning(payload));
        let coordinator = h.coordinator(fetcher, renderer.clone()).with_analyzer(analyzer);

        let summary = h.run(&coordinator, &url()).await;

        assert_eq!(summary.outcome, RunOutcome::Completed { delivered: 2, failed: 0 });
        assert_eq!(renderer.rendered(), vec![1, 2]);
        let captions = h.messenger.captions();
        assert!(captions[0].starts_with("🎬 first"));
        assert!(captions[1].starts_with("🎬 second"));
    }

    #[test]
    fn test_attach_cues_overlap() {
        let mut segments = vec![SelectedSegment::from_candidate(
            1,
            CandidateSegment::new(10.0, 45.0, "x"),
        )];
        attach_cues(&mut segments, &transcript(60));
        let starts: Vec<f64> = segments[0].cues.iter().map(|c| c.start).collect();
        assert_eq!(starts, vec![10.0, 15.0, 20.0, 25.0, 30.0, 35.0, 40.0]);
    }

    #[tokio::test]
    async fn test_garbage_payload_fails_closed() {
        let h = Harness::new();
        let fetcher = Arc::new(FakeFetcher::new(120.0));
        let renderer = Arc::new(FakeRenderer::default());
        let analyzer = Arc::new(FakeAnalyzer::returning(r#"[{"start": "soon", "end": 40}]"#));
        let coordinator = h.coordinator(fetcher, renderer.clone()).with_analyzer(analyzer);

        let summary = h.run(&coordinator, &url()).await;

        assert!(summary.is_aborted());
        assert!(renderer.rendered().is_empty());
        assert_eq!(
            h.messenger.notifications().last().map(String::as_str),
            Some("❌ Could not make shorts: video analysis returned no usable result.")
        );
    }

    #[tokio::test]
    async fn test_analysis_timeout_is_reported() {
        let h = Harness::new();
        let fetcher = Arc::new(FakeFetcher::new(120.0));
        let renderer = Arc::new(FakeRenderer::default());
        let analyzer = Arc::new(FakeAnalyzer::failing(|| AnalysisError::PollTimeout {
            attempts: 30,
            waited_secs: 300,
        }));
        let coordinator = h.coordinator(fetcher, renderer).with_analyzer(analyzer);

        let summary = h.run(&coordinator, &url()).await;

        assert!(summary.is_aborted());
        assert_eq!(
            h.messenger.notifications().last().map(String::as_str),
            Some("❌ Could not make shorts: video analysis timed out.")
        );
    }

    #[tokio::test]
    async fn test_attachment_without_transcript_uses_fixed_windows() {
        let h = Harness::new();
        let fetcher = Arc::new(FakeFetcher::new(200.0));
        let renderer = Arc::new(FakeRenderer::default());
        let coordinator = h.coordinator(fetcher, renderer.clone());
        let source = SourceRef::attachment("F1", "U1", Some(1024));

        let summary = h.run(&coordinator, &source).await;

        assert_eq!(summary.outcome, RunOutcome::Completed { delivered: 3, failed: 0 });
        assert_eq!(renderer.rendered(), vec![1, 2, 3]);
        assert_eq!(h.messenger.captions().len(), 3);
        assert!(h.store.get("tg:U1").await.unwrap().is_some());
        assert_eq!(h.leftover_run_dirs(), 0);
    }

    #[tokio::test]
    async fn test_source_shorter_than_minimum_aborts() {
        let h = Harness::new();
        let fetcher = Arc::new(FakeFetcher::new(20.0));
        let renderer = Arc::new(FakeRenderer::default());
        let coordinator = h.coordinator(fetcher, renderer.clone());

        let summary = h.run(&coordinator, &url()).await;

        assert!(summary.is_aborted());
        assert!(renderer.rendered().is_empty());
        assert_eq!(h.leftover_run_dirs(), 0);
    }

    #[tokio::test]
    async fn test_nothing_delivered_is_not_recorded() {
        let h = Harness::new();
        let fetcher = Arc::new(FakeFetcher::new(120.0));
        let renderer = Arc::new(FakeRenderer::failing_on(1, || {
            MediaError::ffmpeg_failed("FFmpeg exited with non-zero status", Some("Invalid data".into()), Some(1))
        }));
        let analyzer = Arc::new(FakeAnalyzer::returning(r#"[{"start": 0, "end": 40, "label": "only"}]"#));
        let coordinator = h
            .coordinator(fetcher.clone(), renderer.clone())
            .with_analyzer(analyzer);

        let first = h.run(&coordinator, &url()).await;
        assert!(first.is_aborted());
        assert_eq!(first.results.len(), 1);
        assert_eq!(first.results[0].status, DeliveryStatus::Failed);
        assert_eq!(
            h.messenger.notifications().last().map(String::as_str),
            Some("❌ Could not make shorts: none of the shorts could be delivered.")
        );
        assert!(h.store.get(&url().source_key()).await.unwrap().is_none());

        // Claim was released, so the source is tried again
        let second = h.run(&coordinator, &url()).await;
        assert!(!second.is_skipped());
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_clips_saved_to_output_dir_survive_cleanup() {
        let h = Harness::new();
        let out = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(FakeFetcher::new(200.0).with_transcript(transcript(200)));
        let coordinator = h.coordinator(fetcher, Arc::new(FakeRenderer::default()));
        let messenger = Arc::new(DirectoryMessenger::new(out.path()));

        let summary = coordinator.process(&url(), messenger).await;

        assert_eq!(summary.outcome, RunOutcome::Completed { delivered: 3, failed: 0 });
        assert_eq!(h.leftover_run_dirs(), 0);
        for i in 1..=3 {
            let clip = out.path().join(format!("short_{i:02}.mp4"));
            assert!(clip.exists(), "missing {}", clip.display());
            let caption = std::fs::read_to_string(clip.with_extension("txt")).unwrap();
            assert!(caption.contains(&format!("Short {i}/3")));
        }
    }

    #[tokio::test]
    async fn test_encoder_failure_aborts_with_partial_results() {
        let h = Harness::new();
        let fetcher = Arc::new(FakeFetcher::new(200.0).with_transcript(transcript(200)));
        let renderer = Arc::new(FakeRenderer::failing_on(2, || {
            MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                Some("[vost#0:0] Unknown encoder 'libx264'".into()),
                Some(1),
            )
        }));
        let coordinator = h.coordinator(fetcher, renderer.clone());

        let summary = h.run(&coordinator, &url()).await;

        assert!(summary.is_aborted());
        assert_eq!(summary.results.len(), 3);
        assert_eq!(summary.results[0].status, DeliveryStatus::Delivered);
        assert_eq!(summary.results[2].status, DeliveryStatus::Failed);
        assert_eq!(renderer.rendered(), vec![1, 2]);

        let notifications = h.messenger.notifications();
        assert!(!notifications.iter().any(|n| n.starts_with("Done:")));
        assert_eq!(
            notifications.last().map(String::as_str),
            Some("❌ Could not make shorts: the video encoder failed.")
        );
        assert!(h.store.get(&url().source_key()).await.unwrap().is_none());
        assert_eq!(h.leftover_run_dirs(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_runs_for_one_source() {
        let h = Harness::new();
        let fetcher = Arc::new(FakeFetcher::new(200.0).with_transcript(transcript(200)));
        let renderer = Arc::new(FakeRenderer::default());
        let coordinator = h.coordinator(fetcher.clone(), renderer);

        let source = url();
        let (a, b) = tokio::join!(h.run(&coordinator, &source), h.run(&coordinator, &source));

        assert_eq!([a.is_skipped(), b.is_skipped()].iter().filter(|s| **s).count(), 1);
        assert_eq!(fetcher.calls(), 1);
    }
}
