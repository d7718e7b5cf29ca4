//! In-process fakes for the pipeline's collaborators.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use vshort_analysis::{AnalysisError, AnalysisResult, SegmentAnalyzer};
use vshort_media::{ClipRenderer, MediaError, MediaResult, RenderedClip};
use vshort_messenger::{Messenger, MessengerError, MessengerResult};
use vshort_models::{
    CaptionTrack, ProgressBar, SegmentLimits, SelectedSegment, SourceRef, SourceVideo, TranscriptCue,
};

use crate::fetch::{FetchError, FetchedSource, Fetcher};

/// `n` disjoint 40 s segments, indexed from 1.
pub fn segments(n: usize) -> Vec<SelectedSegment> {
    (1..=n)
        .map(|i| {
            let start = (i - 1) as f64 * 100.0;
            SelectedSegment {
                index: i,
                start,
                end: start + 40.0,
                label: format!("Segment {i}"),
                score: None,
                cues: Vec::new(),
            }
        })
        .collect()
}

type ErrorFactory = Box<dyn Fn() -> MediaError + Send + Sync>;

/// Writes a placeholder clip, or fails for one chosen segment.
#[derive(Default)]
pub struct FakeRenderer {
    fail: Option<(usize, ErrorFactory)>,
    rendered: Mutex<Vec<usize>>,
}

impl FakeRenderer {
    pub fn failing_on(index: usize, error: impl Fn() -> MediaError + Send + Sync + 'static) -> Self {
        Self {
            fail: Some((index, Box::new(error))),
            rendered: Mutex::new(Vec::new()),
        }
    }

    /// Segment indices render was called for, in call order.
    pub fn rendered(&self) -> Vec<usize> {
        self.rendered.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClipRenderer for FakeRenderer {
    async fn render(
        &self,
        _source: &SourceVideo,
        segment: &SelectedSegment,
        scratch_dir: &Path,
    ) -> MediaResult<RenderedClip> {
        self.rendered.lock().unwrap().push(segment.index);
        tokio::fs::create_dir_all(scratch_dir).await?;
        let output = scratch_dir.join(format!("short_{:02}.mp4", segment.index));
        tokio::fs::write(&output, b"partial").await?;

        if let Some((index, error)) = &self.fail {
            if *index == segment.index {
                return Err(error());
            }
        }

        Ok(RenderedClip {
            path: output,
            duration: segment.duration(),
            captions: CaptionTrack::empty(),
            progress: ProgressBar {
                x: 0,
                y: 0,
                width: 404,
                height: 8,
                duration: segment.duration(),
            },
        })
    }
}

/// Records notifications and deliveries; can fail the n-th delivery.
#[derive(Default)]
pub struct FakeMessenger {
    fail_delivery: Option<usize>,
    deliveries: AtomicUsize,
    notifications: Mutex<Vec<String>>,
    captions: Mutex<Vec<String>>,
}

impl FakeMessenger {
    /// Fail the `n`-th delivery (1-based call count).
    pub fn failing_delivery(n: usize) -> Self {
        Self {
            fail_delivery: Some(n),
            ..Default::default()
        }
    }

    pub fn notifications(&self) -> Vec<String> {
        self.notifications.lock().unwrap().clone()
    }

    /// Captions of successful deliveries.
    pub fn captions(&self) -> Vec<String> {
        self.captions.lock().unwrap().clone()
    }
}

#[async_trait]
impl Messenger for FakeMessenger {
    async fn notify(&self, text: &str) -> MessengerResult<()> {
        self.notifications.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn deliver_clip(&self, path: &Path, caption: &str) -> MessengerResult<()> {
        let call = self.deliveries.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_delivery == Some(call) {
            return Err(MessengerError::api("sendVideo", 413, "Request Entity Too Large"));
        }
        assert!(path.exists(), "delivered clip must exist: {}", path.display());
        self.captions.lock().unwrap().push(caption.to_string());
        Ok(())
    }
}

/// Drops a placeholder source into the run directory.
pub struct FakeFetcher {
    duration: f64,
    transcript: Vec<TranscriptCue>,
    error: Option<FetchError>,
    calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            transcript: Vec::new(),
            error: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_transcript(mut self, transcript: Vec<TranscriptCue>) -> Self {
        self.transcript = transcript;
        self
    }

    pub fn failing(error: FetchError) -> Self {
        Self {
            error: Some(error),
            ..Self::new(0.0)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, source: &SourceRef, work_dir: &Path) -> Result<FetchedSource, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        let path = work_dir.join("source.mp4");
        tokio::fs::write(&path, b"source").await?;
        Ok(FetchedSource {
            video: SourceVideo::new(source.source_key(), path, self.duration, 1920, 1080),
            transcript: self.transcript.clone(),
        })
    }
}

/// Returns a canned payload.
pub struct FakeAnalyzer {
    payload: Result<String, fn() -> AnalysisError>,
    calls: AtomicUsize,
}

impl FakeAnalyzer {
    pub fn returning(payload: impl Into<String>) -> Self {
        Self {
            payload: Ok(payload.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: fn() -> AnalysisError) -> Self {
        Self {
            payload: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SegmentAnalyzer for FakeAnalyzer {
    async fn analyze(&self, _video: &SourceVideo, _limits: &SegmentLimits) -> AnalysisResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.payload {
            Ok(payload) => Ok(payload.clone()),
            Err(error) => Err(error()),
        }
    }
}
