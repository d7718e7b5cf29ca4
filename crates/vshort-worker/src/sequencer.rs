//! Delivery sequencer: render, deliver and clean up each segment in order.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};
use vshort_media::ClipRenderer;
use vshort_messenger::Messenger;
use vshort_models::{BatchReport, DeliveryResult, SelectedSegment, SourceVideo};

use crate::caption::delivery_caption;
use crate::error::SegmentError;
use crate::metrics;

/// Per-segment lifecycle, logged as the segment advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentState {
    Pending,
    Rendering,
    Rendered,
    RenderFailed,
    Delivered,
    DeliveryFailed,
    Cleaned,
}

/// Result of one pass over the segments.
#[derive(Debug)]
pub struct SequenceOutcome {
    pub report: BatchReport,
    /// Set when a failure stopped the batch early
    pub fatal: Option<SegmentError>,
}

impl SequenceOutcome {
    pub fn is_aborted(&self) -> bool {
        self.fatal.is_some()
    }
}

pub struct DeliverySequencer {
    renderer: Arc<dyn ClipRenderer>,
    messenger: Arc<dyn Messenger>,
}

impl DeliverySequencer {
    pub fn new(renderer: Arc<dyn ClipRenderer>, messenger: Arc<dyn Messenger>) -> Self {
        Self { renderer, messenger }
    }

    /// Process `segments` in ascending start order under `scratch_root`.
    ///
    /// Each segment gets its own `clip_NN` directory, removed before the
    /// next segment starts whatever happened. A non-fatal failure is recorded
    /// and the loop moves on; a fatal one marks the remaining segments as
    /// not attempted and stops. The summary notification is only sent for
    /// batches that ran to the end.
    pub async fn run(
        &self,
        source: &SourceVideo,
        segments: &[SelectedSegment],
        scratch_root: &Path,
    ) -> SequenceOutcome {
        let mut ordered: Vec<&SelectedSegment> = segments.iter().collect();
        ordered.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));
        let total = ordered.len();

        let mut report = BatchReport::default();
        let mut fatal = None;

        for (position, segment) in ordered.iter().enumerate() {
            if fatal.is_some() {
                report.push(DeliveryResult::failed(segment.index, "not attempted: run aborted"));
                metrics::record_clip("skipped");
                continue;
            }

            let scratch = scratch_root.join(format!("clip_{:02}", segment.index));
            debug!(segment = segment.index, state = ?SegmentState::Pending, "Segment queued");

            let outcome = self.process_segment(source, segment, total, &scratch).await;
            cleanup(&scratch).await;
            debug!(segment = segment.index, state = ?SegmentState::Cleaned, "Segment scratch removed");

            match outcome {
                Ok(()) => {
                    report.push(DeliveryResult::delivered(segment.index));
                    metrics::record_clip("delivered");
                }
                Err(err) => {
                    warn!(
                        segment = segment.index,
                        position = position + 1,
                        total,
                        error = %err,
                        "Segment failed"
                    );
                    report.push(DeliveryResult::failed(segment.index, err.short_detail()));
                    metrics::record_clip("failed");
                    if err.is_fatal() {
                        fatal = Some(err);
                    }
                }
            }
        }

        if fatal.is_none() {
            if let Err(e) = self.messenger.notify(&report.summary_line()).await {
                warn!(error = %e, "Failed to send summary notification");
            }
        }

        info!(
            delivered = report.delivered(),
            failed = report.failed(),
            total,
            aborted = fatal.is_some(),
            "Batch finished"
        );
        SequenceOutcome { report, fatal }
    }

    async fn process_segment(
        &self,
        source: &SourceVideo,
        segment: &SelectedSegment,
        total: usize,
        scratch: &Path,
    ) -> Result<(), SegmentError> {
        debug!(segment = segment.index, state = ?SegmentState::Rendering, "Rendering segment");
        let started = Instant::now();
        let clip = match self.renderer.render(source, segment, scratch).await {
            Ok(clip) => clip,
            Err(e) => {
                debug!(segment = segment.index, state = ?SegmentState::RenderFailed, "Render failed");
                return Err(SegmentError::Render(e));
            }
        };
        metrics::record_stage_duration("render", started.elapsed().as_secs_f64());
        debug!(segment = segment.index, state = ?SegmentState::Rendered, path = ?clip.path, "Rendered");

        let caption = delivery_caption(segment, total, &mut rand::rng());
        let started = Instant::now();
        match self.messenger.deliver_clip(&clip.path, &caption).await {
            Ok(()) => {
                metrics::record_stage_duration("deliver", started.elapsed().as_secs_f64());
                info!(
                    segment = segment.index,
                    state = ?SegmentState::Delivered,
                    duration = clip.duration,
                    "Delivered clip"
                );
                Ok(())
            }
            Err(e) => {
                debug!(segment = segment.index, state = ?SegmentState::DeliveryFailed, "Delivery failed");
                Err(SegmentError::Delivery(e))
            }
        }
    }
}

async fn cleanup(scratch: &Path) {
    match tokio::fs::remove_dir_all(scratch).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = ?scratch, error = %e, "Failed to remove clip scratch"),
    }
}
