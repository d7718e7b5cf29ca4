//! Delivery results and run summaries.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::run::RunId;

/// Outcome of a single segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Delivered,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-segment delivery result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryResult {
    /// 1-based segment index
    pub segment_index: usize,
    pub status: DeliveryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl DeliveryResult {
    pub fn delivered(segment_index: usize) -> Self {
        Self {
            segment_index,
            status: DeliveryStatus::Delivered,
            error_detail: None,
        }
    }

    pub fn failed(segment_index: usize, detail: impl Into<String>) -> Self {
        Self {
            segment_index,
            status: DeliveryStatus::Failed,
            error_detail: Some(detail.into()),
        }
    }

    pub fn is_delivered(&self) -> bool {
        self.status == DeliveryStatus::Delivered
    }
}

/// Results of one pass over the selected segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub results: Vec<DeliveryResult>,
}

impl BatchReport {
    pub fn push(&mut self, result: DeliveryResult) {
        self.results.push(result);
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn delivered(&self) -> usize {
        self.results.iter().filter(|r| r.is_delivered()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.delivered()
    }

    /// One-line human summary used in the final notification.
    pub fn summary_line(&self) -> String {
        format!(
            "Done: {} of {} shorts delivered, {} failed.",
            self.delivered(),
            self.total(),
            self.failed()
        )
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Dedup short-circuit; nothing was fetched.
    Skipped { reason: String },
    /// Segments were processed; individual clips may still have failed.
    Completed { delivered: usize, failed: usize },
    /// Fatal error before or during clip processing.
    Aborted { reason: String },
}

impl RunOutcome {
    /// Metric / log label.
    pub fn as_str(&self) -> &'static str {
        match self {
            RunOutcome::Skipped { .. } => "skipped",
            RunOutcome::Completed { .. } => "completed",
            RunOutcome::Aborted { .. } => "aborted",
        }
    }
}

/// Summary returned by the run coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub source_id: String,
    #[serde(flatten)]
    pub outcome: RunOutcome,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<DeliveryResult>,
}

impl RunSummary {
    pub fn skipped(run_id: RunId, source_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            run_id,
            source_id: source_id.into(),
            outcome: RunOutcome::Skipped {
                reason: reason.into(),
            },
            results: Vec::new(),
        }
    }

    pub fn aborted(run_id: RunId, source_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            run_id,
            source_id: source_id.into(),
            outcome: RunOutcome::Aborted {
                reason: reason.into(),
            },
            results: Vec::new(),
        }
    }

    pub fn completed(run_id: RunId, source_id: impl Into<String>, report: BatchReport) -> Self {
        Self {
            run_id,
            source_id: source_id.into(),
            outcome: RunOutcome::Completed {
                delivered: report.delivered(),
                failed: report.failed(),
            },
            results: report.results,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, RunOutcome::Skipped { .. })
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.outcome, RunOutcome::Aborted { .. })
    }
}
